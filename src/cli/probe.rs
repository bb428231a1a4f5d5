//! Probe command - one health round, printed as a table or JSON

use clap::Args;

use crate::domain::{HealthProber, ProbeOutcome};
use crate::infrastructure::credentials::EnvCredentialSource;

#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// Print the probe report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: ProbeArgs) -> anyhow::Result<()> {
    let config = super::bootstrap();

    let state = crate::build_app_state(&config, &EnvCredentialSource)?;
    let prober = state.prober();
    let outcomes = prober.probe_all().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    } else {
        print!("{}", render_report(prober, &outcomes));
    }

    Ok(())
}

fn render_report(prober: &HealthProber, outcomes: &[ProbeOutcome]) -> String {
    let mut out = String::new();

    for outcome in outcomes {
        let latency = outcome
            .latency_ms
            .map(|ms| format!("{}ms", ms))
            .unwrap_or_else(|| "-".to_string());

        out.push_str(&format!(
            "{:<12} {:<14} priority={:<3} {:<10} {}\n",
            outcome.id,
            outcome.name,
            outcome.priority,
            outcome.status.as_str(),
            latency
        ));
    }

    let order: Vec<String> = prober
        .rank_healthy(outcomes)
        .iter()
        .map(|handle| handle.id().to_string())
        .collect();

    if order.is_empty() {
        out.push_str("No healthy providers\n");
    } else {
        out.push_str(&format!("Routing order: {}\n", order.join(" -> ")));
    }

    out
}
