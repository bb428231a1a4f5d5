//! Chat completions endpoint handler

use std::convert::Infallible;

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::api::middleware::truncate_for_log;
use crate::api::state::AppState;
use crate::api::types::{
    ApiError, ChatCompletionRequest, ChatCompletionResponse, ChatCompletionStreamResponse, Json,
};

const DONE_FRAME: &str = "[DONE]";

/// POST /v1/chat/completions
pub async fn create_chat_completion(
    State(state): State<AppState>,
    Json(request): Json<ChatCompletionRequest>,
) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    let streaming = request.stream;
    let request = request.into_domain();

    info!(
        request_id = %request_id,
        model = request.model.as_deref().unwrap_or("default"),
        stream = streaming,
        messages = request.messages.len(),
        question = %truncate_for_log(request.last_user_message().unwrap_or_default(), 80),
        "Processing chat completion request"
    );

    if streaming {
        let chunks = state.gateway.chat_stream(request).await?;

        let frames = chunks
            .map(move |item| {
                let event = match item {
                    Ok(chunk) => {
                        data_event(&ChatCompletionStreamResponse::from_chunk(chunk, &request_id))
                    }
                    Err(err) => {
                        error!(request_id = %request_id, error = %err, "Stream failed");
                        data_event(&ApiError::from(err).response)
                    }
                };
                Ok::<_, Infallible>(event)
            })
            .chain(stream::once(async {
                Ok::<_, Infallible>(Event::default().data(DONE_FRAME))
            }));

        return Ok(Sse::new(frames)
            .keep_alive(KeepAlive::default())
            .into_response());
    }

    let response = state.gateway.chat(&request).await?;

    info!(
        request_id = %request_id,
        provider = %response.provider,
        confidence = response.confidence,
        response_time_ms = response.response_time_ms,
        "Chat completion finished"
    );

    Ok(Json(ChatCompletionResponse::from_domain(response, &request_id)).into_response())
}

fn data_event<T: Serialize>(payload: &T) -> Event {
    match serde_json::to_string(payload) {
        Ok(data) => Event::default().data(data),
        Err(e) => {
            error!(error = %e, "Failed to serialize stream frame");
            Event::default().data(r#"{"error":{"message":"serialization failed","type":"server_error"}}"#)
        }
    }
}
