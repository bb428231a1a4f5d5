use async_trait::async_trait;
use bytes::Bytes;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::{stream, Stream, StreamExt};
use std::pin::Pin;

use crate::domain::ProviderError;

/// Stream type for HTTP responses
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ProviderError>> + Send>>;

/// Stream of server-sent event `data:` payloads
pub type SseStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// Stream of JSON documents from a newline-delimited body
pub type JsonStream = Pin<Box<dyn Stream<Item = Result<serde_json::Value, ProviderError>> + Send>>;

/// Trait for HTTP client operations (for mocking)
#[async_trait]
pub trait HttpClientTrait: Send + Sync + std::fmt::Debug {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;

    async fn post_json_stream(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<ByteStream, ProviderError>;
}

/// Real HTTP client using reqwest
#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn send(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, ProviderError> {
        let mut request = self.client.post(url);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request.json(body).send().await.map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, error_body));
        }

        Ok(response)
    }
}

/// Timeouts keep their kind; everything else on the wire is worth retrying
fn transport_error(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::timeout(format!("Request timed out: {}", error))
    } else {
        ProviderError::transient(format!("Request failed: {}", error))
    }
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let response = self.send(url, headers, body).await?;

        response
            .json()
            .await
            .map_err(|e| ProviderError::transient(format!("Failed to parse response: {}", e)))
    }

    async fn post_json_stream(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<ByteStream, ProviderError> {
        let response = self.send(url, headers, body).await?;

        let stream = response
            .bytes_stream()
            .map(|result| result.map_err(transport_error));

        Ok(Box::pin(stream))
    }
}

/// Decode a byte stream into SSE `data:` payloads; multi-line data is joined with `\n`
pub fn sse_data(bytes: ByteStream) -> SseStream {
    let events = bytes.eventsource().filter_map(|event| {
        let data = match event {
            Ok(event) if event.data.is_empty() => None,
            Ok(event) => Some(Ok(event.data)),
            Err(EventStreamError::Transport(error)) => Some(Err(error)),
            Err(error) => Some(Err(ProviderError::transient(format!(
                "Malformed event stream: {}",
                error
            )))),
        };
        async move { data }
    });

    Box::pin(events)
}

/// Decode a byte stream of newline-delimited (or concatenated) JSON documents
pub fn json_values(bytes: ByteStream) -> JsonStream {
    let decoded = stream::unfold((bytes, Vec::new()), |(mut bytes, mut buffer)| async move {
        loop {
            let chunk = match bytes.next().await? {
                Ok(chunk) => chunk,
                Err(error) => return Some((vec![Err(error)], (bytes, buffer))),
            };

            buffer.extend_from_slice(&chunk);
            let (values, consumed) = complete_values(&buffer);
            buffer.drain(..consumed);

            if !values.is_empty() {
                return Some((values, (bytes, buffer)));
            }
        }
    });

    Box::pin(decoded.flat_map(stream::iter))
}

/// Parse every complete document in `buffer`; returns them with the bytes consumed
fn complete_values(buffer: &[u8]) -> (Vec<Result<serde_json::Value, ProviderError>>, usize) {
    let mut documents =
        serde_json::Deserializer::from_slice(buffer).into_iter::<serde_json::Value>();
    let mut values = Vec::new();

    loop {
        match documents.next() {
            Some(Ok(value)) => values.push(Ok(value)),
            Some(Err(error)) if error.is_eof() => return (values, documents.byte_offset()),
            Some(Err(error)) => {
                values.push(Err(ProviderError::transient(format!(
                    "Malformed JSON stream: {}",
                    error
                ))));
                return (values, buffer.len());
            }
            None => return (values, buffer.len()),
        }
    }
}
