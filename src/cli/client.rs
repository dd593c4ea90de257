//! HTTP client for a running gateway

use futures::StreamExt;
use reqwest::Client;
use reqwest::StatusCode;

use crate::api::types::ErrorResponse;
use crate::api::types::HistoryResponse;
use crate::config::WireFormat;
use crate::errors::RagDeskError;
use crate::errors::Result;
use crate::models::InteractionRecord;
use crate::protocol::StreamDecoder;
use crate::protocol::StreamEvent;

/// What a streamed answer ended with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AskSummary {
    pub answer: String,
    pub query_id: Option<i64>,
    pub latency_ms: Option<u64>,
}

pub struct GatewayClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl GatewayClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| RagDeskError::HttpError(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    /// Post a question and decode the event stream as it arrives
    ///
    /// `on_token` sees every answer fragment in order. An in-band error event
    /// becomes `GenerationFailure`; the partial answer is lost to the caller
    /// but was recorded by the gateway. A body that closes before `Done` or
    /// `Error` is a truncated answer and also becomes `GenerationFailure`.
    pub async fn ask<F>(
        &self,
        question: &str,
        format: WireFormat,
        mut on_token: F,
    ) -> Result<AskSummary>
    where
        F: FnMut(&str),
    {
        let mut request = self
            .client
            .post(format!("{}/query", self.base_url))
            .json(&serde_json::json!({ "query": question }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RagDeskError::HttpError(e.to_string()))?;
        let response = check_status(response).await?;

        let mut decoder = StreamDecoder::new(format);
        let mut summary = AskSummary::default();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| RagDeskError::HttpError(e.to_string()))?;
            for event in decoder.feed(&chunk)? {
                apply(&mut summary, event, &mut on_token)?;
            }
            if decoder.is_finished() {
                break;
            }
        }
        for event in decoder.finish()? {
            apply(&mut summary, event, &mut on_token)?;
        }
        if !decoder.is_finished() {
            return Err(RagDeskError::GenerationFailure(
                "stream ended without a terminal event".to_string(),
            ));
        }

        Ok(summary)
    }

    /// Interactions recorded by the gateway, newest first
    pub async fn history(&self) -> Result<Vec<InteractionRecord>> {
        let response = self
            .client
            .get(format!("{}/query-history", self.base_url))
            .send()
            .await
            .map_err(|e| RagDeskError::HttpError(e.to_string()))?;
        let response = check_status(response).await?;

        let body: HistoryResponse = response
            .json()
            .await
            .map_err(|e| RagDeskError::HttpError(format!("Failed to parse history: {e}")))?;
        Ok(body.history)
    }
}

fn apply<F: FnMut(&str)>(
    summary: &mut AskSummary,
    event: StreamEvent,
    on_token: &mut F,
) -> Result<()> {
    match event {
        StreamEvent::Token { text } => {
            on_token(&text);
            summary.answer.push_str(&text);
        }
        StreamEvent::QueryId { id } => summary.query_id = id,
        StreamEvent::Latency { ms } => summary.latency_ms = Some(ms),
        StreamEvent::Error { message } => return Err(RagDeskError::GenerationFailure(message)),
        StreamEvent::Done => {}
    }
    Ok(())
}

/// Turn a non-2xx response into the matching error
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&text)
        .map(|body| body.error)
        .unwrap_or(text);

    Err(match status {
        StatusCode::UNAUTHORIZED => RagDeskError::AuthFailure(message),
        StatusCode::BAD_REQUEST => RagDeskError::InvalidRequest(message),
        StatusCode::NOT_FOUND => RagDeskError::NotFound(message),
        _ => RagDeskError::HttpError(format!("{status}: {message}")),
    })
}
