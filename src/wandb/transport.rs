//! GraphQL transport for the W&B API.
//!
//! One fixed endpoint, bearer-token auth, no retries. Transient failures
//! self-heal through the synchronizers' fixed polling interval, so this
//! layer only classifies what went wrong.

use serde_json::Value;

use crate::http_client;

/// The single GraphQL endpoint all queries go through.
pub const GRAPHQL_ENDPOINT: &str = "https://api.wandb.ai/graphql";

const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

/// Failure modes of a GraphQL request. All are recoverable and local to the
/// synchronizer that issued the request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// No API key configured; checked before any network activity.
    #[error("Missing API key")]
    Auth,
    /// The service answered with a non-success HTTP status.
    #[error("HTTP {status}")]
    Http { status: u16 },
    /// The request never completed (DNS, TLS, timeout, ...).
    #[error("Network error: {0}")]
    Network(String),
    /// The service reported a query error in the response body.
    #[error("{message}")]
    GraphQl { message: String },
    /// The query succeeded but the requested entity does not exist. The
    /// service returns null rather than an error for missing entities, so
    /// this is distinct from [`TransportError::GraphQl`].
    #[error("Project or run not found, or no access")]
    NotFound,
    /// The response body could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidBody(String),
}

/// Execute a GraphQL query against the fixed endpoint and return the `data`
/// payload.
///
/// A body-level `errors` list takes precedence over a successful HTTP
/// status.
pub fn execute(query: &str, variables: Value, api_key: &str) -> Result<Value, TransportError> {
    execute_at(GRAPHQL_ENDPOINT, query, variables, api_key)
}

fn execute_at(
    endpoint: &str,
    query: &str,
    variables: Value,
    api_key: &str,
) -> Result<Value, TransportError> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        return Err(TransportError::Auth);
    }

    let request = http_client::agent()
        .post(endpoint)
        .set("Accept", "application/json")
        .set("Content-Type", "application/json")
        .set("Authorization", &format!("Bearer {api_key}"));

    let body = serde_json::json!({ "query": query, "variables": variables });
    let response = match request.send_json(body) {
        Ok(response) => response,
        Err(ureq::Error::Status(status, _)) => {
            return Err(TransportError::Http { status });
        }
        Err(ureq::Error::Transport(err)) => {
            return Err(TransportError::Network(err.to_string()));
        }
    };

    let bytes = http_client::read_response_bytes(response, MAX_RESPONSE_BYTES)
        .map_err(|err| TransportError::InvalidBody(err.to_string()))?;
    let envelope: Value = serde_json::from_slice(&bytes)
        .map_err(|err| TransportError::InvalidBody(err.to_string()))?;
    interpret_envelope(envelope)
}

/// Split a GraphQL response envelope into data or the first reported error.
fn interpret_envelope(envelope: Value) -> Result<Value, TransportError> {
    if let Some(errors) = envelope.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let message = errors
                .first()
                .and_then(|err| err.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("GraphQL error")
                .to_string();
            return Err(TransportError::GraphQl { message });
        }
    }
    match envelope.get("data") {
        Some(data) if !data.is_null() => Ok(data.clone()),
        _ => Err(TransportError::InvalidBody(
            "Response carried no data".to_string(),
        )),
    }
}
