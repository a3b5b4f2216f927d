//! Request plumbing shared by the HTTP backends.

use council_application::BackendError;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;

/// Build a client that bounds connection setup only. Request deadlines are
/// set per call so that streamed bodies can run longer than `timeout`.
pub(crate) fn build_client(timeout: Duration) -> Result<Client, BackendError> {
    Client::builder()
        .connect_timeout(timeout)
        .build()
        .map_err(|e| BackendError::Other(format!("failed to build HTTP client: {}", e)))
}

/// Send a request, waiting at most `timeout` for the response headers.
///
/// With `whole_body` the deadline also covers reading the body.
pub(crate) async fn send(
    builder: RequestBuilder,
    timeout: Duration,
    whole_body: bool,
) -> Result<Response, BackendError> {
    let builder = with_deadline(builder, timeout, whole_body);
    let response = tokio::time::timeout(timeout, builder.send())
        .await
        .map_err(|_| BackendError::Timeout)?
        .map_err(transport_error)?;
    check_status(response).await
}

fn with_deadline(builder: RequestBuilder, timeout: Duration, whole_body: bool) -> RequestBuilder {
    if whole_body {
        builder.timeout(timeout)
    } else {
        builder
    }
}

pub(crate) fn transport_error(error: reqwest::Error) -> BackendError {
    if error.is_timeout() {
        BackendError::Timeout
    } else {
        BackendError::Transport(error.to_string())
    }
}

/// Pass successful responses through; turn the rest into typed errors.
pub(crate) async fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, body))
}

pub(crate) fn status_error(status: StatusCode, body: String) -> BackendError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Authentication(body),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => BackendError::Timeout,
        _ => BackendError::Status {
            status: status.as_u16(),
            body,
        },
    }
}

pub(crate) fn malformed(what: &str, error: impl std::fmt::Display) -> BackendError {
    BackendError::MalformedResponse(format!("{}: {}", what, error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_only_for_whole_body_requests() {
        let client = build_client(Duration::from_secs(120)).unwrap();
        let url = "http://localhost:8000/v1/chat/completions";

        let blocking = with_deadline(client.post(url), Duration::from_secs(120), true)
            .build()
            .unwrap();
        assert_eq!(blocking.timeout(), Some(&Duration::from_secs(120)));

        let streaming = with_deadline(client.post(url), Duration::from_secs(120), false)
            .build()
            .unwrap();
        assert_eq!(streaming.timeout(), None);
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, "bad key".into()),
            BackendError::Authentication(body) if body == "bad key"
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, String::new()),
            BackendError::Authentication(_)
        ));
        assert!(matches!(
            status_error(StatusCode::GATEWAY_TIMEOUT, String::new()),
            BackendError::Timeout
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, "slow down".into()),
            BackendError::Status { status: 429, .. }
        ));
    }
}
