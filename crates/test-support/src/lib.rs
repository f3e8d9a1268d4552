//! Canned HTTP service for exercising the remote backends without the network
//!
//! Each request is recorded and answered with the next queued response. Once
//! the queue is empty every request gets `503 Service Unavailable`.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;

/// One request as the stub saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// Method plus path and query, e.g. `POST /path?x=y`
    pub fn request_line(&self) -> String {
        format!("{} {}", self.method, self.uri)
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }
}

/// A canned reply
#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl StubResponse {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            content_type: "application/json",
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn audio(body: Vec<u8>) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: "audio/wav",
            body,
        }
    }
}

impl IntoResponse for StubResponse {
    fn into_response(self) -> Response {
        (self.status, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

/// Requests received so far, in arrival order
pub type RequestLog = Arc<Mutex<Vec<RecordedRequest>>>;

#[derive(Clone)]
struct StubState {
    responses: Arc<Mutex<VecDeque<StubResponse>>>,
    requests: RequestLog,
}

async fn answer(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.requests.lock().push(RecordedRequest {
        method,
        uri,
        headers,
        body: body.to_vec(),
    });

    let next = state.responses.lock().pop_front();
    match next {
        Some(response) => response.into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "no canned response left").into_response(),
    }
}

/// Start a stub on a loopback port and return its base URL
///
/// The server runs on the caller's runtime and stops with it.
pub async fn stub_server(responses: Vec<StubResponse>) -> io::Result<(String, RequestLog)> {
    let requests = RequestLog::default();
    let state = StubState {
        responses: Arc::new(Mutex::new(responses.into())),
        requests: Arc::clone(&requests),
    };
    let app = Router::new().fallback(answer).with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok((format!("http://{}", addr), requests))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_answers_in_order_then_unavailable() {
        let (url, requests) = stub_server(vec![
            StubResponse::json(201, r#"{"first":true}"#),
            StubResponse::audio(b"RIFF".to_vec()),
        ])
        .await
        .unwrap();
        let client = reqwest::Client::new();

        let first = client
            .post(format!("{}/a?x=1", url))
            .header("X-Custom", "yes")
            .body("hello")
            .send()
            .await
            .unwrap();
        assert_eq!(first.status().as_u16(), 201);
        assert_eq!(first.text().await.unwrap(), r#"{"first":true}"#);

        let second = client.get(format!("{}/b", url)).send().await.unwrap();
        assert_eq!(
            second.headers()[reqwest::header::CONTENT_TYPE].to_str().unwrap(),
            "audio/wav"
        );

        let third = client.get(format!("{}/c", url)).send().await.unwrap();
        assert_eq!(third.status().as_u16(), 503);

        let requests = requests.lock();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].request_line(), "POST /a?x=1");
        assert_eq!(requests[0].header("x-custom").as_deref(), Some("yes"));
        assert_eq!(requests[0].body, b"hello");
    }
}
