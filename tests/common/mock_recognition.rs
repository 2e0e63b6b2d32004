//! Scripted recognition client for orchestration tests
//!
//! Responses are keyed by the exact image bytes so a test can decide per
//! image whether the provider finds faces, fails, blocks on a gate, or never
//! answers.

use async_trait::async_trait;
use bytes::Bytes;
use face_scan_core::models::RecognitionResult;
use face_scan_core::recognition::{RecognitionClient, RecognitionError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Provider finds these `(gender, age)` faces
    Faces(Vec<(&'static str, f64)>),
    Fail(RecognitionError),
    /// Wait for a permit from `ScriptedRecognitionClient::release`, then respond
    Gated(Box<MockResponse>),
    /// Never completes
    Hang,
}

impl MockResponse {
    pub fn no_faces() -> Self {
        Self::Faces(Vec::new())
    }

    pub fn server_error() -> Self {
        Self::Fail(RecognitionError::UnexpectedStatus {
            status: 500,
            body: "internal error".to_string(),
        })
    }

    pub fn gated(self) -> Self {
        Self::Gated(Box::new(self))
    }
}

/// Provider JSON body for the given faces
pub fn provider_payload(faces: &[(&str, f64)]) -> String {
    let data: Vec<serde_json::Value> = faces
        .iter()
        .enumerate()
        .map(|(i, (gender, age))| {
            serde_json::json!({
                "bbox": {"x": i * 10, "y": 0, "width": 8, "height": 8},
                "demographics": {"age": {"mean": age, "variance": 1.0}, "gender": gender}
            })
        })
        .collect();
    serde_json::json!({"data": data, "rotation": 0, "status_code": 200}).to_string()
}

pub struct ScriptedRecognitionClient {
    responses: Mutex<HashMap<Vec<u8>, MockResponse>>,
    default_response: MockResponse,
    gate: Semaphore,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedRecognitionClient {
    /// Every unscripted image gets `default_response`
    pub fn new(default_response: MockResponse) -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            default_response,
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_response(self, image: &[u8], response: MockResponse) -> Self {
        self.responses.lock().insert(image.to_vec(), response);
        self
    }

    /// Let `permits` gated calls proceed
    pub fn release(&self, permits: usize) {
        self.gate.add_permits(permits);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` calls have been made
    pub async fn wait_for_calls(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.calls() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("recognition calls did not arrive in time");
    }

    async fn respond(&self, response: MockResponse) -> Result<RecognitionResult, RecognitionError> {
        let mut response = response;
        loop {
            match response {
                MockResponse::Faces(faces) => {
                    return RecognitionResult::from_raw(provider_payload(&faces))
                        .map_err(|e| RecognitionError::MalformedResponse(e.to_string()));
                }
                MockResponse::Fail(err) => return Err(err),
                MockResponse::Gated(inner) => {
                    if let Ok(permit) = self.gate.acquire().await {
                        permit.forget();
                    }
                    response = *inner;
                }
                MockResponse::Hang => std::future::pending::<()>().await,
            }
        }
    }
}

#[async_trait]
impl RecognitionClient for ScriptedRecognitionClient {
    async fn recognize(&self, image: Bytes) -> Result<RecognitionResult, RecognitionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        let response = self
            .responses
            .lock()
            .get(image.as_ref())
            .cloned()
            .unwrap_or_else(|| self.default_response.clone());

        self.respond(response).await
    }
}
