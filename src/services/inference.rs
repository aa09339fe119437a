// src/services/inference.rs
use crate::errors::VideoError;
use crate::models::{DecodedVideo, GenerationRequest};
use crate::services::decoder;
use crate::services::poll::{Attempt, PollError, PollPolicy, poll_until_ready};
use log::{info, warn};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const DEFAULT_INFERENCE_URL: &str = "https://api-inference.huggingface.co/models";

pub struct InferenceService {
    base_url: String,
    token: Option<String>,
    policy: PollPolicy,
    client: Client,
}

impl InferenceService {
    pub fn new(base_url: String, token: Option<String>, policy: PollPolicy) -> Self {
        Self {
            base_url,
            token,
            policy,
            client: Client::new(),
        }
    }

    /// Sends the request, waiting out "model loading" answers. Whatever the
    /// endpoint finally says (success or not) is handed back untouched.
    pub async fn request_inference(&self, request: &GenerationRequest) -> Result<Response, VideoError> {
        let token = self.token.as_deref().ok_or(VideoError::MissingCredential)?;

        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&request.model_id)
        );
        let body = build_payload(request);

        let result = poll_until_ready(&self.policy, |retry| {
            let request = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", token))
                .header("Accept", "application/json,video/mp4")
                .json(&body);
            send_attempt(request, retry)
        })
        .await;

        match result {
            Ok(response) => Ok(response),
            Err(PollError::Failed(err)) => Err(err),
            Err(err @ (PollError::Exhausted(_) | PollError::DeadlineExceeded(_))) => {
                Err(VideoError::InferenceTimeout(err.to_string()))
            }
        }
    }

    /// Full generation: inference call, terminal status check, decoding.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<DecodedVideo, VideoError> {
        let request_id = Uuid::new_v4();
        let start = Instant::now();
        info!(
            "Generation {} started: model={} frames={} fps={}",
            request_id,
            request.model_id,
            request.total_frames(),
            request.fps
        );

        let response = self.request_inference(request).await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            warn!("Generation {} failed upstream with {}", request_id, status);
            return Err(VideoError::UpstreamFailure {
                status,
                message: if error_text.is_empty() {
                    "Video generation failed".to_string()
                } else {
                    error_text
                },
            });
        }

        let decoded = decoder::decode_response(response).await?;
        info!(
            "Generation {} finished in {}ms",
            request_id,
            start.elapsed().as_millis()
        );
        Ok(decoded)
    }
}

async fn send_attempt(
    request: RequestBuilder,
    retry: u32,
) -> Result<Attempt<Response>, VideoError> {
    let response = request.send().await?;
    let status = response.status();

    if status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::ACCEPTED {
        let hint = response.bytes().await.ok().and_then(|b| estimated_wait(&b));
        warn!(
            "Model responded {} (attempt {}), estimated wait {:?}",
            status,
            retry + 1,
            hint
        );
        return Ok(Attempt::RetryAfter(hint));
    }

    Ok(Attempt::Ready(response))
}

pub fn build_payload(request: &GenerationRequest) -> Value {
    let frames = request.total_frames();
    let dims = request.profile();

    json!({
        "inputs": {
            "prompt": request.prompt,
            "fps": request.fps,
            "num_frames": frames,
            "max_frames": frames,
            "duration_seconds": request.duration_seconds,
            "max_duration_seconds": request.duration_seconds,
            "width": dims.width,
            "height": dims.height
        },
        "parameters": {
            "max_video_duration": request.duration_seconds,
            "num_frames": frames,
            "fps": request.fps,
            "width": dims.width,
            "height": dims.height
        },
        "options": {
            "wait_for_model": true,
            "use_cache": false
        }
    })
}

/// `estimated_time` from a loading response, when it is a positive number.
/// Estimates too large for a `Duration` saturate; the poll policy caps them.
fn estimated_wait(body: &[u8]) -> Option<Duration> {
    let payload: Value = serde_json::from_slice(body).ok()?;
    let seconds = payload.get("estimated_time")?.as_f64()?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    Some(Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX))
}
