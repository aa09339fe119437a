// src/services/decoder.rs
//! Turns the many response shapes text-to-video models produce into one
//! playable reference: a URL or a `data:` URI.
use crate::errors::VideoError;
use crate::models::DecodedVideo;
use base64::{Engine as _, engine::general_purpose};
use log::debug;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

const DEFAULT_VIDEO_MIME: &str = "video/mp4";
const MAX_SEARCH_DEPTH: usize = 32;
const MAX_SEARCH_NODES: usize = 10_000;

static BASE64_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9+/]{4})*(?:[A-Za-z0-9+/]{2}==|[A-Za-z0-9+/]{3}=)?$")
        .expect("base64 pattern is valid")
});

/// Reads the whole body of a successful upstream response and decodes it.
pub async fn decode_response(response: reqwest::Response) -> Result<DecodedVideo, VideoError> {
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.bytes().await?;
    decode_video(content_type.as_deref(), &body)
}

pub fn decode_video(content_type: Option<&str>, body: &[u8]) -> Result<DecodedVideo, VideoError> {
    let content_type = content_type.unwrap_or_default();

    if content_type.contains("application/json") {
        let payload: Value = serde_json::from_slice(body).map_err(|e| {
            debug!("Model response is not valid JSON: {}", e);
            VideoError::EmptyResponse
        })?;
        if is_empty_payload(&payload) {
            return Err(VideoError::EmptyResponse);
        }

        let found = find_video(&payload).ok_or(VideoError::MissingVideoPayload)?;
        let video_ref = normalise_video_ref(&found.video, found.mime_type.as_deref());
        return Ok(DecodedVideo {
            video_ref,
            mime_type: found.mime_type,
        });
    }

    let essence = content_type.split(';').next().unwrap_or_default().trim();
    let mime_type = if essence.starts_with("video/") {
        essence
    } else {
        DEFAULT_VIDEO_MIME
    };
    debug!("Wrapping {} byte binary response as {}", body.len(), mime_type);

    Ok(DecodedVideo {
        video_ref: format!(
            "data:{};base64,{}",
            mime_type,
            general_purpose::STANDARD.encode(body)
        ),
        mime_type: Some(mime_type.to_string()),
    })
}

/// `null`, `false`, `0` and `""` at the top level count as no answer.
fn is_empty_payload(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
struct FoundVideo {
    video: String,
    mime_type: Option<String>,
}

fn find_video(payload: &Value) -> Option<FoundVideo> {
    let mut search = VideoSearch { visited: 0 };
    search.visit(payload, 0)
}

/// Depth-first search with a fixed field priority. Both depth and the total
/// number of visited nodes are bounded.
struct VideoSearch {
    visited: usize,
}

impl VideoSearch {
    fn visit(&mut self, value: &Value, depth: usize) -> Option<FoundVideo> {
        self.visited += 1;
        if depth > MAX_SEARCH_DEPTH || self.visited > MAX_SEARCH_NODES {
            return None;
        }

        let record = match value {
            Value::Object(record) => record,
            Value::Array(items) => return self.visit_all(items.iter(), depth),
            _ => return None,
        };

        for field in ["video", "generated_video"] {
            if let Some(Value::String(video)) = record.get(field) {
                return Some(FoundVideo {
                    video: video.clone(),
                    mime_type: mime_type_of(record),
                });
            }
        }

        for field in ["videos", "data"] {
            if let Some(Value::Array(items)) = record.get(field) {
                if let Some(found) = self.visit_all(items.iter(), depth) {
                    return Some(found);
                }
            }
        }

        self.visit_all(record.values(), depth)
    }

    fn visit_all<'a>(
        &mut self,
        values: impl Iterator<Item = &'a Value>,
        depth: usize,
    ) -> Option<FoundVideo> {
        for value in values {
            if let Some(found) = self.visit(value, depth + 1) {
                return Some(found);
            }
        }
        None
    }
}

fn mime_type_of(record: &Map<String, Value>) -> Option<String> {
    record
        .get("mime_type")
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub fn normalise_video_ref(video: &str, mime_type: Option<&str>) -> String {
    let trimmed = video.trim();
    if trimmed.starts_with("data:")
        || trimmed.starts_with("http://")
        || trimmed.starts_with("https://")
    {
        return trimmed.to_string();
    }

    let candidate: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    if BASE64_PATTERN.is_match(&candidate) {
        let prefix = mime_type
            .filter(|m| m.starts_with("video/"))
            .unwrap_or(DEFAULT_VIDEO_MIME);
        return format!("data:{};base64,{}", prefix, candidate);
    }

    trimmed.to_string()
}
