// src/models.rs
use crate::errors::VideoError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DURATION_SECONDS: u32 = 60;
pub const DEFAULT_FPS: u32 = 24;
pub const MAX_DURATION_SECONDS: u32 = 300;
pub const MAX_FPS: u32 = 60;
pub const MAX_TOTAL_FRAMES: u32 = 18_000;

/// Body of `POST /api/video/generate`. Every field is optional on the wire;
/// [`GenerationRequest::from_body`] decides what is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
    pub prompt: Option<String>,
    pub model_id: Option<String>,
    pub duration: Option<serde_json::Value>,
    pub resolution: Option<String>,
    pub fps: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
}

impl Resolution {
    /// Unknown labels fall back to 720p.
    pub fn parse(label: Option<&str>) -> Self {
        match label {
            Some("480p") => Resolution::P480,
            Some("1080p") => Resolution::P1080,
            _ => Resolution::P720,
        }
    }

    pub fn profile(self) -> ResolutionProfile {
        match self {
            Resolution::P480 => ResolutionProfile {
                width: 854,
                height: 480,
            },
            Resolution::P720 => ResolutionProfile {
                width: 1280,
                height: 720,
            },
            Resolution::P1080 => ResolutionProfile {
                width: 1920,
                height: 1080,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionProfile {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model_id: String,
    pub duration_seconds: u32,
    pub fps: u32,
    pub resolution: Resolution,
}

impl GenerationRequest {
    pub fn from_body(body: GenerateBody) -> Result<Self, VideoError> {
        let prompt = body.prompt.filter(|p| !p.is_empty());
        let model_id = body.model_id.filter(|m| !m.is_empty());

        let (Some(prompt), Some(model_id)) = (prompt, model_id) else {
            return Err(VideoError::Validation(
                "Prompt and modelId are required".to_string(),
            ));
        };

        let duration_seconds = body
            .duration
            .as_ref()
            .and_then(serde_json::Value::as_f64)
            .map(|d| clamp_rounded(d, 1, MAX_DURATION_SECONDS))
            .unwrap_or(DEFAULT_DURATION_SECONDS);

        let fps = body
            .fps
            .as_ref()
            .and_then(serde_json::Value::as_f64)
            .map(|f| clamp_rounded(f, 1, MAX_FPS))
            .unwrap_or(DEFAULT_FPS);

        Ok(Self {
            prompt,
            model_id,
            duration_seconds,
            fps,
            resolution: Resolution::parse(body.resolution.as_deref()),
        })
    }

    pub fn total_frames(&self) -> u32 {
        total_frames(self.duration_seconds, self.fps)
    }

    pub fn profile(&self) -> ResolutionProfile {
        self.resolution.profile()
    }
}

pub fn total_frames(duration_seconds: u32, fps: u32) -> u32 {
    let frames = (f64::from(duration_seconds) * f64::from(fps)).round();
    frames.clamp(1.0, f64::from(MAX_TOTAL_FRAMES)) as u32
}

fn clamp_rounded(value: f64, min: u32, max: u32) -> u32 {
    if value.is_nan() {
        return min;
    }
    value.round().clamp(f64::from(min), f64::from(max)) as u32
}

/// A raw record from the model registry listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryModel {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub downloads: Option<u64>,
    #[serde(default)]
    pub likes: Option<u64>,
}

impl RegistryModel {
    /// Identifier used for de-duplication: `modelId` when the registry
    /// supplies one, otherwise `id`.
    pub fn source_id(&self) -> Option<&str> {
        self.model_id
            .as_deref()
            .filter(|m| !m.is_empty())
            .or(self.id.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCandidate {
    pub id: String,
    pub name: String,
    pub last_modified: String,
    pub downloads: u64,
    pub likes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelCandidate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedVideo {
    pub video_ref: String,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub video_url: String,
    pub model_id: String,
    pub duration: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: serde_json::Value) -> GenerateBody {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn total_frames_is_clamped_product_for_every_valid_input() {
        for d in 1..=MAX_DURATION_SECONDS {
            for f in 1..=MAX_FPS {
                let expected = (d * f).clamp(1, MAX_TOTAL_FRAMES);
                assert_eq!(total_frames(d, f), expected, "d={d} f={f}");
            }
        }
    }

    #[test]
    fn unknown_resolution_falls_back_to_720p() {
        for label in [None, Some(""), Some("4k"), Some("720"), Some("1080P")] {
            assert_eq!(
                Resolution::parse(label).profile(),
                ResolutionProfile {
                    width: 1280,
                    height: 720
                }
            );
        }
        assert_eq!(Resolution::parse(Some("480p")).profile().width, 854);
        assert_eq!(Resolution::parse(Some("1080p")).profile().height, 1080);
    }

    #[test]
    fn from_body_requires_prompt_and_model() {
        let err = GenerationRequest::from_body(body(json!({"prompt": "a cat"}))).unwrap_err();
        assert!(matches!(err, VideoError::Validation(_)));

        let err = GenerationRequest::from_body(body(json!({"prompt": "", "modelId": "m"})))
            .unwrap_err();
        assert_eq!(err.to_string(), "Prompt and modelId are required");
    }

    #[test]
    fn from_body_applies_defaults_and_clamps() {
        let request =
            GenerationRequest::from_body(body(json!({"prompt": "a cat", "modelId": "m"})))
                .unwrap();
        assert_eq!(request.duration_seconds, DEFAULT_DURATION_SECONDS);
        assert_eq!(request.fps, DEFAULT_FPS);
        assert_eq!(request.resolution, Resolution::P720);

        let request = GenerationRequest::from_body(body(json!({
            "prompt": "a cat",
            "modelId": "m",
            "duration": 900.4,
            "fps": 0.2,
            "resolution": "480p"
        })))
        .unwrap();
        assert_eq!(request.duration_seconds, MAX_DURATION_SECONDS);
        assert_eq!(request.fps, 1);
        assert_eq!(request.total_frames(), 300);
        assert_eq!(request.profile().width, 854);
    }

    #[test]
    fn non_numeric_duration_uses_default() {
        let request = GenerationRequest::from_body(body(json!({
            "prompt": "a cat",
            "modelId": "m",
            "duration": "long",
            "fps": 30
        })))
        .unwrap();
        assert_eq!(request.duration_seconds, DEFAULT_DURATION_SECONDS);
        assert_eq!(request.total_frames(), 1800);
    }

    #[test]
    fn source_id_prefers_model_id() {
        let model = RegistryModel {
            id: Some("a".to_string()),
            model_id: Some("org/a".to_string()),
            ..Default::default()
        };
        assert_eq!(model.source_id(), Some("org/a"));

        let model = RegistryModel {
            id: Some("a".to_string()),
            ..Default::default()
        };
        assert_eq!(model.source_id(), Some("a"));
    }
}
