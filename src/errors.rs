// src/errors.rs
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VideoError {
    #[error("{0}")]
    Validation(String),

    #[error("Hugging Face API token is not configured")]
    MissingCredential,

    #[error("{message}")]
    UpstreamFailure { status: u16, message: String },

    #[error("Timed out while waiting for Hugging Face model to generate a video: {0}")]
    InferenceTimeout(String),

    #[error("Received empty response from video model")]
    EmptyResponse,

    #[error("Video payload missing in model response")]
    MissingVideoPayload,

    #[error("{0}")]
    Registry(String),

    #[error("No Hugging Face video models from {cutoff_year} were found")]
    NoCandidates { cutoff_year: i32 },

    #[error("Upstream request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for VideoError {
    fn from(err: reqwest::Error) -> Self {
        VideoError::Transport(err.to_string())
    }
}

impl ResponseError for VideoError {
    fn status_code(&self) -> StatusCode {
        match self {
            VideoError::Validation(_) => StatusCode::BAD_REQUEST,
            VideoError::MissingCredential => StatusCode::INTERNAL_SERVER_ERROR,
            VideoError::UpstreamFailure { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            VideoError::NoCandidates { .. } => StatusCode::NOT_FOUND,
            VideoError::InferenceTimeout(_)
            | VideoError::EmptyResponse
            | VideoError::MissingVideoPayload
            | VideoError::Registry(_)
            | VideoError::Transport(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string()
        }))
    }
}
