// src/handlers.rs
use crate::{AppState, errors::VideoError, models::*};
use actix_web::{HttpResponse, error, http::header, web};
use log::info;

const JSON_BODY_LIMIT: usize = 4 * 1024 * 1024;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/video")
            .app_data(
                web::JsonConfig::default()
                    .limit(JSON_BODY_LIMIT)
                    .error_handler(|err, _req| {
                        let message = err.to_string();
                        error::InternalError::from_response(
                            err,
                            HttpResponse::BadRequest().json(serde_json::json!({ "error": message })),
                        )
                        .into()
                    }),
            )
            .service(
                web::resource("/models")
                    .route(web::get().to(list_models))
                    .default_service(web::to(|| method_not_allowed("GET"))),
            )
            .service(
                web::resource("/generate")
                    .route(web::post().to(generate_video))
                    .default_service(web::to(|| method_not_allowed("POST"))),
            ),
    )
    .route("/health", web::get().to(health_check));
}

pub async fn list_models(data: web::Data<AppState>) -> Result<HttpResponse, VideoError> {
    let models = data.model_directory.list_candidate_models().await?;
    info!("Listing {} candidate models", models.len());

    Ok(HttpResponse::Ok().json(ModelsResponse { models }))
}

pub async fn generate_video(
    body: web::Json<GenerateBody>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, VideoError> {
    let request = GenerationRequest::from_body(body.into_inner())?;
    let decoded = data.inference.generate(&request).await?;

    Ok(HttpResponse::Ok().json(GenerateResponse {
        video_url: decoded.video_ref,
        model_id: request.model_id,
        duration: Some(request.duration_seconds),
    }))
}

async fn method_not_allowed(allow: &'static str) -> HttpResponse {
    HttpResponse::MethodNotAllowed()
        .insert_header((header::ALLOW, allow))
        .json(serde_json::json!({ "error": "Method not allowed" }))
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "flux-video",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
