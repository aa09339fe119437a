// src/main.rs
use actix_web::{App, HttpServer, middleware, web};
use log::{info, warn};
use std::sync::Arc;

mod config;
mod errors;
mod handlers;
mod models;
mod services;

use crate::config::Config;
use crate::services::{InferenceService, ModelDirectory};

#[derive(Clone)]
pub struct AppState {
    model_directory: Arc<ModelDirectory>,
    inference: Arc<InferenceService>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting flux-video service...");

    let config = Config::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    if config.hf_token.is_none() {
        warn!("No Hugging Face token configured; generation requests will fail");
    }

    // Initialize services
    let model_directory = Arc::new(ModelDirectory::new(
        config.directory.clone(),
        config.hf_token.clone(),
    ));
    let inference = Arc::new(InferenceService::new(
        config.inference_url.clone(),
        config.hf_token.clone(),
        config.poll_policy.clone(),
    ));

    let app_state = AppState {
        model_directory,
        inference,
    };

    info!("Starting HTTP server on {}", config.bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(handlers::configure)
    })
    .bind(&config.bind_address)?
    .run()
    .await
}
