// src/services/mod.rs
pub mod decoder;
pub mod inference;
pub mod model_directory;
pub mod poll;

pub use inference::InferenceService;
pub use model_directory::ModelDirectory;
