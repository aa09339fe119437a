// src/services/model_directory.rs
use crate::errors::VideoError;
use crate::models::{ModelCandidate, RegistryModel};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use log::{debug, info};
use reqwest::Client;
use std::collections::{HashMap, HashSet};

pub const PAGE_LIMIT: u32 = 200;
pub const TOP_N: usize = 10;

#[derive(Debug, Clone)]
pub struct DirectorySettings {
    pub registry_url: String,
    pub pipeline_tag: String,
    pub fallback_search: String,
    pub recency_cutoff_year: i32,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            registry_url: "https://huggingface.co/api/models".to_string(),
            pipeline_tag: "text-to-video".to_string(),
            fallback_search: "long video".to_string(),
            recency_cutoff_year: 2025,
        }
    }
}

pub struct ModelDirectory {
    settings: DirectorySettings,
    token: Option<String>,
    client: Client,
}

impl ModelDirectory {
    pub fn new(settings: DirectorySettings, token: Option<String>) -> Self {
        Self {
            settings,
            token,
            client: Client::new(),
        }
    }

    pub async fn list_candidate_models(&self) -> Result<Vec<ModelCandidate>, VideoError> {
        let primary = self.fetch_models(None).await?;
        let mut ranked = rank_models(primary, self.settings.recency_cutoff_year);

        if ranked.len() < TOP_N {
            info!(
                "Only {} recent models found, querying registry for \"{}\"",
                ranked.len(),
                self.settings.fallback_search
            );
            let fallback = self
                .fetch_models(Some(self.settings.fallback_search.as_str()))
                .await?;
            ranked = rank_models(merge_by_id(ranked, fallback), self.settings.recency_cutoff_year);
        }

        if ranked.is_empty() {
            return Err(VideoError::NoCandidates {
                cutoff_year: self.settings.recency_cutoff_year,
            });
        }

        Ok(ranked.into_iter().map(to_candidate).collect())
    }

    async fn fetch_models(&self, search: Option<&str>) -> Result<Vec<RegistryModel>, VideoError> {
        let limit = PAGE_LIMIT.to_string();
        let mut query = Vec::with_capacity(5);
        if let Some(search) = search {
            query.push(("search", search));
        }
        query.extend([
            ("pipeline_tag", self.settings.pipeline_tag.as_str()),
            ("sort", "downloads"),
            ("direction", "-1"),
            ("limit", limit.as_str()),
        ]);

        let mut request = self.client.get(&self.settings.registry_url).query(&query);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| VideoError::Registry(format!("Model registry request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(VideoError::Registry(if error_text.is_empty() {
                "Failed to query Hugging Face".to_string()
            } else {
                error_text
            }));
        }

        let models: Vec<RegistryModel> = response
            .json()
            .await
            .map_err(|e| VideoError::Registry(format!("Failed to parse registry response: {}", e)))?;
        debug!("Registry returned {} models", models.len());

        Ok(models)
    }
}

/// Filters, de-duplicates, sorts and truncates a registry listing.
pub fn rank_models(models: Vec<RegistryModel>, cutoff_year: i32) -> Vec<RegistryModel> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut kept: Vec<RegistryModel> = models
        .into_iter()
        .filter(|model| {
            if model.id.as_deref().is_none_or(str::is_empty) {
                return false;
            }
            let Some(source_id) = model.source_id() else {
                return false;
            };
            if seen.contains(source_id) {
                return false;
            }
            let recent = model
                .last_modified
                .as_deref()
                .and_then(parse_year)
                .is_some_and(|year| year >= cutoff_year);
            if !recent {
                return false;
            }
            seen.insert(source_id.to_string());
            true
        })
        .collect();

    kept.sort_by(|a, b| {
        b.downloads
            .unwrap_or(0)
            .cmp(&a.downloads.unwrap_or(0))
            .then_with(|| b.likes.unwrap_or(0).cmp(&a.likes.unwrap_or(0)))
    });
    kept.truncate(TOP_N);
    kept
}

/// Merges two listings keyed by `id`. Later records replace earlier ones but
/// keep the earlier position.
pub fn merge_by_id(first: Vec<RegistryModel>, second: Vec<RegistryModel>) -> Vec<RegistryModel> {
    let mut merged: Vec<RegistryModel> = Vec::with_capacity(first.len() + second.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for model in first.into_iter().chain(second) {
        let key = model.id.clone().unwrap_or_default();
        match positions.get(&key) {
            Some(&index) => merged[index] = model,
            None => {
                positions.insert(key, merged.len());
                merged.push(model);
            }
        }
    }
    merged
}

fn parse_year(timestamp: &str) -> Option<i32> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(parsed.year());
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(parsed.year());
    }
    NaiveDate::parse_from_str(timestamp, "%Y-%m-%d")
        .ok()
        .map(|parsed| parsed.year())
}

fn to_candidate(model: RegistryModel) -> ModelCandidate {
    let id = model.id.clone().unwrap_or_default();
    let name = model
        .model_id
        .clone()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| id.clone());
    ModelCandidate {
        id,
        name,
        last_modified: model
            .last_modified
            .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
        downloads: model.downloads.unwrap_or(0),
        likes: model.likes.unwrap_or(0),
    }
}
