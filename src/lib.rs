//! Ride duration prediction service.
//!
//! A regression model and its feature vectorizer are resolved from a model
//! registry once at startup and served behind a single `POST /predict` route.
//!
//! - **`registry`**: artifact references (`runs:/`, `s3://`, `hf://`, URLs and
//!   local paths) and the clients that download them.
//! - **`inference`**: feature extraction, the dictionary vectorizer, the
//!   candle-backed linear regressor and the prediction task.
//! - **`api`**: the axum router and its handler.

pub mod api;
pub mod config;
pub mod error;
pub mod inference;
pub mod registry;
pub mod telemetry;

use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::inference::pipeline::DurationPipeline;
use crate::inference::task::predict::DurationPredictor;
use crate::registry::Registry;

/// Resolves the configured artifacts and loads them into a ready predictor.
pub async fn load_predictor(config: &Config) -> Result<DurationPredictor> {
    let model_version = config.model_version()?;
    let model_uri = config.model_uri()?;
    let vectorizer_uri = config.vectorizer_uri()?;

    let registry = Registry::from_config(config)?;
    let pipeline = DurationPipeline::load(&registry, &model_uri, vectorizer_uri.as_ref()).await?;
    Ok(DurationPredictor::new(Arc::new(pipeline), model_version))
}
