use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::inference::features::RideFeatures;
use crate::inference::linear::LinearRegressor;
use crate::inference::vectorizer::DictVectorizer;
use crate::registry::artifact::ArtifactUri;
use crate::registry::Registry;

pub const MODEL_FILENAME: &str = "model.safetensors";
pub const BUNDLED_VECTORIZER_FILENAME: &str = "vectorizer.json";

/// Anything that maps ride features to a collection of predicted durations.
pub trait DurationModel: Send + Sync {
    fn predict(&self, features: &RideFeatures) -> Result<Vec<f64>>;
}

/// A fitted vectorizer followed by a linear regressor.
#[derive(Debug, Clone)]
pub struct DurationPipeline {
    vectorizer: DictVectorizer,
    regressor: LinearRegressor,
}

impl DurationPipeline {
    pub fn new(vectorizer: DictVectorizer, regressor: LinearRegressor) -> Result<Self> {
        if vectorizer.len() != regressor.n_features() {
            bail!(
                "Vectorizer produces {} features but the regressor expects {}",
                vectorizer.len(),
                regressor.n_features()
            );
        }
        Ok(Self {
            vectorizer,
            regressor,
        })
    }

    pub fn from_files(model_path: &Path, vectorizer_path: &Path) -> Result<Self> {
        let regressor = LinearRegressor::from_safetensors(model_path)?;
        let vectorizer = DictVectorizer::from_file(vectorizer_path)?;
        Self::new(vectorizer, regressor)
    }

    /// Downloads and loads the model, using `vectorizer_uri` when the vectorizer
    /// was logged as a separate artifact and the model's bundled one otherwise.
    #[tracing::instrument(level = "info", skip(registry))]
    pub async fn load(
        registry: &Registry,
        model_uri: &ArtifactUri,
        vectorizer_uri: Option<&ArtifactUri>,
    ) -> Result<Self> {
        let model_path = registry
            .download(&model_uri.join(MODEL_FILENAME))
            .await
            .with_context(|| format!("Failed to download model {model_uri}"))?;

        let vectorizer_uri = match vectorizer_uri {
            Some(uri) => uri.clone(),
            None => model_uri.join(BUNDLED_VECTORIZER_FILENAME),
        };
        let vectorizer_path = registry
            .download(&vectorizer_uri)
            .await
            .with_context(|| format!("Failed to download vectorizer {vectorizer_uri}"))?;
        info!(
            "Downloaded the dict vectorizer to {}",
            vectorizer_path.display()
        );

        // safetensors and JSON parsing read the files synchronously
        let pipeline =
            tokio::task::spawn_blocking(move || Self::from_files(&model_path, &vectorizer_path))
                .await??;
        if pipeline.vectorizer.is_empty() {
            warn!("Vectorizer has an empty vocabulary, every prediction equals the intercept");
        }
        Ok(pipeline)
    }

    pub fn n_features(&self) -> usize {
        self.regressor.n_features()
    }
}

impl DurationModel for DurationPipeline {
    fn predict(&self, features: &RideFeatures) -> Result<Vec<f64>> {
        let row = self.vectorizer.transform(features.entries());
        self.regressor.predict(&[row])
    }
}

/// Runs the model and keeps the first prediction.
pub fn predict(model: &dyn DurationModel, features: &RideFeatures) -> Result<f64> {
    let predictions = model.predict(features)?;
    match predictions.first() {
        Some(duration) => Ok(*duration),
        None => bail!("Model returned no predictions"),
    }
}
