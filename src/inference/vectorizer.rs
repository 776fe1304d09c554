use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::inference::features::FeatureValue;

/// A fitted dictionary vectorizer.
///
/// String features are one-hot encoded under `<name><separator><value>`, numeric
/// features keep their value under `<name>`. Anything outside the fitted
/// vocabulary is dropped, the same way the vectorizer behaved during training.
#[derive(Debug, Clone)]
pub struct DictVectorizer {
    feature_names: Vec<String>,
    separator: String,
    vocabulary: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct VectorizerArtifact {
    feature_names: Vec<String>,
    #[serde(default = "default_separator")]
    separator: String,
}

fn default_separator() -> String {
    "=".to_string()
}

impl DictVectorizer {
    pub fn new(feature_names: Vec<String>, separator: impl Into<String>) -> Result<Self> {
        let mut vocabulary = HashMap::with_capacity(feature_names.len());
        for (index, name) in feature_names.iter().enumerate() {
            if vocabulary.insert(name.clone(), index).is_some() {
                bail!("Duplicate feature name {name} in vectorizer");
            }
        }

        Ok(Self {
            feature_names,
            separator: separator.into(),
            vocabulary,
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let artifact: VectorizerArtifact =
            serde_json::from_str(json).context("Malformed vectorizer artifact")?;
        Self::new(artifact.feature_names, artifact.separator)
    }

    #[tracing::instrument(level = "info")]
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read vectorizer {}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn len(&self) -> usize {
        self.feature_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feature_names.is_empty()
    }

    pub fn transform<'a>(
        &self,
        features: impl IntoIterator<Item = (&'a str, FeatureValue<'a>)>,
    ) -> Vec<f64> {
        let mut row = vec![0f64; self.len()];
        for (name, value) in features {
            let (column, value) = match value {
                FeatureValue::Categorical(category) => {
                    (format!("{name}{}{category}", self.separator), 1f64)
                }
                FeatureValue::Numeric(value) => (name.to_string(), value),
            };
            if let Some(&index) = self.vocabulary.get(&column) {
                row[index] += value;
            }
        }
        row
    }
}
