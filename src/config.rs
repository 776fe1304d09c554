use std::path::Path;

use anyhow::{bail, Context, Result};
use clap_serde_derive::ClapSerde;

use crate::registry::artifact::ArtifactUri;

pub const DEFAULT_CONFIG_FILE: &str = "DurationPredictor.toml";

#[derive(ClapSerde, Debug, Clone)]
pub struct Config {
    /// The address the listener binds to
    #[default("0.0.0.0".to_string())]
    #[arg(short, long, env)]
    pub address: String,

    /// The port the listener binds to
    #[default(9696)]
    #[arg(short, long, env)]
    pub port: u16,

    /// URI of the tracking server that resolves `runs:/` references
    #[default("http://127.0.0.1:5000".to_string())]
    #[arg(long, env = "MLFLOW_TRACKING_URI")]
    pub tracking_uri: String,

    /// The training run whose artifacts are served, echoed back as the model version
    #[arg(long, env = "RUN_ID")]
    pub run_id: String,

    /// Model artifact reference, defaults to `runs:/<run_id>/model`
    #[arg(long, env)]
    pub model_uri: String,

    /// Standalone vectorizer artifact reference, the model's bundled vectorizer is used when empty
    #[arg(long, env)]
    pub vectorizer_uri: String,

    /// Directory that downloaded artifacts are written to
    #[default("artifacts".to_string())]
    #[arg(long, env)]
    pub artifact_dir: String,

    /// Endpoint used for `s3://` references
    #[default("https://s3.amazonaws.com".to_string())]
    #[arg(long, env = "MLFLOW_S3_ENDPOINT_URL")]
    pub s3_endpoint: String,

    /// OTLP collector endpoint, telemetry export is disabled when empty
    #[arg(long, env)]
    pub otlp_endpoint: String,
}

impl Config {
    pub fn from_toml(path: &str) -> Result<Self> {
        let str = std::fs::read_to_string(path)?;
        let opt: <Config as ClapSerde>::Opt = toml::from_str(&str)?;
        Ok(Config::from(opt))
    }

    /// Reads `path` and lets `overrides` win, a missing default file falls back to defaults.
    pub fn load(path: &str, overrides: <Config as ClapSerde>::Opt) -> Result<Self> {
        match Self::from_toml(path) {
            Ok(config) => Ok(config.merge(overrides)),
            Err(_) if path == DEFAULT_CONFIG_FILE && !Path::new(path).exists() => {
                Ok(Config::default().merge(overrides))
            }
            Err(err) => Err(err.context(format!("Failed to read configuration file {path}"))),
        }
    }

    pub fn model_uri(&self) -> Result<ArtifactUri> {
        if !self.model_uri.is_empty() {
            return ArtifactUri::parse(&self.model_uri);
        }
        if self.run_id.is_empty() {
            bail!("Either run_id or model_uri must be configured");
        }
        Ok(ArtifactUri::Run {
            run_id: self.run_id.clone(),
            path: "model".into(),
        })
    }

    pub fn vectorizer_uri(&self) -> Result<Option<ArtifactUri>> {
        if self.vectorizer_uri.is_empty() {
            return Ok(None);
        }
        ArtifactUri::parse(&self.vectorizer_uri)
            .map(Some)
            .context("Invalid vectorizer_uri")
    }

    /// The identifier reported next to every prediction.
    pub fn model_version(&self) -> Result<String> {
        if !self.run_id.is_empty() {
            return Ok(self.run_id.clone());
        }
        match self.model_uri()? {
            ArtifactUri::Run { run_id, .. } => Ok(run_id),
            other => bail!("Cannot derive a model version from {other}, set run_id"),
        }
    }

    pub fn otlp_endpoint(&self) -> Option<&str> {
        Some(self.otlp_endpoint.as_str()).filter(|endpoint| !endpoint.is_empty())
    }
}
