use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::inference::features::{prepare_features, Ride};
use crate::inference::pipeline::{predict, DurationModel};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PredictResponse {
    pub duration: f64,
    pub model_version: String,
}

pub trait PredictHandler {
    fn run_predict(&self, ride: &Ride) -> Result<PredictResponse>;
}

/// The process-wide model together with the version it is reported under.
#[derive(Clone)]
pub struct DurationPredictor {
    model: Arc<dyn DurationModel>,
    model_version: String,
}

impl DurationPredictor {
    pub fn new(model: Arc<dyn DurationModel>, model_version: impl Into<String>) -> Self {
        Self {
            model,
            model_version: model_version.into(),
        }
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }
}

impl PredictHandler for DurationPredictor {
    fn run_predict(&self, ride: &Ride) -> Result<PredictResponse> {
        let features = prepare_features(ride);
        let duration = predict(self.model.as_ref(), &features)?;

        Ok(PredictResponse {
            duration,
            model_version: self.model_version.clone(),
        })
    }
}
