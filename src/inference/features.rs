use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A ride as posted by clients.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Ride {
    #[serde(rename = "PULocationID")]
    pub pu_location_id: LocationId,
    #[serde(rename = "DOLocationID")]
    pub do_location_id: LocationId,
    pub trip_distance: f64,
}

/// Taxi zone identifiers arrive either as strings or as integers.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum LocationId {
    Number(i64),
    Text(String),
}

impl Display for LocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocationId::Number(id) => write!(f, "{id}"),
            LocationId::Text(id) => write!(f, "{id}"),
        }
    }
}

impl From<i64> for LocationId {
    fn from(id: i64) -> Self {
        LocationId::Number(id)
    }
}

impl From<&str> for LocationId {
    fn from(id: &str) -> Self {
        LocationId::Text(id.to_string())
    }
}

/// Features the duration model was fitted on.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RideFeatures {
    #[serde(rename = "PU_DO")]
    pub pu_do: String,
    pub trip_distance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue<'a> {
    Categorical(&'a str),
    Numeric(f64),
}

impl RideFeatures {
    /// Named features in a stable order, as consumed by the vectorizer.
    pub fn entries(&self) -> [(&str, FeatureValue<'_>); 2] {
        [
            ("PU_DO", FeatureValue::Categorical(&self.pu_do)),
            ("trip_distance", FeatureValue::Numeric(self.trip_distance)),
        ]
    }
}

pub fn prepare_features(ride: &Ride) -> RideFeatures {
    RideFeatures {
        pu_do: format!("{}_{}", ride.pu_location_id, ride.do_location_id),
        trip_distance: ride.trip_distance,
    }
}
