use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::bail_predictor;
use crate::error::PredictorResult;
use crate::inference::features::Ride;
use crate::inference::task::predict::{DurationPredictor, PredictHandler, PredictResponse};

#[derive(Clone)]
pub struct AppState {
    pub predictor: DurationPredictor,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(handle_predict_request))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[axum_macros::debug_handler]
async fn handle_predict_request(
    State(state): State<AppState>,
    payload: Result<Json<Ride>, JsonRejection>,
) -> PredictorResult<(StatusCode, Json<PredictResponse>)> {
    let ride = match payload {
        Ok(Json(ride)) => ride,
        Err(rejection) => bail_predictor!(rejection.status(), rejection.body_text()),
    };
    debug!("Predicting duration for {:?}", ride);

    let response = state.predictor.run_predict(&ride)?;
    info!(
        monotonic_counter.predictions_served = 1u64,
        model_version = %response.model_version,
        duration = response.duration,
        "Prediction served"
    );
    Ok((StatusCode::OK, Json(response)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::error::HttpErrorResponse;
    use crate::inference::features::RideFeatures;
    use crate::inference::pipeline::DurationModel;

    struct ConstantModel(f64);

    impl DurationModel for ConstantModel {
        fn predict(&self, _features: &RideFeatures) -> Result<Vec<f64>> {
            Ok(vec![self.0])
        }
    }

    fn app() -> Router {
        router(AppState {
            predictor: DurationPredictor::new(Arc::new(ConstantModel(12.5)), "f1a2b3"),
        })
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::post("/predict")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn syntax_errors_are_bad_requests_with_a_json_body() {
        let response = app().oneshot(post_json("{\"PULocationID\":")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: HttpErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(!error.error.is_empty());
    }

    #[tokio::test]
    async fn ill_typed_fields_are_unprocessable() {
        let response = app()
            .oneshot(post_json(
                r#"{"PULocationID": "10", "DOLocationID": "50", "trip_distance": "far"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
