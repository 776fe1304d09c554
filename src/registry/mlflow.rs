use anyhow::{bail, Context, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

/// Minimal client for an MLflow-compatible tracking server.
#[derive(Clone, Debug)]
pub struct TrackingClient {
    http: Client,
    tracking_uri: Url,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RunInfo {
    pub run_id: String,
    #[serde(default)]
    pub experiment_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub artifact_uri: String,
}

#[derive(Deserialize)]
struct GetRunResponse {
    run: RunEnvelope,
}

#[derive(Deserialize)]
struct RunEnvelope {
    info: RunInfo,
}

impl TrackingClient {
    pub fn new(http: Client, tracking_uri: &str) -> Result<Self> {
        // Without the trailing slash Url::join would drop the last path segment
        let mut base = tracking_uri.trim_end_matches('/').to_string();
        base.push('/');
        let tracking_uri =
            Url::parse(&base).with_context(|| format!("Invalid tracking URI {tracking_uri}"))?;
        Ok(Self { http, tracking_uri })
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get_run(&self, run_id: &str) -> Result<RunInfo> {
        let url = self.tracking_uri.join("api/2.0/mlflow/runs/get")?;
        let response = self
            .http
            .get(url)
            .query(&[("run_id", run_id)])
            .send()
            .await
            .context("Tracking server is unreachable")?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => bail!("Run {run_id} does not exist"),
            status => bail!("Tracking server answered {status} when looking up run {run_id}"),
        }

        let run: GetRunResponse = response.json().await?;
        Ok(run.run.info)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn download_artifact(&self, run_id: &str, path: &str) -> Result<Vec<u8>> {
        let url = self.tracking_uri.join("get-artifact")?;
        let response = self
            .http
            .get(url)
            .query(&[("run_uuid", run_id), ("path", path)])
            .send()
            .await
            .context("Tracking server is unreachable")?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => bail!("Artifact {path} not found in run {run_id}"),
            status => bail!("Tracking server answered {status} for artifact {path} of run {run_id}"),
        }

        let bytes = response.bytes().await?;
        debug!("Received {} bytes for {path}", bytes.len());
        Ok(bytes.to_vec())
    }
}
