//! Resolves artifact references to files on local disk.

use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::registry::artifact::ArtifactUri;
use crate::registry::mlflow::TrackingClient;

pub mod artifact;
pub mod hub;
pub mod mlflow;

#[derive(Clone, Debug)]
pub struct Registry {
    http: Client,
    tracking: TrackingClient,
    s3_endpoint: Url,
    artifact_dir: PathBuf,
}

impl Registry {
    pub fn new(
        tracking_uri: &str,
        s3_endpoint: &str,
        artifact_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let tracking = TrackingClient::new(http.clone(), tracking_uri)?;
        let s3_endpoint = Url::parse(s3_endpoint)
            .with_context(|| format!("Invalid S3 endpoint {s3_endpoint}"))?;

        Ok(Self {
            http,
            tracking,
            s3_endpoint,
            artifact_dir: artifact_dir.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.tracking_uri,
            &config.s3_endpoint,
            &config.artifact_dir,
        )
    }

    /// Makes the referenced artifact available locally and returns its path.
    #[tracing::instrument(level = "info", skip(self), fields(artifact = %uri))]
    pub async fn download(&self, uri: &ArtifactUri) -> Result<PathBuf> {
        let path = match uri {
            ArtifactUri::Run { run_id, path } => {
                let target = self.artifact_dir.join(sanitize(run_id)?).join(sanitize(path)?);
                let run = self.tracking.get_run(run_id).await?;
                debug!("Run {} keeps its artifacts under {}", run.run_id, run.artifact_uri);
                if run.status != "FINISHED" {
                    warn!("Run {} has status {}", run.run_id, run.status);
                }
                let bytes = self.tracking.download_artifact(run_id, path).await?;
                write_artifact(&target, &bytes).await?;
                target
            }
            ArtifactUri::S3 { bucket, key } => {
                let url = self.s3_url(bucket, key)?;
                let bytes = self.get_bytes(url).await?;
                let target = self.artifact_dir.join(sanitize(bucket)?).join(sanitize(key)?);
                write_artifact(&target, &bytes).await?;
                target
            }
            ArtifactUri::Http(url) => {
                let host = url.host_str().unwrap_or("remote").to_string();
                let bytes = self.get_bytes(url.clone()).await?;
                let target = self.artifact_dir.join(host).join(sanitize(url.path())?);
                write_artifact(&target, &bytes).await?;
                target
            }
            ArtifactUri::Hub {
                repo_id,
                revision,
                path,
            } => {
                let (repo_id, revision, path) = (repo_id.clone(), revision.clone(), path.clone());
                tokio::task::spawn_blocking(move || hub::fetch(&repo_id, &revision, &path))
                    .await??
            }
            ArtifactUri::Local(path) => {
                if !tokio::fs::try_exists(path).await? {
                    bail!("Artifact {} does not exist", path.display());
                }
                path.clone()
            }
        };

        info!("Artifact {} available at {}", uri, path.display());
        Ok(path)
    }

    fn s3_url(&self, bucket: &str, key: &str) -> Result<Url> {
        let mut url = self.s3_endpoint.clone();
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base}/{bucket}/{key}"));
        Ok(url)
    }

    async fn get_bytes(&self, url: Url) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to reach {url}"))?;
        if !response.status().is_success() {
            bail!("{url} answered {}", response.status());
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Keeps remote artifact paths from escaping the artifact directory.
fn sanitize(path: &str) -> Result<PathBuf> {
    let mut clean = PathBuf::new();
    for component in Path::new(path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => bail!("Refusing artifact path {path}"),
        }
    }
    if clean.as_os_str().is_empty() {
        bail!("Artifact path is empty");
    }
    Ok(clean)
}

async fn write_artifact(target: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(target, bytes)
        .await
        .with_context(|| format!("Failed to write {}", target.display()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::sync::Arc;

    use axum::extract::State;
    use axum::http::{StatusCode, Uri};
    use axum::response::{IntoResponse, Response};
    use axum::Router;
    use tokio::net::TcpListener;

    use super::*;
    use crate::registry::mlflow::tests::{spawn_tracking_server, KNOWN_RUN};

    #[test]
    fn sanitize_rejects_parent_components() {
        assert_eq!(
            sanitize("/model/model.safetensors").unwrap(),
            PathBuf::from("model/model.safetensors")
        );
        assert!(sanitize("../../etc/passwd").is_err());
        assert!(sanitize("").is_err());
    }

    #[test]
    fn s3_urls_are_path_style() {
        let registry = Registry::new(
            "http://127.0.0.1:5000",
            "http://minio:9000/",
            "artifacts",
        )
        .unwrap();
        assert_eq!(
            registry
                .s3_url("mlflow", "1/f1a2b3/artifacts/model/model.safetensors")
                .unwrap()
                .as_str(),
            "http://minio:9000/mlflow/1/f1a2b3/artifacts/model/model.safetensors"
        );
    }

    #[tokio::test]
    async fn downloads_run_artifacts_into_the_artifact_dir() {
        let addr = spawn_tracking_server(HashMap::from([(
            "dict_vectorizer.json".to_string(),
            b"{}".to_vec(),
        )]))
        .await;
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(
            &format!("http://{addr}"),
            "https://s3.amazonaws.com",
            dir.path(),
        )
        .unwrap();

        let uri = ArtifactUri::parse(&format!("runs:/{KNOWN_RUN}/dict_vectorizer.json")).unwrap();
        let path = registry.download(&uri).await.unwrap();
        assert_eq!(path, dir.path().join(KNOWN_RUN).join("dict_vectorizer.json"));
        assert_eq!(std::fs::read(&path).unwrap(), b"{}");

        let missing = ArtifactUri::parse("runs:/unknown/model").unwrap();
        assert!(registry.download(&missing).await.is_err());
    }

    #[tokio::test]
    async fn local_artifacts_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("vectorizer.json");
        std::fs::write(&file, b"{}").unwrap();
        let registry =
            Registry::new("http://127.0.0.1:5000", "https://s3.amazonaws.com", dir.path())
                .unwrap();

        let path = registry
            .download(&ArtifactUri::Local(file.clone()))
            .await
            .unwrap();
        assert_eq!(path, file);

        let missing = ArtifactUri::Local(dir.path().join("model.safetensors"));
        assert!(registry.download(&missing).await.is_err());
    }

    async fn serve_object(
        State(objects): State<Arc<HashMap<String, Vec<u8>>>>,
        uri: Uri,
    ) -> Response {
        match objects.get(uri.path()) {
            Some(bytes) => bytes.clone().into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        }
    }

    /// Serves the given bytes keyed by request path, like a bucket endpoint
    /// or a plain file server.
    async fn spawn_object_server(objects: HashMap<String, Vec<u8>>) -> SocketAddr {
        let app = Router::new()
            .fallback(serve_object)
            .with_state(Arc::new(objects));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        addr
    }

    #[tokio::test]
    async fn downloads_s3_and_http_artifacts() {
        let addr = spawn_object_server(HashMap::from([
            (
                "/mlflow/1/run/model/model.safetensors".to_string(),
                b"weights".to_vec(),
            ),
            (
                "/models/duration/vectorizer.json".to_string(),
                b"{}".to_vec(),
            ),
        ]))
        .await;
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(
            "http://127.0.0.1:5000",
            &format!("http://{addr}"),
            dir.path(),
        )
        .unwrap();

        let uri = ArtifactUri::parse("s3://mlflow/1/run/model/model.safetensors").unwrap();
        let path = registry.download(&uri).await.unwrap();
        assert_eq!(
            path,
            dir.path().join("mlflow").join("1/run/model/model.safetensors")
        );
        assert_eq!(std::fs::read(&path).unwrap(), b"weights");

        let uri =
            ArtifactUri::parse(&format!("http://{addr}/models/duration/vectorizer.json")).unwrap();
        let path = registry.download(&uri).await.unwrap();
        assert_eq!(
            path,
            dir.path().join("127.0.0.1").join("models/duration/vectorizer.json")
        );
        assert_eq!(std::fs::read(&path).unwrap(), b"{}");

        let missing = ArtifactUri::parse("s3://mlflow/1/run/model/missing.json").unwrap();
        let err = registry.download(&missing).await.unwrap_err();
        assert!(err.to_string().contains("404"));
        assert!(!dir.path().join("mlflow/1/run/model/missing.json").exists());
    }

    #[tokio::test]
    async fn run_ids_cannot_escape_the_artifact_dir() {
        let dir = tempfile::tempdir().unwrap();
        // Nothing listens here, the run id must be refused before any request
        let registry =
            Registry::new("http://127.0.0.1:9", "https://s3.amazonaws.com", dir.path()).unwrap();

        let uri = ArtifactUri::Run {
            run_id: "..".to_string(),
            path: "model".to_string(),
        };
        let err = registry.download(&uri).await.unwrap_err();
        assert!(err.to_string().contains("Refusing"));
    }
}
