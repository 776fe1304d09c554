use std::fmt::Display;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use url::Url;

/// A reference to a model or vectorizer artifact, as accepted in configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactUri {
    /// `runs:/<run_id>/<path>` resolved through the tracking server
    Run { run_id: String, path: String },
    /// `s3://<bucket>/<key>`
    S3 { bucket: String, key: String },
    /// `hf://<owner>/<repo>[@revision]/<path>`
    Hub {
        repo_id: String,
        revision: String,
        path: String,
    },
    /// Any plain `http(s)://` object URL
    Http(Url),
    /// `file://<path>` or a bare filesystem path
    Local(PathBuf),
}

impl ArtifactUri {
    pub fn parse(uri: &str) -> Result<Self> {
        let uri = uri.trim();
        if uri.is_empty() {
            bail!("Artifact reference is empty");
        }

        if let Some(rest) = uri.strip_prefix("runs:/") {
            let rest = rest.trim_start_matches('/');
            let (run_id, path) = rest
                .split_once('/')
                .with_context(|| format!("Missing artifact path in {uri}"))?;
            let path = path.trim_matches('/');
            if run_id.is_empty() || path.is_empty() {
                bail!("Expected runs:/<run_id>/<path>, got {uri}");
            }
            return Ok(ArtifactUri::Run {
                run_id: run_id.to_string(),
                path: path.to_string(),
            });
        }

        if let Some(rest) = uri.strip_prefix("s3://") {
            let (bucket, key) = rest
                .split_once('/')
                .with_context(|| format!("Missing object key in {uri}"))?;
            let key = key.trim_matches('/');
            if bucket.is_empty() || key.is_empty() {
                bail!("Expected s3://<bucket>/<key>, got {uri}");
            }
            return Ok(ArtifactUri::S3 {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }

        if let Some(rest) = uri.strip_prefix("hf://") {
            let mut parts = rest.splitn(3, '/');
            let (Some(owner), Some(repo), Some(path)) = (parts.next(), parts.next(), parts.next())
            else {
                bail!("Expected hf://<owner>/<repo>[@revision]/<path>, got {uri}");
            };
            let (repo, revision) = repo.split_once('@').unwrap_or((repo, "main"));
            let path = path.trim_matches('/');
            if owner.is_empty() || repo.is_empty() || revision.is_empty() || path.is_empty() {
                bail!("Expected hf://<owner>/<repo>[@revision]/<path>, got {uri}");
            }
            return Ok(ArtifactUri::Hub {
                repo_id: format!("{owner}/{repo}"),
                revision: revision.to_string(),
                path: path.to_string(),
            });
        }

        if uri.starts_with("http://") || uri.starts_with("https://") {
            let url = Url::parse(uri).with_context(|| format!("Invalid artifact URL {uri}"))?;
            return Ok(ArtifactUri::Http(url));
        }

        if uri.starts_with("file:") {
            let url = Url::parse(uri).with_context(|| format!("Invalid file URL {uri}"))?;
            let path = url
                .to_file_path()
                .map_err(|_| anyhow::anyhow!("Invalid file URL {uri}"))?;
            return Ok(ArtifactUri::Local(path));
        }

        if let Some((scheme, _)) = uri.split_once("://") {
            bail!("Unsupported artifact scheme {scheme} in {uri}");
        }

        Ok(ArtifactUri::Local(PathBuf::from(uri)))
    }

    /// Resolves `name` relative to this reference, as a file inside an artifact directory.
    pub fn join(&self, name: &str) -> ArtifactUri {
        let name = name.trim_matches('/');
        match self {
            ArtifactUri::Run { run_id, path } => ArtifactUri::Run {
                run_id: run_id.clone(),
                path: format!("{path}/{name}"),
            },
            ArtifactUri::S3 { bucket, key } => ArtifactUri::S3 {
                bucket: bucket.clone(),
                key: format!("{key}/{name}"),
            },
            ArtifactUri::Hub {
                repo_id,
                revision,
                path,
            } => ArtifactUri::Hub {
                repo_id: repo_id.clone(),
                revision: revision.clone(),
                path: format!("{path}/{name}"),
            },
            ArtifactUri::Http(url) => {
                let mut url = url.clone();
                let joined = format!("{}/{name}", url.path().trim_end_matches('/'));
                url.set_path(&joined);
                ArtifactUri::Http(url)
            }
            ArtifactUri::Local(path) => ArtifactUri::Local(path.join(name)),
        }
    }
}

impl Display for ArtifactUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactUri::Run { run_id, path } => write!(f, "runs:/{run_id}/{path}"),
            ArtifactUri::S3 { bucket, key } => write!(f, "s3://{bucket}/{key}"),
            ArtifactUri::Hub {
                repo_id,
                revision,
                path,
            } => write!(f, "hf://{repo_id}@{revision}/{path}"),
            ArtifactUri::Http(url) => write!(f, "{url}"),
            ArtifactUri::Local(path) => write!(f, "{}", path.display()),
        }
    }
}
