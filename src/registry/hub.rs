use std::path::PathBuf;

use anyhow::{Context, Result};
use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};

/// Fetches a file from a Hugging Face model repository into the local hub cache.
///
/// Blocking, call it from `spawn_blocking` inside the runtime.
pub fn fetch(repo_id: &str, revision: &str, path: &str) -> Result<PathBuf> {
    let api = Api::new().context("Failed to create hub API")?;
    let repo = api.repo(Repo::with_revision(
        repo_id.to_string(),
        RepoType::Model,
        revision.to_string(),
    ));
    repo.get(path)
        .with_context(|| format!("Failed to fetch {path} from {repo_id}@{revision}"))
}
