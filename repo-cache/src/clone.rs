//! Bare-clone/fetch of a single repository into the local cache directory.
//!
//! Clones are bare and shared across every pipeline stage that needs a
//! working tree (`rename_chain` resolution reads directly off the
//! on-disk object database without checking out a worktree).

use std::{
    fs,
    path::{Path, PathBuf},
};

use git2::{Cred, CredentialType, FetchOptions, RemoteCallbacks, Repository, build::RepoBuilder};
use tokio::task;
use tracing::{debug, info, instrument, warn};

use crate::errors::Result;

/// Root directory under which every repo's bare clone lives, one
/// subdirectory per `repo_id`.
pub fn cache_root(base_dir: &Path, repo_id: uuid::Uuid) -> PathBuf {
    base_dir.join(repo_id.to_string())
}

/// Clones `clone_url` as a bare repo if it isn't already cached, otherwise
/// fetches new refs into the existing clone. Runs the blocking libgit2
/// work on a `spawn_blocking` thread so callers can await it alongside
/// other async I/O.
#[instrument(skip(clone_url), fields(repo_id = %repo_id))]
pub async fn ensure_cloned(
    base_dir: PathBuf,
    repo_id: uuid::Uuid,
    clone_url: String,
) -> Result<PathBuf> {
    task::spawn_blocking(move || {
        let target = cache_root(&base_dir, repo_id);
        if target.join("HEAD").exists() {
            debug!(path = %target.display(), "repo already cloned, fetching");
            fetch_blocking(&target)?;
        } else {
            fs::create_dir_all(&target)?;
            clone_bare_blocking(&clone_url, &target)?;
        }
        Ok(target)
    })
    .await?
}

fn credential_callbacks() -> RemoteCallbacks<'static> {
    let key_path_env = std::env::var("SSH_KEY_PATH").ok();
    let key_path_disk = Path::new("ssh_keys/bot_key");
    let have_disk_key = key_path_disk.exists();

    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |url_str, username_from_url, allowed| {
        let user = username_from_url.unwrap_or("git");

        if url_str.starts_with("http") {
            if let Ok(token) = std::env::var("GIT_HTTP_TOKEN") {
                let http_user = std::env::var("GIT_HTTP_USER").unwrap_or_else(|_| "oauth2".into());
                return Cred::userpass_plaintext(&http_user, &token);
            }
        }

        if allowed.contains(CredentialType::SSH_KEY) {
            if let Some(ref key) = key_path_env {
                let key_path = Path::new(key);
                if key_path.exists() {
                    let pass = std::env::var("SSH_KEY_PASSPHRASE").ok();
                    return Cred::ssh_key(user, None, key_path, pass.as_deref());
                }
            }
            if have_disk_key {
                let pass = std::env::var("SSH_KEY_PASSPHRASE").ok();
                return Cred::ssh_key(user, None, key_path_disk, pass.as_deref());
            }
            if let Ok(cred) = Cred::ssh_key_from_agent(user) {
                return Ok(cred);
            }
        }

        if allowed.contains(CredentialType::DEFAULT) {
            if let Ok(cred) = Cred::default() {
                return Ok(cred);
            }
        }

        if allowed.contains(CredentialType::USERNAME) {
            return Cred::username(user);
        }

        Err(git2::Error::from_str("no usable credentials"))
    });

    callbacks
}

fn clone_bare_blocking(url: &str, target: &Path) -> Result<()> {
    let mut fetch_opts = FetchOptions::new();
    fetch_opts.remote_callbacks(credential_callbacks());

    let mut builder = RepoBuilder::new();
    builder.bare(true);
    builder.fetch_options(fetch_opts);

    info!(path = %target.display(), "begin bare clone");
    match builder.clone(url, target) {
        Ok(_) => {
            info!(path = %target.display(), "clone completed");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "clone failed");
            Err(e.into())
        }
    }
}

fn fetch_blocking(target: &Path) -> Result<()> {
    let repo = Repository::open(target)?;
    let mut remote = repo.find_remote("origin")?;

    let mut fetch_opts = FetchOptions::new();
    fetch_opts.remote_callbacks(credential_callbacks());

    remote.fetch::<&str>(&[], Some(&mut fetch_opts), None)?;
    debug!(path = %target.display(), "fetch completed");
    Ok(())
}
