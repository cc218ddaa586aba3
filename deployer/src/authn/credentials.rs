//! Scoped credential handle
//!
//! The key is parsed and persisted once per process. The file exists so child
//! processes (the docker CLI) can be pointed at it explicitly; it is never
//! exported through the parent process environment.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::authn::service_account::ServiceAccountKey;
use crate::errors::DeployError;
use crate::utils::sha256_hex;

static CREDENTIALS: OnceCell<Arc<Credentials>> = OnceCell::const_new();

/// Credentials for the invocation
#[derive(Debug)]
pub struct Credentials {
    key: Arc<ServiceAccountKey>,
    key_file: PathBuf,
}

impl Credentials {
    /// Process-wide credentials: loaded on first use, shared afterwards
    pub async fn acquire(dir: &Path, key_json: &SecretString) -> Result<Arc<Credentials>, DeployError> {
        CREDENTIALS
            .get_or_try_init(|| async move { Self::load(dir, key_json).await.map(Arc::new) })
            .await
            .cloned()
    }

    /// Parse the key and make sure it is on disk under `dir`
    ///
    /// An existing key file for the same account is reused, not rewritten.
    pub async fn load(dir: &Path, key_json: &SecretString) -> Result<Credentials, DeployError> {
        let key = ServiceAccountKey::from_json(key_json.expose_secret())?;
        let key_file = dir.join(key_file_name(&key.client_email));

        if fs::metadata(&key_file).await.is_ok() {
            debug!(path = %key_file.display(), "Reusing credential file");
        } else {
            write_private(&key_file, key_json.expose_secret().as_bytes()).await?;
            debug!(path = %key_file.display(), "Wrote credential file");
        }

        Ok(Self {
            key: Arc::new(key),
            key_file,
        })
    }

    pub fn key(&self) -> Arc<ServiceAccountKey> {
        self.key.clone()
    }

    /// Project the key belongs to; all resources are addressed in it
    pub fn project_id(&self) -> &str {
        &self.key.project_id
    }

    pub fn key_file(&self) -> &Path {
        &self.key_file
    }

    /// Remove the key file at the end of the invocation
    pub async fn release(&self) {
        match fs::remove_file(&self.key_file).await {
            Ok(()) => debug!(path = %self.key_file.display(), "Removed credential file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.key_file.display(), error = %e, "Failed to remove credential file"),
        }
    }
}

fn key_file_name(client_email: &str) -> String {
    let digest = sha256_hex(client_email.as_bytes());
    format!("cloudrun-deployer-{}.json", &digest[..16])
}

/// Write owner-only, via a temporary file and a rename
async fn write_private(path: &Path, contents: &[u8]) -> Result<(), DeployError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4()));
    let mut file = fs::File::create(&temp_path).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600)).await?;
    }

    fs::rename(&temp_path, path).await?;
    Ok(())
}
