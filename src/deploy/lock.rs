// ABOUTME: Deploy lock preventing concurrent swaps on one host.
// ABOUTME: An exclusive mkdir is the lock; owner.json inside it only describes the holder.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostics, Warning};
use crate::host::HostOps;
use crate::types::AppName;

use super::DeployError;

/// File inside the lock directory describing the holder.
const OWNER_FILE: &str = "owner.json";

/// Information about who holds a deploy lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine running the controller.
    pub holder: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub app: String,
}

impl LockInfo {
    pub fn new(app: &AppName) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
            app: app.to_string(),
        }
    }

    /// Older than an hour. Only used in messages; stale locks are never broken automatically.
    pub fn is_stale(&self) -> bool {
        let age = Utc::now() - self.started_at;
        age.num_hours() >= 1
    }
}

/// A held deploy lock.
///
/// The lock directory's existence is authoritative. Release is explicit
/// (there is no async drop), so prefer [`DeployLock::with_lock`], which
/// releases on success, failure and panic alike.
#[derive(Debug, Clone)]
pub struct DeployLock {
    path: String,
}

impl DeployLock {
    /// Create the lock directory, failing fast if it already exists.
    pub async fn acquire<H: HostOps + ?Sized>(
        host: &H,
        path: &str,
        app: &AppName,
    ) -> Result<Self, DeployError> {
        let created = host
            .create_dir_exclusive(path)
            .await
            .map_err(DeployError::host("acquire deploy lock"))?;

        if !created {
            let holder = Self::inspect(host, path).await.unwrap_or(None);
            return Err(DeployError::LockHeld {
                path: path.to_string(),
                holder,
            });
        }

        let lock = Self {
            path: path.to_string(),
        };

        let info = serde_json::to_string(&LockInfo::new(app))
            .map_err(|e| DeployError::Lock(format!("failed to serialize lock info: {}", e)))?;
        if let Err(e) = host.write_file(&lock.owner_path(), &info).await {
            // The directory alone is the lock; a missing owner file only hurts messages.
            tracing::debug!("Could not record lock owner in {}: {}", lock.path, e);
        }

        tracing::debug!("Acquired deploy lock {}", lock.path);
        Ok(lock)
    }

    /// Remove the lock directory.
    pub async fn release<H: HostOps + ?Sized>(self, host: &H) -> Result<(), DeployError> {
        host.remove_all(&self.path)
            .await
            .map_err(DeployError::host("release deploy lock"))?;
        tracing::debug!("Released deploy lock {}", self.path);
        Ok(())
    }

    /// Holder recorded in an existing lock, if readable.
    pub async fn inspect<H: HostOps + ?Sized>(
        host: &H,
        path: &str,
    ) -> Result<Option<LockInfo>, DeployError> {
        let contents = host
            .read_file(&owner_path(path))
            .await
            .map_err(DeployError::host("read deploy lock"))?;
        Ok(contents.and_then(|json| serde_json::from_str(&json).ok()))
    }

    /// Remove a lock left behind by a crashed run.
    ///
    /// Returns the holder that was recorded in it, if any.
    pub async fn force_release<H: HostOps + ?Sized>(
        host: &H,
        path: &str,
    ) -> Result<Option<LockInfo>, DeployError> {
        let holder = Self::inspect(host, path).await?;
        if let Some(info) = &holder {
            tracing::warn!(
                "Removing deploy lock held by {} (pid {}) since {}",
                info.holder,
                info.pid,
                info.started_at
            );
        }
        host.remove_all(path)
            .await
            .map_err(DeployError::host("remove deploy lock"))?;
        Ok(holder)
    }

    /// Run `body` while holding the lock.
    ///
    /// The lock is released on every exit path, including a panic inside
    /// `body`, which is re-raised after release. A release failure is
    /// recorded in `diagnostics` and does not mask the body's result.
    pub async fn with_lock<H, F, Fut, T>(
        host: &H,
        path: &str,
        app: &AppName,
        diagnostics: &mut Diagnostics,
        body: F,
    ) -> Result<T, DeployError>
    where
        H: HostOps + ?Sized,
        F: FnOnce(DeployLock) -> Fut,
        Fut: Future<Output = Result<T, DeployError>>,
    {
        let lock = Self::acquire(host, path, app).await?;
        let outcome = AssertUnwindSafe(body(lock.clone())).catch_unwind().await;

        if let Err(e) = lock.release(host).await {
            diagnostics.warn(Warning::lock_release(format!(
                "{}; remove it manually with `slotswap unlock`",
                e
            )));
        }

        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn owner_path(&self) -> String {
        owner_path(&self.path)
    }
}

fn owner_path(lock_path: &str) -> String {
    format!("{}/{}", lock_path, OWNER_FILE)
}
