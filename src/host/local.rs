// ABOUTME: Host primitives executed on the machine the controller runs on.
// ABOUTME: Used by `slotswap swap` when the controller is started on the host itself.

use super::error::HostError;
use super::{HostOps, HttpMethod, HttpProbe, HttpReply, UnitAction};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::net::TcpStream;
use tokio::process::Command;

/// Runs `systemctl` and touches the filesystem directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalHost;

impl LocalHost {
    pub fn new() -> Self {
        Self
    }

    async fn systemctl(&self, args: &[&str]) -> Result<std::process::Output, HostError> {
        Command::new("systemctl")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| HostError::LocalIo {
                action: "spawn",
                path: "systemctl".to_string(),
                source,
            })
    }

    async fn send(&self, probe: &HttpProbe) -> Result<HttpReply, HostError> {
        let unreachable = |reason: String| HostError::Unreachable {
            port: probe.port,
            reason,
        };

        let stream = TcpStream::connect(("127.0.0.1", probe.port))
            .await
            .map_err(|e| unreachable(e.to_string()))?;
        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| unreachable(format!("HTTP handshake failed: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!("probe connection closed with error: {}", e);
            }
        });

        let method = match probe.method {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        };
        let mut request = hyper::Request::builder()
            .method(method)
            .uri(probe.path.as_str())
            .header("Host", format!("localhost:{}", probe.port));
        if probe.body.is_some() {
            request = request.header("Content-Type", "application/json");
        }
        let body = Full::new(Bytes::from(probe.body.clone().unwrap_or_default()));
        let request = request
            .body(body)
            .map_err(|e| unreachable(format!("failed to build request: {}", e)))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| unreachable(format!("request failed: {}", e)))?;
        let status = response.status().as_u16();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| unreachable(format!("failed to read response: {}", e)))?
            .to_bytes();

        Ok(HttpReply {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

#[async_trait]
impl HostOps for LocalHost {
    async fn read_file(&self, path: &str) -> Result<Option<String>, HostError> {
        Ok(tokio::fs::read_to_string(path).await.ok())
    }

    async fn write_file(&self, path: &str, contents: &str) -> Result<(), HostError> {
        let tmp = format!("{path}.tmp");
        tokio::fs::write(&tmp, contents)
            .await
            .map_err(|source| HostError::LocalIo {
                action: "write",
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|source| HostError::LocalIo {
                action: "rename",
                path: path.to_string(),
                source,
            })
    }

    async fn create_dir_exclusive(&self, path: &str) -> Result<bool, HostError> {
        match tokio::fs::create_dir(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(source) => Err(HostError::LocalIo {
                action: "mkdir",
                path: path.to_string(),
                source,
            }),
        }
    }

    async fn remove_all(&self, path: &str) -> Result<(), HostError> {
        let removed = match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
            Ok(_) => tokio::fs::remove_file(path).await,
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        };
        removed.map_err(|source| HostError::LocalIo {
            action: "remove",
            path: path.to_string(),
            source,
        })
    }

    async fn unit(&self, action: UnitAction, unit: &str) -> Result<(), HostError> {
        let output = self.systemctl(&[action.as_str(), unit]).await?;
        if output.status.success() {
            return Ok(());
        }
        Err(HostError::CommandFailed {
            command: format!("systemctl {} {}", action, unit),
            status: output.status.code().map(|c| c as u32).unwrap_or(1),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn is_active(&self, unit: &str) -> Result<bool, HostError> {
        let output = self.systemctl(&["is-active", "--quiet", unit]).await?;
        Ok(output.status.success())
    }

    async fn http(&self, probe: &HttpProbe) -> Result<HttpReply, HostError> {
        tokio::time::timeout(probe.timeout, self.send(probe))
            .await
            .map_err(|_| HostError::Unreachable {
                port: probe.port,
                reason: format!("timed out after {:?}", probe.timeout),
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_replaces_file_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("active");
        let path = path.to_str().unwrap();
        let host = LocalHost::new();

        host.write_file(path, "blue\n").await.unwrap();
        host.write_file(path, "green\n").await.unwrap();

        assert_eq!(host.read_file(path).await.unwrap().as_deref(), Some("green\n"));
        assert!(!std::path::Path::new(&format!("{path}.tmp")).exists());
    }

    #[tokio::test]
    async fn exclusive_dir_is_created_once() {
        let dir = tempfile::tempdir().unwrap();
        let lock = dir.path().join("deploy.lock");
        let lock = lock.to_str().unwrap();
        let host = LocalHost::new();

        assert!(host.create_dir_exclusive(lock).await.unwrap());
        assert!(!host.create_dir_exclusive(lock).await.unwrap());

        host.remove_all(lock).await.unwrap();
        host.remove_all(lock).await.unwrap();
        assert!(host.create_dir_exclusive(lock).await.unwrap());
    }

    #[tokio::test]
    async fn missing_file_reads_as_none() {
        let host = LocalHost::new();
        assert!(
            host.read_file("/nonexistent/slotswap/active")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let probe = HttpProbe::get(port, "/", std::time::Duration::from_secs(1));
        let err = LocalHost::new().http(&probe).await.unwrap_err();
        assert_eq!(err.kind(), crate::host::HostErrorKind::Unreachable);
    }
}
