// ABOUTME: Host primitives executed over an SSH session.
// ABOUTME: Maps each primitive onto a single shell command with an exit-code contract.

use super::error::HostError;
use super::{HostOps, HttpMethod, HttpProbe, HttpReply, UnitAction, shell_quote};
use crate::ssh::{CommandOutput, Session};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::AsyncWrite;

/// Slack added to the SSH command timeout on top of curl's own `--max-time`.
const PROBE_SLACK: Duration = Duration::from_secs(5);

/// Drives the host through an established SSH session.
///
/// Privileged primitives (systemctl, files under the app's home) are wrapped
/// in `sudo -n` unless the session already logs in as root.
#[derive(Debug)]
pub struct SshHost {
    session: Session,
    sudo: bool,
}

impl SshHost {
    pub fn new(session: Session) -> Self {
        let sudo = session.config().user != "root";
        Self { session, sudo }
    }

    /// Connect with the given settings.
    pub async fn connect(config: crate::ssh::SessionConfig) -> Result<Self, HostError> {
        Ok(Self::new(Session::connect(config).await?))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Close the underlying session.
    pub async fn disconnect(self) -> Result<(), HostError> {
        Ok(self.session.disconnect().await?)
    }

    /// Override the sudo detection.
    pub fn with_sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    /// Run a long-lived command with the same privileges as the host
    /// primitives, copying its output as it arrives. Returns the exit status.
    pub async fn stream<O, E>(
        &self,
        command: &str,
        stdout: &mut O,
        stderr: &mut E,
    ) -> Result<u32, HostError>
    where
        O: AsyncWrite + Unpin + Send,
        E: AsyncWrite + Unpin + Send,
    {
        Ok(self
            .session
            .exec_streaming(&self.privileged(command), stdout, stderr)
            .await?)
    }

    fn privileged(&self, command: &str) -> String {
        if self.sudo {
            format!("sudo -n sh -c {}", shell_quote(command))
        } else {
            command.to_string()
        }
    }

    async fn run(&self, command: &str) -> Result<CommandOutput, HostError> {
        Ok(self.session.exec(&self.privileged(command)).await?)
    }

    async fn run_checked(&self, command: &str) -> Result<CommandOutput, HostError> {
        let output = self.run(command).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(HostError::CommandFailed {
                command: command.to_string(),
                status: output.exit_code,
                stderr: output.stderr,
            })
        }
    }
}

#[async_trait]
impl HostOps for SshHost {
    async fn read_file(&self, path: &str) -> Result<Option<String>, HostError> {
        let output = self
            .run(&format!("cat {} 2>/dev/null", shell_quote(path)))
            .await?;
        Ok(output.success().then_some(output.stdout))
    }

    async fn write_file(&self, path: &str, contents: &str) -> Result<(), HostError> {
        let tmp = format!("{path}.tmp");
        self.run_checked(&format!(
            "printf '%s' {} > {tmp} && mv -f {tmp} {path}",
            shell_quote(contents),
            tmp = shell_quote(&tmp),
            path = shell_quote(path),
        ))
        .await?;
        Ok(())
    }

    async fn create_dir_exclusive(&self, path: &str) -> Result<bool, HostError> {
        // mkdir is atomic on local filesystems: exactly one caller succeeds.
        let quoted = shell_quote(path);
        let output = self.run(&format!("mkdir {quoted}")).await?;
        if output.success() {
            return Ok(true);
        }

        let exists = self.run(&format!("test -d {quoted}")).await?;
        if exists.success() {
            Ok(false)
        } else {
            Err(HostError::CommandFailed {
                command: format!("mkdir {quoted}"),
                status: output.exit_code,
                stderr: output.stderr,
            })
        }
    }

    async fn remove_all(&self, path: &str) -> Result<(), HostError> {
        self.run_checked(&format!("rm -rf {}", shell_quote(path)))
            .await?;
        Ok(())
    }

    async fn unit(&self, action: UnitAction, unit: &str) -> Result<(), HostError> {
        self.run_checked(&format!("systemctl {} {}", action, shell_quote(unit)))
            .await?;
        Ok(())
    }

    async fn is_active(&self, unit: &str) -> Result<bool, HostError> {
        let output = self
            .run(&format!("systemctl is-active --quiet {}", shell_quote(unit)))
            .await?;
        Ok(output.success())
    }

    async fn http(&self, probe: &HttpProbe) -> Result<HttpReply, HostError> {
        let mut command = format!(
            "curl -s -o - -w '\\n%{{http_code}}' --max-time {:.1}",
            probe.timeout.as_secs_f64()
        );
        if probe.method == HttpMethod::Post {
            command.push_str(" -X POST -H 'Content-Type: application/json'");
            command.push_str(&format!(
                " --data {}",
                shell_quote(probe.body.as_deref().unwrap_or(""))
            ));
        }
        command.push(' ');
        command.push_str(&shell_quote(&probe.url()));

        // Probes never need root.
        let output = self
            .session
            .exec_with_timeout(&command, probe.timeout + PROBE_SLACK)
            .await?;
        if !output.success() {
            return Err(HostError::Unreachable {
                port: probe.port,
                reason: format!("curl exited with status {}", output.exit_code),
            });
        }

        parse_curl_output(probe.port, &output.stdout)
    }
}

/// Split curl's `body\nstatus` output.
fn parse_curl_output(port: u16, stdout: &str) -> Result<HttpReply, HostError> {
    let (body, status) = stdout.rsplit_once('\n').unwrap_or(("", stdout));
    let status: u16 = status.trim().parse().map_err(|_| HostError::Unreachable {
        port,
        reason: format!("unexpected curl output: {:?}", status),
    })?;
    if status == 0 {
        return Err(HostError::Unreachable {
            port,
            reason: "no HTTP status".to_string(),
        });
    }
    Ok(HttpReply {
        status,
        body: body.to_string(),
    })
}
