// ABOUTME: SSH session management using russh.
// ABOUTME: Connects, authenticates, and runs one-shot commands with a timeout.

use super::error::{Error, Result};
use russh::client::{self, Config, Handle};
use russh::keys::agent::client::AgentClient;
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key, ssh_key};
use russh::{ChannelMsg, Disconnect};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::UnixStream;

/// Configuration for establishing an SSH session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Private key to use. When unset the agent is tried, then `~/.ssh/id_*`.
    pub key_path: Option<PathBuf>,
    /// Accept and record unknown host keys.
    pub trust_on_first_use: bool,
    /// Alternate known_hosts file (defaults to `~/.ssh/known_hosts`).
    pub known_hosts_path: Option<PathBuf>,
    /// Upper bound for a single remote command.
    pub command_timeout: Duration,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            key_path: None,
            trust_on_first_use: false,
            known_hosts_path: None,
            command_timeout: Duration::from_secs(300),
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_path = Some(path.into());
        self
    }

    pub fn trust_on_first_use(mut self, tofu: bool) -> Self {
        self.trust_on_first_use = tofu;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// `user@host:port`, used in messages.
    pub fn destination(&self) -> String {
        format!("{}@{}:{}", self.user, self.host, self.port)
    }
}

/// Output from a remote command execution.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: u32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Host key verification against known_hosts.
pub(crate) struct HostKeyVerifier {
    host: String,
    port: u16,
    trust_on_first_use: bool,
    known_hosts_path: Option<PathBuf>,
}

impl HostKeyVerifier {
    fn learn(&self, key: &ssh_key::PublicKey) {
        let learned = match &self.known_hosts_path {
            Some(path) => learn_known_hosts_path(&self.host, self.port, key, path),
            None => learn_known_hosts(&self.host, self.port, key),
        };
        if let Err(e) = learned {
            tracing::warn!("Failed to record host key for {}: {}", self.host, e);
        }
    }
}

impl client::Handler for HostKeyVerifier {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let known = match &self.known_hosts_path {
            Some(path) => check_known_hosts_path(&self.host, self.port, server_public_key, path),
            None => check_known_hosts(&self.host, self.port, server_public_key),
        };

        match known {
            Ok(true) => Ok(true),
            // A changed key is never accepted, even with TOFU.
            Err(russh::keys::Error::KeyChanged { .. }) => Ok(false),
            Ok(false) | Err(_) if self.trust_on_first_use => {
                tracing::warn!(
                    "Trust-On-First-Use: accepting unknown host key for {}:{}",
                    self.host,
                    self.port
                );
                self.learn(server_public_key);
                Ok(true)
            }
            Ok(false) | Err(_) => Ok(false),
        }
    }
}

enum Credentials {
    Agent(AgentClient<UnixStream>),
    KeyFile(Arc<ssh_key::PrivateKey>),
}

/// An established SSH session.
pub struct Session {
    config: SessionConfig,
    handle: Handle<HostKeyVerifier>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("destination", &self.config.destination())
            .finish()
    }
}

impl Session {
    /// Connect and authenticate.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let credentials = Self::credentials(&config).await?;

        let russh_config = Config {
            inactivity_timeout: Some(Duration::from_secs(30)),
            ..Default::default()
        };
        let verifier = HostKeyVerifier {
            host: config.host.clone(),
            port: config.port,
            trust_on_first_use: config.trust_on_first_use,
            known_hosts_path: config.known_hosts_path.clone(),
        };

        let mut handle = client::connect(
            Arc::new(russh_config),
            (config.host.as_str(), config.port),
            verifier,
        )
        .await
        .map_err(|e| Error::Connection {
            host: config.host.clone(),
            port: config.port,
            reason: e.to_string(),
        })?;

        if !Self::authenticate(&mut handle, &config.user, credentials).await? {
            return Err(Error::AuthenticationFailed(config.destination()));
        }

        tracing::debug!("SSH session established to {}", config.destination());
        Ok(Self { config, handle })
    }

    async fn credentials(config: &SessionConfig) -> Result<Credentials> {
        if let Some(key_path) = &config.key_path {
            let key = load_secret_key(key_path, None).map_err(|e| Error::KeyLoadFailed {
                path: key_path.clone(),
                reason: e.to_string(),
            })?;
            return Ok(Credentials::KeyFile(Arc::new(key)));
        }

        if let Ok(agent) = AgentClient::connect_env().await {
            return Ok(Credentials::Agent(agent));
        }

        let home = std::env::var("HOME").map_err(|_| {
            Error::AgentUnavailable("SSH agent not available and HOME not set".to_string())
        })?;

        ["id_ed25519", "id_rsa", "id_ecdsa"]
            .iter()
            .find_map(|name| load_secret_key(format!("{home}/.ssh/{name}"), None).ok())
            .map(|key| Credentials::KeyFile(Arc::new(key)))
            .ok_or_else(|| {
                Error::AgentUnavailable("SSH agent not available and no default keys found".into())
            })
    }

    async fn authenticate(
        handle: &mut Handle<HostKeyVerifier>,
        user: &str,
        credentials: Credentials,
    ) -> Result<bool> {
        match credentials {
            Credentials::Agent(mut agent) => {
                let keys = agent.request_identities().await.map_err(|e| {
                    Error::AgentUnavailable(format!("failed to list agent keys: {}", e))
                })?;

                for key in keys {
                    match handle
                        .authenticate_publickey_with(user, key, None, &mut agent)
                        .await
                    {
                        Ok(result) if result.success() => return Ok(true),
                        _ => continue,
                    }
                }
                Ok(false)
            }
            Credentials::KeyFile(key) => {
                let hash_alg = handle.best_supported_rsa_hash().await?.flatten();
                let result = handle
                    .authenticate_publickey(user, PrivateKeyWithHashAlg::new(key, hash_alg))
                    .await?;
                Ok(result.success())
            }
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run a command with the session's default timeout.
    pub async fn exec(&self, command: &str) -> Result<CommandOutput> {
        self.exec_with_timeout(command, self.config.command_timeout)
            .await
    }

    /// Run a command, failing with `CommandTimeout` once `timeout` elapses.
    pub async fn exec_with_timeout(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        tokio::time::timeout(timeout, self.exec_inner(command))
            .await
            .map_err(|_| Error::CommandTimeout(timeout))?
    }

    async fn exec_inner(&self, command: &str) -> Result<CommandOutput> {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let exit_code = self
            .exec_streaming(command, &mut stdout, &mut stderr)
            .await?;
        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }

    /// Run a command without a timeout, copying its output as it arrives.
    ///
    /// Returns the exit status once the remote side closes the channel.
    pub async fn exec_streaming<O, E>(
        &self,
        command: &str,
        stdout: &mut O,
        stderr: &mut E,
    ) -> Result<u32>
    where
        O: AsyncWrite + Unpin + Send,
        E: AsyncWrite + Unpin + Send,
    {
        tracing::trace!("ssh exec: {}", command);

        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| Error::CommandFailed(format!("failed to open channel: {}", e)))?;
        channel
            .exec(true, command)
            .await
            .map_err(|e| Error::CommandFailed(format!("failed to exec command: {}", e)))?;

        let mut exit_code = None;
        let mut eof = false;

        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { data } => {
                    stdout.write_all(&data).await?;
                    stdout.flush().await?;
                }
                ChannelMsg::ExtendedData { data, ext: 1 } => {
                    stderr.write_all(&data).await?;
                    stderr.flush().await?;
                }
                ChannelMsg::ExitStatus { exit_status } => {
                    exit_code = Some(exit_status);
                    if eof {
                        break;
                    }
                }
                ChannelMsg::Eof => {
                    eof = true;
                    if exit_code.is_some() {
                        break;
                    }
                }
                ChannelMsg::Close => break,
                _ => {}
            }
        }

        exit_code.ok_or(Error::ChannelClosed)
    }

    /// Close the session.
    pub async fn disconnect(self) -> Result<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}
