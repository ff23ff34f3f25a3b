// ABOUTME: Diagnostics accumulator for non-fatal warnings during a swap.
// ABOUTME: Collects recovered failures that should be shown to the operator without failing the run.

use serde::Serialize;

/// Collects non-fatal warnings during deploy operations.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Number of warnings of one kind.
    pub fn count(&self, kind: WarningKind) -> usize {
        self.warnings.iter().filter(|w| w.kind == kind).count()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

/// A non-fatal warning collected during a deploy.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn lock_release(message: impl Into<String>) -> Self {
        Self::new(WarningKind::LockRelease, message)
    }

    pub fn ssh_disconnect(message: impl Into<String>) -> Self {
        Self::new(WarningKind::SshDisconnect, message)
    }

    pub fn drain_notify(message: impl Into<String>) -> Self {
        Self::new(WarningKind::DrainNotify, message)
    }

    pub fn drain_count(message: impl Into<String>) -> Self {
        Self::new(WarningKind::DrainCountUnavailable, message)
    }

    pub fn drain_timeout(message: impl Into<String>) -> Self {
        Self::new(WarningKind::DrainTimeout, message)
    }

    pub fn service_stop(message: impl Into<String>) -> Self {
        Self::new(WarningKind::ServiceStop, message)
    }
}

/// Categories of warnings that can occur during a deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Failed to remove the deploy lock directory.
    LockRelease,
    /// Failed to cleanly disconnect the SSH session.
    SshDisconnect,
    /// The outgoing instance did not accept the drain request.
    DrainNotify,
    /// A pinned-session count could not be read and was treated as zero.
    DrainCountUnavailable,
    /// The drain deadline passed with sessions still pinned.
    DrainTimeout,
    /// Stopping a slot service failed and was tolerated.
    ServiceStop,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_starts_empty() {
        let diag = Diagnostics::default();
        assert!(!diag.has_warnings());
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn diagnostics_counts_by_kind() {
        let mut diag = Diagnostics::default();

        diag.warn(Warning::drain_count("port 8080 unreachable"));
        diag.warn(Warning::drain_count("port 8080 returned 500"));
        diag.warn(Warning::lock_release("rm failed"));

        assert!(diag.has_warnings());
        assert_eq!(diag.count(WarningKind::DrainCountUnavailable), 2);
        assert_eq!(diag.count(WarningKind::LockRelease), 1);
        assert_eq!(diag.count(WarningKind::DrainNotify), 0);
    }

    #[test]
    fn warning_kind_serializes_snake_case() {
        let json = serde_json::to_string(&Warning::drain_notify("refused")).unwrap();
        assert!(json.contains("\"kind\":\"drain_notify\""));
    }
}
