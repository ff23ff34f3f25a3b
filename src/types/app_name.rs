// ABOUTME: Application name validation.
// ABOUTME: The name doubles as the unix account and the systemd unit prefix.

use super::slot::Slot;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppNameError {
    #[error("app name cannot be empty")]
    Empty,

    #[error("app name exceeds maximum length of 32 characters")]
    TooLong,

    #[error("app name must start with a lowercase letter")]
    InvalidStart,

    #[error("app name must be lowercase")]
    NotLowercase,

    #[error("invalid character in app name: '{0}'")]
    InvalidChar(char),
}

/// Name of the deployed application.
///
/// Restricted to what `useradd` accepts by default so the same string can be
/// used as the account name, the home directory and the unit prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppName(String);

impl AppName {
    pub fn new(value: &str) -> Result<Self, AppNameError> {
        let Some(first) = value.chars().next() else {
            return Err(AppNameError::Empty);
        };

        if value.len() > 32 {
            return Err(AppNameError::TooLong);
        }

        if !first.is_ascii_lowercase() {
            return Err(if first.is_ascii_uppercase() {
                AppNameError::NotLowercase
            } else {
                AppNameError::InvalidStart
            });
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(AppNameError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' && c != '_' {
                return Err(AppNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Home directory of the application account.
    pub fn home_dir(&self) -> String {
        format!("/home/{}", self.0)
    }

    /// systemd unit name for one slot, e.g. `shop-green`.
    pub fn unit(&self, slot: Slot) -> String {
        format!("{}-{}", self.0, slot)
    }

    /// Directory the slot's artifact is synced into.
    pub fn slot_dir(&self, slot: Slot) -> String {
        format!("{}/app-{}", self.home_dir(), slot)
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
