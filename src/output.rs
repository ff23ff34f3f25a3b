// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON-lines output modes.

use serde::Serialize;
use std::time::Instant;

use crate::diagnostics::Warning;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

impl OutputMode {
    pub fn from_flags(quiet: bool, json: bool) -> Self {
        if json {
            OutputMode::Json
        } else if quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Normal
        }
    }
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Report a step: a human line in normal mode, the event itself in JSON mode.
    pub fn step<E: Serialize>(&self, message: &str, event: &E) {
        match self.mode {
            OutputMode::Normal => println!("  → {message}"),
            OutputMode::Quiet => {}
            OutputMode::Json => print_json(event),
        }
    }

    /// Print collected warnings.
    pub fn warnings(&self, warnings: &[Warning]) {
        for warning in warnings {
            match self.mode {
                OutputMode::Normal | OutputMode::Quiet => {
                    eprintln!("Warning: {}", warning.message);
                }
                OutputMode::Json => print_json(&WarningEvent {
                    event: "warning",
                    warning,
                }),
            }
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => println!("{message}"),
            OutputMode::Json => print_json(&JsonEvent {
                event: "success",
                message,
                duration_secs: self.duration(),
                exit_code: None,
            }),
        }
    }

    /// Print an error message together with the exit code the process will use.
    pub fn error(&self, message: &str, exit_code: i32) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Error: {message}"),
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "error",
                    message,
                    duration_secs: self.duration(),
                    exit_code: Some(exit_code),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    if let Ok(json) = serde_json::to_string(value) {
        println!("{json}");
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exit_code: Option<i32>,
}

#[derive(Serialize)]
struct WarningEvent<'a> {
    event: &'a str,
    #[serde(flatten)]
    warning: &'a Warning,
}
