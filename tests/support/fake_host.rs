// ABOUTME: In-memory HostOps implementation for controller tests.
// ABOUTME: Records every primitive and answers HTTP probes from per-endpoint scripts.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use slotswap::host::{HostError, HostOps, HttpMethod, HttpProbe, HttpReply, UnitAction};

/// One recorded host primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Read(String),
    Write { path: String, contents: String },
    Mkdir(String),
    Remove(String),
    Unit(UnitAction, String),
    IsActive(String),
    Http {
        method: HttpMethod,
        port: u16,
        path: String,
        body: Option<String>,
    },
}

/// Scripted answer for an HTTP endpoint.
#[derive(Debug, Clone)]
pub enum Response {
    Reply(u16, String),
    Unreachable,
    /// Never answers; the caller's timeout has to fire.
    Hang,
}

impl Response {
    pub fn ok(body: impl Into<String>) -> Self {
        Response::Reply(200, body.into())
    }

    pub fn count(count: u32) -> Self {
        Response::ok(format!("{{\"count\":{count}}}"))
    }
}

#[derive(Default)]
struct State {
    files: HashMap<String, String>,
    dirs: HashSet<String>,
    running: HashSet<String>,
    crashing: HashSet<String>,
    failing_units: HashMap<(UnitAction, String), u32>,
    failing_writes: HashSet<String>,
    failing_removes: HashSet<String>,
    http: HashMap<(u16, String), VecDeque<Response>>,
    slow_http: bool,
    calls: Vec<Call>,
}

/// A host that lives entirely in memory.
///
/// Units started here keep running unless marked as crashing. Each HTTP
/// endpoint answers from a queue; the last entry repeats forever and an
/// endpoint without a script is unreachable.
#[derive(Default)]
pub struct FakeHost {
    state: Mutex<State>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: &str, contents: &str) -> Self {
        self.state
            .lock()
            .files
            .insert(path.to_string(), contents.to_string());
        self
    }

    pub fn with_dir(self, path: &str) -> Self {
        self.state.lock().dirs.insert(path.to_string());
        self
    }

    pub fn with_running(self, unit: &str) -> Self {
        self.state.lock().running.insert(unit.to_string());
        self
    }

    /// The unit starts but its process exits right away.
    pub fn crashing(self, unit: &str) -> Self {
        self.state.lock().crashing.insert(unit.to_string());
        self
    }

    pub fn failing_unit(self, action: UnitAction, unit: &str, status: u32) -> Self {
        self.state
            .lock()
            .failing_units
            .insert((action, unit.to_string()), status);
        self
    }

    pub fn failing_write(self, path: &str) -> Self {
        self.state.lock().failing_writes.insert(path.to_string());
        self
    }

    pub fn failing_remove(self, path: &str) -> Self {
        self.state.lock().failing_removes.insert(path.to_string());
        self
    }

    /// Every HTTP call yields to the scheduler once before answering,
    /// like a request that has to cross the network.
    pub fn slow_http(self) -> Self {
        self.state.lock().slow_http = true;
        self
    }

    pub fn respond(self, port: u16, path: &str, responses: Vec<Response>) -> Self {
        self.state
            .lock()
            .http
            .insert((port, path.to_string()), responses.into());
        self
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.state.lock().files.get(path).cloned()
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.state.lock().dirs.contains(path)
    }

    pub fn is_running(&self, unit: &str) -> bool {
        self.state.lock().running.contains(unit)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn unit_calls(&self) -> Vec<(UnitAction, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Unit(action, unit) => Some((action, unit)),
                _ => None,
            })
            .collect()
    }

    /// Contents written to `path`, in order.
    pub fn writes_to(&self, path: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Write { path: p, contents } if p == path => Some(contents),
                _ => None,
            })
            .collect()
    }

    /// Requests sent to `port` and `path`, as their bodies.
    pub fn requests_to(&self, port: u16, path: &str) -> Vec<Option<String>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Http {
                    port: p,
                    path: q,
                    body,
                    ..
                } if p == port && q == path => Some(body),
                _ => None,
            })
            .collect()
    }

    /// Index of the first call matching `predicate`.
    pub fn position(&self, predicate: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls().iter().position(predicate)
    }

    fn record(&self, call: Call) {
        self.state.lock().calls.push(call);
    }
}

fn failed(command: String, status: u32) -> HostError {
    HostError::CommandFailed {
        command,
        status,
        stderr: "injected failure".to_string(),
    }
}

#[async_trait]
impl HostOps for FakeHost {
    async fn read_file(&self, path: &str) -> Result<Option<String>, HostError> {
        self.record(Call::Read(path.to_string()));
        Ok(self.file(path))
    }

    async fn write_file(&self, path: &str, contents: &str) -> Result<(), HostError> {
        self.record(Call::Write {
            path: path.to_string(),
            contents: contents.to_string(),
        });
        let mut state = self.state.lock();
        if state.failing_writes.contains(path) {
            return Err(failed(format!("write {path}"), 1));
        }
        state.files.insert(path.to_string(), contents.to_string());
        Ok(())
    }

    async fn create_dir_exclusive(&self, path: &str) -> Result<bool, HostError> {
        self.record(Call::Mkdir(path.to_string()));
        Ok(self.state.lock().dirs.insert(path.to_string()))
    }

    async fn remove_all(&self, path: &str) -> Result<(), HostError> {
        self.record(Call::Remove(path.to_string()));
        let mut state = self.state.lock();
        if state.failing_removes.contains(path) {
            return Err(failed(format!("rm -rf {path}"), 1));
        }
        let prefix = format!("{path}/");
        state.dirs.retain(|dir| dir != path && !dir.starts_with(&prefix));
        state
            .files
            .retain(|file, _| file != path && !file.starts_with(&prefix));
        Ok(())
    }

    async fn unit(&self, action: UnitAction, unit: &str) -> Result<(), HostError> {
        self.record(Call::Unit(action, unit.to_string()));
        let mut state = self.state.lock();
        if let Some(status) = state.failing_units.get(&(action, unit.to_string())) {
            return Err(failed(format!("systemctl {action} {unit}"), *status));
        }
        match action {
            UnitAction::Start if !state.crashing.contains(unit) => {
                state.running.insert(unit.to_string());
            }
            UnitAction::Stop => {
                state.running.remove(unit);
            }
            _ => {}
        }
        Ok(())
    }

    async fn is_active(&self, unit: &str) -> Result<bool, HostError> {
        self.record(Call::IsActive(unit.to_string()));
        Ok(self.is_running(unit))
    }

    async fn http(&self, probe: &HttpProbe) -> Result<HttpReply, HostError> {
        self.record(Call::Http {
            method: probe.method,
            port: probe.port,
            path: probe.path.clone(),
            body: probe.body.clone(),
        });

        let slow = self.state.lock().slow_http;
        if slow {
            tokio::task::yield_now().await;
        }

        let response = {
            let mut state = self.state.lock();
            match state.http.get_mut(&(probe.port, probe.path.clone())) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match response {
            Some(Response::Reply(status, body)) => Ok(HttpReply { status, body }),
            Some(Response::Hang) => futures::future::pending().await,
            Some(Response::Unreachable) | None => Err(HostError::Unreachable {
                port: probe.port,
                reason: "connection refused".to_string(),
            }),
        }
    }
}
