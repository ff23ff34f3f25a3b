// ABOUTME: Operator console for a running swap: keypress force and Ctrl-C interrupt.
// ABOUTME: Raw mode is only held while a drain is waiting, so normal output stays readable.

use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use parking_lot::Mutex;
use slotswap::deploy::{Signal, SignalTrigger, Signals, SwapEvent};

const KEY_POLL: Duration = Duration::from_millis(100);

struct RawModeGuard(bool);

impl RawModeGuard {
    fn new() -> Self {
        match enable_raw_mode() {
            Ok(()) => Self(true),
            Err(e) => {
                tracing::debug!("Failed to enable raw mode: {}", e);
                Self(false)
            }
        }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.0 {
            let _ = disable_raw_mode();
        }
    }
}

struct Listener {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Turns operator input into swap signals.
pub struct OperatorConsole {
    interactive: bool,
    triggers: Mutex<Option<(SignalTrigger, SignalTrigger)>>,
    listener: Mutex<Option<Listener>>,
}

impl OperatorConsole {
    /// Console plus the signals to hand to the swap.
    ///
    /// Ctrl-C always interrupts. Keypresses are only read when stdin and
    /// stdout are terminals and `interactive` is set.
    pub fn new(interactive: bool) -> (Arc<Self>, Signals) {
        let (force_trigger, force) = Signal::channel();
        let (key_interrupt, key_interrupt_signal) = Signal::channel();

        let interrupt = Signal::from_future(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if result.is_err() {
                        futures::future::pending::<()>().await;
                    }
                }
                () = key_interrupt_signal => {}
            }
        });

        let interactive = interactive && io::stdin().is_terminal() && io::stdout().is_terminal();
        let console = Arc::new(Self {
            interactive,
            triggers: Mutex::new(Some((force_trigger, key_interrupt))),
            listener: Mutex::new(None),
        });
        (console, Signals { force, interrupt })
    }

    /// React to swap progress: listen for keys only while draining.
    pub fn on_event(&self, event: &SwapEvent) {
        match event {
            SwapEvent::TrafficSplit { .. } => self.start_listening(),
            SwapEvent::Drained { .. } | SwapEvent::CutOver { .. } => self.stop_listening(),
            _ => {}
        }
    }

    fn start_listening(&self) {
        if !self.interactive {
            return;
        }
        let Some((force, interrupt)) = self.triggers.lock().take() else {
            return;
        };

        println!("  Waiting for pinned sessions. Press any key to stop waiting, Ctrl-C to abort.");
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let thread = std::thread::spawn(move || read_keys(&thread_stop, force, interrupt));

        *self.listener.lock() = Some(Listener {
            stop,
            thread: Some(thread),
        });
    }

    fn stop_listening(&self) {
        self.listener.lock().take();
    }
}

impl Drop for OperatorConsole {
    fn drop(&mut self) {
        self.stop_listening();
    }
}

fn read_keys(stop: &AtomicBool, force: SignalTrigger, interrupt: SignalTrigger) {
    let _raw = RawModeGuard::new();

    while !stop.load(Ordering::SeqCst) {
        match event::poll(KEY_POLL) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                tracing::debug!("Stopped reading keys: {}", e);
                return;
            }
        }

        let Ok(Event::Key(key)) = event::read() else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            interrupt.fire();
        } else {
            force.fire();
        }
        return;
    }
}
