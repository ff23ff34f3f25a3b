// ABOUTME: One-shot external signals raced against the swap (operator force, interrupt).
// ABOUTME: A signal whose trigger is dropped never fires.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::oneshot;

/// A future that resolves once when the signal fires.
pub struct Signal(BoxFuture<'static, ()>);

/// Fires the paired [`Signal`].
#[derive(Debug)]
pub struct SignalTrigger(oneshot::Sender<()>);

impl Signal {
    pub fn never() -> Self {
        Self(futures::future::pending().boxed())
    }

    pub fn channel() -> (SignalTrigger, Signal) {
        let (tx, rx) = oneshot::channel();
        let signal = Self(
            async move {
                if rx.await.is_err() {
                    futures::future::pending::<()>().await;
                }
            }
            .boxed(),
        );
        (SignalTrigger(tx), signal)
    }

    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self(future.boxed())
    }
}

impl SignalTrigger {
    /// Fire the signal. Returns `false` if nobody is listening anymore.
    pub fn fire(self) -> bool {
        self.0.send(()).is_ok()
    }
}

impl Future for Signal {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        self.0.poll_unpin(cx)
    }
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Signal")
    }
}

/// Signals a swap listens to besides its own progress.
#[derive(Debug)]
pub struct Signals {
    /// Ends a graceful drain early.
    pub force: Signal,
    /// Aborts the run; reported as interrupted after the lock is released.
    pub interrupt: Signal,
}

impl Signals {
    pub fn none() -> Self {
        Self {
            force: Signal::never(),
            interrupt: Signal::never(),
        }
    }
}
