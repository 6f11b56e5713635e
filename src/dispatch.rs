//! Background dispatch of API calls.
//!
//! Each [`Dispatcher`] runs at most one job at a time on the tokio runtime and
//! reports the outcome as an event on an unbounded channel, so a UI loop can
//! poll results without blocking on network I/O. A job submitted while another
//! is in flight is dropped.

use futures_util::FutureExt;
use log::{debug, error};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::Result;

/// Events a dispatcher knows how to emit on its own
pub trait DispatchEvent: Send + 'static {
    /// Start/finish notification
    fn busy(busy: bool) -> Self;

    /// Terminal failure of a job, as a human-readable message
    fn failed(message: String) -> Self;
}

/// Flag marking an operation as in flight
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    /// Set the flag unless already set. The flag clears when the guard drops.
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(self.0.clone()))
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Clears its [`BusyFlag`] on drop, including when a job panics
#[derive(Debug)]
pub struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs one job at a time and reports its outcome as an event
pub struct Dispatcher<E> {
    name: &'static str,
    flag: BusyFlag,
    events: UnboundedSender<E>,
    runtime: Option<Handle>,
}

impl<E: DispatchEvent> Dispatcher<E> {
    /// Create a dispatcher sending to `events`. `name` only tags log lines.
    pub fn new(name: &'static str, events: UnboundedSender<E>) -> Self {
        Self {
            name,
            flag: BusyFlag::default(),
            events,
            runtime: None,
        }
    }

    /// Create a dispatcher together with the receiving end of its channel
    pub fn channel(name: &'static str) -> (Self, UnboundedReceiver<E>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(name, tx), rx)
    }

    /// Spawn jobs on `handle`, for callers living outside the runtime (e.g. a UI thread)
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Whether a job is in flight
    pub fn is_busy(&self) -> bool {
        self.flag.is_set()
    }

    /// Run `job` in the background.
    ///
    /// Returns `false` without doing anything if a job is already in flight.
    /// Otherwise emits `busy(true)`, and once the job ends `busy(false)`
    /// followed by `on_success(value)` or `failed(message)`. Errors and panics
    /// inside the job are both reported as `failed`.
    pub fn dispatch<T, F, M>(&self, job: F, on_success: M) -> bool
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
        M: FnOnce(T) -> E + Send + 'static,
    {
        let runtime = match self.runtime.clone().or_else(|| Handle::try_current().ok()) {
            Some(runtime) => runtime,
            None => {
                error!("[{}] no tokio runtime available; operation dropped", self.name);
                let _ = self
                    .events
                    .send(E::failed("No hay un runtime disponible para la operación.".to_string()));
                return false;
            }
        };

        let Some(guard) = self.flag.try_acquire() else {
            debug!("[{}] operation already in progress; skipped", self.name);
            return false;
        };

        let _ = self.events.send(E::busy(true));

        let name = self.name;
        let events = self.events.clone();
        runtime.spawn(async move {
            // The success mapper runs inside the caught future too, so a
            // panic there still ends in a `failed` event.
            let outcome = AssertUnwindSafe(async move { job.await.map(on_success) })
                .catch_unwind()
                .await;
            // Cleared before delivery so a handler can start the next job right away.
            drop(guard);

            let event = match outcome {
                Ok(Ok(event)) => {
                    debug!("[{}] finished", name);
                    event
                }
                Ok(Err(err)) => {
                    debug!("[{}] failed: {}", name, err);
                    E::failed(err.to_string())
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!("[{}] worker panicked: {}", name, message);
                    E::failed(message)
                }
            };

            // A dropped receiver only means nobody is listening anymore.
            let _ = events.send(E::busy(false));
            let _ = events.send(event);
        });

        true
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
