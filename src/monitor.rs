//! Periodic connectivity check against the API

use log::{debug, error};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::api::ApiTransport;
use crate::config::MIN_MONITOR_INTERVAL;

/// Notifications emitted by [`ApiMonitor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// Connectivity changed; the first result is always reported
    OnlineChanged(bool),
    /// A ping failed
    Error(String),
}

/// Pings the API on an interval and reports online/offline transitions
pub struct ApiMonitor {
    api: Arc<dyn ApiTransport>,
    interval: Duration,
    events: UnboundedSender<MonitorEvent>,
    online: Arc<Mutex<Option<bool>>>,
    task: Option<JoinHandle<()>>,
    runtime: Option<Handle>,
}

impl ApiMonitor {
    /// Create a monitor. `interval` is clamped to at least three seconds.
    pub fn new(api: Arc<dyn ApiTransport>, interval: Duration) -> (Self, UnboundedReceiver<MonitorEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let monitor = Self {
            api,
            interval: interval.max(MIN_MONITOR_INTERVAL),
            events,
            online: Arc::new(Mutex::new(None)),
            task: None,
            runtime: None,
        };
        (monitor, rx)
    }

    /// Ping from `handle` instead of the ambient runtime
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Last known state, `None` before the first ping completes
    pub fn online(&self) -> Option<bool> {
        *self.online.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    /// Start pinging. With `run_immediately` the first ping happens now,
    /// otherwise after one interval.
    ///
    /// Returns `false` and emits [`MonitorEvent::Error`] when there is no
    /// runtime to run on.
    pub fn start(&mut self, run_immediately: bool) -> bool {
        self.stop();

        let runtime = match self.runtime.clone().or_else(|| Handle::try_current().ok()) {
            Some(runtime) => runtime,
            None => {
                error!("[monitor] no tokio runtime available; not started");
                let _ = self.events.send(MonitorEvent::Error(
                    "No hay un runtime disponible para el monitor.".to_string(),
                ));
                return false;
            }
        };

        let api = self.api.clone();
        let events = self.events.clone();
        let online = self.online.clone();
        let period = self.interval;

        self.task = Some(runtime.spawn(async move {
            let start = if run_immediately {
                time::Instant::now()
            } else {
                time::Instant::now() + period
            };
            let mut ticker = time::interval_at(start, period);
            // Pings run inline, so a slow ping swallows the ticks it overlaps.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let state = match api.ping().await {
                    Ok(()) => true,
                    Err(err) => {
                        debug!("[monitor] ping failed: {}", err);
                        if events.send(MonitorEvent::Error(err.to_string())).is_err() {
                            break;
                        }
                        false
                    }
                };

                let changed = {
                    let mut last = online.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                    let changed = *last != Some(state);
                    *last = Some(state);
                    changed
                };
                if changed && events.send(MonitorEvent::OnlineChanged(state)).is_err() {
                    break;
                }
            }
        }));
        true
    }

    /// Stop pinging. The last known state is kept.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for ApiMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiResponse;
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use reqwest::Method;
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers pings from a script, then stays online
    struct ScriptedPing(Mutex<VecDeque<bool>>);

    #[async_trait]
    impl ApiTransport for ScriptedPing {
        async fn request(&self, _: Method, _: &str, _: Option<Value>) -> Result<ApiResponse> {
            Ok(ApiResponse::Json(Value::Null))
        }

        async fn ping(&self) -> Result<()> {
            let up = self.0.lock().unwrap().pop_front().unwrap_or(true);
            if up {
                Ok(())
            } else {
                Err(Error::api(0, "connection refused"))
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reports_only_changes() {
        let api = Arc::new(ScriptedPing(Mutex::new(VecDeque::from(vec![
            true, true, false, false, true,
        ]))));
        let (mut monitor, mut rx) = ApiMonitor::new(api, Duration::from_secs(3));
        assert!(monitor.start(true));

        assert_eq!(rx.recv().await, Some(MonitorEvent::OnlineChanged(true)));
        assert_eq!(rx.recv().await, Some(MonitorEvent::Error("connection refused".to_string())));
        assert_eq!(rx.recv().await, Some(MonitorEvent::OnlineChanged(false)));
        assert_eq!(rx.recv().await, Some(MonitorEvent::Error("connection refused".to_string())));
        assert_eq!(rx.recv().await, Some(MonitorEvent::OnlineChanged(true)));
        assert_eq!(monitor.online(), Some(true));

        monitor.stop();
        assert!(!monitor.is_running());
    }

    /// Every ping takes `delay`; counts how many were made
    struct SlowPing {
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ApiTransport for SlowPing {
        async fn request(&self, _: Method, _: &str, _: Option<Value>) -> Result<ApiResponse> {
            Ok(ApiResponse::Json(Value::Null))
        }

        async fn ping(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            time::sleep(self.delay).await;
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_during_slow_ping_are_skipped() {
        let api = Arc::new(SlowPing {
            delay: Duration::from_secs(7),
            calls: AtomicUsize::new(0),
        });
        let (mut monitor, mut rx) = ApiMonitor::new(api.clone(), Duration::from_secs(3));
        assert!(monitor.start(true));

        // Pings start at 0s, 9s and 18s: the ticks at 3s and 6s fall inside the
        // first ping and are dropped instead of firing back to back.
        assert_eq!(rx.recv().await, Some(MonitorEvent::OnlineChanged(true)));
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
        time::sleep(Duration::from_millis(1_500)).await; // 8.5s
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
        time::sleep(Duration::from_secs(1)).await; // 9.5s
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
        time::sleep(Duration::from_secs(8)).await; // 17.5s
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
        time::sleep(Duration::from_secs(1)).await; // 18.5s
        assert_eq!(api.calls.load(Ordering::SeqCst), 3);

        monitor.stop();
    }

    #[test]
    fn test_start_without_runtime() {
        let api = Arc::new(ScriptedPing(Mutex::new(VecDeque::new())));
        let (mut monitor, mut rx) = ApiMonitor::new(api, Duration::from_secs(3));
        assert!(!monitor.start(true));
        assert!(!monitor.is_running());
        assert!(matches!(rx.try_recv(), Ok(MonitorEvent::Error(_))));
    }

    #[test]
    fn test_interval_clamped() {
        let api = Arc::new(ScriptedPing(Mutex::new(VecDeque::new())));
        let (monitor, _rx) = ApiMonitor::new(api, Duration::from_millis(10));
        assert_eq!(monitor.interval(), MIN_MONITOR_INTERVAL);
        assert_eq!(monitor.online(), None);
    }
}
