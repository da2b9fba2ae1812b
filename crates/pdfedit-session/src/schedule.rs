//! Debounced background work: session autosave and zoom settling
//!
//! Every schedule call cancels the previous pending run, so only the last
//! request inside a quiet period does any work.

use crate::config::ZoomConfig;
use crate::persistence::SessionStore;
use crate::session::Session;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared cancellation flag; clones observe the same state
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Runs the most recently scheduled future once `delay` passes without a
/// newer schedule call
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<CancellationToken>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `task`, cancelling whatever was pending.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        if let Some(previous) = lock(&self.pending).replace(token.clone()) {
            previous.cancel();
        }
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !token.is_cancelled() {
                task.await;
            }
        });
    }

    /// Cancel the pending run, if any
    pub fn cancel(&self) {
        if let Some(token) = lock(&self.pending).take() {
            token.cancel();
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveStatus {
    Idle,
    Saved(DateTime<Utc>),
    /// The last write was refused by the store; the previous save is intact
    QuotaExceeded,
    Failed(String),
}

struct AutosaverState {
    store: SessionStore,
    session_id: String,
    debouncer: Debouncer,
    latest: Mutex<Option<Session>>,
    in_flight: AtomicBool,
    // Bumped by cancel_and_clear so a write already in flight cleans up after itself
    generation: AtomicU64,
    writes: AtomicUsize,
    status: Mutex<SaveStatus>,
}

/// Debounced writer for the live session
#[derive(Clone)]
pub struct Autosaver {
    state: Arc<AutosaverState>,
}

impl std::fmt::Debug for Autosaver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Autosaver")
            .field("session_id", &self.state.session_id)
            .field("delay", &self.state.debouncer.delay())
            .field("status", &self.status())
            .finish()
    }
}

impl Autosaver {
    pub fn new(store: SessionStore, session_id: impl Into<String>, delay: Duration) -> Self {
        Self {
            state: Arc::new(AutosaverState {
                store,
                session_id: session_id.into(),
                debouncer: Debouncer::new(delay),
                latest: Mutex::new(None),
                in_flight: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                writes: AtomicUsize::new(0),
                status: Mutex::new(SaveStatus::Idle),
            }),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.state.session_id
    }

    pub fn status(&self) -> SaveStatus {
        lock(&self.state.status).clone()
    }

    /// Completed write attempts
    pub fn writes(&self) -> usize {
        self.state.writes.load(Ordering::Acquire)
    }

    /// Record `session` as the state to persist and restart the timer
    pub fn notify(&self, session: &Session) {
        *lock(&self.state.latest) = Some(session.clone());
        self.schedule();
    }

    /// Drop any pending write and remove the stored session
    pub async fn cancel_and_clear(&self) {
        self.state.debouncer.cancel();
        self.state.generation.fetch_add(1, Ordering::AcqRel);
        *lock(&self.state.latest) = None;
        self.state.store.clear_session(&self.state.session_id).await;
        *lock(&self.state.status) = SaveStatus::Idle;
        debug!(session = %self.state.session_id, "Cancelled autosave and cleared stored session");
    }

    fn schedule(&self) {
        let autosaver = self.clone();
        self.state.debouncer.schedule(async move { autosaver.fire().await });
    }

    async fn fire(&self) {
        let state = &self.state;
        if state.in_flight.swap(true, Ordering::AcqRel) {
            debug!(session = %state.session_id, "Write in flight, restarting autosave timer");
            self.schedule();
            return;
        }

        let generation = state.generation.load(Ordering::Acquire);
        let session = lock(&state.latest).clone();
        if let Some(session) = session {
            let result = state.store.save_session(&state.session_id, &session).await;
            state.writes.fetch_add(1, Ordering::AcqRel);
            let status = match result {
                Ok(()) => SaveStatus::Saved(Utc::now()),
                Err(e) if e.is_quota_exceeded() => {
                    warn!(session = %state.session_id, error = %e, "Autosave refused, storage is full");
                    SaveStatus::QuotaExceeded
                }
                Err(e) => {
                    warn!(session = %state.session_id, error = %e, "Autosave failed");
                    SaveStatus::Failed(e.to_string())
                }
            };
            if state.generation.load(Ordering::Acquire) != generation {
                state.store.clear_session(&state.session_id).await;
            } else {
                *lock(&state.status) = status;
            }
        }
        state.in_flight.store(false, Ordering::Release);
    }
}

/// Applies zoom requests at once and defers the real re-render until the
/// requests settle
pub struct ZoomController {
    min_scale: f64,
    max_scale: f64,
    scale_bits: AtomicU64,
    debouncer: Debouncer,
    on_settle: Arc<dyn Fn(f64) + Send + Sync>,
}

impl std::fmt::Debug for ZoomController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoomController")
            .field("scale", &self.scale())
            .field("min_scale", &self.min_scale)
            .field("max_scale", &self.max_scale)
            .finish()
    }
}

impl ZoomController {
    pub fn new(config: &ZoomConfig, on_settle: impl Fn(f64) + Send + Sync + 'static) -> Self {
        Self {
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            scale_bits: AtomicU64::new(1.0f64.to_bits()),
            debouncer: Debouncer::new(config.settle()),
            on_settle: Arc::new(on_settle),
        }
    }

    /// Current visual scale
    pub fn scale(&self) -> f64 {
        f64::from_bits(self.scale_bits.load(Ordering::Acquire))
    }

    /// Apply `scale` visually now and schedule a re-render at that scale.
    ///
    /// Returns the clamped scale.
    pub fn request(&self, scale: f64) -> f64 {
        let scale = if scale.is_nan() {
            self.scale()
        } else {
            scale.clamp(self.min_scale, self.max_scale)
        };
        self.scale_bits.store(scale.to_bits(), Ordering::Release);

        let on_settle = Arc::clone(&self.on_settle);
        self.debouncer.schedule(async move {
            debug!(scale, "Zoom settled");
            on_settle(scale);
        });
        scale
    }

    /// Drop a pending re-render
    pub fn cancel(&self) {
        self.debouncer.cancel();
    }
}
