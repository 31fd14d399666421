use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use vox_foundation::error::{PoolError, VoxError};
use vox_telemetry::PipelineMetrics;

use crate::instance::PoolInstance;

/// `Get()` races a channel recv against this timeout before falling back to
/// a beyond-capacity instance (spec §4.10, §5).
pub const GET_TIMEOUT: Duration = Duration::from_millis(100);

type Factory<T> = Arc<dyn Fn() -> Result<T, VoxError> + Send + Sync>;

/// Fixed-capacity pool of `T` (spec §4.10). `initialize()` populates the
/// pool concurrently and tolerates partial failure; `get()`/`put()` are the
/// steady-state borrow/return pair. Beyond-capacity instances created on a
/// `get()` timeout are not pre-registered anywhere, but `put()` treats every
/// returned instance identically — if the channel has room it goes back in,
/// otherwise it is released.
pub struct Pool<T: PoolInstance> {
    capacity: usize,
    factory: Factory<T>,
    tx: mpsc::Sender<T>,
    rx: Mutex<mpsc::Receiver<T>>,
    metrics: Option<PipelineMetrics>,
    closed: AtomicBool,

    created: AtomicI64,
    reused: AtomicI64,
    active: AtomicI64,
}

impl<T: PoolInstance> Pool<T> {
    pub fn new(capacity: usize, factory: Factory<T>) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            capacity,
            factory,
            tx,
            rx: Mutex::new(rx),
            metrics: None,
            closed: AtomicBool::new(false),
            created: AtomicI64::new(0),
            reused: AtomicI64::new(0),
            active: AtomicI64::new(0),
        }
    }

    pub fn with_metrics(mut self, metrics: PipelineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn total_created(&self) -> i64 {
        self.created.load(Ordering::Relaxed)
    }

    pub fn total_reused(&self) -> i64 {
        self.reused.load(Ordering::Relaxed)
    }

    pub fn active_count(&self) -> i64 {
        self.active.load(Ordering::Relaxed)
    }

    fn record_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
        if let Some(metrics) = &self.metrics {
            metrics.record_pool_created();
        }
    }

    fn record_active_delta(&self, delta: i64) {
        let active = self.active.fetch_add(delta, Ordering::Relaxed) + delta;
        if let Some(metrics) = &self.metrics {
            metrics.set_pool_active(active);
        }
    }

    /// Concurrently creates `capacity` instances via the factory. Partial
    /// failure is tolerated; fatal only when every attempt fails (spec §7).
    pub async fn initialize(&self) -> Result<(), VoxError> {
        tracing::info!(capacity = self.capacity, "initializing pool");

        let mut handles = Vec::with_capacity(self.capacity);
        for _ in 0..self.capacity {
            let factory = self.factory.clone();
            handles.push(tokio::task::spawn_blocking(move || factory()));
        }

        let mut success = 0usize;
        for handle in handles {
            match handle.await {
                Ok(Ok(instance)) => {
                    self.record_created();
                    success += 1;
                    if self.tx.try_send(instance).is_err() {
                        tracing::warn!("pool queue full during initialize, dropping extra instance");
                    }
                }
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, "pool factory failed during initialize");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "pool init task panicked");
                }
            }
        }

        tracing::info!(success, capacity = self.capacity, "pool initialized");
        if success == 0 {
            return Err(VoxError::Pool(PoolError::InitFailedNoInstances));
        }
        Ok(())
    }

    /// Takes an instance from the pool, waiting up to [`GET_TIMEOUT`]
    /// before creating a fresh beyond-capacity instance (spec §4.10, §5).
    pub async fn get(&self) -> Result<T, VoxError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(VoxError::Pool(PoolError::ShuttingDown));
        }

        let recv = async {
            let mut rx = self.rx.lock().await;
            rx.recv().await
        };

        match tokio::time::timeout(GET_TIMEOUT, recv).await {
            Ok(Some(instance)) => {
                self.reused.fetch_add(1, Ordering::Relaxed);
                if let Some(metrics) = &self.metrics {
                    metrics.record_pool_reused();
                }
                self.record_active_delta(1);
                Ok(instance)
            }
            Ok(None) => Err(VoxError::Pool(PoolError::ShuttingDown)),
            Err(_timeout) => {
                tracing::warn!("pool get timed out, creating beyond-capacity instance");
                let factory = self.factory.clone();
                let instance = tokio::task::spawn_blocking(move || factory())
                    .await
                    .map_err(VoxError::from)??;
                self.record_created();
                self.record_active_delta(1);
                Ok(instance)
            }
        }
    }

    /// Returns an instance after resetting it. Active count always
    /// decrements here regardless of whether the instance re-enters the
    /// channel or is released for lack of room (spec §8 S6).
    pub async fn put(&self, mut instance: T) {
        self.record_active_delta(-1);

        if let Err(err) = instance.reset() {
            tracing::warn!(error = %err, "pool instance reset failed");
        }

        if let Err(err) = self.tx.try_send(instance) {
            if let mpsc::error::TrySendError::Full(instance) | mpsc::error::TrySendError::Closed(instance) = err {
                if let Err(release_err) = instance.release() {
                    tracing::warn!(error = %release_err, "pool instance release failed");
                }
            }
        }
    }

    /// Drains and releases every pooled instance; subsequent `get()` calls
    /// fail with [`PoolError::ShuttingDown`].
    pub async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let mut rx = self.rx.lock().await;
        while let Ok(instance) = rx.try_recv() {
            if let Err(err) = instance.release() {
                tracing::warn!(error = %err, "pool instance release failed during close");
            }
        }
        tracing::info!("pool closed");
    }
}
