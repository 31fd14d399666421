//! Fixed-capacity resource pool (spec §4.10): concurrent initialization,
//! bounded-wait `get`/`put`, and beyond-capacity fallback.

pub mod instance;
pub mod pool;

pub use instance::PoolInstance;
pub use pool::{Pool, GET_TIMEOUT};

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use vox_foundation::error::VoxError;

    use super::*;

    struct Counter {
        id: u32,
        resets: u32,
        released: bool,
    }

    impl PoolInstance for Counter {
        fn reset(&mut self) -> Result<(), VoxError> {
            self.resets += 1;
            Ok(())
        }

        fn release(mut self) -> Result<(), VoxError> {
            self.released = true;
            Ok(())
        }
    }

    fn counting_factory() -> (Factory, Arc<AtomicU32>) {
        let next_id = Arc::new(AtomicU32::new(0));
        let captured = next_id.clone();
        let factory: Factory = Arc::new(move || {
            let id = captured.fetch_add(1, Ordering::Relaxed);
            Ok(Counter {
                id,
                resets: 0,
                released: false,
            })
        });
        (factory, next_id)
    }

    type Factory = Arc<dyn Fn() -> Result<Counter, VoxError> + Send + Sync>;

    #[tokio::test]
    async fn initialize_populates_capacity_instances() {
        let (factory, _) = counting_factory();
        let pool = Pool::new(2, factory);
        pool.initialize().await.unwrap();
        assert_eq!(pool.total_created(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn get_beyond_capacity_falls_back_after_timeout_and_put_settles_counts() {
        let (factory, _) = counting_factory();
        let pool = Pool::new(2, factory);
        pool.initialize().await.unwrap();

        let a = pool.get().await.unwrap();
        let b = pool.get().await.unwrap();
        let c = pool.get().await.unwrap(); // beyond-capacity: channel is empty

        assert_eq!(pool.total_created(), 3);
        assert_eq!(pool.total_reused(), 2);
        assert_eq!(pool.active_count(), 3);

        pool.put(a).await;
        pool.put(b).await;
        pool.put(c).await; // channel already holds 2 (capacity), gets released

        assert_eq!(pool.active_count(), 0);
    }

    #[tokio::test]
    async fn initialize_fails_only_when_every_factory_call_fails() {
        let factory: Factory = Arc::new(|| Err(VoxError::Fatal("boom".into())));
        let pool = Pool::new(2, factory);
        let err = pool.initialize().await.unwrap_err();
        assert!(matches!(err, VoxError::Pool(_)));
    }
}
