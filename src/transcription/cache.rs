//! # Model Cache
//!
//! Explicit per-size memoization of loaded models, owned by the top-level
//! application state.
//!
//! ## Semantics:
//! - **Memoized**: loading size S twice invokes the underlying loader exactly
//!   once; repeated use of the same size incurs no reload.
//! - **Single-flight**: concurrent first access to the same size performs one
//!   load; the other callers wait for it and share the result.
//! - **No failure caching**: a failed load leaves the slot empty, so the next
//!   user action may attempt the load again. Nothing retries automatically.
//!
//! The cache is generic over the cached value so these semantics can be
//! tested without downloading real model weights.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

use crate::transcription::model::ModelSize;

/// Cache of at-most-one loaded value per model size.
///
/// ## Locking:
/// The outer mutex only guards the slot map and is held briefly; the actual
/// load runs under the slot's `OnceCell`, so loading one size never blocks
/// lookups of another.
pub struct ModelCache<M> {
    slots: Mutex<HashMap<ModelSize, Arc<OnceCell<Arc<M>>>>>,
}

impl<M> Default for ModelCache<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> ModelCache<M> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `size`, loading it with `load` on first
    /// use. Concurrent callers for the same size share a single load.
    pub async fn get_or_load<F, Fut, E>(&self, size: ModelSize, load: F) -> Result<Arc<M>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<M, E>>,
    {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots.entry(size).or_default().clone()
        };

        let value = slot
            .get_or_try_init(|| async { load().await.map(Arc::new) })
            .await?;

        Ok(value.clone())
    }

    /// Whether a value for `size` is already loaded.
    pub async fn is_cached(&self, size: ModelSize) -> bool {
        let slots = self.slots.lock().await;
        slots
            .get(&size)
            .map(|slot| slot.initialized())
            .unwrap_or(false)
    }

    /// Sizes that currently hold a loaded value.
    pub async fn cached_sizes(&self) -> Vec<ModelSize> {
        let slots = self.slots.lock().await;
        ModelSize::ALL
            .into_iter()
            .filter(|size| {
                slots
                    .get(size)
                    .map(|slot| slot.initialized())
                    .unwrap_or(false)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_loader_invoked_exactly_once_per_size() {
        let cache: ModelCache<u32> = ModelCache::new();
        let loads = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_load(ModelSize::Base, || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(42)
                })
                .await
                .unwrap();
            assert_eq!(*value, 42);
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_sizes_load_independently() {
        let cache: ModelCache<String> = ModelCache::new();
        let loads = AtomicUsize::new(0);

        for size in [ModelSize::Tiny, ModelSize::Base, ModelSize::Tiny] {
            cache
                .get_or_load(size, || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(size.to_string())
                })
                .await
                .unwrap();
        }

        // One load per distinct size
        assert_eq!(loads.load(Ordering::SeqCst), 2);
        assert!(cache.is_cached(ModelSize::Tiny).await);
        assert!(cache.is_cached(ModelSize::Base).await);
        assert!(!cache.is_cached(ModelSize::Large).await);
    }

    #[tokio::test]
    async fn test_concurrent_first_access_single_flight() {
        let cache = Arc::new(ModelCache::<u32>::new());
        let loads = Arc::new(AtomicUsize::new(0));

        let a = {
            let cache = cache.clone();
            let loads = loads.clone();
            tokio::spawn(async move {
                cache
                    .get_or_load(ModelSize::Small, || async {
                        loads.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok::<_, String>(7)
                    })
                    .await
                    .unwrap()
            })
        };
        let b = {
            let cache = cache.clone();
            let loads = loads.clone();
            tokio::spawn(async move {
                cache
                    .get_or_load(ModelSize::Small, || async {
                        loads.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, String>(7)
                    })
                    .await
                    .unwrap()
            })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert_eq!(*a, 7);
        assert_eq!(*b, 7);
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let cache: ModelCache<u32> = ModelCache::new();

        let result = cache
            .get_or_load(ModelSize::Medium, || async {
                Err::<u32, _>("network down".to_string())
            })
            .await;
        assert!(result.is_err());
        assert!(!cache.is_cached(ModelSize::Medium).await);

        // The next user action may attempt the load again
        let value = cache
            .get_or_load(ModelSize::Medium, || async { Ok::<_, String>(9) })
            .await
            .unwrap();
        assert_eq!(*value, 9);
        assert!(cache.is_cached(ModelSize::Medium).await);
    }

    #[tokio::test]
    async fn test_cached_sizes_listing() {
        let cache: ModelCache<u32> = ModelCache::new();
        cache
            .get_or_load(ModelSize::Tiny, || async { Ok::<_, String>(1) })
            .await
            .unwrap();

        assert_eq!(cache.cached_sizes().await, vec![ModelSize::Tiny]);
    }
}
