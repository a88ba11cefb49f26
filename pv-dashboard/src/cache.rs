use std::future::Future;

use tokio::time::{Duration, Instant};

/// Single-slot memo that keeps a fetched value for `ttl`.
///
/// Failed fetches are not stored, so the next call goes back to the source.
#[derive(Debug)]
pub struct TtlCache<T> {
    ttl: Duration,
    slot: Option<(Instant, T)>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, slot: None }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// A stored value is judged against the new TTL from now on.
    pub fn set_ttl(&mut self, ttl: Duration) {
        self.ttl = ttl;
    }

    pub fn get(&self) -> Option<T> {
        match &self.slot {
            Some((stored_at, value)) if stored_at.elapsed() < self.ttl => Some(value.clone()),
            _ => None,
        }
    }

    pub async fn get_or_fetch<F, Fut, E>(&mut self, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get() {
            metrics::counter!("dashboard_cache_hits_total").increment(1);
            return Ok(value);
        }

        let value = fetch().await?;
        self.slot = Some((Instant::now(), value.clone()));
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    async fn counted(calls: &AtomicUsize) -> Result<Arc<usize>, String> {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Arc::new(n))
    }

    #[tokio::test(start_paused = true)]
    async fn second_call_within_ttl_is_served_from_cache() {
        let calls = AtomicUsize::new(0);
        let mut cache = TtlCache::new(Duration::from_secs(60));

        let first = cache.get_or_fetch(|| counted(&calls)).await.unwrap();
        tokio::time::advance(Duration::from_secs(59)).await;
        let second = cache.get_or_fetch(|| counted(&calls)).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_fetched_again() {
        let calls = AtomicUsize::new(0);
        let mut cache = TtlCache::new(Duration::from_secs(10));

        let first = cache.get_or_fetch(|| counted(&calls)).await.unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;
        let second = cache.get_or_fetch(|| counted(&calls)).await.unwrap();

        assert_eq!((*first, *second), (1, 2));
    }

    #[tokio::test(start_paused = true)]
    async fn errors_are_not_cached() {
        let mut cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(60));

        let err = cache.get_or_fetch(|| async { Err::<u32, _>("down") }).await;
        assert_eq!(err, Err("down"));
        assert!(cache.get().is_none());

        let ok = cache.get_or_fetch(|| async { Ok::<_, &str>(7) }).await;
        assert_eq!(ok, Ok(7));
        assert_eq!(cache.get(), Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn shorter_ttl_expires_stored_value() {
        let mut cache = TtlCache::new(Duration::from_secs(600));
        cache.get_or_fetch(|| async { Ok::<_, ()>(1) }).await.unwrap();

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cache.get(), Some(1));

        cache.set_ttl(Duration::from_secs(20));
        assert_eq!(cache.ttl(), Duration::from_secs(20));
        assert_eq!(cache.get(), None);
    }
}
