//! Process-wide price history cache.
//!
//! Wraps any [`PriceDataPort`] and keeps fetched histories keyed by
//! `(ticker, timeframe)`. Steady-state reads take only a shared read guard.
//! A miss serializes on a per-key init lock, so each key is fetched at most
//! once however many requests race for it; other keys are unaffected. The
//! init lock is dropped as soon as the fetch settles.
//! Fetch failures are returned to the caller and not remembered.

use crate::domain::error::StratsimError;
use crate::domain::price_bar::PriceBar;
use crate::ports::data_port::{PriceDataPort, TickerResolver, Timeframe};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::debug;

type Key = (String, Timeframe);

pub struct CachedDataPort<P> {
    inner: P,
    entries: RwLock<HashMap<Key, Arc<[PriceBar]>>>,
    init_locks: Mutex<HashMap<Key, Arc<Mutex<()>>>>,
}

impl<P: PriceDataPort> CachedDataPort<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            entries: RwLock::new(HashMap::new()),
            init_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn get(&self, ticker: &str, timeframe: Timeframe) -> Result<Arc<[PriceBar]>, StratsimError> {
        let key = (ticker.to_string(), timeframe);
        if let Some(bars) = self.lookup(&key) {
            return Ok(bars);
        }

        let init = self.init_lock(&key);
        let _guard = init.lock().unwrap_or_else(PoisonError::into_inner);

        // Another request may have populated the key while we waited.
        if let Some(bars) = self.lookup(&key) {
            return Ok(bars);
        }

        let fetched = self.inner.fetch_bars(ticker, timeframe).map(Arc::<[PriceBar]>::from);
        if let Ok(bars) = &fetched {
            debug!(ticker, %timeframe, bars = bars.len(), "history cached");
            self.entries
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key.clone(), Arc::clone(bars));
        }
        // Released only once the entry is visible; waiters keep their own Arc.
        self.release_init_lock(&key);
        fetched
    }

    /// Drop one key so the next request refetches it.
    pub fn invalidate(&self, ticker: &str, timeframe: Timeframe) -> bool {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(ticker.to_string(), timeframe))
            .is_some();
        if removed {
            debug!(ticker, %timeframe, "history invalidated");
        }
        removed
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        debug!("history cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &Key) -> Option<Arc<[PriceBar]>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn init_lock(&self, key: &Key) -> Arc<Mutex<()>> {
        let mut locks = self.init_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    fn release_init_lock(&self, key: &Key) {
        self.init_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    #[cfg(test)]
    fn pending_inits(&self) -> usize {
        self.init_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<P: PriceDataPort> PriceDataPort for CachedDataPort<P> {
    fn fetch_bars(
        &self,
        ticker: &str,
        timeframe: Timeframe,
    ) -> Result<Vec<PriceBar>, StratsimError> {
        self.get(ticker, timeframe).map(|bars| bars.to_vec())
    }

    fn list_tickers(&self) -> Result<Vec<String>, StratsimError> {
        self.inner.list_tickers()
    }

    fn fetch_shared(
        &self,
        ticker: &str,
        timeframe: Timeframe,
    ) -> Result<Arc<[PriceBar]>, StratsimError> {
        self.get(ticker, timeframe)
    }
}

impl<P: PriceDataPort + TickerResolver> TickerResolver for CachedDataPort<P> {
    fn is_resolvable(&self, ticker: &str) -> bool {
        let cached = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .any(|(t, _)| t == ticker);
        cached || self.inner.is_resolvable(ticker)
    }
}
