use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use meso_core::{
    provider_date, AlphaScore, HasData, LimitUpEntry, MoneyFlowRecord, ProviderError,
    ReboundCandidate, ReboundQuery, SectorDataProvider,
};
use std::collections::HashMap;
use tracing::debug;

/// Internal cache entry with timestamp
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

const CACHE_TTL_SECS: i64 = 300; // 5 minutes

/// Caching decorator over any `SectorDataProvider`.
///
/// Only successful, non-empty responses are stored. Errors and empty
/// answers always go back to the inner provider.
pub struct CachedProvider<P> {
    inner: P,
    ttl_secs: i64,
    /// Cache hot concept lists per (date, limit)
    hot_cache: DashMap<String, CacheEntry<Vec<String>>>,
    /// Cache alpha rankings per (date, benchmark, codes)
    alpha_cache: DashMap<String, CacheEntry<Vec<AlphaScore>>>,
    velocity_cache: DashMap<String, CacheEntry<HashMap<String, i32>>>,
    board_cache: DashMap<String, CacheEntry<Vec<LimitUpEntry>>>,
    rebound_cache: DashMap<String, CacheEntry<Vec<ReboundCandidate>>>,
    flow_cache: DashMap<String, CacheEntry<Vec<MoneyFlowRecord>>>,
}

impl<P: SectorDataProvider> CachedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self::with_ttl(inner, CACHE_TTL_SECS)
    }

    pub fn with_ttl(inner: P, ttl_secs: i64) -> Self {
        Self {
            inner,
            ttl_secs,
            hot_cache: DashMap::new(),
            alpha_cache: DashMap::new(),
            velocity_cache: DashMap::new(),
            board_cache: DashMap::new(),
            rebound_cache: DashMap::new(),
            flow_cache: DashMap::new(),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Drop every cached response
    pub fn clear(&self) {
        self.hot_cache.clear();
        self.alpha_cache.clear();
        self.velocity_cache.clear();
        self.board_cache.clear();
        self.rebound_cache.clear();
        self.flow_cache.clear();
    }

    fn lookup<T: Clone>(&self, cache: &DashMap<String, CacheEntry<T>>, key: &str) -> Option<T> {
        let entry = cache.get(key)?;
        let age = (Utc::now() - entry.cached_at).num_seconds();
        if age < self.ttl_secs {
            debug!("Cache hit: {}", key);
            Some(entry.data.clone())
        } else {
            None
        }
    }

    fn store<T: Clone + HasData>(
        &self,
        cache: &DashMap<String, CacheEntry<T>>,
        key: String,
        result: &Result<T, ProviderError>,
    ) {
        if let Ok(data) = result {
            if data.has_data() {
                cache.insert(
                    key,
                    CacheEntry {
                        data: data.clone(),
                        cached_at: Utc::now(),
                    },
                );
            }
        }
    }
}

#[async_trait]
impl<P: SectorDataProvider> SectorDataProvider for CachedProvider<P> {
    async fn discover_hot_concepts(
        &self,
        trade_date: NaiveDate,
        limit: usize,
    ) -> Result<Vec<String>, ProviderError> {
        let key = format!("{}:{}", provider_date(trade_date), limit);
        if let Some(hit) = self.lookup(&self.hot_cache, &key) {
            return Ok(hit);
        }
        let result = self.inner.discover_hot_concepts(trade_date, limit).await;
        self.store(&self.hot_cache, key, &result);
        result
    }

    async fn rank_sectors_by_alpha(
        &self,
        codes: &[String],
        benchmark: &str,
        trade_date: NaiveDate,
    ) -> Result<Vec<AlphaScore>, ProviderError> {
        let key = format!("{}:{}:{}", provider_date(trade_date), benchmark, codes.join(","));
        if let Some(hit) = self.lookup(&self.alpha_cache, &key) {
            return Ok(hit);
        }
        let result = self
            .inner
            .rank_sectors_by_alpha(codes, benchmark, trade_date)
            .await;
        self.store(&self.alpha_cache, key, &result);
        result
    }

    async fn rank_velocity(
        &self,
        codes: &[String],
        benchmark: &str,
        trade_date: NaiveDate,
    ) -> Result<HashMap<String, i32>, ProviderError> {
        let key = format!("{}:{}:{}", provider_date(trade_date), benchmark, codes.join(","));
        if let Some(hit) = self.lookup(&self.velocity_cache, &key) {
            return Ok(hit);
        }
        let result = self.inner.rank_velocity(codes, benchmark, trade_date).await;
        self.store(&self.velocity_cache, key, &result);
        result
    }

    async fn limit_up_board(&self, trade_date: NaiveDate) -> Result<Vec<LimitUpEntry>, ProviderError> {
        let key = provider_date(trade_date);
        if let Some(hit) = self.lookup(&self.board_cache, &key) {
            return Ok(hit);
        }
        let result = self.inner.limit_up_board(trade_date).await;
        self.store(&self.board_cache, key, &result);
        result
    }

    async fn volume_anomaly_scan(
        &self,
        codes: &[String],
        trade_date: NaiveDate,
        query: &ReboundQuery,
    ) -> Result<Vec<ReboundCandidate>, ProviderError> {
        let key = format!(
            "{}:{}:{}:{}:{}",
            provider_date(trade_date),
            query.decline_floor,
            query.vol_ratio_floor,
            query.crash_floor,
            codes.join(",")
        );
        if let Some(hit) = self.lookup(&self.rebound_cache, &key) {
            return Ok(hit);
        }
        let result = self.inner.volume_anomaly_scan(codes, trade_date, query).await;
        self.store(&self.rebound_cache, key, &result);
        result
    }

    async fn money_flow_by_category(
        &self,
        trade_date: NaiveDate,
        category: &str,
    ) -> Result<Vec<MoneyFlowRecord>, ProviderError> {
        let key = format!("{}:{}", provider_date(trade_date), category);
        if let Some(hit) = self.lookup(&self.flow_cache, &key) {
            return Ok(hit);
        }
        let result = self.inner.money_flow_by_category(trade_date, category).await;
        self.store(&self.flow_cache, key, &result);
        result
    }
}
