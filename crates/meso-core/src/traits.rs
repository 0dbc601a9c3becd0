use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;

use crate::{
    AlphaScore, LimitUpEntry, MoneyFlowRecord, ProviderError, ReboundCandidate, ReboundQuery,
};

/// Source of every data set the meso scan consumes.
///
/// Implementations own transport, credentials and retry. The pipeline treats
/// each call as a single blocking fetch and decides for itself whether a
/// failure is fatal or degraded.
#[async_trait]
pub trait SectorDataProvider: Send + Sync {
    /// Candidate concept codes, most active first
    async fn discover_hot_concepts(
        &self,
        trade_date: NaiveDate,
        limit: usize,
    ) -> Result<Vec<String>, ProviderError>;

    async fn rank_sectors_by_alpha(
        &self,
        codes: &[String],
        benchmark: &str,
        trade_date: NaiveDate,
    ) -> Result<Vec<AlphaScore>, ProviderError>;

    /// Rank positions gained per code since the prior reference date
    async fn rank_velocity(
        &self,
        codes: &[String],
        benchmark: &str,
        trade_date: NaiveDate,
    ) -> Result<HashMap<String, i32>, ProviderError>;

    async fn limit_up_board(&self, trade_date: NaiveDate) -> Result<Vec<LimitUpEntry>, ProviderError>;

    async fn volume_anomaly_scan(
        &self,
        codes: &[String],
        trade_date: NaiveDate,
        query: &ReboundQuery,
    ) -> Result<Vec<ReboundCandidate>, ProviderError>;

    async fn money_flow_by_category(
        &self,
        trade_date: NaiveDate,
        category: &str,
    ) -> Result<Vec<MoneyFlowRecord>, ProviderError>;
}
