//! Snapshot Provider
//!
//! Serves a captured set of provider responses for one trade date. Used for
//! offline replay and as the fixture provider in tests. A data set left out
//! of the snapshot behaves like an unreachable source.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::{
    AlphaScore, LimitUpEntry, MesoError, MoneyFlowRecord, ProviderError, ReboundCandidate,
    ReboundQuery, SectorDataProvider,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotProvider {
    /// When set, requests for any other date are answered as unavailable
    pub trade_date: Option<NaiveDate>,
    pub hot_concepts: Option<Vec<String>>,
    pub alpha: Option<Vec<AlphaScore>>,
    pub rank_velocity: Option<HashMap<String, i32>>,
    pub limit_up_board: Option<Vec<LimitUpEntry>>,
    pub rebounds: Option<Vec<ReboundCandidate>>,
    pub money_flow: Option<Vec<MoneyFlowRecord>>,
}

impl SnapshotProvider {
    pub fn from_json(json: &str) -> Result<Self, MesoError> {
        serde_json::from_str(json).map_err(|e| MesoError::Snapshot(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MesoError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| MesoError::Snapshot(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    fn serve<T: Clone>(
        &self,
        trade_date: NaiveDate,
        source: &str,
        data: &Option<T>,
    ) -> Result<T, ProviderError> {
        if let Some(snapshot_date) = self.trade_date {
            if snapshot_date != trade_date {
                return Err(ProviderError::Unavailable(format!(
                    "snapshot holds {} but {} was requested",
                    crate::provider_date(snapshot_date),
                    crate::provider_date(trade_date)
                )));
            }
        }
        data.clone()
            .ok_or_else(|| ProviderError::Unavailable(format!("{} not in snapshot", source)))
    }
}

#[async_trait]
impl SectorDataProvider for SnapshotProvider {
    async fn discover_hot_concepts(
        &self,
        trade_date: NaiveDate,
        limit: usize,
    ) -> Result<Vec<String>, ProviderError> {
        let mut codes = self.serve(trade_date, "hot concepts", &self.hot_concepts)?;
        codes.truncate(limit);
        Ok(codes)
    }

    async fn rank_sectors_by_alpha(
        &self,
        codes: &[String],
        _benchmark: &str,
        trade_date: NaiveDate,
    ) -> Result<Vec<AlphaScore>, ProviderError> {
        let scores = self.serve(trade_date, "alpha ranking", &self.alpha)?;
        Ok(scores.into_iter().filter(|s| codes.contains(&s.code)).collect())
    }

    async fn rank_velocity(
        &self,
        codes: &[String],
        _benchmark: &str,
        trade_date: NaiveDate,
    ) -> Result<HashMap<String, i32>, ProviderError> {
        let velocity = self.serve(trade_date, "rank velocity", &self.rank_velocity)?;
        Ok(velocity
            .into_iter()
            .filter(|(code, _)| codes.contains(code))
            .collect())
    }

    async fn limit_up_board(&self, trade_date: NaiveDate) -> Result<Vec<LimitUpEntry>, ProviderError> {
        self.serve(trade_date, "limit-up board", &self.limit_up_board)
    }

    async fn volume_anomaly_scan(
        &self,
        codes: &[String],
        trade_date: NaiveDate,
        _query: &ReboundQuery,
    ) -> Result<Vec<ReboundCandidate>, ProviderError> {
        // Rows are returned unfiltered by the thresholds; the scanner owns that check
        let rows = self.serve(trade_date, "volume anomaly scan", &self.rebounds)?;
        Ok(rows.into_iter().filter(|r| codes.contains(&r.code)).collect())
    }

    async fn money_flow_by_category(
        &self,
        trade_date: NaiveDate,
        _category: &str,
    ) -> Result<Vec<MoneyFlowRecord>, ProviderError> {
        self.serve(trade_date, "money flow", &self.money_flow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 3).unwrap()
    }

    #[tokio::test]
    async fn test_missing_dataset_is_unavailable() {
        let provider = SnapshotProvider::default();
        let result = provider.limit_up_board(date()).await;
        assert!(matches!(result, Err(ProviderError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_wrong_date_is_unavailable() {
        let provider = SnapshotProvider {
            trade_date: Some(date()),
            limit_up_board: Some(vec![]),
            ..Default::default()
        };
        let other = NaiveDate::from_ymd_opt(2025, 12, 4).unwrap();
        assert!(provider.limit_up_board(other).await.is_err());
        assert!(provider.limit_up_board(date()).await.is_ok());
    }

    #[tokio::test]
    async fn test_from_json_filters_by_codes() {
        let provider = SnapshotProvider::from_json(
            r#"{
                "hot_concepts": ["BK1", "BK2", "BK3"],
                "alpha": [
                    {"code": "BK1", "name": "机器人概念", "alpha": 4.2},
                    {"code": "BK9", "alpha": 1.0}
                ]
            }"#,
        )
        .unwrap();

        let codes = provider.discover_hot_concepts(date(), 2).await.unwrap();
        assert_eq!(codes, vec!["BK1".to_string(), "BK2".to_string()]);

        let alpha = provider
            .rank_sectors_by_alpha(&codes, "000300.SH", date())
            .await
            .unwrap();
        assert_eq!(alpha.len(), 1);
        assert_eq!(alpha[0].name.as_deref(), Some("机器人概念"));
    }
}
