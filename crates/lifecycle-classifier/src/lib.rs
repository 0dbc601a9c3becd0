//! Mainline Lifecycle Classifier
//!
//! Fuses the alpha ranking, rank velocity and the limit-up board into a
//! life-cycle phase for each hot concept sector.

use chrono::NaiveDate;
use meso_core::{
    AlphaScore, FetchOutcome, IssueKind, JoinStatus, LifecyclePhase, MainlineResult,
    ModuleStatus, NameIndex, NameMatcher, PipelineIssue, ScanConfig, SectorDataProvider,
    SectorRecord, Stage,
};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

const SOURCE_UNIVERSE: &str = "hot concepts";
const SOURCE_ALPHA: &str = "alpha ranking";
const SOURCE_VELOCITY: &str = "rank velocity";
const SOURCE_LIMIT_UP: &str = "limit-up board";

/// Thresholds for the climax phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifecycleThresholds {
    /// Alpha (%) a sector must exceed
    pub climax_alpha_floor: f64,
    /// Limit-up count a sector must exceed
    pub climax_limit_up_floor: u32,
}

/// Module A: classifies hot concept sectors into life-cycle phases
pub struct LifecycleClassifier {
    benchmark: String,
    hot_concept_limit: usize,
    top_n: usize,
    thresholds: LifecycleThresholds,
}

impl LifecycleClassifier {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            benchmark: config.benchmark.clone(),
            hot_concept_limit: config.hot_concept_limit,
            top_n: config.top_n,
            thresholds: LifecycleThresholds {
                climax_alpha_floor: config.climax_alpha_floor,
                climax_limit_up_floor: config.climax_limit_up_floor,
            },
        }
    }

    /// Phase for one sector. Rules are checked in order and the first match
    /// wins; an unknown rank change counts as the neutral value 0.
    pub fn classify(
        &self,
        alpha: f64,
        rank_change: Option<i32>,
        limit_up_count: u32,
    ) -> LifecyclePhase {
        let rank_change = rank_change.unwrap_or(0);

        if alpha > self.thresholds.climax_alpha_floor
            && rank_change >= 0
            && limit_up_count > self.thresholds.climax_limit_up_floor
        {
            LifecyclePhase::Climax
        } else if alpha > 0.0 && rank_change > 0 {
            LifecyclePhase::Launch
        } else if alpha > 0.0 {
            LifecyclePhase::Divergence
        } else {
            LifecyclePhase::Fading
        }
    }

    /// Run Module A for a trade date. Never returns an error: fatal fetch
    /// failures come back as `success: false` with no concepts.
    pub async fn analyze(
        &self,
        provider: &dyn SectorDataProvider,
        trade_date: NaiveDate,
        matcher: &dyn NameMatcher,
    ) -> MainlineResult {
        info!("Module A: classifying mainline sectors for {}", trade_date);

        // 1. Candidate universe and alpha ranking are both primary
        let universe = FetchOutcome::primary(
            SOURCE_UNIVERSE,
            provider
                .discover_hot_concepts(trade_date, self.hot_concept_limit)
                .await,
        );
        let codes = match universe {
            FetchOutcome::Available(codes) => codes,
            other => return Self::fatal(SOURCE_UNIVERSE, other.reason()),
        };

        let alpha = FetchOutcome::primary(
            SOURCE_ALPHA,
            provider
                .rank_sectors_by_alpha(&codes, &self.benchmark, trade_date)
                .await,
        );
        let mut scores = match alpha {
            FetchOutcome::Available(scores) => scores,
            other => return Self::fatal(SOURCE_ALPHA, other.reason()),
        };

        Self::sort_by_alpha(&mut scores);
        Self::dedup_by_code(&mut scores);
        scores.truncate(self.top_n);

        let mut issues = Vec::new();

        // 2. Rank velocity degrades to unknown
        let velocity = FetchOutcome::secondary(
            SOURCE_VELOCITY,
            provider
                .rank_velocity(&codes, &self.benchmark, trade_date)
                .await,
        );
        let velocity: Option<HashMap<String, i32>> = match velocity {
            FetchOutcome::Available(map) => Some(map),
            other => {
                let reason = other.reason().unwrap_or_default().to_string();
                warn!("Rank velocity degraded, rank changes unknown: {}", reason);
                issues.push(PipelineIssue::new(
                    Stage::Mainline,
                    IssueKind::DegradedFetch,
                    SOURCE_VELOCITY,
                    reason,
                ));
                None
            }
        };

        // 3. Limit-up board, joined by reconciled name
        let board = match provider.limit_up_board(trade_date).await {
            Ok(entries) => Some(entries),
            Err(e) => {
                let reason = format!("{} failed: {}", SOURCE_LIMIT_UP, e);
                warn!("Limit-up board degraded, counts set to 0: {}", reason);
                issues.push(PipelineIssue::new(
                    Stage::Mainline,
                    IssueKind::DegradedFetch,
                    SOURCE_LIMIT_UP,
                    reason,
                ));
                None
            }
        };
        let board_index = board.as_ref().map(|entries| {
            NameIndex::build_with(
                matcher,
                entries.iter(),
                |e| e.name.as_str(),
                |e| e.limit_up_count,
            )
        });

        let mut missed = Vec::new();
        let mut velocity_missed = Vec::new();
        let concepts: Vec<SectorRecord> = scores
            .into_iter()
            .map(|score| {
                let name = score
                    .name
                    .clone()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| score.code.clone());
                let clean_name = matcher.clean(&name);
                let alpha = if score.alpha.is_finite() { score.alpha } else { 0.0 };

                let rank_change = velocity.as_ref().and_then(|map| {
                    let change = map.get(&score.code).copied();
                    if change.is_none() {
                        debug!("No rank velocity for '{}' ({})", name, score.code);
                        velocity_missed.push(score.code.clone());
                    }
                    change
                });

                let (limit_up_count, limit_up_join) = match &board_index {
                    None => (0, JoinStatus::SourceUnavailable),
                    Some(index) => match index.lookup(&name, matcher) {
                        Some(count) => (*count, JoinStatus::Matched),
                        None => {
                            debug!("No limit-up board entry for '{}' ({})", name, score.code);
                            missed.push(name.clone());
                            (0, JoinStatus::Missed)
                        }
                    },
                };

                let status = self.classify(alpha, rank_change, limit_up_count);

                SectorRecord {
                    code: score.code,
                    name,
                    clean_name,
                    alpha,
                    rank_change,
                    limit_up_count,
                    limit_up_join,
                    status,
                }
            })
            .collect();

        if !missed.is_empty() {
            info!(
                "Limit-up join missed {}/{} sectors",
                missed.len(),
                concepts.len()
            );
            issues.push(PipelineIssue::new(
                Stage::Mainline,
                IssueKind::JoinMiss,
                SOURCE_LIMIT_UP,
                format!(
                    "{} of {} sectors unmatched, counted as 0: {}",
                    missed.len(),
                    concepts.len(),
                    missed.join(", ")
                ),
            ));
        }

        if !velocity_missed.is_empty() {
            info!(
                "Rank velocity missing for {}/{} sectors",
                velocity_missed.len(),
                concepts.len()
            );
            issues.push(PipelineIssue::new(
                Stage::Mainline,
                IssueKind::JoinMiss,
                SOURCE_VELOCITY,
                format!(
                    "{} of {} sectors without rank change, treated as unknown: {}",
                    velocity_missed.len(),
                    concepts.len(),
                    velocity_missed.join(", ")
                ),
            ));
        }

        info!("Module A complete: {} sectors classified", concepts.len());

        MainlineResult {
            status: ModuleStatus::ok(),
            concepts,
            issues,
        }
    }

    fn sort_by_alpha(scores: &mut [AlphaScore]) {
        scores.sort_by(|a, b| {
            let alpha_a = if a.alpha.is_finite() { a.alpha } else { 0.0 };
            let alpha_b = if b.alpha.is_finite() { b.alpha } else { 0.0 };
            alpha_b
                .partial_cmp(&alpha_a)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.code.cmp(&b.code))
        });
    }

    /// Keep the first (highest alpha) row per code
    fn dedup_by_code(scores: &mut Vec<AlphaScore>) {
        let before = scores.len();
        let mut seen = HashSet::new();
        scores.retain(|s| seen.insert(s.code.clone()));
        if scores.len() < before {
            warn!(
                "Alpha ranking repeated codes, dropped {} duplicate rows",
                before - scores.len()
            );
        }
    }

    fn fatal(source: &str, reason: Option<&str>) -> MainlineResult {
        let reason = reason.unwrap_or("unknown error").to_string();
        warn!("Module A failed: {}", reason);
        MainlineResult {
            status: ModuleStatus::failed(reason.clone()),
            concepts: Vec::new(),
            issues: vec![PipelineIssue::new(
                Stage::Mainline,
                IssueKind::FatalFetch,
                source,
                reason,
            )],
        }
    }
}
