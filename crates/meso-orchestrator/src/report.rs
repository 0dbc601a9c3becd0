//! Plain-text rendering of an `AnalysisReport`

use meso_core::{provider_date, AnalysisReport, GoldenOrigin, LifecyclePhase, ModuleStatus};

const RULE_WIDTH: usize = 60;
const NAME_WIDTH: usize = 12;
const REBOUND_ROWS: usize = 10;
const WARNING_ROWS: usize = 5;
const GOLDEN_ROWS: usize = 10;

/// Money-flow figures are shown in units of 1e8 (亿)
const FLOW_UNIT: f64 = 1e8;

fn short_name(name: &str) -> String {
    name.chars().take(NAME_WIDTH).collect()
}

fn rank_change_label(rank_change: Option<i32>) -> String {
    match rank_change {
        None => "n/a".to_string(),
        Some(0) => "0".to_string(),
        Some(c) if c > 0 => format!("{:+} ↑", c),
        Some(c) => format!("{:+} ↓", c),
    }
}

fn flow_label(net_inflow: Option<f64>) -> String {
    match net_inflow {
        Some(v) => format!("{:+.2} 亿", v / FLOW_UNIT),
        None => "-".to_string(),
    }
}

fn failure_line(status: &ModuleStatus) -> String {
    format!(
        "!! Module failed: {}",
        status.error.as_deref().unwrap_or("unknown error")
    )
}

pub fn render_report(report: &AnalysisReport) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push("Meso Scan Report".to_string());
    lines.push("=".repeat(RULE_WIDTH));
    lines.push(format!(
        "Trade date: {} ({})",
        report.trade_date,
        provider_date(report.trade_date)
    ));
    lines.push(format!("Generated:  {}", report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")));
    lines.push(String::new());

    // Module A
    lines.push("[Module A: Mainline]".to_string());
    lines.push("-".repeat(RULE_WIDTH));
    if !report.mainline.success {
        lines.push(failure_line(&report.mainline));
    } else if report.concepts.is_empty() {
        lines.push("No sectors ranked for this date".to_string());
    } else {
        lines.push(format!("Top {} concept sectors by alpha:", report.concepts.len()));
        lines.push(String::new());
        lines.push("| Rank | Name         | Alpha    | Rank chg | Limit-up | Phase      |".to_string());
        lines.push("|------|--------------|----------|----------|----------|------------|".to_string());
        for (i, concept) in report.concepts.iter().enumerate() {
            lines.push(format!(
                "| {:<4} | {:<12} | {:<8} | {:<8} | {:<8} | {:<10} |",
                i + 1,
                short_name(&concept.name),
                format!("{:+.2}%", concept.alpha),
                rank_change_label(concept.rank_change),
                concept.limit_up_count,
                concept.status.name()
            ));
        }
    }
    lines.push(String::new());

    // Module B
    lines.push("[Module B: Rebound]".to_string());
    lines.push("-".repeat(RULE_WIDTH));
    if !report.rebound.success {
        lines.push(failure_line(&report.rebound));
    } else if report.rebounds.is_empty() {
        lines.push("No sector meets the rebound conditions".to_string());
    } else {
        lines.push("Oversold with volume spike:".to_string());
        lines.push(String::new());
        lines.push("| Name         | 5d chg  | Vol ratio | Turnover |".to_string());
        lines.push("|--------------|---------|-----------|----------|".to_string());
        for rebound in report.rebounds.iter().take(REBOUND_ROWS) {
            lines.push(format!(
                "| {:<12} | {:<7} | {:<9} | {:<8} |",
                short_name(&rebound.name),
                format!("{:.1}%", rebound.price_change_5d),
                format!("{:.2}", rebound.vol_ratio),
                format!("{:.1}%", rebound.turnover_rate)
            ));
        }
    }
    lines.push(String::new());

    // Module C
    lines.push("[Module C: Money-flow validation]".to_string());
    lines.push("-".repeat(RULE_WIDTH));
    if !report.validation.success {
        lines.push(failure_line(&report.validation));
    } else {
        if !report.flow_validated {
            lines.push("!! Flow validation skipped: money-flow data unavailable".to_string());
            lines.push("!! Golden list below is the top of Module A, unvalidated".to_string());
            lines.push(String::new());
        }

        if !report.warnings.is_empty() {
            lines.push("Flow divergence warnings (heavy outflow, avoid chasing):".to_string());
            lines.push("| Name         | Phase      | Net flow     |".to_string());
            lines.push("|--------------|------------|--------------|".to_string());
            for warning in report.warnings.iter().take(WARNING_ROWS) {
                lines.push(format!(
                    "| {:<12} | {:<10} | {:<12} |",
                    short_name(&warning.sector),
                    warning.status.name(),
                    flow_label(Some(warning.net_inflow))
                ));
            }
            lines.push(String::new());
        }

        if report.golden_list.is_empty() {
            lines.push("No sector passed flow validation".to_string());
        } else {
            lines.push("Golden list:".to_string());
            lines.push("| Name         | Source     | Alpha    | Net flow     |".to_string());
            lines.push("|--------------|------------|----------|--------------|".to_string());
            for entry in report.golden_list.iter().take(GOLDEN_ROWS) {
                let source = match entry.origin {
                    GoldenOrigin::Mainline { status } => status.name(),
                    GoldenOrigin::Rebound => "Rebound",
                };
                let alpha = entry
                    .alpha
                    .map(|a| format!("{:+.2}%", a))
                    .unwrap_or_else(|| "-".to_string());
                lines.push(format!(
                    "| {:<12} | {:<10} | {:<8} | {:<12} |",
                    short_name(&entry.name),
                    source,
                    alpha,
                    flow_label(entry.net_inflow)
                ));
            }
        }
    }
    lines.push(String::new());

    if !report.issues.is_empty() {
        lines.push(format!("Data issues ({}):", report.issues.len()));
        for issue in &report.issues {
            lines.push(format!(
                "  - [{:?}/{:?}] {}: {}",
                issue.stage, issue.kind, issue.source, issue.detail
            ));
        }
        lines.push(String::new());
    }

    lines.push("=".repeat(RULE_WIDTH));
    lines.push("Phases:".to_string());
    for phase in [
        LifecyclePhase::Climax,
        LifecyclePhase::Launch,
        LifecyclePhase::Divergence,
        LifecyclePhase::Fading,
    ] {
        lines.push(format!("  * [{}] {}", phase.name(), phase.description()));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use meso_core::{
        GoldenEntry, JoinStatus, MainlineResult, ReboundResult, SectorRecord, ValidationResult,
    };

    fn sector(name: &str, alpha: f64, rank_change: Option<i32>) -> SectorRecord {
        SectorRecord {
            code: format!("BK-{}", name),
            name: name.to_string(),
            clean_name: name.to_string(),
            alpha,
            rank_change,
            limit_up_count: 3,
            limit_up_join: JoinStatus::Matched,
            status: LifecyclePhase::Launch,
        }
    }

    fn report(validation: ValidationResult) -> AnalysisReport {
        let mainline = MainlineResult {
            status: ModuleStatus::ok(),
            concepts: vec![
                sector("Robotics", 12.5, Some(4)),
                sector("Lithography", 3.1, Some(-2)),
                sector("Shipping", -1.0, None),
            ],
            issues: vec![],
        };
        let rebound = ReboundResult {
            status: ModuleStatus::ok(),
            ..Default::default()
        };
        AnalysisReport::assemble(
            NaiveDate::from_ymd_opt(2025, 12, 3).unwrap(),
            mainline,
            rebound,
            validation,
        )
    }

    #[test]
    fn test_rank_change_arrows() {
        assert_eq!(rank_change_label(Some(4)), "+4 ↑");
        assert_eq!(rank_change_label(Some(-2)), "-2 ↓");
        assert_eq!(rank_change_label(Some(0)), "0");
        assert_eq!(rank_change_label(None), "n/a");
    }

    #[test]
    fn test_renders_every_section() {
        let validation = ValidationResult {
            status: ModuleStatus::ok(),
            golden_list: vec![GoldenEntry::from_sector(&sector("Robotics", 12.5, Some(4)), Some(2.5e8))],
            flow_validated: true,
            ..Default::default()
        };
        let text = render_report(&report(validation));

        assert!(text.contains("2025-12-03 (20251203)"));
        assert!(text.contains("[Module A: Mainline]"));
        assert!(text.contains("+12.50%"));
        assert!(text.contains("+4 ↑"));
        assert!(text.contains("No sector meets the rebound conditions"));
        assert!(text.contains("+2.50 亿"));
        assert!(!text.contains("Flow validation skipped"));
        assert!(text.contains("[Climax]"));
    }

    #[test]
    fn test_degraded_banner() {
        let validation = ValidationResult {
            status: ModuleStatus::ok(),
            flow_validated: false,
            ..Default::default()
        };
        let text = render_report(&report(validation));
        assert!(text.contains("Flow validation skipped"));
    }

    #[test]
    fn test_failed_module_shows_error() {
        let validation = ValidationResult {
            status: ModuleStatus::failed("money flow failed: timeout"),
            ..Default::default()
        };
        let text = render_report(&report(validation));
        assert!(text.contains("!! Module failed: money flow failed: timeout"));
    }
}
