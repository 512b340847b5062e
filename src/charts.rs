//! Chart-ready views of a student's data.
//!
//! Each function reduces rows to [`Record`]s and runs them through [`crate::metrics`]. The results
//! only describe what to draw; drawing is left to [`crate::render`] or any other front end that
//! reads the JSON.

use crate::metrics::{self, BucketWidth, PassRatio};
use crate::model::{
    AggregateBucket, Audit, GradeResult, Record, StudentData, Transaction, TransactionKind, User,
};
use crate::session::Claims;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// How a chart should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
    Radar,
    Pie,
    Histogram,
}

serde_plain::derive_display_from_serialize!(ChartKind);

/// A titled series of buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub title: String,
    pub kind: ChartKind,
    pub buckets: Vec<AggregateBucket>,
}

impl Chart {
    pub fn new(title: impl Into<String>, kind: ChartKind, buckets: Vec<AggregateBucket>) -> Self {
        Self {
            title: title.into(),
            kind,
            buckets,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Runtime knobs for shaping the charts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartOptions {
    /// Bars and radar axes to keep.
    pub top_n: usize,
    /// Records averaged together when smoothing XP over time.
    pub run_size: NonZeroUsize,
    /// Grade histogram bucket width.
    pub width: BucketWidth,
}

fn records(transactions: &[Transaction]) -> Vec<Record> {
    transactions.iter().map(Transaction::to_record).collect()
}

/// The student's identity and total XP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user: User,
    pub total_xp: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims: Option<Claims>,
}

pub fn profile(user: &User, xp: &[Transaction], claims: Option<Claims>) -> Profile {
    Profile {
        user: user.clone(),
        total_xp: xp.iter().map(|t| t.amount).sum(),
        claims,
    }
}

/// XP earned per project, over time, and smoothed over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XpView {
    pub total: f64,
    pub by_project: Chart,
    pub progress: Chart,
    pub smoothed: Chart,
}

pub fn xp(xp: &[Transaction], options: &ChartOptions) -> XpView {
    let records = records(xp);
    XpView {
        total: records.iter().map(|r| r.amount()).sum(),
        by_project: Chart::new(
            format!("XP by project (top {})", options.top_n),
            ChartKind::Bar,
            metrics::top_n(metrics::group_sum(&records), options.top_n),
        ),
        progress: Chart::new(
            "XP progress over time",
            ChartKind::Line,
            metrics::cumulative(&records),
        ),
        smoothed: Chart::new(
            format!("XP earned, averaged every {} records", options.run_size),
            ChartKind::Line,
            metrics::time_buckets(&records, options.run_size),
        ),
    }
}

/// Project pass/fail and the spread of grades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradesView {
    pub pass_fail: PassRatio,
    pub pie: Chart,
    pub histogram: Chart,
}

pub fn grades(results: &[GradeResult], options: &ChartOptions) -> GradesView {
    let records: Vec<Record> = results.iter().filter_map(GradeResult::to_record).collect();
    let pass_fail = metrics::ratio(&records, metrics::is_pass);
    GradesView {
        pie: Chart::new("PASS/FAIL ratio", ChartKind::Pie, pass_fail.slices()),
        histogram: Chart::new(
            format!("Grades, bucket width {}", options.width),
            ChartKind::Histogram,
            metrics::histogram(records.iter().map(Record::amount), options.width),
        ),
        pass_fail,
    }
}

/// The highest level reached in each skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillsView {
    pub radar: Chart,
}

pub fn skills(skills: &[Transaction], options: &ChartOptions) -> SkillsView {
    let records = records(skills);
    SkillsView {
        radar: Chart::new(
            format!("Skills (top {})", options.top_n),
            ChartKind::Radar,
            metrics::top_n(metrics::group_max(&records), options.top_n),
        ),
    }
}

/// XP given through audits against XP received from being audited.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuditRatio {
    pub done: f64,
    pub received: f64,
    /// `done / received`, where nothing received divides by one instead.
    pub ratio: f64,
}

pub fn audit_ratio(audit_xp: &[Transaction]) -> AuditRatio {
    let sum = |kind: TransactionKind| -> f64 {
        audit_xp
            .iter()
            .filter(|t| t.kind == kind)
            .map(|t| t.amount)
            .sum()
    };
    let done = sum(TransactionKind::Up);
    let received = sum(TransactionKind::Down);
    AuditRatio {
        done,
        received,
        ratio: metrics::guarded_div(done, received),
    }
}

/// The audits the student performed, and the audit ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditsView {
    pub pass_fail: PassRatio,
    pub pie: Chart,
    pub audit_ratio: AuditRatio,
}

pub fn audits(audits: &[Audit], audit_xp: &[Transaction]) -> AuditsView {
    let records: Vec<Record> = audits.iter().filter_map(Audit::to_record).collect();
    let pass_fail = metrics::ratio(&records, metrics::is_pass);
    AuditsView {
        pie: Chart::new("Audits passed/failed", ChartKind::Pie, pass_fail.slices()),
        pass_fail,
        audit_ratio: audit_ratio(audit_xp),
    }
}

/// Every view at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub profile: Profile,
    pub xp: XpView,
    pub grades: GradesView,
    pub skills: SkillsView,
    pub audits: AuditsView,
}

pub fn dashboard(data: &StudentData, claims: Option<Claims>, options: &ChartOptions) -> Dashboard {
    Dashboard {
        profile: profile(data.user(), data.xp(), claims),
        xp: xp(data.xp(), options),
        grades: grades(data.results(), options),
        skills: skills(data.skills(), options),
        audits: audits(data.audits(), data.audit_xp()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn options() -> ChartOptions {
        ChartOptions {
            top_n: 2,
            run_size: NonZeroUsize::new(2).unwrap(),
            width: BucketWidth::new(0.5).unwrap(),
        }
    }

    fn tx(amount: f64, kind: &str, path: &str, day: u32) -> Transaction {
        Transaction {
            amount,
            kind: TransactionKind::from(kind.to_string()),
            path: path.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 2, day, 9, 0, 0).unwrap(),
        }
    }

    fn result(grade: Option<f64>, day: u32) -> GradeResult {
        GradeResult {
            grade,
            path: "/johvi/div-01/forum".into(),
            created_at: Utc.with_ymd_and_hms(2024, 2, day, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn xp_view() {
        let rows = vec![
            tx(100.0, "xp", "/johvi/div-01/forum", 3),
            tx(50.0, "xp", "/johvi/div-01/graphql", 1),
            tx(25.0, "xp", "/johvi/div-01/forum", 2),
            tx(10.0, "xp", "/johvi/div-01/ascii-art", 4),
        ];
        let view = xp(&rows, &options());
        assert_eq!(view.total, 185.0);
        assert_eq!(
            view.by_project.buckets,
            vec![
                AggregateBucket::new("forum", 125.0),
                AggregateBucket::new("graphql", 50.0)
            ]
        );
        let progress: Vec<f64> = view.progress.buckets.iter().map(|b| b.value()).collect();
        assert_eq!(progress, vec![50.0, 75.0, 175.0, 185.0]);
        let smoothed: Vec<f64> = view.smoothed.buckets.iter().map(|b| b.value()).collect();
        assert_eq!(smoothed, vec![37.5, 55.0]);
    }

    #[test]
    fn grades_view_skips_ungraded() {
        let rows = vec![
            result(Some(1.0), 1),
            result(Some(0.0), 2),
            result(None, 3),
            result(Some(1.4), 4),
        ];
        let view = grades(&rows, &options());
        assert_eq!(view.pass_fail.pass, 2);
        assert_eq!(view.pass_fail.fail, 1);
        assert_eq!(view.pass_fail.ratio, 2.0);
        assert_eq!(view.pie.kind, ChartKind::Pie);
        let counted: f64 = view.histogram.buckets.iter().map(|b| b.value()).sum();
        assert_eq!(counted, 3.0);
    }

    #[test]
    fn skills_view_takes_max_level() {
        let rows = vec![
            tx(10.0, "skill_go", "", 1),
            tx(30.0, "skill_go", "", 2),
            tx(20.0, "skill_js", "", 3),
            tx(5.0, "skill_algo", "", 4),
        ];
        let view = skills(&rows, &options());
        assert_eq!(
            view.radar.buckets,
            vec![
                AggregateBucket::new("go", 30.0),
                AggregateBucket::new("js", 20.0)
            ]
        );
    }

    #[test]
    fn audit_ratio_guarded() {
        let rows = vec![tx(300.0, "up", "", 1), tx(200.0, "down", "", 2)];
        assert_eq!(audit_ratio(&rows).ratio, 1.5);
        let only_up = vec![tx(300.0, "up", "", 1)];
        let ratio = audit_ratio(&only_up);
        assert_eq!((ratio.done, ratio.received, ratio.ratio), (300.0, 0.0, 300.0));
        assert_eq!(audit_ratio(&[]), AuditRatio::default());
    }

    #[test]
    fn empty_data_empty_charts() {
        let dashboard = dashboard(&StudentData::default(), None, &options());
        assert_eq!(dashboard.profile.total_xp, 0.0);
        assert!(dashboard.xp.by_project.is_empty());
        assert!(dashboard.xp.progress.is_empty());
        assert!(dashboard.xp.smoothed.is_empty());
        assert!(dashboard.grades.pie.is_empty());
        assert!(dashboard.grades.histogram.is_empty());
        assert!(dashboard.skills.radar.is_empty());
        assert!(dashboard.audits.pie.is_empty());
        assert_eq!(dashboard.audits.audit_ratio.ratio, 0.0);
    }
}
