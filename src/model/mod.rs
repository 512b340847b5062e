//! Types that represent the core data model: the rows returned by the platform and the uniform
//! `Record` and `AggregateBucket` shapes that the metrics work with.
mod bucket;
mod record;
mod rows;

pub use bucket::AggregateBucket;
pub use record::Record;
pub use rows::{Audit, AuditGroup, GradeResult, Transaction, TransactionKind, User};

use serde::{Deserialize, Serialize};

/// Everything the dashboard needs about one student, as fetched in a single request cycle.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StudentData {
    pub(crate) user: User,
    /// `xp` transactions.
    pub(crate) xp: Vec<Transaction>,
    /// Project results, the graded attempts.
    pub(crate) results: Vec<GradeResult>,
    /// `skill_*` transactions.
    pub(crate) skills: Vec<Transaction>,
    /// Audits the student performed.
    pub(crate) audits: Vec<Audit>,
    /// `up` and `down` transactions: XP given and received through audits.
    pub(crate) audit_xp: Vec<Transaction>,
}

impl StudentData {
    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn xp(&self) -> &[Transaction] {
        &self.xp
    }

    pub fn results(&self) -> &[GradeResult] {
        &self.results
    }

    pub fn skills(&self) -> &[Transaction] {
        &self.skills
    }

    pub fn audits(&self) -> &[Audit] {
        &self.audits
    }

    pub fn audit_xp(&self) -> &[Transaction] {
        &self.audit_xp
    }
}

/// The last segment of a platform path, e.g. `/johvi/div-01/graphql` -> `graphql`. Falls back to
/// the whole path when there is nothing after the last slash.
pub(crate) fn path_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit('/').next() {
        Some(name) if !name.is_empty() => name,
        _ => path,
    }
}
