//! Rows as the platform's GraphQL endpoint returns them.
//!
//! Field names follow the endpoint's camelCase. Each row type knows how to reduce itself to a
//! [`Record`], which is the only shape the metrics work with.

use crate::model::{path_name, Record};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

const SKILL_PREFIX: &str = "skill_";

/// A row of the `user` table. Only `id` and `login` are guaranteed; the rest depend on what the
/// query asked for and what the campus fills in.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub campus: Option<String>,
    #[serde(default)]
    pub audit_ratio: Option<f64>,
    #[serde(default)]
    pub total_up: Option<f64>,
    #[serde(default)]
    pub total_down: Option<f64>,
}

/// The `type` column of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionKind {
    Xp,
    /// XP given by auditing someone else.
    Up,
    /// XP received from being audited.
    Down,
    /// A skill level, the payload is the skill name without the `skill_` prefix.
    Skill(String),
    Other(String),
}

impl From<String> for TransactionKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "xp" => TransactionKind::Xp,
            "up" => TransactionKind::Up,
            "down" => TransactionKind::Down,
            s => match s.strip_prefix(SKILL_PREFIX) {
                Some(name) => TransactionKind::Skill(name.to_string()),
                None => TransactionKind::Other(s.to_string()),
            },
        }
    }
}

impl From<TransactionKind> for String {
    fn from(value: TransactionKind) -> Self {
        value.to_string()
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Xp => write!(f, "xp"),
            TransactionKind::Up => write!(f, "up"),
            TransactionKind::Down => write!(f, "down"),
            TransactionKind::Skill(name) => write!(f, "{SKILL_PREFIX}{name}"),
            TransactionKind::Other(s) => write!(f, "{s}"),
        }
    }
}

/// A row of the `transaction` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(default)]
    pub path: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Skills are categorized by skill name, everything else by the project the path points to.
    pub fn to_record(&self) -> Record {
        let category = match &self.kind {
            TransactionKind::Skill(name) => name.as_str(),
            _ => path_name(&self.path),
        };
        Record::new(self.amount, category, self.created_at)
    }
}

/// A row of the `result` table: one graded attempt at a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeResult {
    /// `None` while the attempt is still being graded.
    #[serde(default)]
    pub grade: Option<f64>,
    #[serde(default)]
    pub path: String,
    pub created_at: DateTime<Utc>,
}

impl GradeResult {
    /// Ungraded attempts have no record.
    pub fn to_record(&self) -> Option<Record> {
        self.grade
            .map(|grade| Record::new(grade, path_name(&self.path), self.created_at))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditGroup {
    #[serde(default)]
    pub path: String,
}

/// A row of the `audit` table: a peer review the student performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    #[serde(default)]
    pub grade: Option<f64>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub group: Option<AuditGroup>,
}

impl Audit {
    /// Audits that were never submitted have no record.
    pub fn to_record(&self) -> Option<Record> {
        let path = self.group.as_ref().map(|g| g.path.as_str()).unwrap_or("");
        self.grade
            .map(|grade| Record::new(grade, path_name(path), self.created_at))
    }
}
