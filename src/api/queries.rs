//! The GraphQL queries the dashboard runs.
//!
//! Filters are passed as a `$where` variable so the optional user scope can be left out entirely
//! rather than compared against `null`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

const USER: &str = r#"query User {
  user {
    id
    login
    email
    campus
    auditRatio
    totalUp
    totalDown
  }
}"#;

const TRANSACTIONS: &str = r#"query Transactions($where: transaction_bool_exp) {
  transaction(where: $where, order_by: {createdAt: asc}) {
    amount
    type
    path
    createdAt
  }
}"#;

const RESULTS: &str = r#"query Results($where: result_bool_exp) {
  result(where: $where, order_by: {createdAt: asc}) {
    grade
    path
    createdAt
  }
}"#;

const AUDITS: &str = r#"query Audits($where: audit_bool_exp) {
  audit(where: $where, order_by: {createdAt: asc}) {
    grade
    createdAt
    group {
      path
    }
  }
}"#;

/// The record kinds that can be queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    User,
    /// `xp` transactions.
    Xp,
    /// `skill_*` transactions.
    Skills,
    /// `up` and `down` transactions.
    AuditXp,
    Results,
    Audits,
}

serde_plain::derive_display_from_serialize!(Resource);

impl Resource {
    /// The field of `data` holding the rows.
    pub fn root(&self) -> &'static str {
        match self {
            Resource::User => "user",
            Resource::Xp | Resource::Skills | Resource::AuditXp => "transaction",
            Resource::Results => "result",
            Resource::Audits => "audit",
        }
    }

    fn text(&self) -> &'static str {
        match self {
            Resource::User => USER,
            Resource::Xp | Resource::Skills | Resource::AuditXp => TRANSACTIONS,
            Resource::Results => RESULTS,
            Resource::Audits => AUDITS,
        }
    }

    /// The column that ties a row to a user.
    fn user_column(&self) -> Option<&'static str> {
        match self {
            Resource::User => None,
            Resource::Xp | Resource::Skills | Resource::AuditXp | Resource::Results => {
                Some("userId")
            }
            Resource::Audits => Some("auditorId"),
        }
    }

    fn filter(&self) -> Map<String, Value> {
        let mut filter = Map::new();
        match self {
            Resource::Xp => {
                filter.insert("type".into(), json!({ "_eq": "xp" }));
            }
            Resource::Skills => {
                filter.insert("type".into(), json!({ "_like": "skill_%" }));
            }
            Resource::AuditXp => {
                filter.insert("type".into(), json!({ "_in": ["up", "down"] }));
            }
            Resource::User | Resource::Results | Resource::Audits => {}
        }
        filter
    }
}

/// A parameterized query: which resource, and the variables to send with it.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphQuery {
    resource: Resource,
    variables: Map<String, Value>,
}

impl GraphQuery {
    /// A query for `resource`, scoped to `user_id` when one is given.
    pub fn new(resource: Resource, user_id: Option<i64>) -> Self {
        let mut variables = Map::new();
        if resource != Resource::User {
            let mut filter = resource.filter();
            if let (Some(column), Some(id)) = (resource.user_column(), user_id) {
                filter.insert(column.into(), json!({ "_eq": id }));
            }
            variables.insert("where".into(), Value::Object(filter));
        }
        Self {
            resource,
            variables,
        }
    }

    pub fn user() -> Self {
        Self::new(Resource::User, None)
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn text(&self) -> &'static str {
        self.resource.text()
    }

    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    /// The JSON body posted to the GraphQL endpoint.
    pub fn body(&self) -> Value {
        json!({
            "query": self.text(),
            "variables": self.variables,
        })
    }
}
