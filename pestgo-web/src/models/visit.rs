use serde::{Deserialize, Serialize};

use super::contains_term;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    Planned,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl VisitStatus {
    /// Statuses a visit can be given from the form.
    pub const SELECTABLE: [VisitStatus; 3] = [
        VisitStatus::Planned,
        VisitStatus::Completed,
        VisitStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VisitStatus::Planned => "planned",
            VisitStatus::Completed => "completed",
            VisitStatus::Cancelled => "cancelled",
            VisitStatus::Unknown => "unknown",
        }
    }

    pub fn label_key(&self) -> &'static str {
        match self {
            VisitStatus::Planned => "visits.status.planned",
            VisitStatus::Completed => "visits.status.completed",
            VisitStatus::Cancelled => "visits.status.cancelled",
            VisitStatus::Unknown => "visits.status.unknown",
        }
    }

    pub fn parse(value: &str) -> Option<VisitStatus> {
        Self::SELECTABLE
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

/// Customer columns shown next to a visit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VisitCustomer {
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Visit {
    pub id: String,
    pub customer_id: String,
    #[serde(default)]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub operator_id: Option<String>,
    pub visit_date: String,
    pub status: VisitStatus,
    #[serde(default)]
    pub visit_type: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_by_company_id: Option<String>,
    /// Filled in from the customers table when listing.
    #[serde(default)]
    pub customer: Option<VisitCustomer>,
}

impl Visit {
    /// Blank terms match everything.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim();
        term.is_empty()
            || contains_term(self.visit_type.as_deref(), term)
            || contains_term(self.notes.as_deref(), term)
            || contains_term(self.customer_name(), term)
    }

    pub fn customer_name(&self) -> Option<&str> {
        self.customer.as_ref().and_then(|c| c.company_name.as_deref())
    }
}

/// Columns written when a visit is created or edited.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitInput {
    pub customer_id: String,
    pub visit_date: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub visit_type: Option<String>,
    pub status: VisitStatus,
    pub notes: Option<String>,
    /// Set for company accounts; left untouched otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by_company_id: Option<String>,
}
