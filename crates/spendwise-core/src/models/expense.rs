use serde::{Deserialize, Serialize};

use crate::utils::format_date;

/// An expense as stored by the server.
///
/// The client never edits these; amount, category and description are
/// assigned server-side from the free-text prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Expense {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_prompt: Option<String>,
}

impl Expense {
    /// Creation time formatted for display, or the raw value if unparseable
    pub fn created_display(&self) -> String {
        format_date(&self.created_at)
    }
}

/// Body for `POST /expenses/`
#[derive(Debug, Clone, Serialize)]
pub struct NewExpense<'a> {
    pub prompt: &'a str,
}

/// Per-category aggregate from `GET /expenses/categories`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct CategorySummary {
    pub category: String,
    #[serde(default)]
    pub total: f64,
    pub count: u64,
}

/// Per-month aggregate from `GET /expenses/monthly-summary`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct MonthlySummary {
    pub month: u32,
    pub year: i32,
    pub total_amount: f64,
    pub expense_count: u64,
    #[serde(default)]
    pub unique_categories: u64,
}

/// Acknowledgement from `DELETE /expenses/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub message: Option<String>,
}
