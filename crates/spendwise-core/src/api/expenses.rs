//! Expense endpoints. Results come back exactly as the server ordered them.

use tracing::debug;

use super::{ApiClient, ApiError};
use crate::auth::{validate_prompt, ValidationError};
use crate::models::filter::encode_query;
use crate::models::{CategorySummary, DeleteResponse, Expense, ExpenseFilter, MonthlySummary, NewExpense};

const EXPENSES_PATH: &str = "/expenses/";
const CATEGORIES_PATH: &str = "/expenses/categories";
const MONTHLY_SUMMARY_PATH: &str = "/expenses/monthly-summary";

/// Append a query string to a path, skipping the `?` when there is nothing to add
fn with_query(path: &str, query: &str) -> String {
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query)
    }
}

impl ApiClient {
    /// List expenses matching `filter`
    pub async fn fetch_expenses(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>, ApiError> {
        let path = with_query(EXPENSES_PATH, &filter.query_string());
        let expenses: Vec<Expense> = self.get(&path).await?;
        debug!(count = expenses.len(), "Fetched expenses");
        Ok(expenses)
    }

    /// Per-category totals and counts
    pub async fn fetch_categories(&self) -> Result<Vec<CategorySummary>, ApiError> {
        self.get(CATEGORIES_PATH).await
    }

    /// Per-month totals, scoped to `year` (the server defaults to the current year)
    pub async fn fetch_monthly_summary(&self, year: Option<i32>) -> Result<Vec<MonthlySummary>, ApiError> {
        let pairs: Vec<(&str, String)> = year
            .filter(|y| *y != 0)
            .map(|y| ("year", y.to_string()))
            .into_iter()
            .collect();
        self.get(&with_query(MONTHLY_SUMMARY_PATH, &encode_query(&pairs))).await
    }

    /// Submit a free-text prompt such as "Spent 250 on groceries". The
    /// server extracts amount, category and description.
    pub async fn create_expense(&self, prompt: &str) -> Result<Expense, ApiError> {
        let prompt = validate_prompt(prompt)?;
        let expense: Expense = self.post(EXPENSES_PATH, &NewExpense { prompt }).await?;
        debug!(id = %expense.id, category = %expense.category, "Created expense");
        Ok(expense)
    }

    pub async fn delete_expense(&self, expense_id: &str) -> Result<DeleteResponse, ApiError> {
        let expense_id = expense_id.trim();
        if expense_id.is_empty() {
            return Err(ValidationError::MissingExpenseId.into());
        }
        self.delete_item(EXPENSES_PATH, expense_id).await
    }
}
