//! Working set behind the expense dashboard.
//!
//! `Dashboard` keeps the expense list, category totals and monthly summary
//! that an embedder renders, plus the current filter selection. It only
//! talks to the server through `ApiClient`.

use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{CategorySummary, Expense, ExpenseFilter, MonthlySummary};

/// Name shown when no username has been cached
pub const FALLBACK_DISPLAY_NAME: &str = "User";

/// Which of the initial loads failed, if any
#[derive(Debug)]
pub enum LoadFailure {
    Expenses(ApiError),
    Categories(ApiError),
    MonthlySummary(ApiError),
}

impl LoadFailure {
    pub fn error(&self) -> &ApiError {
        match self {
            LoadFailure::Expenses(e) | LoadFailure::Categories(e) | LoadFailure::MonthlySummary(e) => e,
        }
    }
}

pub struct Dashboard {
    client: ApiClient,
    filter: ExpenseFilter,
    pub expenses: Vec<Expense>,
    pub categories: Vec<CategorySummary>,
    pub monthly_summary: Vec<MonthlySummary>,
}

impl Dashboard {
    /// Empty dashboard scoped to `year`
    pub fn new(client: ApiClient, year: Option<i32>) -> Self {
        Self {
            client,
            filter: ExpenseFilter::new().with_year(year),
            expenses: Vec::new(),
            categories: Vec::new(),
            monthly_summary: Vec::new(),
        }
    }

    pub fn filter(&self) -> &ExpenseFilter {
        &self.filter
    }

    /// Cached username, then the name claimed in the session token, then
    /// the generic fallback
    pub fn display_name(&self) -> String {
        let store = self.client.store();
        store
            .username()
            .filter(|name| !name.is_empty())
            .or_else(|| store.get().and_then(|token| token.claimed_username()))
            .unwrap_or_else(|| FALLBACK_DISPLAY_NAME.to_string())
    }

    /// Fetch expenses, categories and the monthly summary concurrently.
    /// Each succeeds or fails on its own; successful results are kept.
    pub async fn load(&mut self) -> Vec<LoadFailure> {
        let (expenses, categories, summary) = tokio::join!(
            self.client.fetch_expenses(&self.filter),
            self.client.fetch_categories(),
            self.client.fetch_monthly_summary(self.filter.year),
        );

        let mut failures = Vec::new();
        match expenses {
            Ok(expenses) => self.expenses = expenses,
            Err(e) => failures.push(LoadFailure::Expenses(e)),
        }
        match categories {
            Ok(categories) => self.categories = categories,
            Err(e) => failures.push(LoadFailure::Categories(e)),
        }
        match summary {
            Ok(summary) => self.monthly_summary = summary,
            Err(e) => failures.push(LoadFailure::MonthlySummary(e)),
        }

        for failure in &failures {
            warn!(error = %failure.error(), "Dashboard load step failed");
        }
        failures
    }

    /// Refetch the expense list with the current filter
    pub async fn reload_expenses(&mut self) -> Result<(), ApiError> {
        self.expenses = self.client.fetch_expenses(&self.filter).await?;
        Ok(())
    }

    /// Returns true when the selection changed and expenses need reloading
    pub fn select_category(&mut self, category: Option<String>) -> bool {
        self.replace_filter(ExpenseFilter {
            category,
            ..self.filter.clone()
        })
    }

    pub fn select_month(&mut self, month: Option<u32>) -> bool {
        self.replace_filter(ExpenseFilter {
            month,
            ..self.filter.clone()
        })
    }

    /// Clearing the year also clears the month
    pub fn select_year(&mut self, year: Option<i32>) -> bool {
        self.replace_filter(self.filter.clone().with_year(year))
    }

    fn replace_filter(&mut self, filter: ExpenseFilter) -> bool {
        if filter == self.filter {
            return false;
        }
        debug!(query = %filter.query_string(), "Filter changed");
        self.filter = filter;
        true
    }

    /// Create an expense and put it at the top of the list
    pub async fn add_expense(&mut self, prompt: &str) -> Result<&Expense, ApiError> {
        let expense = self.client.create_expense(prompt).await?;
        self.expenses.insert(0, expense);
        self.refresh_categories().await;
        Ok(&self.expenses[0])
    }

    /// Delete remotely, then drop the expense from the local list
    pub async fn delete_expense(&mut self, expense_id: &str) -> Result<(), ApiError> {
        self.client.delete_expense(expense_id).await?;
        self.expenses.retain(|e| e.id != expense_id.trim());
        self.refresh_categories().await;
        Ok(())
    }

    /// Best-effort: a failed refresh keeps the previous totals
    async fn refresh_categories(&mut self) {
        match self.client.fetch_categories().await {
            Ok(categories) => self.categories = categories,
            Err(e) => warn!(error = %e, "Failed to reload categories"),
        }
    }

    /// Sum of the expenses currently shown
    pub fn total_spent(&self) -> f64 {
        self.expenses.iter().map(|e| e.amount).sum()
    }
}
