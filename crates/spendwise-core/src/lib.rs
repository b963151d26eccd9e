//! Core library for the spendwise expense-tracker client.
//!
//! - `api`: the request pipeline (`ApiClient`) and expense endpoints
//! - `auth`: token storage, session state and client-side validation
//! - `models`: wire types and the `ExpenseFilter` query composer
//! - `dashboard`: the dashboard's load/filter/add/delete data flow
//! - `config`: base URL, timeout and token backend settings

pub mod api;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError, SessionEvent, SignupOutcome};
pub use auth::{AuthState, SessionManager, TokenStore};
pub use config::Config;
pub use dashboard::Dashboard;
pub use models::{AuthToken, CategorySummary, Expense, ExpenseFilter, MonthlySummary};
