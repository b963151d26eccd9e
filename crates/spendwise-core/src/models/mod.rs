//! Data models for the expense-tracker API.
//!
//! - `Expense`, `CategorySummary`, `MonthlySummary`: server-owned records
//! - `ExpenseFilter`: query criteria for listing expenses
//! - Auth wire types and the opaque `AuthToken`

pub mod auth;
pub mod expense;
pub mod filter;

pub use auth::{AuthResponse, AuthToken, LoginRequest, SignupRequest};
pub use expense::{CategorySummary, DeleteResponse, Expense, MonthlySummary, NewExpense};
pub use filter::ExpenseFilter;
