//! REST API client module for the expense-tracker service.
//!
//! This module provides the `ApiClient` request pipeline. Every call goes
//! through one of its verb wrappers, which attach the bearer token from the
//! shared `TokenStore` and normalize failures into `ApiError`.
//!
//! A 401 from any endpoint clears the stored token and publishes
//! `SessionEvent::Invalidated` to subscribers.

pub mod client;
pub mod error;
mod expenses;

pub use client::{ApiClient, SessionEvent, SignupOutcome};
pub use error::ApiError;
