//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod ai;
pub mod analytics;
pub mod auth;
pub mod budgets;
pub mod goals;
pub mod insights;
pub mod transactions;
pub mod users;

// Re-export all handlers for use in router
pub use ai::*;
pub use analytics::*;
pub use auth::*;
pub use budgets::*;
pub use goals::*;
pub use insights::*;
pub use transactions::*;
pub use users::*;
