//! Route modules, one per resource.

pub mod auth;
pub mod budgets;
pub mod categories;
pub mod health;
pub mod sources;
pub mod sync;
pub mod transactions;
