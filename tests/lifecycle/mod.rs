//! Lifecycle scenarios, step definitions and fixtures.

mod bdd_steps;
mod scenarios;
mod test_helpers;
