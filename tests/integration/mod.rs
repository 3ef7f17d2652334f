//! Integration Tests Module
//!
//! Compiled as a single test target; each module exercises one slice of the
//! reconciliation engine against in-memory collaborator doubles.


// Run barrier buffering, replay, staleness, TTL
mod run_barrier_test;


// Ask-user-question queue behavior
mod questions_test;

// Terminal reconciliation and the store fallback
mod terminal_test;
