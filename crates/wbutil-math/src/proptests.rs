//! Property-based tests for the statistics helpers.
