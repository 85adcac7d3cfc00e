//! Property-based tests for the iterator and composition helpers.
