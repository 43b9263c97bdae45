//! CLI integration tests: whole builds driven through the `cake` binary.

mod clean_tests;
mod common;
