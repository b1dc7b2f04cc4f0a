//! Unit and service tests for the dealing core.

mod leasing_tests;
mod support;
