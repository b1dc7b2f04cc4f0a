//! Unit tests for the RPC surface.

mod auth_tests;
mod support;
