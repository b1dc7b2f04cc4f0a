//! RPC surface for performers.
//!
//! Every method runs through the same guard pipeline of authenticating the
//! bearer token, resolving the task where task-scoped, and enforcing lease
//! ownership before its method-specific execute step. Guards and execute
//! short-circuit with typed [`error::RpcError`] values; expected domain
//! conditions are returned as errors over the wire, never raised across
//! the boundary.

pub mod auth;
pub mod dispatcher;
pub mod error;
pub mod messages;
pub mod router;

#[cfg(test)]
mod tests;
