//! Buildfolio HTTP boundary.
//!
//! Exposes config, state, auth, error mapping and routes so the binary and
//! the integration tests build the same router.

pub mod auth;
pub mod config;
pub mod error;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
