//! # apisim-server
//!
//! HTTP server library for apisim, a stateful simulator of the Slack Web API
//! and Events API.
//!
//! This library provides the router, handlers, shared state and logging
//! setup used by the `apisim-server` binary and the integration tests.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod logging;
pub mod state;
