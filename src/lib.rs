//! Microbase - a bootstrapping layer for actix-web microservices
//!
//! This library wires the recurring plumbing of a small HTTP service into
//! a single entry point: structured logging with secret redaction,
//! per-request ID generation, panic reporting, health monitoring and a
//! signal-driven graceful shutdown with a hard-exit deadline.
//!
//! Routing, extractors and request validation are actix-web's job and are
//! left entirely to the caller, who registers routes through the
//! [`ServerOptions`](runtime::modes::server::ServerOptions) configure
//! callback.
//!
//! # Architecture
//! - `config`: Configuration loading (TOML file + environment overrides)
//! - `system`: Logging, signal subscription and panic reporting
//! - `runtime`: Application lifecycle (startup, teardown hooks, shutdown
//!   coordinator) and the server run mode
//! - `api`: HTTP middleware (request IDs, request timing)
//! - `services`: Built-in HTTP services (health endpoint)

pub mod api;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod system;
