//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP clients, blockchain RPC, file I/O) and
//! exposes the HTTP control surface. Each sub-module groups adapters by
//! infrastructure concern.
//!
//! Adapter categories:
//! - `chain`: intents registry, pools and batch executor via alloy-rs
//! - `feeds`: native/USD price oracle
//! - `http`: axum control surface (iterate, index, read-back, probes)
//! - `metrics`: Prometheus registry and health state
//! - `persistence`: JSON intent index

pub mod chain;
pub mod feeds;
pub mod http;
pub mod metrics;
pub mod persistence;
