//! tlsconf - TLS trust material for test and bootstrap endpoints
//!
//! This crate forges short-lived self-signed certificates, assembles trust
//! pools from heterogeneous certificate sources, and publishes the resulting
//! client/server settings through an explicit configuration registry.

pub mod http;
pub mod tls;
