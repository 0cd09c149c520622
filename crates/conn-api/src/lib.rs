//! HTTP surface for the connection service.

pub mod server;
