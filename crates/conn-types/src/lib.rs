//! Core types and traits for the peer connection service.
//!
//! The `Connection` record layout (`created`, `id`, `peerAID`, `peerBID`, `weight`) is the
//! format written to and read from the record store.

mod connection;
mod traits;

pub use connection::*;
pub use traits::*;

pub use tokio_util::sync::CancellationToken;
