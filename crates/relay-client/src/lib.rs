//! Client side of the relay: finding a running server, talking to its HTTP
//! API, and the small bits of local state a polling client keeps.

pub mod addresses;
pub mod client;
pub mod discover;
pub mod error;
pub mod output;
pub mod sse;
pub mod status;
pub mod watermark;

pub use client::RelayClient;
pub use error::{ClientError, Result};
