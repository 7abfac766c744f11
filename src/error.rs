//! Top-level error re-exports.

pub use crate::receiver::server::ReceiverError;
