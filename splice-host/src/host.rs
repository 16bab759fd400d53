//! The host capability trait consumed by the injector.

use std::sync::Arc;

use thiserror::Error;

use crate::probe::Introspect;

/// Error raised by host capability queries.
#[derive(Debug, Error)]
pub enum HostError {
    /// The host could not report its declared protocol version.
    #[error("failed to get server protocol version: {reason}")]
    ProtocolVersionUnavailable {
        /// Host-specific explanation.
        reason: String,
    },
}

/// A live server process the injector can attach to.
///
/// Implementations adapt one concrete host; the injector never looks past
/// this surface.
pub trait ConnectionHost: Send + Sync {
    /// The host's network-connection-manager object, or `None` when the
    /// host's internal structure is unrecognized.
    ///
    /// One of the manager's declared fields is expected to hold the ordered
    /// list of pending acceptors; which one is found structurally, not by
    /// name.
    fn connection_manager(&self) -> Option<Arc<dyn Introspect>>;

    /// The protocol version the host itself declares.
    fn protocol_version(&self) -> Result<i32, HostError>;

    /// Name of the host's outbound codec stage in each channel pipeline.
    fn encoder_name(&self) -> &str {
        "encoder"
    }

    /// Name of the host's inbound codec stage in each channel pipeline.
    fn decoder_name(&self) -> &str {
        "decoder"
    }
}
