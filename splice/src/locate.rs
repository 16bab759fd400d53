//! Locating the host's pending-acceptor collection.
//!
//! The host's internal structure is not part of any public contract, so the
//! lookup is structural: walk the connection manager's declared fields in
//! order and take the first one whose runtime value is an ordered collection
//! of acceptors. Failure here is fatal to injection but never to the host.

use std::sync::Arc;

use splice_host::acceptor::AcceptorRef;
use splice_host::host::ConnectionHost;
use splice_host::list::ListHandle;
use splice_host::probe::{try_probe, Introspect};

use crate::inject::InjectError;

/// The located collection of pending acceptors, together with where it lives.
pub struct PendingAcceptors {
    /// The host object owning the collection field.
    pub owner: Arc<dyn Introspect>,
    /// Name of the field holding the collection.
    pub field: String,
    /// The collection itself.
    pub list: ListHandle<AcceptorRef>,
}

impl std::fmt::Debug for PendingAcceptors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingAcceptors")
            .field("owner", &self.owner)
            .field("field", &self.field)
            .finish_non_exhaustive()
    }
}

/// Finds the single live collection of pending acceptors the host maintains.
///
/// Fails with [`InjectError::ComponentNotFound`] when the connection manager
/// cannot be located or none of its fields holds such a collection.
pub fn find_pending_acceptors(host: &dyn ConnectionHost) -> Result<PendingAcceptors, InjectError> {
    let manager = host
        .connection_manager()
        .ok_or_else(|| InjectError::ComponentNotFound("ServerConnection".to_string()))?;

    for field in manager.fields() {
        if let Some(list) = try_probe::<ListHandle<AcceptorRef>>(manager.as_ref(), field.name()) {
            return Ok(PendingAcceptors {
                owner: Arc::clone(&manager),
                field: field.name().to_string(),
                list,
            });
        }
    }

    Err(InjectError::ComponentNotFound(
        "pending acceptor list".to_string(),
    ))
}
