//! Selecting the stage that holds an acceptor's child initializer.
//!
//! Hosts differ in which processing stage carries the `child_initializer`
//! field, and some register several candidate stages. The policy here is
//! best-match-else-first: the *last* stage whose field probes successfully
//! wins (later registrations are the more specific ones), and when none
//! match, the *first* stage is the deterministic default - which also keeps
//! any blame tooling pointed at a consistent stage. This two-tier policy is
//! what lets the injector work across heterogeneous hosts without
//! hard-coding a stage name.

use std::sync::Arc;

use splice_host::acceptor::{Acceptor, Initializer, CHILD_INITIALIZER};
use splice_host::probe::{try_probe, Introspect};

use crate::inject::InjectError;
use crate::wrap::WrappingInitializer;

/// Picks the stage whose `child_initializer` field the injector should
/// rewrite: last stage where the field probes, else the first stage.
///
/// Fails with [`InjectError::ComponentNotFound`] only when the acceptor has
/// no stages at all.
pub fn select_initializer_holder(
    acceptor: &Acceptor,
) -> Result<(String, Arc<dyn Introspect>), InjectError> {
    let mut best = None;
    for (name, stage) in acceptor.stages() {
        if try_probe::<Initializer>(stage.as_ref(), CHILD_INITIALIZER).is_some() {
            best = Some((name.to_string(), Arc::clone(stage)));
        }
    }
    if let Some(found) = best {
        return Ok(found);
    }
    acceptor
        .first_stage()
        .ok_or_else(|| InjectError::ComponentNotFound("acceptor stage".to_string()))
}

/// Like [`select_initializer_holder`], but only stages whose current
/// initializer is recognizably one of our own [`WrappingInitializer`]s
/// qualify.
///
/// Uninjection uses this so a stage that something else has since taken over
/// is never clobbered.
pub fn select_wrapped_holder(acceptor: &Acceptor) -> Option<(String, Arc<dyn Introspect>)> {
    let mut best = None;
    for (name, stage) in acceptor.stages() {
        if let Some(init) = try_probe::<Initializer>(stage.as_ref(), CHILD_INITIALIZER) {
            if WrappingInitializer::is_ours(&init) {
                best = Some((name.to_string(), Arc::clone(stage)));
            }
        }
    }
    best
}
