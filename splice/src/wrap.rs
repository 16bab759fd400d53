//! The wrapping initializer and the translation extension point.

use std::any::Any;
use std::sync::Arc;

use log::warn;
use splice_host::acceptor::{ChildInitializer, Initializer};
use splice_host::channel::Channel;

use crate::observed::BoxError;

/// The single extension point exposed to the translation subsystem.
///
/// Given a newly connected channel, insert translation stage(s) into its
/// pipeline. The injector calls this before the host's own per-connection
/// setup runs, so translation stages are positioned before any codec stage
/// processes the first byte.
pub trait TranslationInstaller: Send + Sync {
    /// Inserts translation stage(s) into `channel`'s pipeline.
    fn install(&self, channel: &mut Channel) -> Result<(), BoxError>;
}

/// A decorator around a host's child initializer.
///
/// On each new child connection it installs translation handling into that
/// channel's pipeline, then defers to the original initializer with the same
/// channel. The original is retained for the lifetime of the wrapper so
/// uninjection can always recover the exact original value.
pub struct WrappingInitializer {
    original: Initializer,
    translator: Arc<dyn TranslationInstaller>,
}

impl WrappingInitializer {
    /// Wraps `original` so `translator` runs first on every new channel.
    pub fn new(original: Initializer, translator: Arc<dyn TranslationInstaller>) -> Self {
        Self {
            original,
            translator,
        }
    }

    /// The exact initializer this wrapper was built around.
    pub fn original(&self) -> Initializer {
        self.original.clone()
    }

    /// Whether `init` is one of our own wrappers.
    pub fn is_ours(init: &Initializer) -> bool {
        init.as_any().is::<WrappingInitializer>()
    }

    /// Recovers the original initializer from one of our wrappers.
    pub fn peel(init: &Initializer) -> Option<Initializer> {
        init.as_any()
            .downcast_ref::<WrappingInitializer>()
            .map(WrappingInitializer::original)
    }
}

impl ChildInitializer for WrappingInitializer {
    fn init_channel(&self, channel: &mut Channel) {
        // An installer failure must not break baseline connectivity: the
        // connection proceeds without translation.
        if let Err(err) = self.translator.install(channel) {
            warn!(
                "translation install failed for {}, connection proceeds untranslated: {}",
                channel.peer_addr(),
                err
            );
        }
        self.original.init_channel(channel);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
