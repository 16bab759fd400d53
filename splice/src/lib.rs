//! # Splice - Runtime Pipeline Injection for Live Network Hosts
//!
//! Splice attaches a protocol-translation stage into a live server's
//! connection-accept path, so every new client connection is wrapped with
//! logic capable of rewriting wire-protocol traffic - without restarting the
//! server process or modifying its binary.
//!
//! ## How does injection work?
//!
//! ```text
//!   host creates acceptors
//!          |
//!          | append to pending-acceptor list
//!          v
//!   +-------------------+   on_append    +---------------------+
//!   |   ObservedList    | -------------> |  PipelineInjector   |
//!   | (installed over   |                |                     |
//!   |  the host's list) |                +---------------------+
//!   +-------------------+                          |
//!                                                  | select stage,
//!                                                  | swap child_initializer
//!                                                  v
//!   +-------------------+   init_channel  +---------------------+
//!   |     Acceptor      | --------------> | WrappingInitializer |
//!   |  (per connection) |                 |  translation first, |
//!   +-------------------+                 |  then the original  |
//!                                         +---------------------+
//! ```
//!
//! [`PipelineInjector::inject`] locates the host's live list of pending
//! acceptors, installs an [`ObservedList`] over it so late-bound acceptors
//! are caught too, and rewrites every acceptor's `child_initializer` field to
//! a [`WrappingInitializer`] that installs translation stages into each new
//! channel before deferring to the original setup. Everything touched is
//! recorded, and [`PipelineInjector::uninject`] restores the host
//! field-by-field to the exact original instances.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use splice::{PipelineInjector, TranslationInstaller};
//! use splice_host::{Channel, ChannelHandler, ConnectionHost};
//!
//! struct Translation;
//!
//! impl ChannelHandler for Translation {
//!     fn name(&self) -> &str {
//!         "translation"
//!     }
//! }
//!
//! struct Installer;
//!
//! impl TranslationInstaller for Installer {
//!     fn install(
//!         &self,
//!         channel: &mut Channel,
//!     ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!         channel.pipeline_mut().add_front(Translation);
//!         Ok(())
//!     }
//! }
//!
//! fn attach(host: Arc<dyn ConnectionHost>) -> Result<(), splice::InjectError> {
//!     let injector = PipelineInjector::new(host, Arc::new(Installer));
//!     injector.inject()
//! }
//! ```
//!
//! ## Failure philosophy
//!
//! A translation-layer failure must never break baseline connectivity.
//! Structural lookups that fail during [`inject`](PipelineInjector::inject)
//! propagate to the caller (the server keeps running unmodified); failures on
//! the steady-state per-connection path and during
//! [`uninject`](PipelineInjector::uninject) are logged and swallowed, so the
//! affected connection is still accepted - only translation is skipped.

#![warn(rust_2018_idioms)]
#![warn(missing_docs)]

/// Observable wrapper over a host-owned ordered collection
pub mod observed;

/// Locating the host's pending-acceptor collection
pub mod locate;

/// Selecting the stage that holds an acceptor's child initializer
pub mod select;

/// The wrapping initializer and the translation extension point
pub mod wrap;

/// The injection orchestrator
pub mod inject;

pub use inject::{InjectError, PipelineInjector, Result};
pub use locate::{find_pending_acceptors, PendingAcceptors};
pub use observed::{AppendFn, BoxError, ObservedList};
pub use select::{select_initializer_holder, select_wrapped_holder};
pub use wrap::{TranslationInstaller, WrappingInitializer};
