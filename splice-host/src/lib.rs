//! # Splice Host - Host Collaborator Surface
//!
//! `splice-host` defines the narrow capability interface a live network host
//! must satisfy so that the [splice](https://crates.io/crates/splice) injector
//! can attach to it. The host (typically a game server) is an external
//! collaborator: its internals are introspected, never owned.
//!
//! ## What is in here?
//!
//! - **Structural probing** ([`probe`]): named-field access to opaque host
//!   objects, with typed failure modes. All of the "reflection" in the splice
//!   ecosystem is confined to this module; everything layered above it is
//!   probing-free.
//! - **Shared ordered collections** ([`list`]): the host's mutable lists of
//!   pending acceptors, addressed by instance identity so they can be swapped
//!   out and later restored to the exact same instance.
//! - **Channels and pipelines** ([`channel`]): the per-connection processing
//!   pipeline a child initializer configures.
//! - **Acceptors** ([`acceptor`]): live network listeners with named, ordered
//!   processing stages, one of which holds the `child_initializer` callback.
//! - **The host capability** ([`host`]): the entry point object the injector
//!   walks to find all of the above.
//!
//! ## How does injection see a host?
//!
//! ```text
//!   ConnectionHost
//!        |
//!        | connection_manager()
//!        v
//!   +-------------------+       fields()        +----------------------+
//!   |  dyn Introspect   | --------------------> | Field "pending":     |
//!   | (connection mgr)  |                       | ListHandle<Acceptor> |
//!   +-------------------+                       +----------------------+
//!                                                          |
//!                                                          | snapshot()
//!                                                          v
//!   +-------------------+      stages()         +----------------------+
//!   |     Acceptor      | --------------------> | Field                |
//!   |                   |                       | "child_initializer": |
//!   +-------------------+                       | Initializer          |
//!                                                +---------------------+
//!                                                          |
//!                                                          | init_channel()
//!                                                          v
//!                                               +----------------------+
//!                                               | Channel with its own |
//!                                               | ChannelPipeline      |
//!                                               +----------------------+
//! ```
//!
//! None of the lookups above are part of any public host contract, so they are
//! structural: a field either holds a value of the expected shape or it does
//! not, and callers decide whether absence is expected (selection heuristics)
//! or fatal (a missing core component).

#![warn(rust_2018_idioms)]
#![warn(missing_docs)]

/// Structural field access to opaque host objects
pub mod probe;

/// Shared ordered collections addressed by instance identity
pub mod list;

/// Per-connection channels and their processing pipelines
pub mod channel;

/// Acceptors: live listeners with named processing stages
pub mod acceptor;

/// The host capability trait consumed by the injector
pub mod host;

pub use acceptor::{Acceptor, AcceptorRef, ChildInitializer, Initializer, CHILD_INITIALIZER};
pub use channel::{Channel, ChannelHandler, ChannelPipeline};
pub use host::{ConnectionHost, HostError};
pub use list::{ListHandle, SharedList, VecList};
pub use probe::{get, set, try_probe, AccessError, Field, FieldMap, FieldValue, Introspect};
