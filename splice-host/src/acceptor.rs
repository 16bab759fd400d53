//! Acceptors: live network listeners with named processing stages.
//!
//! An [`Acceptor`] owns an ordered sequence of named stages. Each stage is an
//! opaque [`Introspect`] object; by convention the one responsible for
//! initializing newly accepted child connections carries a field named
//! [`CHILD_INITIALIZER`] holding an [`Initializer`]. Which stage that is
//! varies between hosts, which is why the injector selects it heuristically
//! instead of by name.

use std::any::Any;
use std::ops::Deref;
use std::sync::Arc;

use crate::channel::Channel;
use crate::probe::{Field, FieldMap, Introspect};

/// Well-known name of the field holding an acceptor's per-connection setup
/// callback.
pub const CHILD_INITIALIZER: &str = "child_initializer";

/// The callback an acceptor invokes once per newly accepted connection to
/// configure that connection's pipeline.
pub trait ChildInitializer: Send + Sync {
    /// Configures a freshly accepted channel.
    fn init_channel(&self, channel: &mut Channel);

    /// Escape hatch for generic inspection of concrete initializer types.
    ///
    /// Implementations return `self`. This is what lets uninjection recognize
    /// its own wrapper among arbitrary initializers without a side registry.
    fn as_any(&self) -> &dyn Any;
}

/// A clonable handle to a [`ChildInitializer`] instance.
///
/// This is the concrete value stored in a stage's [`CHILD_INITIALIZER`]
/// field; [`Initializer::ptr_eq`] compares instance identity.
#[derive(Clone)]
pub struct Initializer(Arc<dyn ChildInitializer>);

impl Initializer {
    /// Wraps an initializer implementation in a handle.
    pub fn new(init: Arc<dyn ChildInitializer>) -> Self {
        Self(init)
    }

    /// Whether two handles point at the same initializer instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Configures a freshly accepted channel.
    pub fn init_channel(&self, channel: &mut Channel) {
        self.0.init_channel(channel);
    }

    /// Inspects the concrete initializer type behind this handle.
    pub fn as_any(&self) -> &dyn Any {
        self.0.as_any()
    }
}

/// A live network listener with an ordered sequence of named stages.
///
/// The injector holds only non-owning references to acceptors; the host owns
/// them for their whole lifetime.
pub struct Acceptor {
    stages: Vec<(String, Arc<dyn Introspect>)>,
}

impl Acceptor {
    /// Creates an acceptor from its named stages, in order.
    pub fn new(stages: Vec<(String, Arc<dyn Introspect>)>) -> Self {
        Self { stages }
    }

    /// Creates the common single-stage shape: one stage whose only field is
    /// the [`CHILD_INITIALIZER`].
    pub fn with_child_initializer(stage_name: impl Into<String>, init: Initializer) -> Self {
        let stage: Arc<dyn Introspect> =
            Arc::new(FieldMap::new().with_field(Field::new(CHILD_INITIALIZER, init)));
        Self::new(vec![(stage_name.into(), stage)])
    }

    /// Stage names in their defined order.
    pub fn stage_names(&self) -> Vec<String> {
        self.stages.iter().map(|(name, _)| name.clone()).collect()
    }

    /// The stage named `name`, if any.
    pub fn stage(&self, name: &str) -> Option<Arc<dyn Introspect>> {
        self.stages
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, stage)| Arc::clone(stage))
    }

    /// The first stage in the sequence, if any.
    pub fn first_stage(&self) -> Option<(String, Arc<dyn Introspect>)> {
        self.stages
            .first()
            .map(|(name, stage)| (name.clone(), Arc::clone(stage)))
    }

    /// Iterates the stages in their defined order.
    pub fn stages(&self) -> impl Iterator<Item = (&str, &Arc<dyn Introspect>)> {
        self.stages
            .iter()
            .map(|(name, stage)| (name.as_str(), stage))
    }

    /// Number of stages.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

/// A shared, identity-comparable reference to an [`Acceptor`].
///
/// This is the item type of the host's pending-acceptor list; equality is
/// instance identity, so the same acceptor is never recorded twice.
#[derive(Clone)]
pub struct AcceptorRef(Arc<Acceptor>);

impl AcceptorRef {
    /// Shares an acceptor.
    pub fn new(acceptor: Acceptor) -> Self {
        Self(Arc::new(acceptor))
    }

    /// Whether two references point at the same acceptor.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for AcceptorRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AcceptorRef")
            .field(&Arc::as_ptr(&self.0))
            .finish()
    }
}

impl Deref for AcceptorRef {
    type Target = Acceptor;

    fn deref(&self) -> &Acceptor {
        &self.0
    }
}

impl PartialEq for AcceptorRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for AcceptorRef {}
