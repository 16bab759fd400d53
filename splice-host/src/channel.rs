//! Per-connection channels and their processing pipelines.
//!
//! A [`Channel`] is one accepted connection. Its [`ChannelPipeline`] is an
//! ordered chain of named [`ChannelHandler`]s; inbound data flows from the
//! first handler to the last, so a handler added at the front sees raw bytes
//! before any codec stage behind it.

use std::net::SocketAddr;

use bytes::BytesMut;
use log::trace;

/// One named processing stage in a channel's pipeline.
///
/// The default `handle_read` is a pass-through; stages that only mark a
/// position in the pipeline (or only act on other events) need not override
/// it.
pub trait ChannelHandler: Send {
    /// The handler's unique name within its pipeline.
    fn name(&self) -> &str;

    /// Processes one inbound message, returning what the next stage sees.
    fn handle_read(&mut self, msg: BytesMut) -> BytesMut {
        msg
    }
}

/// An ordered, named chain of [`ChannelHandler`]s.
///
/// Names are unique within a pipeline; `add_front`/`add_back` refuse
/// duplicates rather than silently shadowing an existing stage.
#[derive(Default)]
pub struct ChannelPipeline {
    names: Vec<String>,
    handlers: Vec<Box<dyn ChannelHandler>>,
}

impl ChannelPipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a handler at the front of the pipeline. Returns `false` if a
    /// handler with the same name is already present.
    pub fn add_front(&mut self, handler: impl ChannelHandler + 'static) -> bool {
        self.insert(0, Box::new(handler))
    }

    /// Appends a handler at the back of the pipeline. Returns `false` if a
    /// handler with the same name is already present.
    pub fn add_back(&mut self, handler: impl ChannelHandler + 'static) -> bool {
        self.insert(self.names.len(), Box::new(handler))
    }

    /// Inserts a handler just before the stage named `before`. Returns
    /// `false` if `before` does not exist or the name is already taken.
    pub fn add_before(&mut self, before: &str, handler: impl ChannelHandler + 'static) -> bool {
        match self.names.iter().position(|n| n == before) {
            Some(index) => self.insert(index, Box::new(handler)),
            None => false,
        }
    }

    fn insert(&mut self, index: usize, handler: Box<dyn ChannelHandler>) -> bool {
        let name = handler.name().to_string();
        if self.names.iter().any(|n| *n == name) {
            return false;
        }
        self.names.insert(index, name);
        self.handlers.insert(index, handler);
        true
    }

    /// Removes the stage named `name`. Returns whether it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.names.iter().position(|n| n == name) {
            Some(index) => {
                self.names.remove(index);
                self.handlers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Stage names in pipeline order.
    pub fn names(&self) -> Vec<String> {
        self.names.clone()
    }

    /// Name of the first stage, if any.
    pub fn first_name(&self) -> Option<&str> {
        self.names.first().map(String::as_str)
    }

    /// Whether a stage named `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the pipeline has no stages.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Runs one inbound message through every stage, first to last.
    pub fn handle_read(&mut self, msg: BytesMut) -> BytesMut {
        trace!("pipeline read {} bytes through {} stages", msg.len(), self.handlers.len());
        self.handlers
            .iter_mut()
            .fold(msg, |msg, handler| handler.handle_read(msg))
    }
}

/// One accepted connection: a peer address plus its own pipeline.
pub struct Channel {
    peer_addr: SocketAddr,
    pipeline: ChannelPipeline,
}

impl Channel {
    /// Creates a channel for a connection from `peer_addr` with an empty
    /// pipeline.
    pub fn new(peer_addr: SocketAddr) -> Self {
        Self {
            peer_addr,
            pipeline: ChannelPipeline::new(),
        }
    }

    /// The remote address of this connection.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// The channel's pipeline.
    pub fn pipeline(&self) -> &ChannelPipeline {
        &self.pipeline
    }

    /// Mutable access to the channel's pipeline.
    pub fn pipeline_mut(&mut self) -> &mut ChannelPipeline {
        &mut self.pipeline
    }
}
