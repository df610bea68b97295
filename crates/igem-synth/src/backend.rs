//! Audio-output capability interface.
//!
//! A backend constructs an engine on demand; the engine owns the physical
//! output (or a stand-in) and renders a [`GraphHandle`] while running.

use crate::error::Result;
use crate::graph::GraphHandle;
use serde::{Deserialize, Serialize};

/// Lifecycle of an output engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineState {
    /// Created but not producing output; the clock does not advance.
    Suspended,
    Running,
    Closed,
}

/// Factory for output engines.
pub trait AudioBackend: Send {
    /// Constructs an output engine. Engines start in any state the platform
    /// chooses; callers resume them when suspended.
    fn open(&mut self) -> Result<Box<dyn AudioEngine>>;
}

/// A constructed output engine.
pub trait AudioEngine: Send {
    /// The graph rendered by this engine.
    fn graph(&self) -> &GraphHandle;

    fn state(&self) -> EngineState;

    /// Attempts to leave [`EngineState::Suspended`]. May succeed without
    /// reaching `Running` when the platform still withholds output.
    fn resume(&mut self) -> Result<()>;

    fn close(&mut self);
}
