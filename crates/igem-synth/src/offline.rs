//! Offline output backend with a manually advanced engine clock.
//!
//! Nothing plays: the caller renders the graph explicitly, which is also
//! the only thing that moves the clock. Used for tests and for rendering
//! without a device.

use crate::backend::{AudioBackend, AudioEngine, EngineState};
use crate::error::{Error, Result};
use crate::graph::GraphHandle;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ResumePolicy {
    Immediate,
    /// Stays suspended until a gesture is granted.
    Gesture,
    Fails,
}

#[derive(Debug)]
struct Shared {
    available: bool,
    opens_running: bool,
    resume_policy: ResumePolicy,
    gesture_granted: bool,
    state: Option<EngineState>,
    graph: Option<GraphHandle>,
    opens: usize,
    resumes: usize,
}

/// Offline [`AudioBackend`]. Clones observe the same engine.
///
/// # Example
///
/// ```
/// use igem_synth::{OfflineOutput, SynthStatus, ToneSynth};
///
/// let output = OfflineOutput::new(48_000.0);
/// let mut synth = ToneSynth::new(Some(Box::new(output.clone())));
///
/// synth.note_on(69, 127);
/// let samples = output.render(4_800);
/// assert_eq!(synth.status(), SynthStatus::Ready);
/// assert!(samples.iter().any(|s| s.abs() > 0.1));
/// ```
#[derive(Clone, Debug)]
pub struct OfflineOutput {
    sample_rate: f64,
    shared: Arc<Mutex<Shared>>,
}

impl OfflineOutput {
    /// Engines open suspended and resume on request.
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            shared: Arc::new(Mutex::new(Shared {
                available: true,
                opens_running: false,
                resume_policy: ResumePolicy::Immediate,
                gesture_granted: false,
                state: None,
                graph: None,
                opens: 0,
                resumes: 0,
            })),
        }
    }

    /// `open` always fails.
    pub fn unavailable() -> Self {
        let output = Self::new(48_000.0);
        output.shared.lock().available = false;
        output
    }

    /// Engines open already running.
    pub fn running(self) -> Self {
        self.shared.lock().opens_running = true;
        self
    }

    /// Resume does nothing until [`grant_gesture`](Self::grant_gesture).
    pub fn gesture_required(self) -> Self {
        self.shared.lock().resume_policy = ResumePolicy::Gesture;
        self
    }

    /// Resume returns an error.
    pub fn failing_resume(self) -> Self {
        self.shared.lock().resume_policy = ResumePolicy::Fails;
        self
    }

    /// Simulates the user interaction that lets output start.
    pub fn grant_gesture(&self) {
        self.shared.lock().gesture_granted = true;
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Graph of the opened engine.
    pub fn graph(&self) -> Option<GraphHandle> {
        self.shared.lock().graph.clone()
    }

    pub fn state(&self) -> Option<EngineState> {
        self.shared.lock().state
    }

    pub fn open_count(&self) -> usize {
        self.shared.lock().opens
    }

    pub fn resume_count(&self) -> usize {
        self.shared.lock().resumes
    }

    /// Engine clock in seconds, 0 before open.
    pub fn current_time(&self) -> f64 {
        self.graph().map_or(0.0, |g| g.current_time())
    }

    /// Renders `frames` mono samples.
    ///
    /// Returns silence without advancing the clock unless the engine is running.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        let (state, graph) = {
            let shared = self.shared.lock();
            (shared.state, shared.graph.clone())
        };
        if let (Some(EngineState::Running), Some(graph)) = (state, graph) {
            graph.lock().render(&mut out, 1);
        }
        out
    }

    /// Advances the clock by `duration` while running, discarding output.
    pub fn advance(&self, duration: Duration) {
        let (state, graph) = {
            let shared = self.shared.lock();
            (shared.state, shared.graph.clone())
        };
        if let (Some(EngineState::Running), Some(graph)) = (state, graph) {
            let mut graph = graph.lock();
            let frames = (duration.as_secs_f64() * graph.sample_rate()).round() as u64;
            graph.skip(frames);
        }
    }
}

impl AudioBackend for OfflineOutput {
    fn open(&mut self) -> Result<Box<dyn AudioEngine>> {
        let mut shared = self.shared.lock();
        if !shared.available {
            return Err(Error::Unavailable("offline output disabled".into()));
        }

        let graph = GraphHandle::new(self.sample_rate);
        shared.opens += 1;
        shared.graph = Some(graph.clone());
        shared.state = Some(if shared.opens_running {
            EngineState::Running
        } else {
            EngineState::Suspended
        });

        Ok(Box::new(OfflineEngine {
            graph,
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct OfflineEngine {
    graph: GraphHandle,
    shared: Arc<Mutex<Shared>>,
}

impl AudioEngine for OfflineEngine {
    fn graph(&self) -> &GraphHandle {
        &self.graph
    }

    fn state(&self) -> EngineState {
        self.shared.lock().state.unwrap_or(EngineState::Closed)
    }

    fn resume(&mut self) -> Result<()> {
        let mut shared = self.shared.lock();
        shared.resumes += 1;
        match shared.state {
            Some(EngineState::Closed) | None => return Err(Error::Closed),
            Some(EngineState::Running) => return Ok(()),
            Some(EngineState::Suspended) => {}
        }

        match shared.resume_policy {
            ResumePolicy::Immediate => shared.state = Some(EngineState::Running),
            ResumePolicy::Gesture if shared.gesture_granted => {
                shared.state = Some(EngineState::Running)
            }
            ResumePolicy::Gesture => {}
            ResumePolicy::Fails => return Err(Error::Resume("output device lost".into())),
        }
        Ok(())
    }

    fn close(&mut self) {
        self.shared.lock().state = Some(EngineState::Closed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_opens_suspended_and_resumes() {
        let mut output = OfflineOutput::new(1000.0);
        let mut engine = output.open().unwrap();
        assert_eq!(engine.state(), EngineState::Suspended);
        engine.resume().unwrap();
        assert_eq!(engine.state(), EngineState::Running);
        assert_eq!(output.open_count(), 1);
    }

    #[test]
    fn test_clock_frozen_while_suspended() {
        let mut output = OfflineOutput::new(1000.0).gesture_required();
        let mut engine = output.open().unwrap();
        output.advance(Duration::from_millis(500));
        assert_eq!(output.current_time(), 0.0);

        engine.resume().unwrap();
        assert_eq!(engine.state(), EngineState::Suspended);

        output.grant_gesture();
        engine.resume().unwrap();
        output.advance(Duration::from_millis(500));
        assert_relative_eq!(output.current_time(), 0.5);
    }

    #[test]
    fn test_unavailable_and_failing_resume() {
        let mut output = OfflineOutput::unavailable();
        assert!(matches!(output.open(), Err(Error::Unavailable(_))));

        let mut output = OfflineOutput::new(1000.0).failing_resume();
        let mut engine = output.open().unwrap();
        assert!(engine.resume().is_err());
    }

    #[test]
    fn test_closed_engine_cannot_resume() {
        let mut output = OfflineOutput::new(1000.0).running();
        let mut engine = output.open().unwrap();
        engine.close();
        assert!(matches!(engine.resume(), Err(Error::Closed)));
        assert!(output.render(10).iter().all(|s| *s == 0.0));
    }
}
