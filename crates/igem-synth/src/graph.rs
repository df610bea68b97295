//! Output graph: gain and tone-generator nodes rendered against a sample clock.
//!
//! Nodes feed exactly one downstream node. Gains multiply everything routed
//! through them; an oscillator is audible only while its chain reaches the
//! destination. The engine clock is `frames_rendered / sample_rate`, so it
//! only advances while something renders the graph.

use crate::automation::AutomationLane;
use crate::error::{Error, Result};
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f32::consts::TAU;
use std::sync::Arc;

/// Gain chains longer than this are treated as cycles and render silence.
const MAX_CHAIN_DEPTH: usize = 16;

/// Tone-generator shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Waveform {
    #[default]
    Sine,
    Triangle,
    Sawtooth,
    Square,
}

impl Waveform {
    /// One sample at `phase` in cycles, `[0, 1)`.
    #[inline]
    pub fn sample(&self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (TAU * phase).sin(),
            Waveform::Triangle => {
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                }
            }
            Waveform::Sawtooth => {
                let shifted = phase + 0.5;
                2.0 * (shifted - shifted.floor()) - 1.0
            }
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Triangle => "triangle",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Square => "square",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GainId(u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OscillatorId(u32);

/// Endpoint of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Gain(GainId),
    Oscillator(OscillatorId),
    /// The physical output.
    Destination,
}

impl From<GainId> for NodeRef {
    fn from(id: GainId) -> Self {
        NodeRef::Gain(id)
    }
}

impl From<OscillatorId> for NodeRef {
    fn from(id: OscillatorId) -> Self {
        NodeRef::Oscillator(id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Target {
    Gain(GainId),
    Destination,
}

#[derive(Debug)]
struct GainNode {
    param: AutomationLane,
    output: Option<Target>,
}

#[derive(Debug)]
struct OscillatorNode {
    waveform: Waveform,
    frequency: f32,
    phase: f32,
    start: Option<f64>,
    stop: Option<f64>,
    output: Option<Target>,
}

impl OscillatorNode {
    #[inline]
    fn is_sounding(&self, time: f64) -> bool {
        match self.start {
            Some(start) => time >= start && self.stop.map_or(true, |stop| time < stop),
            None => false,
        }
    }

    #[inline]
    fn has_ended(&self, time: f64) -> bool {
        self.start.is_some() && self.stop.is_some_and(|stop| time >= stop)
    }
}

/// Node graph rendered by an output engine.
#[derive(Debug)]
pub struct RenderGraph {
    sample_rate: f64,
    frames_rendered: u64,
    next_id: u32,
    gains: HashMap<GainId, GainNode>,
    oscillators: HashMap<OscillatorId, OscillatorNode>,
}

impl RenderGraph {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate: sample_rate.max(1.0),
            frames_rendered: 0,
            next_id: 0,
            gains: HashMap::new(),
            oscillators: HashMap::new(),
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Engine clock in seconds.
    #[inline]
    pub fn current_time(&self) -> f64 {
        self.frames_rendered as f64 / self.sample_rate
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    pub fn create_gain(&mut self, value: f32) -> GainId {
        let id = GainId(self.allocate_id());
        self.gains.insert(
            id,
            GainNode {
                param: AutomationLane::new(value),
                output: None,
            },
        );
        id
    }

    pub fn create_oscillator(&mut self, waveform: Waveform, frequency: f32) -> OscillatorId {
        let id = OscillatorId(self.allocate_id());
        self.oscillators.insert(
            id,
            OscillatorNode {
                waveform,
                frequency,
                phase: 0.0,
                start: None,
                stop: None,
                output: None,
            },
        );
        id
    }

    /// Routes `from` into `to`, replacing any previous route of `from`.
    pub fn connect(&mut self, from: NodeRef, to: NodeRef) -> Result<()> {
        let target = match to {
            NodeRef::Gain(id) if self.gains.contains_key(&id) => Target::Gain(id),
            NodeRef::Gain(id) => return Err(Error::UnknownNode(format!("{:?}", id))),
            NodeRef::Destination => Target::Destination,
            NodeRef::Oscillator(id) => {
                return Err(Error::InvalidConnection(format!(
                    "{:?} has no input",
                    id
                )))
            }
        };

        match from {
            NodeRef::Gain(id) => {
                if target == Target::Gain(id) {
                    return Err(Error::InvalidConnection(format!("{:?} into itself", id)));
                }
                self.gain_mut(id)?.output = Some(target);
            }
            NodeRef::Oscillator(id) => self.oscillator_mut(id)?.output = Some(target),
            NodeRef::Destination => {
                return Err(Error::InvalidConnection("destination has no output".into()))
            }
        }
        Ok(())
    }

    /// Schedules the generator to start. A generator starts only once.
    pub fn start(&mut self, id: OscillatorId, at: f64) -> Result<()> {
        let osc = self.oscillator_mut(id)?;
        if osc.start.is_some() {
            return Err(Error::InvalidState(format!("{:?} already started", id)));
        }
        osc.start = Some(at);
        Ok(())
    }

    /// Schedules the generator to stop. Must be started first; a later call
    /// replaces the stop time.
    pub fn stop(&mut self, id: OscillatorId, at: f64) -> Result<()> {
        let osc = self.oscillator_mut(id)?;
        if osc.start.is_none() {
            return Err(Error::InvalidState(format!("{:?} not started", id)));
        }
        osc.stop = Some(at);
        Ok(())
    }

    pub fn set_value_at_time(&mut self, id: GainId, value: f32, at: f64) -> Result<()> {
        self.gain_mut(id)?.param.set_value_at_time(value, at);
        Ok(())
    }

    pub fn exponential_ramp_to_value_at_time(
        &mut self,
        id: GainId,
        value: f32,
        at: f64,
    ) -> Result<()> {
        self.gain_mut(id)?
            .param
            .exponential_ramp_to_value_at_time(value, at);
        Ok(())
    }

    pub fn cancel_scheduled_values(&mut self, id: GainId, from: f64) -> Result<()> {
        self.gain_mut(id)?.param.cancel_scheduled_values(from);
        Ok(())
    }

    /// Gain value at the current engine time.
    pub fn gain_value(&self, id: GainId) -> Result<f32> {
        self.gain_value_at(id, self.current_time())
    }

    pub fn gain_value_at(&self, id: GainId, time: f64) -> Result<f32> {
        self.gains
            .get(&id)
            .map(|g| g.param.value_at(time))
            .ok_or_else(|| Error::UnknownNode(format!("{:?}", id)))
    }

    pub fn contains_gain(&self, id: GainId) -> bool {
        self.gains.contains_key(&id)
    }

    pub fn contains_oscillator(&self, id: OscillatorId) -> bool {
        self.oscillators.contains_key(&id)
    }

    pub fn gain_count(&self) -> usize {
        self.gains.len()
    }

    pub fn oscillator_count(&self) -> usize {
        self.oscillators.len()
    }

    /// Generators producing sound at the current engine time.
    pub fn sounding_count(&self) -> usize {
        let now = self.current_time();
        self.oscillators
            .values()
            .filter(|o| o.is_sounding(now))
            .count()
    }

    fn gain_mut(&mut self, id: GainId) -> Result<&mut GainNode> {
        self.gains
            .get_mut(&id)
            .ok_or_else(|| Error::UnknownNode(format!("{:?}", id)))
    }

    fn oscillator_mut(&mut self, id: OscillatorId) -> Result<&mut OscillatorNode> {
        self.oscillators
            .get_mut(&id)
            .ok_or_else(|| Error::UnknownNode(format!("{:?}", id)))
    }

    /// Renders interleaved frames into `output` and advances the clock.
    ///
    /// The mono mix is written to every channel.
    pub fn render(&mut self, output: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let frames = output.len() / channels;
        let sample_rate = self.sample_rate;
        let gains = &self.gains;

        for (i, frame) in output.chunks_exact_mut(channels).enumerate() {
            let time = (self.frames_rendered + i as u64) as f64 / sample_rate;
            let mut mix = 0.0f32;

            for osc in self.oscillators.values_mut() {
                if !osc.is_sounding(time) {
                    continue;
                }
                let level = chain_level(gains, osc.output, time);
                if level != 0.0 {
                    mix += osc.waveform.sample(osc.phase) * level;
                }
                osc.phase += osc.frequency / sample_rate as f32;
                osc.phase -= osc.phase.floor();
            }

            frame.fill(mix);
        }

        self.frames_rendered += frames as u64;
        self.collect_ended();
    }

    /// Advances the clock without producing output.
    pub fn skip(&mut self, frames: u64) {
        self.frames_rendered += frames;
        self.collect_ended();
    }

    /// Removes generators past their stop time, plus gains that fed only them.
    fn collect_ended(&mut self) {
        let now = self.current_time();

        let ended: Vec<(OscillatorId, Option<Target>)> = self
            .oscillators
            .iter()
            .filter(|(_, o)| o.has_ended(now))
            .map(|(id, o)| (*id, o.output))
            .collect();

        for (id, output) in ended {
            self.oscillators.remove(&id);
            if let Some(Target::Gain(gain)) = output {
                if !self.has_inputs(gain) {
                    self.gains.remove(&gain);
                }
            }
        }

        for gain in self.gains.values_mut() {
            gain.param.prune(now);
        }
    }

    fn has_inputs(&self, id: GainId) -> bool {
        let target = Some(Target::Gain(id));
        self.oscillators.values().any(|o| o.output == target)
            || self.gains.values().any(|g| g.output == target)
    }
}

/// Product of the gains between a node and the destination, 0 if unrouted.
#[inline]
fn chain_level(gains: &HashMap<GainId, GainNode>, mut target: Option<Target>, time: f64) -> f32 {
    let mut level = 1.0f32;
    for _ in 0..MAX_CHAIN_DEPTH {
        match target {
            Some(Target::Destination) => return level,
            Some(Target::Gain(id)) => match gains.get(&id) {
                Some(gain) => {
                    level *= gain.param.value_at(time);
                    target = gain.output;
                }
                None => return 0.0,
            },
            None => return 0.0,
        }
    }
    0.0
}

/// Render graph shared between the control thread and an output engine.
#[derive(Clone, Debug)]
pub struct GraphHandle {
    inner: Arc<Mutex<RenderGraph>>,
}

impl GraphHandle {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RenderGraph::new(sample_rate))),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, RenderGraph> {
        self.inner.lock()
    }

    /// Non-blocking access for the audio callback.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, RenderGraph>> {
        self.inner.try_lock()
    }

    pub fn current_time(&self) -> f64 {
        self.inner.lock().current_time()
    }

    pub fn sample_rate(&self) -> f64 {
        self.inner.lock().sample_rate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SR: f64 = 1000.0;

    fn peak(samples: &[f32]) -> f32 {
        samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    #[test]
    fn test_clock_advances_with_render() {
        let mut graph = RenderGraph::new(SR);
        assert_eq!(graph.current_time(), 0.0);
        let mut buf = vec![0.0; 500];
        graph.render(&mut buf, 1);
        assert_relative_eq!(graph.current_time(), 0.5);
        graph.skip(250);
        assert_relative_eq!(graph.current_time(), 0.75);
    }

    #[test]
    fn test_unrouted_oscillator_is_silent() {
        let mut graph = RenderGraph::new(SR);
        let osc = graph.create_oscillator(Waveform::Square, 100.0);
        graph.start(osc, 0.0).unwrap();
        let mut buf = vec![0.0; 100];
        graph.render(&mut buf, 1);
        assert_eq!(peak(&buf), 0.0);
    }

    #[test]
    fn test_gain_chain_scales_output() {
        let mut graph = RenderGraph::new(SR);
        let master = graph.create_gain(0.8);
        let voice = graph.create_gain(0.5);
        let osc = graph.create_oscillator(Waveform::Square, 100.0);
        graph.connect(master.into(), NodeRef::Destination).unwrap();
        graph.connect(voice.into(), master.into()).unwrap();
        graph.connect(osc.into(), voice.into()).unwrap();
        graph.start(osc, 0.0).unwrap();

        let mut buf = vec![0.0; 100];
        graph.render(&mut buf, 1);
        assert_relative_eq!(peak(&buf), 0.4, epsilon = 1e-6);
    }

    #[test]
    fn test_stop_ends_and_collects_nodes() {
        let mut graph = RenderGraph::new(SR);
        let master = graph.create_gain(1.0);
        let voice = graph.create_gain(1.0);
        let osc = graph.create_oscillator(Waveform::Square, 50.0);
        graph.connect(master.into(), NodeRef::Destination).unwrap();
        graph.connect(voice.into(), master.into()).unwrap();
        graph.connect(osc.into(), voice.into()).unwrap();
        graph.start(osc, 0.0).unwrap();
        graph.stop(osc, 0.1).unwrap();

        let mut buf = vec![0.0; 200];
        graph.render(&mut buf, 1);
        assert!(peak(&buf[..100]) > 0.9);
        assert_eq!(peak(&buf[100..]), 0.0);

        assert!(!graph.contains_oscillator(osc));
        assert!(!graph.contains_gain(voice));
        assert!(graph.contains_gain(master));
    }

    #[test]
    fn test_start_twice_and_stop_before_start_fail() {
        let mut graph = RenderGraph::new(SR);
        let osc = graph.create_oscillator(Waveform::Sine, 440.0);
        assert!(matches!(graph.stop(osc, 1.0), Err(Error::InvalidState(_))));
        graph.start(osc, 0.0).unwrap();
        assert!(matches!(graph.start(osc, 0.0), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_invalid_connections() {
        let mut graph = RenderGraph::new(SR);
        let gain = graph.create_gain(1.0);
        let osc = graph.create_oscillator(Waveform::Sine, 440.0);
        assert!(graph.connect(gain.into(), osc.into()).is_err());
        assert!(graph.connect(gain.into(), gain.into()).is_err());
        assert!(graph.connect(NodeRef::Destination, gain.into()).is_err());
        assert!(graph.connect(osc.into(), GainId(999).into()).is_err());
    }

    #[test]
    fn test_automation_drives_gain() {
        let mut graph = RenderGraph::new(SR);
        let gain = graph.create_gain(1.0);
        graph.set_value_at_time(gain, 0.0001, 0.0).unwrap();
        graph
            .exponential_ramp_to_value_at_time(gain, 0.5, 0.01)
            .unwrap();
        graph.skip(20);
        assert_relative_eq!(graph.gain_value(gain).unwrap(), 0.5);
    }

    #[test]
    fn test_waveform_shapes() {
        assert_relative_eq!(Waveform::Sine.sample(0.25), 1.0);
        assert_relative_eq!(Waveform::Triangle.sample(0.25), 1.0);
        assert_relative_eq!(Waveform::Triangle.sample(0.75), -1.0);
        assert_relative_eq!(Waveform::Sawtooth.sample(0.0), 0.0);
        assert_eq!(Waveform::Square.sample(0.1), 1.0);
        assert_eq!(Waveform::Square.sample(0.6), -1.0);
    }

    #[test]
    fn test_stereo_frames_duplicate_mono() {
        let mut graph = RenderGraph::new(SR);
        let osc = graph.create_oscillator(Waveform::Square, 10.0);
        graph.connect(osc.into(), NodeRef::Destination).unwrap();
        graph.start(osc, 0.0).unwrap();
        let mut buf = vec![0.0; 20];
        graph.render(&mut buf, 2);
        assert_eq!(graph.frames_rendered(), 10);
        assert!(buf.chunks(2).all(|f| f[0] == f[1]));
    }
}
