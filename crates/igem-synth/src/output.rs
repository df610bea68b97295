//! CPAL audio output backend.

use crate::backend::{AudioBackend, AudioEngine, EngineState};
use crate::error::{Error, Result};
use crate::graph::GraphHandle;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, warn};

/// Wrapper to hold `cpal::Stream` in a `Send` context.
///
/// # Safety
/// `cpal::Stream` is `!Send` due to platform internals. This is safe because
/// the stream is only touched by the [`ToneSynth`](crate::ToneSynth) that
/// owns the engine, from one thread at a time.
struct StreamHandle(cpal::Stream);

unsafe impl Send for StreamHandle {}

/// Default (or indexed) output device through CPAL.
///
/// Engines open suspended; the first resume starts the stream.
#[derive(Debug, Clone, Default)]
pub struct CpalOutput {
    device_index: Option<usize>,
}

impl CpalOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(index: usize) -> Self {
        Self {
            device_index: Some(index),
        }
    }

    /// `None` when the host has no output device.
    pub fn detect() -> Option<Self> {
        match cpal::default_host().default_output_device() {
            Some(_) => Some(Self::new()),
            None => {
                debug!("No audio output device");
                None
            }
        }
    }

    pub fn device_name(&self) -> Result<String> {
        Ok(get_device(self.device_index)?.name()?)
    }

    pub fn list_devices() -> Result<Vec<String>> {
        cpal::default_host()
            .output_devices()?
            .enumerate()
            .map(|(i, d)| Ok(format!("{i}: {}", d.name()?)))
            .collect()
    }
}

impl AudioBackend for CpalOutput {
    fn open(&mut self) -> Result<Box<dyn AudioEngine>> {
        let device = get_device(self.device_index)?;
        let config = device.default_output_config()?;
        let graph = GraphHandle::new(config.sample_rate().0 as f64);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config.into(), graph.clone())?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config.into(), graph.clone())?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config.into(), graph.clone())?,
            format => {
                return Err(Error::InvalidConfig(format!(
                    "Unsupported sample format: {format:?}"
                )));
            }
        };

        // Some hosts start streams on build.
        stream.pause()?;
        debug!("Opened audio output: {:?}", device.name().ok());

        Ok(Box::new(CpalEngine {
            graph,
            stream: Some(StreamHandle(stream)),
            state: EngineState::Suspended,
        }))
    }
}

struct CpalEngine {
    graph: GraphHandle,
    stream: Option<StreamHandle>,
    state: EngineState,
}

impl AudioEngine for CpalEngine {
    fn graph(&self) -> &GraphHandle {
        &self.graph
    }

    fn state(&self) -> EngineState {
        self.state
    }

    fn resume(&mut self) -> Result<()> {
        let Some(stream) = &self.stream else {
            return Err(Error::Closed);
        };
        if self.state == EngineState::Suspended {
            stream.0.play()?;
            self.state = EngineState::Running;
        }
        Ok(())
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.0.pause() {
                warn!("Failed to pause audio stream: {}", e);
            }
        }
        self.state = EngineState::Closed;
    }
}

impl Drop for CpalEngine {
    fn drop(&mut self) {
        self.close();
    }
}

fn get_device(index: Option<usize>) -> Result<cpal::Device> {
    let host = cpal::default_host();

    match index {
        Some(i) => {
            let devices: Vec<_> = host.output_devices()?.collect();
            let count = devices.len();
            devices.into_iter().nth(i).ok_or_else(|| {
                Error::InvalidDevice(format!("Device index {i} out of range ({count} available)"))
            })
        }
        None => host
            .default_output_device()
            .ok_or_else(|| Error::InvalidDevice("No output device available".into())),
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    graph: GraphHandle,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = config.channels as usize;

    // Grows on first callback, then stable
    let mut mix = Vec::<f32>::new();
    // Last frame written, so a skipped block can ramp down from it.
    let mut last_frame = vec![0.0f32; channels.max(1)];

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                if mix.len() != data.len() {
                    mix.resize(data.len(), 0.0);
                }
                // Skip the block rather than wait on the control thread.
                match graph.try_lock() {
                    Some(mut graph) => graph.render(&mut mix, channels),
                    None => fade_out(&mut last_frame, &mut mix),
                }
                hold_last_frame(&mut last_frame, &mix);
                write_output(data, &mix);
            }));

            if result.is_err() {
                last_frame.fill(0.0);
                output_silence(data);
            }
        },
        |err| warn!("Audio stream error: {}", err),
        None,
    )?;

    Ok(stream)
}

#[inline]
fn write_output<T: cpal::SizedSample + cpal::FromSample<f32>>(data: &mut [T], mix: &[f32]) {
    for (sample, value) in data.iter_mut().zip(mix) {
        *sample = T::from_sample(*value);
    }
}

/// Fills `mix` with a linear ramp from `last_frame` down to zero, then
/// zeroes `last_frame`.
fn fade_out(last_frame: &mut [f32], mix: &mut [f32]) {
    let channels = last_frame.len().max(1);
    let frames = mix.len() / channels;

    for (i, frame) in mix.chunks_exact_mut(channels).enumerate() {
        let remaining = 1.0 - (i + 1) as f32 / frames as f32;
        for (sample, from) in frame.iter_mut().zip(last_frame.iter()) {
            *sample = from * remaining;
        }
    }
    last_frame.fill(0.0);
}

#[inline]
fn hold_last_frame(last_frame: &mut [f32], mix: &[f32]) {
    let channels = last_frame.len();
    if mix.len() >= channels {
        last_frame.copy_from_slice(&mix[mix.len() - channels..]);
    }
}

/// Output silence (panic recovery).
#[inline]
fn output_silence<T: cpal::SizedSample + cpal::FromSample<f32>>(data: &mut [T]) {
    for sample in data.iter_mut() {
        *sample = T::from_sample(0.0);
    }
}
