//! Tolerance constants for audio and envelope assertions.

/// Floating point rounding errors (reference pitch, exact gain).
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Envelope and oscillator tolerance.
pub const DSP_EPSILON: f32 = 1e-4;

/// Audio perceptual tolerance (~-60dB, inaudible differences).
pub const PERCEPTUAL_EPSILON: f32 = 0.001;

/// Silence threshold (~-80dB).
/// Values below this are considered silent.
pub const SILENCE_THRESHOLD: f32 = 0.0001;
