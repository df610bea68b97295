//! Integration test modules for igem
//!
//! - pipeline: hardware/on-screen input through to voices, audio and the log
//! - arbitration: input-mode gating and de-duplication
//! - keyboard: pointer gestures and held-key edge cases
//! - lifecycle: access outcomes, teardown, recording sessions

pub mod arbitration;
pub mod keyboard;
pub mod lifecycle;
pub mod pipeline;
