#![forbid(unsafe_code)]

//! Continuously animated "voice assistant" waveform rendering.
//!
//! An [`engine::WaveEngine`] owns the animation state (phase, eased speed
//! and amplitude) and draws one of two looks onto a [`render::surface::Surface`]:
//! the classic five stroked sinusoid layers, or bundles of randomized filled
//! curves that grow, decay and respawn. Frames are paced by a
//! [`scheduler::FrameScheduler`]; the bundled software scheduler emulates a
//! 60 Hz display callback on top of a monotonic [`clock::Clock`].

pub mod clock;
pub mod config;
pub mod curve;
pub mod engine;
pub mod foundation;
pub mod render;
pub mod scheduler;

pub use config::{SpawnDefinition, WaveConfig, WaveStyle};
pub use engine::WaveEngine;
pub use foundation::color::{Rgb, Rgba};
pub use foundation::error::{UndulaError, UndulaResult};
pub use render::cpu::CpuSurface;
pub use render::recording::RecordingSurface;
pub use render::surface::Surface;
pub use scheduler::{FrameScheduler, SoftwareScheduler};
