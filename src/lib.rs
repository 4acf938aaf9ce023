//! Perpetual noise harmonograph.
//!
//! A seed fixes a handful of features; a two-pendulum oscillator whose radii
//! breathe with coherent noise then draws forever over a set of static noise
//! layers.

pub mod export;
pub mod features;
pub mod harmonograph;
pub mod layers;
pub mod provider;
pub mod raster;
pub mod session;
pub mod viewport;

pub use export::ExportError;
pub use features::{FeatureSet, Seed, REFERENCE_SIZE};
pub use harmonograph::{AmplitudeEnvelope, Harmonograph};
pub use layers::{Layer, LayerRole};
pub use provider::{NoiseSource, PerlinNoise, RandomSource, SeededRandom};
pub use raster::{Canvas, Rgba};
pub use session::{Session, SessionConfig, STEPS_PER_TICK};
pub use viewport::{AspectRatio, Viewport};
