use std::f64::consts::TAU;
use std::path::{Path, PathBuf};

use glam::DVec2;

use crate::export::{self, ExportError};
use crate::features::{FeatureSet, Seed};
use crate::harmonograph::Harmonograph;
use crate::layers::{self, Layer, LayerRole};
use crate::provider::{PerlinNoise, RandomSource, SeededRandom};
use crate::raster::{Canvas, BLACK};
use crate::viewport::{AspectRatio, Viewport};

/// Oscillator steps drawn into the trace layer per tick.
pub const STEPS_PER_TICK: usize = 500;

/// Trace layer rotation added after every unpaused tick.
pub const ROTATION_STEP: f64 = 0.0002;

const LAYER_STREAM: u64 = 1;

/// Startup options for a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub aspect: AspectRatio,
    /// Raster pixels per reference unit.
    pub scale: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            aspect: AspectRatio::Square,
            scale: 0.25,
        }
    }
}

/// Everything one running piece owns: features, layers, oscillator and the
/// last composited frame.
///
/// Features are derived once. Layers and the oscillator are rebuilt from
/// them whenever the aspect ratio changes.
pub struct Session {
    seed: Seed,
    features: FeatureSet,
    noise: PerlinNoise,
    viewport: Viewport,
    layers: Vec<Layer>,
    oscillator: Harmonograph,
    rotation: f64,
    paused: bool,
    frame: Canvas,
    ticks: u64,
    signature_turns: u8,
}

impl Session {
    pub fn new(seed: Seed, config: SessionConfig) -> Self {
        let features = FeatureSet::derive(&seed);
        log::info!("seed {} ({})", seed.token(), seed.value());
        log::info!("features: {:?}", features);

        let noise = PerlinNoise::new(features.seed);
        let viewport = Viewport::new(config.aspect, config.scale);
        let scene = Scene::build(&viewport, &features, &noise, seed.token());
        let (w, h) = viewport.pixel_size();

        Self {
            rotation: features.initial_rotation,
            seed,
            features,
            noise,
            viewport,
            layers: scene.layers,
            oscillator: scene.oscillator,
            paused: false,
            frame: Canvas::filled(w, h, BLACK),
            ticks: 0,
            signature_turns: scene.signature_turns,
        }
    }

    /// Advance the simulation by one display tick.
    ///
    /// Returns `false` and touches nothing while paused.
    pub fn tick(&mut self) -> bool {
        if self.paused {
            return false;
        }
        let transform = layers::trace_transform(&self.viewport, self.rotation);
        let trace = &mut self.layers[LayerRole::Trace.index()].canvas;
        for _ in 0..STEPS_PER_TICK {
            let p = self.oscillator.step(&self.noise);
            layers::draw_trace_point(trace, &transform, p);
        }
        self.rotation = (self.rotation + ROTATION_STEP) % TAU;
        self.ticks += 1;
        true
    }

    /// Merge the visible layers, in z-order, over black.
    pub fn composite_frame(&mut self) -> &Canvas {
        self.frame.fill(BLACK);
        for layer in self.layers.iter().filter(|l| l.visible) {
            self.frame.draw_over(&layer.canvas);
        }
        &self.frame
    }

    /// The last composited frame.
    pub fn frame(&self) -> &Canvas {
        &self.frame
    }

    /// Switch the canvas shape and rebuild every layer and the oscillator.
    ///
    /// A no-op returning `false` when `aspect` is already active.
    pub fn set_aspect(&mut self, aspect: AspectRatio) -> bool {
        if !self.viewport.set_aspect(aspect) {
            log::debug!("aspect already {:?}", aspect);
            return false;
        }
        let visibility: Vec<bool> = self.layers.iter().map(|l| l.visible).collect();
        let scene = Scene::build(&self.viewport, &self.features, &self.noise, self.seed.token());
        self.layers = scene.layers;
        for (layer, visible) in self.layers.iter_mut().zip(visibility) {
            layer.visible = visible;
        }
        self.oscillator = scene.oscillator;
        self.signature_turns = scene.signature_turns;

        let (w, h) = self.viewport.pixel_size();
        self.frame = Canvas::filled(w, h, BLACK);
        log::info!("aspect {:?}, raster {}x{}", aspect, w, h);
        true
    }

    /// Flip one layer's visibility and return the new state.
    ///
    /// Fixed layers stay visible and report `true`.
    pub fn toggle_layer(&mut self, role: LayerRole) -> bool {
        if !role.is_toggleable() {
            log::debug!("{:?} is not toggleable", role);
            return true;
        }
        let layer = &mut self.layers[role.index()];
        layer.visible = !layer.visible;
        log::debug!("{:?} visible: {}", role, layer.visible);
        layer.visible
    }

    pub fn show_all(&mut self) {
        for layer in &mut self.layers {
            layer.visible = true;
        }
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        log::info!("{}", if self.paused { "paused" } else { "resumed" });
        self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Write the last composited frame as a PNG into `dir`.
    pub fn snapshot(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        export::save_snapshot(&self.frame, dir)
    }

    pub fn seed(&self) -> &Seed {
        &self.seed
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn layer(&self, role: LayerRole) -> &Layer {
        &self.layers[role.index()]
    }

    pub fn oscillator(&self) -> &Harmonograph {
        &self.oscillator
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Quarter turns applied to the signature overlay.
    pub fn signature_turns(&self) -> u8 {
        self.signature_turns
    }
}

/// Freshly generated layers and oscillator for one viewport.
struct Scene {
    layers: Vec<Layer>,
    oscillator: Harmonograph,
    signature_turns: u8,
}

impl Scene {
    /// Re-seeds the layer random stream, so the same viewport always yields
    /// the same geometry.
    fn build(viewport: &Viewport, features: &FeatureSet, noise: &PerlinNoise, token: &str) -> Self {
        let mut rng = SeededRandom::new(features.seed, LAYER_STREAM);
        let (w, h) = viewport.pixel_size();
        let mut stack: Vec<Layer> = LayerRole::ALL.iter().map(|&role| Layer::new(role, w, h)).collect();

        layers::draw_background(&mut stack[LayerRole::Background.index()].canvas, viewport, features, noise);
        let cells = layers::draw_flowfield(
            &mut stack[LayerRole::FlowField.index()].canvas,
            viewport,
            features,
            noise,
            &mut rng,
        );
        log::debug!("flow field: {} cells", cells.len());

        let noise_freq_2 = DVec2::new(rng.range(0.001, 0.002), rng.range(0.001, 0.002));
        let oscillator = Harmonograph::new(features, noise_freq_2);

        let signature_turns = layers::draw_signature(
            &mut stack[LayerRole::Signature.index()].canvas,
            viewport,
            token,
            &mut rng,
        );

        Self {
            layers: stack,
            oscillator,
            signature_turns,
        }
    }
}
