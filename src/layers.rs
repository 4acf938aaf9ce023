use std::f64::consts::{FRAC_PI_2, TAU};

use glam::{DAffine2, DVec2};

use crate::features::{FeatureSet, REFERENCE_SIZE};
use crate::provider::{map_range, NoiseSource, RandomSource};
use crate::raster::{grey, Canvas, BLACK};
use crate::viewport::Viewport;

const BACKGROUND_CELL: f64 = 10.0;
const FLOW_CELL: f64 = 10.0;
const FLOW_MARGIN: f64 = 100.0;
const FLOW_BAND: f64 = 200.0;
const FLOW_JITTER: f64 = 600.0;
const FLOW_STROKE_LEN: f64 = 100.0;
const SIGNATURE_DROP: f64 = 1000.0;

/// Raster layers, listed in compositing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerRole {
    Background,
    FlowField,
    Trace,
    Signature,
}

impl LayerRole {
    pub const ALL: [LayerRole; 4] = [
        LayerRole::Background,
        LayerRole::FlowField,
        LayerRole::Trace,
        LayerRole::Signature,
    ];

    pub fn index(self) -> usize {
        match self {
            LayerRole::Background => 0,
            LayerRole::FlowField => 1,
            LayerRole::Trace => 2,
            LayerRole::Signature => 3,
        }
    }

    /// The signature overlay is always composited; every other layer can be hidden.
    pub fn is_toggleable(self) -> bool {
        self != LayerRole::Signature
    }
}

/// One toggleable surface. Its canvas only ever accumulates.
#[derive(Debug, Clone)]
pub struct Layer {
    pub role: LayerRole,
    pub visible: bool,
    pub canvas: Canvas,
}

impl Layer {
    pub fn new(role: LayerRole, width: u32, height: u32) -> Self {
        Self {
            role,
            visible: true,
            canvas: Canvas::new(width, height),
        }
    }
}

/// Reference units to raster pixels.
pub fn base_transform(viewport: &Viewport) -> DAffine2 {
    DAffine2::from_scale(DVec2::splat(viewport.scale()))
}

/// Rotation by `angle` about the canvas center.
fn rotate_about_center(viewport: &Viewport, angle: f64) -> DAffine2 {
    let c = viewport.center();
    DAffine2::from_translation(c) * DAffine2::from_angle(angle) * DAffine2::from_translation(-c)
}

/// Static greyscale noise field covering the whole canvas.
pub fn draw_background<N: NoiseSource + ?Sized>(
    canvas: &mut Canvas,
    viewport: &Viewport,
    features: &FeatureSet,
    noise: &N,
) {
    let half = viewport.center();
    let shift = viewport.background_shift();
    let origin = half - shift;
    let transform = base_transform(viewport) * DAffine2::from_translation(origin);
    let bns = features.background_noise_size;

    let start = -half + shift;
    let cols = (viewport.size().x / BACKGROUND_CELL).ceil() as usize;
    let rows = (viewport.size().y / BACKGROUND_CELL).ceil() as usize;
    for i in 0..cols {
        let x = start.x + i as f64 * BACKGROUND_CELL;
        for j in 0..rows {
            let y = start.y + j as f64 * BACKGROUND_CELL;
            let n = noise.noise2(x * bns, y * bns);
            canvas.fill_rect(
                &transform,
                DVec2::new(x, y),
                DVec2::splat(BACKGROUND_CELL),
                grey(255.0 * n, 255.0),
            );
        }
    }
}

/// Ring of noise-oriented tick marks inside the reference square.
///
/// Draws one random value (the vertical jitter of the ring) and returns the
/// grid cells that were drawn, in reference-square coordinates.
pub fn draw_flowfield<N, R>(
    canvas: &mut Canvas,
    viewport: &Viewport,
    features: &FeatureSet,
    noise: &N,
    rng: &mut R,
) -> Vec<DVec2>
where
    N: NoiseSource + ?Sized,
    R: RandomSource + ?Sized,
{
    let jitter = rng.range(-FLOW_JITTER, FLOW_JITTER);
    let region = base_transform(viewport)
        * DAffine2::from_translation(viewport.reference_offset() + DVec2::new(0.0, jitter));
    let center = DVec2::splat(REFERENCE_SIZE / 2.0);
    let diam = features.noise_wave_diameter;

    let mut ns = 0.001;
    let mut drawn = Vec::new();
    let cells = ((REFERENCE_SIZE - 2.0 * FLOW_MARGIN) / FLOW_CELL).ceil() as usize;
    for i in 0..cells {
        let x = FLOW_MARGIN + i as f64 * FLOW_CELL;
        for j in 0..cells {
            let y = FLOW_MARGIN + j as f64 * FLOW_CELL;
            let cell = DVec2::new(x, y);
            let d = cell.distance(center);
            if !(d < diam && d > diam - FLOW_BAND) {
                continue;
            }
            let n = noise.noise3(x * ns, y * ns, 0.0);
            let n2 = noise.noise3(x * 0.001, y * 0.001, 0.0);
            ns = map_range(n2, 0.0, 1.0, 0.001, 0.008);
            let angle = map_range(n, 0.0, 1.0, 0.0, TAU);

            let local = region * DAffine2::from_translation(cell) * DAffine2::from_angle(angle);
            let tip = DVec2::new(0.0, FLOW_STROKE_LEN);
            canvas.stroke_line(&local, DVec2::ZERO, tip, 0.6, grey(255.0, n * 150.0));
            canvas.fill_circle(&local, tip, map_range(n, 0.0, 1.0, 3.0, 10.0), grey(0.0, n * 100.0));
            drawn.push(cell);
        }
    }
    drawn
}

/// Transform for one tick of trace drawing: the layer-wide rotation about
/// the canvas center, then the oscillator origin at the reference center.
pub fn trace_transform(viewport: &Viewport, rotation: f64) -> DAffine2 {
    base_transform(viewport)
        * rotate_about_center(viewport, rotation)
        * DAffine2::from_translation(viewport.reference_offset() + DVec2::splat(REFERENCE_SIZE / 2.0))
}

/// A light halo up-left of the point, then the solid point on top.
pub fn draw_trace_point(canvas: &mut Canvas, transform: &DAffine2, p: DVec2) {
    canvas.fill_circle(transform, p - DVec2::splat(3.0), 5.0, grey(255.0, 50.0));
    canvas.fill_circle(transform, p, 3.0, BLACK);
}

/// Seed signature bars and a strip of random black and white rectangles,
/// all turned by a random quarter turn about the canvas center.
///
/// Returns the number of quarter turns applied.
pub fn draw_signature<R: RandomSource + ?Sized>(
    canvas: &mut Canvas,
    viewport: &Viewport,
    token: &str,
    rng: &mut R,
) -> u8 {
    let quarter = (rng.range(0.0, 4.0).floor() as u8).min(3);
    let transform = base_transform(viewport) * rotate_about_center(viewport, quarter as f64 * FRAC_PI_2);

    let anchor = viewport.center() + DVec2::new(0.0, SIGNATURE_DROP);
    let strip_w = rng.range(REFERENCE_SIZE * 0.1, REFERENCE_SIZE * 0.8);
    let strip_h = rng.range(10.0, 20.0);

    if !token.is_empty() {
        let mut chars = token.chars().cycle();
        let mut x = 0.0;
        let mut y = 0.0;
        for j in 0..5 {
            for i in 0..10 {
                let code = chars.next().map_or(0, |c| c as u32);
                let level = map_range(code as f64, 0.0, 122.0, 0.0, 255.0);
                let at = DVec2::new(x + anchor.x - 150.0, y + anchor.y - strip_h / 2.0);
                canvas.fill_rect_centered(&transform, at, DVec2::new(10.0, 5.0), grey(level, 255.0));
                x = i as f64 * 30.0;
            }
            y = j as f64 * 5.0;
        }
    }

    let mut s = rng.range(10.0, 15.0);
    let mut x = anchor.x - strip_w / 2.0;
    while x < anchor.x + strip_w / 2.0 {
        let mut y = anchor.y - strip_h / 2.0;
        while y < anchor.y + strip_h / 2.0 {
            s = rng.range(0.1, 2.0);
            let level = if rng.below(1.0) > 0.5 { 0.0 } else { 255.0 };
            let w = s + rng.range(1.0, 50.0);
            canvas.fill_rect_centered(&transform, DVec2::new(x, y - 50.0), DVec2::new(w, s), grey(level, 255.0));
            y += s;
        }
        x += s;
    }
    quarter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Seed;
    use crate::provider::stub::ConstantNoise;
    use crate::provider::{PerlinNoise, SeededRandom};
    use crate::viewport::AspectRatio;

    fn features() -> FeatureSet {
        FeatureSet::derive(&Seed::from_token("oolayers"))
    }

    #[test]
    fn test_background_is_opaque_everywhere() {
        let viewport = Viewport::new(AspectRatio::Landscape, 0.05);
        let (w, h) = viewport.pixel_size();
        let mut canvas = Canvas::new(w, h);
        draw_background(&mut canvas, &viewport, &features(), &PerlinNoise::new(1));
        assert!(canvas.pixels().iter().all(|p| p[3] == 255));
    }

    #[test]
    fn test_background_grey_follows_noise() {
        let viewport = Viewport::new(AspectRatio::Square, 0.1);
        let (w, h) = viewport.pixel_size();
        let mut canvas = Canvas::new(w, h);
        draw_background(&mut canvas, &viewport, &features(), &ConstantNoise(0.2));
        assert!(canvas.pixels().iter().all(|p| *p == [51, 51, 51, 255]));
    }

    #[test]
    fn test_flowfield_cells_inside_annulus() {
        let viewport = Viewport::new(AspectRatio::Square, 0.1);
        let (w, h) = viewport.pixel_size();
        let f = features();
        let mut canvas = Canvas::new(w, h);
        let mut rng = SeededRandom::new(f.seed, 1);
        let cells = draw_flowfield(&mut canvas, &viewport, &f, &PerlinNoise::new(f.seed), &mut rng);
        assert!(!cells.is_empty());
        let center = DVec2::splat(1080.0);
        for cell in &cells {
            let d = cell.distance(center);
            assert!(d > f.noise_wave_diameter - 200.0 && d < f.noise_wave_diameter);
        }
        assert!(canvas.painted() > 0);
    }

    #[test]
    fn test_flowfield_skips_everything_outside_ring() {
        let viewport = Viewport::new(AspectRatio::Square, 0.1);
        let (w, h) = viewport.pixel_size();
        let mut f = features();
        // the ring sits entirely outside the sampled grid
        f.noise_wave_diameter = 1800.0;
        let mut canvas = Canvas::new(w, h);
        let mut rng = SeededRandom::new(f.seed, 1);
        let cells = draw_flowfield(&mut canvas, &viewport, &f, &ConstantNoise(0.5), &mut rng);
        assert!(cells.is_empty());
        assert_eq!(canvas.painted(), 0);
    }

    #[test]
    fn test_trace_point_lands_at_canvas_center() {
        let viewport = Viewport::new(AspectRatio::Portrait, 0.5);
        let (w, h) = viewport.pixel_size();
        let mut canvas = Canvas::new(w, h);
        let t = trace_transform(&viewport, 0.0);
        draw_trace_point(&mut canvas, &t, DVec2::ZERO);
        assert_eq!(canvas.pixel(w / 2, h / 2), BLACK);
    }

    #[test]
    fn test_trace_rotation_turns_about_center() {
        let viewport = Viewport::new(AspectRatio::Square, 1.0);
        let t = trace_transform(&viewport, FRAC_PI_2);
        let p = t.transform_point2(DVec2::new(100.0, 0.0));
        assert!((p - DVec2::new(1080.0, 1180.0)).length() < 1e-9);
    }

    #[test]
    fn test_signature_is_reproducible() {
        let viewport = Viewport::new(AspectRatio::Square, 0.1);
        let (w, h) = viewport.pixel_size();
        let render = || {
            let mut canvas = Canvas::new(w, h);
            let mut rng = SeededRandom::new(99, 1);
            let quarter = draw_signature(&mut canvas, &viewport, "ooSignatureToken", &mut rng);
            (quarter, canvas)
        };
        let (qa, a) = render();
        let (qb, b) = render();
        assert!(qa < 4);
        assert_eq!(qa, qb);
        assert!(a == b);
        assert!(a.painted() > 0);
    }

    #[test]
    fn test_signature_without_token_still_draws_noise() {
        let viewport = Viewport::new(AspectRatio::Landscape, 0.1);
        let (w, h) = viewport.pixel_size();
        let mut canvas = Canvas::new(w, h);
        let mut rng = SeededRandom::new(5, 1);
        draw_signature(&mut canvas, &viewport, "", &mut rng);
        assert!(canvas.painted() > 0);
    }
}
