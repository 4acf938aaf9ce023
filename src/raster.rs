use glam::{DAffine2, DVec2};

/// Straight-alpha RGBA8 color.
pub type Rgba = [u8; 4];

pub const TRANSPARENT: Rgba = [0, 0, 0, 0];
pub const BLACK: Rgba = [0, 0, 0, 255];

/// Grey level with alpha, both in 0..=255 and clamped.
pub fn grey(level: f64, alpha: f64) -> Rgba {
    let level = level.round().clamp(0.0, 255.0) as u8;
    [level, level, level, alpha.round().clamp(0.0, 255.0) as u8]
}

/// An RGBA8 raster surface, row-major.
///
/// All drawing takes a transform from user space into pixel space and
/// blends source-over. Shapes too small to cover a pixel center still
/// deposit their area as coverage on the pixel under their centroid, so
/// hairlines and sub-pixel dots survive low raster scales.
#[derive(Clone, PartialEq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, TRANSPARENT)
    }

    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// Raw RGBA bytes, ready for a framebuffer or an encoder.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    pub fn fill(&mut self, color: Rgba) {
        self.pixels.fill(color);
    }

    /// Number of pixels that are not fully transparent.
    pub fn painted(&self) -> usize {
        self.pixels.iter().filter(|p| p[3] != 0).count()
    }

    /// Composite `other` over this canvas. Sizes must match.
    pub fn draw_over(&mut self, other: &Canvas) {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        for (dst, src) in self.pixels.iter_mut().zip(&other.pixels) {
            if src[3] != 0 {
                *dst = blend(*dst, *src, 1.0);
            }
        }
    }

    /// Blend `color` into one pixel with extra `coverage` in [0, 1].
    fn plot(&mut self, x: i64, y: i64, color: Rgba, coverage: f64) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 || coverage <= 0.0 {
            return;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.pixels[idx] = blend(self.pixels[idx], color, coverage.min(1.0));
    }

    fn plot_point(&mut self, p: DVec2, color: Rgba, coverage: f64) {
        self.plot(p.x.floor() as i64, p.y.floor() as i64, color, coverage);
    }

    /// Filled disc of `diameter` centred on `center`.
    pub fn fill_circle(&mut self, transform: &DAffine2, center: DVec2, diameter: f64, color: Rgba) {
        let c = transform.transform_point2(center);
        let r = diameter * 0.5 * uniform_scale(transform);
        if !c.is_finite() || r <= 0.0 {
            return;
        }
        let (x0, y0, x1, y1) = match self.clip_box(c - DVec2::splat(r), c + DVec2::splat(r)) {
            Some(b) => b,
            None => return,
        };
        let r2 = r * r;
        let mut hit = false;
        for py in y0..=y1 {
            for px in x0..=x1 {
                let d = DVec2::new(px as f64 + 0.5, py as f64 + 0.5) - c;
                if d.length_squared() <= r2 {
                    self.plot(px, py, color, 1.0);
                    hit = true;
                }
            }
        }
        if !hit {
            self.plot_point(c, color, std::f64::consts::PI * r2);
        }
    }

    /// Filled quadrilateral given by four corners in order.
    pub fn fill_quad(&mut self, transform: &DAffine2, corners: [DVec2; 4], color: Rgba) {
        let pts = corners.map(|p| transform.transform_point2(p));
        if pts.iter().any(|p| !p.is_finite()) {
            return;
        }
        let lo = pts.iter().fold(DVec2::splat(f64::MAX), |a, p| a.min(*p));
        let hi = pts.iter().fold(DVec2::splat(f64::MIN), |a, p| a.max(*p));
        let area = polygon_area(&pts);
        if area <= 0.0 {
            return;
        }
        let (x0, y0, x1, y1) = match self.clip_box(lo, hi) {
            Some(b) => b,
            None => return,
        };
        let mut hit = false;
        for py in y0..=y1 {
            for px in x0..=x1 {
                if contains_convex(&pts, DVec2::new(px as f64 + 0.5, py as f64 + 0.5)) {
                    self.plot(px, py, color, 1.0);
                    hit = true;
                }
            }
        }
        if !hit {
            let centroid = pts.iter().copied().sum::<DVec2>() * 0.25;
            self.plot_point(centroid, color, area);
        }
    }

    /// Axis-aligned rectangle in user space, `origin` being its top-left corner.
    pub fn fill_rect(&mut self, transform: &DAffine2, origin: DVec2, size: DVec2, color: Rgba) {
        let corners = [
            origin,
            origin + DVec2::new(size.x, 0.0),
            origin + size,
            origin + DVec2::new(0.0, size.y),
        ];
        self.fill_quad(transform, corners, color);
    }

    /// Rectangle positioned by its center.
    pub fn fill_rect_centered(&mut self, transform: &DAffine2, center: DVec2, size: DVec2, color: Rgba) {
        self.fill_rect(transform, center - size * 0.5, size, color);
    }

    /// Line of stroke `weight`, stepped one pixel at a time. Weights under a
    /// pixel thin the alpha instead of the footprint.
    pub fn stroke_line(&mut self, transform: &DAffine2, from: DVec2, to: DVec2, weight: f64, color: Rgba) {
        let a = transform.transform_point2(from);
        let b = transform.transform_point2(to);
        if !a.is_finite() || !b.is_finite() {
            return;
        }
        let w = weight * uniform_scale(transform);
        if w > 1.5 {
            let dir = (b - a).normalize_or_zero();
            let n = dir.perp() * (w * 0.5);
            self.fill_quad(&DAffine2::IDENTITY, [a + n, b + n, b - n, a - n], color);
            return;
        }
        let delta = b - a;
        let steps = delta.x.abs().max(delta.y.abs()).ceil().max(1.0) as i64;
        let coverage = w.min(1.0);
        let mut last = None;
        for i in 0..=steps {
            let p = a + delta * (i as f64 / steps as f64);
            let cell = (p.x.floor() as i64, p.y.floor() as i64);
            if last != Some(cell) {
                self.plot(cell.0, cell.1, color, coverage);
                last = Some(cell);
            }
        }
    }

    fn clip_box(&self, lo: DVec2, hi: DVec2) -> Option<(i64, i64, i64, i64)> {
        let x0 = (lo.x.floor() as i64).max(0);
        let y0 = (lo.y.floor() as i64).max(0);
        let x1 = (hi.x.ceil() as i64).min(self.width as i64 - 1);
        let y1 = (hi.y.ceil() as i64).min(self.height as i64 - 1);
        if x0 > x1 || y0 > y1 {
            // still deposit sub-pixel shapes sitting inside the canvas
            let c = (lo + hi) * 0.5;
            if c.x >= 0.0 && c.y >= 0.0 && c.x < self.width as f64 && c.y < self.height as f64 {
                let (cx, cy) = (c.x.floor() as i64, c.y.floor() as i64);
                return Some((cx, cy, cx, cy));
            }
            return None;
        }
        Some((x0, y0, x1, y1))
    }
}

/// Source-over in straight alpha.
fn blend(dst: Rgba, src: Rgba, coverage: f64) -> Rgba {
    let sa = src[3] as f64 / 255.0 * coverage;
    if sa <= 0.0 {
        return dst;
    }
    let da = dst[3] as f64 / 255.0;
    let oa = sa + da * (1.0 - sa);
    let mut out = [0u8; 4];
    for i in 0..3 {
        let c = (src[i] as f64 * sa + dst[i] as f64 * da * (1.0 - sa)) / oa;
        out[i] = c.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (oa * 255.0).round().clamp(0.0, 255.0) as u8;
    out
}

fn uniform_scale(transform: &DAffine2) -> f64 {
    transform.matrix2.determinant().abs().sqrt()
}

fn signed_twice_area(pts: &[DVec2]) -> f64 {
    let mut twice = 0.0;
    for i in 0..pts.len() {
        twice += pts[i].perp_dot(pts[(i + 1) % pts.len()]);
    }
    twice
}

fn polygon_area(pts: &[DVec2]) -> f64 {
    signed_twice_area(pts).abs() * 0.5
}

/// Point-in-convex-polygon with a top-left fill rule: a point exactly on an
/// edge belongs to the shape only when that edge is a top or left edge, so
/// shapes sharing an edge never both cover the seam.
fn contains_convex(pts: &[DVec2], p: DVec2) -> bool {
    // +1 for clockwise on screen (y down)
    let winding = signed_twice_area(pts).signum();
    if winding == 0.0 {
        return false;
    }
    for i in 0..pts.len() {
        let a = pts[i];
        let edge = (pts[(i + 1) % pts.len()] - a) * winding;
        let cross = edge.perp_dot(p - a);
        if cross < 0.0 || (cross == 0.0 && !is_top_left(edge)) {
            return false;
        }
    }
    true
}

fn is_top_left(edge: DVec2) -> bool {
    (edge.y == 0.0 && edge.x > 0.0) || edge.y < 0.0
}
