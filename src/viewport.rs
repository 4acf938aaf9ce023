use glam::DVec2;

use crate::features::REFERENCE_SIZE;

/// The three canvas shapes the piece can be shown in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum AspectRatio {
    #[default]
    Square,
    Landscape,
    Portrait,
}

impl AspectRatio {
    /// Canvas size in reference units.
    pub fn dimensions(self) -> DVec2 {
        match self {
            AspectRatio::Square => DVec2::new(2160.0, 2160.0),
            AspectRatio::Landscape => DVec2::new(3840.0, 2160.0),
            AspectRatio::Portrait => DVec2::new(2160.0, 3840.0),
        }
    }
}

/// Active canvas geometry plus the raster resolution it is drawn at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    aspect: AspectRatio,
    scale: f64,
}

impl Viewport {
    pub fn new(aspect: AspectRatio, scale: f64) -> Self {
        Self { aspect, scale }
    }

    pub fn aspect(&self) -> AspectRatio {
        self.aspect
    }

    /// Returns `false` when `aspect` is already active.
    pub fn set_aspect(&mut self, aspect: AspectRatio) -> bool {
        if self.aspect == aspect {
            return false;
        }
        self.aspect = aspect;
        true
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Size in reference units.
    pub fn size(&self) -> DVec2 {
        self.aspect.dimensions()
    }

    pub fn center(&self) -> DVec2 {
        self.size() * 0.5
    }

    /// Raster size in pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        let px = (self.size() * self.scale).round().max(DVec2::ONE);
        (px.x as u32, px.y as u32)
    }

    /// Top-left of the reference square, centred in the canvas.
    pub fn reference_offset(&self) -> DVec2 {
        (self.size() - DVec2::splat(REFERENCE_SIZE)) * 0.5
    }

    /// Origin shift of the background noise field, proportional to the
    /// short side so wider or taller canvases keep the same composition.
    pub fn background_shift(&self) -> DVec2 {
        let short = self.size().min_element();
        DVec2::new(600.0, -1000.0) * (short / REFERENCE_SIZE)
    }
}
