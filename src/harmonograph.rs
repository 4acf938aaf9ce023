use glam::DVec2;

use crate::features::{FeatureSet, REFERENCE_SIZE};
use crate::provider::{map_range, NoiseSource};

const ENVELOPE_FLOOR: f64 = 0.1;
const ENVELOPE_CEILING: f64 = 0.99;

/// Slow breathing scale applied to every pendulum radius.
///
/// Shrinks by `friction` each step until it drops under the floor, then
/// grows by `1 / friction` until it passes the ceiling, forever.
#[derive(Debug, Clone, PartialEq)]
pub struct AmplitudeEnvelope {
    value: f64,
    shrinking: bool,
    friction: f64,
}

impl AmplitudeEnvelope {
    pub fn new(friction: f64) -> Self {
        Self {
            value: 1.0,
            shrinking: true,
            friction,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_shrinking(&self) -> bool {
        self.shrinking
    }

    pub fn advance(&mut self) {
        if self.shrinking && self.value < ENVELOPE_FLOOR {
            self.shrinking = false;
        }
        if !self.shrinking && self.value > ENVELOPE_CEILING {
            self.shrinking = true;
        }
        if self.shrinking {
            self.value *= self.friction;
        } else {
            self.value /= self.friction;
        }
    }
}

/// Two-pendulum harmonograph whose radii are driven by coherent noise.
///
/// Pendulum 1 swings the center on two independent axes, pendulum 2 hangs
/// off that center and is the point that gets drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Harmonograph {
    theta: f64,
    phi: f64,
    alpha: f64,
    theta_vel: f64,
    phi_vel: f64,
    alpha_vel: f64,
    envelope: AmplitudeEnvelope,
    /// Drift anchor. Static for now.
    mov: DVec2,
    center: DVec2,
    position: DVec2,
    noise_freq: f64,
    noise_freq_2: DVec2,
}

impl Harmonograph {
    /// Fresh oscillator at the origin using the session's features.
    ///
    /// `noise_freq_2` is the per-axis frequency of the second noise sample,
    /// drawn by the caller from the layer random stream.
    pub fn new(features: &FeatureSet, noise_freq_2: DVec2) -> Self {
        Self {
            theta: 0.0,
            phi: 0.0,
            alpha: 0.0,
            theta_vel: features.theta_vel,
            phi_vel: features.phi_vel,
            alpha_vel: features.alpha_vel,
            envelope: AmplitudeEnvelope::new(features.friction),
            mov: DVec2::ZERO,
            center: DVec2::new(features.pendulum_center_x, 0.0),
            position: DVec2::ZERO,
            noise_freq: 0.001,
            noise_freq_2,
        }
    }

    /// Advance one tick and return the new pendulum 2 position.
    pub fn step<N: NoiseSource + ?Sized>(&mut self, noise: &N) -> DVec2 {
        let DVec2 { x, y } = self.position;
        let n = noise.noise2(x * self.noise_freq, y * self.noise_freq);
        let n2 = noise.noise2(x * self.noise_freq_2.x, y * self.noise_freq_2.y);
        self.noise_freq = map_range(n2, 0.0, 1.0, 0.002, 0.008);

        let m = self.envelope.value();
        let s = REFERENCE_SIZE;
        let rx1 = map_range(n, 0.0, 1.0, s * 0.01, s * 0.1) * m;
        let ry1 = map_range(n, 0.0, 1.0, s * 0.1, s * 0.01) * m;
        let rx2 = map_range(n, 0.0, 1.0, s * 0.25, s * 0.4) * m;
        let ry2 = rx2;

        self.center = DVec2::new(
            self.mov.x + (-self.theta).cos() * rx1,
            self.mov.y + self.phi.sin() * ry1,
        );
        self.position = DVec2::new(
            self.center.x + self.alpha.sin() * rx2,
            self.center.y + self.alpha.cos() * ry2,
        );

        self.theta += self.theta_vel;
        self.phi += self.phi_vel;
        self.alpha += self.alpha_vel;
        self.envelope.advance();

        self.position
    }

    pub fn position(&self) -> DVec2 {
        self.position
    }

    /// Pendulum 1 center as of the last step.
    pub fn center(&self) -> DVec2 {
        self.center
    }

    pub fn envelope(&self) -> &AmplitudeEnvelope {
        &self.envelope
    }

    pub fn noise_freq(&self) -> f64 {
        self.noise_freq
    }

    pub fn angles(&self) -> (f64, f64, f64) {
        (self.theta, self.phi, self.alpha)
    }
}
