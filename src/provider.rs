use noise::{NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Seeded coherent noise sampled into [0, 1].
pub trait NoiseSource {
    fn noise2(&self, x: f64, y: f64) -> f64;
    fn noise3(&self, x: f64, y: f64, z: f64) -> f64;
}

/// Seeded uniform random draws. Every call consumes exactly one draw.
pub trait RandomSource {
    /// Uniform value between `min` and `max`. An inverted range is allowed and
    /// maps the unit draw from `min` towards `max`.
    fn range(&mut self, min: f64, max: f64) -> f64;

    fn below(&mut self, max: f64) -> f64 {
        self.range(0.0, max)
    }
}

const OCTAVES: u32 = 4;
const GAIN: f64 = 0.5;
const LACUNARITY: f64 = 2.0;

/// Four-octave Perlin fBm, normalised to [0, 1].
///
/// Every octave vanishes on integer lattice points, so `noise2(0.0, 0.0)` is
/// exactly 0.5 for any seed.
pub struct PerlinNoise {
    perlin: Perlin,
    amp_sum: f64,
}

impl PerlinNoise {
    pub fn new(seed: u64) -> Self {
        // fold the high half in so seeds differing only above bit 32 still differ
        let folded = (seed ^ (seed >> 32)) as u32;
        Self {
            perlin: Perlin::new(folded),
            amp_sum: (0..OCTAVES).map(|i| GAIN.powi(i as i32)).sum(),
        }
    }

    fn fbm<const N: usize>(&self, point: [f64; N]) -> f64
    where
        Perlin: NoiseFn<f64, N>,
    {
        let mut val = 0.0;
        let mut amp = 1.0;
        let mut freq = 1.0;
        for _ in 0..OCTAVES {
            val += amp * self.perlin.get(point.map(|c| c * freq));
            amp *= GAIN;
            freq *= LACUNARITY;
        }
        (val / self.amp_sum * 0.5 + 0.5).clamp(0.0, 1.0)
    }
}

impl NoiseSource for PerlinNoise {
    fn noise2(&self, x: f64, y: f64) -> f64 {
        self.fbm([x, y])
    }

    fn noise3(&self, x: f64, y: f64, z: f64) -> f64 {
        self.fbm([x, y, z])
    }
}

/// ChaCha8 stream keyed by a seed and a stream number.
///
/// Distinct streams of one seed are independent, so feature derivation and
/// layer generation never share draws.
pub struct SeededRandom {
    rng: ChaCha8Rng,
}

impl SeededRandom {
    pub fn new(seed: u64, stream: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(stream);
        Self { rng }
    }
}

impl RandomSource for SeededRandom {
    fn range(&mut self, min: f64, max: f64) -> f64 {
        let unit: f64 = self.rng.gen();
        min + unit * (max - min)
    }
}

/// Linear remap of `value` from [`start1`, `stop1`] to [`start2`, `stop2`], unclamped.
pub fn map_range(value: f64, start1: f64, stop1: f64, start2: f64, stop2: f64) -> f64 {
    start2 + (stop2 - start2) * ((value - start1) / (stop1 - start1))
}

#[cfg(test)]
pub(crate) mod stub {
    use super::NoiseSource;

    /// Noise that returns one value everywhere.
    pub struct ConstantNoise(pub f64);

    impl NoiseSource for ConstantNoise {
        fn noise2(&self, _x: f64, _y: f64) -> f64 {
            self.0
        }

        fn noise3(&self, _x: f64, _y: f64, _z: f64) -> f64 {
            self.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_origin_is_midpoint() {
        for seed in [0, 42, 7_000_000_000] {
            let noise = PerlinNoise::new(seed);
            assert_eq!(noise.noise2(0.0, 0.0), 0.5);
            assert_eq!(noise.noise3(0.0, 0.0, 0.0), 0.5);
        }
    }

    #[test]
    fn test_noise_in_unit_range() {
        let noise = PerlinNoise::new(42);
        for i in 0..2000 {
            let x = i as f64 * 0.0137;
            let y = i as f64 * -0.0071 + 3.3;
            let v = noise.noise2(x, y);
            assert!((0.0..=1.0).contains(&v), "noise {v} outside [0, 1]");
        }
    }

    #[test]
    fn test_noise_is_smooth() {
        let noise = PerlinNoise::new(3);
        let a = noise.noise2(1.2345, 6.789);
        let b = noise.noise2(1.2345 + 1e-6, 6.789);
        assert!((a - b).abs() < 1e-4);
    }

    #[test]
    fn test_same_seed_same_draws() {
        let mut a = SeededRandom::new(42, 0);
        let mut b = SeededRandom::new(42, 0);
        for _ in 0..100 {
            assert_eq!(a.range(-5.0, 5.0).to_bits(), b.range(-5.0, 5.0).to_bits());
        }
    }

    #[test]
    fn test_streams_differ() {
        let mut a = SeededRandom::new(42, 0);
        let mut b = SeededRandom::new(42, 1);
        assert_ne!(a.below(1.0), b.below(1.0));
    }

    #[test]
    fn test_inverted_range_stays_inside() {
        let mut rng = SeededRandom::new(9, 0);
        for _ in 0..1000 {
            let v = rng.range(0.999998, 0.999997);
            assert!(v <= 0.999998 && v >= 0.999997);
        }
    }

    #[test]
    fn test_map_range() {
        assert_eq!(map_range(0.5, 0.0, 1.0, 10.0, 20.0), 15.0);
        assert_eq!(map_range(0.0, 0.0, 1.0, 216.0, 21.6), 216.0);
        assert_eq!(map_range(2.0, 0.0, 1.0, 0.0, 1.0), 2.0);
    }
}
