use rand::Rng;

use crate::provider::{RandomSource, SeededRandom};

/// Side of the reference square every distance in the piece is expressed in.
pub const REFERENCE_SIZE: f64 = 2160.0;

const FEATURE_STREAM: u64 = 0;
const TOKEN_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
const TOKEN_BODY_LEN: usize = 49;

/// The single input that determines everything a session draws.
///
/// `token` is the textual form printed into the signature overlay, `value`
/// its 64-bit FNV-1a hash used to key the random and noise providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seed {
    value: u64,
    token: String,
}

impl Seed {
    pub fn from_token(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            value: fnv1a(token.as_bytes()),
            token,
        }
    }

    /// A fresh random token: `oo` followed by 49 base58 characters.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut token = String::from("oo");
        for _ in 0..TOKEN_BODY_LEN {
            let idx = rng.gen_range(0..TOKEN_ALPHABET.len());
            token.push(TOKEN_ALPHABET[idx] as char);
        }
        Self::from_token(token)
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl From<u64> for Seed {
    fn from(value: u64) -> Self {
        Self {
            value,
            token: value.to_string(),
        }
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Simulation parameters derived once from a seed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    pub seed: u64,
    pub pendulum_center_x: f64,
    pub theta_vel: f64,
    pub phi_vel: f64,
    pub alpha_vel: f64,
    pub friction: f64,
    pub noise_wave_diameter: f64,
    pub background_noise_size: f64,
    pub initial_rotation: f64,
}

impl FeatureSet {
    /// Derive the features for `seed`.
    ///
    /// One draw per field, in declaration order, from the seed's feature
    /// stream. Changing the order changes every piece ever minted.
    pub fn derive(seed: &Seed) -> Self {
        let mut rng = SeededRandom::new(seed.value(), FEATURE_STREAM);
        Self::derive_with(seed.value(), &mut rng)
    }

    pub fn derive_with<R: RandomSource>(seed: u64, rng: &mut R) -> Self {
        let half = REFERENCE_SIZE / 2.0;
        Self {
            seed,
            pendulum_center_x: rng.range(-half, half),
            theta_vel: rng.range(0.001, 0.002).to_radians(),
            phi_vel: rng.range(0.001, 0.002).to_radians(),
            alpha_vel: rng.range(0.1, 0.2).to_radians(),
            friction: rng.range(0.999998, 0.999997),
            noise_wave_diameter: rng.range(REFERENCE_SIZE * 0.2, REFERENCE_SIZE * 0.5),
            background_noise_size: rng.range(0.0005, 0.001),
            initial_rotation: rng.below(std::f64::consts::TAU),
        }
    }
}
