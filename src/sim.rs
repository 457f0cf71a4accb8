//! Simulated flaky checks.
//!
//! [`SimulatedCheck`] is fully deterministic: the `n`-th draw for a version is a stable hash of
//! `(seed, n, version name)`, so a run is reproducible across platforms and independent of the
//! order in which versions are probed.  It is what tests, benches and demos use.
//!
//! [`RandomCheck`] (feature `stochastic`) draws from a seeded `StdRng` instead; its outcomes
//! depend on probe order.

use std::collections::BTreeMap;
use std::convert::Infallible;

use crate::runner::Probe;

/// FNV-1a over the name, finished with SplitMix64 for diffusion.  Not cryptographic.
#[must_use]
pub fn stable_hash64(seed: u64, s: &str) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for b in s.as_bytes() {
        h ^= u64::from(*b);
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    splitmix64(seed ^ h)
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Uniform in `[0, 1)` from the top 53 bits.
fn unit_f64(x: u64) -> f64 {
    (x >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}

/// Per-version pass rates; versions without a rate never pass.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PassRates {
    rates: BTreeMap<String, f64>,
}

impl PassRates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, version: impl Into<String>, rate: f64) -> Self {
        self.rates.insert(version.into(), rate.clamp(0.0, 1.0));
        self
    }

    /// `before` up to and including `versions[change_index]`, `after` from there on.
    pub fn step<V: AsRef<str>>(versions: &[V], change_index: usize, before: f64, after: f64) -> Self {
        versions
            .iter()
            .enumerate()
            .fold(Self::new(), |acc, (i, v)| {
                acc.with_rate(v.as_ref(), if i <= change_index { before } else { after })
            })
    }

    pub fn rate(&self, version: &str) -> f64 {
        self.rates.get(version).copied().unwrap_or(0.0)
    }
}

/// Deterministic flaky check with per-version pass rates.
#[derive(Debug, Clone)]
pub struct SimulatedCheck {
    seed: u64,
    rates: PassRates,
    draws: BTreeMap<String, u64>,
    setups: u64,
    tests: u64,
}

impl SimulatedCheck {
    pub fn new(seed: u64, rates: PassRates) -> Self {
        Self {
            seed,
            rates,
            draws: BTreeMap::new(),
            setups: 0,
            tests: 0,
        }
    }

    /// Next outcome for `version`.
    pub fn draw(&mut self, version: &str) -> bool {
        let n = self.draws.entry(version.to_string()).or_insert(0);
        let u = unit_f64(stable_hash64(self.seed ^ *n, version));
        *n += 1;
        self.tests += 1;
        u < self.rates.rate(version)
    }

    pub fn rates(&self) -> &PassRates {
        &self.rates
    }

    /// Setup calls seen so far.
    pub fn setups(&self) -> u64 {
        self.setups
    }

    /// Test calls seen so far.
    pub fn tests(&self) -> u64 {
        self.tests
    }
}

impl<V: AsRef<str>> Probe<V> for SimulatedCheck {
    type Error = Infallible;

    fn setup(&mut self, _version: &V) -> Result<(), Infallible> {
        self.setups += 1;
        Ok(())
    }

    fn test(&mut self, version: &V) -> Result<bool, Infallible> {
        Ok(self.draw(version.as_ref()))
    }
}

/// Flaky check drawing from a seeded RNG.
#[cfg(feature = "stochastic")]
#[derive(Debug, Clone)]
pub struct RandomCheck {
    rng: rand::rngs::StdRng,
    rates: PassRates,
}

#[cfg(feature = "stochastic")]
impl RandomCheck {
    pub fn with_seed(seed: u64, rates: PassRates) -> Self {
        use rand::SeedableRng;
        Self {
            rng: rand::rngs::StdRng::seed_from_u64(seed),
            rates,
        }
    }

    pub fn draw(&mut self, version: &str) -> bool {
        use rand::Rng;
        self.rng.gen::<f64>() < self.rates.rate(version)
    }
}

#[cfg(feature = "stochastic")]
impl<V: AsRef<str>> Probe<V> for RandomCheck {
    type Error = Infallible;

    fn test(&mut self, version: &V) -> Result<bool, Infallible> {
        Ok(self.draw(version.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_hash_is_stable() {
        assert_eq!(stable_hash64(0, "a"), stable_hash64(0, "a"));
        assert_ne!(stable_hash64(0, "a"), stable_hash64(1, "a"));
        assert_ne!(stable_hash64(0, "a"), stable_hash64(0, "b"));
    }

    #[test]
    fn draws_are_reproducible_and_order_independent() {
        let rates = PassRates::new().with_rate("x", 0.5).with_rate("y", 0.5);
        let mut a = SimulatedCheck::new(7, rates.clone());
        let mut b = SimulatedCheck::new(7, rates);
        let xs: Vec<bool> = (0..50).map(|_| a.draw("x")).collect();
        let _ = (0..13).map(|_| b.draw("y")).count();
        let ys: Vec<bool> = (0..50).map(|_| b.draw("x")).collect();
        assert_eq!(xs, ys);
        assert_eq!(b.tests(), 63);
    }

    #[test]
    fn empirical_rate_tracks_configured_rate() {
        let mut sim = SimulatedCheck::new(3, PassRates::new().with_rate("v", 0.3));
        let n = 20_000;
        let passes = (0..n).filter(|_| sim.draw("v")).count();
        let rate = passes as f64 / n as f64;
        assert!((rate - 0.3).abs() < 0.02, "rate={rate}");
    }

    #[test]
    fn extreme_rates_are_exact() {
        let mut sim = SimulatedCheck::new(
            1,
            PassRates::new().with_rate("never", 0.0).with_rate("always", 1.0),
        );
        assert!((0..200).all(|_| !sim.draw("never")));
        assert!((0..200).all(|_| sim.draw("always")));
        assert!(!sim.draw("unknown"));
    }

    #[test]
    fn step_rates_split_at_change() {
        let r = PassRates::step(&["a", "b", "c", "d"], 1, 0.9, 0.1);
        assert_eq!(r.rate("a"), 0.9);
        assert_eq!(r.rate("b"), 0.9);
        assert_eq!(r.rate("c"), 0.1);
        assert_eq!(r.rate("d"), 0.1);
    }

    #[cfg(feature = "stochastic")]
    #[test]
    fn random_check_is_seeded() {
        let rates = PassRates::new().with_rate("v", 0.5);
        let mut a = RandomCheck::with_seed(9, rates.clone());
        let mut b = RandomCheck::with_seed(9, rates);
        let xs: Vec<bool> = (0..64).map(|_| a.draw("v")).collect();
        let ys: Vec<bool> = (0..64).map(|_| b.draw("v")).collect();
        assert_eq!(xs, ys);
    }
}
