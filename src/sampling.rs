use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of independent uniform draws in `[0, 1)`.
pub trait UnitDraw {
    fn draw(&mut self) -> f64;
}

/// [`UnitDraw`] backed by a `rand` generator.
#[derive(Debug, Clone)]
pub struct RngDraw<R>(R);

impl<R: Rng> RngDraw<R> {
    pub fn new(rng: R) -> Self {
        Self(rng)
    }
}

impl RngDraw<StdRng> {
    /// Seeded generator when `seed` is given, otherwise seeded from the OS
    /// once for the run.
    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self(StdRng::seed_from_u64(seed)),
            None => Self(StdRng::from_entropy()),
        }
    }
}

impl<R: Rng> UnitDraw for RngDraw<R> {
    fn draw(&mut self) -> f64 {
        self.0.r#gen::<f64>()
    }
}

/// Bernoulli gate: every record gets its own draw and is kept when the draw
/// is at or below the rate. The kept count is only expected to be
/// `rate * n`; there is no floor or ceiling.
#[derive(Debug, Clone)]
pub struct BernoulliSampler<D> {
    rate: f64,
    draws: D,
}

impl<D: UnitDraw> BernoulliSampler<D> {
    pub fn new(rate: f64, draws: D) -> Self {
        Self { rate, draws }
    }

    pub fn keep(&mut self) -> bool {
        self.draws.draw() <= self.rate
    }
}
