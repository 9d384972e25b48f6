use log::{debug, trace};
use rand::prelude::*;
use rand::rngs::StdRng;

/// Source of candidate point indices for consensus trials.
pub trait Sampler {
    fn sample(&mut self) -> usize;
}

/// Uniform indices in `[0, count)`.
#[derive(Debug, Clone)]
pub struct UniformSampler {
    rng: StdRng,
    count: usize,
}

impl UniformSampler {
    /// Uses a random (non-deterministic) seed. For reproducible results, use
    /// [`UniformSampler::seeded`] instead.
    pub fn new(count: usize) -> Self {
        Self::seeded(count, rand::thread_rng().next_u64())
    }

    pub fn seeded(count: usize, seed: u64) -> Self {
        assert!(count > 0, "cannot sample from an empty set");
        Self {
            rng: StdRng::seed_from_u64(seed),
            count,
        }
    }
}

impl Sampler for UniformSampler {
    fn sample(&mut self) -> usize {
        self.rng.gen_range(0..self.count)
    }
}

/// Candidate model fitted from a sample.
pub trait Coefficients {
    /// Higher is better.
    fn fitness(&self) -> f32;

    /// Indices of every point within `tolerance` of the model.
    fn inliers(&self, tolerance: f32) -> Vec<usize>;

    fn is_in(&self, p: [f32; 3], tolerance: f32) -> bool;
}

/// A model family the consensus engine can fit.
pub trait Model {
    type Coefficients: Coefficients;

    /// `(min, max)` sample count per trial.
    fn num_samples(&self) -> (usize, usize);

    /// Fits coefficients to the sampled points; `None` for a degenerate sample.
    fn fit(&self, samples: &[usize]) -> Option<Self::Coefficients>;
}

/// Random sample consensus over any [`Model`].
///
/// Each trial draws `min` samples, fits, and keeps the coefficients with the
/// highest fitness. Ties keep the earliest fit; degenerate samples are skipped.
pub struct ConsensusEngine<M: Model, S> {
    model: M,
    sampler: S,
    best: Option<M::Coefficients>,
}

impl<M: Model, S: Sampler> ConsensusEngine<M, S> {
    pub fn new(model: M, sampler: S) -> Self {
        Self {
            model,
            sampler,
            best: None,
        }
    }

    /// Runs `trials` trials and reports whether any produced a fit.
    pub fn compute(&mut self, trials: usize) -> bool {
        self.compute_until(trials, || false)
    }

    /// Like [`compute`](Self::compute), checking `cancel` before each trial.
    /// A cancelled run keeps the best fit found so far.
    pub fn compute_until<C>(&mut self, trials: usize, mut cancel: C) -> bool
    where
        C: FnMut() -> bool,
    {
        self.best = None;
        let (min_samples, _) = self.model.num_samples();
        let mut samples = vec![0usize; min_samples];
        let mut best_fitness = f32::NEG_INFINITY;
        let mut fitted = 0;

        for trial in 0..trials {
            if cancel() {
                debug!("consensus cancelled after {} of {} trials", trial, trials);
                break;
            }
            for s in samples.iter_mut() {
                *s = self.sampler.sample();
            }
            let Some(coefficients) = self.model.fit(&samples) else {
                continue;
            };
            fitted += 1;

            let fitness = coefficients.fitness();
            trace!("trial {}: fitness {}", trial, fitness);
            if fitness > best_fitness {
                best_fitness = fitness;
                self.best = Some(coefficients);
            }
        }

        debug!(
            "consensus: {} of {} trials fitted, best fitness {}",
            fitted,
            trials,
            if self.best.is_some() { best_fitness } else { 0.0 }
        );
        self.best.is_some()
    }

    pub fn coefficients(&self) -> Option<&M::Coefficients> {
        self.best.as_ref()
    }

    pub fn into_coefficients(self) -> Option<M::Coefficients> {
        self.best
    }
}
