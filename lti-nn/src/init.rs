//! Parameter initialization

use ndarray::{Array, Dimension, ShapeBuilder};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::config::LtiConfig;

/// Draws parameter arrays as zeros or as `N(0, 1) / order`
pub(crate) struct Initializer {
    rng: Option<StdRng>,
    scale: f32,
}

impl Initializer {
    pub(crate) fn from_config(config: &LtiConfig) -> Self {
        let rng = if config.zero_init {
            None
        } else {
            Some(match config.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            })
        };

        Self {
            rng,
            scale: 1.0 / config.order.max(1) as f32,
        }
    }

    pub(crate) fn array<Sh, D>(&mut self, shape: Sh) -> Array<f32, D>
    where
        Sh: ShapeBuilder<Dim = D>,
        D: Dimension,
    {
        let scale = self.scale;
        match self.rng.as_mut() {
            None => Array::zeros(shape),
            Some(rng) => Array::from_shape_fn(shape, |_| {
                let sample: f32 = rng.sample(StandardNormal);
                sample * scale
            }),
        }
    }
}
