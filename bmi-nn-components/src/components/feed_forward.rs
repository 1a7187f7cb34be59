//! Multi-layer feed-forward network
//!
//! A stack of dense layers mapping `input_size` values to `output_size` values through
//! each of the hidden layer sizes in turn. Weights and biases are drawn uniformly from
//! $[-1/\sqrt{n_{in}}, 1/\sqrt{n_{in}}]$ where $n_{in}$ is the network input size, using a
//! seeded generator so a given configuration always produces the same network.
//!
//! The forward pass computes $x \cdot W_i + b_i$ for every layer and applies the optional
//! activation to the final result.

use bmi_nn_core::errors::{BmiError, BmiResult};
use ndarray::{Array1, Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Activation applied to the network output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Sigmoid,
    Tanh,
}

impl Activation {
    pub fn apply(&self, x: f32) -> f32 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Tanh => x.tanh(),
        }
    }
}

#[derive(Debug, Clone)]
struct Layer {
    weights: Array2<f32>,
    bias: Array1<f32>,
}

impl Layer {
    fn random<R: Rng + ?Sized>(rng: &mut R, n_in: usize, n_out: usize, bound: f32) -> Self {
        Self {
            weights: Array2::from_shape_fn((n_in, n_out), |_| rng.gen_range(-bound..=bound)),
            bias: Array1::from_shape_fn(n_out, |_| rng.gen_range(-bound..=bound)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedForward {
    layers: Vec<Layer>,
    activation: Option<Activation>,
}

impl FeedForward {
    /// Build a randomly initialised network
    ///
    /// # Errors
    ///
    /// Returns [`BmiError::Config`] if any layer size is zero.
    pub fn new(
        input_size: usize,
        hidden_size: &[usize],
        output_size: usize,
        activation: Option<Activation>,
        seed: u64,
    ) -> BmiResult<Self> {
        let sizes: Vec<usize> = std::iter::once(input_size)
            .chain(hidden_size.iter().copied())
            .chain(std::iter::once(output_size))
            .collect();
        if sizes.contains(&0) {
            return Err(BmiError::Config(format!(
                "network layer sizes must be non-zero, got {:?}",
                sizes
            )));
        }

        let bound = 1.0 / (input_size as f32).sqrt();
        let mut rng = StdRng::seed_from_u64(seed);
        let layers = sizes
            .windows(2)
            .map(|pair| Layer::random(&mut rng, pair[0], pair[1], bound))
            .collect();

        Ok(Self { layers, activation })
    }

    pub fn from_config(config: &Config) -> BmiResult<Self> {
        Self::new(
            config.input_size,
            &config.hidden_size,
            config.output_size,
            config.activation,
            config.seed,
        )
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.weights.nrows())
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, |l| l.bias.len())
    }

    /// Number of dense layers, including the output layer
    pub fn n_layers(&self) -> usize {
        self.layers.len()
    }

    /// Run a batch of rows through the network
    ///
    /// `input` has one row per sample and `input_size` columns. The result has the same
    /// number of rows and `output_size` columns.
    pub fn forward(&self, input: ArrayView2<f32>) -> BmiResult<Array2<f32>> {
        if input.ncols() != self.input_size() {
            return Err(BmiError::Error(format!(
                "network expects {} inputs per row, got {}",
                self.input_size(),
                input.ncols()
            )));
        }

        let mut result = input.to_owned();
        for layer in &self.layers {
            result = result.dot(&layer.weights) + &layer.bias;
        }
        if let Some(activation) = self.activation {
            result.mapv_inplace(|x| activation.apply(x));
        }
        Ok(result)
    }
}
