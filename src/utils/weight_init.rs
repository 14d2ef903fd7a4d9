//! Weight-initialization strategies
//!
//! One strategy is selected per network and consulted once per parameter when
//! the chain is joined. Strategies that scale with layer shape receive the
//! fan-in and fan-out of the layer being initialized: for dense layers these
//! are the previous and current layer sizes, for convolutional layers
//! `channels * filter_size^2` and `filters * filter_size^2`.

use crate::error::NetError;
use crate::utils::rng::SimpleRng;

/// Weight-initialization selector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightInit {
    /// Uniform in `[-limit, limit]`.
    Uniform { limit: f64 },
    /// Normal with the given mean and standard deviation.
    Gaussian { mean: f64, std_dev: f64 },
    /// Uniform in `[-sqrt(3/fan_in), sqrt(3/fan_in)]`.
    LecunUniform,
    /// Normal with standard deviation `sqrt(1/fan_in)`.
    LecunNormal,
    /// Uniform in `[-sqrt(6/(fan_in+fan_out)), sqrt(6/(fan_in+fan_out))]`.
    XavierUniform,
    /// Normal with standard deviation `sqrt(2/(fan_in+fan_out))`.
    XavierNormal,
}

impl Default for WeightInit {
    fn default() -> Self {
        WeightInit::Uniform { limit: 0.1 }
    }
}

impl WeightInit {
    /// Parse a strategy name, using default coefficients for the
    /// parameterized variants (uniform limit 0.1, gaussian mean 0 and
    /// standard deviation 0.05).
    pub fn from_name(name: &str) -> Result<Self, NetError> {
        match name.to_lowercase().as_str() {
            "uniform" => Ok(WeightInit::Uniform { limit: 0.1 }),
            "gaussian" => Ok(WeightInit::Gaussian {
                mean: 0.0,
                std_dev: 0.05,
            }),
            "lecun_uniform" | "lecununiform" => Ok(WeightInit::LecunUniform),
            "lecun_normal" | "lecunnormal" => Ok(WeightInit::LecunNormal),
            "xavier_uniform" | "xavieruniform" => Ok(WeightInit::XavierUniform),
            "xavier_normal" | "xaviernormal" => Ok(WeightInit::XavierNormal),
            other => Err(NetError::UnknownWeightInit(other.to_string())),
        }
    }

    /// Draw one weight for a layer with the given fan-in and fan-out.
    pub fn sample(&self, fan_in: usize, fan_out: usize, rng: &mut SimpleRng) -> f64 {
        let fan_in = fan_in.max(1) as f64;
        let fan_out = fan_out.max(1) as f64;

        match *self {
            WeightInit::Uniform { limit } => rng.gen_range_f64(-limit, limit),
            WeightInit::Gaussian { mean, std_dev } => mean + std_dev * rng.next_gaussian(),
            WeightInit::LecunUniform => {
                let limit = (3.0 / fan_in).sqrt();
                rng.gen_range_f64(-limit, limit)
            }
            WeightInit::LecunNormal => (1.0 / fan_in).sqrt() * rng.next_gaussian(),
            WeightInit::XavierUniform => {
                let limit = (6.0 / (fan_in + fan_out)).sqrt();
                rng.gen_range_f64(-limit, limit)
            }
            WeightInit::XavierNormal => (2.0 / (fan_in + fan_out)).sqrt() * rng.next_gaussian(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_bounds() {
        let mut rng = SimpleRng::new(42);
        let init = WeightInit::Uniform { limit: 0.1 };

        for _ in 0..1000 {
            let w = init.sample(10, 5, &mut rng);
            assert!(w >= -0.1 && w < 0.1, "weight {} outside [-0.1, 0.1)", w);
        }
    }

    #[test]
    fn test_lecun_uniform_bounds() {
        let mut rng = SimpleRng::new(42);
        let limit = (3.0f64 / 100.0).sqrt();

        for _ in 0..1000 {
            let w = WeightInit::LecunUniform.sample(100, 50, &mut rng);
            assert!(w >= -limit && w < limit);
        }
    }

    #[test]
    fn test_xavier_uniform_bounds() {
        let mut rng = SimpleRng::new(42);
        let limit = (6.0f64 / 150.0).sqrt();

        for _ in 0..1000 {
            let w = WeightInit::XavierUniform.sample(100, 50, &mut rng);
            assert!(w >= -limit && w < limit);
        }
    }

    #[test]
    fn test_deterministic_given_seed() {
        let mut rng1 = SimpleRng::new(7);
        let mut rng2 = SimpleRng::new(7);
        let init = WeightInit::XavierNormal;

        for _ in 0..100 {
            assert_eq!(init.sample(20, 10, &mut rng1), init.sample(20, 10, &mut rng2));
        }
    }

    #[test]
    fn test_from_name() {
        assert_eq!(
            WeightInit::from_name("uniform").unwrap(),
            WeightInit::Uniform { limit: 0.1 }
        );
        assert_eq!(
            WeightInit::from_name("xavier_normal").unwrap(),
            WeightInit::XavierNormal
        );
        assert!(WeightInit::from_name("orthogonal").is_err());
    }
}
