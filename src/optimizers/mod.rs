//! Gradient-descent update rules
//!
//! Seven rules share one contract: given a current parameter value and a
//! regularized gradient, return the updated value, possibly reading and
//! writing per-parameter auxiliary state ([`ParamState`]) owned by the unit
//! (neuron or filter) being updated. All rules are deterministic given their
//! state and allocate nothing per call.
//!
//! One rule is selected per network. Layers match on the selector once per
//! `apply_delta_weights` pass and run a monomorphized update loop, so the hot
//! loop never pays for indirect dispatch.
//!
//! # Sign convention
//!
//! Output-layer errors are computed as `expected - activation`, so every rule
//! ADDS its step: `vanilla` is `value + learning_rate * gradient`.

pub mod adadelta;
pub mod adagrad;
pub mod adam;
pub mod gain;
pub mod momentum;
pub mod rmsprop;
pub mod vanilla;

use crate::error::NetError;

/// Update-rule selector, chosen once per network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateRule {
    /// Plain gradient step.
    Vanilla,
    /// Per-parameter gain multiplier grown on stable gradient signs.
    Gain,
    /// Division by the root of the running sum of squared gradients.
    Adagrad,
    /// Division by the root of a decayed average of squared gradients.
    Rmsprop,
    /// Bias-corrected first/second moment estimates.
    Adam,
    /// Self-scaled step from the ratio of two decayed averages.
    Adadelta,
    /// Velocity accumulator.
    Momentum,
}

impl UpdateRule {
    /// Parse a rule name.
    pub fn from_name(name: &str) -> Result<Self, NetError> {
        match name.to_lowercase().as_str() {
            "vanilla" | "vanilla_sgd" | "sgd" => Ok(UpdateRule::Vanilla),
            "gain" => Ok(UpdateRule::Gain),
            "adagrad" => Ok(UpdateRule::Adagrad),
            "rmsprop" => Ok(UpdateRule::Rmsprop),
            "adam" => Ok(UpdateRule::Adam),
            "adadelta" => Ok(UpdateRule::Adadelta),
            "momentum" => Ok(UpdateRule::Momentum),
            other => Err(NetError::UnknownUpdateRule(other.to_string())),
        }
    }

    /// Canonical name of the rule.
    pub fn name(&self) -> &'static str {
        match self {
            UpdateRule::Vanilla => "vanilla",
            UpdateRule::Gain => "gain",
            UpdateRule::Adagrad => "adagrad",
            UpdateRule::Rmsprop => "rmsprop",
            UpdateRule::Adam => "adam",
            UpdateRule::Adadelta => "adadelta",
            UpdateRule::Momentum => "momentum",
        }
    }
}

/// Per-unit optimizer auxiliary state.
///
/// One instance lives in every neuron and filter. Each vector is sized to the
/// unit's weight count (the filter's flattened tensor), with a separate
/// scalar slot for the bias; only the vectors the selected rule touches are
/// allocated, the rest stay empty. A freshly joined network therefore starts
/// with every cache at its zero/identity form, and instances never share
/// optimizer history.
#[derive(Debug, Clone, Default)]
pub struct ParamState {
    /// Per-weight gain multipliers (gain rule), initialized to 1.
    pub gains: Vec<f64>,
    /// Bias gain multiplier.
    pub bias_gain: f64,
    /// Last nonzero gradient per weight (gain rule).
    pub prev_gradients: Vec<f64>,
    /// Last nonzero bias gradient.
    pub bias_prev_gradient: f64,
    /// Squared-gradient caches (adagrad, rmsprop, adadelta).
    pub caches: Vec<f64>,
    /// Bias squared-gradient cache.
    pub bias_cache: f64,
    /// Squared-update caches (adadelta only).
    pub update_caches: Vec<f64>,
    /// Bias squared-update cache.
    pub bias_update_cache: f64,
    /// First-moment estimates (adam).
    pub m: Vec<f64>,
    /// Bias first-moment estimate.
    pub bias_m: f64,
    /// Second-moment estimates (adam).
    pub v: Vec<f64>,
    /// Bias second-moment estimate.
    pub bias_v: f64,
    /// Velocity accumulators (momentum).
    pub velocities: Vec<f64>,
    /// Bias velocity.
    pub bias_velocity: f64,
}

impl ParamState {
    /// Allocate the state the given rule needs for `len` weights plus a bias.
    pub fn for_rule(rule: UpdateRule, len: usize) -> Self {
        let mut state = ParamState {
            bias_gain: 1.0,
            ..ParamState::default()
        };

        match rule {
            UpdateRule::Vanilla => {}
            UpdateRule::Gain => {
                state.gains = vec![1.0; len];
                state.prev_gradients = vec![0.0; len];
            }
            UpdateRule::Adagrad | UpdateRule::Rmsprop => state.caches = vec![0.0; len],
            UpdateRule::Adadelta => {
                state.caches = vec![0.0; len];
                state.update_caches = vec![0.0; len];
            }
            UpdateRule::Adam => {
                state.m = vec![0.0; len];
                state.v = vec![0.0; len];
            }
            UpdateRule::Momentum => state.velocities = vec![0.0; len],
        }

        state
    }
}
