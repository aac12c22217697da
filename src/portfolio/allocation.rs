//! Allocation weighting methods.
//!
//! Each method turns per-strategy metrics into fractions summing to 1. Any
//! degenerate total (all zero scores) falls back to equal weighting.

use crate::utils::decimal::clamp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Floor applied to drawdown before inverting it.
const MIN_DRAWDOWN_FOR_WEIGHTING: Decimal = dec!(0.01);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMethod {
    Equal,
    Sharpe,
    Health,
    Roi,
    Composite,
    RiskAdjusted,
}

impl AllocationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationMethod::Equal => "equal",
            AllocationMethod::Sharpe => "sharpe",
            AllocationMethod::Health => "health",
            AllocationMethod::Roi => "roi",
            AllocationMethod::Composite => "composite",
            AllocationMethod::RiskAdjusted => "risk_adjusted",
        }
    }

    /// Parse a method name, falling back to `Equal` for anything unknown.
    pub fn parse_lossy(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            warn!(method = %name, "Unknown allocation method, using equal weighting");
            AllocationMethod::Equal
        })
    }
}

impl FromStr for AllocationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equal" => Ok(AllocationMethod::Equal),
            "sharpe" => Ok(AllocationMethod::Sharpe),
            "health" => Ok(AllocationMethod::Health),
            "roi" => Ok(AllocationMethod::Roi),
            "composite" => Ok(AllocationMethod::Composite),
            "risk_adjusted" => Ok(AllocationMethod::RiskAdjusted),
            other => Err(format!("unknown allocation method: {other}")),
        }
    }
}

impl fmt::Display for AllocationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Blend weights for the composite method.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeWeights {
    pub sharpe: Decimal,
    pub roi: Decimal,
    pub health: Decimal,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            sharpe: dec!(0.4),
            roi: dec!(0.3),
            health: dec!(0.3),
        }
    }
}

impl CompositeWeights {
    /// Build from a loose key map; missing keys keep their defaults.
    pub fn from_map(map: &HashMap<String, Decimal>) -> Self {
        let defaults = Self::default();
        Self {
            sharpe: map.get("sharpe").copied().unwrap_or(defaults.sharpe),
            roi: map.get("roi").copied().unwrap_or(defaults.roi),
            health: map.get("health").copied().unwrap_or(defaults.health),
        }
    }
}

/// The metrics a weighting method looks at for one strategy.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreInputs {
    pub sharpe: Option<Decimal>,
    pub roi: Decimal,
    pub health: Decimal,
    pub max_drawdown: Decimal,
}

/// Fractions (summing to 1) for each input, in input order.
pub fn raw_weights(
    method: AllocationMethod,
    inputs: &[ScoreInputs],
    weights: &CompositeWeights,
) -> Vec<Decimal> {
    if inputs.is_empty() {
        return Vec::new();
    }

    match method {
        AllocationMethod::Equal => equal(inputs.len()),
        AllocationMethod::Sharpe => proportional(
            inputs
                .iter()
                .map(|i| i.sharpe.unwrap_or_default().max(Decimal::ZERO))
                .collect(),
        ),
        AllocationMethod::Health => {
            proportional(inputs.iter().map(|i| i.health.max(Decimal::ZERO)).collect())
        }
        AllocationMethod::Roi => proportional(
            inputs
                .iter()
                .map(|i| (i.roi + Decimal::ONE).max(Decimal::ZERO))
                .collect(),
        ),
        AllocationMethod::Composite => composite(inputs, weights),
        AllocationMethod::RiskAdjusted => proportional(
            inputs
                .iter()
                .map(|i| Decimal::ONE / i.max_drawdown.max(MIN_DRAWDOWN_FOR_WEIGHTING))
                .collect(),
        ),
    }
}

fn equal(n: usize) -> Vec<Decimal> {
    let share = Decimal::ONE / Decimal::from(n);
    vec![share; n]
}

fn proportional(scores: Vec<Decimal>) -> Vec<Decimal> {
    let total: Decimal = scores.iter().sum();
    if total <= Decimal::ZERO {
        return equal(scores.len());
    }
    scores.into_iter().map(|s| s / total).collect()
}

/// Min-max scale to `[0, 1]`; a flat series scores `1/N` everywhere.
fn min_max_normalize(values: &[Decimal]) -> Vec<Decimal> {
    let (Some(min), Some(max)) = (values.iter().min(), values.iter().max()) else {
        return Vec::new();
    };
    let range = *max - *min;
    if range.is_zero() {
        return equal(values.len());
    }
    values.iter().map(|v| (*v - *min) / range).collect()
}

fn composite(inputs: &[ScoreInputs], weights: &CompositeWeights) -> Vec<Decimal> {
    let sharpe: Vec<Decimal> = inputs.iter().map(|i| i.sharpe.unwrap_or_default()).collect();
    let roi: Vec<Decimal> = inputs.iter().map(|i| i.roi + Decimal::ONE).collect();
    let health: Vec<Decimal> = inputs.iter().map(|i| i.health).collect();

    let sharpe = min_max_normalize(&sharpe);
    let roi = min_max_normalize(&roi);
    let health = min_max_normalize(&health);

    let scores = (0..inputs.len())
        .map(|i| weights.sharpe * sharpe[i] + weights.roi * roi[i] + weights.health * health[i])
        .collect();

    proportional(scores)
}

/// Clamp each fraction into `[min, max]` then rescale to sum to 1.
///
/// When every fraction clamps to zero the clamped values are returned as-is.
pub fn apply_bounds(fractions: Vec<Decimal>, min: Decimal, max: Decimal) -> Vec<Decimal> {
    let clamped: Vec<Decimal> = fractions.into_iter().map(|f| clamp(f, min, max)).collect();
    let total: Decimal = clamped.iter().sum();
    if total <= Decimal::ZERO {
        return clamped;
    }
    clamped.into_iter().map(|f| f / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(sharpe: Option<Decimal>, roi: Decimal, health: Decimal, dd: Decimal) -> ScoreInputs {
        ScoreInputs {
            sharpe,
            roi,
            health,
            max_drawdown: dd,
        }
    }

    fn assert_close(a: Decimal, b: Decimal) {
        assert!((a - b).abs() < dec!(0.000001), "{a} != {b}");
    }

    #[test]
    fn test_parse_lossy() {
        assert_eq!(AllocationMethod::parse_lossy("sharpe"), AllocationMethod::Sharpe);
        assert_eq!(AllocationMethod::parse_lossy("Risk_Adjusted"), AllocationMethod::RiskAdjusted);
        assert_eq!(AllocationMethod::parse_lossy("unknown_xyz"), AllocationMethod::Equal);
        assert!("unknown_xyz".parse::<AllocationMethod>().is_err());
    }

    #[test]
    fn test_composite_weights_from_partial_map() {
        let mut map = HashMap::new();
        map.insert("sharpe".to_string(), dec!(0.8));
        let weights = CompositeWeights::from_map(&map);
        assert_eq!(weights.sharpe, dec!(0.8));
        assert_eq!(weights.roi, dec!(0.3));
        assert_eq!(weights.health, dec!(0.3));
    }

    #[test]
    fn test_sharpe_proportional_ignores_negative() {
        let set = [
            inputs(Some(dec!(3)), Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
            inputs(Some(dec!(1)), Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
            inputs(Some(dec!(-2)), Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
        ];
        let w = raw_weights(AllocationMethod::Sharpe, &set, &CompositeWeights::default());
        assert_eq!(w, vec![dec!(0.75), dec!(0.25), Decimal::ZERO]);
    }

    #[test]
    fn test_zero_total_falls_back_to_equal() {
        let set = [
            inputs(None, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
            inputs(Some(dec!(-1)), Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
        ];
        let w = raw_weights(AllocationMethod::Sharpe, &set, &CompositeWeights::default());
        assert_eq!(w, vec![dec!(0.5), dec!(0.5)]);

        let w = raw_weights(AllocationMethod::Health, &set, &CompositeWeights::default());
        assert_eq!(w, vec![dec!(0.5), dec!(0.5)]);
    }

    #[test]
    fn test_roi_is_shifted_by_one() {
        let set = [
            inputs(None, dec!(0.5), Decimal::ZERO, Decimal::ZERO),
            inputs(None, dec!(-0.5), Decimal::ZERO, Decimal::ZERO),
        ];
        let w = raw_weights(AllocationMethod::Roi, &set, &CompositeWeights::default());
        assert_eq!(w, vec![dec!(0.75), dec!(0.25)]);
    }

    #[test]
    fn test_risk_adjusted_floors_drawdown() {
        let set = [
            inputs(None, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
            inputs(None, Decimal::ZERO, Decimal::ZERO, dec!(0.03)),
        ];
        // inverses 100 and 33.33..
        let w = raw_weights(AllocationMethod::RiskAdjusted, &set, &CompositeWeights::default());
        assert_close(w[0], dec!(0.75));
        assert_close(w[1], dec!(0.25));
    }

    #[test]
    fn test_composite_flat_metrics_give_equal() {
        let set = [
            inputs(Some(dec!(1)), dec!(0.1), dec!(50), Decimal::ZERO),
            inputs(Some(dec!(1)), dec!(0.1), dec!(50), Decimal::ZERO),
        ];
        let w = raw_weights(AllocationMethod::Composite, &set, &CompositeWeights::default());
        assert_eq!(w, vec![dec!(0.5), dec!(0.5)]);
    }

    #[test]
    fn test_composite_prefers_best_on_all_metrics() {
        let set = [
            inputs(Some(dec!(2)), dec!(0.2), dec!(80), Decimal::ZERO),
            inputs(Some(dec!(1)), dec!(0.1), dec!(60), Decimal::ZERO),
            inputs(None, dec!(0.0), dec!(40), Decimal::ZERO),
        ];
        let w = raw_weights(AllocationMethod::Composite, &set, &CompositeWeights::default());
        // normalized scores: 1, 0.5, 0 across every metric
        assert_close(w[0], dec!(2) / dec!(3));
        assert_close(w[1], dec!(1) / dec!(3));
        assert_eq!(w[2], Decimal::ZERO);
    }

    #[test]
    fn test_apply_bounds_clamps_then_renormalizes() {
        let bounded = apply_bounds(vec![dec!(0.9), dec!(0.1), Decimal::ZERO], dec!(0.1), dec!(0.7));
        // clamped 0.7, 0.1, 0.1 => /0.9
        assert_close(bounded[0], dec!(0.7) / dec!(0.9));
        assert_close(bounded[1], dec!(0.1) / dec!(0.9));
        assert_close(bounded.iter().sum(), Decimal::ONE);
    }

    #[test]
    fn test_apply_bounds_zero_max_skips_renormalize() {
        let bounded = apply_bounds(vec![dec!(0.5), dec!(0.5)], Decimal::ZERO, Decimal::ZERO);
        assert_eq!(bounded, vec![Decimal::ZERO, Decimal::ZERO]);
    }
}
