use crate::fixed::{Fixed64, f64_to_fixed64};
use crate::rng::SimRng;
use serde::{Deserialize, Serialize};

/// Server-wide switches that shape production.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductionConfig {
    /// When set, produced items keep their prototype's default quality
    /// instead of inheriting the craft attempt's quality.
    pub disable_quality_calculation: bool,
    /// Probability in [0, 1] that a forensic test reports a wrong result.
    pub forensic_error_rate: f64,
    /// Seed for the production random source when the host has none.
    pub rng_seed: u64,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            disable_quality_calculation: false,
            forensic_error_rate: 0.05,
            rng_seed: 0,
        }
    }
}

impl ProductionConfig {
    /// The forensic error rate clamped to [0, 1] as fixed-point.
    pub fn forensic_error_rate(&self) -> Fixed64 {
        if !self.forensic_error_rate.is_finite() {
            return Fixed64::ZERO;
        }
        f64_to_fixed64(self.forensic_error_rate.clamp(0.0, 1.0))
    }

    /// A fresh random source seeded from `rng_seed`.
    pub fn rng(&self) -> SimRng {
        SimRng::new(self.rng_seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ProductionConfig::default();
        assert!(!config.disable_quality_calculation);
        assert_eq!(config.forensic_error_rate(), f64_to_fixed64(0.05));
    }

    #[test]
    fn error_rate_is_clamped() {
        let mut config = ProductionConfig {
            forensic_error_rate: 3.0,
            ..Default::default()
        };
        assert_eq!(config.forensic_error_rate(), Fixed64::from_num(1));
        config.forensic_error_rate = -1.0;
        assert_eq!(config.forensic_error_rate(), Fixed64::ZERO);
        config.forensic_error_rate = f64::NAN;
        assert_eq!(config.forensic_error_rate(), Fixed64::ZERO);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: ProductionConfig =
            serde_json::from_str(r#"{"disable_quality_calculation": true}"#).unwrap();
        assert!(config.disable_quality_calculation);
        assert_eq!(config.forensic_error_rate, 0.05);
        assert_eq!(config.rng_seed, 0);
    }
}
