//! Per-ring confidence scoring.
//!
//! Generalizes the `RiskBreakdown::calculate_total` pattern (named
//! components combined with fixed weights and clamped at the end) to the
//! three-component blend (temporal, amount uniformity, topology tightness)
//! every detector's ring metadata already carries.

use crate::config::Config;
use crate::model::{PatternType, Ring};

pub struct ConfidenceEngine;

impl ConfidenceEngine {
    /// Fill in `metadata.confidence` for every ring in place.
    pub fn score_all(rings: &mut [Ring], config: &Config) {
        for ring in rings.iter_mut() {
            ring.metadata.confidence = Self::score(ring, config);
        }
    }

    fn score(ring: &Ring, config: &Config) -> f64 {
        let cap_hours = match ring.pattern_type {
            PatternType::Cycle => config.cycle_time_span_hours,
            PatternType::Smurfing => config.smurf_window_hours,
            PatternType::Shell => config.shell_time_span_hours,
        };
        let temporal = (1.0 - ring.metadata.time_span_hours / cap_hours).clamp(0.0, 1.0);

        let amount = match ring.pattern_type {
            PatternType::Cycle => {
                (1.0 - ((ring.metadata.amount_ratio - 1.0) / config.cycle_amount_ratio).min(1.0)).clamp(0.0, 1.0)
            }
            PatternType::Shell => {
                (1.0 - ((ring.metadata.amount_ratio - 1.0) / config.shell_amount_ratio).min(1.0)).clamp(0.0, 1.0)
            }
            PatternType::Smurfing => {
                let cv = ring.metadata.amount_cv.unwrap_or(0.0);
                (1.0 - cv.min(1.0)).clamp(0.0, 1.0)
            }
        };

        let tightness = ring.metadata.topology_tightness.clamp(0.0, 1.0);

        (0.4 * temporal + 0.3 * amount + 0.3 * tightness).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RingMetadata;

    fn ring(pattern: PatternType, time_span_hours: f64, amount_ratio: f64, amount_cv: Option<f64>, topology_tightness: f64) -> Ring {
        Ring {
            ring_id: String::new(),
            pattern_type: pattern,
            members: vec!["A".into(), "B".into(), "C".into()],
            evidence_edges: vec![],
            metadata: RingMetadata {
                time_span_hours,
                amount_ratio,
                amount_cv,
                topology_tightness,
                confidence: 0.0,
            },
        }
    }

    #[test]
    fn tight_instant_cycle_has_maximum_confidence() {
        let r = ring(PatternType::Cycle, 0.0, 1.0, None, 1.0);
        let score = ConfidenceEngine::score(&r, &Config::default());
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn smurfing_confidence_uses_amount_cv() {
        let r = ring(PatternType::Smurfing, 0.0, 1.0, Some(0.5), 1.0);
        let score = ConfidenceEngine::score(&r, &Config::default());
        assert!((score - (0.4 + 0.3 * 0.5 + 0.3)).abs() < 1e-9);
    }

    #[test]
    fn full_time_span_zeroes_temporal_component() {
        let r = ring(PatternType::Cycle, 72.0, 1.0, None, 1.0);
        let score = ConfidenceEngine::score(&r, &Config::default());
        assert!((score - 0.6).abs() < 1e-9);
    }
}
