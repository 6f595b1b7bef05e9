//! Top-level orchestration: ingest, graph, the three detectors, confidence,
//! density, scoring, and the final result. One call per invocation, no
//! shared state between calls.
//!
//! Follows the `TransactionValidator::validate`/`validate_batch`
//! orchestration shape (construct with a `Config`, run a fixed sequence of
//! named checks, return one result struct), with `tracing` instrumentation
//! actually wired into the entry point instead of only declared.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::confidence::ConfidenceEngine;
use crate::cycle::CycleDetector;
use crate::error::AnalysisError;
use crate::graph::GraphBuilder;
use crate::ingest;
use crate::model::{AnalysisResult, Ring, Summary};
use crate::scoring::ScoringEngine;
use crate::shell::ShellDetector;
use crate::smurf::SmurfDetector;

/// Owns a `Config` and runs the full pipeline for one batch of CSV text.
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new() -> Self {
        Self { config: Config::default() }
    }

    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    pub fn analyze(&self, csv_text: &str) -> Result<AnalysisResult, AnalysisError> {
        let start = Instant::now();

        let (transactions, diagnostics) = ingest::parse(csv_text, &self.config)?;
        if diagnostics.total_dropped() > 0 {
            warn!(dropped = diagnostics.total_dropped(), "ingest dropped malformed rows");
        }

        let graph = GraphBuilder::build(&transactions);
        info!(
            transaction_count = transactions.len(),
            account_count = graph.nodes.len(),
            "graph built"
        );

        let mut cycle_rings = CycleDetector::detect(&graph, &self.config);
        debug!(ring_count = cycle_rings.len(), pattern = "cycle", "detector complete");
        assign_ids(&mut cycle_rings, "CYC");

        let mut smurf_rings = SmurfDetector::detect(&graph, &self.config);
        debug!(ring_count = smurf_rings.len(), pattern = "smurfing", "detector complete");
        assign_ids(&mut smurf_rings, "SMR");

        let mut shell_rings = ShellDetector::detect(&graph, &self.config);
        debug!(ring_count = shell_rings.len(), pattern = "shell", "detector complete");
        assign_ids(&mut shell_rings, "SHL");

        let mut all_rings: Vec<Ring> = Vec::with_capacity(cycle_rings.len() + smurf_rings.len() + shell_rings.len());
        all_rings.extend(cycle_rings);
        all_rings.extend(smurf_rings);
        all_rings.extend(shell_rings);

        ConfidenceEngine::score_all(&mut all_rings, &self.config);

        let (suspicious_accounts, fraud_rings) = ScoringEngine::score(&graph, &all_rings, &self.config);

        let elapsed = start.elapsed().as_secs_f64();
        let processing_time_seconds = (elapsed * 10_000.0).round() / 10_000.0;
        if processing_time_seconds < 0.0 {
            return Err(AnalysisError::internal("pipeline", "elapsed time was negative"));
        }

        info!(
            processing_time_seconds,
            flagged = suspicious_accounts.len(),
            "analysis complete"
        );

        Ok(AnalysisResult {
            summary: Summary {
                total_accounts_analyzed: graph.nodes.len(),
                suspicious_accounts_flagged: suspicious_accounts.len(),
                fraud_rings_detected: fraud_rings.len(),
                processing_time_seconds,
            },
            suspicious_accounts,
            fraud_rings,
        })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn assign_ids(rings: &mut [Ring], prefix: &str) {
    for (i, ring) in rings.iter_mut().enumerate() {
        ring.ring_id = format!("RING_{prefix}_{:04}", i + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_a_pure_three_cycle() {
        let csv = "transaction_id,sender_id,receiver_id,amount,timestamp\n\
                   TX1,A,B,100,2025-01-01T10:00:00\n\
                   TX2,B,C,105,2025-01-01T12:00:00\n\
                   TX3,C,A,102,2025-01-01T14:00:00\n";
        let result = Pipeline::new().analyze(csv).unwrap();

        assert_eq!(result.fraud_rings.len(), 1);
        assert_eq!(result.fraud_rings[0].ring_id, "RING_CYC_0001");
        assert_eq!(result.fraud_rings[0].member_accounts, vec!["A".to_string(), "B".into(), "C".into()]);
        assert_eq!(result.suspicious_accounts.len(), 3);
        for finding in &result.suspicious_accounts {
            assert_eq!(finding.detected_patterns, vec!["cycle".to_string()]);
            assert!(finding.suspicion_score >= 40);
        }
        assert_eq!(result.summary.total_accounts_analyzed, 3);
        assert_eq!(result.summary.fraud_rings_detected, 1);
    }

    #[test]
    fn scenario_b_smurf_hub_below_threshold_is_not_flagged() {
        let mut csv = "transaction_id,sender_id,receiver_id,amount,timestamp\n".to_string();
        for i in 0..9 {
            csv.push_str(&format!("TX{i},H,R{i},100,2025-01-01T0{}:00:00\n", i % 10));
        }
        let result = Pipeline::new().analyze(&csv).unwrap();
        assert!(result.fraud_rings.is_empty());
        assert!(result.suspicious_accounts.iter().all(|f| f.account_id != "H"));
    }

    #[test]
    fn scenario_c_smurf_hub_at_threshold() {
        let mut csv = "transaction_id,sender_id,receiver_id,amount,timestamp\n".to_string();
        for i in 0..10 {
            csv.push_str(&format!("TX{i},H,R{i},100,2025-01-01T0{}:00:00\n", i % 10));
        }
        let result = Pipeline::new().analyze(&csv).unwrap();
        assert_eq!(result.fraud_rings.len(), 1);
        assert_eq!(result.fraud_rings[0].pattern_type, "smurfing");
        assert_eq!(result.fraud_rings[0].member_accounts.len(), 11);
        let hub = result.suspicious_accounts.iter().find(|f| f.account_id == "H").unwrap();
        assert!(hub.detected_patterns.contains(&"smurfing".to_string()));
    }

    #[test]
    fn scenario_d_shell_chain_length_four() {
        let csv = "transaction_id,sender_id,receiver_id,amount,timestamp\n\
                   TX1,A,B,500,2025-01-01T10:00:00\n\
                   TX2,B,C,500,2025-01-01T11:00:00\n\
                   TX3,C,D,500,2025-01-01T12:00:00\n";
        let result = Pipeline::new().analyze(csv).unwrap();
        assert_eq!(result.fraud_rings.len(), 1);
        assert_eq!(result.fraud_rings[0].pattern_type, "shell");
        assert_eq!(
            result.fraud_rings[0].member_accounts,
            vec!["A".to_string(), "B".into(), "C".into(), "D".into()]
        );
    }

    #[test]
    fn scenario_e_cycle_with_too_wide_amount_ratio_is_not_emitted() {
        let csv = "transaction_id,sender_id,receiver_id,amount,timestamp\n\
                   TX1,A,B,100,2025-01-01T10:00:00\n\
                   TX2,B,C,200,2025-01-01T11:00:00\n\
                   TX3,C,A,105,2025-01-01T12:00:00\n";
        let result = Pipeline::new().analyze(csv).unwrap();
        assert!(result.fraud_rings.iter().all(|r| r.pattern_type != "cycle"));
    }

    #[test]
    fn zero_transactions_is_empty_batch_error() {
        let csv = "transaction_id,sender_id,receiver_id,amount,timestamp\n";
        let err = Pipeline::new().analyze(csv).unwrap_err();
        assert_eq!(err.code(), "EMPTY_BATCH");
    }

    #[test]
    fn single_transaction_is_well_formed_with_no_rings() {
        let csv = "transaction_id,sender_id,receiver_id,amount,timestamp\n\
                   TX1,A,B,100,2025-01-01T10:00:00\n";
        let result = Pipeline::new().analyze(csv).unwrap();
        assert!(result.fraud_rings.is_empty());
        assert!(result.suspicious_accounts.is_empty());
        assert_eq!(result.summary.total_accounts_analyzed, 2);
    }

    #[test]
    fn batch_over_cap_is_rejected() {
        let mut csv = "transaction_id,sender_id,receiver_id,amount,timestamp\n".to_string();
        for i in 0..11 {
            csv.push_str(&format!("TX{i},A,B,10,2025-01-01T10:00:{i:02}\n"));
        }
        let mut config = Config::default();
        config.max_transactions = 10;
        let err = Pipeline::with_config(config).analyze(&csv).unwrap_err();
        assert_eq!(err.code(), "TOO_MANY_TRANSACTIONS");
    }

    #[test]
    fn identical_input_produces_identical_result() {
        let csv = "transaction_id,sender_id,receiver_id,amount,timestamp\n\
                   TX1,A,B,100,2025-01-01T10:00:00\n\
                   TX2,B,C,105,2025-01-01T12:00:00\n\
                   TX3,C,A,102,2025-01-01T14:00:00\n";
        let r1 = Pipeline::new().analyze(csv).unwrap();
        let r2 = Pipeline::new().analyze(csv).unwrap();
        assert_eq!(r1.fraud_rings, r2.fraud_rings);
        assert_eq!(r1.suspicious_accounts, r2.suspicious_accounts);
    }
}
