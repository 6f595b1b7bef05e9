//! Core value types shared by every pipeline stage.
//!
//! Every type here is a plain, fixed-field record, no open maps, no
//! dynamic attribute bags. Structures are owned per-invocation and never
//! outlive the call that produced them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single ingested transaction, immutable after `ingest::parse`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub transaction_id: String,
    pub sender: String,
    pub receiver: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

/// One directed edge in the transaction graph, carried in adjacency lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    pub transaction_id: String,
    pub from: String,
    pub to: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

/// Per-account aggregate statistics, computed once by `GraphBuilder`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountAggregate {
    pub in_degree: usize,
    pub out_degree: usize,
    pub total_in_amount: f64,
    pub total_out_amount: f64,
    pub distinct_in_counterparties: usize,
    pub distinct_out_counterparties: usize,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// The read-only transaction graph built once per invocation.
#[derive(Debug, Clone)]
pub struct Graph {
    /// All account ids, sorted lexicographically: the canonical "account
    /// order" referenced by the detectors.
    pub nodes: Vec<String>,
    /// account -> outgoing edges, in insertion (CSV row) order.
    pub forward: HashMap<String, Vec<Edge>>,
    /// account -> incoming edges, in insertion (CSV row) order.
    pub reverse: HashMap<String, Vec<Edge>>,
    pub aggregates: HashMap<String, AccountAggregate>,
}

impl Graph {
    pub fn out_edges(&self, account: &str) -> &[Edge] {
        self.forward.get(account).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn in_edges(&self, account: &str) -> &[Edge] {
        self.reverse.get(account).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn aggregate(&self, account: &str) -> Option<&AccountAggregate> {
        self.aggregates.get(account)
    }

    /// Union of incoming and outgoing counterparties for `account`.
    pub fn neighbors(&self, account: &str) -> std::collections::HashSet<String> {
        let mut set = std::collections::HashSet::new();
        for e in self.out_edges(account) {
            set.insert(e.to.clone());
        }
        for e in self.in_edges(account) {
            set.insert(e.from.clone());
        }
        set.remove(account);
        set
    }
}

/// Which detector produced a ring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Cycle,
    Smurfing,
    Shell,
}

impl PatternType {
    /// The `{PATTERN}` component of a ring id, e.g. `CYC`.
    pub fn code(&self) -> &'static str {
        match self {
            PatternType::Cycle => "CYC",
            PatternType::Smurfing => "SMR",
            PatternType::Shell => "SHL",
        }
    }

    /// The lowercase name used in `detected_patterns` and the wire schema.
    pub fn label(&self) -> &'static str {
        match self {
            PatternType::Cycle => "cycle",
            PatternType::Smurfing => "smurfing",
            PatternType::Shell => "shell",
        }
    }
}

/// Detector-specific measurements carried alongside a ring, consumed by
/// `ConfidenceEngine` and retained for explanation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RingMetadata {
    pub time_span_hours: f64,
    /// max/min amount ratio along the ring's evidentiary edges. Unused
    /// (left at 1.0) for smurfing rings, which use `amount_cv` instead.
    pub amount_ratio: f64,
    /// Coefficient of variation of amounts in the smurf window. `None` for
    /// cycle and shell rings.
    pub amount_cv: Option<f64>,
    /// Topology-tightness component in [0,1], already computed by the
    /// detector in its own pattern-specific way.
    pub topology_tightness: f64,
    /// Filled in by `ConfidenceEngine::score`; 0.0 until then.
    pub confidence: f64,
}

/// One detected fraud ring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ring {
    /// Empty until assigned by the pipeline after per-pattern sorting.
    pub ring_id: String,
    pub pattern_type: PatternType,
    pub members: Vec<String>,
    pub evidence_edges: Vec<String>,
    pub metadata: RingMetadata,
}

/// Per-account finding in the final result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountFinding {
    pub account_id: String,
    pub suspicion_score: u8,
    pub detected_patterns: Vec<String>,
    pub ring_id: Option<String>,
    pub reasons: Vec<String>,
}

/// A fraud ring as reported on the wire (post risk-scoring).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FraudRing {
    pub ring_id: String,
    pub pattern_type: String,
    pub member_accounts: Vec<String>,
    pub risk_score: u8,
}

/// Summary counts for one analysis invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub total_accounts_analyzed: usize,
    pub suspicious_accounts_flagged: usize,
    pub fraud_rings_detected: usize,
    pub processing_time_seconds: f64,
}

/// The top-level result returned by the pipeline and serialized on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub suspicious_accounts: Vec<AccountFinding>,
    pub fraud_rings: Vec<FraudRing>,
    pub summary: Summary,
}

/// Row-drop bookkeeping from ingest. Not part of the wire schema, an
/// explicit extension point a host layer may surface separately.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IngestDiagnostics {
    pub rows_read: usize,
    pub rows_parsed: usize,
    pub dropped_field_count: usize,
    pub dropped_bad_amount: usize,
    pub dropped_negative_amount: usize,
    pub dropped_empty_id: usize,
    pub dropped_bad_timestamp: usize,
}

impl IngestDiagnostics {
    pub fn total_dropped(&self) -> usize {
        self.dropped_field_count
            + self.dropped_bad_amount
            + self.dropped_negative_amount
            + self.dropped_empty_id
            + self.dropped_bad_timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn graph_neighbors_excludes_self_and_dedupes() {
        let mut forward = HashMap::new();
        forward.insert(
            "A".to_string(),
            vec![
                Edge {
                    transaction_id: "T1".into(),
                    from: "A".into(),
                    to: "B".into(),
                    amount: 10.0,
                    timestamp: ts(1),
                },
                Edge {
                    transaction_id: "T2".into(),
                    from: "A".into(),
                    to: "B".into(),
                    amount: 20.0,
                    timestamp: ts(2),
                },
            ],
        );
        let mut reverse = HashMap::new();
        reverse.insert(
            "A".to_string(),
            vec![Edge {
                transaction_id: "T3".into(),
                from: "C".into(),
                to: "A".into(),
                amount: 5.0,
                timestamp: ts(3),
            }],
        );
        let graph = Graph {
            nodes: vec!["A".into(), "B".into(), "C".into()],
            forward,
            reverse,
            aggregates: HashMap::new(),
        };
        let neighbors = graph.neighbors("A");
        assert_eq!(neighbors.len(), 2);
        assert!(neighbors.contains("B"));
        assert!(neighbors.contains("C"));
    }

    #[test]
    fn pattern_type_codes_and_labels() {
        assert_eq!(PatternType::Cycle.code(), "CYC");
        assert_eq!(PatternType::Smurfing.code(), "SMR");
        assert_eq!(PatternType::Shell.code(), "SHL");
        assert_eq!(PatternType::Cycle.label(), "cycle");
        assert_eq!(PatternType::Smurfing.label(), "smurfing");
        assert_eq!(PatternType::Shell.label(), "shell");
    }

    #[test]
    fn ingest_diagnostics_totals() {
        let diag = IngestDiagnostics {
            rows_read: 10,
            rows_parsed: 6,
            dropped_field_count: 1,
            dropped_bad_amount: 1,
            dropped_negative_amount: 1,
            dropped_empty_id: 0,
            dropped_bad_timestamp: 1,
        };
        assert_eq!(diag.total_dropped(), 4);
    }
}
