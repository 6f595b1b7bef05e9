//! Final account and ring scoring: raw pattern contributions, interaction
//! bonuses, structural/density multipliers, percentile normalization, and
//! deterministic ordering of the two output lists.
//!
//! Follows `TransactionValidator::validate`'s orchestration style
//! (accumulate named components into one score, clamp at the end),
//! generalized to this module's multi-stage raw/bonus/multiplier pipeline.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};

use crate::config::Config;
use crate::density;
use crate::model::{AccountFinding, FraudRing, Graph, PatternType, Ring};

pub struct ScoringEngine;

impl ScoringEngine {
    /// Compute final per-account findings and per-ring risk scores.
    ///
    /// `rings` must already have stable, non-empty `ring_id`s and
    /// `metadata.confidence` filled in by `ConfidenceEngine`.
    pub fn score(graph: &Graph, rings: &[Ring], config: &Config) -> (Vec<AccountFinding>, Vec<FraudRing>) {
        let mut account_rings: HashMap<String, Vec<&Ring>> = HashMap::new();
        let mut patterns: HashMap<String, HashSet<PatternType>> = HashMap::new();
        for ring in rings {
            for member in &ring.members {
                account_rings.entry(member.clone()).or_default().push(ring);
                patterns.entry(member.clone()).or_default().insert(ring.pattern_type);
            }
        }

        let mut raw_scores: HashMap<String, f64> = HashMap::new();
        let mut velocity_counts: HashMap<String, usize> = HashMap::new();
        let mut candidates: Vec<String> = Vec::new();

        for account in &graph.nodes {
            let flags = patterns.get(account);
            let c = flags.map(|f| f.contains(&PatternType::Cycle)).unwrap_or(false);
            let s = flags.map(|f| f.contains(&PatternType::Smurfing)).unwrap_or(false);
            let h = flags.map(|f| f.contains(&PatternType::Shell)).unwrap_or(false);

            let s_weighted = if s {
                account_rings[account]
                    .iter()
                    .filter(|r| r.pattern_type == PatternType::Smurfing)
                    .map(|r| smurf_dampening_factor(r))
                    .fold(0.0_f64, f64::max)
            } else {
                0.0
            };

            let (is_high_velocity, count) = high_velocity(graph, account, config);
            velocity_counts.insert(account.clone(), count);

            let raw = 40.0 * bool_f(c) + 30.0 * s_weighted + 25.0 * bool_f(h) + 10.0 * bool_f(is_high_velocity);

            let pair_count = [c, s, h].iter().filter(|&&x| x).count();
            let mut bonus = 0.0;
            if pair_count >= 2 {
                bonus += 10.0;
            }
            if c && s {
                bonus += 10.0;
            }
            if c && h {
                bonus += 8.0;
            }

            let raw_with_bonus = raw + bonus;
            if raw_with_bonus > 0.0 {
                raw_scores.insert(account.clone(), raw_with_bonus);
                candidates.push(account.clone());
            }
        }

        let suspicious_set: HashSet<String> = candidates.iter().cloned().collect();
        let mut pre_norm: HashMap<String, f64> = HashMap::new();
        for account in &candidates {
            let conf_a = account_rings
                .get(account)
                .map(|rs| rs.iter().map(|r| r.metadata.confidence).fold(0.0_f64, f64::max))
                .unwrap_or(0.0);
            let mult_struct = 0.8 + 0.4 * conf_a;
            let density_mult = density::multiplier(graph, account, &suspicious_set, config);
            pre_norm.insert(account.clone(), raw_scores[account] * mult_struct * density_mult);
        }

        let final_scores = percentile_normalize(&candidates, &pre_norm);

        let mut ring_risk: HashMap<String, u8> = HashMap::new();
        for ring in rings {
            let scores: Vec<f64> = ring
                .members
                .iter()
                .map(|m| *final_scores.get(m).unwrap_or(&0) as f64)
                .collect();
            let mean = scores.iter().sum::<f64>() / scores.len().max(1) as f64;
            let risk = (mean * (0.7 + 0.3 * ring.metadata.confidence)).min(100.0).round() as u8;
            ring_risk.insert(ring.ring_id.clone(), risk);
        }

        let mut findings = Vec::new();
        for account in &graph.nodes {
            let Some(&final_score) = final_scores.get(account) else {
                continue;
            };
            let flags = patterns.get(account);
            let is_ring_member = flags.map(|f| !f.is_empty()).unwrap_or(false);
            if final_score < config.flag_threshold && !is_ring_member {
                continue;
            }

            let mut labels: Vec<String> = flags
                .map(|f| f.iter().map(|p| p.label().to_string()).collect())
                .unwrap_or_default();
            labels.sort();

            let mut member_rings: Vec<&Ring> = account_rings.get(account).cloned().unwrap_or_default();
            member_rings.sort_by(|a, b| {
                let ra = ring_risk.get(&a.ring_id).copied().unwrap_or(0);
                let rb = ring_risk.get(&b.ring_id).copied().unwrap_or(0);
                rb.cmp(&ra).then(a.ring_id.cmp(&b.ring_id))
            });
            let ring_id = member_rings.first().map(|r| r.ring_id.clone());

            let mut reasons = Vec::new();
            if labels.iter().any(|l| l == "cycle") {
                reasons.push("participates in a circular transaction cycle".to_string());
            }
            if labels.iter().any(|l| l == "smurfing") {
                reasons.push("fans out to many distinct counterparties in a short window".to_string());
            }
            if labels.iter().any(|l| l == "shell") {
                reasons.push("part of a layered pass-through chain".to_string());
            }
            if high_velocity(graph, account, config).0 {
                reasons.push(format!(
                    "{} transactions within a rolling {:.0}-hour window",
                    velocity_counts[account], config.high_velocity_window_hours
                ));
            }

            findings.push(AccountFinding {
                account_id: account.clone(),
                suspicion_score: final_score,
                detected_patterns: labels,
                ring_id,
                reasons,
            });
        }
        findings.sort_by(|a, b| b.suspicion_score.cmp(&a.suspicion_score).then(a.account_id.cmp(&b.account_id)));

        let mut fraud_rings: Vec<FraudRing> = rings
            .iter()
            .map(|r| FraudRing {
                ring_id: r.ring_id.clone(),
                pattern_type: r.pattern_type.label().to_string(),
                member_accounts: r.members.clone(),
                risk_score: ring_risk.get(&r.ring_id).copied().unwrap_or(0),
            })
            .collect();
        fraud_rings.sort_by(|a, b| b.risk_score.cmp(&a.risk_score).then(a.ring_id.cmp(&b.ring_id)));

        (findings, fraud_rings)
    }
}

fn bool_f(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Rank-based percentile multiplier, grouping exact ties so symmetric rings
/// (e.g. every member of a pure cycle) land on identical final scores.
fn percentile_normalize(candidates: &[String], pre_norm: &HashMap<String, f64>) -> HashMap<String, u8> {
    let mut sorted: Vec<&String> = candidates.iter().collect();
    sorted.sort_by(|a, b| pre_norm[*a].partial_cmp(&pre_norm[*b]).unwrap().then(a.cmp(b)));
    let n = sorted.len();

    let mut result = HashMap::new();
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && pre_norm[sorted[j + 1]] == pre_norm[sorted[i]] {
            j += 1;
        }
        let p = if n > 1 {
            ((i + j) as f64 / 2.0) / (n as f64 - 1.0)
        } else {
            1.0
        };
        let pct_mult = (0.85 + 0.30 * p).clamp(0.85, 1.15);
        for account in &sorted[i..=j] {
            let score = (pre_norm[*account] * pct_mult).min(100.0).round();
            result.insert((*account).clone(), score as u8);
        }
        i = j + 1;
    }
    result
}

fn smurf_dampening_factor(ring: &Ring) -> f64 {
    let topology = ring.metadata.topology_tightness;
    let diversity_scale = if topology > 0.7 {
        (1.0 - (topology - 0.7) / 0.3).clamp(0.5, 1.0)
    } else {
        1.0
    };
    let cv = ring.metadata.amount_cv.unwrap_or(0.0);
    let variance_scale = if cv > 0.5 {
        (1.0 - (cv - 0.5).min(0.5)).clamp(0.5, 1.0)
    } else {
        1.0
    };
    diversity_scale * variance_scale
}

fn high_velocity(graph: &Graph, account: &str, config: &Config) -> (bool, usize) {
    let mut touches: Vec<DateTime<Utc>> = graph
        .out_edges(account)
        .iter()
        .map(|e| e.timestamp)
        .chain(graph.in_edges(account).iter().map(|e| e.timestamp))
        .collect();
    touches.sort();
    if touches.is_empty() {
        return (false, 0);
    }

    let window = Duration::minutes((config.high_velocity_window_hours * 60.0) as i64);
    let mut left = 0usize;
    let mut best = 0usize;
    for right in 0..touches.len() {
        while touches[right] - touches[left] > window {
            left += 1;
        }
        let count = right - left + 1;
        if count > best {
            best = count;
        }
    }
    (best > config.high_velocity_min_transactions, best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::model::{RingMetadata, Transaction};
    use chrono::TimeZone;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, h, 0, 0).unwrap()
    }

    fn tx(id: &str, from: &str, to: &str, amount: f64, hour: u32) -> Transaction {
        Transaction {
            transaction_id: id.into(),
            sender: from.into(),
            receiver: to.into(),
            amount,
            timestamp: ts(hour),
        }
    }

    fn cycle_ring(id: &str, members: &[&str], confidence: f64) -> Ring {
        Ring {
            ring_id: id.to_string(),
            pattern_type: PatternType::Cycle,
            members: members.iter().map(|s| s.to_string()).collect(),
            evidence_edges: vec![],
            metadata: RingMetadata {
                time_span_hours: 4.0,
                amount_ratio: 1.05,
                amount_cv: None,
                topology_tightness: 1.0,
                confidence,
            },
        }
    }

    #[test]
    fn symmetric_cycle_members_get_equal_scores() {
        let txs = vec![
            tx("T1", "A", "B", 100.0, 10),
            tx("T2", "B", "C", 105.0, 12),
            tx("T3", "C", "A", 102.0, 14),
        ];
        let graph = GraphBuilder::build(&txs);
        let rings = vec![cycle_ring("RING_CYC_0001", &["A", "B", "C"], 0.9)];
        let (findings, fraud_rings) = ScoringEngine::score(&graph, &rings, &Config::default());

        assert_eq!(findings.len(), 3);
        let scores: HashSet<u8> = findings.iter().map(|f| f.suspicion_score).collect();
        assert_eq!(scores.len(), 1);
        assert!(findings[0].suspicion_score >= 40);
        assert_eq!(fraud_rings.len(), 1);
        assert_eq!(fraud_rings[0].ring_id, "RING_CYC_0001");
    }

    #[test]
    fn account_outside_any_ring_with_low_velocity_is_not_flagged() {
        let txs = vec![tx("T1", "A", "B", 10.0, 0)];
        let graph = GraphBuilder::build(&txs);
        let (findings, _) = ScoringEngine::score(&graph, &[], &Config::default());
        assert!(findings.is_empty());
    }

    #[test]
    fn dual_participation_gets_sorted_pattern_labels_and_interaction_bonus() {
        let txs = vec![
            tx("T1", "A", "B", 100.0, 0),
            tx("T2", "B", "C", 100.0, 1),
            tx("T3", "C", "A", 100.0, 2),
            tx("T4", "A", "D", 500.0, 0),
            tx("T5", "D", "E", 500.0, 1),
        ];
        let graph = GraphBuilder::build(&txs);
        let rings = vec![
            cycle_ring("RING_CYC_0001", &["A", "B", "C"], 0.8),
            Ring {
                ring_id: "RING_SHL_0001".to_string(),
                pattern_type: PatternType::Shell,
                members: vec!["A".into(), "D".into(), "E".into()],
                evidence_edges: vec![],
                metadata: RingMetadata {
                    time_span_hours: 1.0,
                    amount_ratio: 1.0,
                    amount_cv: None,
                    topology_tightness: 0.5,
                    confidence: 0.8,
                },
            },
        ];
        let (findings, _) = ScoringEngine::score(&graph, &rings, &Config::default());
        let a = findings.iter().find(|f| f.account_id == "A").unwrap();
        assert_eq!(a.detected_patterns, vec!["cycle".to_string(), "shell".to_string()]);
    }
}
