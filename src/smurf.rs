//! Smurfing/structuring detection: hubs touching many distinct
//! counterparties inside a short sliding window.
//!
//! Follows `fraud_patterns::check_velocity`'s windowed-count idiom (filter
//! history by a timestamp predicate, count), generalized to a sliding
//! window that tracks the *maximum* distinct-counterparty count, and on
//! `network_analysis`'s incoming/outgoing-account-set bookkeeping for
//! counterparty identity.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::config::Config;
use crate::model::{Edge, Graph, PatternType, Ring, RingMetadata};

pub struct SmurfDetector;

impl SmurfDetector {
    /// Emit one ring per hub whose peak distinct-counterparty count in a
    /// sliding window reaches `smurf_min_counterparties`.
    pub fn detect(graph: &Graph, config: &Config) -> Vec<Ring> {
        let mut rings: Vec<Ring> = graph
            .nodes
            .iter()
            .filter_map(|account| detect_for_account(graph, config, account))
            .collect();
        rings.sort_by(|a, b| a.members[0].cmp(&b.members[0]));
        rings
    }
}

fn counterparty_of(edge: &Edge, account: &str) -> String {
    if edge.from == account {
        edge.to.clone()
    } else {
        edge.from.clone()
    }
}

fn detect_for_account(graph: &Graph, config: &Config, account: &str) -> Option<Ring> {
    let mut touches: Vec<Edge> = graph
        .out_edges(account)
        .iter()
        .cloned()
        .chain(graph.in_edges(account).iter().cloned())
        .collect();
    touches.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.transaction_id.cmp(&b.transaction_id)));
    if touches.is_empty() {
        return None;
    }

    let window = Duration::minutes((config.smurf_window_hours * 60.0) as i64);
    let mut left = 0usize;
    let mut counter: HashMap<String, usize> = HashMap::new();
    let mut best: Option<(usize, usize, usize)> = None;

    for right in 0..touches.len() {
        let cp = counterparty_of(&touches[right], account);
        *counter.entry(cp).or_insert(0) += 1;

        while touches[right].timestamp - touches[left].timestamp > window {
            let cp = counterparty_of(&touches[left], account);
            if let Some(c) = counter.get_mut(&cp) {
                *c -= 1;
                if *c == 0 {
                    counter.remove(&cp);
                }
            }
            left += 1;
        }

        let distinct = counter.len();
        let is_new_best = match best {
            Some((best_distinct, _, _)) => distinct > best_distinct,
            None => true,
        };
        if is_new_best {
            best = Some((distinct, left, right));
        }
    }

    let (peak, left, right) = best?;
    if peak < config.smurf_min_counterparties {
        return None;
    }

    let window_edges = &touches[left..=right];
    let total_tx = window_edges.len();

    let mut first_interaction: HashMap<String, DateTime<Utc>> = HashMap::new();
    for edge in window_edges {
        let cp = counterparty_of(edge, account);
        first_interaction.entry(cp).or_insert(edge.timestamp);
    }
    let mut counterparties: Vec<String> = first_interaction.keys().cloned().collect();
    counterparties.sort_by(|a, b| first_interaction[a].cmp(&first_interaction[b]).then(a.cmp(b)));

    let amounts: Vec<f64> = window_edges.iter().map(|e| e.amount).collect();
    let mean = amounts.iter().sum::<f64>() / amounts.len() as f64;
    let variance = amounts.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / amounts.len() as f64;
    let cv = if mean > 0.0 { variance.sqrt() / mean } else { 0.0 };

    let evidence_edges = window_edges.iter().map(|e| e.transaction_id.clone()).collect();
    let time_span_hours = (touches[right].timestamp - touches[left].timestamp).num_seconds() as f64 / 3600.0;
    let topology_tightness = (peak as f64 / total_tx as f64).clamp(0.0, 1.0);

    let mut members = vec![account.to_string()];
    members.extend(counterparties);

    Some(Ring {
        ring_id: String::new(),
        pattern_type: PatternType::Smurfing,
        members,
        evidence_edges,
        metadata: RingMetadata {
            time_span_hours,
            amount_ratio: 1.0,
            amount_cv: Some(cv),
            topology_tightness,
            confidence: 0.0,
        },
    })
}
