//! Simple-cycle enumeration over the transaction graph.
//!
//! DFS from every start vertex in account order, generalized from the
//! `polysettle-clearing-engine` cycle-detection reference: same
//! canonical-rotation dedup, same running bottleneck/ratio bookkeeping
//! carried along the path instead of recomputed at the end.
//! `network_analysis::dfs_circular` contributes the recursive
//! visited-set/path-stack shape.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};

use crate::config::Config;
use crate::model::{Edge, Graph, PatternType, Ring, RingMetadata};

pub struct CycleDetector;

impl CycleDetector {
    /// Enumerate all simple cycles of length `[cycle_min_len, cycle_max_len]`
    /// satisfying the amount-ratio and time-span constraints. Returns rings
    /// sorted by member list for determinism; the pipeline assigns ids.
    pub fn detect(graph: &Graph, config: &Config) -> Vec<Ring> {
        let mut found: HashMap<Vec<String>, (Ring, DateTime<Utc>)> = HashMap::new();
        let slack = Duration::minutes(config.cycle_time_slack_minutes);

        for start in &graph.nodes {
            let mut path = vec![start.clone()];
            let mut edges_used: Vec<Edge> = Vec::new();
            let mut visited: HashSet<String> = HashSet::new();
            visited.insert(start.clone());

            walk(
                graph,
                config,
                start,
                &mut path,
                &mut edges_used,
                &mut visited,
                None,
                None,
                None,
                None,
                slack,
                &mut found,
            );
        }

        let mut rings: Vec<Ring> = found.into_values().map(|(ring, _)| ring).collect();
        rings.sort_by(|a, b| a.members.cmp(&b.members));
        rings
    }
}

#[allow(clippy::too_many_arguments)]
fn walk(
    graph: &Graph,
    config: &Config,
    start: &str,
    path: &mut Vec<String>,
    edges_used: &mut Vec<Edge>,
    visited: &mut HashSet<String>,
    running_min: Option<f64>,
    running_max: Option<f64>,
    first_ts: Option<DateTime<Utc>>,
    last_ts: Option<DateTime<Utc>>,
    slack: Duration,
    found: &mut HashMap<Vec<String>, (Ring, DateTime<Utc>)>,
) {
    let cur = path.last().unwrap().clone();

    let nexts: BTreeSet<String> = graph.out_edges(&cur).iter().map(|e| e.to.clone()).collect();

    for next in nexts {
        let candidate_edges = graph.out_edges(&cur).iter().filter(|e| e.to == next);

        let mut best: Option<(&Edge, f64, f64)> = None;
        for edge in candidate_edges {
            if let Some(last) = last_ts {
                if edge.timestamp + slack < last {
                    continue;
                }
            }
            if let Some(first) = first_ts {
                let span = edge.timestamp - first;
                if span > Duration::minutes((config.cycle_time_span_hours * 60.0) as i64) {
                    continue;
                }
            }
            let new_min = running_min.map(|m| m.min(edge.amount)).unwrap_or(edge.amount);
            let new_max = running_max.map(|m| m.max(edge.amount)).unwrap_or(edge.amount);
            if new_max / new_min > config.cycle_amount_ratio {
                continue;
            }
            let ratio = new_max / new_min;
            let better = match best {
                None => true,
                Some((best_edge, best_min, best_max)) => {
                    let best_ratio = best_max / best_min;
                    ratio < best_ratio || (ratio == best_ratio && edge.timestamp < best_edge.timestamp)
                }
            };
            if better {
                best = Some((edge, new_min, new_max));
            }
        }

        let Some((edge, new_min, new_max)) = best else {
            continue;
        };

        if next == start {
            if path.len() >= config.cycle_min_len && path.len() <= config.cycle_max_len {
                edges_used.push(edge.clone());
                emit_cycle(path, edges_used, new_min, new_max, first_ts.unwrap_or(edge.timestamp), edge.timestamp, found);
                edges_used.pop();
            }
            continue;
        }

        if visited.contains(&next) || path.len() >= config.cycle_max_len {
            continue;
        }

        path.push(next.clone());
        edges_used.push(edge.clone());
        visited.insert(next.clone());

        walk(
            graph,
            config,
            start,
            path,
            edges_used,
            visited,
            Some(new_min),
            Some(new_max),
            Some(first_ts.unwrap_or(edge.timestamp)),
            Some(edge.timestamp),
            slack,
            found,
        );

        path.pop();
        edges_used.pop();
        visited.remove(&next);
    }
}

fn emit_cycle(
    path: &[String],
    edges_used: &[Edge],
    min_amount: f64,
    max_amount: f64,
    first_ts: DateTime<Utc>,
    last_ts: DateTime<Utc>,
    found: &mut HashMap<Vec<String>, (Ring, DateTime<Utc>)>,
) {
    let k = path.len();
    let rotation = (0..k).min_by_key(|&i| path[i].clone()).unwrap_or(0);

    let canonical_path: Vec<String> = (0..k).map(|i| path[(i + rotation) % k].clone()).collect();
    let canonical_edges: Vec<Edge> = (0..k).map(|i| edges_used[(i + rotation) % k].clone()).collect();
    let first_edge_ts = canonical_edges[0].timestamp;

    if let Some((_, existing_ts)) = found.get(&canonical_path) {
        if first_edge_ts >= *existing_ts {
            return;
        }
    }

    let time_span_hours = (last_ts - first_ts).num_seconds() as f64 / 3600.0;
    let amount_ratio = max_amount / min_amount;
    let topology_tightness = (1.0 - (k as f64 - 3.0) / 2.0).clamp(0.0, 1.0);

    let ring = Ring {
        ring_id: String::new(),
        pattern_type: PatternType::Cycle,
        members: canonical_path.clone(),
        evidence_edges: canonical_edges.iter().map(|e| e.transaction_id.clone()).collect(),
        metadata: RingMetadata {
            time_span_hours,
            amount_ratio,
            amount_cv: None,
            topology_tightness,
            confidence: 0.0,
        },
    };

    found.insert(canonical_path, (ring, first_edge_ts));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::model::Transaction;
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

    #[test]
    fn detects_pure_three_cycle() {
        let txs = vec![
            tx("T1", "A", "B", 100.0, 10),
            tx("T2", "B", "C", 105.0, 12),
            tx("T3", "C", "A", 102.0, 14),
        ];
        let graph = GraphBuilder::build(&txs);
        let rings = CycleDetector::detect(&graph, &Config::default());
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].members, vec!["A".to_string(), "B".into(), "C".into()]);
        assert_eq!(rings[0].evidence_edges, vec!["T1".to_string(), "T2".into(), "T3".into()]);
    }

    #[test]
    fn rejects_cycle_with_amount_ratio_too_wide() {
        let txs = vec![
            tx("T1", "A", "B", 100.0, 0),
            tx("T2", "B", "C", 200.0, 1),
            tx("T3", "C", "A", 105.0, 2),
        ];
        let graph = GraphBuilder::build(&txs);
        let rings = CycleDetector::detect(&graph, &Config::default());
        assert!(rings.is_empty());
    }

    #[test]
    fn rejects_cycle_longer_than_max_len() {
        let txs = vec![
            tx("T1", "A", "B", 100.0, 0),
            tx("T2", "B", "C", 100.0, 1),
            tx("T3", "C", "D", 100.0, 2),
            tx("T4", "D", "E", 100.0, 3),
            tx("T5", "E", "F", 100.0, 4),
            tx("T6", "F", "A", 100.0, 5),
        ];
        let graph = GraphBuilder::build(&txs);
        let rings = CycleDetector::detect(&graph, &Config::default());
        assert!(rings.is_empty());
    }

    #[test]
    fn no_cycle_in_acyclic_chain() {
        let txs = vec![tx("T1", "A", "B", 100.0, 0), tx("T2", "B", "C", 100.0, 1)];
        let graph = GraphBuilder::build(&txs);
        let rings = CycleDetector::detect(&graph, &Config::default());
        assert!(rings.is_empty());
    }

    #[test]
    fn exact_ratio_boundary_is_inclusive() {
        let txs = vec![
            tx("T1", "A", "B", 100.0, 0),
            tx("T2", "B", "C", 100.0, 1),
            tx("T3", "C", "A", 125.0, 2),
        ];
        let graph = GraphBuilder::build(&txs);
        let rings = CycleDetector::detect(&graph, &Config::default());
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].metadata.amount_ratio, 1.25);
    }
}
