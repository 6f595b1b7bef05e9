//! Shell/pass-through chain detection: a source feeding a narrow corridor
//! of low-degree intermediaries into a sink.
//!
//! The DFS shape is the same vertex-at-a-time walk as `cycle.rs`, grounded
//! on the same `polysettle-clearing-engine` cycle-enumeration reference,
//! generalized from "return to start" to "stop at a sink with no degree
//! constraint." The intermediate degree gate follows
//! `network_analysis::is_pass_through`'s inflow/outflow check.
//!
//! Every out-degree-positive vertex is walked as its own start, so the
//! detector also walks inside longer chains; contiguous sub-runs of a
//! longer emitted chain are dropped from the result.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};

use crate::config::Config;
use crate::model::{Edge, Graph, PatternType, Ring, RingMetadata};

pub struct ShellDetector;

impl ShellDetector {
    pub fn detect(graph: &Graph, config: &Config) -> Vec<Ring> {
        let mut found: HashMap<Vec<String>, (Ring, f64)> = HashMap::new();
        let slack = Duration::minutes(config.cycle_time_slack_minutes);

        for start in &graph.nodes {
            if graph.aggregate(start).map(|a| a.out_degree).unwrap_or(0) == 0 {
                continue;
            }
            let mut path = vec![start.clone()];
            let mut edges_used: Vec<Edge> = Vec::new();
            let mut visited: HashSet<String> = HashSet::new();
            visited.insert(start.clone());

            walk(graph, config, &mut path, &mut edges_used, &mut visited, None, None, None, None, slack, &mut found);
        }

        // Every out_degree >= 1 vertex is walked as its own start, so a
        // single long chain also surfaces each of its own contiguous
        // sub-runs (e.g. the tail of a length-4 chain walked again from
        // its second vertex). Keep only chains that are not wholly
        // contained, in order, inside a longer emitted chain.
        let all_paths: Vec<Vec<String>> = found.keys().cloned().collect();
        let mut rings: Vec<Ring> = found
            .into_iter()
            .filter(|(path, _)| {
                !all_paths.iter().any(|other| {
                    other.len() > path.len() && other.windows(path.len()).any(|w| w == path.as_slice())
                })
            })
            .map(|(_, (ring, _))| ring)
            .collect();
        rings.sort_by(|a, b| a.members.cmp(&b.members));
        rings
    }
}

#[allow(clippy::too_many_arguments)]
fn walk(
    graph: &Graph,
    config: &Config,
    path: &mut Vec<String>,
    edges_used: &mut Vec<Edge>,
    visited: &mut HashSet<String>,
    running_min: Option<f64>,
    running_max: Option<f64>,
    first_ts: Option<DateTime<Utc>>,
    last_ts: Option<DateTime<Utc>>,
    slack: Duration,
    found: &mut HashMap<Vec<String>, (Ring, f64)>,
) {
    if path.len() >= config.shell_min_len {
        emit_shell(graph, config, path, edges_used, running_min.unwrap(), running_max.unwrap(), first_ts.unwrap(), last_ts.unwrap(), found);
    }

    if path.len() >= config.shell_max_len {
        return;
    }

    let cur = path.last().unwrap().clone();

    if path.len() > 1 {
        let degree = graph
            .aggregate(&cur)
            .map(|a| a.in_degree + a.out_degree)
            .unwrap_or(0);
        if degree < config.shell_intermediate_degree_min || degree > config.shell_intermediate_degree_max {
            return;
        }
    }

    let nexts: BTreeSet<String> = graph.out_edges(&cur).iter().map(|e| e.to.clone()).collect();

    for next in nexts {
        if visited.contains(&next) {
            continue;
        }

        let candidate_edges = graph.out_edges(&cur).iter().filter(|e| e.to == next);
        let mut best: Option<(&Edge, f64, f64)> = None;

        for edge in candidate_edges {
            if edge.amount < config.shell_min_amount {
                continue;
            }
            if let Some(last) = last_ts {
                if edge.timestamp + slack < last {
                    continue;
                }
            }
            if let Some(first) = first_ts {
                let span = edge.timestamp - first;
                if span > Duration::minutes((config.shell_time_span_hours * 60.0) as i64) {
                    continue;
                }
            }
            let new_min = running_min.map(|m| m.min(edge.amount)).unwrap_or(edge.amount);
            let new_max = running_max.map(|m| m.max(edge.amount)).unwrap_or(edge.amount);
            if new_max / new_min > config.shell_amount_ratio {
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

        path.push(next.clone());
        edges_used.push(edge.clone());
        visited.insert(next.clone());

        walk(
            graph,
            config,
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

#[allow(clippy::too_many_arguments)]
fn emit_shell(
    graph: &Graph,
    config: &Config,
    path: &[String],
    edges_used: &[Edge],
    min_amount: f64,
    max_amount: f64,
    first_ts: DateTime<Utc>,
    last_ts: DateTime<Utc>,
    found: &mut HashMap<Vec<String>, (Ring, f64)>,
) {
    let amount_ratio = max_amount / min_amount;
    let key = path.to_vec();
    if let Some((_, existing_ratio)) = found.get(&key) {
        if amount_ratio >= *existing_ratio {
            return;
        }
    }

    let intermediates = &path[1..path.len() - 1];
    let avg_intermediate_degree = if intermediates.is_empty() {
        config.shell_intermediate_degree_min as f64
    } else {
        let total: usize = intermediates
            .iter()
            .map(|a| graph.aggregate(a).map(|agg| agg.in_degree + agg.out_degree).unwrap_or(0))
            .sum();
        total as f64 / intermediates.len() as f64
    };
    let topology_tightness = (1.0 / avg_intermediate_degree).clamp(0.0, 1.0);
    let time_span_hours = (last_ts - first_ts).num_seconds() as f64 / 3600.0;

    let ring = Ring {
        ring_id: String::new(),
        pattern_type: PatternType::Shell,
        members: path.to_vec(),
        evidence_edges: edges_used.iter().map(|e| e.transaction_id.clone()).collect(),
        metadata: RingMetadata {
            time_span_hours,
            amount_ratio,
            amount_cv: None,
            topology_tightness,
            confidence: 0.0,
        },
    };

    found.insert(key, (ring, amount_ratio));
}
