//! Density guard: dampens accounts whose neighborhood is mostly benign.
//!
//! Reuses `network_analysis`'s neighbor-set bookkeeping
//! (`incoming_accounts`/`outgoing_accounts` as sets) to compute the ratio of
//! suspicious neighbors.

use std::collections::HashSet;

use crate::config::Config;
use crate::model::Graph;

/// Score multiplier for `account`, given the current suspicious cohort.
pub fn multiplier(graph: &Graph, account: &str, suspicious: &HashSet<String>, config: &Config) -> f64 {
    let neighbors = graph.neighbors(account);
    let total = neighbors.len().max(1);
    let suspicious_neighbors = neighbors.iter().filter(|n| suspicious.contains(*n)).count();
    let ratio = suspicious_neighbors as f64 / total as f64;
    if ratio < config.density_threshold {
        0.8
    } else {
        1.0
    }
}
