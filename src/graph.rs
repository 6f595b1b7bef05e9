//! Builds the read-only transaction graph from an ordered transaction list.
//!
//! One pass, O(T), the way `TransactionGraph::add_transaction`
//! folds each transaction into running per-account state.

use std::collections::{HashMap, HashSet};

use crate::model::{AccountAggregate, Edge, Graph, Transaction};

/// Builds a `Graph` from transactions already ordered by timestamp.
pub struct GraphBuilder;

impl GraphBuilder {
    /// Fold `transactions` into a `Graph`. Adjacency lists preserve the
    /// input order; aggregates and distinct-counterparty counts are
    /// computed in the same pass and cached on the node.
    pub fn build(transactions: &[Transaction]) -> Graph {
        let mut forward: HashMap<String, Vec<Edge>> = HashMap::new();
        let mut reverse: HashMap<String, Vec<Edge>> = HashMap::new();
        let mut in_counterparties: HashMap<String, HashSet<String>> = HashMap::new();
        let mut out_counterparties: HashMap<String, HashSet<String>> = HashMap::new();
        let mut in_degree: HashMap<String, usize> = HashMap::new();
        let mut out_degree: HashMap<String, usize> = HashMap::new();
        let mut total_in_amount: HashMap<String, f64> = HashMap::new();
        let mut total_out_amount: HashMap<String, f64> = HashMap::new();
        let mut first_seen: HashMap<String, chrono::DateTime<chrono::Utc>> = HashMap::new();
        let mut last_seen: HashMap<String, chrono::DateTime<chrono::Utc>> = HashMap::new();
        let mut nodes: HashSet<String> = HashSet::new();

        for tx in transactions {
            nodes.insert(tx.sender.clone());
            nodes.insert(tx.receiver.clone());

            let edge = Edge {
                transaction_id: tx.transaction_id.clone(),
                from: tx.sender.clone(),
                to: tx.receiver.clone(),
                amount: tx.amount,
                timestamp: tx.timestamp,
            };

            forward.entry(tx.sender.clone()).or_default().push(edge.clone());
            reverse.entry(tx.receiver.clone()).or_default().push(edge);

            *out_degree.entry(tx.sender.clone()).or_insert(0) += 1;
            *in_degree.entry(tx.receiver.clone()).or_insert(0) += 1;
            *total_out_amount.entry(tx.sender.clone()).or_insert(0.0) += tx.amount;
            *total_in_amount.entry(tx.receiver.clone()).or_insert(0.0) += tx.amount;

            out_counterparties
                .entry(tx.sender.clone())
                .or_default()
                .insert(tx.receiver.clone());
            in_counterparties
                .entry(tx.receiver.clone())
                .or_default()
                .insert(tx.sender.clone());

            for account in [&tx.sender, &tx.receiver] {
                first_seen
                    .entry(account.clone())
                    .and_modify(|t| {
                        if tx.timestamp < *t {
                            *t = tx.timestamp;
                        }
                    })
                    .or_insert(tx.timestamp);
                last_seen
                    .entry(account.clone())
                    .and_modify(|t| {
                        if tx.timestamp > *t {
                            *t = tx.timestamp;
                        }
                    })
                    .or_insert(tx.timestamp);
            }
        }

        let mut sorted_nodes: Vec<String> = nodes.into_iter().collect();
        sorted_nodes.sort();

        let mut aggregates = HashMap::new();
        for account in &sorted_nodes {
            let seen_at = first_seen[account];
            aggregates.insert(
                account.clone(),
                AccountAggregate {
                    in_degree: *in_degree.get(account).unwrap_or(&0),
                    out_degree: *out_degree.get(account).unwrap_or(&0),
                    total_in_amount: *total_in_amount.get(account).unwrap_or(&0.0),
                    total_out_amount: *total_out_amount.get(account).unwrap_or(&0.0),
                    distinct_in_counterparties: in_counterparties
                        .get(account)
                        .map(HashSet::len)
                        .unwrap_or(0),
                    distinct_out_counterparties: out_counterparties
                        .get(account)
                        .map(HashSet::len)
                        .unwrap_or(0),
                    first_seen: seen_at,
                    last_seen: last_seen[account],
                },
            );
        }

        Graph {
            nodes: sorted_nodes,
            forward,
            reverse,
            aggregates,
        }
    }
}
