//! # Mule Ring Detector
//!
//! Graph-based detection of money-mule rings over a batch of financial
//! transactions: circular flows, smurfing/structuring hubs, and layered
//! shell/pass-through chains.
//!
//! ## Pipeline
//!
//! `Pipeline::analyze` takes raw CSV text and a [`Config`], and returns an
//! [`AnalysisResult`] with per-account suspicion scores, detected fraud
//! rings, and a summary. The stages run in a fixed order: ingest, graph
//! construction, the three pattern detectors, confidence scoring, density
//! dampening, and final account/ring scoring. Every stage is deterministic:
//! identical input and config always produce a byte-identical result.
//!
//! ```no_run
//! use mule_ring_detector::{Config, Pipeline};
//!
//! let csv = "transaction_id,sender_id,receiver_id,amount,timestamp\n\
//!            TX1,A,B,100,2025-01-01T10:00:00\n\
//!            TX2,B,C,105,2025-01-01T12:00:00\n\
//!            TX3,C,A,102,2025-01-01T14:00:00\n";
//! let result = Pipeline::with_config(Config::default()).analyze(csv).unwrap();
//! println!("{}", serde_json::to_string_pretty(&result).unwrap());
//! ```

pub mod config;
pub mod confidence;
pub mod cycle;
pub mod density;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod model;
pub mod pipeline;
pub mod scoring;
pub mod shell;
pub mod smurf;

pub use config::Config;
pub use error::AnalysisError;
pub use model::{
    AccountAggregate, AccountFinding, AnalysisResult, Edge, FraudRing, Graph, IngestDiagnostics,
    PatternType, Ring, RingMetadata, Summary, Transaction,
};
pub use pipeline::Pipeline;
