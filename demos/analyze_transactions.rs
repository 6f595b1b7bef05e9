//! Mule ring detection example
//!
//! Builds a small CSV batch in memory, runs it through the pipeline, and
//! prints the findings.

use mule_ring_detector::{Config, Pipeline};

fn main() {
    tracing_subscriber::fmt::init();

    println!("=== Mule Ring Detector ===\n");

    // Example 1: a pure three-account circular flow.
    println!("1. Circular Flow");
    let csv = "transaction_id,sender_id,receiver_id,amount,timestamp\n\
               TX1,A,B,10000,2025-01-01T10:00:00\n\
               TX2,B,C,10200,2025-01-01T12:00:00\n\
               TX3,C,A,10100,2025-01-01T14:00:00\n";
    let result = Pipeline::new().analyze(csv).expect("analysis should succeed");
    print_result(&result);

    // Example 2: a smurfing hub fanning out to ten distinct recipients.
    println!("2. Smurfing Hub");
    let mut csv = String::from("transaction_id,sender_id,receiver_id,amount,timestamp\n");
    for i in 0..10 {
        csv.push_str(&format!("TXS{i},HUB,R{i},500,2025-02-01T0{i}:00:00\n"));
    }
    let result = Pipeline::new().analyze(&csv).expect("analysis should succeed");
    print_result(&result);

    // Example 3: a layered pass-through chain.
    println!("3. Shell Chain");
    let csv = "transaction_id,sender_id,receiver_id,amount,timestamp\n\
               TX1,SRC,MID1,5000,2025-03-01T09:00:00\n\
               TX2,MID1,MID2,5000,2025-03-01T10:00:00\n\
               TX3,MID2,SINK,5000,2025-03-01T11:00:00\n";
    let result = Pipeline::new().analyze(csv).expect("analysis should succeed");
    print_result(&result);

    // Example 4: malformed rows and a header case mismatch still ingest.
    println!("4. Malformed Rows Dropped Silently");
    let csv = "TRANSACTION_ID,SENDER_ID,RECEIVER_ID,AMOUNT,TIMESTAMP\n\
               TX1,A,B,100,2025-01-01T10:00:00\n\
               TX2,A,,50,2025-01-01T11:00:00\n\
               TX3,A,B,not-a-number,2025-01-01T12:00:00\n";
    let result = Pipeline::new().analyze(csv).expect("analysis should succeed");
    print_result(&result);

    // Example 5: an invalid config rejects the whole batch.
    println!("5. Schema Error");
    let csv = "sender_id,receiver_id,amount,timestamp\nA,B,100,2025-01-01T10:00:00\n";
    match Pipeline::new().analyze(csv) {
        Ok(_) => unreachable!("missing transaction_id column must fail"),
        Err(err) => {
            println!("   code: {}", err.code());
            println!("   detail: {}\n", err.detail());
        }
    }

    let _ = Config::default();
}

fn print_result(result: &mule_ring_detector::AnalysisResult) {
    println!("   Accounts analyzed: {}", result.summary.total_accounts_analyzed);
    println!("   Accounts flagged:  {}", result.summary.suspicious_accounts_flagged);
    println!("   Rings detected:    {}", result.summary.fraud_rings_detected);
    for ring in &result.fraud_rings {
        println!(
            "   {} [{}] risk={} members={:?}",
            ring.ring_id, ring.pattern_type, ring.risk_score, ring.member_accounts
        );
    }
    for finding in &result.suspicious_accounts {
        println!(
            "   account={} score={} patterns={:?} ring={:?}",
            finding.account_id, finding.suspicion_score, finding.detected_patterns, finding.ring_id
        );
    }
    println!();
}
