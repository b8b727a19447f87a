//! Rank unusual messages in a small synthetic mailbox.
//!
//! ```text
//! RUST_LOG=stray=debug cargo run --example email_anomalies [config.json]
//! ```

use rand::prelude::*;
use stray::exec::Parallel;
use stray::pipeline::{Pipeline, RawDocument};
use stray::PipelineConfig;
use tracing_subscriber::EnvFilter;

const TOPICS: &[&[&str]] = &[
    &["meeting", "agenda", "schedule", "calendar", "conference", "room", "invite", "minutes"],
    &["invoice", "payment", "budget", "quarter", "forecast", "revenue", "expense", "approval"],
    &["server", "deploy", "outage", "ticket", "database", "restart", "monitoring", "incident"],
    &["contract", "legal", "review", "signature", "clause", "counsel", "agreement", "draft"],
];

const ODDITIES: &[&str] = &[
    "wire transfer offshore account urgent confidential",
    "lottery winner claim prize immediately",
    "",
    "password reset credentials verify login",
];

fn mailbox(rng: &mut StdRng) -> Vec<RawDocument> {
    let mut docs = Vec::new();
    for i in 0..400 {
        let topic = TOPICS[i % TOPICS.len()];
        let len = rng.random_range(4..10);
        let body: Vec<&str> = (0..len).map(|_| topic[rng.random_range(0..topic.len())]).collect();
        docs.push(RawDocument::new(format!("msg-{i:04}"), body.join(" ")));
    }
    for (i, text) in ODDITIES.iter().enumerate() {
        docs.push(RawDocument::new(format!("odd-{i}"), *text));
    }
    docs.push(RawDocument {
        id: Some("truncated".into()),
        text: None,
    });
    docs
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => PipelineConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => {
            let mut c = PipelineConfig::default();
            c.vectorizer.min_df = stray::text::MinDf::Count(1);
            c
        }
    };

    let mut rng = StdRng::seed_from_u64(2024);
    let docs = mailbox(&mut rng);
    let pipeline = Pipeline::new(config)?;

    let prepared = pipeline.prepare(&Parallel, &docs)?;
    let sweep = pipeline.sweep(&Parallel, &prepared)?;
    println!("=== silhouette by k ===");
    for (k, s) in sweep.table() {
        println!("  k = {k:2}  silhouette = {s:+.4}");
    }
    for f in &sweep.failures {
        println!("  k = {:2}  skipped: {}", f.k, f.reason);
    }

    let k = pipeline.config().clustering.chosen_k;
    let model = pipeline.fit(&Parallel, &prepared, k)?;
    let report = pipeline.score(&Parallel, &prepared, &model)?;

    println!("\n=== top anomalies (k = {k}) ===");
    for r in report.top(10) {
        let cluster = r.cluster.map_or("-".to_string(), |c| c.to_string());
        println!("  {:<10} cluster {:>2}  distance {:>10.4}", r.id, cluster, r.distance);
    }

    let curve = pipeline.density(&Parallel, &report)?;
    if let Some(mode) = curve.mode() {
        println!(
            "\ndensity: bandwidth {:.3}, mode at distance {:.1} ({:.4})",
            curve.bandwidth, mode.x, mode.density
        );
    }
    println!("skipped documents: {}", prepared.skipped.len());
    Ok(())
}
