//! Basic example deduplicating a burst of security findings.
//!
//! Run with `RUST_LOG=dedup_engine=debug` to see each suppression.

use dedup_engine::{DedupKey, DedupSettings, DedupStrategy, Deduper, Strategy};
use serde_json::json;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== Basic Dedup Example ===\n");

    // DEDUP_* variables override the defaults
    let settings = DedupSettings::from_env()?;
    let deduper = settings.build_deduper()?;
    let strategy = settings.build_strategy()?;
    println!(
        "Strategy: {}, window: {:?}, max size: {}\n",
        strategy.name(),
        deduper.window(),
        deduper.max_size()
    );

    let key = DedupKey::new("falco", "prod", "Pod", "web-0", "ShellSpawned", "4be1");
    let high = json!({
        "source": "falco",
        "severity": "HIGH",
        "rule": "Terminal shell in container",
        "timestamp": "2024-01-01T00:00:00Z"
    });
    let critical = json!({
        "source": "falco",
        "severity": "CRITICAL",
        "rule": "Terminal shell in container",
        "timestamp": "2024-01-01T00:00:05Z"
    });
    let high = high.as_object().cloned().unwrap_or_default();
    let critical = critical.as_object().cloned().unwrap_or_default();

    println!("Reporting the same finding 5 times:");
    for i in 1..=5 {
        let created = strategy.should_create(&deduper, &key, &high);
        println!("  #{i}: {}", if created { "created" } else { "suppressed" });
    }

    println!("\nSeverity escalates:");
    let created = strategy.should_create(&deduper, &key, &critical);
    println!("  {}", if created { "created" } else { "suppressed" });

    println!("\nA noisy event stream with a 1 second window:");
    let stream_deduper = Deduper::new(1, 1_000)?;
    let stream = Strategy::event_stream(3);
    for i in 1..=5 {
        let created = stream.should_create(&stream_deduper, &key, &high);
        println!("  #{i}: {}", if created { "created" } else { "suppressed" });
    }
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    let created = stream.should_create(&stream_deduper, &key, &high);
    println!("  after window: {}", if created { "created" } else { "suppressed" });

    let snapshot = deduper.metrics().snapshot();
    println!(
        "\nMetrics: {} created, {} suppressed ({:.0}% suppression)",
        snapshot.observations_created,
        snapshot.duplicates_suppressed,
        snapshot.suppression_rate() * 100.0
    );

    deduper.shutdown().await?;
    stream_deduper.shutdown().await?;

    println!("\n=== Example Complete ===");
    Ok(())
}
