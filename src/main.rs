//! frontkit - call JSON APIs, prefetch resources and inspect persisted state
//!
//! A small command-line front end over the frontkit library: the HTTP client
//! with its GET cache, the resource prefetcher and persistent state, with
//! request timings collected by the performance monitor.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde_json::Value;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use frontkit::api::{ApiClient, GetOptions, RequestOptions};
use frontkit::cli::{parse_json_arg, parse_state_value, Cli, CliError, Command};
use frontkit::hooks::PersistentState;
use frontkit::perf::{prefetch_resources, HttpPrefetcher, PerformanceMonitor};
use frontkit::platform::{FileStorage, Storage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays pipeable JSON
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let monitor = PerformanceMonitor::global();

    match cli.command {
        Command::Get {
            path,
            client,
            cache,
            cache_ms,
            repeat,
        } => {
            let api = ApiClient::new(client.to_config()?);
            let options = GetOptions {
                cache,
                cache_duration: Some(Duration::from_millis(cache_ms)),
                headers: BTreeMap::new(),
            };

            let mut body = Value::Null;
            for _ in 0..repeat.max(1) {
                let measurement = monitor.start_measure("get");
                body = api.get(&path, options.clone()).await?;
                let _ = measurement.finish();
            }

            println!("{}", serde_json::to_string_pretty(&body)?);
            report(monitor, "get");
        }
        Command::Post { path, client, data } => {
            let api = ApiClient::new(client.to_config()?);
            let payload = parse_json_arg(&data)?;

            let measurement = monitor.start_measure("post");
            let body: Value = api.post(&path, &payload, RequestOptions::default()).await?;
            let _ = measurement.finish();

            println!("{}", serde_json::to_string_pretty(&body)?);
            report(monitor, "post");
        }
        Command::Prefetch { urls } => {
            let hints = HttpPrefetcher::new();

            let measurement = monitor.start_measure("prefetch");
            let loaded = prefetch_resources(Some(&hints), urls.as_slice()).await?;
            let _ = measurement.finish();

            println!("Prefetched {} resource(s)", loaded.len());
            report(monitor, "prefetch");
        }
        Command::State {
            key,
            value,
            origin,
            data_dir,
        } => {
            let storage = match data_dir {
                Some(dir) => FileStorage::with_dir(dir, origin),
                None => FileStorage::new(origin).ok_or(CliError::NoDataDir)?,
            };
            let storage: Arc<dyn Storage> = Arc::new(storage);

            let mut state = PersistentState::new(key, Value::Null, Some(storage));
            if let Some(raw) = value {
                state.set(parse_state_value(&raw));
            }

            println!("{}", serde_json::to_string_pretty(state.get())?);
        }
    }

    Ok(())
}

/// Prints timing statistics for `label` to stderr
fn report(monitor: &PerformanceMonitor, label: &str) {
    if let Some(metrics) = monitor.get_metrics(label) {
        eprintln!(
            "{label}: {} call(s), avg {:.1} ms, min {:.1} ms, max {:.1} ms",
            metrics.count, metrics.average, metrics.min, metrics.max
        );
    }
}
