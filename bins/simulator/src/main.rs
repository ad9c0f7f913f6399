//! Spendline simulator.
//!
//! Seeds in-memory allocations and approval settings, drives one spend
//! request through approval, invoicing and closing, and prints the
//! resulting budget position as JSON.
//!
//! Usage: cargo run --bin simulator

mod scenario;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spendline_core::SpendControlBuilder;
use spendline_core::allocation::InMemoryAllocations;
use spendline_core::ledger::{InMemoryLedgerStore, TracingEventSink};
use spendline_core::settings::{CachedSettings, StaticSettings};
use spendline_shared::{AppConfig, LoggingConfig};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging);

    let settings = Arc::new(StaticSettings::new(config.control.clone()));
    let allocations = Arc::new(InMemoryAllocations::new());
    scenario::seed(&settings, &allocations);

    let control = SpendControlBuilder::new(
        Arc::new(CachedSettings::new(settings.clone())),
        Arc::new(InMemoryLedgerStore::new()),
        allocations,
        Arc::new(scenario::lookup()),
    )
    .sink(Arc::new(TracingEventSink))
    .build();
    info!(mode = ?config.control.enforce_mode, "Control plane ready");

    let report = scenario::run(&control).context("Scenario failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.filter.clone().into());
    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
