//! Main entry point for the demlik order service.
//!
//! This binary wires the identity gateway, the order store, and the change
//! feed into the shop engine, then serves the HTTP API. Both pluggable
//! components are selected by name from configuration, with an in-memory
//! and a hosted-backend implementation each.

use clap::Parser;
use demlik_config::Config;
use demlik_core::ShopEngine;
use demlik_identity::{IdentityInterface, IdentityService};
use demlik_notify::ChangeFeed;
use demlik_store::{StoreInterface, StoreService};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

mod server;

/// Command-line arguments for the demlik service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(args.log_level.clone()));

	fmt().with_env_filter(env_filter).with_target(true).init();

	let config = Config::from_file(&args.config)?;
	tracing::info!("Loaded configuration [{}]", config.shop.id);

	let engine = Arc::new(build_engine(&config)?);

	// Log change signals; push consumers attach to the feed the same way.
	let mut changes = engine.feed().subscribe();
	tokio::spawn(async move {
		while let Ok(event) = changes.recv().await {
			tracing::debug!(table = %event.table, kind = ?event.kind, "change signal");
		}
	});

	match config.api.clone().filter(|api| api.enabled) {
		Some(api_config) => server::start_server(api_config, engine).await?,
		None => {
			tracing::warn!("API server disabled in configuration; nothing to serve");
		}
	}

	tracing::info!("Stopped");
	Ok(())
}

/// Builds the shop engine from configuration.
///
/// Each pluggable section names a `primary` implementation; its factory is
/// looked up among the registered implementations and handed that
/// implementation's configuration table.
fn build_engine(config: &Config) -> Result<ShopEngine, Box<dyn std::error::Error>> {
	let identity = wire_identity(
		&config.identity.primary,
		&config.identity.implementations,
	)?;
	let store = wire_store(&config.store.primary, &config.store.implementations)?;

	Ok(ShopEngine::new(
		Arc::new(IdentityService::new(identity)),
		Arc::new(StoreService::new(store)),
		ChangeFeed::new(),
	))
}

fn wire_identity(
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<Box<dyn IdentityInterface>, Box<dyn std::error::Error>> {
	let section = implementations
		.get(primary)
		.ok_or_else(|| format!("no configuration section for identity '{}'", primary))?;
	let (_, factory) = demlik_identity::get_all_implementations()
		.into_iter()
		.find(|(name, _)| *name == primary)
		.ok_or_else(|| format!("unknown identity implementation '{}'", primary))?;

	let backend = factory(section)?;
	backend.config_schema().validate(section)?;
	tracing::info!(implementation = primary, "wired identity gateway");
	Ok(backend)
}

fn wire_store(
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<Box<dyn StoreInterface>, Box<dyn std::error::Error>> {
	let section = implementations
		.get(primary)
		.ok_or_else(|| format!("no configuration section for store '{}'", primary))?;
	let (_, factory) = demlik_store::get_all_implementations()
		.into_iter()
		.find(|(name, _)| *name == primary)
		.ok_or_else(|| format!("unknown store implementation '{}'", primary))?;

	let backend = factory(section)?;
	backend.config_schema().validate(section)?;
	tracing::info!(implementation = primary, "wired order store");
	Ok(backend)
}
