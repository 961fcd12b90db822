//! Command-line probe for blockchain nodes.
//!
//! Loads a client configuration, then queries the configured endpoints through the failover
//! client or streams events from one endpoint's streaming address.
//!
//! # Subcommands
//! - `status`: chain id, head height, sync state and endpoint health
//! - `balance`: balance of an address, optionally at a given height
//! - `block`: block at a given height
//! - `watch`: prints subscription events until Ctrl+C

pub mod bootstrap;
pub mod models;
pub mod services;
pub mod utils;

use std::{path::PathBuf, time::Duration};

use clap::{Arg, ArgAction, ArgMatches, Command};
use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
	bootstrap::{
		collect_status, forward_events, initialize_client, load_client_config,
		select_streaming_endpoint, Result,
	},
	models::{ClientConfig, StateAnchor, SubscriptionType},
	services::blockchain::{
		create_subscription_client, BlockChainClient, CallContext, WsConfig,
	},
	utils::logging::setup_logging,
};

fn cli() -> Command {
	Command::new("chain-access")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Queries blockchain nodes through prioritized endpoints with automatic failover.")
		.subcommand_required(true)
		.arg(
			Arg::new("config")
				.long("config")
				.help("Path to the JSON client configuration")
				.value_name("FILE")
				.required(true)
				.global(true),
		)
		.arg(
			Arg::new("log-level")
				.long("log-level")
				.help("Set log level (trace, debug, info, warn, error)")
				.value_name("LEVEL")
				.global(true),
		)
		.subcommand(Command::new("status").about("Shows chain and endpoint status"))
		.subcommand(
			Command::new("balance")
				.about("Shows the balance of an address")
				.arg(Arg::new("address").required(true).value_name("ADDRESS"))
				.arg(
					Arg::new("height")
						.long("height")
						.help("Read the balance at this block height")
						.value_name("HEIGHT")
						.value_parser(clap::value_parser!(u64)),
				),
		)
		.subcommand(
			Command::new("block")
				.about("Shows the block at a height")
				.arg(
					Arg::new("height")
						.required(true)
						.value_name("HEIGHT")
						.value_parser(clap::value_parser!(u64)),
				)
				.arg(
					Arg::new("full")
						.long("full")
						.help("Include full transactions")
						.action(ArgAction::SetTrue),
				),
		)
		.subcommand(
			Command::new("watch")
				.about("Streams events until interrupted")
				.arg(
					Arg::new("type")
						.required(true)
						.value_name("TYPE")
						.value_parser(["newHeads", "logs", "newPendingTxs"]),
				)
				.arg(
					Arg::new("endpoint")
						.long("endpoint")
						.help("Endpoint to stream from (default: preferred endpoint with a streaming address)")
						.value_name("NAME"),
				)
				.arg(
					Arg::new("resume-token")
						.long("resume-token")
						.help("Resume after the event carrying this token")
						.value_name("TOKEN"),
				),
		)
}

/// Main entry point of the probe.
///
/// # Errors
/// Returns an error if the configuration cannot be loaded or a query fails.
#[tokio::main]
async fn main() -> Result<()> {
	let matches = cli().get_matches();

	// Load environment variables from .env file
	dotenv().ok();

	setup_logging(matches.get_one::<String>("log-level").map(String::as_str)).unwrap_or_else(
		|e| {
			eprintln!("Failed to setup logging: {}", e);
		},
	);

	let config_path = matches
		.get_one::<String>("config")
		.map(PathBuf::from)
		.ok_or_else(|| anyhow::anyhow!("--config is required"))?;
	let config = load_client_config(&config_path)?;

	let result = match matches.subcommand() {
		Some(("status", _)) => run_status(config).await,
		Some(("balance", args)) => run_balance(config, args).await,
		Some(("block", args)) => run_block(config, args).await,
		Some(("watch", args)) => run_watch(config, args).await,
		_ => Err(anyhow::anyhow!("Unknown subcommand").into()),
	};

	if let Err(e) = &result {
		error!("{}", e);
	}
	result
}

fn request_context(config: &ClientConfig) -> CallContext {
	// Room for every attempt plus the backoff between them.
	let attempts = config.retry_attempts.max(1);
	let budget = config.timeout.saturating_mul(attempts)
		+ utils::retry::total_backoff(config.retry_backoff, attempts);
	CallContext::with_timeout(budget)
}

async fn run_status(config: ClientConfig) -> Result<()> {
	let ctx = request_context(&config);
	let client = initialize_client(config)?;
	let report = collect_status(&client, &ctx).await;
	client.close().await?;
	let report = report?;

	println!("chain id:  {}", report.chain_id);
	println!("head:      {}", report.head);
	if report.sync.syncing {
		println!(
			"syncing:   {} / {}",
			report.sync.current_block, report.sync.highest_block
		);
	} else {
		println!("syncing:   no");
	}
	for endpoint in report.endpoints {
		let last_check = endpoint
			.last_check
			.map(|time| time.to_rfc3339())
			.unwrap_or_else(|| "never".to_string());
		println!(
			"endpoint:  {} (priority {}) {} last check {}",
			endpoint.name, endpoint.priority, endpoint.health, last_check
		);
	}
	Ok(())
}

async fn run_balance(config: ClientConfig, args: &ArgMatches) -> Result<()> {
	let address = args
		.get_one::<String>("address")
		.ok_or_else(|| anyhow::anyhow!("ADDRESS is required"))?;
	let anchor = args.get_one::<u64>("height").copied().map(StateAnchor::at_height);

	let ctx = request_context(&config);
	let client = initialize_client(config)?;
	let balance = client.get_balance(&ctx, address, anchor).await;
	client.close().await?;
	let balance = balance?;

	println!("{}", serde_json::to_string_pretty(&balance)?);
	Ok(())
}

async fn run_block(config: ClientConfig, args: &ArgMatches) -> Result<()> {
	let height = args
		.get_one::<u64>("height")
		.copied()
		.ok_or_else(|| anyhow::anyhow!("HEIGHT is required"))?;
	let full = args.get_flag("full");

	let ctx = request_context(&config);
	let client = initialize_client(config)?;
	let block = client.get_block_by_height(&ctx, height, full, None).await;
	client.close().await?;
	let block = block?;

	println!("{}", serde_json::to_string_pretty(&block)?);
	Ok(())
}

async fn run_watch(config: ClientConfig, args: &ArgMatches) -> Result<()> {
	let event_type: SubscriptionType = args
		.get_one::<String>("type")
		.ok_or_else(|| anyhow::anyhow!("TYPE is required"))?
		.parse()
		.map_err(|e: String| anyhow::anyhow!(e))?;
	let endpoint = select_streaming_endpoint(
		&config,
		args.get_one::<String>("endpoint").map(String::as_str),
	)?;
	let resume_token = args.get_one::<String>("resume-token").cloned();

	let ws_config = WsConfig::new().with_message_timeout(Duration::from_secs(10));
	let client = create_subscription_client(endpoint, ws_config).await?;
	let subscription = client
		.subscribe(&CallContext::background(), event_type, None, resume_token)
		.await?;
	info!(endpoint = %endpoint.name, subscription = %subscription.id(), "Watching {}", event_type);

	let shutdown = CancellationToken::new();
	let signal = shutdown.clone();
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			info!("Shutdown signal received");
		}
		signal.cancel();
	});

	let last_token = forward_events(subscription, shutdown, |event| {
		match serde_json::to_string(event) {
			Ok(line) => println!("{}", line),
			Err(e) => error!("Failed to encode event: {}", e),
		}
	})
	.await;

	client.close().await?;
	if let Some(token) = last_token {
		info!("Resume with --resume-token {}", token);
	}
	Ok(())
}
