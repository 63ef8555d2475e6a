use clap::{value_parser, Arg, ArgAction, ArgGroup, ArgMatches, Command};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use dsync::config::Config;
use dsync::error::SyncError;
use dsync::logging::*;
use dsync::progress::{query_report, ProgressReporter};
use dsync::protocol::{Channel, RemoteDestination};
use dsync::serve;
use dsync::state::Report;
use dsync::strategies::RemovePolicy;
use dsync::sync::{SourceEngine, SourceOptions};

/// Failed steps `--once` tolerates before printing the report anyway
const ONCE_FAILURE_BUDGET: usize = 20;

/////////
// CLI //
/////////

fn cli() -> Command {
	Command::new("dsync")
		.version("0.1.0")
		.author("Szilard Hajba <szilard@symbion.hu>")
		.about("One-way directory replication")
		.arg(Arg::new("src").long("src").action(ArgAction::SetTrue).help("Run as source"))
		.arg(Arg::new("dest").long("dest").action(ArgAction::SetTrue).help("Run as destination"))
		.arg(
			Arg::new("progress")
				.long("progress")
				.action(ArgAction::SetTrue)
				.help("Query a running source for its progress report"),
		)
		.group(ArgGroup::new("role").args(["src", "dest", "progress"]).required(true))
		.arg(Arg::new("path").long("path").value_name("DIR").help("Managed directory [default: .]"))
		.arg(
			Arg::new("dest-ip")
				.long("dest-ip")
				.value_name("HOST")
				.help("Destination host [default: 127.0.0.1]"),
		)
		.arg(
			Arg::new("dest-port")
				.long("dest-port")
				.value_name("PORT")
				.value_parser(value_parser!(u16))
				.help("Destination port [default: 9898]"),
		)
		.arg(
			Arg::new("src-port")
				.long("src-port")
				.value_name("PORT")
				.value_parser(value_parser!(u16))
				.help("Local port for the connection to the destination [default: 0 = any]"),
		)
		.arg(
			Arg::new("prog-ip")
				.long("prog-ip")
				.value_name("HOST")
				.help("Progress reporter host [default: 127.0.0.1]"),
		)
		.arg(
			Arg::new("prog-port")
				.long("prog-port")
				.value_name("PORT")
				.value_parser(value_parser!(u16))
				.help("Progress reporter port [default: 9696]"),
		)
		.arg(
			Arg::new("verbose")
				.short('v')
				.long("verbose")
				.action(ArgAction::SetTrue)
				.help("Debug logging"),
		)
		.arg(
			Arg::new("config")
				.short('c')
				.long("config")
				.value_name("FILE")
				.help("Config file (.toml, otherwise JSON5)"),
		)
		.arg(
			Arg::new("remove-policy")
				.long("remove-policy")
				.value_name("POLICY")
				.value_parser(value_parser!(RemovePolicy))
				.help("Remote files missing locally: never | mirror [default: never]"),
		)
		.arg(
			Arg::new("poll-interval")
				.long("poll-interval")
				.value_name("SECS")
				.value_parser(value_parser!(u64))
				.help("Rescan interval when idle [default: 3]"),
		)
		.arg(
			Arg::new("timeout")
				.long("timeout")
				.value_name("SECS")
				.value_parser(value_parser!(u64))
				.help("Request timeout [default: 30]"),
		)
		.arg(
			Arg::new("no-progress")
				.long("no-progress")
				.action(ArgAction::SetTrue)
				.help("Do not start the progress reporter"),
		)
		.arg(
			Arg::new("once")
				.long("once")
				.action(ArgAction::SetTrue)
				.help("Source: sync until both queues are empty, print the report and exit"),
		)
}

/// Defaults, then config file, then environment, then flags
fn load_config(matches: &ArgMatches) -> Result<Config, SyncError> {
	let mut config = match matches.get_one::<String>("config") {
		Some(file) => Config::load(Path::new(file))?,
		None => Config::default(),
	};
	config.apply_env()?;

	if let Some(path) = matches.get_one::<String>("path") {
		config.path = PathBuf::from(path);
	}
	if let Some(host) = matches.get_one::<String>("dest-ip") {
		config.dest_host = host.clone();
	}
	if let Some(port) = matches.get_one::<u16>("dest-port") {
		config.dest_port = *port;
	}
	if let Some(port) = matches.get_one::<u16>("src-port") {
		config.src_port = *port;
	}
	if let Some(host) = matches.get_one::<String>("prog-ip") {
		config.prog_host = host.clone();
	}
	if let Some(port) = matches.get_one::<u16>("prog-port") {
		config.prog_port = *port;
	}
	if let Some(policy) = matches.get_one::<RemovePolicy>("remove-policy") {
		config.remove_policy = *policy;
	}
	if let Some(secs) = matches.get_one::<u64>("poll-interval") {
		config.poll_interval_ms = secs.saturating_mul(1000);
	}
	if let Some(secs) = matches.get_one::<u64>("timeout") {
		config.request_timeout_secs = *secs;
	}
	if matches.get_flag("no-progress") {
		config.progress_enabled = false;
	}
	if matches.get_flag("verbose") {
		config.verbose = true;
	}

	config.validate()?;
	Ok(config)
}

///////////
// Roles //
///////////

async fn run_source(config: Config, once: bool) -> Result<(), SyncError> {
	let options = SourceOptions::from_config(&config)?;
	let addr = config.dest_addr();
	let channel =
		Channel::new(addr.clone(), config.request_timeout()).with_local_port(config.src_port);
	let destination = RemoteDestination::connect(channel)
		.await
		.map_err(|source| SyncError::ConnectFailed { addr, source })?;

	let mut engine = SourceEngine::new(&config.path, destination, options);

	if config.progress_enabled {
		let reporter = ProgressReporter::bind(&config.prog_bind_addr(), engine.state()).await?;
		tokio::spawn(async move {
			if let Err(e) = reporter.run().await {
				error!("progress reporter stopped: {}", e);
			}
		});
	}

	if once {
		let report = engine.run_until_idle(ONCE_FAILURE_BUDGET).await;
		print_report(&report)
	} else {
		engine.run().await;
		Ok(())
	}
}

async fn run_progress(config: &Config) -> Result<(), SyncError> {
	let report = query_report(&config.prog_addr(), config.request_timeout()).await?;
	print_report(&report)
}

fn print_report(report: &Report) -> Result<(), SyncError> {
	let json = serde_json::to_string(report).map_err(|e| SyncError::Other {
		message: format!("Cannot encode report: {}", e),
	})?;
	println!("{}", json);
	Ok(())
}

async fn run(matches: ArgMatches) -> Result<(), SyncError> {
	let config = load_config(&matches)?;
	init_tracing(config.verbose);

	if matches.get_flag("dest") {
		serve::serve(&config).await
	} else if matches.get_flag("src") {
		run_source(config, matches.get_flag("once")).await
	} else {
		run_progress(&config).await
	}
}

#[tokio::main]
async fn main() -> ExitCode {
	match run(cli().get_matches()).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			eprintln!("dsync: {}", e);
			ExitCode::FAILURE
		}
	}
}

// vim: ts=4
