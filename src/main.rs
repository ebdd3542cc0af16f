use clap::{value_parser, Arg, ArgMatches, Command};
use std::error::Error;
use std::path::{Path, PathBuf};

use blocksync::checkpoint::{self, CheckpointLog};
use blocksync::config::Config;
use blocksync::logging::*;
use blocksync::store::Remote;
use blocksync::sync;
use blocksync::types::FileStatus;

///////////////////////
// Utility functions //
///////////////////////

/// Defaults, then config file, then environment, then command line
fn build_config(matches: &ArgMatches, sub_matches: &ArgMatches) -> Result<Config, Box<dyn Error>> {
	let mut config = match matches.get_one::<String>("config") {
		Some(path) => Config::load(Path::new(path))?,
		None => Config::default(),
	};
	config.apply_env()?;

	if let Some(dir) = sub_matches.get_one::<String>("dir") {
		config.base_dir = PathBuf::from(dir);
	}
	if let Some(block_size) = matches.get_one::<usize>("block-size") {
		config.block_size = *block_size;
	}
	if let Some(Some(store)) = sub_matches.try_get_one::<String>("store").ok() {
		config.store_dir = Some(PathBuf::from(store));
	}

	config.validate()?;
	Ok(config)
}

fn status_code(status: FileStatus) -> &'static str {
	match status {
		FileStatus::Unchanged => " ",
		FileStatus::Modified => "M",
		FileStatus::New => "A",
		FileStatus::Deleted => "D",
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
	let dir_arg = || Arg::new("dir").help("Directory to sync (defaults to baseDir from config)");

	let matches = Command::new("blocksync")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Block-level directory sync against a versioned store")
		.subcommand_required(true)
		.arg(
			Arg::new("config")
				.short('c')
				.long("config")
				.value_name("FILE")
				.help("Config file (TOML, or JSON5 with .json/.json5 extension)"),
		)
		.arg(
			Arg::new("block-size")
				.short('b')
				.long("block-size")
				.value_name("BYTES")
				.value_parser(value_parser!(usize))
				.help("Block size in bytes"),
		)
		.subcommand(
			Command::new("sync").about("Run one sync pass").arg(dir_arg()).arg(
				Arg::new("store")
					.short('s')
					.long("store")
					.value_name("STORE_DIR")
					.help("Store directory shared by all clients"),
			),
		)
		.subcommand(Command::new("status").about("Show local changes since the last sync").arg(dir_arg()))
		.subcommand(Command::new("dump").about("Print the checkpoint log").arg(dir_arg()))
		.get_matches();

	let (name, sub_matches) = matches.subcommand().ok_or("subcommand required")?;
	let config = build_config(&matches, sub_matches)?;
	init_tracing(&config.log_level);

	match name {
		"sync" => {
			let store_dir = config
				.store_dir
				.clone()
				.ok_or("sync: no store directory given (use --store or storeDir in config)")?;
			let remote = Remote::open_dir(&store_dir)?;
			let result = sync::sync(&config, &remote).await?;
			if !result.is_clean() {
				warn!(
					"{} files abandoned and {} skipped; they will be retried on the next run",
					result.files_failed, result.files_skipped
				);
			}
		}
		"status" => {
			let changes = sync::status(&config).await?;
			for (name, entry) in &changes.entries {
				if entry.status != FileStatus::Unchanged {
					println!("{} {} (v{})", status_code(entry.status), name, entry.metadata.version);
				}
			}
			for name in &changes.skipped {
				println!("? {}", name);
			}
		}
		"dump" => {
			let log = CheckpointLog::load(&config.index_path()).await?;
			for record in log.iter() {
				println!("{}", checkpoint::format_line(record));
			}
		}
		_ => unreachable!("subcommand_required"),
	}

	Ok(())
}

// vim: ts=4
