use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::{build::Build, check_config::CheckConfig, info::Info};

mod build;
mod check_config;
mod info;
mod source;

#[derive(Parser)]
#[clap(name = "vtile", about = "Generates vector map tiles from OpenStreetMap extracts")]
struct Options {
	/// Enable debug-level logging.
	#[clap(long, global = true)]
	verbose: bool,
	#[clap(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	Build(Build),
	Info(Info),
	CheckConfig(CheckConfig),
}

fn main() -> ExitCode {
	let opts: Options = Options::parse();

	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if opts.verbose { "debug" } else { "info" }))
		.format_timestamp(None)
		.init();

	let result = match opts.command {
		Command::Build(args) => build::run(args),
		Command::Info(args) => info::run(args),
		Command::CheckConfig(args) => check_config::run(args),
	};

	match result {
		Ok(code) => code,
		Err(err) => {
			log::error!("{:#}", err);
			ExitCode::FAILURE
		},
	}
}
