//! This module contains the main entrypoint to the quarry cli.

use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

mod train;

#[derive(Parser)]
#[clap(
	about = "Tune and evaluate a regression workflow on a csv file.",
	setting = clap::AppSettings::DisableHelpSubcommand,
)]
enum Options {
	#[clap(name = "train")]
	Train(TrainArgs),
}

#[derive(Parser, Debug)]
#[clap(about = "tune a model with cross validation and evaluate it on a held out test set")]
pub struct TrainArgs {
	#[clap(short, long, help = "the path to your .csv file")]
	file: PathBuf,
	#[clap(short, long, help = "the name of the column to predict")]
	target: String,
	#[clap(short, long, help = "the path to a .yaml or .json config file")]
	config: Option<PathBuf>,
	#[clap(short, long, help = "the path to write the json report to")]
	output: Option<PathBuf>,
	#[clap(long = "no-parallel", help = "evaluate the grid on a single thread")]
	no_parallel: bool,
}

fn main() {
	let env = env_logger::Env::default().default_filter_or("info");
	env_logger::Builder::from_env(env)
		.format_module_path(false)
		.format_timestamp(None)
		.init();
	let options = Options::parse();
	let result = match options {
		Options::Train(args) => self::train::train(args),
	};
	if let Err(error) = result {
		eprintln!("{}: {:#}", "error".red().bold(), error);
		std::process::exit(1);
	}
}
