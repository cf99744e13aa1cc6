// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use clap::*;
use colored::Colorize;
use goslang::config::{GeneralConfig, OutputConfig};
use goslang::driver::execute;
use log::debug;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

#[derive(Parser)]
#[clap(
    name = env!("CARGO_BIN_NAME"),
    about = "Translates GoSlang programs into the tagged JSON intermediate representation",
    rename_all = "kebab-case",
    author,
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Args {
    /// Source files to translate; reads stdin when none (or `-`) is given
    pub files: Vec<PathBuf>,

    /// General options
    #[clap(flatten)]
    pub general_config: GeneralConfig,

    /// Output options
    #[clap(flatten)]
    pub output_config: OutputConfig,
}

fn main() {
    #[cfg(windows)]
    let _ = colored::control::set_virtual_terminal(true);

    let args = Args::parse();
    init_logger(&args.general_config);

    debug!("GoSlang CLI version: {}", env!("CARGO_PKG_VERSION"));

    if let Err(err) = execute(&args.files, &args.output_config) {
        let err = format!("{:?}", err);
        eprintln!("{}", err.bold().red());
        std::process::exit(1);
    }
}

fn init_logger(config: &GeneralConfig) {
    let log_config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .build();
    // Only fails if a logger is already installed.
    let _ = TermLogger::init(
        config.level_filter(),
        log_config,
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
}
