// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use clap::Args;
use goslang_ir::RenderStyle;
use log::LevelFilter;

/// General options
#[derive(Args, Debug, Clone, Default)]
#[clap(next_help_heading = "General Options")]
pub struct GeneralConfig {
    /// Display detailed translation progress
    #[clap(name = "verbose", long, short = 'v', global = true)]
    pub verbose: bool,

    /// Log level (off, error, warn, info, debug, trace); overrides --verbose
    #[clap(name = "log-level", long, env = "GOSLANG_LOG", global = true, value_parser = parse_level)]
    pub log_level: Option<LevelFilter>,
}

fn parse_level(value: &str) -> Result<LevelFilter, String> {
    value
        .parse()
        .map_err(|_| format!("unknown log level `{}`", value))
}

impl GeneralConfig {
    pub fn level_filter(&self) -> LevelFilter {
        match self.log_level {
            Some(level) => level,
            None if self.verbose => LevelFilter::Info,
            None => LevelFilter::Warn,
        }
    }
}

/// Output options
#[derive(Args, Debug, Clone, Default)]
#[clap(next_help_heading = "Output Options")]
pub struct OutputConfig {
    /// Print the IR on a single line
    #[clap(name = "compact", long, global = true)]
    pub compact: bool,

    /// Write the IR to this file instead of stdout
    #[clap(name = "output", long, short = 'o', global = true)]
    pub output: Option<PathBuf>,

    /// Exit with an error if the IR contains any error node
    #[clap(name = "strict", long, global = true)]
    pub strict: bool,
}

impl OutputConfig {
    pub fn render_style(&self) -> RenderStyle {
        if self.compact {
            RenderStyle::Compact
        } else {
            RenderStyle::Pretty
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_defaults() {
        let mut config = GeneralConfig::default();
        assert_eq!(config.level_filter(), LevelFilter::Warn);
        config.verbose = true;
        assert_eq!(config.level_filter(), LevelFilter::Info);
        config.log_level = Some(LevelFilter::Trace);
        assert_eq!(config.level_filter(), LevelFilter::Trace);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Ok(LevelFilter::Debug));
        assert_eq!(parse_level("OFF"), Ok(LevelFilter::Off));
        assert_eq!(parse_level("loud"), Err("unknown log level `loud`".to_string()));
    }

    #[test]
    fn test_render_style() {
        let mut config = OutputConfig::default();
        assert_eq!(config.render_style(), RenderStyle::Pretty);
        config.compact = true;
        assert_eq!(config.render_style(), RenderStyle::Compact);
    }
}
