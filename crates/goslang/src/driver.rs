// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Command-line driver: read sources, translate, report, write IR.

use std::fmt::{Display, Formatter};
use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use codespan_reporting::files::SimpleFile;
use codespan_reporting::term::{
    self,
    termcolor::{ColorChoice, StandardStream, WriteColor},
};
use goslang_ir::render;
use log::{debug, info, warn};
use syntax_to_ir::{TranslationOutcome, TranslationPipeline};

use crate::config::OutputConfig;

/// Where a program is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    File(PathBuf),
}

impl Input {
    /// No paths, or a lone `-`, means stdin.
    pub fn from_paths(paths: &[PathBuf]) -> Vec<Input> {
        if paths.is_empty() {
            return vec![Input::Stdin];
        }
        paths
            .iter()
            .map(|path| {
                if path.as_os_str() == "-" {
                    Input::Stdin
                } else {
                    Input::File(path.clone())
                }
            })
            .collect()
    }

    pub fn read(&self) -> anyhow::Result<String> {
        match self {
            Input::Stdin => {
                let mut source = String::new();
                io::stdin()
                    .read_to_string(&mut source)
                    .context("failed to read program from stdin")?;
                Ok(source)
            }
            Input::File(path) => fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display())),
        }
    }
}

impl Display for Input {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Input::Stdin => write!(f, "<stdin>"),
            Input::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// One translated program.
pub struct Translation {
    pub input: Input,
    pub source: String,
    pub outcome: TranslationOutcome,
}

impl Translation {
    pub fn run(input: Input) -> anyhow::Result<Self> {
        let source = input.read()?;
        debug!("translating {} ({} bytes)", input, source.len());
        let outcome = TranslationPipeline::new(&source).run();
        Ok(Self {
            input,
            source,
            outcome,
        })
    }

    pub fn error_count(&self) -> usize {
        self.outcome.ir.count_errors()
    }

    /// Emits the rich form of a frontend failure, if there was one.
    pub fn report<W: WriteColor>(&self, writer: &mut W) -> anyhow::Result<()> {
        let Some(err) = &self.outcome.frontend_error else {
            return Ok(());
        };
        let file = SimpleFile::new(self.input.to_string(), self.source.as_str());
        term::emit(writer, &term::Config::default(), &file, &err.to_diagnostic())
            .with_context(|| format!("failed to report diagnostic for {}", self.input))
    }
}

/// Translates every input, writes the IR, and enforces `--strict`.
pub fn execute(paths: &[PathBuf], config: &OutputConfig) -> anyhow::Result<()> {
    let style = config.render_style();
    let color = if io::stderr().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let stderr = StandardStream::stderr(color);

    let mut documents = Vec::new();
    let mut error_nodes = 0;
    for input in Input::from_paths(paths) {
        let translation = Translation::run(input)?;
        translation.report(&mut stderr.lock())?;

        for message in translation.outcome.ir.errors() {
            warn!("{}: {}", translation.input, message);
        }
        error_nodes += translation.error_count();

        let text = render(&translation.outcome.ir, style)
            .with_context(|| format!("failed to serialize IR for {}", translation.input))?;
        documents.push(text);
    }
    info!(
        "translated {} program(s), {} error node(s)",
        documents.len(),
        error_nodes
    );

    write_output(config.output.as_deref(), &documents)?;

    if config.strict && error_nodes > 0 {
        bail!("strict mode: generated IR contains {} error node(s)", error_nodes);
    }
    Ok(())
}

fn write_output(path: Option<&Path>, documents: &[String]) -> anyhow::Result<()> {
    let mut text = documents.join("\n");
    text.push('\n');
    match path {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display())),
        None => io::stdout()
            .lock()
            .write_all(text.as_bytes())
            .context("failed to write IR to stdout"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codespan_reporting::term::termcolor::Buffer;

    #[test]
    fn test_inputs_from_paths() {
        assert_eq!(Input::from_paths(&[]), vec![Input::Stdin]);
        assert_eq!(
            Input::from_paths(&[PathBuf::from("-"), PathBuf::from("a.go")]),
            vec![Input::Stdin, Input::File(PathBuf::from("a.go"))]
        );
        assert_eq!(Input::Stdin.to_string(), "<stdin>");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = Input::File(PathBuf::from("does/not/exist.go"))
            .read()
            .unwrap_err();
        assert_eq!(err.to_string(), "failed to read does/not/exist.go");
    }

    #[test]
    fn test_report_renders_snippet() {
        let source = "package main\n\nfunc main() {\n\tprintln(y)\n}\n".to_string();
        let translation = Translation {
            input: Input::File(PathBuf::from("bad.go")),
            outcome: TranslationPipeline::new(&source).run(),
            source,
        };
        let mut buffer = Buffer::no_color();
        translation.report(&mut buffer).unwrap();
        let text = String::from_utf8(buffer.into_inner()).unwrap();
        assert!(text.contains("type error: undefined: y"));
        assert!(text.contains("bad.go:4:10"));
        assert!(text.contains("println(y)"));
    }

    #[test]
    fn test_report_is_silent_for_valid_programs() {
        let source = "package main\n\nfunc main() {\n\tprintln(1)\n}\n".to_string();
        let translation = Translation {
            input: Input::Stdin,
            outcome: TranslationPipeline::new(&source).run(),
            source,
        };
        let mut buffer = Buffer::no_color();
        translation.report(&mut buffer).unwrap();
        assert!(buffer.into_inner().is_empty());
        assert_eq!(translation.error_count(), 0);
    }
}
