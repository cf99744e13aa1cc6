// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Frontend diagnostics.
//!
//! Both error kinds render as `line:column: message`, the format downstream
//! consumers receive verbatim inside the top-level `error` node.

use std::fmt::{self, Display, Formatter};

use codespan_reporting::diagnostic::{Diagnostic, Label};
use thiserror::Error;

use crate::token::Span;

/// 1-based line and column (in bytes) of a source offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn of(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let prefix = &source.as_bytes()[..offset];
        let line = prefix.iter().filter(|&&b| b == b'\n').count() + 1;
        let column = match prefix.iter().rposition(|&b| b == b'\n') {
            Some(newline) => offset - newline,
            None => offset + 1,
        };
        Position { line, column }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Lexing or parsing failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{position}: {message}")]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
    pub position: Position,
}

impl SyntaxError {
    pub fn new(source: &str, span: Span, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span,
            position: Position::of(source, span.start),
        }
    }
}

/// Semantic failure reported by the checker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{position}: {message}")]
pub struct TypeError {
    pub message: String,
    pub span: Span,
    pub position: Position,
}

impl TypeError {
    pub fn new(source: &str, span: Span, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span,
            position: Position::of(source, span.start),
        }
    }
}

/// Any failure before translation starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrontendError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Type(#[from] TypeError),
}

impl FrontendError {
    pub fn message(&self) -> &str {
        match self {
            FrontendError::Syntax(err) => &err.message,
            FrontendError::Type(err) => &err.message,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            FrontendError::Syntax(err) => err.span,
            FrontendError::Type(err) => err.span,
        }
    }

    /// Rich diagnostic pointing at the offending source range.
    pub fn to_diagnostic(&self) -> Diagnostic<()> {
        let (header, label) = match self {
            FrontendError::Syntax(_) => ("syntax error", "parsing stopped here"),
            FrontendError::Type(_) => ("type error", "rejected by the checker"),
        };
        let span = self.span();
        Diagnostic::error()
            .with_message(format!("{}: {}", header, self.message()))
            .with_labels(vec![Label::primary((), span.start..span.end.max(span.start + 1))
                .with_message(label)])
    }
}
