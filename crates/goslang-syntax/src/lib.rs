// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! GoSlang frontend
//!
//! Turns source text into a checked syntax tree. Parsing and checking are
//! both fail-fast: the first problem is reported as a [`FrontendError`]
//! rendering as `line:column: message`.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod typeck;

use log::debug;

pub use ast::File;
pub use error::{FrontendError, Position, SyntaxError, TypeError};
pub use parser::parse_file;
pub use token::Span;
pub use typeck::check;

/// Parses and checks a whole program.
pub fn parse_and_check(source: &str) -> Result<File, FrontendError> {
    let file = parse_file(source)?;
    debug!(
        "parsed package {} with {} declarations",
        file.package.name,
        file.decls.len()
    );
    check(&file, source)?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_errors_win_over_type_errors() {
        let err = parse_and_check("package main\n\nfunc main() {\n\tx := \n}\n").unwrap_err();
        assert!(matches!(err, FrontendError::Syntax(_)));
        assert_eq!(err.to_string(), "5:1: expected operand, found '}'");
    }

    #[test]
    fn test_type_errors_are_reported() {
        let err = parse_and_check("package main\n\nfunc main() {\n\tprintln(y)\n}\n").unwrap_err();
        assert!(matches!(err, FrontendError::Type(_)));
        assert_eq!(err.to_string(), "4:10: undefined: y");
    }

    #[test]
    fn test_valid_program_yields_tree() {
        let file = parse_and_check("package main\n\nfunc main() {\n\tprintln(1)\n}\n").unwrap();
        assert_eq!(file.package.name, "main");
        assert_eq!(file.decls.len(), 1);
    }
}
