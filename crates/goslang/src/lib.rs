// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! GoSlang host binding
//!
//! [`parse_to_json`] is the single entry point exposed to embedders: it takes
//! program text and returns the IR as pretty-printed JSON. Problems with the
//! program never surface as a Rust error; they are `error` nodes in the
//! returned document.

pub mod config;
pub mod driver;

use goslang_ir::{render, RenderStyle};
use log::error;
use syntax_to_ir::translate_source;

/// Translates `source` and renders the IR with two-space indentation.
/// Returns an empty string only if the IR could not be serialized.
pub fn parse_to_json(source: &str) -> String {
    let ir = translate_source(source);
    match render(&ir, RenderStyle::Pretty) {
        Ok(json) => json,
        Err(err) => {
            error!("failed to serialize IR: {}", err);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frontend_error_document() {
        assert_eq!(
            parse_to_json("package main\n\nfunc main() {\n\tprintln(y)\n}\n"),
            "{\n  \"tag\": \"error\",\n  \"val\": \"4:10: undefined: y\"\n}"
        );
    }

    #[test]
    fn test_empty_package() {
        assert_eq!(
            parse_to_json("package main\n"),
            "{\n  \"tag\": \"package\",\n  \"decls\": []\n}"
        );
    }
}
