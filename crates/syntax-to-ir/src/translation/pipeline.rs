// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Translation pipeline orchestrator
//!
//! Parse, check, then translate every top-level declaration in source order.
//! Any frontend failure short-circuits to a single `error` node carrying the
//! diagnostic verbatim.

use goslang_ir::Node;
use goslang_syntax::ast::File;
use goslang_syntax::{parse_and_check, FrontendError};
use log::{debug, info};

use super::DeclarationTranslator;

/// Result of running the pipeline over one source text.
#[derive(Debug)]
pub struct TranslationOutcome {
    pub ir: Node,
    /// Set when parsing or checking rejected the program.
    pub frontend_error: Option<FrontendError>,
}

pub struct TranslationPipeline<'s> {
    source: &'s str,
}

impl<'s> TranslationPipeline<'s> {
    pub fn new(source: &'s str) -> Self {
        Self { source }
    }

    pub fn run(&self) -> TranslationOutcome {
        // Step 1: parse and check; nothing is translated past a failure
        let file = match parse_and_check(self.source) {
            Ok(file) => file,
            Err(err) => {
                debug!("frontend rejected program: {}", err);
                return TranslationOutcome {
                    ir: Node::error(err.to_string()),
                    frontend_error: Some(err),
                };
            }
        };

        // Step 2: translate declarations
        let ir = translate_package(&file);
        info!(
            "translated package {} ({} declarations, {} error nodes)",
            file.package.name,
            file.decls.len(),
            ir.count_errors()
        );
        TranslationOutcome {
            ir,
            frontend_error: None,
        }
    }
}

/// Translates an already checked file.
pub fn translate_package(file: &File) -> Node {
    Node::Package {
        decls: file
            .decls
            .iter()
            .map(|decl| DeclarationTranslator.translate(decl))
            .collect(),
    }
}

/// Parses, checks and translates a whole program.
pub fn translate_source(source: &str) -> Node {
    TranslationPipeline::new(source).run().ir
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_short_circuits() {
        let outcome = TranslationPipeline::new("package main\n\nfunc main() {\n").run();
        assert!(outcome.frontend_error.is_some());
        assert_eq!(
            outcome.ir,
            Node::error("4:1: expected '}', found 'EOF'")
        );
    }

    #[test]
    fn test_type_error_short_circuits() {
        let ir = translate_source("package main\n\nfunc main() {\n\tvar x int = 1\n}\n");
        assert_eq!(ir, Node::error("4:6: declared and not used: x"));
    }

    #[test]
    fn test_declarations_keep_source_order() {
        let ir = translate_source(
            "package main\n\nfunc b() {}\n\nconst a int = 1\n\nfunc main() { b() }\n",
        );
        let Node::Package { decls } = ir else {
            panic!("expected package");
        };
        assert_eq!(
            decls.iter().map(Node::tag).collect::<Vec<_>>(),
            vec!["funcDecl", "constDecl", "funcDecl"]
        );
    }
}
