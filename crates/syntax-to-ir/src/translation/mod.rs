// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Translation from GoSlang syntax trees to the tagged IR
//!
//! One translator per construct family:
//! - literal_translator: integer and float literals
//! - expression_translator: operators, identifiers, calls, function literals
//! - signature_translator: parameter and result lists
//! - declaration_translator: const, var and func declarations
//! - statement_translator: assignments, blocks, returns, conditionals, go
//!
//! Translators never fail; unsupported or malformed input becomes an
//! `error` node in place.

pub mod declaration_translator;
pub mod expression_translator;
pub mod literal_translator;
pub mod pipeline;
pub mod signature_translator;
pub mod statement_translator;

pub use declaration_translator::DeclarationTranslator;
pub use expression_translator::ExpressionTranslator;
pub use literal_translator::LiteralTranslator;
pub use pipeline::{TranslationOutcome, TranslationPipeline};
pub use signature_translator::SignatureTranslator;
pub use statement_translator::StatementTranslator;

use goslang_ir::Node;
use log::debug;

/// Error node for a syntax kind outside the supported language.
pub(crate) fn unsupported(kind_name: &str) -> Node {
    debug!("unsupported construct {}", kind_name);
    Node::unsupported(kind_name)
}
