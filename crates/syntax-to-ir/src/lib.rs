// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Syntax-to-IR translation
//!
//! Maps checked GoSlang syntax trees onto the tagged IR of `goslang-ir`.
//! Supported constructs get their own node; everything else is encoded as an
//! `error` node at the position it occupies, so translation of the rest of
//! the program carries on.

pub mod translation;

pub use translation::pipeline::{translate_package, translate_source};
pub use translation::{
    DeclarationTranslator, ExpressionTranslator, LiteralTranslator, SignatureTranslator,
    StatementTranslator, TranslationOutcome, TranslationPipeline,
};
