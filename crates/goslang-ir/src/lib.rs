// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! GoSlang IR
//!
//! The tagged node tree produced by the translator and consumed by
//! downstream evaluators, plus its canonical JSON rendering.

mod node;
mod render;

pub use node::{Literal, Node};
pub use render::{parse, render, RenderStyle};
