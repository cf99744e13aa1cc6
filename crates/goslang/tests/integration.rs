// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use std::fs;

use goslang::parse_to_json;
use goslang_ir::{parse, render, RenderStyle};

/// Every sample program renders to its recorded IR, and that IR reads back.
#[test]
fn run_program_snapshots() {
    let mut count = 0;
    for entry in glob::glob("tests/programs/*.go").expect("Invalid glob pattern") {
        let path = entry.expect("Failed to read file path");
        let source = fs::read_to_string(&path).expect("Failed to read program");
        let output = parse_to_json(&source);

        let parsed = parse(&output).expect("IR does not parse back");
        assert_eq!(render(&parsed, RenderStyle::Pretty).unwrap(), output);

        let name = path.file_stem().unwrap().to_string_lossy().to_string();
        insta::with_settings!({
            prepend_module_to_snapshot => false,
            snapshot_path => "snapshots",
        }, {
            insta::assert_snapshot!(name, output);
        });
        count += 1;
    }
    assert!(count > 0, "no sample programs found");
}

#[test]
fn output_is_plain_json() {
    let output = parse_to_json(&fs::read_to_string("tests/programs/factorial.go").unwrap());
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["tag"], "package");
    assert_eq!(value["decls"][0]["name"], "factorial");
    assert_eq!(value["decls"][0]["type"]["resultTypes"][0]["val"], "int");
    assert_eq!(value["decls"][1]["body"]["body"]["stmts"][0]["tag"], "constDecl");
}
