// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use goslang_ir::{Literal, Node};
use syntax_to_ir::translate_source;

fn package_decls(source: &str) -> Vec<Node> {
    match translate_source(source) {
        Node::Package { decls } => decls,
        other => panic!("expected package, got {:?}", other),
    }
}

fn func_body(decl: &Node) -> &[Node] {
    let Node::FuncDecl { body, .. } = decl else {
        panic!("expected funcDecl, got {:?}", decl);
    };
    let Node::Block { body } = body.as_ref() else {
        panic!("expected block, got {:?}", body);
    };
    let Node::Seq { stmts } = body.as_ref() else {
        panic!("expected seq, got {:?}", body);
    };
    stmts
}

fn ident(name: &str) -> Node {
    Node::ident(name)
}

#[test]
fn factorial_program_translates_completely() {
    let decls = package_decls(
        r#"package main

func factorial(n int) int {
	if n == 0 {
		return 1
	} else {
		return n * factorial(n-1)
	}
}

func main() {
	const x int = 4 + 2
	var y int = factorial(x)
	println(y)
}
"#,
    );
    assert_eq!(decls.len(), 2);

    let Node::FuncDecl { name, ty, .. } = &decls[0] else {
        panic!("expected funcDecl");
    };
    assert_eq!(name, "factorial");
    assert_eq!(
        **ty,
        Node::FuncType {
            params: vec![ident("n")],
            results: vec![],
            param_types: vec![ident("int")],
            result_types: vec![ident("int")],
        }
    );
    assert_eq!(
        func_body(&decls[0]),
        [Node::If {
            cond: Box::new(Node::binop("==", ident("n"), Node::int(0))),
            then: Box::new(Node::block(vec![Node::Return {
                results: vec![Node::int(1)]
            }])),
            els: Box::new(Node::block(vec![Node::Return {
                results: vec![Node::binop(
                    "*",
                    ident("n"),
                    Node::call(ident("factorial"), vec![Node::binop("-", ident("n"), Node::int(1))])
                )]
            }])),
        }]
    );

    let main = func_body(&decls[1]);
    assert_eq!(
        main[0],
        Node::ConstDecl {
            spec: Box::new(Node::Spec {
                idents: vec![ident("x")],
                types: vec![ident("int")],
                vals: vec![Node::binop("+", Node::int(4), Node::int(2))],
            })
        }
    );
    assert_eq!(
        main[1],
        Node::VarDecl {
            spec: Box::new(Node::Spec {
                idents: vec![ident("y")],
                types: vec![ident("int")],
                vals: vec![Node::call(ident("factorial"), vec![ident("x")])],
            })
        }
    );
    assert_eq!(main[2], Node::call(ident("println"), vec![ident("y")]));
    assert_eq!(translate_source_errors(&decls), 0);
}

fn translate_source_errors(decls: &[Node]) -> usize {
    decls.iter().map(Node::count_errors).sum()
}

#[test]
fn unnamed_results_have_types_only() {
    let decls = package_decls(
        "package main\n\nfunc triple() (int, int, int) {\n\treturn 1, 2, 3\n}\n\nfunc main() {\n\ta, b, c := triple()\n\tprintln(a, b, c)\n}\n",
    );
    let Node::FuncDecl { ty, .. } = &decls[0] else {
        panic!("expected funcDecl");
    };
    let Node::FuncType {
        results,
        result_types,
        ..
    } = ty.as_ref()
    else {
        panic!("expected funcType");
    };
    assert!(results.is_empty());
    assert_eq!(result_types, &vec![ident("int"); 3]);

    // The tuple-expanding definition itself is outside the supported set.
    assert_eq!(
        func_body(&decls[1])[0],
        Node::error("Only simple assignments are supported")
    );
}

#[test]
fn plain_assignment_translates() {
    let decls = package_decls(
        "package main\n\nfunc main() {\n\tvar x int = 1\n\tvar z int = 2\n\tz = z + x\n\tprintln(z)\n}\n",
    );
    assert_eq!(
        func_body(&decls[0])[2],
        Node::Assign {
            idents: vec![ident("z")],
            vals: vec![Node::binop("+", ident("z"), ident("x"))],
            op: "=".to_string(),
        }
    );
}

#[test]
fn integer_and_float_literals_keep_their_values() {
    let cases = [
        ("42", Literal::Int(42)),
        ("0x7fffffffffffffff", Literal::Int(i64::MAX)),
        ("0o17", Literal::Int(15)),
        ("017", Literal::Int(15)),
        ("0b1_0", Literal::Int(2)),
        ("6.02214076e23", Literal::Float(6.02214076e23)),
        ("0.1", Literal::Float(0.1)),
        ("1e-9", Literal::Float(1e-9)),
    ];
    for (text, expected) in cases {
        let (ty, kind) = match expected {
            Literal::Int(_) => ("int", "int"),
            Literal::Float(_) => ("float64", "float"),
        };
        let source = format!("package main\n\nvar v {} = {}\n\nfunc main() {{}}\n", ty, text);
        let decls = package_decls(&source);
        let Node::VarDecl { spec } = &decls[0] else {
            panic!("expected varDecl for {}", text);
        };
        let Node::Spec { vals, .. } = spec.as_ref() else {
            panic!("expected spec");
        };
        assert_eq!(vals, &vec![Node::Lit(expected)], "literal {} ({})", text, kind);
    }
}

#[test]
fn spec_arity_is_preserved() {
    let decls = package_decls(
        "package main\n\nvar a, b, c int = 1, 2, 3\n\nvar d, e float64\n\nfunc main() {}\n",
    );
    for (decl, names, values) in [(&decls[0], 3, 3), (&decls[1], 2, 0)] {
        let Node::VarDecl { spec } = decl else {
            panic!("expected varDecl");
        };
        let Node::Spec { idents, types, vals } = spec.as_ref() else {
            panic!("expected spec");
        };
        assert_eq!(idents.len(), names);
        assert_eq!(types.len(), names);
        assert_eq!(vals.len(), values);
    }
}

#[test]
fn grouped_declarations_fail_as_a_whole() {
    let decls = package_decls(
        "package main\n\nconst (\n\tlow int = 1\n\thigh int = 9\n)\n\nfunc main() {\n\tprintln(low, high)\n}\n",
    );
    assert_eq!(decls[0], Node::error("Unsupported declaration type"));
    assert_eq!(decls[1].tag(), "funcDecl");
}

#[test]
fn unsupported_statement_is_replaced_in_place() {
    let decls = package_decls(
        r#"package main

func helper() int {
	return 7
}

func main() {
	var total int = 0
	for i := 0; i < 3; i++ {
		total = total + i
	}
	println(total + helper())
}
"#,
    );
    assert_eq!(decls[0].count_errors(), 0);
    let body = func_body(&decls[1]);
    assert_eq!(body.len(), 3);
    assert_eq!(body[0].tag(), "varDecl");
    assert_eq!(body[1], Node::error("Unsupported language feature: ForStmt"));
    assert_eq!(body[2].tag(), "call");
}

#[test]
fn missing_else_is_nop_everywhere() {
    let decls = package_decls(
        "package main\n\nfunc main() {\n\tvar x int = 3\n\tif x > 1 {\n\t\tif x > 2 {\n\t\t\tprintln(x)\n\t\t}\n\t}\n}\n",
    );
    let ifs: Vec<_> = decls[0]
        .iter()
        .filter_map(|node| match node {
            Node::If { els, .. } => Some(els.as_ref()),
            _ => None,
        })
        .collect();
    assert_eq!(ifs, vec![&Node::Nop, &Node::Nop]);
}

#[test]
fn frontend_failures_produce_a_single_error() {
    assert_eq!(
        translate_source("package main\n\nfunc main() {\n\tprintln(missing)\n}\n"),
        Node::error("4:10: undefined: missing")
    );
    assert_eq!(
        translate_source("package main\n\nfunc main() {\n\tx := 1 +\n}\n"),
        Node::error("5:1: expected operand, found '}'")
    );
}

#[test]
fn malformed_numerals_fail_in_the_frontend() {
    assert_eq!(
        translate_source("package main\n\nvar v int = 08\n\nfunc main() {}\n"),
        Node::error("3:14: invalid digit '8' in octal literal")
    );
    assert_eq!(
        translate_source("package main\n\nvar v float64 = 1e\n\nfunc main() {}\n"),
        Node::error("3:19: exponent has no digits")
    );
}

#[test]
fn out_of_range_literals_reach_the_translator() {
    let decls = package_decls(
        "package main\n\nvar big uint64 = 0xFFFFFFFFFFFFFFFF\n\nfunc main() {}\n",
    );
    let Node::VarDecl { spec } = &decls[0] else {
        panic!("expected varDecl");
    };
    let Node::Spec { vals, .. } = spec.as_ref() else {
        panic!("expected spec");
    };
    assert_eq!(
        vals,
        &vec![Node::error(
            r#"strconv.ParseInt: parsing "0xFFFFFFFFFFFFFFFF": value out of range"#
        )]
    );
}

#[test]
fn go_statement_and_function_literals() {
    let decls = package_decls(
        "package main\n\nfunc main() {\n\tvar f func(int) int = func(v int) int { return -v }\n\tgo f(1)\n}\n",
    );
    let body = func_body(&decls[0]);
    let Node::VarDecl { spec } = &body[0] else {
        panic!("expected varDecl");
    };
    let Node::Spec { types, vals, .. } = spec.as_ref() else {
        panic!("expected spec");
    };
    assert_eq!(
        types,
        &vec![Node::FuncType {
            params: vec![],
            results: vec![],
            param_types: vec![ident("int")],
            result_types: vec![ident("int")],
        }]
    );
    assert_eq!(vals[0].tag(), "funcLit");
    assert_eq!(
        body[1],
        Node::Go {
            call: Box::new(Node::call(ident("f"), vec![Node::int(1)]))
        }
    );
}

#[test]
fn func_typed_parameters_and_variables() {
    let decls = package_decls(
        "package main\n\nfunc apply(f func(int) int, x int) int {\n\treturn f(x)\n}\n\nvar twice func(int) int = func(v int) int { return v * 2 }\n\nfunc main() {\n\tprintln(apply(twice, 4))\n}\n",
    );
    let unary = Node::FuncType {
        params: vec![],
        results: vec![],
        param_types: vec![ident("int")],
        result_types: vec![ident("int")],
    };
    let Node::FuncDecl { ty, .. } = &decls[0] else {
        panic!("expected funcDecl");
    };
    let Node::FuncType { param_types, .. } = ty.as_ref() else {
        panic!("expected funcType");
    };
    assert_eq!(param_types, &vec![unary.clone(), ident("int")]);
    let Node::VarDecl { spec } = &decls[1] else {
        panic!("expected varDecl");
    };
    let Node::Spec { types, .. } = spec.as_ref() else {
        panic!("expected spec");
    };
    assert_eq!(types, &vec![unary]);
    assert_eq!(translate_source_errors(&decls), 0);
}

#[test]
fn serialized_tree_uses_wire_names() {
    let ir = translate_source(
        "package main\n\nfunc pick(a, b int) (r int) {\n\tif a > b {\n\t\treturn a\n\t}\n\treturn b\n}\n",
    );
    let json = serde_json::to_value(&ir).unwrap();
    let decl = &json["decls"][0];
    assert_eq!(decl["tag"], "funcDecl");
    assert_eq!(decl["type"]["paramTypes"].as_array().unwrap().len(), 2);
    assert_eq!(decl["type"]["results"][0]["val"], "r");
    assert_eq!(decl["type"]["resultTypes"][0]["val"], "int");
    let stmts = &decl["body"]["body"]["stmts"];
    assert_eq!(stmts[0]["else"]["tag"], "nop");
    assert_eq!(stmts[1]["results"][0]["val"], "b");
}
