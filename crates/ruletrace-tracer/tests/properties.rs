//! Property tests for the canonical form and the trace pipeline.
//!
//! Tests cover:
//! - Canonical idempotence: format(parse(format(n))) == format(n), and the
//!   canonical text parses back into the same tree
//! - Fingerprint stability of literal sets across member orders
//! - Patch transparency with an empty spec map, down to the final value
//! - Execution-path equivalence between `final` and the returned source
//! - Skipped chunks never carry a value, error, ID or reason

use std::sync::Arc;

use proptest::prelude::*;

use ruletrace_core::{CompileOptions, ExpressionEngine};
use ruletrace_engine::{compile, parse};
use ruletrace_tracer::atoms::list_atoms;
use ruletrace_tracer::{
    fingerprint, format_root, patch, ConditionSpec, Engine, Env, Recorder, SpecMap, Tracer, Value,
    COND_FN,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

fn quote(s: &str) -> String {
    let mut out = String::from("\"");
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn leaf() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(vec![
            "a",
            "b",
            "flag",
            "user.Id",
            "user.Name",
            "xs",
            "user?.Id",
            "(user?.Name).x",
            "(xs?.[0])[1:]",
        ])
        .prop_map(String::from),
        (0i64..1000).prop_map(|i| i.to_string()),
        "[a-z \"\\\\]{0,6}".prop_map(|s| quote(&s)),
        Just("true".to_string()),
        Just("false".to_string()),
        Just("nil".to_string()),
    ]
}

/// Source text of a random, syntactically valid expression. Every compound
/// is fully parenthesized; the formatter decides which parentheses survive.
fn expression() -> impl Strategy<Value = String> {
    const OPS: &[&str] = &[
        "+", "-", "*", "%", "==", "!=", "<", "<=", ">", ">=", "&&", "||", "??", "in", "contains",
    ];
    leaf().prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            (inner.clone(), prop::sample::select(OPS), inner.clone())
                .prop_map(|(l, op, r)| format!("({l}) {op} ({r})")),
            (prop::sample::select(vec!["!", "-"]), inner.clone()).prop_map(|(op, e)| format!("{op}({e})")),
            (inner.clone(), inner.clone(), inner.clone())
                .prop_map(|(c, t, e)| format!("({c}) ? ({t}) : ({e})")),
            prop::collection::vec(inner.clone(), 0..3).prop_map(|items| format!("[{}]", items.join(", "))),
            inner.prop_map(|e| format!("len({e})")),
        ]
    })
}

/// Like [`expression`], but built from comparisons joined by the
/// short-circuit operators, so the tracer has atoms to split. Negations and
/// ternaries make operands whose value differs from their last atom.
fn rule() -> impl Strategy<Value = String> {
    let atom = (
        prop::sample::select(vec!["a", "b", "user.Id", "missing"]),
        prop::sample::select(vec!["==", "!=", "<", ">="]),
        0i64..4,
    )
        .prop_map(|(l, op, r)| format!("{l} {op} {r}"));
    atom.prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            3 => (inner.clone(), prop::sample::select(vec!["&&", "||"]), inner.clone())
                .prop_map(|(l, op, r)| format!("({l}) {op} ({r})")),
            1 => inner.clone().prop_map(|e| format!("!({e})")),
            1 => (inner.clone(), inner.clone(), inner)
                .prop_map(|(c, t, e)| format!("({c}) ? ({t}) : ({e})")),
        ]
    })
}

fn rule_env() -> Env {
    Value::env_from_json(json!({"a": 1, "b": 2, "user": {"Id": 3}})).expect("object environment")
}

fn run_directly(source: &str, env: &Env) -> Option<Value> {
    let recorder = Arc::new(Recorder::new());
    let options = CompileOptions::new().with_function(COND_FN, recorder.native_fn());
    let engine = Engine;
    let program = engine.compile(source, &options).ok()?;
    engine.run(&program, env).ok()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn canonical_form_is_idempotent(source in expression()) {
        let ast = parse(&source).unwrap();
        let once = format_root(&ast);
        let reparsed = parse(&once).unwrap();
        prop_assert_eq!(&reparsed, &ast);
        prop_assert_eq!(format_root(&reparsed), once);
    }

    #[test]
    fn literal_sets_fingerprint_alike(
        (members, shuffled) in prop::collection::vec("[a-z]{1,5}", 1..6)
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        let render = |items: &[String]| {
            let list: Vec<String> = items.iter().map(|s| quote(s)).collect();
            let program = compile(&format!("g in [{}]", list.join(", ")), &CompileOptions::new()).unwrap();
            fingerprint(&format_root(program.ast()))
        };
        prop_assert_eq!(render(&members), render(&shuffled));
    }

    #[test]
    fn empty_specs_leave_the_tree_alone(source in expression()) {
        let ast = parse(&source).unwrap();
        let patched = patch(&ast, &SpecMap::new());
        prop_assert_eq!(format_root(&patched), format_root(&ast));

        let env = rule_env();
        let result = Tracer::new(env.clone()).trace(&source, &SpecMap::new());
        prop_assert_eq!(result.final_value, run_directly(&source, &env));
    }

    #[test]
    fn final_matches_direct_evaluation(source in rule(), spec_every_other in any::<bool>()) {
        let env = rule_env();
        let ast = parse(&source).unwrap();
        let atoms = list_atoms(&ast);
        let specs: SpecMap = atoms
            .iter()
            .enumerate()
            .filter(|(i, _)| !spec_every_other || i % 2 == 0)
            .map(|(i, atom)| {
                (atom.fingerprint.clone(), ConditionSpec::new(format!("c{i}"), "T", "F"))
            })
            .collect();

        let result = Tracer::new(env.clone()).trace(&source, &specs);
        prop_assert_eq!(&result.final_value, &run_directly(&result.source, &env));

        // A skipped chunk was never run, by the tracer or by the engine.
        for chunk in result.chunks.iter().filter(|c| c.skipped) {
            prop_assert!(chunk.value.is_none() && chunk.error.is_none());
            prop_assert!(chunk.id.is_none() && chunk.reason.is_none());
        }
    }
}
