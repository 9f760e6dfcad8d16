//! Tests for sieve compilation and evaluation.

use super::*;
use crate::config::SifterConfig;
use crate::error::{EvalError, EvalResult, SifterError};
use serde_json::{json, Value};
use std::collections::BTreeMap;

// ==================== Fixtures ====================

fn tacos() -> Value {
    json!({"id": 1, "type": "food", "name": "Tacos", "price": 3})
}

fn pizza() -> Value {
    json!({"id": 2, "type": "food", "name": "Pizza", "price": 12})
}

fn beer() -> Value {
    json!({"id": 3, "type": "drink", "name": "Beer", "price": 5})
}

fn draino() -> Value {
    json!({"id": 4, "type": "drink", "name": "Draino", "price": 8})
}

fn data() -> Vec<Value> {
    vec![tacos(), pizza(), beer(), draino()]
}

/// Passes every record, counting visits in the record cache and batch
/// preparations under an arbitrary cache key.
#[derive(Debug)]
struct Counting;

impl Sieve<()> for Counting {
    fn name(&self) -> &str {
        "count"
    }

    fn prep(&self, _ctx: &(), state: &mut SiftState, _records: &[&Value]) -> EvalResult<()> {
        let calls = state.cache(self.cache_group(), "prep");
        let n = calls.get("calls").and_then(Value::as_i64).unwrap_or(0);
        calls.insert("calls".to_string(), json!(n + 1));
        Ok(())
    }

    fn check(&self, _ctx: &(), state: &mut SiftState, record: &Value) -> EvalResult<bool> {
        let cache = record_cache::<()>(self, state, record)?;
        let seen = cache.get("seen").and_then(Value::as_i64).unwrap_or(0);
        cache.insert("seen".to_string(), json!(seen + 1));
        Ok(true)
    }
}

/// `(compare OP VALUE field: NAME)` over an integer field, `price` by default.
#[derive(Debug)]
struct Compare {
    field: String,
    op: Comparison,
    value: i64,
}

impl Sieve<()> for Compare {
    fn name(&self) -> &str {
        "compare"
    }

    fn check(&self, _ctx: &(), _state: &mut SiftState, record: &Value) -> EvalResult<bool> {
        Ok(record
            .get(self.field.as_str())
            .and_then(Value::as_i64)
            .is_some_and(|v| self.op.compare(&v, &self.value)))
    }
}

fn registry() -> SieveRegistry<()> {
    let mut registry = SieveRegistry::<()>::with_defaults();
    registry.register_field("name", "name");
    registry.register_field("type", "type");

    registry.register("count", |args| {
        args.no_options()?;
        Ok(Box::new(Counting))
    });

    registry.register("compare", |mut args| {
        let field = match args.take_option("field") {
            Some(arg) => arg.into_symbol()?,
            None => "price".to_string(),
        };
        let name = args.name().to_string();
        let [op, value]: [Arg<()>; 2] = args
            .into_positional()?
            .try_into()
            .map_err(|_| SifterError::arity(name, "expected OP VALUE"))?;
        Ok(Box::new(Compare {
            field,
            op: op.into_comparison()?,
            value: value.into_int()?,
        }))
    });

    registry
}

fn compile(src: &str) -> Sifter<()> {
    Sifter::new(&registry(), src).unwrap()
}

fn compile_err(src: &str) -> SifterError {
    Sifter::new(&registry(), src).unwrap_err()
}

fn names<'a>(results: &BTreeMap<String, Vec<&'a Value>>, flag: &str) -> Vec<&'a str> {
    results[flag]
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect()
}

fn sift_default(src: &str) -> Vec<String> {
    let records = data();
    let mut sifter = compile(src);
    let results = sifter.evaluate(&(), &records).unwrap();
    results
        .get(DEFAULT_FLAG)
        .map(|found| {
            found
                .iter()
                .map(|r| r["name"].as_str().unwrap().to_string())
                .collect()
        })
        .unwrap_or_default()
}

// ==================== Property Tests ====================

#[test]
fn test_symbol_property() {
    let records = data();
    let mut sifter = compile("\n(name Pizza)\n");

    assert_eq!(sifter.sieve_exprs().len(), 1);
    assert_eq!(sifter.sieve_exprs()[0].name(), "name");
    assert_eq!(format!("{:?}", sifter.sieve_exprs()[0]), "(name Pizza)");

    let results = sifter.evaluate(&(), &records).unwrap();
    assert_eq!(results[DEFAULT_FLAG], vec![&records[1]]);
}

#[test]
fn test_str_property() {
    let sifter = compile(r#"(name "Pizza")"#);
    assert_eq!(format!("{:?}", sifter.sieve_exprs()[0]), r#"(name "Pizza")"#);
    assert_eq!(sift_default(r#"(name "Pizza")"#), vec!["Pizza"]);
}

#[test]
fn test_regex_property() {
    let sifter = compile("(name /zza$/)");
    assert_eq!(format!("{:?}", sifter.sieve_exprs()[0]), "(name /zza$/)");
    assert_eq!(sift_default("(name /zza$/)"), vec!["Pizza"]);
}

#[test]
fn test_glob_property() {
    let sifter = compile("(name |P*a|)");
    assert_eq!(format!("{:?}", sifter.sieve_exprs()[0]), "(name |P*a|)");
    assert_eq!(sift_default("(name |P*a|)"), vec!["Pizza"]);
    assert!(sift_default("(name |p*a|)").is_empty());
    assert_eq!(sift_default("(name |p*a|i)"), vec!["Pizza"]);
}

#[test]
fn test_field_variadic_or() {
    assert_eq!(sift_default("(name Tacos Beer)"), vec!["Tacos", "Beer"]);
    assert_eq!(sift_default("(name {Tac,Pizz}{o,a}s)"), vec!["Tacos"]);
}

#[test]
fn test_field_presence() {
    let records = vec![
        json!({"id": 1, "owner": "alice"}),
        json!({"id": 2, "owner": null}),
        json!({"id": 3}),
    ];
    let mut registry = SieveRegistry::<()>::with_defaults();
    registry.register_field("owned", "owner");

    let mut sifter = Sifter::new(&registry, "(owned)").unwrap();
    let results = sifter.evaluate(&(), &records).unwrap();
    assert_eq!(results[DEFAULT_FLAG], vec![&records[0]]);
}

// ==================== Flag Tests ====================

#[test]
fn test_flag() {
    let records = data();
    let mut sifter = compile(
        r#"
        (flag munch (type food))
        (flag gulp (type drink))
        (flag poison (name Draino))
        (flag yum (flagged munch gulp) (not (flagged poison)))
        "#,
    );
    assert_eq!(sifter.sieve_exprs().len(), 4);
    assert_eq!(sifter.sieve_exprs()[0].flag(), Some("munch"));

    let results = sifter.evaluate(&(), &records).unwrap();
    assert!(!results.contains_key(DEFAULT_FLAG));
    assert_eq!(names(&results, "munch"), vec!["Tacos", "Pizza"]);
    assert_eq!(names(&results, "gulp"), vec!["Beer", "Draino"]);
    assert_eq!(names(&results, "poison"), vec!["Draino"]);
    assert_eq!(names(&results, "yum"), vec!["Tacos", "Pizza", "Beer"]);

    let state = sifter.state();
    assert_eq!(state.flags_of(&records[3]).unwrap(), vec!["gulp", "poison"]);
    assert!(state.is_flagged("munch", &records[0]).unwrap());
}

#[test]
fn test_logic() {
    let records = data();
    let mut sifter = compile(
        r#"
        (flag good (or (type food)
                       (and (type drink)
                            (not (name Draino)))))
        "#,
    );
    assert_eq!(sifter.sieve_exprs().len(), 1);

    let results = sifter.evaluate(&(), &records).unwrap();
    assert!(!results.contains_key(DEFAULT_FLAG));
    assert_eq!(names(&results, "good"), vec!["Tacos", "Pizza", "Beer"]);
}

#[test]
fn test_flag_implicit_and() {
    let records = data();

    let mut sifter = compile("(flag fine (name Pizza) (type food))\n(flagged fine)");
    assert_eq!(sifter.sieve_exprs().len(), 2);
    let results = sifter.evaluate(&(), &records).unwrap();
    assert_eq!(names(&results, "fine"), vec!["Pizza"]);
    assert_eq!(names(&results, DEFAULT_FLAG), vec!["Pizza"]);

    let mut sifter = compile("(flag gross (name Pizza) (type drink))\n(flagged gross)");
    let results = sifter.evaluate(&(), &records).unwrap();
    assert!(!results.contains_key(DEFAULT_FLAG));
    assert!(!results.contains_key("gross"));
}

#[test]
fn test_flags_cleared_between_evaluations() {
    let mut sifter = compile("(flag cheap (compare < 6))");

    let first = data();
    let results = sifter.evaluate(&(), &first).unwrap();
    assert_eq!(names(&results, "cheap"), vec!["Tacos", "Beer"]);

    let second = vec![pizza()];
    let results = sifter.evaluate(&(), &second).unwrap();
    assert!(results.is_empty());
    assert!(sifter.state().flagged_ids("cheap").is_empty());
}

#[test]
fn test_not_aliases() {
    let sources = [
        "(flag poison (name Draino))\n(!flagged poison)",
        "(flag poison (name Draino))\n(not-flagged poison)",
        "(flag poison (name Draino))\n(! (flagged poison))",
        "(flag poison (name Draino))\n(not (flagged poison))",
        "(flag poison (name Draino))\n(!? poison)",
        "(flag poison (name Draino))\n(!poison?)",
    ];

    let records = data();
    for src in sources {
        let mut sifter = compile(src);
        assert_eq!(sifter.sieve_exprs().len(), 2, "{src}");
        assert_eq!(
            format!("{:?}", sifter.sieve_exprs()[1]),
            "(not (flagged poison))",
            "{src}"
        );

        let results = sifter.evaluate(&(), &records).unwrap();
        assert_eq!(names(&results, "poison"), vec!["Draino"], "{src}");
        assert_eq!(
            names(&results, DEFAULT_FLAG),
            vec!["Tacos", "Pizza", "Beer"],
            "{src}"
        );
    }
}

#[test]
fn test_flagged_aliases() {
    let sources = [
        "(flag poison (name Draino))\n(flagged poison)",
        "(flag poison (name Draino))\n(? poison)",
        "(flag poison (name Draino))\n(poison?)",
    ];

    let records = data();
    for src in sources {
        let mut sifter = compile(src);
        assert_eq!(
            format!("{:?}", sifter.sieve_exprs()[1]),
            "(flagged poison)",
            "{src}"
        );

        let results = sifter.evaluate(&(), &records).unwrap();
        assert_eq!(names(&results, "poison"), vec!["Draino"], "{src}");
        assert_eq!(names(&results, DEFAULT_FLAG), vec!["Draino"], "{src}");
    }
}

// ==================== Logic Tests ====================

#[test]
fn test_empty_logic() {
    assert_eq!(
        sift_default("(and)"),
        vec!["Tacos", "Pizza", "Beer", "Draino"]
    );
    assert!(sift_default("(or)").is_empty());
    assert_eq!(
        sift_default("(not)"),
        vec!["Tacos", "Pizza", "Beer", "Draino"]
    );
}

#[test]
fn test_not_is_complement() {
    assert_eq!(sift_default("(not (type food))"), vec!["Beer", "Draino"]);
    assert_eq!(sift_default("(not-type food)"), vec!["Beer", "Draino"]);
    assert_eq!(sift_default("(not (name Tacos) (name Beer))"), vec!["Pizza", "Draino"]);
}

#[test]
fn test_or_match_order() {
    assert_eq!(
        sift_default("(or (name Beer) (type food))"),
        vec!["Beer", "Tacos", "Pizza"]
    );
    assert_eq!(
        sift_default("(or (type food) (name Pizza Draino))"),
        vec!["Tacos", "Pizza", "Draino"]
    );
}

#[test]
fn test_and_narrows() {
    assert_eq!(sift_default("(and (type drink) (compare > 6))"), vec!["Draino"]);
    assert!(sift_default("(and (type drink) (name Pizza))").is_empty());
}

// ==================== Item Tests ====================

#[test]
fn test_item_sieve() {
    let records = vec![
        json!({"id": 1, "keywords": ["yummy", "crunchy", "spicy"], "meta": {"origin": "mx"}}),
        json!({"id": 2, "keywords": ["cheesy", "yummy"], "meta": {"origin": "it"}}),
        json!({"id": 3, "keywords": []}),
    ];

    let mut sifter = compile("(flag spicy (keywords[] spicy)) (flag first (.keywords[0] yummy))");
    assert_eq!(
        format!("{:?}", sifter.sieve_exprs()[1]),
        "(flag first (item .keywords[0] yummy))"
    );

    let results = sifter.evaluate(&(), &records).unwrap();
    assert_eq!(results["spicy"], vec![&records[0]]);
    assert_eq!(results["first"], vec![&records[0]]);

    let mut sifter = compile("(item meta) (item .meta.origin it)");
    let results = sifter.evaluate(&(), &records).unwrap();
    assert_eq!(results[DEFAULT_FLAG], vec![&records[0], &records[1]]);
}

#[test]
fn test_item_sieve_huge_slice_step() {
    let records = vec![
        json!({"id": 1, "tags": ["a", "b", "c"]}),
        json!({"id": 2, "tags": ["a", "c", "b"]}),
    ];

    let mut sifter = compile("(.tags[1::9223372036854775807] b)");
    let results = sifter.evaluate(&(), &records).unwrap();
    assert_eq!(results[DEFAULT_FLAG], vec![&records[0]]);
}

#[test]
fn test_item_sieve_type_error() {
    let records = vec![json!({"id": 1, "name": "Tacos"})];
    let mut sifter = compile("(.name[0] T)");
    assert!(matches!(
        sifter.evaluate(&(), &records),
        Err(EvalError::PathType { .. })
    ));
}

// ==================== Error Tests ====================

#[test]
fn test_syntax_error() {
    let invalid_heads = [
        "((name Pizza))",
        r#"("name" Pizza)"#,
        "(/name/ Pizza)",
        "(|name| Pizza)",
    ];
    for src in invalid_heads {
        match compile_err(src) {
            SifterError::InvalidArgument { message, .. } => {
                assert_eq!(message, "Sieve names must be symbols", "{src}")
            }
            other => panic!("unexpected error for {src}: {other:?}"),
        }
    }

    assert_eq!(compile_err("\n()\n"), SifterError::EmptyExpression);

    match compile_err("name Pizza") {
        SifterError::InvalidArgument { message, .. } => {
            assert_eq!(message, "Value must be a sieve expression")
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert!(matches!(
        compile_err("(name \"Pizza\n"),
        SifterError::Parse(_)
    ));
}

#[test]
fn test_unknown_sieve() {
    assert_eq!(
        compile_err("(bogus-sieve 1)"),
        SifterError::unknown_sieve("bogus-sieve")
    );
    assert_eq!(compile_err("(bogus? 1)"), SifterError::unknown_sieve("bogus?"));
    assert_eq!(compile_err("(not-bogus 1)"), SifterError::unknown_sieve("bogus"));
}

#[test]
fn test_regex_error() {
    match compile_err("(name /[/)") {
        SifterError::Parse(err) => assert!(err.is_regex()),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_builtin_argument_errors() {
    assert!(matches!(
        compile_err("(flag)"),
        SifterError::Arity { sieve, .. } if sieve == "flag"
    ));
    assert!(matches!(
        compile_err("(flag \"quoted\" (name Pizza))"),
        SifterError::InvalidArgument { .. }
    ));
    assert!(matches!(
        compile_err("(flagged)"),
        SifterError::Arity { .. }
    ));
    assert!(matches!(
        compile_err("(flagged tier{1..3})"),
        SifterError::InvalidArgument { .. }
    ));
    assert!(matches!(
        compile_err("(and Pizza)"),
        SifterError::InvalidArgument { .. }
    ));
    assert!(matches!(
        compile_err("(name (type food))"),
        SifterError::InvalidArgument { .. }
    ));
    assert!(matches!(compile_err("(item)"), SifterError::Arity { .. }));
}

#[test]
fn test_comments() {
    assert!(compile("\n# ()\n").sieve_exprs().is_empty());
    assert_eq!(compile("(name Pizza) # ()").sieve_exprs().len(), 1);
    assert_eq!(
        compile("; this is a comment\n(name Pizza) ; () is as well\n; so is this\n")
            .sieve_exprs()
            .len(),
        1
    );
}

#[test]
fn test_missing_id() {
    let records = vec![json!({"name": "Mystery"})];
    let mut sifter = compile("(name Mystery)");
    assert!(matches!(
        sifter.evaluate(&(), &records),
        Err(EvalError::MissingId { key }) if key == "id"
    ));
}

// ==================== Option Tests ====================

#[test]
fn test_keyword_options() {
    assert_eq!(sift_default("(compare >= 8)"), vec!["Pizza", "Draino"]);
    assert_eq!(sift_default("(compare == 2 field: id)"), vec!["Pizza"]);
    assert_eq!(sift_default("(compare field: id != 2)"), vec!["Tacos", "Beer", "Draino"]);
}

#[test]
fn test_keyword_option_errors() {
    assert_eq!(
        compile_err("(name Pizza limit: 3)"),
        SifterError::UnexpectedOption {
            sieve: "name".to_string(),
            key: "limit".to_string(),
        }
    );
    assert_eq!(
        compile_err("(compare > 3 field:)"),
        SifterError::MissingKeywordValue {
            key: "field".to_string()
        }
    );
    assert!(matches!(
        compile_err("(compare => 3)"),
        SifterError::InvalidComparison { op } if op == "=>"
    ));
    assert!(matches!(
        compile_err("(compare > 3 4)"),
        SifterError::Arity { .. }
    ));
}

// ==================== Parameter Tests ====================

#[test]
fn test_params() {
    let config = SifterConfig::default()
        .with_param("who", "Pizza")
        .with_param("kind", "drink")
        .with_param("limit", "5");

    let records = data();
    let mut sifter = Sifter::with_config(
        &registry(),
        r#"
        (flag who (name $who))
        (flag kind (type "{kind}"))
        (flag cheap (compare <= $limit))
        (flag nobody (name $nobody))
        "#,
        &config,
    )
    .unwrap();

    assert_eq!(format!("{:?}", sifter.sieve_exprs()[0]), "(flag who (name Pizza))");
    assert_eq!(
        format!("{:?}", sifter.sieve_exprs()[1]),
        r#"(flag kind (type "drink"))"#
    );

    let results = sifter.evaluate(&(), &records).unwrap();
    assert_eq!(names(&results, "who"), vec!["Pizza"]);
    assert_eq!(names(&results, "kind"), vec!["Beer", "Draino"]);
    assert_eq!(names(&results, "cheap"), vec!["Tacos", "Beer"]);
    assert!(!results.contains_key("nobody"));
}

#[test]
fn test_params_undefined() {
    let config = SifterConfig::default();
    assert!(matches!(
        Sifter::with_config(&registry(), r#"(name "{who}")"#, &config),
        Err(SifterError::UnknownParam { name }) if name == "who"
    ));

    let sifter = Sifter::with_config(&registry(), r#"(name "{{who}}")"#, &config).unwrap();
    assert_eq!(format!("{:?}", sifter.sieve_exprs()[0]), r#"(name "{who}")"#);
}

// ==================== Evaluation Tests ====================

#[test]
fn test_cache_persists_until_reset() {
    let records = data();
    let mut sifter = compile("(count)");

    sifter.evaluate(&(), &records).unwrap();
    sifter.evaluate(&(), &records).unwrap();

    let state = sifter.state_mut();
    assert_eq!(state.cache("count", 1_i64)["seen"], json!(2));
    assert_eq!(state.cache("count", 4_i64)["seen"], json!(2));
    assert_eq!(state.cache("count", "prep")["calls"], json!(2));

    sifter.reset();
    assert_eq!(sifter.state().cache_len(), 0);
    assert_eq!(sifter.state().flag_names().count(), 0);
}

#[test]
fn test_empty_batch_skips_prep() {
    let records: Vec<Value> = Vec::new();
    let mut sifter = compile("(count)");
    let results = sifter.evaluate(&(), &records).unwrap();
    assert!(results.is_empty());
    assert_eq!(sifter.state().cache_len(), 0);
}

#[test]
fn test_prep_skipped_for_empty_subset() {
    let records = data();
    let mut sifter = compile("(and (name Nothing) (count))");
    let results = sifter.evaluate(&(), &records).unwrap();
    assert!(results.is_empty());
    assert_eq!(sifter.state().cache_len(), 0);
}

#[test]
fn test_duplicate_ids_collapse() {
    let records = vec![
        json!({"id": 1, "name": "Old Tacos"}),
        json!({"id": 2, "name": "Pizza"}),
        json!(null),
        json!({}),
        json!({"id": 1, "name": "Tacos"}),
    ];
    let mut sifter = compile("(name)");
    let results = sifter.evaluate(&(), &records).unwrap();
    assert_eq!(results[DEFAULT_FLAG], vec![&records[4], &records[1]]);
}

#[test]
fn test_custom_id_key() {
    let records = vec![
        json!({"nvr": "foo-1.0-1", "name": "Foo"}),
        json!({"nvr": "bar-2.0-1", "name": "Bar"}),
    ];
    let config = SifterConfig::default().with_id_key("nvr");
    let mut sifter = Sifter::with_config(&registry(), "(flag bar (name Bar))", &config).unwrap();
    let results = sifter.evaluate(&(), &records).unwrap();

    assert_eq!(results["bar"], vec![&records[1]]);
    assert_eq!(
        sifter.state().flagged_ids("bar"),
        &[RecordId::from("bar-2.0-1")]
    );
}

#[test]
fn test_registry_names() {
    let registry = registry();
    assert!(registry.contains("!"));
    assert!(registry.contains("?"));
    assert!(!registry.contains("bogus"));
    assert_eq!(
        registry.names(),
        vec!["!", "?", "and", "compare", "count", "flag", "flagged", "item", "name", "not", "or", "type"]
    );
}
