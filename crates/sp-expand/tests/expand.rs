use pretty_assertions::assert_eq;
use proptest::prelude::*;
use sp_core::ast::print::{Formatting, LineBreak};
use sp_core::ast::SyntaxKind;
use sp_core::config::EngineConfig;
use sp_core::diagnostics::Diagnostic;
use sp_core::model::{DeclarationCatalog, DeclarationSpec};
use sp_core::Error;
use sp_expand::{
    FactoryAdapter, Generator, ProceedBody, TargetDeclaration, TemplateCompiler, Value,
    WeaveSiteContext,
};
use sp_lang::{parse_block, parse_expr, parse_template, NameBinder};
use strum::IntoEnumIterator;

const DECLARATIONS: &str = r#"[
    {"path": "log", "kind": "Method"},
    {"path": "check", "kind": "Method"},
    {"path": "skip", "kind": "Method"},
    {"path": "read", "kind": "Method"},
    {"path": "running", "kind": "Method"},
    {"path": "step", "kind": "Method"},
    {"path": "helpers.display_name", "kind": "Method", "marker": "MetaOnly"}
]"#;

fn catalog() -> DeclarationCatalog {
    let specs: Vec<DeclarationSpec> = serde_json::from_str(DECLARATIONS).expect("declarations");
    let mut catalog = DeclarationCatalog::with_meta_api();
    catalog.extend_specs(specs);
    catalog
}

fn try_compile_with(
    src: &str,
    config: EngineConfig,
) -> Result<(Generator, Vec<Diagnostic>), Vec<Diagnostic>> {
    let catalog = catalog();
    let template = parse_template(src).unwrap_or_else(|e| panic!("parse failed: {e}"));
    let model = NameBinder::new(&catalog).bind(&template);
    let compiler = TemplateCompiler::from_catalog(config, &catalog).expect("compiler");
    compiler
        .compile(&template, &model)
        .expect("engine failure")
        .into_result()
}

fn compile(src: &str) -> Generator {
    match try_compile_with(src, EngineConfig::default()) {
        Ok((generator, _)) => generator,
        Err(diagnostics) => panic!("template rejected: {diagnostics:?}"),
    }
}

fn target() -> TargetDeclaration {
    TargetDeclaration::method("transfer")
        .returning("bool")
        .with_parameter("from", "Account")
        .with_parameter("amount", "int")
}

fn block(src: &str) -> ProceedBody {
    ProceedBody::Block(parse_block(src).expect("proceed body"))
}

fn expand(generator: &Generator, site: &WeaveSiteContext) -> String {
    generator.expand(site).expect("expand").to_source()
}

const LOG_CALLS: &str = r#"
template method log_calls(compile prefix) {
    var n = meta.compile_time(0);
    if (meta.target.parameter_count > 0) { n = meta.compile_time(1); }
    log($"{prefix}: {n}");
    meta.proceed();
}
"#;

#[test]
fn compile_time_locals_are_folded_into_the_output() {
    let generator = compile(LOG_CALLS);
    assert_eq!(generator.params.len(), 1);

    let site = WeaveSiteContext::new(target())
        .with_argument("prefix", "enter")
        .with_proceed(block("{ work(); }"));
    assert_eq!(expand(&generator, &site), "log(\"enter: 1\");\n{\n    work();\n}");

    let bare = WeaveSiteContext::new(TargetDeclaration::method("ping"))
        .with_argument("prefix", "enter")
        .with_proceed(block("{ work(); }"));
    assert_eq!(expand(&generator, &bare), "log(\"enter: 0\");\n{\n    work();\n}");
}

#[test]
fn both_branches_assign_the_compile_time_local() {
    let generator = compile(
        r#"
template method count() {
    var n = meta.compile_time(0);
    if (meta.target.parameter_count > 0) { n = meta.compile_time(1); } else { n = meta.compile_time(2); }
    log(n);
    meta.proceed();
}
"#,
    );
    let site = WeaveSiteContext::new(TargetDeclaration::method("one").with_parameter("x", "int"))
        .with_proceed(block("{ return x; }"));
    assert_eq!(expand(&generator, &site), "log(1);\n{\n    return x;\n}");

    let none = WeaveSiteContext::new(TargetDeclaration::method("none"))
        .with_proceed(block("{ return 0; }"));
    assert_eq!(expand(&generator, &none), "log(2);\n{\n    return 0;\n}");
}

#[test]
fn analyze_template_returns_diagnostics_on_rejection() {
    let catalog = catalog();
    let compiler =
        TemplateCompiler::from_catalog(EngineConfig::default(), &catalog).expect("compiler");
    let template = parse_template("template method t() { break; }").expect("parse");
    let model = NameBinder::new(&catalog).bind(&template);
    let diagnostics = compiler.analyze_template(&template, &model).unwrap_err();
    assert_eq!(diagnostics[0].code.as_deref(), Some("SP0140"));
}

#[test]
fn one_generator_serves_many_sites() {
    let generator = compile(LOG_CALLS);
    let sites: Vec<_> = ["a", "b", "c"]
        .into_iter()
        .map(|prefix| {
            WeaveSiteContext::new(target())
                .with_argument("prefix", prefix)
                .with_proceed(block("{ }"))
        })
        .collect();
    let outputs: Vec<String> = sites.iter().map(|site| expand(&generator, site)).collect();
    assert_eq!(outputs[0], "log(\"a: 1\");\n{}");
    assert_eq!(outputs[2], "log(\"c: 1\");\n{}");
}

#[test]
fn missing_compile_time_argument_fails_expansion() {
    let generator = compile(LOG_CALLS);
    let site = WeaveSiteContext::new(target()).with_proceed(block("{ }"));
    let err = generator.expand(&site).unwrap_err();
    assert!(matches!(err, Error::Expansion { .. }), "{err:?}");
    assert!(err.to_string().contains("prefix"));
}

#[test]
fn returned_proceed_splices_the_body() {
    let generator = compile("template method wrap() { return meta.proceed(); }");

    let site = WeaveSiteContext::new(target()).with_proceed(block("{ return a; }"));
    assert_eq!(expand(&generator, &site), "return a;");

    let multi = WeaveSiteContext::new(target()).with_proceed(block("{ log(1); return a; }"));
    assert_eq!(expand(&generator, &multi), "log(1);\nreturn a;");

    let expr = WeaveSiteContext::new(target())
        .with_proceed(ProceedBody::Expr(parse_expr("a + 1").expect("expr")));
    assert_eq!(expand(&generator, &expr), "return a + 1;");
}

#[test]
fn proceed_as_a_value_needs_a_single_expression() {
    let generator = compile("template method wrap() { var result = meta.proceed(); log(result); }");

    let site = WeaveSiteContext::new(target()).with_proceed(block("{ return compute(); }"));
    assert_eq!(expand(&generator, &site), "var result = compute();\nlog(result);");

    let site = WeaveSiteContext::new(target()).with_proceed(block("{ step(); return 1; }"));
    let err = generator.expand(&site).unwrap_err();
    assert!(err.to_string().contains("single expression"), "{err}");
}

#[test]
fn proceed_without_a_body_fails_expansion() {
    let generator = compile("template method wrap() { meta.proceed(); }");
    let err = generator
        .expand(&WeaveSiteContext::new(target()))
        .unwrap_err();
    assert!(err.to_string().contains("transfer"), "{err}");
}

#[test]
fn compile_time_if_selects_a_branch() {
    let generator =
        compile("template method guard(compile strict) { if (strict) { check(); } else { skip(); } }");

    let strict = WeaveSiteContext::new(target()).with_argument("strict", true);
    assert_eq!(expand(&generator, &strict), "check();");

    let lax = WeaveSiteContext::new(target()).with_argument("strict", false);
    assert_eq!(expand(&generator, &lax), "skip();");
}

#[test]
fn non_boolean_condition_fails_expansion() {
    let generator = compile("template method guard(compile strict) { if (strict) { check(); } }");
    let site = WeaveSiteContext::new(target()).with_argument("strict", 1i64);
    let err = generator.expand(&site).unwrap_err();
    assert!(matches!(err, Error::Expansion { .. }), "{err:?}");
}

#[test]
fn run_time_control_flow_is_emitted() {
    let generator = compile(
        "template method pump() { while (running()) { step(); } if (read() > 0) { log(1); } else { log(2); } }",
    );
    let expected = "while (running()) {\n    step();\n}\nif (read() > 0) {\n    log(1);\n} else {\n    log(2);\n}";
    assert_eq!(expand(&generator, &WeaveSiteContext::new(target())), expected);
}

#[test]
fn compile_time_foreach_unrolls() {
    let generator = compile(
        r#"
template method trace() {
    foreach (p in meta.target.parameters) {
        if (p.index > 0) { break; }
        log(p.name);
    }
    foreach (p in meta.target.parameters) {
        log($"{p.name}: {p.type_name}", p.index);
    }
}
"#,
    );
    assert_eq!(
        expand(&generator, &WeaveSiteContext::new(target())),
        "log(\"from\");\nlog(\"from: Account\", 0);\nlog(\"amount: int\", 1);"
    );
}

#[test]
fn compile_time_loop_inside_a_run_time_block() {
    let generator = compile(
        r#"
template method guarded() {
    if (read() > 0) {
        foreach (p in meta.target.parameters) { check(p.name); }
    }
}
"#,
    );
    assert_eq!(
        expand(&generator, &WeaveSiteContext::new(target())),
        "if (read() > 0) {\n    check(\"from\");\n    check(\"amount\");\n}"
    );
}

#[test]
fn compile_time_loops_are_bounded() {
    let src = "template method spin() { var i = meta.compile_time(0); while (i < 100) { i = i + 1; } log(i); }";
    let config = EngineConfig {
        max_meta_iterations: 10,
        ..EngineConfig::default()
    };
    let (generator, _) = try_compile_with(src, config).expect("compiles");
    let err = generator
        .expand(&WeaveSiteContext::new(target()))
        .unwrap_err();
    assert!(err.to_string().contains("exceeded 10 iterations"), "{err}");

    let generator = compile(src);
    assert_eq!(expand(&generator, &WeaveSiteContext::new(target())), "log(100);");
}

#[test]
fn inserted_comments_precede_the_next_statement() {
    let generator = compile(
        r#"
template method annotate() {
    meta.insert_comment($"{meta.target.name} has {meta.target.parameter_count} parameters");
    // kept
    log(1);
    meta.insert_comment("end");
}
"#,
    );
    assert_eq!(
        expand(&generator, &WeaveSiteContext::new(target())),
        "// transfer has 2 parameters\n// kept\nlog(1);\n// end"
    );
}

#[test]
fn formatting_comes_from_the_site() {
    let generator = compile("template method t() { if (read() > 0) { log(1); } }");
    let site = WeaveSiteContext::new(target()).with_formatting(Formatting {
        base_indent: 4,
        indent_size: 2,
        line_break: LineBreak::CrLf,
    });
    assert_eq!(
        expand(&generator, &site),
        "    if (read() > 0) {\r\n      log(1);\r\n    }"
    );
}

#[test]
fn tags_and_compile_time_functions() {
    let generator = compile(
        r#"
template method tagged() {
    if (meta.tags.contains_key("audit")) { log(meta.tags["audit"]); }
    log(helpers.display_name(meta.target.name));
}
"#,
    );
    let site = WeaveSiteContext::new(target())
        .with_tag("audit", "ledger")
        .with_function("helpers.display_name", |args: &[Value]| {
            Ok(Value::str(format!("<{}>", args[0])))
        });
    assert_eq!(
        expand(&generator, &site),
        "log(\"ledger\");\nlog(\"<transfer>\");"
    );
}

#[test]
fn ambiguous_local_is_rejected() {
    let src = "template method bad() { var x = 0; x = meta.compile_time(1); x = read(); }";
    let diagnostics = try_compile_with(src, EngineConfig::default()).unwrap_err();
    assert!(diagnostics
        .iter()
        .any(|diagnostic| diagnostic.code.as_deref() == Some("SP0110")));
}

#[test]
fn ambiguous_local_in_sibling_branches_is_rejected() {
    let branches = [
        ("x = meta.compile_time(1);", "x = read();"),
        ("x = read();", "x = meta.compile_time(1);"),
    ];
    for (then, elze) in branches {
        let src = format!(
            "template method bad() {{ var x; if (meta.target.parameter_count > 0) {{ {then} }} else {{ {elze} }} log(x); }}"
        );
        let diagnostics = try_compile_with(&src, EngineConfig::default())
            .err()
            .unwrap_or_else(|| panic!("accepted: {src}"));
        assert!(
            diagnostics
                .iter()
                .any(|diagnostic| diagnostic.code.as_deref() == Some("SP0110")),
            "{src}: {diagnostics:?}"
        );
    }
}

#[test]
fn proceed_in_compile_time_code_is_reported_not_an_engine_failure() {
    for src in [
        "template method t() { if (meta.proceed() == 3) { log(1); } }",
        "template method t() { var x = meta.compile_time(meta.proceed()); log(x); }",
        "template method t() { meta.insert_comment(meta.proceed()); }",
        "template method t() { log(helpers.display_name(meta.proceed())); }",
    ] {
        let diagnostics = try_compile_with(src, EngineConfig::default())
            .err()
            .unwrap_or_else(|| panic!("accepted: {src}"));
        let codes: Vec<_> = diagnostics
            .iter()
            .filter_map(|diagnostic| diagnostic.code.as_deref())
            .collect();
        assert_eq!(codes, vec!["SP0120"], "{src}");
    }
}

#[test]
fn every_syntax_kind_has_a_factory_mapping() {
    let factory = FactoryAdapter::shared();
    for kind in SyntaxKind::iter() {
        assert!(factory.supports(kind), "no mapping for {kind}");
    }
    assert!(factory.missing().is_empty());
}

#[test]
fn residual_try_is_emitted_verbatim() {
    let generator = compile(
        "template method safe() { try { step(); } catch (IoError e) when (e.code > 1) { log(e); } finally { check(); } }",
    );
    assert_eq!(
        expand(&generator, &WeaveSiteContext::new(target())),
        "try {\n    step();\n} catch (IoError e) when (e.code > 1) {\n    log(e);\n} finally {\n    check();\n}"
    );
}

/// A statement that only runs in the generator, numbered `i` to keep its
/// locals distinct.
fn compile_time_stmt(kind: usize, i: usize) -> String {
    match kind {
        0 => format!("var t{i} = meta.compile_time({i});"),
        1 => format!(
            "if (meta.target.parameter_count > {i}) {{ var u{i} = meta.compile_time({i}); }}"
        ),
        2 => format!("foreach (p{i} in meta.target.parameters) {{ var v{i} = p{i}.index; }}"),
        _ => format!(
            "if (meta.tags.contains_key(\"audit\")) {{ var w{i} = meta.compile_time({i}); }} else {{ }}"
        ),
    }
}

const RESIDUAL_STMTS: [&str; 3] = ["log(1);", "step();", "check(\"ok\", 2);"];

proptest! {
    #[test]
    fn compile_time_statements_leave_only_the_residual_statement(
        kinds in prop::collection::vec(0usize..4, 0..6),
        residual in 0usize..RESIDUAL_STMTS.len(),
        parameters in 0usize..4,
        audit in any::<bool>(),
    ) {
        let body: Vec<String> = kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| compile_time_stmt(*kind, i))
            .collect();
        let src = format!(
            "template method pure() {{ {} {} }}",
            body.join(" "),
            RESIDUAL_STMTS[residual]
        );
        let generator = compile(&src);

        let mut declaration = TargetDeclaration::method("m");
        for index in 0..parameters {
            declaration = declaration.with_parameter(format!("p{index}"), "int");
        }
        let mut site = WeaveSiteContext::new(declaration);
        if audit {
            site = site.with_tag("audit", "ledger");
        }
        prop_assert_eq!(expand(&generator, &site), RESIDUAL_STMTS[residual]);
    }

    #[test]
    fn compile_time_arithmetic_is_lifted(n in -1000i64..1000, m in -1000i64..1000) {
        let generator = compile("template method add(compile a, compile b) { log(a + b, a * 2); }");
        let site = WeaveSiteContext::new(target())
            .with_argument("a", n)
            .with_argument("b", m);
        prop_assert_eq!(expand(&generator, &site), format!("log({}, {});", n + m, n * 2));
    }
}
