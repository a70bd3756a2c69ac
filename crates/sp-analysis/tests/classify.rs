use pretty_assertions::assert_eq;
use sp_analysis::{analyze, annotate, StmtStage};
use sp_core::ast::{ExprKind, StmtKind, Template};
use sp_core::config::EngineConfig;
use sp_core::diagnostics::{Diagnostic, DiagnosticLevel};
use sp_core::model::{DeclarationCatalog, DeclarationSpec};
use sp_core::{BindingTime, SymbolTable};
use sp_lang::{parse_template, NameBinder};

const DECLARATIONS: &str = r#"[
    {"path": "log", "kind": "Method"},
    {"path": "read", "kind": "Method"},
    {"path": "running", "kind": "Method"},
    {"path": "helpers.limit", "kind": "Field", "marker": "MetaOnly", "returns": "Scalar"}
]"#;

fn catalog() -> DeclarationCatalog {
    let specs: Vec<DeclarationSpec> = serde_json::from_str(DECLARATIONS).expect("declarations");
    let mut catalog = DeclarationCatalog::with_meta_api();
    catalog.extend_specs(specs);
    catalog
}

fn table(catalog: &DeclarationCatalog, config: &EngineConfig) -> SymbolTable {
    SymbolTable::from_config(config)
        .declare_all(catalog.iter())
        .freeze()
        .expect("freeze")
}

fn parse(src: &str) -> Template {
    parse_template(src).unwrap_or_else(|e| panic!("parse failed for `{src}`: {e}"))
}

fn diagnostics_with(src: &str, config: &EngineConfig) -> Vec<Diagnostic> {
    let catalog = catalog();
    let template = parse(src);
    let model = NameBinder::new(&catalog).bind(&template);
    analyze(&template, &model, &table(&catalog, config), config.report_hidden).diagnostics
}

fn codes(src: &str) -> Vec<String> {
    diagnostics_with(src, &EngineConfig::default())
        .into_iter()
        .filter_map(|diagnostic| diagnostic.code)
        .collect()
}

#[test]
fn accepted_template_has_no_diagnostics() {
    let src = r#"
template method log_calls(compile prefix) {
    var n = meta.compile_time(0);
    if (meta.target.parameter_count > 0) { n = meta.compile_time(1); }
    log($"{prefix}: {n}");
    return meta.proceed();
}
"#;
    assert_eq!(codes(src), Vec::<String>::new());

    let catalog = catalog();
    let template = parse(src);
    let model = NameBinder::new(&catalog).bind(&template);
    let table = table(&catalog, &EngineConfig::default());
    let (annotated, conflicts) = annotate(&template, &model, &table);
    assert!(conflicts.is_empty());

    let stages: Vec<StmtStage> = template
        .body
        .stmts
        .iter()
        .map(|stmt| annotated.stmt_stage(stmt.id))
        .collect();
    assert_eq!(
        stages,
        vec![StmtStage::Meta, StmtStage::Meta, StmtStage::Residual, StmtStage::Residual]
    );

    let StmtKind::Expr(log) = &template.body.stmts[2].kind else {
        panic!("expected log statement");
    };
    let ExprKind::Call(call) = log.expr.kind() else {
        panic!("expected call");
    };
    let message = annotated.expr(call.args[0].id).expect("annotated argument");
    assert!(message.coerced);
    assert_eq!(message.binding, BindingTime::MetaOnlyProducingBoth);
    assert_eq!(annotated.binding(log.expr.id), BindingTime::ObjectOnly);
}

#[test]
fn ambiguous_local_is_reported_with_its_origin() {
    let diagnostics = diagnostics_with(
        "template method bad() { var x = 0; x = meta.compile_time(1); x = read(); }",
        &EngineConfig::default(),
    );
    assert_eq!(diagnostics.len(), 1);
    let diagnostic = &diagnostics[0];
    assert_eq!(diagnostic.code.as_deref(), Some("SP0110"));
    assert_eq!(diagnostic.related.len(), 1);
    assert!(!diagnostic.suggestions.is_empty());
}

#[test]
fn sibling_branches_disagreeing_on_a_local_are_rejected_in_either_order() {
    let meta_first = r#"
template method t() {
    var x;
    if (meta.target.parameter_count > 0) { x = meta.compile_time(1); } else { x = read(); }
    log(x);
}
"#;
    let object_first = r#"
template method t() {
    var x;
    if (meta.target.parameter_count > 0) { x = read(); } else { x = meta.compile_time(1); }
    log(x);
}
"#;
    assert_eq!(codes(meta_first), vec!["SP0110"]);
    assert_eq!(codes(object_first), vec!["SP0110"]);
}

#[test]
fn run_time_locals_still_lift_plain_compile_time_values() {
    assert_eq!(
        codes("template method t() { var x = read(); x = helpers.limit + 1; log(x); }"),
        Vec::<String>::new()
    );
}

#[test]
fn proceed_cannot_be_evaluated_at_compile_time() {
    for src in [
        "template method t() { if (meta.proceed() == 3) { log(1); } }",
        "template method t() { while (meta.proceed()) { log(1); } }",
        "template method t() { foreach (p in meta.proceed()) { log(1); } }",
        "template method t() { var x = meta.compile_time(meta.proceed()); log(x); }",
        "template method t() { meta.insert_comment(meta.proceed()); }",
    ] {
        assert_eq!(codes(src), vec!["SP0120"], "{src}");
    }

    let diagnostics = diagnostics_with(
        "template method t() { meta.insert_comment(meta.proceed()); }",
        &EngineConfig::default(),
    );
    assert!(diagnostics[0].message.contains("compile time"));
}

#[test]
fn compile_time_code_in_try_is_rejected() {
    assert_eq!(
        codes("template method t() { try { var x = meta.compile_time(1); } catch { } }"),
        vec!["SP0130"]
    );
    assert_eq!(
        codes("template method t() { try { log(1); } catch (e) when (meta.target.parameter_count > 0) { } }"),
        vec!["SP0130"]
    );
}

#[test]
fn intrinsic_misuse() {
    assert_eq!(codes("template method t() { log(meta.target); }"), vec!["SP0120"]);
    assert_eq!(codes("template method t() { meta.proceed(1); }"), vec!["SP0120"]);
    assert_eq!(codes("template method t() { meta.target(); }"), vec!["SP0120"]);
    assert_eq!(codes("template method t() { var p = meta.proceed; }"), vec!["SP0120"]);
    assert_eq!(
        codes("template method t() { var c = meta.insert_comment(\"x\"); }"),
        vec!["SP0120"]
    );
}

#[test]
fn stage_conflicts() {
    assert_eq!(
        codes("template method t() { log(meta.target.parameters); }"),
        vec!["SP0100"]
    );
    assert_eq!(
        codes("template method t() { var x = meta.compile_time(read()); }"),
        vec!["SP0101"]
    );
    assert_eq!(
        codes("template method t() { while (running()) { var n = meta.compile_time(1); } }"),
        vec!["SP0102"]
    );
}

#[test]
fn jumps_outside_loops() {
    assert_eq!(codes("template method t() { break; }"), vec!["SP0140"]);
}

#[test]
fn compile_time_assignment_to_non_local() {
    assert_eq!(
        codes("template method t() { helpers.limit = meta.compile_time(3); }"),
        vec!["SP0150"]
    );
}

#[test]
fn unresolved_symbols_are_hidden_unless_requested() {
    let src = "template method t() { missing(1); }";
    assert!(codes(src).is_empty());

    let config = EngineConfig {
        report_hidden: true,
        ..EngineConfig::default()
    };
    let diagnostics = diagnostics_with(src, &config);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].level, DiagnosticLevel::Hidden);
    assert_eq!(diagnostics[0].code.as_deref(), Some("SP0200"));
}

#[test]
fn strict_mode_treats_unknown_calls_as_run_time() {
    let src = "template method t() { var n = meta.compile_time(1); missing(n); }";
    let catalog = catalog();
    let template = parse(src);
    let model = NameBinder::new(&catalog).bind(&template);
    let call = template.body.stmts[1].id;

    let lenient = table(&catalog, &EngineConfig::default());
    let (annotated, _) = annotate(&template, &model, &lenient);
    assert_eq!(annotated.stmt_stage(call), StmtStage::Meta);

    let strict = table(&catalog, &EngineConfig::strict());
    let (annotated, conflicts) = annotate(&template, &model, &strict);
    assert_eq!(annotated.stmt_stage(call), StmtStage::Residual);
    assert!(conflicts.iter().all(|conflict| !conflict.is_error()));
}

#[test]
fn classification_is_idempotent() {
    let src = r#"
template method trace(compile verbose) {
    foreach (p in meta.target.parameters) {
        if (verbose) { log($"{p.name}={p.index}"); }
    }
    var result = meta.proceed();
    log(result);
    return result;
}
"#;
    let catalog = catalog();
    let template = parse(src);
    let model = NameBinder::new(&catalog).bind(&template);
    let table = table(&catalog, &EngineConfig::default());

    let (first, first_conflicts) = annotate(&template, &model, &table);
    let (second, second_conflicts) = annotate(&template, &model, &table);
    assert_eq!(first_conflicts, second_conflicts);

    let mut first_nodes: Vec<_> = first.nodes().map(|(id, a)| (*id, *a)).collect();
    let mut second_nodes: Vec<_> = second.nodes().map(|(id, a)| (*id, *a)).collect();
    first_nodes.sort_by_key(|(id, _)| *id);
    second_nodes.sort_by_key(|(id, _)| *id);
    assert_eq!(first_nodes, second_nodes);
}
