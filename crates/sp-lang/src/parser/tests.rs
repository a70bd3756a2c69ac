use std::collections::HashSet;

use pretty_assertions::assert_eq;
use sp_core::ast::print::{expr, print_block, Formatting};
use sp_core::ast::{
    ExprKind, InterpolatedPartKind, Literal, ParamStage, Stmt, StmtKind, TemplateKind,
};
use sp_core::Error;

use super::*;

const LOG_CALLS: &str = r#"
template method log_calls(compile prefix, value) {
    // comment carried into the residual code
    var n = meta.compile_time(0);
    if (meta.target.parameter_count > 0) { n = meta.compile_time(1); }
    log($"{prefix}: {n}");
    return meta.proceed();
}
"#;

fn collect_ids(stmt: &Stmt, ids: &mut Vec<NodeId>) {
    ids.push(stmt.id);
    match &stmt.kind {
        StmtKind::Local(local) => {
            if let Some(init) = &local.init {
                collect_expr_ids(init, ids);
            }
        }
        StmtKind::Expr(e) => collect_expr_ids(&e.expr, ids),
        StmtKind::Block(block) => collect_block_ids(block, ids),
        StmtKind::If(stmt_if) => {
            collect_expr_ids(&stmt_if.cond, ids);
            collect_block_ids(&stmt_if.then, ids);
            if let Some(elze) = &stmt_if.elze {
                collect_ids(elze, ids);
            }
        }
        StmtKind::While(stmt_while) => {
            collect_expr_ids(&stmt_while.cond, ids);
            collect_block_ids(&stmt_while.body, ids);
        }
        StmtKind::ForEach(each) => {
            collect_expr_ids(&each.iter, ids);
            collect_block_ids(&each.body, ids);
        }
        StmtKind::Return(ret) => {
            if let Some(value) = &ret.value {
                collect_expr_ids(value, ids);
            }
        }
        StmtKind::Break | StmtKind::Continue => {}
        StmtKind::Try(stmt_try) => {
            collect_block_ids(&stmt_try.body, ids);
            for catch in &stmt_try.catches {
                ids.push(catch.id);
                collect_block_ids(&catch.body, ids);
            }
            if let Some(finally) = &stmt_try.finally {
                collect_block_ids(finally, ids);
            }
        }
    }
}

fn collect_block_ids(block: &Block, ids: &mut Vec<NodeId>) {
    ids.push(block.id);
    for stmt in &block.stmts {
        collect_ids(stmt, ids);
    }
}

fn collect_expr_ids(e: &Expr, ids: &mut Vec<NodeId>) {
    ids.push(e.id);
    match &e.kind {
        ExprKind::Array(array) => {
            for element in &array.elements {
                ids.push(element.id);
            }
        }
        ExprKind::Interpolated(interp) => {
            for part in &interp.parts {
                ids.push(part.id);
            }
        }
        _ => {}
    }
    e.for_each_child(|child| collect_expr_ids(child, ids));
}

#[test]
fn parses_template_header_and_body() {
    let template = parse_template(LOG_CALLS).expect("parse");
    assert_eq!(template.name, "log_calls");
    assert_eq!(template.kind, TemplateKind::Method);
    assert_eq!(
        template
            .params
            .iter()
            .map(|param| (param.name.as_str(), param.stage))
            .collect::<Vec<_>>(),
        vec![("prefix", ParamStage::CompileTime), ("value", ParamStage::RunTime)]
    );
    assert_eq!(template.body.stmts.len(), 4);
    assert_eq!(
        template.body.stmts[0].trivia.comments,
        vec!["comment carried into the residual code".to_string()]
    );
    assert!(template.body.stmts[1].trivia.is_empty());
}

#[test]
fn node_ids_are_unique() {
    let template = parse_template(LOG_CALLS).expect("parse");
    let mut ids: Vec<NodeId> = template.params.iter().map(|param| param.id).collect();
    collect_block_ids(&template.body, &mut ids);
    let unique: HashSet<_> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());
}

#[test]
fn else_if_chains_nest() {
    let block = parse_block("{ if (a) { x; } else if (b) { y; } else { z; } }").expect("parse");
    let StmtKind::If(outer) = &block.stmts[0].kind else {
        panic!("expected if");
    };
    let inner = outer.elze.as_deref().expect("else branch");
    let StmtKind::If(inner) = &inner.kind else {
        panic!("expected else-if");
    };
    assert_eq!(expr(&inner.cond), "b");
    let last = inner.elze.as_deref().expect("final else");
    assert!(matches!(last.kind, StmtKind::Block(_)));
}

#[test]
fn interpolation_holes_are_expressions() {
    let parsed = parse_expr(r#"$"sum {a + 1} of {{items}}""#).expect("parse");
    let ExprKind::Interpolated(interp) = &parsed.kind else {
        panic!("expected interpolated string");
    };
    let kinds: Vec<String> = interp
        .parts
        .iter()
        .map(|part| match &part.kind {
            InterpolatedPartKind::Text(text) => format!("text:{text}"),
            InterpolatedPartKind::Hole(hole) => format!("hole:{}", expr(hole)),
        })
        .collect();
    assert_eq!(kinds, vec!["text:sum ", "hole:a + 1", "text: of {items}"]);
}

#[test]
fn precedence_and_assignment_associativity() {
    assert_eq!(expr(&parse_expr("1 + 2 * 3").expect("parse")), "1 + 2 * 3");
    assert_eq!(expr(&parse_expr("(1 + 2) * 3").expect("parse")), "(1 + 2) * 3");

    let assign = parse_expr("a = b += 2").expect("parse");
    let ExprKind::Assign(outer) = &assign.kind else {
        panic!("expected assignment");
    };
    assert_eq!(outer.op, None);
    assert!(matches!(&outer.value.kind, ExprKind::Assign(inner) if inner.op.is_some()));
}

#[test]
fn literals_and_arrays() {
    let parsed = parse_expr(r#"[1_000, "a\n", null, ...rest]"#).expect("parse");
    let ExprKind::Array(array) = &parsed.kind else {
        panic!("expected array");
    };
    assert_eq!(array.elements.len(), 4);
    assert!(matches!(
        array.elements[0].value.kind,
        ExprKind::Literal(Literal::Int(1000))
    ));
    assert!(matches!(
        &array.elements[1].value.kind,
        ExprKind::Literal(Literal::Str(text)) if text == "a\n"
    ));
    assert!(array.elements[3].spread);
}

#[test]
fn try_catch_finally() {
    let block = parse_block(
        "{ try { work(); } catch (IoError e) when (e.code > 1) { retry(); } catch { } finally { done(); } }",
    )
    .expect("parse");
    let StmtKind::Try(stmt_try) = &block.stmts[0].kind else {
        panic!("expected try");
    };
    assert_eq!(stmt_try.catches.len(), 2);
    assert_eq!(stmt_try.catches[0].exception_type.as_deref(), Some("IoError"));
    assert_eq!(stmt_try.catches[0].binding.as_deref(), Some("e"));
    assert!(stmt_try.catches[0].filter.is_some());
    assert!(stmt_try.catches[1].exception_type.is_none());
    assert!(stmt_try.finally.is_some());
}

#[test]
fn printed_block_reparses_to_same_text() {
    let source = "{ var total = 0; foreach (item in items) { if (item > 2) { break; } total += item; } return total; }";
    let formatting = Formatting::default();
    let first = print_block(&parse_block(source).expect("parse"), &formatting);
    let second = print_block(&parse_block(&first).expect("reparse"), &formatting);
    assert_eq!(first, second);
}

#[test]
fn errors_carry_spans() {
    let err = parse_template("template method t( { }").unwrap_err();
    match err {
        Error::Parse { message, span } => {
            assert!(message.contains("identifier"), "{message}");
            assert_eq!(span.lo, 19);
        }
        other => panic!("unexpected error {other:?}"),
    }

    let err = parse_block("{ x; ").unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));

    let err = parse_expr("a b").unwrap_err();
    match err {
        Error::Parse { message, .. } => assert!(message.contains("trailing"), "{message}"),
        other => panic!("unexpected error {other:?}"),
    }
}
