use sp_core::ast::{
    Block, CatchClause, ParamStage, Stmt, StmtExpr, StmtForEach, StmtIf, StmtKind, StmtLocal,
    StmtReturn, StmtTry, StmtWhile, Template, TemplateKind, TemplateParam, Trivia,
};
use sp_core::Result;

use crate::lexer::{Keyword, TokenKind};
use crate::parser::TemplateParser;

impl TemplateParser {
    /// `template <kind> name(params) { body }`
    pub fn parse_template(&mut self) -> Result<Template> {
        self.expect_keyword(Keyword::Template)?;
        let kind = if self.match_keyword(Keyword::Method) {
            TemplateKind::Method
        } else if self.match_keyword(Keyword::Getter) {
            TemplateKind::Getter
        } else if self.match_keyword(Keyword::Setter) {
            TemplateKind::Setter
        } else {
            return Err(self.unexpected("`method`, `getter` or `setter`"));
        };
        let (name, _) = self.expect_ident()?;
        self.expect_symbol("(")?;
        let params = self.parse_comma_list(")", Self::parse_param)?;
        self.expect_symbol(")")?;
        let body = self.parse_block()?;
        tracing::debug!(
            "parsed template `{}` with {} parameters",
            name,
            params.len()
        );
        Ok(Template {
            name,
            kind,
            params,
            body,
        })
    }

    fn parse_param(&mut self) -> Result<TemplateParam> {
        let start = self.peek_span();
        let stage = if self.match_keyword(Keyword::Compile) {
            ParamStage::CompileTime
        } else {
            ParamStage::RunTime
        };
        let (name, name_span) = self.expect_ident()?;
        Ok(TemplateParam {
            id: self.fresh_id(),
            span: start.to(name_span),
            name,
            stage,
        })
    }

    pub fn parse_block(&mut self) -> Result<Block> {
        let open = self.expect_symbol("{")?;
        let mut stmts = Vec::new();
        loop {
            let comments = self.take_comments();
            if self.peek_symbol("}") {
                // trailing comments have no statement to attach to
                break;
            }
            if self.peek().is_none() {
                return Err(self.unexpected("`}`"));
            }
            let stmt = self.parse_stmt()?;
            stmts.push(stmt.with_trivia(Trivia { comments }));
        }
        let close = self.expect_symbol("}")?;
        Ok(Block {
            id: self.fresh_id(),
            span: open.to(close),
            stmts,
        })
    }

    pub fn parse_stmt(&mut self) -> Result<Stmt> {
        let start = self.peek_span();
        let kind = match self.peek().map(|token| token.kind.clone()) {
            Some(TokenKind::Keyword(Keyword::Var)) => {
                self.bump();
                let (name, _) = self.expect_ident()?;
                let init = if self.match_symbol("=") {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                self.expect_symbol(";")?;
                StmtKind::Local(StmtLocal { name, init })
            }
            Some(TokenKind::Keyword(Keyword::If)) => {
                self.bump();
                StmtKind::If(self.parse_if_tail()?)
            }
            Some(TokenKind::Keyword(Keyword::While)) => {
                self.bump();
                self.expect_symbol("(")?;
                let cond = self.parse_expr()?;
                self.expect_symbol(")")?;
                let body = self.parse_block()?;
                StmtKind::While(StmtWhile { cond, body })
            }
            Some(TokenKind::Keyword(Keyword::Foreach)) => {
                self.bump();
                self.expect_symbol("(")?;
                let (binding, _) = self.expect_ident()?;
                self.expect_keyword(Keyword::In)?;
                let iter = self.parse_expr()?;
                self.expect_symbol(")")?;
                let body = self.parse_block()?;
                StmtKind::ForEach(StmtForEach {
                    binding,
                    iter,
                    body,
                })
            }
            Some(TokenKind::Keyword(Keyword::Return)) => {
                self.bump();
                let value = if self.peek_symbol(";") {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect_symbol(";")?;
                StmtKind::Return(StmtReturn { value })
            }
            Some(TokenKind::Keyword(Keyword::Break)) => {
                self.bump();
                self.expect_symbol(";")?;
                StmtKind::Break
            }
            Some(TokenKind::Keyword(Keyword::Continue)) => {
                self.bump();
                self.expect_symbol(";")?;
                StmtKind::Continue
            }
            Some(TokenKind::Keyword(Keyword::Try)) => {
                self.bump();
                StmtKind::Try(self.parse_try_tail()?)
            }
            Some(TokenKind::Symbol) if self.peek_symbol("{") => StmtKind::Block(self.parse_block()?),
            Some(_) => {
                let expr = self.parse_expr()?;
                self.expect_symbol(";")?;
                StmtKind::Expr(StmtExpr { expr })
            }
            None => return Err(self.unexpected("statement")),
        };
        let span = start.to(self.prev_span());
        Ok(Stmt::new(self.fresh_id(), span, kind))
    }

    fn parse_if_tail(&mut self) -> Result<StmtIf> {
        self.expect_symbol("(")?;
        let cond = self.parse_expr()?;
        self.expect_symbol(")")?;
        let then = self.parse_block()?;
        let elze = if self.match_keyword(Keyword::Else) {
            let start = self.peek_span();
            let kind = if self.match_keyword(Keyword::If) {
                StmtKind::If(self.parse_if_tail()?)
            } else {
                StmtKind::Block(self.parse_block()?)
            };
            let span = start.to(self.prev_span());
            Some(Box::new(Stmt::new(self.fresh_id(), span, kind)))
        } else {
            None
        };
        Ok(StmtIf { cond, then, elze })
    }

    fn parse_try_tail(&mut self) -> Result<StmtTry> {
        let body = self.parse_block()?;
        let mut catches = Vec::new();
        while self.peek_keyword(Keyword::Catch) {
            let start = self.peek_span();
            self.bump();
            let (exception_type, binding) = if self.match_symbol("(") {
                let (first, _) = self.expect_ident()?;
                let second = if self.peek_symbol(")") {
                    None
                } else {
                    Some(self.expect_ident()?.0)
                };
                self.expect_symbol(")")?;
                (Some(first), second)
            } else {
                (None, None)
            };
            let filter = if self.match_keyword(Keyword::When) {
                self.expect_symbol("(")?;
                let filter = self.parse_expr()?;
                self.expect_symbol(")")?;
                Some(filter)
            } else {
                None
            };
            let body = self.parse_block()?;
            catches.push(CatchClause {
                id: self.fresh_id(),
                span: start.to(body.span),
                exception_type,
                binding,
                filter,
                body,
            });
        }
        let finally = if self.match_keyword(Keyword::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };
        if catches.is_empty() && finally.is_none() {
            return Err(self.unexpected("`catch` or `finally`"));
        }
        Ok(StmtTry {
            body,
            catches,
            finally,
        })
    }
}
