use std::fmt::{Display, Formatter};

common_enum! {
    #[derive(Copy, Eq, Hash)]
    pub enum BinOpKind {
        Add,
        Sub,
        Mul,
        Div,
        Mod,
        Eq,
        Ne,
        Lt,
        Le,
        Gt,
        Ge,
        And,
        Or,
    }
}

impl BinOpKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOpKind::Add => "+",
            BinOpKind::Sub => "-",
            BinOpKind::Mul => "*",
            BinOpKind::Div => "/",
            BinOpKind::Mod => "%",
            BinOpKind::Eq => "==",
            BinOpKind::Ne => "!=",
            BinOpKind::Lt => "<",
            BinOpKind::Le => "<=",
            BinOpKind::Gt => ">",
            BinOpKind::Ge => ">=",
            BinOpKind::And => "&&",
            BinOpKind::Or => "||",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let kind = match symbol {
            "+" => BinOpKind::Add,
            "-" => BinOpKind::Sub,
            "*" => BinOpKind::Mul,
            "/" => BinOpKind::Div,
            "%" => BinOpKind::Mod,
            "==" => BinOpKind::Eq,
            "!=" => BinOpKind::Ne,
            "<" => BinOpKind::Lt,
            "<=" => BinOpKind::Le,
            ">" => BinOpKind::Gt,
            ">=" => BinOpKind::Ge,
            "&&" => BinOpKind::And,
            "||" => BinOpKind::Or,
            _ => return None,
        };
        Some(kind)
    }

    /// Binding power used by the parser; higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            BinOpKind::Or => 1,
            BinOpKind::And => 2,
            BinOpKind::Eq | BinOpKind::Ne => 3,
            BinOpKind::Lt | BinOpKind::Le | BinOpKind::Gt | BinOpKind::Ge => 4,
            BinOpKind::Add | BinOpKind::Sub => 5,
            BinOpKind::Mul | BinOpKind::Div | BinOpKind::Mod => 6,
        }
    }
}

impl Display for BinOpKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

common_enum! {
    #[derive(Copy, Eq, Hash)]
    pub enum UnOpKind {
        Not,
        Neg,
    }
}

impl UnOpKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnOpKind::Not => "!",
            UnOpKind::Neg => "-",
        }
    }
}

impl Display for UnOpKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}
