//! Syntax tree of the policy-script language.

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Stmt {
    Return(Option<Expr>),
    If {
        cond: Expr,
        then: Vec<Stmt>,
        otherwise: Option<Vec<Stmt>>,
    },
    Def {
        name: String,
        value: Expr,
    },
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Eq,
    Ne,
    And,
    Or,
    Concat,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Part {
    Lit(String),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Null,
    Bool(bool),
    Str(String),
    /// Double-quoted string with `${...}` or `$name` interpolation.
    Template(Vec<Part>),
    Ident(String),
    Property(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Method {
        target: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
    Not(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Elvis(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Number of nodes on the longest path from this node to a leaf.
    pub(crate) fn height(&self) -> usize {
        1 + match self {
            Expr::Null | Expr::Bool(_) | Expr::Str(_) | Expr::Ident(_) => 0,
            Expr::Template(parts) => parts
                .iter()
                .map(|part| match part {
                    Part::Lit(_) => 0,
                    Part::Expr(expr) => expr.height(),
                })
                .max()
                .unwrap_or(0),
            Expr::Property(inner, _) | Expr::Not(inner) => inner.height(),
            Expr::Index(a, b) | Expr::Binary(_, a, b) | Expr::Elvis(a, b) => {
                a.height().max(b.height())
            }
            Expr::Call { args, .. } => max_height(args),
            Expr::Method { target, args, .. } => target.height().max(max_height(args)),
            Expr::Ternary(cond, then, otherwise) => {
                cond.height().max(then.height()).max(otherwise.height())
            }
        }
    }
}

fn max_height(exprs: &[Expr]) -> usize {
    exprs.iter().map(Expr::height).max().unwrap_or(0)
}
