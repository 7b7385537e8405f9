//! Integer expression language of cell update rules.
//!
//! Expressions arrive here after placeholder resolution, so every operand is
//! a plain identifier (`cell_1_out2`, `ex_in3`, ...), an integer literal or one
//! of the built-ins `automatonInput[i]` and `automatonInputLength`.
//!
//! # Semantics
//!
//! Values are `i32`. Arithmetic wraps, division and remainder by zero yield
//! zero, shift counts are masked to five bits and `>>` is arithmetic.
//! Comparisons and logical operators yield `1` or `0`.

pub mod eval;
pub mod lexer;
mod parser;

use std::fmt;

use thiserror::Error;

pub use eval::{Node, Scope, VarRef};
pub use parser::{parse_expr, parse_statements};

/// Name of the built-in array holding the slot's input values.
pub const AUTOMATON_INPUT: &str = "automatonInput";
/// Name of the built-in holding the length of the slot's input array.
pub const AUTOMATON_INPUT_LENGTH: &str = "automatonInputLength";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    #[error("unexpected character(s) '{slice}' at offset {offset}")]
    Lex { slice: String, offset: usize },

    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: &'static str, found: String },

    #[error("expected {0}, found end of expression")]
    UnexpectedEnd(&'static str),

    #[error("unknown identifier {0}")]
    UnknownIdentifier(String),

    #[error("{0} cannot be indexed")]
    NotIndexable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    BitNot,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

impl BinaryOp {
    /// Binding power; higher binds tighter.
    #[must_use]
    pub fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::BitOr => 3,
            Self::BitXor => 4,
            Self::BitAnd => 5,
            Self::Eq | Self::Ne => 6,
            Self::Lt | Self::Le | Self::Gt | Self::Ge => 7,
            Self::Shl | Self::Shr => 8,
            Self::Add | Self::Sub => 9,
            Self::Mul | Self::Div | Self::Rem => 10,
        }
    }

    #[must_use]
    pub fn apply(self, lhs: i32, rhs: i32) -> i32 {
        match self {
            Self::Mul => lhs.wrapping_mul(rhs),
            Self::Div => {
                if rhs == 0 {
                    0
                } else {
                    lhs.wrapping_div(rhs)
                }
            }
            Self::Rem => {
                if rhs == 0 {
                    0
                } else {
                    lhs.wrapping_rem(rhs)
                }
            }
            Self::Add => lhs.wrapping_add(rhs),
            Self::Sub => lhs.wrapping_sub(rhs),
            Self::Shl => lhs.wrapping_shl((rhs & 31) as u32),
            Self::Shr => lhs.wrapping_shr((rhs & 31) as u32),
            Self::Lt => i32::from(lhs < rhs),
            Self::Le => i32::from(lhs <= rhs),
            Self::Gt => i32::from(lhs > rhs),
            Self::Ge => i32::from(lhs >= rhs),
            Self::Eq => i32::from(lhs == rhs),
            Self::Ne => i32::from(lhs != rhs),
            Self::BitAnd => lhs & rhs,
            Self::BitXor => lhs ^ rhs,
            Self::BitOr => lhs | rhs,
            Self::And => i32::from(lhs != 0 && rhs != 0),
            Self::Or => i32::from(lhs != 0 || rhs != 0),
        }
    }
}

impl UnaryOp {
    #[must_use]
    pub fn apply(self, value: i32) -> i32 {
        match self {
            Self::Neg => value.wrapping_neg(),
            Self::Plus => value,
            Self::BitNot => !value,
            Self::Not => i32::from(value == 0),
        }
    }
}

/// Parsed expression tree with unresolved identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Number(i32),
    Ident(String),
    Index(String, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Identifiers referenced by the expression, in source order.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_identifiers(&mut out);
        out
    }

    fn collect_identifiers<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Number(_) => {}
            Self::Ident(name) => out.push(name),
            Self::Index(name, index) => {
                out.push(name);
                index.collect_identifiers(out);
            }
            Self::Unary(_, operand) => operand.collect_identifiers(out),
            Self::Binary(_, lhs, rhs) => {
                lhs.collect_identifiers(out);
                rhs.collect_identifiers(out);
            }
            Self::Conditional(cond, then, otherwise) => {
                cond.collect_identifiers(out);
                then.collect_identifiers(out);
                otherwise.collect_identifiers(out);
            }
        }
    }

    /// Lowers the tree into an evaluable [`Node`], resolving every plain
    /// identifier through `resolve`.
    pub fn lower<F>(&self, resolve: &mut F) -> Result<Node, ExprError>
    where
        F: FnMut(&str) -> Option<VarRef>,
    {
        Ok(match self {
            Self::Number(value) => Node::Const(*value),
            Self::Ident(name) if name == AUTOMATON_INPUT_LENGTH => Node::InputLength,
            Self::Ident(name) => Node::Var(
                resolve(name).ok_or_else(|| ExprError::UnknownIdentifier(name.clone()))?,
            ),
            Self::Index(name, index) => {
                if name != AUTOMATON_INPUT {
                    return Err(ExprError::NotIndexable(name.clone()));
                }
                Node::Input(Box::new(index.lower(resolve)?))
            }
            Self::Unary(op, operand) => Node::Unary(*op, Box::new(operand.lower(resolve)?)),
            Self::Binary(op, lhs, rhs) => Node::Binary(
                *op,
                Box::new(lhs.lower(resolve)?),
                Box::new(rhs.lower(resolve)?),
            ),
            Self::Conditional(cond, then, otherwise) => Node::Select(
                Box::new(cond.lower(resolve)?),
                Box::new(then.lower(resolve)?),
                Box::new(otherwise.lower(resolve)?),
            ),
        })
    }
}

impl BinaryOp {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::BitAnd => "&",
            Self::BitXor => "^",
            Self::BitOr => "|",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

impl UnaryOp {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Plus => "+",
            Self::BitNot => "~",
            Self::Not => "!",
        }
    }
}

/// C-compatible rendering; compound operands are parenthesized.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn operand(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
            match expr {
                Expr::Binary(..) | Expr::Conditional(..) => write!(f, "({expr})"),
                _ => write!(f, "{expr}"),
            }
        }

        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Ident(name) => f.write_str(name),
            Self::Index(name, index) => write!(f, "{name}[{index}]"),
            Self::Unary(op, inner) => {
                f.write_str(op.symbol())?;
                operand(f, inner)
            }
            Self::Binary(op, lhs, rhs) => {
                operand(f, lhs)?;
                write!(f, " {} ", op.symbol())?;
                operand(f, rhs)
            }
            Self::Conditional(cond, then, otherwise) => {
                operand(f, cond)?;
                f.write_str(" ? ")?;
                operand(f, then)?;
                f.write_str(" : ")?;
                operand(f, otherwise)
            }
        }
    }
}

/// One `[int] target = value;` statement of a before-update block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub target: String,
    pub value: Expr,
}
