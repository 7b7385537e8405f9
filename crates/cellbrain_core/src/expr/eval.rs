//! Evaluable form of a resolved expression.

use super::{BinaryOp, UnaryOp};

/// Storage an operand reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarRef {
    /// Per-unit state index, read from the previous tick's snapshot.
    State(usize),
    /// External cell read, resolved from the neighboring unit.
    External(usize),
    /// Cell variable assigned by before-update statements.
    Temp(usize),
}

/// Values visible to an expression while it is evaluated.
pub trait Scope {
    fn var(&self, var: VarRef) -> i32;

    /// The slot's input array.
    fn input(&self) -> &[i32];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Const(i32),
    Var(VarRef),
    /// `automatonInput[index]`; the index wraps modulo the input length.
    Input(Box<Node>),
    InputLength,
    Unary(UnaryOp, Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    Select(Box<Node>, Box<Node>, Box<Node>),
}

impl Node {
    pub fn eval<S: Scope + ?Sized>(&self, scope: &S) -> i32 {
        match self {
            Self::Const(value) => *value,
            Self::Var(var) => scope.var(*var),
            Self::Input(index) => {
                let input = scope.input();
                if input.is_empty() {
                    return 0;
                }
                let idx = i64::from(index.eval(scope)).rem_euclid(input.len() as i64);
                input[idx as usize]
            }
            Self::InputLength => i32::try_from(scope.input().len()).unwrap_or(i32::MAX),
            Self::Unary(op, operand) => op.apply(operand.eval(scope)),
            Self::Binary(BinaryOp::And, lhs, rhs) => {
                i32::from(lhs.eval(scope) != 0 && rhs.eval(scope) != 0)
            }
            Self::Binary(BinaryOp::Or, lhs, rhs) => {
                i32::from(lhs.eval(scope) != 0 || rhs.eval(scope) != 0)
            }
            Self::Binary(op, lhs, rhs) => op.apply(lhs.eval(scope), rhs.eval(scope)),
            Self::Select(cond, then, otherwise) => {
                if cond.eval(scope) != 0 {
                    then.eval(scope)
                } else {
                    otherwise.eval(scope)
                }
            }
        }
    }
}
