//! Precedence-climbing parser over [`lexer::Token`]s.

use super::lexer::{lex, Spanned, Token};
use super::{Assignment, BinaryOp, Expr, ExprError, UnaryOp};

/// Parses a single expression.
pub fn parse_expr(source: &str) -> Result<Expr, ExprError> {
    let tokens = lex(source)?;
    let mut parser = Parser::new(&tokens);
    let expr = parser.expression()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parses a sequence of `[int] name = expr;` statements. The final
/// semicolon may be omitted.
pub fn parse_statements(source: &str) -> Result<Vec<Assignment>, ExprError> {
    let tokens = lex(source)?;
    let mut parser = Parser::new(&tokens);
    let mut statements = Vec::new();
    while !parser.at_end() {
        if parser.peek() == Some(Token::Int) {
            parser.pos += 1;
        }
        let target = match parser.next() {
            Some(Token::Ident(name)) => name.to_string(),
            Some(other) => {
                return Err(ExprError::UnexpectedToken {
                    expected: "assignment target",
                    found: format!("{other:?}"),
                })
            }
            None => return Err(ExprError::UnexpectedEnd("assignment target")),
        };
        parser.expect(Token::Assign, "'='")?;
        let value = parser.expression()?;
        statements.push(Assignment { target, value });
        if !parser.at_end() {
            parser.expect(Token::Semicolon, "';'")?;
        }
    }
    Ok(statements)
}

struct Parser<'t, 'src> {
    tokens: &'t [Spanned<Token<'src>>],
    pos: usize,
}

impl<'t, 'src> Parser<'t, 'src> {
    fn new(tokens: &'t [Spanned<Token<'src>>]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<Token<'src>> {
        self.tokens.get(self.pos).map(|t| t.token)
    }

    fn next(&mut self) -> Option<Token<'src>> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn expect(&mut self, expected: Token<'src>, label: &'static str) -> Result<(), ExprError> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(ExprError::UnexpectedToken {
                expected: label,
                found: format!("{token:?}"),
            }),
            None => Err(ExprError::UnexpectedEnd(label)),
        }
    }

    fn expect_end(&self) -> Result<(), ExprError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(ExprError::UnexpectedToken {
                expected: "end of expression",
                found: format!("{token:?}"),
            }),
        }
    }

    fn expression(&mut self) -> Result<Expr, ExprError> {
        let cond = self.binary(1)?;
        if self.peek() != Some(Token::Question) {
            return Ok(cond);
        }
        self.pos += 1;
        let then = self.expression()?;
        self.expect(Token::Colon, "':'")?;
        let otherwise = self.expression()?;
        Ok(Expr::Conditional(
            Box::new(cond),
            Box::new(then),
            Box::new(otherwise),
        ))
    }

    fn binary(&mut self, min_precedence: u8) -> Result<Expr, ExprError> {
        let mut lhs = self.unary()?;
        while let Some(op) = self.peek().and_then(binary_op) {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.pos += 1;
            let rhs = self.binary(precedence + 1)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            Some(Token::Tilde) => UnaryOp::BitNot,
            Some(Token::Bang) => UnaryOp::Not,
            _ => return self.primary(),
        };
        self.pos += 1;
        Ok(Expr::Unary(op, Box::new(self.unary()?)))
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        match self.next() {
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::Ident(name)) => {
                if self.peek() == Some(Token::BracketOpen) {
                    self.pos += 1;
                    let index = self.expression()?;
                    self.expect(Token::BracketClose, "']'")?;
                    Ok(Expr::Index(name.to_string(), Box::new(index)))
                } else {
                    Ok(Expr::Ident(name.to_string()))
                }
            }
            Some(Token::ParenOpen) => {
                let inner = self.expression()?;
                self.expect(Token::ParenClose, "')'")?;
                Ok(inner)
            }
            Some(token) => Err(ExprError::UnexpectedToken {
                expected: "operand",
                found: format!("{token:?}"),
            }),
            None => Err(ExprError::UnexpectedEnd("operand")),
        }
    }
}

fn binary_op(token: Token<'_>) -> Option<BinaryOp> {
    Some(match token {
        Token::Star => BinaryOp::Mul,
        Token::Slash => BinaryOp::Div,
        Token::Percent => BinaryOp::Rem,
        Token::Plus => BinaryOp::Add,
        Token::Minus => BinaryOp::Sub,
        Token::Shl => BinaryOp::Shl,
        Token::Shr => BinaryOp::Shr,
        Token::Lt => BinaryOp::Lt,
        Token::Le => BinaryOp::Le,
        Token::Gt => BinaryOp::Gt,
        Token::Ge => BinaryOp::Ge,
        Token::EqEq => BinaryOp::Eq,
        Token::NotEq => BinaryOp::Ne,
        Token::Amp => BinaryOp::BitAnd,
        Token::Caret => BinaryOp::BitXor,
        Token::Pipe => BinaryOp::BitOr,
        Token::AndAnd => BinaryOp::And,
        Token::OrOr => BinaryOp::Or,
        _ => return None,
    })
}
