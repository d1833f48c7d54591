//! Arithmetic expressions over the symbol `n`
//!
//! Grammar (lowest to highest precedence):
//!   expr   := term (('+' | '-') term)*
//!   term   := unary (('*' | '/' | '%' | 'mod') unary)*
//!   unary  := ('+' | '-') unary | power
//!   power  := atom ('**' unary)?
//!   atom   := number | 'n' | '(' expr ')'
//!
//! Evaluation is exact over `i128` rationals; only the final result is
//! floored. Any overflow or division by zero makes the result undefined.

use std::fmt;

use num_rational::Ratio;
use num_traits::{CheckedAdd, CheckedDiv, CheckedMul, CheckedSub, Signed, Zero};
use thiserror::Error;

/// Exact value of a subexpression.
pub type Rational = Ratio<i128>;

/// Longest accepted expression, in tokens.
pub const MAX_TOKENS: usize = 1024;

/// Deepest accepted nesting of parentheses, signs and exponents.
pub const MAX_NESTING: usize = 256;

/// Errors raised while parsing a rule expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    /// Expression contained nothing but whitespace.
    #[error("empty expression")]
    Empty,

    /// A character that is not part of the grammar.
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar {
        /// Offending character.
        ch: char,
        /// Byte offset into the source.
        offset: usize,
    },

    /// An identifier other than `n` or `mod`.
    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    /// Numeric literal too large to represent exactly.
    #[error("numeric literal '{0}' is out of range")]
    LiteralOverflow(String),

    /// Token in a position the grammar does not allow.
    #[error("unexpected {found} at offset {offset}")]
    UnexpectedToken {
        /// Description of the token found.
        found: String,
        /// Byte offset into the source.
        offset: usize,
    },

    /// Input ended while more tokens were expected.
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    /// More tokens than [`MAX_TOKENS`].
    #[error("expression has {tokens} tokens (limit {limit})")]
    TooLong {
        /// Tokens found.
        tokens: usize,
        /// Accepted maximum.
        limit: usize,
    },

    /// Nesting deeper than [`MAX_NESTING`].
    #[error("expression nested deeper than {limit} levels at offset {offset}")]
    TooDeep {
        /// Accepted maximum.
        limit: usize,
        /// Byte offset where the limit was crossed.
        offset: usize,
    },
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/` (exact)
    Div,
    /// `%` / `mod`, sign follows the dividend
    Rem,
    /// `**`, integer exponents only
    Pow,
}

impl BinOp {
    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Pow => "**",
        }
    }
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// The input value `n`.
    Var,
    /// Exact constant.
    Const(Rational),
    /// Unary negation.
    Neg(Box<Expr>),
    /// Binary operation.
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Parse an expression from source text.
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(ExprError::Empty);
        }
        if tokens.len() > MAX_TOKENS {
            return Err(ExprError::TooLong {
                tokens: tokens.len(),
                limit: MAX_TOKENS,
            });
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let expr = parser.expr()?;
        match parser.peek() {
            None => Ok(expr),
            Some(tok) => Err(ExprError::UnexpectedToken {
                found: tok.kind.to_string(),
                offset: tok.offset,
            }),
        }
    }

    /// Evaluate exactly with `n` substituted.
    pub fn eval(&self, n: i64) -> Option<Rational> {
        match self {
            Expr::Var => Some(Rational::from_integer(n as i128)),
            Expr::Const(value) => Some(*value),
            Expr::Neg(inner) => Rational::zero().checked_sub(&inner.eval(n)?),
            Expr::Binary(op, lhs, rhs) => {
                let a = lhs.eval(n)?;
                let b = rhs.eval(n)?;
                match op {
                    BinOp::Add => a.checked_add(&b),
                    BinOp::Sub => a.checked_sub(&b),
                    BinOp::Mul => a.checked_mul(&b),
                    BinOp::Div => a.checked_div(&b),
                    BinOp::Rem => checked_rem(&a, &b),
                    BinOp::Pow => checked_pow(&a, &b),
                }
            }
        }
    }

    /// Evaluate and floor to an integer.
    pub fn eval_floor(&self, n: i64) -> Option<i64> {
        let exact = self.eval(n)?;
        i64::try_from(exact.floor().to_integer()).ok()
    }
}

/// Remainder whose sign follows the dividend: `a - b * trunc(a / b)`.
fn checked_rem(a: &Rational, b: &Rational) -> Option<Rational> {
    let quotient = a.checked_div(b)?.trunc();
    a.checked_sub(&b.checked_mul(&quotient)?)
}

/// Integer power; `None` for a fractional exponent, overflow, or `0 ** -k`.
fn checked_pow(base: &Rational, exponent: &Rational) -> Option<Rational> {
    if !exponent.is_integer() {
        return None;
    }
    let exp = u32::try_from(exponent.numer().unsigned_abs()).ok()?;
    let raised = Rational::new(base.numer().checked_pow(exp)?, base.denom().checked_pow(exp)?);
    if exponent.is_negative() {
        Rational::from_integer(1).checked_div(&raised)
    } else {
        Some(raised)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Var => write!(f, "n"),
            Expr::Const(value) => write!(f, "{}", value),
            Expr::Neg(inner) => write!(f, "-({})", inner),
            Expr::Binary(op, lhs, rhs) => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(Rational),
    Var,
    Op(BinOp),
    LParen,
    RParen,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(value) => write!(f, "number {}", value),
            TokenKind::Var => write!(f, "'n'"),
            TokenKind::Op(op) => write!(f, "'{}'", op.symbol()),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let offset = i;
        let kind = match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                i += 1;
                continue;
            }
            b'0'..=b'9' | b'.' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                let literal = &source[start..i];
                tokens.push(Token {
                    kind: TokenKind::Number(parse_literal(literal, start)?),
                    offset,
                });
                continue;
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                let ident = &source[start..i];
                let kind = match ident {
                    "n" => TokenKind::Var,
                    "mod" => TokenKind::Op(BinOp::Rem),
                    other => return Err(ExprError::UnknownIdentifier(other.to_string())),
                };
                tokens.push(Token { kind, offset });
                continue;
            }
            b'+' => TokenKind::Op(BinOp::Add),
            b'-' => TokenKind::Op(BinOp::Sub),
            b'*' if bytes.get(i + 1) == Some(&b'*') => {
                i += 1;
                TokenKind::Op(BinOp::Pow)
            }
            b'*' => TokenKind::Op(BinOp::Mul),
            b'/' => TokenKind::Op(BinOp::Div),
            b'%' => TokenKind::Op(BinOp::Rem),
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            _ => {
                let ch = source[i..].chars().next().unwrap_or('?');
                return Err(ExprError::UnexpectedChar { ch, offset });
            }
        };
        tokens.push(Token { kind, offset });
        i += 1;
    }

    Ok(tokens)
}

fn parse_literal(literal: &str, offset: usize) -> Result<Rational, ExprError> {
    let mut parts = literal.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let frac = parts.next().unwrap_or("");
    if frac.contains('.') || (whole.is_empty() && frac.is_empty()) {
        return Err(ExprError::UnexpectedChar { ch: '.', offset });
    }

    let overflow = || ExprError::LiteralOverflow(literal.to_string());
    let mut num: i128 = 0;
    let mut den: i128 = 1;
    for digit in whole.bytes().chain(frac.bytes()) {
        num = num
            .checked_mul(10)
            .and_then(|v| v.checked_add((digit - b'0') as i128))
            .ok_or_else(overflow)?;
    }
    for _ in 0..frac.len() {
        den = den.checked_mul(10).ok_or_else(overflow)?;
    }
    Ok(Rational::new(num, den))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_op(&self) -> Option<BinOp> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Op(op),
                ..
            }) => Some(*op),
            _ => None,
        }
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expr(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.term()?;
        while let Some(op @ (BinOp::Add | BinOp::Sub)) = self.peek_op() {
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.unary()?;
        while let Some(op @ (BinOp::Mul | BinOp::Div | BinOp::Rem)) = self.peek_op() {
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ExprError::TooDeep {
                limit: MAX_NESTING,
                offset: self.peek().map_or(0, |tok| tok.offset),
            });
        }
        let parsed = self.signed();
        self.depth -= 1;
        parsed
    }

    fn signed(&mut self) -> Result<Expr, ExprError> {
        match self.peek_op() {
            Some(BinOp::Sub) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(BinOp::Add) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr, ExprError> {
        let base = self.atom()?;
        if self.peek_op() == Some(BinOp::Pow) {
            self.pos += 1;
            // Right-associative: 2**3**2 == 2**(3**2)
            let exponent = self.unary()?;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr, ExprError> {
        let tok = self.next().ok_or(ExprError::UnexpectedEnd)?;
        match tok.kind {
            TokenKind::Number(value) => Ok(Expr::Const(value)),
            TokenKind::Var => Ok(Expr::Var),
            TokenKind::LParen => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => Ok(inner),
                    Some(other) => Err(ExprError::UnexpectedToken {
                        found: other.kind.to_string(),
                        offset: other.offset,
                    }),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            other => Err(ExprError::UnexpectedToken {
                found: other.to_string(),
                offset: tok.offset,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        let expr = Expr::parse("3*n+1").unwrap();
        assert_eq!(expr.eval_floor(5), Some(16));

        let expr = Expr::parse("(4*n+2)/3").unwrap();
        assert_eq!(expr.eval_floor(2), Some(3));
        assert_eq!(expr.eval_floor(5), Some(7));
    }

    #[test]
    fn test_floor_only_at_the_end() {
        // Exact intermediate: 7/2 + 7/2 = 7, not 3 + 3
        let expr = Expr::parse("n/2 + n/2").unwrap();
        assert_eq!(expr.eval_floor(7), Some(7));

        // Floor rounds toward negative infinity
        let expr = Expr::parse("n/2").unwrap();
        assert_eq!(expr.eval_floor(-3), Some(-2));
    }

    #[test]
    fn test_power_is_right_associative() {
        let expr = Expr::parse("2**3**2").unwrap();
        assert_eq!(expr.eval_floor(0), Some(512));

        let expr = Expr::parse("-n**2").unwrap();
        assert_eq!(expr.eval_floor(3), Some(-9));
    }

    #[test]
    fn test_rejects_foreign_syntax() {
        assert!(matches!(
            Expr::parse("Math.floor(n)"),
            Err(ExprError::UnknownIdentifier(_))
        ));
        assert!(matches!(Expr::parse("n +"), Err(ExprError::UnexpectedEnd)));
        assert!(matches!(Expr::parse("   "), Err(ExprError::Empty)));
        assert!(matches!(
            Expr::parse("n ? 1"),
            Err(ExprError::UnexpectedChar { ch: '?', .. })
        ));
        assert!(matches!(
            Expr::parse("(n))"),
            Err(ExprError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_undefined_results() {
        assert_eq!(Expr::parse("n/0").unwrap().eval_floor(4), None);
        assert_eq!(Expr::parse("n % 0").unwrap().eval_floor(4), None);
        assert_eq!(Expr::parse("n**200").unwrap().eval_floor(3), None);
    }

    #[test]
    fn test_remainder_sign_follows_dividend() {
        let expr = Expr::parse("n % 3").unwrap();
        assert_eq!(expr.eval_floor(7), Some(1));
        assert_eq!(expr.eval_floor(-7), Some(-1));

        // 7.5 % 2 == 1.5
        let expr = Expr::parse("(n/2) % 2").unwrap();
        assert_eq!(expr.eval(15), Some(Rational::new(3, 2)));
    }

    #[test]
    fn test_negative_and_fractional_exponents() {
        let expr = Expr::parse("n**-2").unwrap();
        assert_eq!(expr.eval(2), Some(Rational::new(1, 4)));
        assert_eq!(expr.eval(0), None);
        assert_eq!(Expr::parse("n**(1/2)").unwrap().eval(4), None);
    }

    #[test]
    fn test_nesting_limit() {
        let ok = format!("{}n{}", "(".repeat(MAX_NESTING - 1), ")".repeat(MAX_NESTING - 1));
        assert_eq!(Expr::parse(&ok).unwrap().eval_floor(3), Some(3));

        let deep = format!("{}n{}", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        assert!(matches!(Expr::parse(&deep), Err(ExprError::TooDeep { .. })));

        let signs = format!("{}n", "-".repeat(MAX_NESTING + 1));
        assert!(matches!(Expr::parse(&signs), Err(ExprError::TooDeep { .. })));
    }

    #[test]
    fn test_token_limit() {
        let long = vec!["n"; MAX_TOKENS].join("+");
        assert!(matches!(
            Expr::parse(&long),
            Err(ExprError::TooLong { limit: MAX_TOKENS, .. })
        ));

        let nested = format!("{}n{}", "(".repeat(200_000), ")".repeat(200_000));
        assert!(matches!(Expr::parse(&nested), Err(ExprError::TooLong { .. })));
    }
}
