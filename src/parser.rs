use log::{debug, trace};
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;
use crate::lexer::{LexError, Lexer, Token, TokenKind};

#[derive(Diagnostic, Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lex(#[from] LexError),

    #[error("expected {expected}, got {found}")]
    UnexpectedToken {
        expected: TokenKind,
        found: TokenKind,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("expected integer or `(`, got {found}")]
    ExpectedOperand {
        found: TokenKind,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("unexpected {found} after a complete expression")]
    #[diagnostic(help("operators must sit between operands"))]
    TrailingInput {
        found: TokenKind,
        #[label("leftover input starts here")]
        span: SourceSpan,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    pub fn symbol(self) -> char {
        match self {
            Op::Add => '+',
            Op::Sub => '-',
            Op::Mul => '*',
            Op::Div => '/',
        }
    }

    fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Plus => Some(Op::Add),
            TokenKind::Minus => Some(Op::Sub),
            TokenKind::Star => Some(Op::Mul),
            TokenKind::Slash => Some(Op::Div),
            _ => None,
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Syntax tree for one input line. Children are owned, so the tree can never
/// share nodes or form a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal(i64),
    Binary {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn binary(op: Op, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

// Tears the tree down with a loop; a long operator chain is a left-deep tree
// that would otherwise be dropped recursively.
impl Drop for Expr {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        if let Expr::Binary { left, right, .. } = self {
            pending.push(std::mem::replace(&mut **left, Expr::Literal(0)));
            pending.push(std::mem::replace(&mut **right, Expr::Literal(0)));
        }
        while let Some(mut node) = pending.pop() {
            if let Expr::Binary { left, right, .. } = &mut node {
                pending.push(std::mem::replace(&mut **left, Expr::Literal(0)));
                pending.push(std::mem::replace(&mut **right, Expr::Literal(0)));
            }
        }
    }
}

enum Piece<'e> {
    Node(&'e Expr),
    Op(Op),
    Close,
}

// Fully parenthesized infix.
impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut stack = vec![Piece::Node(self)];
        while let Some(piece) = stack.pop() {
            match piece {
                Piece::Node(Expr::Literal(n)) => write!(f, "{}", n)?,
                Piece::Node(Expr::Binary { op, left, right }) => {
                    write!(f, "(")?;
                    stack.push(Piece::Close);
                    stack.push(Piece::Node(right.as_ref()));
                    stack.push(Piece::Op(*op));
                    stack.push(Piece::Node(left.as_ref()));
                }
                Piece::Op(op) => write!(f, " {} ", op)?,
                Piece::Close => write!(f, ")")?,
            }
        }
        Ok(())
    }
}

/// Recursive-descent parser for
///
/// ```text
/// expr   := term ( ("+" | "-") term )*
/// term   := factor ( ("*" | "/") factor )*
/// factor := INTEGER | "(" expr ")"
/// ```
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    /// Parses a whole line: one expression followed by the end of input.
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expr()?;
        if self.current.kind != TokenKind::EndOfInput {
            return Err(ParseError::TrailingInput {
                found: self.current.kind,
                span: self.current.span(),
            });
        }
        debug!("parsed {expr}");
        Ok(expr)
    }

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.parse_term()?;
        while let Some(op @ (Op::Add | Op::Sub)) = Op::from_token(self.current.kind) {
            self.eat(self.current.kind)?;
            let right = self.parse_term()?;
            node = Expr::binary(op, node, right);
        }
        Ok(node)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.parse_factor()?;
        while let Some(op @ (Op::Mul | Op::Div)) = Op::from_token(self.current.kind) {
            self.eat(self.current.kind)?;
            let right = self.parse_factor()?;
            node = Expr::binary(op, node, right);
        }
        Ok(node)
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        match self.current {
            Token {
                kind: TokenKind::Integer(n),
                ..
            } => {
                self.eat(TokenKind::Integer(n))?;
                Ok(Expr::Literal(n))
            }
            Token {
                kind: TokenKind::LeftParen,
                ..
            } => {
                self.eat(TokenKind::LeftParen)?;
                let node = self.parse_expr()?;
                self.eat(TokenKind::RightParen)?;
                Ok(node)
            }
            token => Err(ParseError::ExpectedOperand {
                found: token.kind,
                span: token.span(),
            }),
        }
    }

    /// Consumes the lookahead if it is `expected`, pulling the next token
    /// from the lexer.
    fn eat(&mut self, expected: TokenKind) -> Result<(), ParseError> {
        if self.current.kind != expected {
            return Err(ParseError::UnexpectedToken {
                expected,
                found: self.current.kind,
                span: self.current.span(),
            });
        }
        trace!("eating {}", self.current);
        self.current = self.lexer.next_token()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_input(input: &str) -> Result<Expr, ParseError> {
        Parser::new(input)?.parse()
    }

    fn lit(n: i64) -> Expr {
        Expr::Literal(n)
    }

    #[test]
    fn test_literal() {
        assert_eq!(parse_input("42"), Ok(lit(42)));
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse_input("2+3*4"),
            Ok(Expr::binary(
                Op::Add,
                lit(2),
                Expr::binary(Op::Mul, lit(3), lit(4))
            ))
        );
    }

    #[test]
    fn test_left_associative() {
        assert_eq!(
            parse_input("8-3-2"),
            Ok(Expr::binary(
                Op::Sub,
                Expr::binary(Op::Sub, lit(8), lit(3)),
                lit(2)
            ))
        );
        assert_eq!(
            parse_input("8/4/2").unwrap().to_string(),
            "((8 / 4) / 2)"
        );
    }

    #[test]
    fn test_parentheses_override_precedence() {
        assert_eq!(
            parse_input("(2+3)*4").unwrap().to_string(),
            "((2 + 3) * 4)"
        );
    }

    #[test]
    fn test_nested_parentheses() {
        assert_eq!(parse_input("((((7))))"), Ok(lit(7)));
        assert_eq!(
            parse_input(" ( 1 + (2 * (3 - 4)) ) / 5 ").unwrap().to_string(),
            "((1 + (2 * (3 - 4))) / 5)"
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            parse_input(""),
            Err(ParseError::ExpectedOperand {
                found: TokenKind::EndOfInput,
                ..
            })
        ));
    }

    #[test]
    fn test_dangling_operator() {
        assert!(matches!(
            parse_input("2+"),
            Err(ParseError::ExpectedOperand {
                found: TokenKind::EndOfInput,
                ..
            })
        ));
        assert!(matches!(
            parse_input("2+*3"),
            Err(ParseError::ExpectedOperand {
                found: TokenKind::Star,
                ..
            })
        ));
    }

    #[test]
    fn test_unclosed_paren() {
        assert!(matches!(
            parse_input("(2+3"),
            Err(ParseError::UnexpectedToken {
                expected: TokenKind::RightParen,
                found: TokenKind::EndOfInput,
                ..
            })
        ));
    }

    #[test]
    fn test_trailing_input() {
        assert!(matches!(
            parse_input("2 3"),
            Err(ParseError::TrailingInput {
                found: TokenKind::Integer(3),
                ..
            })
        ));
        assert!(matches!(
            parse_input("(1))"),
            Err(ParseError::TrailingInput {
                found: TokenKind::RightParen,
                ..
            })
        ));
    }

    #[test]
    fn test_unary_minus_rejected() {
        assert!(matches!(
            parse_input("-1"),
            Err(ParseError::ExpectedOperand {
                found: TokenKind::Minus,
                ..
            })
        ));
    }

    #[test]
    fn test_lex_error_surfaces() {
        assert!(matches!(
            parse_input("1 + x"),
            Err(ParseError::Lex(LexError::InvalidCharacter { ch: 'x', .. }))
        ));
    }

    #[test]
    fn test_error_message_names_both_kinds() {
        let err = parse_input("(1").unwrap_err();
        assert_eq!(err.to_string(), "expected `)`, got end of input");
    }

    #[test]
    fn test_long_chain_displays_and_drops() {
        let input = vec!["1"; 100_000].join("+");
        let expr = parse_input(&input).unwrap();
        let rendered = expr.to_string();
        assert!(rendered.starts_with("(((((1 + 1)"));
        assert!(rendered.ends_with(" + 1)"));
        drop(expr);
    }

    #[test]
    fn test_integer_token_carries_value() {
        let err = parse_input("(4 5)").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnexpectedToken {
                expected: TokenKind::RightParen,
                found: TokenKind::Integer(5),
                span: (3..4).into(),
            }
        );
        assert_eq!(err.to_string(), "expected `)`, got integer 5");
    }
}
