//! Formula parser - converts formula text to AST
//!
//! Recursive descent following the grammar precedence rules, lowest to
//! highest:
//! 1. OR
//! 2. AND
//! 3. NOT
//! 4. comparison (`==`, `!=`, `<`, `<=`, `>`, `>=`, `IN`)
//! 5. property access (`.`)
//! 6. grouping (`(...)`)
//!
//! `AND` and `OR` are left-associative. Identifiers resolve to typed
//! references during parsing (planets, signs, angles, dignities, aspect
//! kinds, scoped properties); an identifier that resolves to nothing is a
//! parse-time error, so nothing name-shaped survives into validation.

use crate::ast::{CmpOp, DomainKind, Expr, Literal, PropKind, Quantifier};
use crate::error::{Error, Result};
use crate::lexer::{Lexer, MAX_FORMULA_LEN};
use crate::token::{Token, TokenKind};
use astrea_chart::{Angle, AspectKind, Dignity, Planet, Sign};

/// Maximum nesting depth of a formula.
pub const MAX_RECURSION_DEPTH: usize = 256;

/// Parse a formula into an expression tree.
pub fn parse(input: &str) -> Result<Expr> {
    Parser::new(input)?.parse()
}

/// Parser for formula expressions
pub struct Parser {
    lexer: Lexer,
    current: Token,
    depth: usize,
}

impl Parser {
    /// Create a new parser for the given input string
    pub fn new(input: &str) -> Result<Self> {
        if input.len() > MAX_FORMULA_LEN {
            return Err(Error::FormulaTooLong {
                len: input.len(),
                limit: MAX_FORMULA_LEN,
            });
        }
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        let mut parser = Self {
            lexer,
            current,
            depth: 0,
        };
        parser.check_current()?;
        Ok(parser)
    }

    /// Parse the entire formula (top-level entry point)
    pub fn parse(&mut self) -> Result<Expr> {
        let expr = self.parse_or()?;

        if self.current.kind != TokenKind::Eof {
            return Err(self.unexpected("end of input"));
        }

        Ok(expr)
    }

    // ============================================
    // Token plumbing
    // ============================================

    fn check_current(&self) -> Result<()> {
        if self.current.kind == TokenKind::Error {
            return Err(Error::Lex {
                message: self.current.lexeme.clone(),
                position: self.current.position,
            });
        }
        Ok(())
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token();
        self.check_current()
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        if self.current.kind == kind {
            let token = self.current.clone();
            self.advance()?;
            Ok(token)
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, expected: &str) -> Error {
        if self.current.kind == TokenKind::Eof {
            Error::UnexpectedEof {
                expected: expected.to_string(),
            }
        } else {
            Error::UnexpectedToken {
                expected: expected.to_string(),
                found: if self.current.lexeme.is_empty() {
                    format!("{:?}", self.current.kind)
                } else {
                    self.current.lexeme.clone()
                },
                position: self.current.position,
            }
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_RECURSION_DEPTH {
            return Err(Error::TooDeep {
                max: MAX_RECURSION_DEPTH,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // ============================================
    // Precedence ladder
    // ============================================

    /// or_expr = and_expr ( OR and_expr )*
    fn parse_or(&mut self) -> Result<Expr> {
        self.enter()?;
        let mut left = self.parse_and()?;

        while self.current.kind == TokenKind::Or {
            self.advance()?;
            let right = self.parse_and()?;
            left = Expr::Or {
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        self.leave();
        Ok(left)
    }

    /// and_expr = not_expr ( AND not_expr )*
    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;

        while self.current.kind == TokenKind::And {
            self.advance()?;
            let right = self.parse_not()?;
            left = Expr::And {
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// not_expr = NOT not_expr | comparison
    fn parse_not(&mut self) -> Result<Expr> {
        if self.current.kind == TokenKind::Not {
            self.advance()?;
            let expr = self.parse_not()?;
            return Ok(Expr::Not {
                expr: Box::new(expr),
            });
        }
        self.parse_comparison()
    }

    /// comparison = value [ cmp_op value ]
    ///
    /// A bare value is legal where it is boolean-typed
    /// (`NOT Mercury.Retrograde`); the validator types it.
    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_value()?;

        let op = match self.current.kind {
            TokenKind::Equal => CmpOp::Eq,
            TokenKind::NotEqual => CmpOp::Ne,
            TokenKind::Less => CmpOp::Lt,
            TokenKind::LessEqual => CmpOp::Le,
            TokenKind::Greater => CmpOp::Gt,
            TokenKind::GreaterEqual => CmpOp::Ge,
            TokenKind::In => CmpOp::In,
            _ => return Ok(left),
        };
        self.advance()?;
        let right = self.parse_value()?;

        Ok(build_comparison(left, op, right))
    }

    /// value = "(" or_expr ")" | aggregator | call | property | literal | list
    fn parse_value(&mut self) -> Result<Expr> {
        self.enter()?;
        let expr = match self.current.kind {
            TokenKind::OpenParen => {
                self.advance()?;
                let inner = self.parse_or()?;
                self.expect(TokenKind::CloseParen, "')'")?;
                Ok(inner)
            }
            TokenKind::Number => {
                let token = self.current.clone();
                self.advance()?;
                let n: f64 = token.value_as_number()?;
                Ok(Expr::number(n))
            }
            TokenKind::Str => {
                let token = self.current.clone();
                self.advance()?;
                Ok(Expr::Literal(Literal::Str(token.lexeme)))
            }
            TokenKind::True => {
                self.advance()?;
                Ok(Expr::boolean(true))
            }
            TokenKind::False => {
                self.advance()?;
                Ok(Expr::boolean(false))
            }
            TokenKind::OpenBracket => self.parse_list(),
            TokenKind::Ident => self.parse_identifier(),
            _ => Err(self.unexpected("a value")),
        };
        self.leave();
        expr
    }

    /// list = "[" value { "," value } "]"
    fn parse_list(&mut self) -> Result<Expr> {
        let open = self.current.clone();
        self.advance()?; // Skip '['

        if self.current.kind == TokenKind::CloseBracket {
            return Err(Error::EmptyList {
                position: open.position,
            });
        }

        let mut elements = vec![self.parse_value()?];
        while self.current.kind == TokenKind::Comma {
            self.advance()?;
            elements.push(self.parse_value()?);
        }
        self.expect(TokenKind::CloseBracket, "']'")?;

        Ok(Expr::List(elements))
    }

    /// Resolve an identifier: function call, typed name reference, or
    /// scoped property. Name lookup is case-insensitive throughout.
    fn parse_identifier(&mut self) -> Result<Expr> {
        let token = self.current.clone();
        self.advance()?;

        // Function-call form: ident "(" ...
        if self.current.kind == TokenKind::OpenParen {
            return match token.lexeme.to_ascii_lowercase().as_str() {
                "any" => self.parse_aggregator(Quantifier::Any),
                "all" => self.parse_aggregator(Quantifier::All),
                "count" => self.parse_count(),
                "asp" => self.parse_aspect_call(),
                _ => Err(Error::UnknownFunction {
                    name: token.lexeme,
                    position: token.position,
                }),
            };
        }

        let name = token.lexeme.as_str();
        let expr = if let Some(planet) = Planet::lookup(name) {
            Expr::Planet(planet)
        } else if let Some(sign) = Sign::lookup(name) {
            Expr::Sign(sign)
        } else if let Some(angle) = Angle::lookup(name) {
            Expr::Angle(angle)
        } else if let Some(dignity) = Dignity::lookup(name) {
            Expr::Literal(Literal::Dignity(dignity))
        } else if let Some(kind) = AspectKind::lookup(name) {
            Expr::Literal(Literal::Aspect(kind))
        } else if let Some(prop) = PropKind::lookup(name) {
            // Bare property of the quantified element. Permitted anywhere
            // grammatically; the validator rejects it outside aggregators.
            Expr::Bound(prop)
        } else {
            return Err(Error::UnknownIdentifier {
                name: token.lexeme,
                position: token.position,
            });
        };

        self.parse_postfix(expr)
    }

    /// property = target { "." prop_ident }
    fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr> {
        while self.current.kind == TokenKind::Dot {
            self.advance()?;
            let token = self.expect(TokenKind::Ident, "a property name")?;
            let Some(prop) = PropKind::lookup(&token.lexeme) else {
                return Err(Error::UnknownProperty {
                    name: token.lexeme,
                    position: token.position,
                });
            };
            expr = Expr::Property {
                target: Box::new(expr),
                prop,
            };
        }
        Ok(expr)
    }

    /// aggregator = ("any"|"all") "(" domain [ WHERE or_expr ] ")"
    ///              "." property cmp_op value
    fn parse_aggregator(&mut self, quantifier: Quantifier) -> Result<Expr> {
        self.expect(TokenKind::OpenParen, "'('")?;
        let domain = self.parse_domain()?;

        let filter = if self.current_is_keyword("where") {
            self.advance()?;
            Some(Box::new(self.parse_or()?))
        } else {
            None
        };
        self.expect(TokenKind::CloseParen, "')'")?;

        self.expect(TokenKind::Dot, "'.'")?;
        let token = self.expect(TokenKind::Ident, "a property name")?;
        let Some(prop) = PropKind::lookup(&token.lexeme) else {
            return Err(Error::UnknownProperty {
                name: token.lexeme,
                position: token.position,
            });
        };
        let left = self.parse_postfix(Expr::Bound(prop))?;

        let op = match self.current.kind {
            TokenKind::Equal => CmpOp::Eq,
            TokenKind::NotEqual => CmpOp::Ne,
            TokenKind::Less => CmpOp::Lt,
            TokenKind::LessEqual => CmpOp::Le,
            TokenKind::Greater => CmpOp::Gt,
            TokenKind::GreaterEqual => CmpOp::Ge,
            TokenKind::In => CmpOp::In,
            _ => return Err(self.unexpected("a comparison operator")),
        };
        self.advance()?;
        let right = self.parse_value()?;

        Ok(Expr::Aggregate {
            quantifier,
            domain,
            filter,
            body: Box::new(build_comparison(left, op, right)),
        })
    }

    /// count = "count" "(" domain [ "," or_expr ] ")"
    fn parse_count(&mut self) -> Result<Expr> {
        self.expect(TokenKind::OpenParen, "'('")?;
        let domain = self.parse_domain()?;

        let filter = if self.current.kind == TokenKind::Comma {
            self.advance()?;
            Some(Box::new(self.parse_or()?))
        } else {
            None
        };
        self.expect(TokenKind::CloseParen, "')'")?;

        Ok(Expr::Count { domain, filter })
    }

    /// call = "Asp" "(" value "," value "," aspect_kind [ "," "orb" "<" number ] ")"
    fn parse_aspect_call(&mut self) -> Result<Expr> {
        self.expect(TokenKind::OpenParen, "'('")?;
        let p1 = self.parse_value()?;
        self.expect(TokenKind::Comma, "','")?;
        let p2 = self.parse_value()?;
        self.expect(TokenKind::Comma, "','")?;

        let token = self.expect(TokenKind::Ident, "an aspect kind")?;
        let Some(kind) = AspectKind::lookup(&token.lexeme) else {
            return Err(Error::UnknownIdentifier {
                name: token.lexeme,
                position: token.position,
            });
        };

        let orb = if self.current.kind == TokenKind::Comma {
            self.advance()?;
            let token = self.expect(TokenKind::Ident, "'orb'")?;
            if !token.lexeme.eq_ignore_ascii_case("orb") {
                return Err(Error::UnexpectedToken {
                    expected: "'orb'".to_string(),
                    found: token.lexeme,
                    position: token.position,
                });
            }
            self.expect(TokenKind::Less, "'<'")?;
            let number = self.expect(TokenKind::Number, "an orb bound")?;
            Some(number.value_as_number()?)
        } else {
            None
        };
        self.expect(TokenKind::CloseParen, "')'")?;

        Ok(Expr::Aspect {
            p1: Box::new(p1),
            p2: Box::new(p2),
            kind,
            orb,
        })
    }

    /// domain = "planet(s)" | "aspect(s)" | "house(s)" | "sign(s)"
    fn parse_domain(&mut self) -> Result<DomainKind> {
        let token = self.expect(TokenKind::Ident, "a domain (planet, aspect, house, sign)")?;
        DomainKind::lookup(&token.lexeme).ok_or(Error::UnexpectedToken {
            expected: "a domain (planet, aspect, house, sign)".to_string(),
            found: token.lexeme,
            position: token.position,
        })
    }

    fn current_is_keyword(&self, keyword: &str) -> bool {
        self.current.kind == TokenKind::Ident && self.current.lexeme.eq_ignore_ascii_case(keyword)
    }
}

impl Token {
    /// Parse the lexeme of a `Number` token.
    fn value_as_number(&self) -> Result<f64> {
        self.lexeme.parse::<f64>().map_err(|_| Error::Lex {
            message: format!("malformed number: {}", self.lexeme),
            position: self.position,
        })
    }
}

/// Build a comparison, rewriting house-valued numeric literals into
/// `Expr::House` so the validator can range-check them in place.
fn build_comparison(left: Expr, op: CmpOp, right: Expr) -> Expr {
    let (left, right) = if touches_house(&left) {
        (left, wrap_house(right))
    } else if touches_house(&right) {
        (wrap_house(left), right)
    } else {
        (left, right)
    };
    Expr::Comparison {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

fn touches_house(expr: &Expr) -> bool {
    matches!(expr.accessed_prop(), Some(PropKind::House))
}

fn wrap_house(expr: Expr) -> Expr {
    match expr {
        Expr::Literal(Literal::Number(n)) if n.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&n) => {
            Expr::House(n as u32)
        }
        Expr::List(elements) => Expr::List(elements.into_iter().map(wrap_house).collect()),
        other => other,
    }
}
