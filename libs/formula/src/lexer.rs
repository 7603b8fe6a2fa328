//! Formula lexer - tokenizes input strings
//!
//! Converts formula text into a stream of tokens. Keywords match in any
//! case (`AND`, `and`, `And`); the symbolic aliases `&&`, `||` and `!` map
//! onto the same token kinds. Two-character operators are read greedily so
//! `==`/`!=`/`<=`/`>=` win over their one-character prefixes.

use crate::error::{Error, Result};
use crate::token::{Token, TokenKind};

/// Default bound on formula length, in bytes.
pub const MAX_FORMULA_LEN: usize = 16 * 1024;

/// The formula lexer
pub struct Lexer {
    position: usize,
    line: usize,
    column: usize,
    chars: Vec<char>,
    current_char: Option<char>,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            position: 0,
            line: 1,
            column: 1,
            chars,
            current_char,
        }
    }

    /// Advance to the next character
    fn advance(&mut self) {
        if let Some(c) = self.current_char {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.position += 1;
        self.current_char = self.chars.get(self.position).copied();
    }

    /// Peek at the next character without advancing
    fn peek(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    /// Skip whitespace characters
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current_char {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Read an identifier
    fn read_identifier(&mut self) -> String {
        let start_pos = self.position;

        while let Some(c) = self.current_char {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        self.chars[start_pos..self.position].iter().collect()
    }

    /// Read a string literal delimited by `quote` (single or double)
    fn read_string(&mut self, quote: char) -> std::result::Result<String, String> {
        self.advance(); // Skip opening quote

        let mut value = String::new();

        while let Some(c) = self.current_char {
            if c == quote {
                self.advance(); // Skip closing quote
                return Ok(value);
            } else if c == '\\' {
                self.advance(); // Skip backslash
                let Some(escaped) = self.current_char else {
                    return Err("incomplete escape sequence".into());
                };
                match escaped {
                    '\'' => value.push('\''),
                    '"' => value.push('"'),
                    '\\' => value.push('\\'),
                    'n' => value.push('\n'),
                    'r' => value.push('\r'),
                    't' => value.push('\t'),
                    other => value.push(other),
                }
                self.advance();
            } else {
                value.push(c);
                self.advance();
            }
        }

        Err("unterminated string literal".into())
    }

    /// Read a decimal number with optional fraction
    fn read_number(&mut self) -> String {
        let start_pos = self.position;

        while let Some(c) = self.current_char {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        // Fractional part only when a digit follows the dot; a bare dot
        // stays behind as a property-access token.
        if self.current_char == Some('.') {
            if let Some(next) = self.peek() {
                if next.is_ascii_digit() {
                    self.advance(); // Skip '.'
                    while let Some(c) = self.current_char {
                        if c.is_ascii_digit() {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
            }
        }

        self.chars[start_pos..self.position].iter().collect()
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let position = self.position;
        let line = self.line;
        let column = self.column;

        let Some(c) = self.current_char else {
            return Token::eof(position, line, column);
        };

        match c {
            '.' => {
                self.advance();
                Token::new(TokenKind::Dot, ".".into(), position, line, column)
            }
            ',' => {
                self.advance();
                Token::new(TokenKind::Comma, ",".into(), position, line, column)
            }
            '(' => {
                self.advance();
                Token::new(TokenKind::OpenParen, "(".into(), position, line, column)
            }
            ')' => {
                self.advance();
                Token::new(TokenKind::CloseParen, ")".into(), position, line, column)
            }
            '[' => {
                self.advance();
                Token::new(TokenKind::OpenBracket, "[".into(), position, line, column)
            }
            ']' => {
                self.advance();
                Token::new(TokenKind::CloseBracket, "]".into(), position, line, column)
            }
            '=' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::new(TokenKind::Equal, "==".into(), position, line, column)
                } else {
                    Token::error(
                        "unexpected '=' (comparison is spelled '==')".into(),
                        position,
                        line,
                        column,
                    )
                }
            }
            '!' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::new(TokenKind::NotEqual, "!=".into(), position, line, column)
                } else {
                    // '!' without '=' is logical negation
                    Token::new(TokenKind::Not, "!".into(), position, line, column)
                }
            }
            '<' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::new(TokenKind::LessEqual, "<=".into(), position, line, column)
                } else {
                    Token::new(TokenKind::Less, "<".into(), position, line, column)
                }
            }
            '>' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::new(TokenKind::GreaterEqual, ">=".into(), position, line, column)
                } else {
                    Token::new(TokenKind::Greater, ">".into(), position, line, column)
                }
            }
            '&' => {
                self.advance();
                if self.current_char == Some('&') {
                    self.advance();
                    Token::new(TokenKind::And, "&&".into(), position, line, column)
                } else {
                    Token::error("unexpected '&' (conjunction is '&&' or 'AND')".into(), position, line, column)
                }
            }
            '|' => {
                self.advance();
                if self.current_char == Some('|') {
                    self.advance();
                    Token::new(TokenKind::Or, "||".into(), position, line, column)
                } else {
                    Token::error("unexpected '|' (disjunction is '||' or 'OR')".into(), position, line, column)
                }
            }
            '\'' | '"' => match self.read_string(c) {
                Ok(value) => Token::new(TokenKind::Str, value, position, line, column),
                Err(message) => Token::error(message, position, line, column),
            },
            _ => {
                if c.is_ascii_digit() {
                    let value = self.read_number();
                    Token::new(TokenKind::Number, value, position, line, column)
                } else if c.is_alphabetic() || c == '_' {
                    let ident = self.read_identifier();
                    // Keywords match in any case; everything else stays an
                    // identifier with its original spelling preserved.
                    let kind = match ident.to_ascii_lowercase().as_str() {
                        "and" => TokenKind::And,
                        "or" => TokenKind::Or,
                        "not" => TokenKind::Not,
                        "in" => TokenKind::In,
                        "true" => TokenKind::True,
                        "false" => TokenKind::False,
                        _ => TokenKind::Ident,
                    };
                    Token::new(kind, ident, position, line, column)
                } else {
                    self.advance();
                    Token::error(format!("unexpected character: {c}"), position, line, column)
                }
            }
        }
    }
}

/// Tokenize a whole formula eagerly, ending in `Eof`.
///
/// Enforces the formula length bound and surfaces the first lexical error
/// with its char offset.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    if input.len() > MAX_FORMULA_LEN {
        return Err(Error::FormulaTooLong {
            len: input.len(),
            limit: MAX_FORMULA_LEN,
        });
    }

    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        match token.kind {
            TokenKind::Error => {
                return Err(Error::Lex {
                    message: token.lexeme,
                    position: token.position,
                });
            }
            TokenKind::Eof => {
                tokens.push(token);
                return Ok(tokens);
            }
            _ => tokens.push(token),
        }
    }
}
