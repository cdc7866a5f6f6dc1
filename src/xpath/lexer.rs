//! XPath 1.0 tokenizer.
//!
//! Implements the lexical structure of
//! <https://www.w3.org/TR/xpath-10/#exprlex>, including the disambiguation
//! rules of section 3.7, in a single pass:
//!
//! - after a token that can end an operand, `*` is multiplication and an
//!   `NCName` is an operator name (`and`, `or`, `mod`, `div`);
//! - a name followed by `(` is a function name or node type;
//! - a name followed by `::` is an axis name.
//!
//! Non-ASCII bytes are accepted as name characters, so names may contain
//! any Unicode letters.

use std::fmt;

use super::types::XPathError;

const NODE_TYPE_NAMES: &[&str] = &["comment", "text", "processing-instruction", "node"];

/// A token of an XPath expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Dot,
    DotDot,
    At,
    Comma,
    ColonColon,
    Slash,
    DoubleSlash,
    Pipe,
    Plus,
    Minus,
    /// Multiplication. A wildcard name test is [`Token::Name`] `"*"`.
    Star,
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    And,
    Or,
    Mod,
    Div,
    Number(f64),
    Literal(String),
    /// A name test: `local`, `prefix:local`, or `*`.
    Name(String),
    /// `prefix:*`.
    PrefixWildcard(String),
    /// `$name`, without the `$`.
    VariableReference(String),
    FunctionName(String),
    NodeType(String),
    AxisName(String),
}

impl Token {
    /// Whether this token can end an operand, which turns a following `*`
    /// or operator name into an operator.
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            Self::RightParen
                | Self::RightBracket
                | Self::Dot
                | Self::DotDot
                | Self::Number(_)
                | Self::Literal(_)
                | Self::Name(_)
                | Self::PrefixWildcard(_)
                | Self::VariableReference(_)
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fixed = match self {
            Self::LeftParen => "(",
            Self::RightParen => ")",
            Self::LeftBracket => "[",
            Self::RightBracket => "]",
            Self::Dot => ".",
            Self::DotDot => "..",
            Self::At => "@",
            Self::Comma => ",",
            Self::ColonColon => "::",
            Self::Slash => "/",
            Self::DoubleSlash => "//",
            Self::Pipe => "|",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::LessThan => "<",
            Self::LessThanEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanEqual => ">=",
            Self::And => "and",
            Self::Or => "or",
            Self::Mod => "mod",
            Self::Div => "div",
            Self::Number(n) => return write!(f, "{n}"),
            Self::Literal(s) => return write!(f, "\"{s}\""),
            Self::PrefixWildcard(p) => return write!(f, "{p}:*"),
            Self::VariableReference(s) => return write!(f, "${s}"),
            Self::Name(s) | Self::FunctionName(s) | Self::NodeType(s) | Self::AxisName(s) => s,
        };
        f.write_str(fixed)
    }
}

/// A token and the byte offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

/// Tokenizes `input`.
///
/// # Errors
///
/// Returns [`XPathError::Syntax`] for unterminated literals, a lone `!` or
/// `:`, and characters that cannot start a token.
///
/// # Examples
///
/// ```
/// use xmlpath::xpath::lexer::{tokenize, Token};
///
/// let tokens: Vec<Token> = tokenize("h:td[1] * 2")
///     .unwrap()
///     .into_iter()
///     .map(|t| t.token)
///     .collect();
/// assert_eq!(tokens[0], Token::Name("h:td".into()));
/// assert_eq!(tokens[4], Token::Star);
/// ```
pub fn tokenize(input: &str) -> Result<Vec<Spanned>, XPathError> {
    Lexer {
        input,
        bytes: input.as_bytes(),
        pos: 0,
        tokens: Vec::new(),
    }
    .run()
}

struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Spanned>,
}

impl Lexer<'_> {
    fn run(mut self) -> Result<Vec<Spanned>, XPathError> {
        loop {
            self.skip_whitespace();
            let start = self.pos;
            let Some(byte) = self.peek() else {
                break;
            };
            let token = match byte {
                b'(' => self.single(Token::LeftParen),
                b')' => self.single(Token::RightParen),
                b'[' => self.single(Token::LeftBracket),
                b']' => self.single(Token::RightBracket),
                b'@' => self.single(Token::At),
                b',' => self.single(Token::Comma),
                b'|' => self.single(Token::Pipe),
                b'+' => self.single(Token::Plus),
                b'-' => self.single(Token::Minus),
                b'=' => self.single(Token::Equal),
                b'*' => {
                    self.pos += 1;
                    if self.after_operand() {
                        Token::Star
                    } else {
                        Token::Name("*".to_string())
                    }
                }
                b'/' => self.either(b'/', Token::DoubleSlash, Token::Slash),
                b'<' => self.either(b'=', Token::LessThanEqual, Token::LessThan),
                b'>' => self.either(b'=', Token::GreaterThanEqual, Token::GreaterThan),
                b'!' => {
                    if self.peek_at(1) != Some(b'=') {
                        return Err(XPathError::syntax(start, "expected '=' after '!'"));
                    }
                    self.pos += 2;
                    Token::NotEqual
                }
                b':' => {
                    if self.peek_at(1) != Some(b':') {
                        return Err(XPathError::syntax(start, "unexpected ':'"));
                    }
                    self.pos += 2;
                    Token::ColonColon
                }
                b'.' => match self.peek_at(1) {
                    Some(b'.') => {
                        self.pos += 2;
                        Token::DotDot
                    }
                    Some(b'0'..=b'9') => self.number()?,
                    _ => self.single(Token::Dot),
                },
                b'0'..=b'9' => self.number()?,
                b'"' | b'\'' => self.literal(byte)?,
                b'$' => {
                    self.pos += 1;
                    if !self.peek().is_some_and(is_name_start) {
                        return Err(XPathError::syntax(start, "expected a name after '$'"));
                    }
                    let (name, _) = self.qname();
                    Token::VariableReference(name)
                }
                _ if is_name_start(byte) => self.name_token(),
                _ => {
                    let ch = self.input[start..].chars().next().unwrap_or('?');
                    return Err(XPathError::syntax(
                        start,
                        format!("unexpected character '{ch}'"),
                    ));
                }
            };
            self.tokens.push(Spanned {
                token,
                position: start,
            });
        }
        Ok(self.tokens)
    }

    fn name_token(&mut self) -> Token {
        let (name, wildcard) = self.qname();
        if wildcard {
            return Token::PrefixWildcard(name);
        }
        if self.after_operand() {
            match name.as_str() {
                "and" => return Token::And,
                "or" => return Token::Or,
                "mod" => return Token::Mod,
                "div" => return Token::Div,
                _ => {}
            }
        }
        let rest = self.input[self.pos..].trim_start();
        if rest.starts_with('(') {
            if NODE_TYPE_NAMES.contains(&name.as_str()) {
                Token::NodeType(name)
            } else {
                Token::FunctionName(name)
            }
        } else if rest.starts_with("::") {
            Token::AxisName(name)
        } else {
            Token::Name(name)
        }
    }

    /// Reads `NCName`, `NCName:NCName` or `NCName:*`. The flag reports the
    /// `prefix:*` form, in which case the returned string is the prefix.
    fn qname(&mut self) -> (String, bool) {
        let start = self.pos;
        self.advance_while(is_name_char);
        if self.peek() == Some(b':') {
            match self.peek_at(1) {
                Some(b'*') => {
                    let prefix = self.input[start..self.pos].to_string();
                    self.pos += 2;
                    return (prefix, true);
                }
                Some(b) if is_name_start(b) => {
                    self.pos += 1;
                    self.advance_while(is_name_char);
                }
                _ => {}
            }
        }
        (self.input[start..self.pos].to_string(), false)
    }

    fn number(&mut self) -> Result<Token, XPathError> {
        let start = self.pos;
        self.advance_while(|b| b.is_ascii_digit());
        if self.peek() == Some(b'.') {
            self.pos += 1;
            self.advance_while(|b| b.is_ascii_digit());
        }
        let text = &self.input[start..self.pos];
        text.parse()
            .map(Token::Number)
            .map_err(|_| XPathError::syntax(start, format!("invalid number '{text}'")))
    }

    fn literal(&mut self, quote: u8) -> Result<Token, XPathError> {
        let start = self.pos;
        self.pos += 1;
        let content_start = self.pos;
        self.advance_while(|b| b != quote);
        if self.peek().is_none() {
            return Err(XPathError::syntax(start, "unterminated string literal"));
        }
        let content = self.input[content_start..self.pos].to_string();
        self.pos += 1;
        Ok(Token::Literal(content))
    }

    fn single(&mut self, token: Token) -> Token {
        self.pos += 1;
        token
    }

    fn either(&mut self, second: u8, double: Token, single: Token) -> Token {
        if self.peek_at(1) == Some(second) {
            self.pos += 2;
            double
        } else {
            self.pos += 1;
            single
        }
    }

    fn after_operand(&self) -> bool {
        self.tokens.last().is_some_and(|t| t.token.ends_operand())
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn advance_while(&mut self, pred: impl Fn(u8) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        self.advance_while(|b| b.is_ascii_whitespace());
    }
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_name_char(b: u8) -> bool {
    is_name_start(b) || b.is_ascii_digit() || b == b'-' || b == b'.'
}
