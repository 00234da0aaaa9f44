//! FILENAME: parser/src/parser.rs
//! PURPOSE: Recursive descent parser that converts raw cell text into an
//! expression tree.
//! CONTEXT: This is the second stage of the parsing pipeline. Cell text that
//! starts with '=' is parsed as a formula with precedence climbing; a bare
//! number becomes a Number node; anything else becomes a Text node holding
//! the trimmed input.
//!
//! GRAMMAR:
//!   expression --> "=" formula EOF
//!              |   NUMBER EOF
//!              |   <anything else: Text of the trimmed raw input>
//!   formula    --> term (op formula)*     ; precedence climbing, see read_formula
//!   term       --> "(" formula ")"
//!              |   NUMBER
//!              |   IDENT                  ; known function name or valid cell name
//!              |   <other token: Text of that single token>
//!   range      --> "(" IDENT (":" | "-") IDENT ")"
//!   op         --> "+" | "-" | "*" | "/"

use crate::ast::Expression;
use crate::lexer::Lexer;
use crate::range::{self, Range};
use crate::token::Token;

/// Parser errors with descriptive messages.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;

/// The Parser struct holds the lexer and current token state.
pub struct Parser<'a> {
    input: &'a str,
    lexer: Lexer<'a>,
    current_token: Token,
}

impl<'a> Parser<'a> {
    /// Creates a new parser from raw cell text.
    /// Automatically advances to the first token.
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token();
        Parser {
            input,
            lexer,
            current_token,
        }
    }

    /// Parses the entire cell text and returns the expression tree.
    /// The root of the returned tree carries the original raw text.
    pub fn parse(&mut self) -> ParseResult<Expression> {
        let mut exp = if self.current_token == Token::Equals {
            // beginning of a formula
            self.advance();
            let exp = self.read_formula(0)?;
            if self.current_token != Token::EOF {
                return Err(ParseError::new(format!(
                    "Unexpected token: \"{}\"",
                    self.current_token
                )));
            }
            exp
        } else if let Token::Number(n) = self.current_token {
            self.advance();
            if self.current_token == Token::EOF {
                Expression::number(n)
            } else {
                Expression::text(self.input.trim())
            }
        } else {
            Expression::text(self.input.trim())
        };

        exp.set_raw_text(self.input);
        Ok(exp)
    }

    /// Advances to the next token.
    fn advance(&mut self) {
        self.current_token = self.lexer.next_token();
    }

    /// Reads a formula with precedence climbing. Reads a term, then keeps
    /// consuming operators whose precedence exceeds `prec`, recursing at the
    /// operator's own precedence so that equal precedence stops the inner
    /// call and the formula groups left-associatively.
    fn read_formula(&mut self, prec: i32) -> ParseResult<Expression> {
        let mut exp = self.read_term()?;
        loop {
            let tprec = precedence(&self.current_token);
            if tprec <= prec {
                break;
            }
            let op = match self.current_token {
                Token::Plus => '+',
                Token::Minus => '-',
                Token::Asterisk => '*',
                Token::Slash => '/',
                _ => break,
            };
            self.advance();
            if self.current_token == Token::EOF {
                return Err(ParseError::new(format!(
                    "Invalid binary {} expression; missing right operand",
                    op
                )));
            }
            let rhs = self.read_formula(tprec)?;
            exp = Expression::compound(op, exp, rhs);
        }
        Ok(exp)
    }

    /// Reads a term: a parenthesized formula, a number, an identifier
    /// (a function call or a cell reference), or a stray token that is
    /// kept as a text constant.
    fn read_term(&mut self) -> ParseResult<Expression> {
        match self.current_token.clone() {
            Token::LParen => {
                // beginning of a parenthesized expression
                self.advance();
                let exp = self.read_formula(0)?;
                if self.current_token != Token::RParen {
                    return Err(ParseError::new("Unclosed parenthesis"));
                }
                self.advance();
                Ok(exp)
            }
            Token::Number(n) => {
                self.advance();
                Ok(Expression::number(n))
            }
            Token::Identifier(name) => {
                self.advance();
                if range::is_known_function_name(&name) {
                    let cells = self.read_range()?;
                    Ok(Expression::range_fn(name, cells))
                } else if range::is_valid_name(&name) {
                    Ok(Expression::identifier(name))
                } else {
                    Err(ParseError::new(format!(
                        "Invalid cell name or token: \"{}\"",
                        name
                    )))
                }
            }
            // a bare "=" is accepted as an empty text constant
            Token::EOF => Ok(Expression::text("")),
            token => {
                self.advance();
                Ok(Expression::text(token.to_string()))
            }
        }
    }

    /// Reads a range of cells such as (A1:A7) after a function name.
    /// Either ':' or '-' is accepted as the separator.
    fn read_range(&mut self) -> ParseResult<Range> {
        if self.current_token != Token::LParen {
            return Err(ParseError::new("Invalid range format; missing initial ("));
        }
        self.advance();

        let start_cell_name = match &self.current_token {
            Token::Identifier(name) if range::is_valid_name(name) => name.clone(),
            token => {
                return Err(ParseError::new(format!(
                    "Invalid start cell name for range: \"{}\"",
                    token
                )));
            }
        };
        self.advance();

        if self.current_token != Token::Colon && self.current_token != Token::Minus {
            return Err(ParseError::new("Invalid range format; missing : in middle"));
        }
        self.advance();

        let end_cell_name = match &self.current_token {
            Token::Identifier(name) if range::is_valid_name(name) => name.clone(),
            token => {
                return Err(ParseError::new(format!(
                    "Invalid end cell name for range: \"{}\"",
                    token
                )));
            }
        };
        self.advance();

        if self.current_token != Token::RParen {
            return Err(ParseError::new("Invalid range format; missing final )"));
        }
        self.advance();

        Range::from_names(&start_cell_name, &end_cell_name)
            .map_err(|err| ParseError::new(err.to_string()))
    }
}

/// Returns the binary operator precedence of the token: 1 for + and -,
/// 2 for * and /, 0 for anything that is not an operator.
fn precedence(token: &Token) -> i32 {
    match token {
        Token::Plus | Token::Minus => 1,
        Token::Asterisk | Token::Slash => 2,
        _ => 0,
    }
}

/// Convenience function to parse raw cell text directly.
pub fn parse(input: &str) -> ParseResult<Expression> {
    let mut parser = Parser::new(input);
    parser.parse()
}
