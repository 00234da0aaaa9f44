//! FILENAME: parser/src/lexer.rs
//! PURPOSE: Scans raw cell text and produces a stream of Tokens.
//! CONTEXT: This is the first stage of the parsing pipeline. It handles
//! whitespace skipping, number parsing, quoted string literals, and the
//! single-character operators used in formulas.
//!
//! SUPPORTED TOKENS:
//! - Operators and delimiters: + - * / ( ) : =
//! - Numbers, including decimals: 3, 3.14, .5
//! - Quoted strings: "hello"
//! - Identifiers: maximal letter-then-alphanumeric runs like A1, AA100, SUM

use crate::token::Token;
use std::iter::Peekable;
use std::str::Chars;

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.chars().peekable(),
        }
    }

    /// Advances the lexer and returns the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        match self.input.next() {
            Some('+') => Token::Plus,
            Some('-') => Token::Minus,
            Some('*') => Token::Asterisk,
            Some('/') => Token::Slash,
            Some('(') => Token::LParen,
            Some(')') => Token::RParen,
            Some(':') => Token::Colon,
            Some('=') => Token::Equals,

            // Handle double quotes for strings
            Some('"') => self.read_string(),

            // Handle numbers (starts with digit or dot)
            Some(ch) if ch.is_ascii_digit() || ch == '.' => self.read_number(ch),

            // Handle identifiers (starts with letter)
            Some(ch) if ch.is_ascii_alphabetic() => self.read_identifier(ch),

            // End of input
            None => Token::EOF,

            // Unknown character
            Some(ch) => Token::Illegal(ch),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.input.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.input.next();
        }
    }

    fn read_string(&mut self) -> Token {
        let mut result = String::new();
        // Consume chars until we hit another quote or EOF
        while let Some(&ch) = self.input.peek() {
            if ch == '"' {
                self.input.next(); // Consume the closing quote
                return Token::String(result);
            }
            result.push(ch);
            self.input.next();
        }
        // If we hit EOF without closing quote, return what we have.
        Token::String(result)
    }

    fn read_number(&mut self, first_char: char) -> Token {
        let mut number_str = String::from(first_char);
        let mut has_dot = first_char == '.';

        while let Some(&ch) = self.input.peek() {
            if ch.is_ascii_digit() {
                number_str.push(ch);
                self.input.next();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                number_str.push(ch);
                self.input.next();
            } else {
                break;
            }
        }

        if let Ok(n) = number_str.parse::<f64>() {
            Token::Number(n)
        } else {
            // Fallback if parsing fails (e.g. just ".")
            Token::Illegal(first_char)
        }
    }

    fn read_identifier(&mut self, first_char: char) -> Token {
        let mut ident = String::from(first_char);

        while let Some(&ch) = self.input.peek() {
            if ch.is_ascii_alphanumeric() {
                ident.push(ch);
                self.input.next();
            } else {
                break;
            }
        }

        Token::Identifier(ident.to_uppercase()) // Normalize to UPPERCASE
    }
}
