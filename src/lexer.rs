// Assembly source tokenizer.
// (C) Ryan Jeffrey <ryan@ryanmj.xyz>, 2022
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at
// your option) any later version.

// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU
// General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use std::fmt;
use util::Result;

// Enum and struct definitions.

/// Token classes of the assembly grammar. Comments and whitespace are
/// consumed by the lexer and never reach the token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// The `section` keyword.
    Keyword,
    /// One of `: + - , ( )`.
    Symbol,
    /// A decimal number.
    NumberLiteral,
    /// A quoted character; the token value is the bare character.
    CharLiteral,
    /// An identifier: mnemonic, register, label or section name.
    StringLiteral,
    /// End of a source line.
    Eol,
}

/// One token with its source position (1-based line and column). The source
/// is case-insensitive and values are lowercased on capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub line: u32,
    pub pos: u32,
}

// Public functions.

/// Tokenize an assembly source. Any character sequence outside the grammar
/// is fatal, with its line and column in the diagnostic.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = source.chars().collect();
    let mut num = 0;
    let mut line = 1u32;
    let mut pos = 1u32;

    while num < chars.len() {
        let c = chars[num];
        let start_line = line;
        let start_pos = pos;

        if c == '\n' {
            tokens.push(Token::new(TokenType::Eol, String::new(), start_line, start_pos));
            num += 1;
            line += 1;
            pos = 1;
        } else if c == ';' {
            // Comment runs to the end of the line; the newline itself is
            // left for the Eol rule.
            while num < chars.len() && chars[num] != '\n' {
                num += 1;
                pos += 1;
            }
        } else if c.is_whitespace() {
            num += 1;
            pos += 1;
        } else if is_symbol(c) {
            tokens.push(Token::new(TokenType::Symbol, c.to_string(), start_line, start_pos));
            num += 1;
            pos += 1;
        } else if c.is_ascii_digit() {
            let mut value = String::new();
            while num < chars.len() && chars[num].is_ascii_digit() {
                value.push(chars[num]);
                num += 1;
                pos += 1;
            }
            tokens.push(Token::new(TokenType::NumberLiteral, value, start_line, start_pos));
        } else if c == '\'' {
            num += 1;
            pos += 1;
            let mut value = String::new();
            loop {
                if num >= chars.len() || chars[num] == '\n' {
                    berr!(
                        "line {}, column {}: unterminated character literal",
                        start_line,
                        start_pos
                    );
                }
                if chars[num] == '\'' {
                    num += 1;
                    pos += 1;
                    break;
                }
                value.push(chars[num]);
                num += 1;
                pos += 1;
            }
            tokens.push(Token::new(
                TokenType::CharLiteral,
                value.trim().to_lowercase(),
                start_line,
                start_pos,
            ));
        } else if is_identifier_start(c) {
            let mut value = String::new();
            value.push(c);
            num += 1;
            pos += 1;
            while num < chars.len() && is_identifier_part(chars[num]) {
                value.push(chars[num]);
                num += 1;
                pos += 1;
            }
            let value = value.to_lowercase();
            let token_type = if value == "section" {
                TokenType::Keyword
            } else {
                TokenType::StringLiteral
            };
            tokens.push(Token::new(token_type, value, start_line, start_pos));
        } else {
            berr!(
                "line {}, column {}: unrecognized lexeme starting with {:?}",
                start_line,
                start_pos,
                c
            );
        }
    }

    Ok(tokens)
}

// Struct impls.

impl Token {
    pub fn new(token_type: TokenType, value: String, line: u32, pos: u32) -> Self {
        Self {
            token_type: token_type,
            value: value,
            line: line,
            pos: pos,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:?} {:?} at line {}, column {}",
            self.token_type, self.value, self.line, self.pos
        )
    }
}

// Private functions.

fn is_symbol(c: char) -> bool {
    match c {
        ':' | '+' | '-' | ',' | '(' | ')' => true,
        _ => false,
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '.'
}

fn is_identifier_part(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
