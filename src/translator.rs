// Two-pass assembler: token walk and cell layout, then symbol resolution
// and instruction encoding.
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

use isa;
use isa::{Opcode, Term};
use lexer::{tokenize, Token, TokenType};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use util::{read_file_string, Result};

/// Inclusive bounds of the zero-extended wide immediate field.
pub const IMM_WIDE_MAX: i32 = 63;
/// Inclusive bounds of the sign-extended split immediate field.
pub const IMM_SPLIT_MIN: i32 = -32;
pub const IMM_SPLIT_MAX: i32 = 31;

// Macros.

macro_rules! bteg {
    ($line:expr, $pos:expr, $($arg:tt)*) => {
        return Err(Box::new(TranslateError::Grammar {
            line: $line,
            pos: $pos,
            descr: format!($($arg)*),
        }))
    };
}

macro_rules! bter {
    ($term:expr, $value:expr, $low:expr, $high:expr) => {
        return Err(Box::new(TranslateError::ImmediateRange {
            line: $term.0,
            pos: $term.1,
            value: $value,
            low: $low,
            high: $high,
        }))
    };
}

// Enum and struct definitions.

/// Translation failures, each carrying the source location it was detected
/// at.
#[derive(PartialEq, Eq, Clone)]
pub enum TranslateError {
    /// A statement that does not fit the grammar.
    Grammar { line: u32, pos: u32, descr: String },
    /// A label referenced but never bound.
    UndefinedLabel { line: u32, pos: u32, symbol: String },
    /// An immediate outside its field's range.
    ImmediateRange {
        line: u32,
        pos: u32,
        value: i32,
        low: i32,
        high: i32,
    },
    /// No `_start` label to patch the entry stub with.
    MissingStart,
}

/// The result of a translation: machine words and, per word, the source
/// term it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub code: Vec<u16>,
    pub terms: Vec<Term>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Data,
    Text,
}

/// An immediate operand before symbol resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Imm {
    Number(i32),
    Label(String),
}

/// One laid-out memory cell, waiting for the encoding pass.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Statement {
    /// A data word (character cell).
    Data { value: u16 },
    /// `halt`.
    NoArgs { op: Opcode },
    /// `jmp L` / `jg L`: forward PC-relative.
    Jump { op: Opcode, target: Imm },
    /// `bne rA, rB, L` / `beq rA, rB, L`: PC-relative both ways.
    Branch {
        op: Opcode,
        reg_a: u8,
        reg_b: u8,
        target: Imm,
    },
    /// `ld/sw/cmp rD, +/-imm(rS)`.
    MemOffset {
        op: Opcode,
        reg_d: u8,
        negative: bool,
        imm: Imm,
        base: u8,
    },
    /// `addi rD, rS, imm`.
    Immediate {
        op: Opcode,
        reg_d: u8,
        reg_s: u8,
        imm: Imm,
    },
    /// `add/rem/mul rD, rS1, rS2`.
    ThreeReg {
        op: Opcode,
        reg_d: u8,
        reg_s1: u8,
        reg_s2: u8,
    },
}

struct Parser<'a> {
    tokens: &'a [Token],
    num: usize,
    section: Option<Section>,
    cells: Vec<(Statement, Term)>,
    labels: HashMap<String, u16>,
}

// Public functions.

/// Translate an assembly source into machine words plus their source
/// terms. Cell 0 is a stub jump patched to the `_start` label.
pub fn translate(source: &str) -> Result<Translation> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(&tokens);
    parser.layout()?;
    encode(&parser.cells, &parser.labels)
}

/// CLI driver: read a source file, write the code file and the JSON
/// translation log.
/// # Arguments
/// * `source_path` - Assembly source.
/// * `target_path` - Machine code output.
/// * `log_path` - Translation log output.
pub fn translate_file(source_path: &str, target_path: &str, log_path: &str) -> Result<()> {
    let source = read_file_string(source_path)?;
    let translation = translate(&source)?;
    isa::write_code(target_path, &translation.code)?;
    isa::write_logs(log_path, &translation.code, &translation.terms)?;
    println!(
        "Translated {} into {} machine words",
        source_path,
        translation.code.len()
    );
    Ok(())
}

/// Truncate `value` to the field mask and place the field at `shift`.
pub fn shift_and_mask(value: u16, shift: u16, mask: u16) -> u16 {
    (value & mask) << shift
}

// Struct impls.

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        // Cell 0 is reserved for the entry stub; the encoding pass patches
        // it once `_start` is known.
        let stub = Statement::Jump {
            op: Opcode::Jmp,
            target: Imm::Label("_start".to_string()),
        };
        Self {
            tokens: tokens,
            num: 0,
            section: None,
            cells: vec![(stub, Term(0, 0, "jmp".to_string()))],
            labels: HashMap::new(),
        }
    }

    /// Pass one: walk the token stream, emit one cell per data entry or
    /// instruction, and bind labels to the address of the next cell.
    fn layout(&mut self) -> Result<()> {
        while self.num < self.tokens.len() {
            let token = self.tokens[self.num].clone();
            match token.token_type {
                TokenType::Eol => {
                    self.num += 1;
                }
                TokenType::Keyword => {
                    self.num += 1;
                    let name = self.expect(TokenType::StringLiteral, "a section name")?;
                    self.section = Some(match name.value.as_str() {
                        ".data" => Section::Data,
                        ".text" => Section::Text,
                        other => bteg!(name.line, name.pos, "unknown section {}", other),
                    });
                }
                _ => match self.section {
                    None => bteg!(
                        token.line,
                        token.pos,
                        "statement before the first section directive"
                    ),
                    Some(Section::Data) => self.parse_data_entry()?,
                    Some(Section::Text) => self.parse_text_statement()?,
                },
            }
        }
        Ok(())
    }

    /// `label: 'c'` - one word cell holding the character code.
    fn parse_data_entry(&mut self) -> Result<()> {
        let label = self.expect(TokenType::StringLiteral, "a data cell label")?;
        self.expect_symbol(":")?;
        let literal = self.expect(TokenType::CharLiteral, "a character literal")?;

        let mut symbols = literal.value.chars();
        let value = match (symbols.next(), symbols.next()) {
            (Some(c), None) => c as u16,
            _ => bteg!(
                literal.line,
                literal.pos,
                "a data cell holds exactly one character, got {:?}",
                literal.value
            ),
        };

        self.labels.insert(label.value.clone(), self.cells.len() as u16);
        self.cells.push((
            Statement::Data { value: value },
            Term(label.line, label.pos, label.value),
        ));
        Ok(())
    }

    fn parse_text_statement(&mut self) -> Result<()> {
        let head = self.expect(TokenType::StringLiteral, "a label or a mnemonic")?;

        // A label binds to the address of the next emitted cell.
        if self.peek_symbol(":") {
            self.num += 1;
            self.labels.insert(head.value, self.cells.len() as u16);
            return Ok(());
        }

        let op = match Opcode::from_mnemonic(&head.value) {
            Some(op) => op,
            None => bteg!(head.line, head.pos, "unknown instruction {}", head.value),
        };
        let term = Term(head.line, head.pos, head.value);

        type O = Opcode;
        let statement = match op {
            O::Halt => Statement::NoArgs { op: op },
            O::Jmp | O::Jg => Statement::Jump {
                op: op,
                target: self.parse_imm_operand()?,
            },
            O::Bne | O::Beq => {
                let reg_a = self.parse_register()?;
                self.expect_symbol(",")?;
                let reg_b = self.parse_register()?;
                self.expect_symbol(",")?;
                Statement::Branch {
                    op: op,
                    reg_a: reg_a,
                    reg_b: reg_b,
                    target: self.parse_imm_operand()?,
                }
            }
            O::Ld | O::Sw | O::Cmp => {
                let reg_d = self.parse_register()?;
                self.expect_symbol(",")?;
                let sign = self.expect(TokenType::Symbol, "a + or - offset sign")?;
                let negative = match sign.value.as_str() {
                    "+" => false,
                    "-" => true,
                    other => bteg!(sign.line, sign.pos, "expected + or -, got {}", other),
                };
                let imm = self.parse_imm_operand()?;
                self.expect_symbol("(")?;
                let base = self.parse_register()?;
                self.expect_symbol(")")?;
                Statement::MemOffset {
                    op: op,
                    reg_d: reg_d,
                    negative: negative,
                    imm: imm,
                    base: base,
                }
            }
            O::Addi => {
                let reg_d = self.parse_register()?;
                self.expect_symbol(",")?;
                let reg_s = self.parse_register()?;
                self.expect_symbol(",")?;
                Statement::Immediate {
                    op: op,
                    reg_d: reg_d,
                    reg_s: reg_s,
                    imm: self.parse_imm_operand()?,
                }
            }
            O::Add | O::Rem | O::Mul => {
                let reg_d = self.parse_register()?;
                self.expect_symbol(",")?;
                let reg_s1 = self.parse_register()?;
                self.expect_symbol(",")?;
                Statement::ThreeReg {
                    op: op,
                    reg_d: reg_d,
                    reg_s1: reg_s1,
                    reg_s2: self.parse_register()?,
                }
            }
        };

        self.cells.push((statement, term));
        Ok(())
    }

    // Token stream helpers.

    fn expect(&mut self, token_type: TokenType, what: &str) -> Result<Token> {
        match self.tokens.get(self.num) {
            Some(token) if token.token_type == token_type => {
                self.num += 1;
                Ok(token.clone())
            }
            Some(token) => bteg!(
                token.line,
                token.pos,
                "expected {}, got {:?} {:?}",
                what,
                token.token_type,
                token.value
            ),
            None => {
                let (line, pos) = self.last_position();
                bteg!(line, pos, "expected {}, got the end of the source", what)
            }
        }
    }

    fn expect_symbol(&mut self, symbol: &str) -> Result<Token> {
        let token = self.expect(TokenType::Symbol, symbol)?;
        if token.value != symbol {
            bteg!(token.line, token.pos, "expected {}, got {}", symbol, token.value);
        }
        Ok(token)
    }

    fn peek_symbol(&self, symbol: &str) -> bool {
        match self.tokens.get(self.num) {
            Some(token) => token.token_type == TokenType::Symbol && token.value == symbol,
            None => false,
        }
    }

    fn parse_register(&mut self) -> Result<u8> {
        let token = self.expect(TokenType::StringLiteral, "a register name")?;
        Ok(match token.value.as_str() {
            "x0" | "zr" => 0,
            "x1" => 1,
            "x2" => 2,
            "x3" => 3,
            "x4" => 4,
            "x5" => 5,
            "x6" | "mtvec" => 6,
            "x7" | "mepc" => 7,
            other => bteg!(token.line, token.pos, "unknown register {}", other),
        })
    }

    /// A number or a label reference.
    fn parse_imm_operand(&mut self) -> Result<Imm> {
        match self.tokens.get(self.num) {
            Some(token) if token.token_type == TokenType::NumberLiteral => {
                self.num += 1;
                match token.value.parse::<i32>() {
                    Ok(value) => Ok(Imm::Number(value)),
                    Err(_) => bteg!(token.line, token.pos, "number {} is too large", token.value),
                }
            }
            Some(token) if token.token_type == TokenType::StringLiteral => {
                self.num += 1;
                Ok(Imm::Label(token.value.clone()))
            }
            Some(token) => bteg!(
                token.line,
                token.pos,
                "expected a number or a label, got {:?} {:?}",
                token.token_type,
                token.value
            ),
            None => {
                let (line, pos) = self.last_position();
                bteg!(line, pos, "expected a number or a label, got the end of the source")
            }
        }
    }

    fn last_position(&self) -> (u32, u32) {
        match self.tokens.last() {
            Some(token) => (token.line, token.pos),
            None => (0, 0),
        }
    }
}

// Encoding pass.

/// Pass two: resolve labels through the symbol table and pack every cell
/// into its 16 bit word.
fn encode(cells: &[(Statement, Term)], labels: &HashMap<String, u16>) -> Result<Translation> {
    if !labels.contains_key("_start") {
        return Err(Box::new(TranslateError::MissingStart));
    }

    let mut code = Vec::with_capacity(cells.len());
    let mut terms = Vec::with_capacity(cells.len());

    for (addr, &(ref statement, ref term)) in cells.iter().enumerate() {
        let addr = addr as i32;
        type S = Statement;
        let word = match *statement {
            S::Data { value } => value,
            S::NoArgs { op } => op.code(),
            S::Jump { op, ref target } => {
                let offset = resolve(target, labels, term)? - addr;
                check_range(offset, 0, IMM_WIDE_MAX, term)?;
                shift_and_mask(offset as u16, 10, 0x7f) | op.code()
            }
            S::Branch {
                op,
                reg_a,
                reg_b,
                ref target,
            } => {
                let offset = resolve(target, labels, term)? - addr;
                check_range(offset, IMM_SPLIT_MIN, IMM_SPLIT_MAX, term)?;
                encode_split_imm(offset)
                    | shift_and_mask(reg_b as u16, 10, 7)
                    | shift_and_mask(reg_a as u16, 7, 7)
                    | op.code()
            }
            S::MemOffset {
                op,
                reg_d,
                negative,
                ref imm,
                base,
            } => {
                let mut offset = resolve(imm, labels, term)?;
                if negative {
                    offset = -offset;
                }
                match op {
                    Opcode::Ld => {
                        check_range(offset, 0, IMM_WIDE_MAX, term)?;
                        shift_and_mask(offset as u16, 10, 0x7f)
                            | shift_and_mask(base as u16, 7, 7)
                            | shift_and_mask(reg_d as u16, 4, 7)
                            | op.code()
                    }
                    Opcode::Sw => {
                        check_range(offset, IMM_SPLIT_MIN, IMM_SPLIT_MAX, term)?;
                        encode_split_imm(offset)
                            | shift_and_mask(reg_d as u16, 10, 7)
                            | shift_and_mask(base as u16, 7, 7)
                            | op.code()
                    }
                    // The compared register must reach the ALU through RD1,
                    // so it sits in the A1 field; the base register is
                    // carried for layout symmetry with SW.
                    _ => {
                        check_range(offset, IMM_SPLIT_MIN, IMM_SPLIT_MAX, term)?;
                        encode_split_imm(offset)
                            | shift_and_mask(base as u16, 10, 7)
                            | shift_and_mask(reg_d as u16, 7, 7)
                            | op.code()
                    }
                }
            }
            S::Immediate {
                op,
                reg_d,
                reg_s,
                ref imm,
            } => {
                let value = resolve(imm, labels, term)?;
                check_range(value, 0, IMM_WIDE_MAX, term)?;
                shift_and_mask(value as u16, 10, 0x7f)
                    | shift_and_mask(reg_s as u16, 7, 7)
                    | shift_and_mask(reg_d as u16, 4, 7)
                    | op.code()
            }
            S::ThreeReg {
                op,
                reg_d,
                reg_s1,
                reg_s2,
            } => {
                shift_and_mask(reg_s2 as u16, 10, 7)
                    | shift_and_mask(reg_s1 as u16, 7, 7)
                    | shift_and_mask(reg_d as u16, 4, 7)
                    | op.code()
            }
        };
        code.push(word);
        terms.push(term.clone());
    }

    Ok(Translation {
        code: code,
        terms: terms,
    })
}

/// Pack a split immediate: high half into bits 13-15, low half into bits
/// 4-6.
fn encode_split_imm(value: i32) -> u16 {
    let v = (value as u16) & 0x3f;
    shift_and_mask(v >> 3, 13, 7) | shift_and_mask(v, 4, 7)
}

fn resolve(imm: &Imm, labels: &HashMap<String, u16>, term: &Term) -> Result<i32> {
    match *imm {
        Imm::Number(value) => Ok(value),
        Imm::Label(ref symbol) => match labels.get(symbol) {
            Some(addr) => Ok(*addr as i32),
            None => Err(Box::new(TranslateError::UndefinedLabel {
                line: term.0,
                pos: term.1,
                symbol: symbol.clone(),
            })),
        },
    }
}

fn check_range(value: i32, low: i32, high: i32, term: &Term) -> Result<()> {
    if value < low || value > high {
        bter!(term, value, low, high);
    }
    Ok(())
}

// Error impls.

impl fmt::Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        type E = TranslateError;
        match *self {
            E::Grammar {
                line,
                pos,
                ref descr,
            } => write!(f, "line {}, column {}: {}", line, pos, descr),
            E::UndefinedLabel {
                line,
                pos,
                ref symbol,
            } => write!(f, "line {}, column {}: undefined label {}", line, pos, symbol),
            E::ImmediateRange {
                line,
                pos,
                value,
                low,
                high,
            } => write!(
                f,
                "line {}, column {}: immediate {} does not fit the field ({}..{})",
                line, pos, value, low, high
            ),
            E::MissingStart => write!(f, "no _start label to patch the entry stub with"),
        }
    }
}

impl fmt::Debug for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Error for TranslateError {}
