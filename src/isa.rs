// Instruction set definitions and machine code serialization.
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

use serde_derive::Serialize;
use std::fmt;
use util::{read_file_string, write_file_string, Result};

/// Width of one machine word in the ASCII binary code file.
pub const CODE_WORD_WIDTH: usize = 16;

// Enum and struct definitions.

/// The twelve operations of the instruction set. The low four bits of the
/// instruction word select one of these; values 12-15 are undefined and
/// fatal at dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Addi = 0,
    Add = 1,
    Rem = 2,
    Mul = 3,
    Ld = 4,
    Sw = 5,
    Cmp = 6,
    Jmp = 7,
    Jg = 8,
    Bne = 9,
    Beq = 10,
    Halt = 11,
}

/// Source location of an emitted memory cell: line, column and the leading
/// symbol of the expression the cell came from. Serializes as a JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Term(pub u32, pub u32, pub String);

#[derive(Serialize)]
struct LogEntry<'a> {
    instr: String,
    term: &'a Term,
}

// Impls.

impl Opcode {
    /// Decode an opcode from the low four bits of an instruction word.
    pub fn from_word(word: u16) -> Result<Self> {
        type O = Opcode;
        Ok(match word & 0xf {
            0 => O::Addi,
            1 => O::Add,
            2 => O::Rem,
            3 => O::Mul,
            4 => O::Ld,
            5 => O::Sw,
            6 => O::Cmp,
            7 => O::Jmp,
            8 => O::Jg,
            9 => O::Bne,
            10 => O::Beq,
            11 => O::Halt,
            op => berr!("Opcode: operation {} is undefined", op),
        })
    }

    /// Look an opcode up by its assembly mnemonic (already lowercased).
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        type O = Opcode;
        Some(match mnemonic {
            "addi" => O::Addi,
            "add" => O::Add,
            "rem" => O::Rem,
            "mul" => O::Mul,
            "ld" => O::Ld,
            "sw" => O::Sw,
            "cmp" => O::Cmp,
            "jmp" => O::Jmp,
            "jg" => O::Jg,
            "bne" => O::Bne,
            "beq" => O::Beq,
            "halt" => O::Halt,
            _ => return None,
        })
    }

    /// The opcode field value for the instruction word.
    pub fn code(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        type O = Opcode;
        write!(
            f,
            "{}",
            match *self {
                O::Addi => "addi",
                O::Add => "add",
                O::Rem => "rem",
                O::Mul => "mul",
                O::Ld => "ld",
                O::Sw => "sw",
                O::Cmp => "cmp",
                O::Jmp => "jmp",
                O::Jg => "jg",
                O::Bne => "bne",
                O::Beq => "beq",
                O::Halt => "halt",
            }
        )
    }
}

// Public functions.

/// Render one machine word as its fixed-width ASCII binary form.
pub fn word_to_binary(word: u16) -> String {
    format!("{:016b}", word)
}

/// Write machine code to a file, one 16 character ASCII binary line per
/// word.
/// # Arguments
/// * `path` - Destination file.
/// * `code` - Machine words.
pub fn write_code(path: &str, code: &[u16]) -> Result<()> {
    let mut contents = String::new();
    for word in code {
        contents.push_str(&word_to_binary(*word));
        contents.push('\n');
    }
    write_file_string(path, &contents)
}

/// Read machine code back from a file written by `write_code`. Lines must
/// be exactly 16 binary digits wide.
/// # Arguments
/// * `path` - Code file to read.
pub fn read_code(path: &str) -> Result<Vec<u16>> {
    let contents = read_file_string(path)?;
    let mut code = Vec::new();
    for (num, line) in contents.lines().enumerate() {
        if line.len() != CODE_WORD_WIDTH {
            berr!(
                "{}: line {} is {} characters wide, expected {}",
                path,
                num + 1,
                line.len(),
                CODE_WORD_WIDTH
            );
        }
        match u16::from_str_radix(line, 2) {
            Ok(word) => code.push(word),
            Err(_) => berr!("{}: line {} is not a binary machine word", path, num + 1),
        }
    }
    Ok(code)
}

/// Write the translation log: a JSON array of instruction/term records
/// whose index is the cell address.
/// # Arguments
/// * `path` - Destination file.
/// * `code` - Machine words, parallel to `terms`.
/// * `terms` - Source locations, parallel to `code`.
pub fn write_logs(path: &str, code: &[u16], terms: &[Term]) -> Result<()> {
    let mut logs = Vec::with_capacity(code.len());
    for num in 0..code.len() {
        logs.push(LogEntry {
            instr: word_to_binary(code[num]),
            term: &terms[num],
        });
    }
    match ::serde_json::to_string_pretty(&logs) {
        Ok(rendered) => write_file_string(path, &rendered),
        Err(e) => berr!("Could not render the translation log: {}", e),
    }
}
