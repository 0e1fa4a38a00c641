// Immediate extraction and expansion.
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

use circuit::{WireId, WireSet};
use util::Result;

/// ImmSrc layout: zero-extended immediate in bits 10 and up (I-type).
pub const IMM_WIDE: u8 = 0;
/// ImmSrc layout: zero-extended 4 bit immediate in bits 13-15.
pub const IMM_NIBBLE: u8 = 1;
/// ImmSrc layout: sign-extended split immediate, high half in bits 13-15
/// and low half in bits 4-6 (stores, compares, conditional branches).
pub const IMM_SPLIT: u8 = 2;

// Struct definitions.

/// Extracts an immediate from the instruction word in one of three field
/// layouts and expands it to a full machine word.
#[derive(Debug, Clone)]
pub struct SignExpand {
    instr: WireId,
    out: WireId,
}

// Struct impls.

impl SignExpand {
    pub fn new(instr: WireId, out: WireId) -> Self {
        Self {
            instr: instr,
            out: out,
        }
    }

    /// Advance one tick: publish the expanded immediate selected by
    /// `imm_src`. An unknown layout is fatal.
    pub fn tick(&mut self, wires: &mut WireSet, imm_src: u8) -> Result<()> {
        let instr = wires.get(self.instr);
        let value = match imm_src {
            IMM_WIDE => (instr >> 10) & 0x7f,
            IMM_NIBBLE => (instr >> 13) & 0xf,
            IMM_SPLIT => {
                let split = ((instr >> 10) & 0x38) | ((instr >> 4) & 7);
                sign_extend6(split)
            }
            _ => berr!("SignExpand: immediate layout {} not permitted", imm_src),
        };
        wires.set(self.out, value);
        Ok(())
    }
}

// Private functions.

/// Sign-extend a 6 bit value to a full machine word.
fn sign_extend6(value: u16) -> u16 {
    if value & 0x20 != 0 {
        value | 0xffc0
    } else {
        value
    }
}
