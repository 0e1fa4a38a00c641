// Arithmetic logic unit.
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
use std::fmt;
use util::Result;

/// ALUControl code for addition.
pub const ALU_ADD: u8 = 0;
/// ALUControl code for subtraction.
pub const ALU_SUB: u8 = 1;
/// ALUControl code for remainder.
pub const ALU_REM: u8 = 2;
/// ALUControl code for multiplication.
pub const ALU_MUL: u8 = 3;

// Struct definitions.

/// 16 bit arithmetic unit. All arithmetic wraps modulo 2^16. The Zero and
/// Positive flags are latched: they update only on ticks where the flag
/// enable signal is asserted, which is how a compare survives until the
/// branch that consumes it.
#[derive(Debug, Clone)]
pub struct Alu {
    src_a: WireId,
    src_b: WireId,
    result_out: WireId,
    result: u16,
    zero_flag: u8,
    positive_flag: u8,
}

// Struct impls.

impl Alu {
    pub fn new(src_a: WireId, src_b: WireId, result_out: WireId) -> Self {
        Self {
            src_a: src_a,
            src_b: src_b,
            result_out: result_out,
            result: 0,
            zero_flag: 0,
            positive_flag: 0,
        }
    }

    /// Advance the ALU one tick: compute the selected operation over the two
    /// source wires and publish the result.
    /// # Arguments
    /// * `wires` - The datapath wire arena.
    /// * `control` - Operation select (`ALU_ADD`..`ALU_MUL`, anything else fatal).
    /// * `flag_enable` - EF signal; when asserted the flags latch the result.
    pub fn tick(&mut self, wires: &mut WireSet, control: u8, flag_enable: u8) -> Result<()> {
        let a = wires.get(self.src_a);
        let b = wires.get(self.src_b);

        self.result = match control {
            ALU_ADD => a.wrapping_add(b),
            ALU_SUB => a.wrapping_sub(b),
            ALU_REM => {
                if b == 0 {
                    berr!("ALU: remainder of {} by zero", a);
                }
                a % b
            }
            ALU_MUL => a.wrapping_mul(b),
            _ => berr!("ALU: operation {} not permitted", control),
        };

        if flag_enable != 0 {
            self.zero_flag = (self.result == 0) as u8;
            self.positive_flag = ((self.result as i16) > 0) as u8;
        }

        wires.set(self.result_out, self.result);
        Ok(())
    }

    pub fn result(&self) -> u16 {
        self.result
    }

    /// Overwrite the result latch directly. Used by the interrupt exit
    /// procedure when the saved result is pulled back out of memory.
    pub fn force_result(&mut self, wires: &mut WireSet, value: u16) {
        self.result = value;
        wires.set(self.result_out, value);
    }

    pub fn zero_flag(&self) -> u8 {
        self.zero_flag
    }

    pub fn positive_flag(&self) -> u8 {
        self.positive_flag
    }
}

impl fmt::Display for Alu {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Result: {}, Zero: {}, Positive: {}",
            self.result, self.zero_flag, self.positive_flag
        )
    }
}
