// Memory mapped I/O handler and scripted interrupt source.
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

/// Memory cell mapped to the input device.
pub const IO_CELL_IN: u16 = 120;
/// Memory cell mapped to the output device.
pub const IO_CELL_OUT: u16 = 121;

// Struct definitions.

/// Emulates the I/O controller and the DIP device behind it. Occupies the
/// two MMIO cells: a load from cell 120 reads the latest keystroke, a store
/// to cell 121 appends to the output buffer. Keystrokes arrive from a
/// pre-scripted schedule of (tick, character) pairs; each arrival raises the
/// interrupt line, which the control unit clears on interrupt entry.
#[derive(Debug, Clone)]
pub struct IoHandler {
    addr: WireId,
    write_data: WireId,
    out: WireId,
    /// Latest keystroke (or last written character).
    dip_value: u16,
    /// Characters written to the output device, in order.
    output_buffer: Vec<char>,
    /// Keystroke schedule: (tick, character).
    schedule: Vec<(u64, char)>,
    /// Interrupt request line.
    interrupt: bool,
}

// Struct impls.

impl IoHandler {
    /// Create an I/O handler with a keystroke schedule.
    /// # Arguments
    /// * `addr` - Address wire (the `adr` lane).
    /// * `write_data` - Write port wire (the `rd2` lane).
    /// * `out` - Read output wire (the `rd` lane; a MMIO load overrides memory).
    /// * `schedule` - Keystroke schedule.
    pub fn new(
        addr: WireId,
        write_data: WireId,
        out: WireId,
        schedule: Vec<(u64, char)>,
    ) -> Self {
        Self {
            addr: addr,
            write_data: write_data,
            out: out,
            dip_value: 0,
            output_buffer: Vec::new(),
            schedule: schedule,
            interrupt: false,
        }
    }

    /// Advance the handler one tick. With the operation signal asserted the
    /// MMIO cells are serviced; touching a MMIO cell without the operation
    /// signal is fatal. Scheduled keystrokes for this tick are latched last,
    /// so a keystroke landing on an output tick is not clobbered by the
    /// write, and raise the interrupt line.
    pub fn tick(&mut self, wires: &mut WireSet, io_op: u8, tick_num: u64) -> Result<()> {
        let addr = wires.get(self.addr);
        if io_op != 0 {
            if addr == IO_CELL_IN {
                wires.set(self.out, self.dip_value);
                println!("IoHandler: read {:?} from the input cell", self.dip_char()?);
            }
            if addr == IO_CELL_OUT {
                let data = wires.get(self.write_data);
                self.dip_value = data;
                let symbol = self.dip_char()?;
                self.output_buffer.push(symbol);
                println!("IoHandler: saved {:?} to the output cell", symbol);
            }
        } else if addr == IO_CELL_IN || addr == IO_CELL_OUT {
            berr!(
                "IoHandler: access to memory cell {} without the operation signal",
                addr
            );
        }

        for num in 0..self.schedule.len() {
            let (token_tick, token_value) = self.schedule[num];
            if token_tick == tick_num {
                self.interrupt = true;
                self.dip_value = token_value as u16;
            }
        }
        Ok(())
    }

    pub fn interrupt_requested(&self) -> bool {
        self.interrupt
    }

    pub fn clear_interrupt(&mut self) {
        self.interrupt = false;
    }

    pub fn output_buffer(&self) -> &[char] {
        &self.output_buffer
    }

    pub fn dip_value(&self) -> u16 {
        self.dip_value
    }

    // Private.

    fn dip_char(&self) -> Result<char> {
        match ::std::char::from_u32(self.dip_value as u32) {
            Some(c) => Ok(c),
            None => berr!(
                "IoHandler: value {} is not a character",
                self.dip_value
            ),
        }
    }
}
