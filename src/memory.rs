// Word-addressed main memory.
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

// Struct definitions.

/// Linear array of 16 bit words with one address port, one read port and
/// one write port. Addressing outside the array is fatal.
#[derive(Debug, Clone)]
pub struct Memory {
    addr: WireId,
    read_data: WireId,
    write_data: WireId,
    cells: Vec<u16>,
}

// Struct impls.

impl Memory {
    /// Create a zeroed memory of `size` words attached to the given wires.
    /// # Arguments
    /// * `addr` - Address wire (the `adr` lane).
    /// * `read_data` - Read port wire (the `rd` lane).
    /// * `write_data` - Write port wire (the `rd2` lane).
    /// * `size` - Memory size in words.
    pub fn new(addr: WireId, read_data: WireId, write_data: WireId, size: u16) -> Self {
        Self {
            addr: addr,
            read_data: read_data,
            write_data: write_data,
            cells: vec![0u16; size as usize],
        }
    }

    /// Advance the memory one tick: store the write port when the write
    /// enable is asserted, publish the addressed cell on the read port
    /// otherwise.
    pub fn tick(&mut self, wires: &mut WireSet, write_enable: u8) -> Result<()> {
        let addr = wires.get(self.addr) as usize;
        if addr >= self.cells.len() {
            berr!(
                "Memory: address {} is out of range (memory is {} words)",
                addr,
                self.cells.len()
            );
        }

        if write_enable != 0 {
            self.cells[addr] = wires.get(self.write_data);
        } else {
            let value = self.cells[addr];
            wires.set(self.read_data, value);
        }
        Ok(())
    }

    /// Copy a program into memory starting at `start_address`.
    /// # Arguments
    /// * `program` - Machine words to load.
    /// * `start_address` - First cell the program occupies.
    pub fn load_program(&mut self, program: &[u16], start_address: u16) -> Result<()> {
        let start = start_address as usize;
        if start + program.len() > self.cells.len() {
            berr!(
                "Memory: cannot accommodate a {} word program at address {} (memory is {} words)",
                program.len(),
                start,
                self.cells.len()
            );
        }
        self.cells[start..start + program.len()].copy_from_slice(program);
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// Read a cell directly, without the wire ports. Used by the interrupt
    /// save slots and by tests.
    pub fn cell(&self, addr: u16) -> Result<u16> {
        match self.cells.get(addr as usize) {
            Some(v) => Ok(*v),
            None => berr!(
                "Memory: direct read of address {} is out of range (memory is {} words)",
                addr,
                self.cells.len()
            ),
        }
    }

    /// Write a cell directly, without the wire ports.
    pub fn set_cell(&mut self, addr: u16, value: u16) -> Result<()> {
        let len = self.cells.len();
        match self.cells.get_mut(addr as usize) {
            Some(c) => {
                *c = value;
                Ok(())
            }
            None => berr!(
                "Memory: direct write of address {} is out of range (memory is {} words)",
                addr,
                len
            ),
        }
    }
}
