// Wires, triggers and multiplexers, the stateless/stateful leaves of the
// emulated datapath.
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

// Struct definitions.

/// Handle to a wire allocated in a `WireSet`. Components hold ids rather
/// than references, which keeps the cyclic wire graph free of ownership
/// loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireId(usize);

/// Arena of 16 bit datapath wires. A wire is a pure conduit: the value set
/// last within a tick is the value read by components evaluated later in
/// the same tick. Nothing is latched here.
#[derive(Debug, Clone)]
pub struct WireSet {
    wires: Vec<u16>,
}

/// An edge-latched 16 bit register. Samples its input wire when the enable
/// signal is asserted, holds otherwise, and publishes its state on the
/// output wire every tick.
#[derive(Debug, Clone)]
pub struct Trigger {
    input: WireId,
    output: WireId,
    state: u16,
}

/// A combinational 2^n-to-1 selector. The select signal indexes the input
/// wire list; an out-of-range select has no defined wrap and is fatal.
#[derive(Debug, Clone)]
pub struct Mux {
    name: &'static str,
    inputs: Vec<WireId>,
    output: WireId,
}

// Struct impls.

impl WireSet {
    pub fn new() -> Self {
        Self { wires: Vec::new() }
    }

    /// Allocate a new wire holding 0.
    pub fn alloc(&mut self) -> WireId {
        self.wires.push(0);
        WireId(self.wires.len() - 1)
    }

    pub fn get(&self, id: WireId) -> u16 {
        self.wires[id.0]
    }

    pub fn set(&mut self, id: WireId, value: u16) {
        self.wires[id.0] = value;
    }
}

impl Trigger {
    pub fn new(input: WireId, output: WireId) -> Self {
        Self {
            input: input,
            output: output,
            state: 0,
        }
    }

    /// Advance the trigger one tick.
    /// # Arguments
    /// * `wires` - The datapath wire arena.
    /// * `enable` - Enable signal sampled from the current control bundle.
    pub fn tick(&mut self, wires: &mut WireSet, enable: u8) {
        if enable != 0 {
            self.state = wires.get(self.input);
        }
        wires.set(self.output, self.state);
    }

    pub fn state(&self) -> u16 {
        self.state
    }

    /// Overwrite the latched state directly. Used by the interrupt entry and
    /// exit procedures, which bypass the enable signal.
    pub fn force(&mut self, wires: &mut WireSet, value: u16) {
        self.state = value;
        wires.set(self.output, value);
    }
}

impl Mux {
    pub fn new(name: &'static str, inputs: Vec<WireId>, output: WireId) -> Self {
        Self {
            name: name,
            inputs: inputs,
            output: output,
        }
    }

    /// Route the selected input wire to the output wire.
    /// # Arguments
    /// * `wires` - The datapath wire arena.
    /// * `select` - Select signal sampled from the current control bundle.
    pub fn tick(&mut self, wires: &mut WireSet, select: u8) -> Result<()> {
        let which = select as usize;
        if which >= self.inputs.len() {
            berr!(
                "{}: select {} is out of range (mux has {} inputs)",
                self.name,
                select,
                self.inputs.len()
            );
        }
        let value = wires.get(self.inputs[which]);
        wires.set(self.output, value);
        Ok(())
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:04x}", self.state)
    }
}
