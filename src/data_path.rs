// The emulated datapath: the fixed wire graph binding every component, the
// tick order that drives it, and the interrupt save/restore mechanism.
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

use alu::Alu;
use circuit::{Mux, Trigger, WireId, WireSet};
use config::Config;
use control::ControlSignals;
use io_handler::{IoHandler, IO_CELL_IN, IO_CELL_OUT};
use memory::Memory;
use register::{RegisterFile, MSCRATCH, MTVEC};
use sign_expand::SignExpand;
use std::fmt;
use util::Result;

/// Memory cell holding the ALU result across an interrupt.
pub const INT_SAVE_ALU: u16 = 256;
/// Memory cell holding the instruction register across an interrupt.
pub const INT_SAVE_IR: u16 = 257;

// Struct definitions.

/// The wire graph. Wires are created once, components are wired immutably,
/// and everything advances in a single fixed order per tick:
///
///   PC -> AdrSrc -> Memory -> IO -> IR -> WDSrc -> RegFile -> SignExpand
///      -> ALUSrcA -> ALUSrcB -> ALU
///
/// That order is the load-bearing design decision: it lets one tick carry a
/// value from the PC through a memory read, through a mux, into the ALU
/// output, which is what the three-bundle instruction schedules rely on.
#[derive(Debug, Clone)]
pub struct DataPath {
    wires: WireSet,

    // Named lanes.
    alu_result: WireId,
    pc_lane: WireId,
    adr: WireId,
    rd: WireId,
    wd: WireId,
    instr: WireId,
    rd1: WireId,
    rd2: WireId,
    ext_imm: WireId,
    pc_inc: WireId,
    src_a: WireId,
    src_b: WireId,

    // Components, declared in tick order.
    pc: Trigger,
    adr_src: Mux,
    memory: Memory,
    io: IoHandler,
    ir: Trigger,
    wd_src: Mux,
    reg_file: RegisterFile,
    sign_expand: SignExpand,
    alu_src_a: Mux,
    alu_src_b: Mux,
    alu: Alu,
}

// Struct impls.

impl DataPath {
    /// Build the wire graph.
    /// # Arguments
    /// * `config` - Emulator configuration (memory size, keystroke schedule).
    pub fn new(config: &Config) -> Result<Self> {
        let mut wires = WireSet::new();

        let alu_result = wires.alloc();
        let pc_lane = wires.alloc();
        let adr = wires.alloc();
        let rd = wires.alloc();
        let wd = wires.alloc();
        let instr = wires.alloc();
        let rd1 = wires.alloc();
        let rd2 = wires.alloc();
        let ext_imm = wires.alloc();
        let pc_inc = wires.alloc();
        let src_a = wires.alloc();
        let src_b = wires.alloc();

        // The constant +1 lane feeding the PC increment path.
        wires.set(pc_inc, 1);

        Ok(Self {
            pc: Trigger::new(alu_result, pc_lane),
            adr_src: Mux::new("AdrSrc", vec![pc_lane, alu_result], adr),
            memory: Memory::new(adr, rd, rd2, config.memory_size()),
            io: IoHandler::new(adr, rd2, rd, config.interrupt_schedule()),
            ir: Trigger::new(rd, instr),
            wd_src: Mux::new("WDSrc", vec![rd, alu_result], wd),
            reg_file: RegisterFile::new(instr, rd1, rd2, wd),
            sign_expand: SignExpand::new(instr, ext_imm),
            alu_src_a: Mux::new("ALUSrcA", vec![rd1, pc_lane], src_a),
            alu_src_b: Mux::new("ALUSrcB", vec![rd2, ext_imm, pc_inc], src_b),
            alu: Alu::new(src_a, src_b, alu_result),
            wires: wires,
            alu_result: alu_result,
            pc_lane: pc_lane,
            adr: adr,
            rd: rd,
            wd: wd,
            instr: instr,
            rd1: rd1,
            rd2: rd2,
            ext_imm: ext_imm,
            pc_inc: pc_inc,
            src_a: src_a,
            src_b: src_b,
        })
    }

    /// Advance every component one tick under the given control signals.
    /// Accesses to the MMIO cells bypass memory and are serviced by the I/O
    /// handler instead.
    pub fn tick(&mut self, signals: &ControlSignals, tick_num: u64) -> Result<()> {
        let wires = &mut self.wires;

        self.pc.tick(wires, signals.pc_write);
        self.adr_src.tick(wires, signals.adr_src)?;

        let adr = wires.get(self.adr);
        if adr != IO_CELL_IN && adr != IO_CELL_OUT {
            self.memory.tick(wires, signals.mem_write)?;
        }
        self.io.tick(wires, signals.io_op, tick_num)?;

        self.ir.tick(wires, signals.ir_write);
        self.wd_src.tick(wires, signals.wd_src)?;
        self.reg_file.tick(wires, signals.reg_write);
        self.sign_expand.tick(wires, signals.imm_src)?;
        self.alu_src_a.tick(wires, signals.alu_src_a)?;
        self.alu_src_b.tick(wires, signals.alu_src_b)?;
        self.alu.tick(wires, signals.alu_control, signals.ef)?;
        Ok(())
    }

    /// Vector to the interrupt handler: stash the ALU result and the
    /// instruction register in the reserved memory cells, the PC in
    /// mscratch, and load the PC from mtvec.
    pub fn enter_interrupt(&mut self) -> Result<()> {
        self.memory.set_cell(INT_SAVE_ALU, self.alu.result())?;
        self.memory.set_cell(INT_SAVE_IR, self.ir.state())?;
        self.reg_file.set(MSCRATCH, self.pc.state());
        let vector = self.reg_file.get(MTVEC);
        self.pc.force(&mut self.wires, vector);
        Ok(())
    }

    /// Undo `enter_interrupt`: restore the PC from mscratch and pull the
    /// ALU result and instruction register back out of the save cells.
    pub fn exit_interrupt(&mut self) -> Result<()> {
        let pc = self.reg_file.get(MSCRATCH);
        self.pc.force(&mut self.wires, pc);
        let result = self.memory.cell(INT_SAVE_ALU)?;
        self.alu.force_result(&mut self.wires, result);
        let saved_instr = self.memory.cell(INT_SAVE_IR)?;
        self.ir.force(&mut self.wires, saved_instr);
        Ok(())
    }

    /// Copy a program into memory.
    pub fn load_program(&mut self, program: &[u16], start_address: u16) -> Result<()> {
        self.memory.load_program(program, start_address)
    }

    /// Point the PC at an address directly (simulator start-up).
    pub fn set_pc(&mut self, address: u16) {
        self.pc.force(&mut self.wires, address);
    }

    // Sampled outputs for the control unit.

    /// The instruction lane, as published by the instruction register.
    pub fn instr_word(&self) -> u16 {
        self.wires.get(self.instr)
    }

    pub fn zero_flag(&self) -> u8 {
        self.alu.zero_flag()
    }

    pub fn positive_flag(&self) -> u8 {
        self.alu.positive_flag()
    }

    pub fn io_interrupt(&self) -> bool {
        self.io.interrupt_requested()
    }

    pub fn clear_io_interrupt(&mut self) {
        self.io.clear_interrupt();
    }

    // State accessors for the tick log and tests.

    pub fn pc_value(&self) -> u16 {
        self.pc.state()
    }

    pub fn ir_value(&self) -> u16 {
        self.ir.state()
    }

    pub fn alu_result(&self) -> u16 {
        self.alu.result()
    }

    pub fn src_a_value(&self) -> u16 {
        self.wires.get(self.src_a)
    }

    pub fn src_b_value(&self) -> u16 {
        self.wires.get(self.src_b)
    }

    pub fn register_file(&self) -> &RegisterFile {
        &self.reg_file
    }

    pub fn register_file_mut(&mut self) -> &mut RegisterFile {
        &mut self.reg_file
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn io_handler(&self) -> &IoHandler {
        &self.io
    }
}

impl fmt::Display for DataPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "PC: 0x{:04x}", self.pc.state())?;
        writeln!(f, "IR: 0x{:04x}", self.ir.state())?;
        writeln!(f, "Registers: {}", self.reg_file)?;
        writeln!(f, "ALU: {}", self.alu)?;
        write!(
            f,
            "Lanes: alu_result={} pc={} adr={} rd={} wd={} instr={} rd1={} rd2={} ext_imm={} pc_inc={} srcA={} srcB={}",
            self.wires.get(self.alu_result),
            self.wires.get(self.pc_lane),
            self.wires.get(self.adr),
            self.wires.get(self.rd),
            self.wires.get(self.wd),
            self.wires.get(self.instr),
            self.wires.get(self.rd1),
            self.wires.get(self.rd2),
            self.wires.get(self.ext_imm),
            self.wires.get(self.pc_inc),
            self.wires.get(self.src_a),
            self.wires.get(self.src_b)
        )
    }
}
