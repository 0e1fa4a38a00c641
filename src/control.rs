// Microprogrammed control unit.
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

use alu::{ALU_MUL, ALU_REM, ALU_SUB};
use config::Config;
use data_path::DataPath;
use isa::Opcode;
use sign_expand::IMM_SPLIT;
use std::fmt;
use util::{File, Result};

// Struct definitions.

/// One dense bundle of control signals, one field per signal the control
/// unit drives. A sub-tick copies a whole bundle over the register set, so
/// every signal a bundle does not name is zero for that tick. The volatile
/// inputs (OPCODE, ZeroFlag, PositiveFlag, IOInt) are sampled from the
/// datapath and never written here.
///
/// Mux select meanings: `adr_src` 0=PC 1=ALU result; `wd_src` 0=memory read
/// 1=ALU result; `alu_src_a` 0=RD1 1=PC; `alu_src_b` 0=RD2 1=immediate
/// 2=constant one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlSignals {
    pub pc_write: u8,
    pub adr_src: u8,
    pub mem_write: u8,
    pub ir_write: u8,
    pub wd_src: u8,
    pub io_op: u8,
    pub imm_src: u8,
    pub alu_control: u8,
    pub alu_src_b: u8,
    pub alu_src_a: u8,
    pub reg_write: u8,
    pub ef: u8,
}

/// The microprogrammed sequencer. Fetches the opcode through the datapath,
/// walks the microprogram for that opcode one control bundle per sub-tick,
/// and services interrupt requests between instructions. Interrupt nesting
/// is a work stack of saved signal bundles rather than recursion; the unit
/// is inside an interrupt context exactly when the stack is non-empty.
pub struct ControlUnit {
    /// Control signal register set, rewritten every sub-tick.
    signals: ControlSignals,
    /// Low four bits of the instruction lane, sampled after each sub-tick.
    opcode: u16,
    zero_flag: u8,
    positive_flag: u8,
    io_int: bool,
    interrupts_enabled: bool,
    /// Saved signal bundles, one per entered interrupt context.
    saved_contexts: Vec<ControlSignals>,
    halted: bool,
    tick_num: u64,
    tick_limit: u64,
    tick_log: Option<File>,
}

// Public functions.

/// The fetch bundle issued at the top of every instruction: route the
/// memory read at the PC through the instruction register.
pub fn fetch_bundle() -> ControlSignals {
    ControlSignals {
        ir_write: 1,
        ..Default::default()
    }
}

/// True for the opcodes whose second bundle depends on a sampled flag.
pub fn is_conditional(op: Opcode) -> bool {
    match op {
        Opcode::Jg | Opcode::Bne | Opcode::Beq => true,
        _ => false,
    }
}

/// The microprogram for an opcode: the ordered control bundles applied over
/// the instruction's sub-ticks. For the conditional opcodes the second
/// bundle depends on `branch_taken`; the caller re-queries after sampling
/// the flags from the first bundle.
pub fn microprogram(op: Opcode, branch_taken: bool) -> Vec<ControlSignals> {
    type O = Opcode;
    let zero = ControlSignals::default();
    let pc_increment = ControlSignals {
        alu_src_a: 1,
        alu_src_b: 2,
        ..zero
    };
    let pc_commit = ControlSignals {
        pc_write: 1,
        ..zero
    };
    let writeback = ControlSignals {
        wd_src: 1,
        reg_write: 1,
        alu_src_a: 1,
        alu_src_b: 2,
        ..zero
    };

    match op {
        O::Addi => vec![
            ControlSignals {
                ir_write: 1,
                alu_src_b: 1,
                ..zero
            },
            writeback,
            pc_commit,
        ],
        O::Add => vec![
            ControlSignals {
                ir_write: 1,
                ..zero
            },
            writeback,
            pc_commit,
        ],
        O::Rem => vec![
            ControlSignals {
                ir_write: 1,
                alu_control: ALU_REM,
                ..zero
            },
            writeback,
            pc_commit,
        ],
        O::Mul => vec![
            ControlSignals {
                ir_write: 1,
                alu_control: ALU_MUL,
                ..zero
            },
            writeback,
            pc_commit,
        ],
        O::Ld => vec![
            ControlSignals {
                ir_write: 1,
                alu_src_b: 1,
                ..zero
            },
            ControlSignals {
                adr_src: 1,
                reg_write: 1,
                io_op: 1,
                alu_src_a: 1,
                alu_src_b: 2,
                ..zero
            },
            pc_commit,
        ],
        O::Sw => vec![
            ControlSignals {
                ir_write: 1,
                alu_src_b: 1,
                imm_src: IMM_SPLIT,
                ..zero
            },
            ControlSignals {
                adr_src: 1,
                mem_write: 1,
                io_op: 1,
                alu_src_a: 1,
                alu_src_b: 2,
                ..zero
            },
            pc_commit,
        ],
        O::Cmp => vec![
            ControlSignals {
                ir_write: 1,
                imm_src: IMM_SPLIT,
                alu_src_b: 1,
                alu_control: ALU_SUB,
                ef: 1,
                ..zero
            },
            pc_increment,
            pc_commit,
        ],
        O::Jmp => vec![
            ControlSignals {
                alu_src_a: 1,
                alu_src_b: 1,
                ..zero
            },
            pc_commit,
        ],
        O::Jg => vec![
            ControlSignals {
                ir_write: 1,
                ..zero
            },
            if branch_taken {
                ControlSignals {
                    alu_src_a: 1,
                    alu_src_b: 1,
                    ..zero
                }
            } else {
                pc_increment
            },
            pc_commit,
        ],
        O::Bne | O::Beq => vec![
            ControlSignals {
                ir_write: 1,
                imm_src: IMM_SPLIT,
                alu_control: ALU_SUB,
                ef: 1,
                ..zero
            },
            if branch_taken {
                ControlSignals {
                    imm_src: IMM_SPLIT,
                    alu_src_a: 1,
                    alu_src_b: 1,
                    ..zero
                }
            } else {
                pc_increment
            },
            pc_commit,
        ],
        // One settle sub-tick with every signal released; the stop itself
        // is taken at the next fetch boundary.
        O::Halt => vec![zero],
    }
}

// Struct impls.

impl ControlUnit {
    pub fn new(config: &Config) -> Result<Self> {
        let tick_log = match config.tick_log_path() {
            Some(path) => Some(File::create(path)?),
            None => None,
        };
        Ok(Self {
            signals: ControlSignals::default(),
            opcode: 0,
            zero_flag: 0,
            positive_flag: 0,
            io_int: false,
            interrupts_enabled: config.interrupts_enabled(),
            saved_contexts: Vec::new(),
            halted: false,
            tick_num: 0,
            tick_limit: config.tick_limit(),
            tick_log: tick_log,
        })
    }

    /// The fetch-execute main loop. Runs until a top level HALT or a fatal
    /// condition. A HALT inside an interrupt context pops back to the
    /// interrupted program instead of stopping.
    pub fn run(&mut self, dp: &mut DataPath) -> Result<()> {
        loop {
            // Requests raised mid-instruction wait for the boundary.
            if self.io_int && self.interrupts_enabled && !self.in_interrupt() && !self.halted {
                self.service_interrupt(dp)?;
            }

            self.sub_tick(dp, &fetch_bundle())?;
            if self.halted {
                break;
            }

            let op = Opcode::from_word(self.opcode)?;
            if op == Opcode::Halt {
                for bundle in microprogram(op, false) {
                    self.sub_tick(dp, &bundle)?;
                }
                if self.in_interrupt() {
                    self.return_from_interrupt(dp)?;
                } else {
                    self.halted = true;
                }
                continue;
            }
            self.execute(dp, op)?;
        }
        Ok(())
    }

    /// Apply one control bundle and advance the datapath one tick, then
    /// re-sample the volatile inputs and emit the trace line.
    pub fn sub_tick(&mut self, dp: &mut DataPath, bundle: &ControlSignals) -> Result<()> {
        self.tick_num += 1;
        if self.tick_num > self.tick_limit {
            berr!(
                "ControlUnit: tick budget of {} exceeded, the program does not halt",
                self.tick_limit
            );
        }

        // Copying the whole bundle releases every signal it does not name.
        self.signals = *bundle;
        dp.tick(&self.signals, self.tick_num)?;

        self.opcode = dp.instr_word() & 0xf;
        self.zero_flag = dp.zero_flag();
        self.positive_flag = dp.positive_flag();
        let io_int = dp.io_interrupt();
        if io_int && !self.io_int && self.in_interrupt() {
            eprintln!("ControlUnit: interrupt request while already in an interrupt context");
        }
        self.io_int = io_int;

        self.log_tick(dp)
    }

    /// Enter an interrupt context: snapshot the signal register set, vector
    /// the datapath to the handler and drop the request line.
    pub fn service_interrupt(&mut self, dp: &mut DataPath) -> Result<()> {
        self.saved_contexts.push(self.signals);
        dp.enter_interrupt()?;
        dp.clear_io_interrupt();
        self.io_int = false;
        Ok(())
    }

    /// Leave the innermost interrupt context: restore the datapath and the
    /// snapshotted signal register set.
    pub fn return_from_interrupt(&mut self, dp: &mut DataPath) -> Result<()> {
        match self.saved_contexts.pop() {
            Some(saved) => {
                dp.exit_interrupt()?;
                self.signals = saved;
                Ok(())
            }
            None => berr!("ControlUnit: interrupt return without a saved context"),
        }
    }

    pub fn in_interrupt(&self) -> bool {
        !self.saved_contexts.is_empty()
    }

    pub fn signals(&self) -> ControlSignals {
        self.signals
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_num
    }

    pub fn halted(&self) -> bool {
        self.halted
    }

    // Private.

    fn execute(&mut self, dp: &mut DataPath, op: Opcode) -> Result<()> {
        let mut bundles = microprogram(op, false);
        let mut num = 0;
        while num < bundles.len() {
            self.sub_tick(dp, &bundles[num])?;
            if num == 0 && is_conditional(op) {
                // The branch direction is known only once the first
                // bundle's flags have been sampled.
                bundles = microprogram(op, self.branch_taken(op));
            }
            num += 1;
        }
        Ok(())
    }

    fn branch_taken(&self, op: Opcode) -> bool {
        match op {
            Opcode::Bne => self.zero_flag == 0,
            Opcode::Beq => self.zero_flag != 0,
            Opcode::Jg => self.positive_flag != 0,
            _ => false,
        }
    }

    fn log_tick(&mut self, dp: &DataPath) -> Result<()> {
        let (a1, a2, a3) = dp.register_file().decoded_addresses();
        let line = format!(
            "{}Tick {}) PC={} regs={} srcA={} srcB={} Result={} A1={} A2={} A3={}",
            if self.in_interrupt() { "(Int) " } else { "" },
            self.tick_num,
            dp.pc_value(),
            dp.register_file(),
            dp.src_a_value(),
            dp.src_b_value(),
            dp.alu_result(),
            a1,
            a2,
            a3
        );
        match self.tick_log {
            Some(ref mut file) => file.write_line(&line),
            None => {
                println!("{}", line);
                Ok(())
            }
        }
    }
}

impl fmt::Display for ControlUnit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Tick: {}\nOpcode: {}\nZero: {} Positive: {} IOInt: {}\nSignals: {:?}",
            self.tick_num, self.opcode, self.zero_flag, self.positive_flag, self.io_int, self.signals
        )
    }
}
