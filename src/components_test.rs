// Test code for the memory, register file, ALU, sign expander and I/O
// handler.
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

use alu::{Alu, ALU_ADD, ALU_MUL, ALU_REM, ALU_SUB};
use circuit::{WireId, WireSet};
use io_handler::{IoHandler, IO_CELL_IN, IO_CELL_OUT};
use memory::Memory;
use register::RegisterFile;
use sign_expand::{SignExpand, IMM_NIBBLE, IMM_SPLIT, IMM_WIDE};

fn three_wires(wires: &mut WireSet) -> (WireId, WireId, WireId) {
    (wires.alloc(), wires.alloc(), wires.alloc())
}

// Memory.

#[test]
fn memory_with_write_enable_stores_the_write_port() {
    let mut wires = WireSet::new();
    let (addr, rd, wd) = three_wires(&mut wires);
    let mut memory = Memory::new(addr, rd, wd, 5);

    wires.set(addr, 3);
    wires.set(wd, 5);
    memory.tick(&mut wires, 1).unwrap();

    assert_eq!(memory.cell(3).unwrap(), 5);
}

#[test]
fn memory_without_write_enable_publishes_the_read_port() {
    let mut wires = WireSet::new();
    let (addr, rd, wd) = three_wires(&mut wires);
    let mut memory = Memory::new(addr, rd, wd, 5);

    memory.set_cell(3, 5).unwrap();
    wires.set(addr, 3);
    memory.tick(&mut wires, 0).unwrap();

    assert_eq!(wires.get(rd), 5);
}

#[test]
fn memory_write_then_read_round_trips() {
    let mut wires = WireSet::new();
    let (addr, rd, wd) = three_wires(&mut wires);
    let mut memory = Memory::new(addr, rd, wd, 16);

    wires.set(addr, 9);
    wires.set(wd, 0xbeef);
    memory.tick(&mut wires, 1).unwrap();
    memory.tick(&mut wires, 0).unwrap();

    assert_eq_hex!(wires.get(rd), 0xbeef);
}

#[test]
fn memory_address_out_of_range_is_fatal() {
    let mut wires = WireSet::new();
    let (addr, rd, wd) = three_wires(&mut wires);
    let mut memory = Memory::new(addr, rd, wd, 5);

    wires.set(addr, 7);

    assert!(memory.tick(&mut wires, 0).is_err());
}

#[test]
fn memory_loads_a_program_that_fits() {
    let mut wires = WireSet::new();
    let (addr, rd, wd) = three_wires(&mut wires);
    let mut memory = Memory::new(addr, rd, wd, 5);

    memory.load_program(&[6], 0).unwrap();

    assert_eq!(memory.cell(0).unwrap(), 6);
}

#[test]
fn memory_rejects_a_program_past_the_end() {
    let mut wires = WireSet::new();
    let (addr, rd, wd) = three_wires(&mut wires);
    let mut memory = Memory::new(addr, rd, wd, 5);

    assert!(memory.load_program(&[6], 5).is_err());
}

// Register file.

fn register_file(wires: &mut WireSet) -> (RegisterFile, WireId, WireId, WireId, WireId) {
    let instr = wires.alloc();
    let rd1 = wires.alloc();
    let rd2 = wires.alloc();
    let wd = wires.alloc();
    (RegisterFile::new(instr, rd1, rd2, wd), instr, rd1, rd2, wd)
}

#[test]
fn register_file_masks_the_address_fields_out_of_the_instruction() {
    let mut wires = WireSet::new();
    let (mut regs, instr, _, _, _) = register_file(&mut wires);

    // A1 in bits 7-9, A2 in bits 10-12, A3 in bits 4-6.
    wires.set(instr, (5 << 7) | (3 << 10) | (6 << 4));
    regs.tick(&mut wires, 0);

    assert_eq!(regs.decoded_addresses(), (5, 3, 6));
}

#[test]
fn register_file_without_write_enable_publishes_both_read_ports() {
    let mut wires = WireSet::new();
    let (mut regs, instr, rd1, rd2, _) = register_file(&mut wires);

    regs.set(7, 20);
    regs.set(5, 10);
    wires.set(instr, (7 << 7) | (5 << 10));
    regs.tick(&mut wires, 0);

    assert_eq!(wires.get(rd1), 20);
    assert_eq!(wires.get(rd2), 10);
}

#[test]
fn register_file_with_write_enable_writes_the_destination() {
    let mut wires = WireSet::new();
    let (mut regs, instr, _, _, wd) = register_file(&mut wires);

    wires.set(instr, 3 << 4);
    wires.set(wd, 5);
    regs.tick(&mut wires, 1);

    assert_eq!(regs.get(3), 5);
}

#[test]
fn register_file_drops_writes_to_x0() {
    let mut wires = WireSet::new();
    let (mut regs, instr, _, _, wd) = register_file(&mut wires);

    wires.set(instr, 0);
    wires.set(wd, 5);
    regs.tick(&mut wires, 1);

    assert_eq!(regs.get(0), 0);
}

#[test]
fn register_file_keeps_x0_zero_through_direct_sets() {
    let mut wires = WireSet::new();
    let (mut regs, _, _, _, _) = register_file(&mut wires);

    regs.set(0, 42);

    assert_eq!(regs.get(0), 0);
}

// ALU.

fn alu(wires: &mut WireSet) -> (Alu, WireId, WireId, WireId) {
    let a = wires.alloc();
    let b = wires.alloc();
    let out = wires.alloc();
    (Alu::new(a, b, out), a, b, out)
}

#[test]
fn alu_computes_all_four_operations() {
    let mut wires = WireSet::new();
    let (mut alu, a, b, out) = alu(&mut wires);

    wires.set(a, 17);
    wires.set(b, 5);

    alu.tick(&mut wires, ALU_ADD, 0).unwrap();
    assert_eq!(wires.get(out), 22);
    alu.tick(&mut wires, ALU_SUB, 0).unwrap();
    assert_eq!(wires.get(out), 12);
    alu.tick(&mut wires, ALU_REM, 0).unwrap();
    assert_eq!(wires.get(out), 2);
    alu.tick(&mut wires, ALU_MUL, 0).unwrap();
    assert_eq!(wires.get(out), 85);
}

#[test]
fn alu_arithmetic_wraps() {
    let mut wires = WireSet::new();
    let (mut alu, a, b, _) = alu(&mut wires);

    wires.set(a, 0xffff);
    wires.set(b, 2);
    alu.tick(&mut wires, ALU_ADD, 0).unwrap();

    assert_eq_hex!(alu.result(), 1);
}

#[test]
fn alu_flags_latch_only_with_the_flag_enable() {
    let mut wires = WireSet::new();
    let (mut alu, a, b, _) = alu(&mut wires);

    wires.set(a, 5);
    wires.set(b, 5);
    alu.tick(&mut wires, ALU_SUB, 1).unwrap();
    assert_eq!(alu.zero_flag(), 1);
    assert_eq!(alu.positive_flag(), 0);

    // Flags hold through ticks that do not assert the enable.
    wires.set(b, 2);
    alu.tick(&mut wires, ALU_SUB, 0).unwrap();
    assert_eq!(alu.zero_flag(), 1);

    alu.tick(&mut wires, ALU_SUB, 1).unwrap();
    assert_eq!(alu.zero_flag(), 0);
    assert_eq!(alu.positive_flag(), 1);
}

#[test]
fn alu_positive_flag_reads_the_result_as_signed() {
    let mut wires = WireSet::new();
    let (mut alu, a, b, _) = alu(&mut wires);

    wires.set(a, 2);
    wires.set(b, 5);
    alu.tick(&mut wires, ALU_SUB, 1).unwrap();

    // 2 - 5 wraps to 0xfffd, negative as a signed word.
    assert_eq!(alu.positive_flag(), 0);
    assert_eq!(alu.zero_flag(), 0);
}

#[test]
fn alu_unknown_operation_is_fatal() {
    let mut wires = WireSet::new();
    let (mut alu, _, _, _) = alu(&mut wires);

    assert!(alu.tick(&mut wires, 4, 0).is_err());
}

#[test]
fn alu_remainder_by_zero_is_fatal() {
    let mut wires = WireSet::new();
    let (mut alu, a, b, _) = alu(&mut wires);

    wires.set(a, 5);
    wires.set(b, 0);

    assert!(alu.tick(&mut wires, ALU_REM, 0).is_err());
}

// Sign expander.

fn sign_expand(wires: &mut WireSet) -> (SignExpand, WireId, WireId) {
    let instr = wires.alloc();
    let out = wires.alloc();
    (SignExpand::new(instr, out), instr, out)
}

#[test]
fn sign_expand_wide_layout_takes_the_high_bits() {
    let mut wires = WireSet::new();
    let (mut expand, instr, out) = sign_expand(&mut wires);

    wires.set(instr, 33 << 10);
    expand.tick(&mut wires, IMM_WIDE).unwrap();

    assert_eq!(wires.get(out), 33);
}

#[test]
fn sign_expand_nibble_layout_takes_the_top_four_bits() {
    let mut wires = WireSet::new();
    let (mut expand, instr, out) = sign_expand(&mut wires);

    wires.set(instr, 9 << 13);
    expand.tick(&mut wires, IMM_NIBBLE).unwrap();

    assert_eq!(wires.get(out), 9);
}

#[test]
fn sign_expand_split_layout_merges_both_halves() {
    let mut wires = WireSet::new();
    let (mut expand, instr, out) = sign_expand(&mut wires);

    // High half 0b010 in bits 13-15, low half 0b111 in bits 4-6: 0b010111.
    wires.set(instr, (0b010 << 13) | (0b111 << 4));
    expand.tick(&mut wires, IMM_SPLIT).unwrap();

    assert_eq!(wires.get(out), 0b010111);
}

#[test]
fn sign_expand_split_layout_sign_extends() {
    let mut wires = WireSet::new();
    let (mut expand, instr, out) = sign_expand(&mut wires);

    // 0b111110 is -2 as a six bit value.
    wires.set(instr, (0b111 << 13) | (0b110 << 4));
    expand.tick(&mut wires, IMM_SPLIT).unwrap();

    assert_eq_hex!(wires.get(out), 0xfffe);
}

#[test]
fn sign_expand_unknown_layout_is_fatal() {
    let mut wires = WireSet::new();
    let (mut expand, _, _) = sign_expand(&mut wires);

    assert!(expand.tick(&mut wires, 3).is_err());
}

// I/O handler.

fn io_handler(
    wires: &mut WireSet,
    schedule: Vec<(u64, char)>,
) -> (IoHandler, WireId, WireId, WireId) {
    let addr = wires.alloc();
    let wd = wires.alloc();
    let out = wires.alloc();
    (IoHandler::new(addr, wd, out, schedule), addr, wd, out)
}

#[test]
fn io_handler_schedule_raises_the_interrupt_and_fills_the_dip() {
    let mut wires = WireSet::new();
    let (mut io, _, _, _) = io_handler(&mut wires, vec![(1, 'a')]);

    io.tick(&mut wires, 0, 1).unwrap();

    assert!(io.interrupt_requested());
    assert_eq!(io.dip_value(), 'a' as u16);
}

#[test]
fn io_handler_read_of_the_input_cell_publishes_the_dip() {
    let mut wires = WireSet::new();
    let (mut io, addr, wd, out) = io_handler(&mut wires, vec![(1, 'a')]);

    // Tick 1 only delivers the keystroke; tick 2 reads it back.
    wires.set(addr, 0);
    io.tick(&mut wires, 0, 1).unwrap();
    wires.set(addr, IO_CELL_IN);
    wires.set(wd, 'b' as u16);
    io.tick(&mut wires, 1, 2).unwrap();

    assert_eq!(wires.get(out), 'a' as u16);
    assert_eq!(io.dip_value(), 'a' as u16);
}

#[test]
fn io_handler_write_to_the_output_cell_buffers_and_latches() {
    let mut wires = WireSet::new();
    let (mut io, addr, wd, _) = io_handler(&mut wires, vec![]);

    wires.set(addr, IO_CELL_OUT);
    wires.set(wd, 'b' as u16);
    io.tick(&mut wires, 1, 1).unwrap();

    assert_eq!(io.output_buffer(), &['b']);
    assert_eq!(io.dip_value(), 'b' as u16);
}

#[test]
fn io_handler_two_writes_accumulate_in_the_buffer() {
    let mut wires = WireSet::new();
    let (mut io, addr, wd, _) = io_handler(&mut wires, vec![]);

    wires.set(addr, IO_CELL_OUT);
    wires.set(wd, 'b' as u16);
    io.tick(&mut wires, 1, 1).unwrap();
    io.tick(&mut wires, 1, 2).unwrap();

    assert_eq!(io.output_buffer(), &['b', 'b']);
}

#[test]
fn io_handler_mmio_access_without_the_operation_signal_is_fatal() {
    let mut wires = WireSet::new();
    let (mut io, addr, _, _) = io_handler(&mut wires, vec![]);

    wires.set(addr, IO_CELL_IN);
    assert!(io.tick(&mut wires, 0, 1).is_err());

    wires.set(addr, IO_CELL_OUT);
    assert!(io.tick(&mut wires, 0, 2).is_err());
}

#[test]
fn io_handler_keystroke_survives_an_output_write_on_the_same_tick() {
    let mut wires = WireSet::new();
    let (mut io, addr, wd, _) = io_handler(&mut wires, vec![(1, 'e')]);

    wires.set(addr, IO_CELL_OUT);
    wires.set(wd, 'h' as u16);
    io.tick(&mut wires, 1, 1).unwrap();

    assert_eq!(io.output_buffer(), &['h']);
    assert_eq!(io.dip_value(), 'e' as u16);
    assert!(io.interrupt_requested());
}
