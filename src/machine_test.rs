// End-to-end test code for the assembled machine: control unit schedules,
// interrupt context handling and the documented execution scenarios.
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

use config::Config;
use control::{fetch_bundle, microprogram, ControlSignals, ControlUnit};
use data_path::DataPath;
use isa::Opcode;
use system::System;
use translator::translate;

fn config(interrupts_enabled: bool) -> Config {
    let args = vec![
        "prog.bin".to_string(),
        "0".to_string(),
        if interrupts_enabled { "True" } else { "False" }.to_string(),
    ];
    Config::from_args(&args).unwrap()
}

fn config_with(extra: &[&str]) -> Config {
    let mut args = vec!["prog.bin".to_string(), "0".to_string(), "False".to_string()];
    for arg in extra {
        args.push(arg.to_string());
    }
    Config::from_args(&args).unwrap()
}

// Microprogram properties.

#[test]
fn every_microprogram_commits_the_pc_exactly_once() {
    let ops = [
        Opcode::Addi,
        Opcode::Add,
        Opcode::Rem,
        Opcode::Mul,
        Opcode::Ld,
        Opcode::Sw,
        Opcode::Cmp,
        Opcode::Jmp,
        Opcode::Jg,
        Opcode::Bne,
        Opcode::Beq,
    ];
    let pc_commit = ControlSignals {
        pc_write: 1,
        ..Default::default()
    };

    for op in ops.iter() {
        for taken in [false, true].iter() {
            let bundles = microprogram(*op, *taken);
            assert_eq!(*bundles.last().unwrap(), pc_commit);
            let commits = bundles.iter().filter(|b| b.pc_write != 0).count();
            assert_eq!(commits, 1);
        }
    }
}

#[test]
fn the_halt_microprogram_never_touches_the_pc() {
    for bundle in microprogram(Opcode::Halt, false) {
        assert_eq!(bundle.pc_write, 0);
    }
}

#[test]
fn a_sub_tick_releases_every_signal_the_bundle_does_not_name() {
    let config = config(false);
    let mut dp = DataPath::new(&config).unwrap();
    let mut cu = ControlUnit::new(&config).unwrap();

    let first = ControlSignals {
        ir_write: 1,
        alu_src_b: 1,
        ..Default::default()
    };
    cu.sub_tick(&mut dp, &first).unwrap();
    assert_eq!(cu.signals(), first);

    let second = ControlSignals {
        reg_write: 1,
        ..Default::default()
    };
    cu.sub_tick(&mut dp, &second).unwrap();
    assert_eq!(cu.signals(), second);
}

// Documented execution scenarios.

#[test]
fn addi_then_halt_takes_seven_ticks() {
    // addi x1, x0, 5 ; halt - loaded raw at address 0.
    let addi = (5 << 10) | (0 << 7) | (1 << 4) | Opcode::Addi.code();
    let config = config(false);
    let mut system = System::with_program(&config, &[addi, Opcode::Halt.code()]).unwrap();

    system.run().unwrap();

    assert_eq!(system.data_path().register_file().get(1), 5);
    assert_eq!(system.data_path().pc_value(), 1);
    assert_eq!(system.control_unit().tick_count(), 7);
}

#[test]
fn a_backward_branch_loop_sums_one_through_five() {
    let source = "section .text
_start:
    addi x2, x0, 0
    addi x3, x0, 0
loop:
    addi x3, x3, 1
    add x2, x2, x3
    bne x3, x4, loop
    halt
";
    let translation = translate(source).unwrap();
    let config = config(false);
    let mut system = System::with_program(&config, &translation.code).unwrap();
    system.data_path_mut().register_file_mut().set(4, 5);

    system.run().unwrap();

    assert_eq!(system.data_path().register_file().get(2), 15);
    assert_eq!(system.data_path().register_file().get(3), 5);
}

#[test]
fn stores_and_loads_round_trip_through_memory() {
    let source = "section .text
_start:
    sw x1, +0(x2)
    ld x3, +0(x2)
    halt
";
    let translation = translate(source).unwrap();
    let config = config(false);
    let mut system = System::with_program(&config, &translation.code).unwrap();
    system.data_path_mut().register_file_mut().set(1, 42);
    system.data_path_mut().register_file_mut().set(2, 100);

    system.run().unwrap();

    assert_eq!(system.data_path().register_file().get(3), 42);
    assert_eq!(system.data_path().memory().cell(100).unwrap(), 42);
}

#[test]
fn the_keystroke_schedule_echoes_hello_through_interrupts() {
    let source = "section .data
stop: 'o'

section .text
_start:
    addi x4, x0, 60
    addi x4, x4, 60
    addi x6, x0, handler
    ld x5, +stop(x0)
wait:
    bne x3, x5, wait
    halt
handler:
    ld x3, +0(x4)
    sw x3, +1(x4)
    halt
";
    let translation = translate(source).unwrap();
    let config = config(true);
    let mut system = System::with_program(&config, &translation.code).unwrap();
    // The default schedule fires before the set-up code can run, so the
    // harness establishes the handler vector and the MMIO base up front,
    // exactly the values the set-up code re-derives.
    system.data_path_mut().register_file_mut().set(6, 8);
    system.data_path_mut().register_file_mut().set(4, 120);

    system.run().unwrap();

    let output: String = system
        .data_path()
        .io_handler()
        .output_buffer()
        .iter()
        .cloned()
        .collect();
    assert_eq!(output, "hello");
}

#[test]
fn remainder_and_multiply_write_back() {
    let source = "section .text
_start:
    addi x1, x0, 17
    addi x2, x0, 5
    rem x3, x1, x2
    mul x4, x1, x2
    halt
";
    let translation = translate(source).unwrap();
    let config = config(false);
    let mut system = System::with_program(&config, &translation.code).unwrap();

    system.run().unwrap();

    assert_eq!(system.data_path().register_file().get(3), 2);
    assert_eq!(system.data_path().register_file().get(4), 85);
}

#[test]
fn jg_consumes_the_flags_of_a_preceding_compare() {
    let source = "section .text
_start:
    addi x1, x0, 5
    cmp x1, +2(x0)
    jg done
    addi x2, x0, 1
done:
    halt
";
    let translation = translate(source).unwrap();
    let config = config(false);
    let mut system = System::with_program(&config, &translation.code).unwrap();

    system.run().unwrap();

    // 5 > 2: the guarded addi is skipped.
    assert_eq!(system.data_path().register_file().get(2), 0);
    assert_eq!(system.data_path().pc_value(), 5);
}

#[test]
fn jg_falls_through_when_the_compare_was_not_positive() {
    let source = "section .text
_start:
    addi x1, x0, 5
    cmp x1, +9(x0)
    jg done
    addi x2, x0, 1
done:
    halt
";
    let translation = translate(source).unwrap();
    let config = config(false);
    let mut system = System::with_program(&config, &translation.code).unwrap();

    system.run().unwrap();

    assert_eq!(system.data_path().register_file().get(2), 1);
}

#[test]
fn writes_to_x0_have_no_architectural_effect() {
    let addi = (5 << 10) | (0 << 7) | (0 << 4) | Opcode::Addi.code();
    let config = config(false);
    let mut system = System::with_program(&config, &[addi, Opcode::Halt.code()]).unwrap();

    system.run().unwrap();

    assert_eq!(system.data_path().register_file().get(0), 0);
}

#[test]
fn an_undefined_opcode_is_fatal() {
    let config = config(false);
    let mut system = System::with_program(&config, &[12]).unwrap();

    assert!(system.run().is_err());
}

#[test]
fn a_program_that_never_halts_exhausts_the_tick_budget() {
    // A jump with offset zero spins on itself forever.
    let config = config_with(&["--tick_limit", "20"]);
    let mut system = System::with_program(&config, &[Opcode::Jmp.code()]).unwrap();

    assert!(system.run().is_err());
}

// Interrupt context handling.

#[test]
fn entering_and_leaving_an_interrupt_preserves_the_datapath() {
    let config = config(true);
    let mut dp = DataPath::new(&config).unwrap();
    dp.load_program(&[(5 << 10) | (1 << 4), Opcode::Halt.code()], 0)
        .unwrap();
    dp.set_pc(0);
    dp.register_file_mut().set(6, 40);

    let mut cu = ControlUnit::new(&config).unwrap();
    cu.sub_tick(&mut dp, &fetch_bundle()).unwrap();

    let pc = dp.pc_value();
    let ir = dp.ir_value();
    let alu_result = dp.alu_result();

    dp.enter_interrupt().unwrap();
    assert_eq!(dp.pc_value(), 40);
    dp.exit_interrupt().unwrap();

    assert_eq!(dp.pc_value(), pc);
    assert_eq!(dp.ir_value(), ir);
    assert_eq!(dp.alu_result(), alu_result);
}

#[test]
fn an_interrupt_restores_every_control_signal_and_the_pc() {
    let config = config(true);
    let mut dp = DataPath::new(&config).unwrap();
    dp.load_program(&[(5 << 10) | (1 << 4), Opcode::Halt.code()], 0)
        .unwrap();
    dp.set_pc(0);
    dp.register_file_mut().set(6, 40);

    let mut cu = ControlUnit::new(&config).unwrap();
    let busy = ControlSignals {
        ir_write: 1,
        alu_src_b: 1,
        ..Default::default()
    };
    cu.sub_tick(&mut dp, &busy).unwrap();

    let saved_signals = cu.signals();
    let saved_pc = dp.pc_value();
    let saved_ir = dp.ir_value();
    let saved_alu = dp.alu_result();

    cu.service_interrupt(&mut dp).unwrap();
    assert!(cu.in_interrupt());
    assert_eq!(dp.pc_value(), 40);

    // The handler body: a fetch and a full ADDI, clobbering everything.
    cu.sub_tick(&mut dp, &fetch_bundle()).unwrap();
    for bundle in microprogram(Opcode::Addi, false) {
        cu.sub_tick(&mut dp, &bundle).unwrap();
    }

    cu.return_from_interrupt(&mut dp).unwrap();

    assert!(!cu.in_interrupt());
    assert_eq!(cu.signals(), saved_signals);
    assert_eq!(dp.pc_value(), saved_pc);
    assert_eq!(dp.ir_value(), saved_ir);
    assert_eq!(dp.alu_result(), saved_alu);
}

#[test]
fn an_interrupt_return_without_a_context_is_fatal() {
    let config = config(true);
    let mut dp = DataPath::new(&config).unwrap();
    let mut cu = ControlUnit::new(&config).unwrap();

    assert!(cu.return_from_interrupt(&mut dp).is_err());
}
