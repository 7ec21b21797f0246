//! End-to-end tests of the lower half of the toolchain: VM code through
//! the translator and assembler, executed on a small Hack CPU interpreter
//! to check observable machine state.

use hackc::assembler::assemble_source;
use hackc::translator::{self, VmUnit};

/// Execute assembled `.hack` code for up to `steps` instructions and
/// return RAM. Halt loops simply burn the remaining budget.
fn run_hack(hack: &str, ram_init: &[(usize, i16)], steps: usize) -> Vec<i16> {
    let rom: Vec<u16> = hack
        .lines()
        .map(|line| u16::from_str_radix(line, 2).expect("16-bit word"))
        .collect();
    let mut ram = vec![0i16; 0x8000];
    for (addr, value) in ram_init {
        ram[*addr] = *value;
    }

    let mut a: i16 = 0;
    let mut d: i16 = 0;
    let mut pc: usize = 0;
    for _ in 0..steps {
        if pc >= rom.len() {
            break;
        }
        let word = rom[pc];
        if word & 0x8000 == 0 {
            a = word as i16;
            pc += 1;
            continue;
        }

        // 111 a c1..c6 d1 d2 d3 j1 j2 j3
        let addr = (a as u16 & 0x7FFF) as usize;
        let y = if word & 0x1000 != 0 { ram[addr] } else { a };
        let result: i16 = match (word >> 6) & 0x3F {
            0b101010 => 0,
            0b111111 => 1,
            0b111010 => -1,
            0b001100 => d,
            0b110000 => y,
            0b001101 => !d,
            0b110001 => !y,
            0b001111 => d.wrapping_neg(),
            0b110011 => y.wrapping_neg(),
            0b011111 => d.wrapping_add(1),
            0b110111 => y.wrapping_add(1),
            0b001110 => d.wrapping_sub(1),
            0b110010 => y.wrapping_sub(1),
            0b000010 => d.wrapping_add(y),
            0b010011 => d.wrapping_sub(y),
            0b000111 => y.wrapping_sub(d),
            0b000000 => d & y,
            0b010101 => d | y,
            bits => panic!("invalid comp bits {:06b}", bits),
        };

        // M writes address with the pre-instruction A.
        if word & 0x0008 != 0 {
            ram[addr] = result;
        }
        if word & 0x0020 != 0 {
            a = result;
        }
        if word & 0x0010 != 0 {
            d = result;
        }

        let jump = match word & 0x7 {
            0b000 => false,
            0b001 => result > 0,
            0b010 => result == 0,
            0b011 => result >= 0,
            0b100 => result < 0,
            0b101 => result != 0,
            0b110 => result <= 0,
            0b111 => true,
            _ => unreachable!(),
        };
        pc = if jump { (a as u16 & 0x7FFF) as usize } else { pc + 1 };
    }
    ram
}

fn unit(stem: &str, source: &str) -> VmUnit {
    VmUnit {
        filename: format!("{}.vm", stem),
        stem: stem.to_string(),
        source: source.to_string(),
    }
}

/// Translate, assemble, run. Bootstrapped programs set up their own
/// pointers; bare programs get the segment pointers a test script would
/// provide (stack at 256, spare ARG area at 400).
fn run_vm(units: &[VmUnit], bootstrap: bool, steps: usize) -> Vec<i16> {
    let asm = translator::translate_units(units, bootstrap).expect("translate");
    let hack = assemble_source(&asm).expect("assemble");
    let ram_init: &[(usize, i16)] = if bootstrap {
        &[]
    } else {
        &[(0, 256), (1, 256), (2, 400)]
    };
    run_hack(&hack, ram_init, steps)
}

#[test]
fn test_add_then_pop_to_temp() {
    let ram = run_vm(
        &[unit(
            "SimpleAdd",
            "push constant 0\npush constant 1\nadd\npop temp 0\n",
        )],
        false,
        1_000,
    );
    assert_eq!(ram[5], 1);
    assert_eq!(ram[0], 256, "stack should be empty again");
}

#[test]
fn test_arithmetic_and_logic() {
    let ram = run_vm(
        &[unit(
            "Arith",
            "push constant 9\npush constant 4\nsub\npop temp 0\n\
             push constant 3\nneg\npop temp 1\n\
             push constant 12\npush constant 10\nand\npop temp 2\n\
             push constant 12\npush constant 10\nor\npop temp 3\n\
             push constant 0\nnot\npop temp 4\n",
        )],
        false,
        5_000,
    );
    assert_eq!(ram[5], 5);
    assert_eq!(ram[6], -3);
    assert_eq!(ram[7], 8);
    assert_eq!(ram[8], 14);
    assert_eq!(ram[9], -1);
}

#[test]
fn test_comparisons_yield_vm_booleans() {
    let ram = run_vm(
        &[unit(
            "Cmp",
            "push constant 5\npush constant 5\neq\npop temp 0\n\
             push constant 7\npush constant 3\ngt\npop temp 1\n\
             push constant 2\npush constant 9\nlt\npop temp 2\n\
             push constant 9\npush constant 2\nlt\npop temp 3\n",
        )],
        false,
        5_000,
    );
    assert_eq!(ram[5], -1, "5 = 5");
    assert_eq!(ram[6], -1, "7 > 3");
    assert_eq!(ram[7], -1, "2 < 9");
    assert_eq!(ram[8], 0, "9 < 2 is false");
}

#[test]
fn test_branching_loop_sums_one_to_five() {
    let ram = run_vm(
        &[unit(
            "Loop",
            "push constant 0\npop temp 0\n\
             push constant 5\npop temp 1\n\
             label LOOP\n\
             push temp 0\npush temp 1\nadd\npop temp 0\n\
             push temp 1\npush constant 1\nsub\npop temp 1\n\
             push temp 1\nif-goto LOOP\n",
        )],
        false,
        10_000,
    );
    assert_eq!(ram[5], 15);
}

#[test]
fn test_call_and_return_leave_one_result() {
    let ram = run_vm(
        &[unit(
            "Call",
            "function Main.main 0\n\
             push constant 1\n\
             push constant 2\n\
             call Main.seven 2\n\
             label HALT\n\
             goto HALT\n\
             function Main.seven 0\n\
             push constant 7\n\
             return\n",
        )],
        false,
        10_000,
    );
    // Two arguments were replaced by the one return value.
    assert_eq!(ram[0], 257, "SP should be pre-call SP minus 1");
    assert_eq!(ram[256], 7, "top of stack should be the returned 7");
}

#[test]
fn test_locals_and_arguments_across_calls() {
    let ram = run_vm(
        &[unit(
            "Frames",
            "function Main.main 1\n\
             push constant 10\n\
             pop local 0\n\
             push local 0\n\
             push constant 32\n\
             call Main.addBoth 2\n\
             pop temp 0\n\
             push local 0\n\
             pop temp 1\n\
             label HALT\n\
             goto HALT\n\
             function Main.addBoth 0\n\
             push argument 0\n\
             push argument 1\n\
             add\n\
             return\n",
        )],
        false,
        20_000,
    );
    assert_eq!(ram[5], 42, "10 + 32 via arguments");
    assert_eq!(ram[6], 10, "caller's local survives the call");
}

#[test]
fn test_bootstrap_and_statics_stay_per_file() {
    let sys = "function Sys.init 0\n\
               call Foo.set 0\npop temp 0\n\
               call Bar.set 0\npop temp 0\n\
               call Foo.get 0\npop temp 1\n\
               call Bar.get 0\npop temp 2\n\
               label HALT\ngoto HALT\n";
    let foo = "function Foo.set 0\npush constant 11\npop static 0\npush constant 0\nreturn\n\
               function Foo.get 0\npush static 0\nreturn\n";
    let bar = "function Bar.set 0\npush constant 22\npop static 0\npush constant 0\nreturn\n\
               function Bar.get 0\npush static 0\nreturn\n";
    let ram = run_vm(
        &[unit("Sys", sys), unit("Foo", foo), unit("Bar", bar)],
        true,
        50_000,
    );
    assert_eq!(ram[6], 11, "Foo's static 0");
    assert_eq!(ram[7], 22, "Bar's static 0");
}

#[test]
fn test_nested_calls_restore_this_and_that() {
    let ram = run_vm(
        &[unit(
            "Pointers",
            "function Main.main 0\n\
             push constant 3000\npop pointer 0\n\
             push constant 4000\npop pointer 1\n\
             call Main.clobber 0\npop temp 0\n\
             push pointer 0\npop temp 1\n\
             push pointer 1\npop temp 2\n\
             label HALT\ngoto HALT\n\
             function Main.clobber 0\n\
             push constant 1\npop pointer 0\n\
             push constant 2\npop pointer 1\n\
             push constant 0\nreturn\n",
        )],
        false,
        20_000,
    );
    assert_eq!(ram[6], 3000, "THIS restored after return");
    assert_eq!(ram[7], 4000, "THAT restored after return");
}

#[test]
fn test_full_pipeline_jack_to_machine_code() {
    let source = r#"
class Sys {
    static int counter;

    function void init() {
        var int i;
        let i = 0;
        while (i < 10) {
            let i = i + 3;
        }
        let counter = i;
        do Sys.halt();
        return;
    }

    function void halt() {
        while (true) {
        }
        return;
    }
}
"#;
    let vm = hackc::compile_source_silent(source).expect("compile");
    let ram = run_vm(&[unit("Sys", &vm)], true, 50_000);
    // The only variable symbol in the program is the static `Sys.0`,
    // so the assembler puts it at 16. The loop leaves i = 12.
    assert_eq!(ram[16], 12);
}

#[test]
fn test_directory_input_resolves_with_bootstrap() {
    let dir = tempfile::tempdir().unwrap();
    let prog = dir.path().join("prog");
    std::fs::create_dir(&prog).unwrap();
    std::fs::write(prog.join("Main.vm"), "function Main.main 0\nreturn\n").unwrap();
    std::fs::write(prog.join("Sys.vm"), "function Sys.init 0\nreturn\n").unwrap();

    let input = translator::resolve_input(&prog, false).unwrap();
    assert!(input.bootstrap);
    assert_eq!(input.out_path, prog.join("prog.asm"));
    // Sorted by path: Main before Sys.
    let stems: Vec<&str> = input.units.iter().map(|u| u.stem.as_str()).collect();
    assert_eq!(stems, vec!["Main", "Sys"]);
}

#[test]
fn test_single_file_input_has_no_bootstrap() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Solo.vm");
    std::fs::write(&path, "push constant 1\n").unwrap();

    let input = translator::resolve_input(&path, false).unwrap();
    assert!(!input.bootstrap);
    assert_eq!(input.out_path, dir.path().join("Solo.asm"));

    let forced = translator::resolve_input(&path, true).unwrap();
    assert!(forced.bootstrap);
}

#[test]
fn test_empty_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = translator::resolve_input(dir.path(), false).unwrap_err();
    assert!(err.to_string().contains("no .vm files"));
}
