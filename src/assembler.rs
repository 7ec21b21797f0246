//! The third pass of the toolchain: Hack assembly to 16-bit machine code.
//!
//! Two passes over the source: the first collects `(LABEL)` declarations
//! against the instruction counter, the second encodes instructions,
//! allocating RAM slots from 16 upward for symbols that are neither
//! predefined nor labels.

use std::collections::HashMap;

use crate::diagnostic::Diagnostic;
use crate::span::Span;

/// RAM address of the first user variable.
const FIRST_VARIABLE: u16 = 16;

/// Highest address an A-instruction can load (15-bit immediate).
const MAX_ADDRESS: u32 = 32767;

pub fn assemble_source(source: &str) -> Result<String, Vec<Diagnostic>> {
    let mut diagnostics = Vec::new();
    let mut symbols = predefined_symbols();

    // Pass 1: bind labels to instruction addresses.
    let mut instructions: Vec<(String, Span)> = Vec::new();
    let mut offset = 0u32;
    for line in source.split('\n') {
        let span = Span::new(offset, offset + line.trim_end().len() as u32);
        offset += line.len() as u32 + 1;

        let code = match line.find("//") {
            Some(pos) => &line[..pos],
            None => line,
        };
        let code: String = code.chars().filter(|c| !c.is_whitespace()).collect();
        if code.is_empty() {
            continue;
        }

        if let Some(name) = code.strip_prefix('(').and_then(|c| c.strip_suffix(')')) {
            if symbols.contains_key(name) {
                diagnostics.push(Diagnostic::error(
                    format!("label '{}' is declared twice", name),
                    span,
                ));
            } else {
                symbols.insert(name.to_string(), instructions.len() as u16);
            }
        } else {
            instructions.push((code, span));
        }
    }

    // Pass 2: encode, allocating variables in order of first use.
    let mut next_variable = FIRST_VARIABLE;
    let mut output = Vec::with_capacity(instructions.len());
    for (code, span) in &instructions {
        let encoded = if let Some(target) = code.strip_prefix('@') {
            encode_a_instruction(target, *span, &mut symbols, &mut next_variable)
        } else {
            encode_c_instruction(code, *span)
        };
        match encoded {
            Ok(word) => output.push(word),
            Err(diag) => diagnostics.push(diag),
        }
    }

    if diagnostics.is_empty() {
        let mut text = output.join("\n");
        text.push('\n');
        Ok(text)
    } else {
        Err(diagnostics)
    }
}

fn encode_a_instruction(
    target: &str,
    span: Span,
    symbols: &mut HashMap<String, u16>,
    next_variable: &mut u16,
) -> Result<String, Diagnostic> {
    let address = if target.chars().all(|c| c.is_ascii_digit()) {
        match target.parse::<u32>() {
            Ok(n) if n <= MAX_ADDRESS => n as u16,
            _ => {
                return Err(Diagnostic::error(
                    format!("address '{}' does not fit in 15 bits", target),
                    span,
                ))
            }
        }
    } else if let Some(address) = symbols.get(target) {
        *address
    } else {
        let address = *next_variable;
        symbols.insert(target.to_string(), address);
        *next_variable += 1;
        address
    };
    Ok(format!("0{:015b}", address))
}

fn encode_c_instruction(code: &str, span: Span) -> Result<String, Diagnostic> {
    let (dest, rest) = match code.split_once('=') {
        Some((dest, rest)) => (dest, rest),
        None => ("", code),
    };
    let (comp, jump) = match rest.split_once(';') {
        Some((comp, jump)) => (comp, jump),
        None => (rest, ""),
    };

    let dest_bits = encode_dest(dest).ok_or_else(|| {
        Diagnostic::error(format!("unknown dest mnemonic '{}'", dest), span)
    })?;
    let comp_bits = encode_comp(comp).ok_or_else(|| {
        Diagnostic::error(format!("unknown comp mnemonic '{}'", comp), span)
    })?;
    let jump_bits = encode_jump(jump).ok_or_else(|| {
        Diagnostic::error(format!("unknown jump mnemonic '{}'", jump), span)
    })?;

    Ok(format!("111{}{}{}", comp_bits, dest_bits, jump_bits))
}

/// Each dest register contributes one bit: A is 4, D is 2, M is 1.
fn encode_dest(mnemonic: &str) -> Option<String> {
    let mut bits = 0u8;
    for c in mnemonic.chars() {
        let bit = match c {
            'A' => 0b100,
            'D' => 0b010,
            'M' => 0b001,
            _ => return None,
        };
        if bits & bit != 0 {
            return None;
        }
        bits |= bit;
    }
    Some(format!("{:03b}", bits))
}

/// The `a` bit selects A or M as the operand; the remaining six bits pick
/// the ALU function.
fn encode_comp(mnemonic: &str) -> Option<String> {
    let a = if mnemonic.contains('M') { '1' } else { '0' };
    let normalized = mnemonic.replace('M', "A");
    let bits = match normalized.as_str() {
        "0" => "101010",
        "1" => "111111",
        "-1" => "111010",
        "D" => "001100",
        "A" => "110000",
        "!D" => "001101",
        "!A" => "110001",
        "-D" => "001111",
        "-A" => "110011",
        "D+1" => "011111",
        "A+1" => "110111",
        "D-1" => "001110",
        "A-1" => "110010",
        "D+A" => "000010",
        "D-A" => "010011",
        "A-D" => "000111",
        "D&A" => "000000",
        "D|A" => "010101",
        _ => return None,
    };
    Some(format!("{}{}", a, bits))
}

fn encode_jump(mnemonic: &str) -> Option<String> {
    let bits = match mnemonic {
        "" => "000",
        "JGT" => "001",
        "JEQ" => "010",
        "JGE" => "011",
        "JLT" => "100",
        "JNE" => "101",
        "JLE" => "110",
        "JMP" => "111",
        _ => return None,
    };
    Some(bits.to_string())
}

fn predefined_symbols() -> HashMap<String, u16> {
    let mut symbols = HashMap::new();
    symbols.insert("SP".to_string(), 0);
    symbols.insert("LCL".to_string(), 1);
    symbols.insert("ARG".to_string(), 2);
    symbols.insert("THIS".to_string(), 3);
    symbols.insert("THAT".to_string(), 4);
    for i in 0..16u16 {
        symbols.insert(format!("R{}", i), i);
    }
    symbols.insert("SCREEN".to_string(), 0x4000);
    symbols.insert("KBD".to_string(), 0x6000);
    symbols
}
