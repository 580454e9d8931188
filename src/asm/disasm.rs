//! Disassembler.
//!
//! Converts instruction words back to readable assembly.

use crate::cpu::Word;
use crate::cpu::decode::{decode, Instruction};
use crate::asm::image::ProgramImage;

/// Disassemble a single instruction to text.
pub fn disassemble_instruction(word: Word) -> String {
    match decode(word) {
        Ok(decoded) => format_instruction(&decoded),
        Err(_) => format!("??? {:#06X}", word),
    }
}

/// Disassemble every word of a program image.
pub fn disassemble(image: &ProgramImage) -> String {
    let mut output = String::new();
    output.push_str("; Disassembly\n");
    output.push_str("; -----------\n\n");

    for &(addr, word) in &image.entries {
        let line = disassemble_instruction(word);
        let marker = if Some(addr) == image.entry_point() { ">" } else { " " };
        output.push_str(&format!("{}{:03X}: {:04X}  {}\n", marker, addr, word, line));
    }

    output
}

/// Format a decoded instruction as assembly text.
fn format_instruction(instr: &Instruction) -> String {
    if instr.opcode.uses_address() {
        format!("{} {:#05X}", instr.opcode.mnemonic(), instr.address)
    } else {
        instr.opcode.mnemonic().to_string()
    }
}
