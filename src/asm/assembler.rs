//! Simple two-pass assembler.
//!
//! Syntax:
//! ```text
//! ; Comment
//!         ORG 0x100       ; Set origin address
//! START:  LDI 3           ; GR := 3
//!         JSR ADD_GR      ; Call a subroutine
//!         HALT
//!
//!         ORG 0x200
//! ADD_GR: ADD_AC_REG      ; Full mnemonics work too
//!         RET
//!
//! COUNT:  DAT 0x0042      ; Define a data word
//! ```
//!
//! The first word emitted is the program's entry point, so code should
//! come before data.

use crate::cpu::{Word, Opcode};
use crate::cpu::decode::{Instruction, encode};
use crate::cpu::memory::ADDRESS_MASK;
use crate::asm::image::ProgramImage;
use std::collections::HashMap;
use thiserror::Error;

/// Assemble source code to a program image.
pub fn assemble(source: &str) -> Result<ProgramImage, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// Look up an opcode by mnemonic (case-insensitive).
pub fn lookup_mnemonic(mnemonic: &str) -> Option<Opcode> {
    let op = match mnemonic.to_uppercase().as_str() {
        "LOAD_AC_MEM" | "LDA" => Opcode::LoadAcMem,
        "STORE_AC_MEM" | "STA" => Opcode::StoreAcMem,
        "LOAD_AC_REG" | "LAR" => Opcode::LoadAcReg,
        "STORE_AC_REG" | "SAR" => Opcode::StoreAcReg,
        "ADD_AC_MEM" | "ADM" => Opcode::AddAcMem,
        "LOAD_REG_OPERAND" | "LDI" => Opcode::LoadRegOperand,
        "ADD_AC_REG" | "ADR" => Opcode::AddAcReg,
        "MULT_AC_REG" | "MUL" => Opcode::MultAcReg,
        "SUBT_AC_REG" | "SUB" => Opcode::SubtAcReg,
        "DIV_AC_REG" | "DIV" => Opcode::DivAcReg,
        "JUMP_TO_SUBROUT" | "JSR" => Opcode::JumpToSubrout,
        "RET_FRM_SUBROUT" | "RET" => Opcode::RetFrmSubrout,
        "HALT" | "HLT" => Opcode::Halt,
        _ => return None,
    };
    Some(op)
}

/// A label use waiting for pass 2.
struct Pending {
    /// Index into the output entries.
    index: usize,
    label: String,
    line: usize,
    /// Whether the label fills the 12-bit field or the whole word.
    full_word: bool,
}

/// The assembler state.
struct Assembler {
    /// Address of the next word.
    current_addr: u32,
    /// Symbol table (label -> address).
    symbols: HashMap<String, Word>,
    /// Forward and backward label references.
    pending: Vec<Pending>,
    output: ProgramImage,
}

impl Assembler {
    fn new() -> Self {
        Self {
            current_addr: 0,
            symbols: HashMap::new(),
            pending: Vec::new(),
            output: ProgramImage::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<ProgramImage, AssemblerError> {
        // Pass 1: Collect labels and generate code
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Pass 2: Resolve label references
        self.resolve_references()?;

        Ok(std::mem::take(&mut self.output))
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove comments
        let line = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        }
        .trim();

        if line.is_empty() {
            return Ok(());
        }

        // Check for label definition
        if let Some(colon_idx) = line.find(':') {
            let label = line[..colon_idx].trim().to_uppercase();
            if label.is_empty() || label.contains(char::is_whitespace) {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("invalid label {:?}", label),
                });
            }
            let addr = self.address_here(line_num)?;
            if self.symbols.insert(label.clone(), addr).is_some() {
                return Err(AssemblerError::DuplicateLabel { line: line_num, label });
            }

            // Process rest of line if any
            let rest = line[colon_idx + 1..].trim();
            if !rest.is_empty() {
                return self.process_instruction(rest, line_num);
            }
            return Ok(());
        }

        self.process_instruction(line, line_num)
    }

    fn process_instruction(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let mnemonic = parts[0].to_uppercase();
        let operand = parts.get(1).copied();
        if parts.len() > 2 {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!("unexpected {:?} after operand", parts[2]),
            });
        }

        match mnemonic.as_str() {
            // Directives
            "ORG" => {
                let op = operand.ok_or_else(|| AssemblerError::SyntaxError {
                    line: line_num,
                    message: "ORG requires address".into(),
                })?;
                let addr = parse_number(op, line_num)?.ok_or_else(|| AssemblerError::SyntaxError {
                    line: line_num,
                    message: "ORG requires a numeric address".into(),
                })?;
                if !(0..=ADDRESS_MASK as i64).contains(&addr) {
                    return Err(AssemblerError::ValueOutOfRange { line: line_num, value: addr });
                }
                self.current_addr = addr as u32;
            }

            "DAT" | "DATA" => {
                let op = operand.ok_or_else(|| AssemblerError::SyntaxError {
                    line: line_num,
                    message: "DAT requires value".into(),
                })?;
                match parse_number(op, line_num)? {
                    Some(value) => {
                        if !(i16::MIN as i64..=Word::MAX as i64).contains(&value) {
                            return Err(AssemblerError::ValueOutOfRange { line: line_num, value });
                        }
                        self.emit(value as Word, line_num)?;
                    }
                    None => {
                        self.defer(op, line_num, true);
                        self.emit(0, line_num)?;
                    }
                }
            }

            // Instructions
            _ => {
                let opcode = lookup_mnemonic(&mnemonic).ok_or_else(|| AssemblerError::UnknownMnemonic {
                    line: line_num,
                    mnemonic: mnemonic.clone(),
                })?;
                let address = match operand {
                    Some(op) => match parse_number(op, line_num)? {
                        Some(value) if (0..=ADDRESS_MASK as i64).contains(&value) => value as Word,
                        Some(value) => {
                            return Err(AssemblerError::ValueOutOfRange { line: line_num, value });
                        }
                        None => {
                            self.defer(op, line_num, false);
                            0
                        }
                    },
                    None if opcode.uses_address() => {
                        return Err(AssemblerError::SyntaxError {
                            line: line_num,
                            message: format!("{} requires an operand", opcode),
                        });
                    }
                    None => 0,
                };
                self.emit(encode(&Instruction::new(opcode, address)), line_num)?;
            }
        }

        Ok(())
    }

    fn address_here(&self, line_num: usize) -> Result<Word, AssemblerError> {
        if self.current_addr > ADDRESS_MASK as u32 {
            return Err(AssemblerError::AddressSpaceExhausted { line: line_num });
        }
        Ok(self.current_addr as Word)
    }

    fn defer(&mut self, label: &str, line_num: usize, full_word: bool) {
        self.pending.push(Pending {
            index: self.output.len(),
            label: label.to_uppercase(),
            line: line_num,
            full_word,
        });
    }

    fn emit(&mut self, word: Word, line_num: usize) -> Result<(), AssemblerError> {
        let addr = self.address_here(line_num)?;
        self.output.push(addr, word);
        self.current_addr += 1;
        Ok(())
    }

    fn resolve_references(&mut self) -> Result<(), AssemblerError> {
        for pending in &self.pending {
            let addr = *self.symbols.get(&pending.label).ok_or_else(|| AssemblerError::UndefinedLabel {
                line: pending.line,
                label: pending.label.clone(),
            })?;

            let entry = &mut self.output.entries[pending.index].1;
            *entry = if pending.full_word {
                addr
            } else {
                (*entry & !ADDRESS_MASK) | addr
            };
        }
        Ok(())
    }
}

/// Parse a decimal or `0x` hex literal. Returns `None` for anything that
/// looks like a label.
fn parse_number(operand: &str, line_num: usize) -> Result<Option<i64>, AssemblerError> {
    let operand = operand.trim();

    // Check for hex literal
    if let Some(hex) = operand.strip_prefix("0x").or_else(|| operand.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16)
            .map(Some)
            .map_err(|_| AssemblerError::SyntaxError {
                line: line_num,
                message: "invalid hex literal".into(),
            });
    }

    // Check for decimal number
    if operand.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
        return operand
            .parse::<i64>()
            .map(Some)
            .map_err(|_| AssemblerError::SyntaxError {
                line: line_num,
                message: format!("invalid number {:?}", operand),
            });
    }

    Ok(None)
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("duplicate label on line {line}: {label}")]
    DuplicateLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: i64 },

    #[error("line {line} runs past the end of memory")]
    AddressSpaceExhausted { line: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_simple() {
        let source = r#"
            ; Simple test program
            ORG 0x100
            LDI 5
            LAR
            ADR
            HALT
        "#;

        let image = assemble(source).unwrap();
        assert_eq!(
            image.entries,
            vec![(0x100, 0x6005), (0x101, 0x3000), (0x102, 0x7000), (0x103, 0xF000)]
        );
    }

    #[test]
    fn test_full_mnemonics() {
        let image = assemble("load_ac_mem 0x940\nSTORE_AC_MEM 2370\nHLT").unwrap();
        assert_eq!(image.entries, vec![(0, 0x1940), (1, 0x2942), (2, 0xF000)]);
    }

    #[test]
    fn test_assemble_with_labels() {
        let source = r#"
                ORG 0x100
        START:  JSR SUBR
                HALT
                ORG 0x200
        SUBR:   RET
        "#;

        let image = assemble(source).unwrap();
        assert_eq!(image.entry_point(), Some(0x100));
        assert_eq!(image.entries[0], (0x100, 0xB200));
        assert_eq!(image.entries[2], (0x200, 0xC000));
    }

    #[test]
    fn test_assemble_data() {
        let source = r#"
            ORG 0x940
        A:  DAT 42
            DAT -1
            DAT A
        "#;

        let image = assemble(source).unwrap();
        assert_eq!(image.entries, vec![(0x940, 42), (0x941, 0xFFFF), (0x942, 0x940)]);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            assemble("FOO 1"),
            Err(AssemblerError::UnknownMnemonic { line: 1, .. })
        ));
        assert!(matches!(
            assemble("\nJSR NOWHERE"),
            Err(AssemblerError::UndefinedLabel { line: 2, .. })
        ));
        assert!(matches!(
            assemble("LDI 0x1000"),
            Err(AssemblerError::ValueOutOfRange { line: 1, value: 0x1000 })
        ));
        assert!(matches!(
            assemble("X: HALT\nX: HALT"),
            Err(AssemblerError::DuplicateLabel { line: 2, .. })
        ));
        assert!(matches!(
            assemble("LDA"),
            Err(AssemblerError::SyntaxError { line: 1, .. })
        ));
        assert!(matches!(
            assemble("ORG 0xFFF\nHALT\nHALT"),
            Err(AssemblerError::AddressSpaceExhausted { line: 3 })
        ));
    }
}
