//! CPU registers.
//!
//! The machine has 4 sixteen-bit registers:
//! - Accumulator: primary arithmetic operand and result
//! - Instruction register: the most recently fetched instruction
//! - Program counter: address of the next instruction (12 bits used)
//! - General register: second operand and accumulator relay

use super::Word;
use super::memory::ADDRESS_MASK;
use super::stack::FRAME_SIZE;
use serde::{Serialize, Deserialize};

/// The register file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// Primary arithmetic operand/result.
    pub accumulator: Word,

    /// Holds the most recently fetched raw instruction.
    pub instruction_register: Word,

    /// Address of the next instruction to fetch.
    pub program_counter: Word,

    /// Secondary operand for arithmetic and register transfers.
    pub general_register: Word,
}

impl Registers {
    /// Create a new register file with all values zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Increment the program counter by 1, wrapping within the address space.
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> Word {
        let old = self.program_counter;
        self.program_counter = old.wrapping_add(1) & ADDRESS_MASK;
        old
    }

    /// Set the program counter to an absolute address.
    pub fn jump(&mut self, addr: Word) {
        self.program_counter = addr & ADDRESS_MASK;
    }

    /// The registers in the order they are saved on a subroutine call.
    pub fn frame(&self) -> [Word; FRAME_SIZE] {
        [
            self.program_counter,
            self.instruction_register,
            self.accumulator,
            self.general_register,
        ]
    }

    /// Restore the registers from a frame produced by [`Registers::frame`].
    pub fn restore_frame(&mut self, frame: [Word; FRAME_SIZE]) {
        let [pc, ir, ac, gr] = frame;
        self.program_counter = pc;
        self.instruction_register = ir;
        self.accumulator = ac;
        self.general_register = gr;
    }

    /// Render the registers, one `NAME = HEX` line each.
    pub fn status_lines(&self) -> Vec<String> {
        vec![
            format!("Accumulator = {:04X}", self.accumulator),
            format!("Instruction Register = {:04X}", self.instruction_register),
            format!("Program Counter = {:04X}", self.program_counter),
            format!("General Register = {:04X}", self.general_register),
        ]
    }
}
