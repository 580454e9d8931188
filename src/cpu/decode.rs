//! Instruction decoder.
//!
//! Every instruction is one 16-bit word: the top 4 bits select the
//! opcode and the low 12 bits carry an address or immediate operand.
//!
//! ```text
//!  15    12 11                      0
//! +--------+-------------------------+
//! | opcode |     address/operand     |
//! +--------+-------------------------+
//! ```

use super::Word;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Extract the 4-bit opcode field.
#[inline]
pub fn decode_opcode(word: Word) -> u8 {
    ((word >> 12) & 0xF) as u8
}

/// Extract the 12-bit address/operand field.
#[inline]
pub fn decode_address(word: Word) -> Word {
    word & 0x0FFF
}

/// The instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    // ==================== Data Transfer ====================

    /// Load accumulator from memory: AC := [addr]
    LoadAcMem = 0b0001,

    /// Store accumulator to memory: [addr] := AC
    StoreAcMem = 0b0010,

    /// Load accumulator from the general register: AC := GR
    LoadAcReg = 0b0011,

    /// Store accumulator to the general register: GR := AC
    StoreAcReg = 0b0100,

    /// Load the general register with the operand field: GR := operand
    LoadRegOperand = 0b0110,

    // ==================== Arithmetic ====================

    /// Add memory to accumulator: AC := AC + [addr]
    AddAcMem = 0b0101,

    /// Add general register to accumulator: AC := AC + GR
    AddAcReg = 0b0111,

    /// Multiply: AC := AC * GR
    MultAcReg = 0b1000,

    /// Subtract: AC := AC - GR
    SubtAcReg = 0b1001,

    /// Divide: AC := AC / GR
    DivAcReg = 0b1010,

    // ==================== Control Flow ====================

    /// Save the register file on the execution stack and jump to addr
    JumpToSubrout = 0b1011,

    /// Restore the register file from the execution stack
    RetFrmSubrout = 0b1100,

    /// Halt execution
    Halt = 0b1111,
}

impl Opcode {
    /// Every opcode, in encoding order.
    pub const ALL: [Opcode; 13] = [
        Opcode::LoadAcMem,
        Opcode::StoreAcMem,
        Opcode::LoadAcReg,
        Opcode::StoreAcReg,
        Opcode::AddAcMem,
        Opcode::LoadRegOperand,
        Opcode::AddAcReg,
        Opcode::MultAcReg,
        Opcode::SubtAcReg,
        Opcode::DivAcReg,
        Opcode::JumpToSubrout,
        Opcode::RetFrmSubrout,
        Opcode::Halt,
    ];

    /// Look up an opcode by its 4-bit encoding.
    pub fn from_bits(bits: u8) -> Option<Self> {
        let op = match bits {
            0b0001 => Opcode::LoadAcMem,
            0b0010 => Opcode::StoreAcMem,
            0b0011 => Opcode::LoadAcReg,
            0b0100 => Opcode::StoreAcReg,
            0b0101 => Opcode::AddAcMem,
            0b0110 => Opcode::LoadRegOperand,
            0b0111 => Opcode::AddAcReg,
            0b1000 => Opcode::MultAcReg,
            0b1001 => Opcode::SubtAcReg,
            0b1010 => Opcode::DivAcReg,
            0b1011 => Opcode::JumpToSubrout,
            0b1100 => Opcode::RetFrmSubrout,
            0b1111 => Opcode::Halt,
            _ => return None,
        };
        Some(op)
    }

    /// The 4-bit encoding.
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Canonical mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::LoadAcMem => "LOAD_AC_MEM",
            Opcode::StoreAcMem => "STORE_AC_MEM",
            Opcode::LoadAcReg => "LOAD_AC_REG",
            Opcode::StoreAcReg => "STORE_AC_REG",
            Opcode::AddAcMem => "ADD_AC_MEM",
            Opcode::LoadRegOperand => "LOAD_REG_OPERAND",
            Opcode::AddAcReg => "ADD_AC_REG",
            Opcode::MultAcReg => "MULT_AC_REG",
            Opcode::SubtAcReg => "SUBT_AC_REG",
            Opcode::DivAcReg => "DIV_AC_REG",
            Opcode::JumpToSubrout => "JUMP_TO_SUBROUT",
            Opcode::RetFrmSubrout => "RET_FRM_SUBROUT",
            Opcode::Halt => "HALT",
        }
    }

    /// Whether the low 12 bits mean anything to this opcode.
    pub fn uses_address(self) -> bool {
        matches!(
            self,
            Opcode::LoadAcMem
                | Opcode::StoreAcMem
                | Opcode::AddAcMem
                | Opcode::LoadRegOperand
                | Opcode::JumpToSubrout
        )
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    /// Address or immediate operand (12 bits).
    pub address: Word,
}

impl Instruction {
    /// Build an instruction; the address is truncated to 12 bits.
    pub fn new(opcode: Opcode, address: Word) -> Self {
        Self {
            opcode,
            address: decode_address(address),
        }
    }
}

/// Decode a raw instruction word.
pub fn decode(word: Word) -> Result<Instruction, DecodeError> {
    let bits = decode_opcode(word);
    let opcode = Opcode::from_bits(bits).ok_or(DecodeError::UnrecognizedOpcode(bits))?;
    Ok(Instruction {
        opcode,
        address: decode_address(word),
    })
}

/// Encode an instruction back to a raw word.
pub fn encode(instr: &Instruction) -> Word {
    ((instr.opcode.bits() as Word) << 12) | decode_address(instr.address)
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unrecognized opcode: {0:#06b}")]
    UnrecognizedOpcode(u8),
}
