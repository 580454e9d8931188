//! CPU emulation for the simple execution machine.
//!
//! This module implements the complete machine:
//! - 4096 sixteen-bit memory cells (addresses 0x000-0xFFF)
//! - A 1024-slot execution stack for subroutine calls
//! - 4 registers: accumulator, instruction register, program counter, general register
//! - 13-instruction set with a 4-bit opcode and a 12-bit address/operand

pub mod memory;
pub mod stack;
pub mod registers;
pub mod decode;
pub mod report;
pub mod execute;

/// A machine word: memory cells, registers and instructions are all 16 bits wide.
pub type Word = u16;

pub use memory::{Memory, MemoryError};
pub use stack::{ExecutionStack, StackError};
pub use registers::Registers;
pub use decode::{Instruction, Opcode, DecodeError};
pub use report::{StatusReport, ReportKind, ReportSink, NullSink, WriterSink, ReportFormat};
pub use execute::{Cpu, CpuError, CpuState};
