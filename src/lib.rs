//! # Simple Exec
//!
//! An emulator of a small 16-bit accumulator machine.
//!
//! Each instruction is a single word holding a 4-bit opcode and a 12-bit
//! address or operand. The CPU runs a plain fetch-decode-execute loop over
//! 4096 words of memory, saves its registers on a dedicated execution
//! stack across subroutine calls, and reports its state when a subroutine
//! returns and when it halts.

pub mod cpu;
pub mod asm;
pub mod config;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{Cpu, CpuState, CpuError, Memory, ExecutionStack, Registers, Instruction, Opcode, Word};
pub use cpu::{StatusReport, ReportKind, ReportSink, ReportFormat, WriterSink, NullSink};
pub use asm::{assemble, disassemble, AssemblerError, ProgramImage, ImageError, load_image, save_image};
pub use config::{RunConfig, ConfigError};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
