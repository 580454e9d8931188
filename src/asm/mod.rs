//! Program images, assembler and disassembler.
//!
//! This module provides:
//! - The text program image format read by the loader
//! - A simple two-pass assembler (mnemonics → program image)
//! - A disassembler (program image → readable text)

pub mod assembler;
pub mod disasm;
pub mod image;

pub use assembler::{assemble, AssemblerError};
pub use disasm::disassemble;
pub use image::{ProgramImage, ImageError, parse_image, load_image, save_image};
