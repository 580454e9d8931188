//! Program image file format.
//!
//! A program image is plain text, one memory word per line:
//!
//! ```text
//! // Adds 5 to itself
//! 1. 100 6005;  LOAD_REG_OPERAND 0x005
//! 2. 101 3000;  LOAD_AC_REG
//! 3. 102 7000;  ADD_AC_REG
//! 4. 103 F000;  HALT
//! ```
//!
//! - Whitespace anywhere in a line is ignored
//! - Lines that do not start with a decimal digit are comments
//! - Between `.` and `;` sit 3 hex digits of address, then the hex word
//! - Anything after `;` is a comment
//!
//! The first word in the file is where execution starts.

use crate::cpu::{Cpu, Word, MemoryError};
use crate::cpu::memory::ADDRESS_MASK;
use crate::asm::disasm::disassemble_instruction;
use std::path::Path;
use std::io::Write;
use thiserror::Error;

/// A loaded program image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramImage {
    /// `(address, word)` pairs in file order.
    pub entries: Vec<(Word, Word)>,
}

impl ProgramImage {
    /// Create a new empty image.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a word.
    pub fn push(&mut self, addr: Word, word: Word) {
        self.entries.push((addr, word));
    }

    /// Address of the first word, where execution starts.
    pub fn entry_point(&self) -> Option<Word> {
        self.entries.first().map(|&(addr, _)| addr)
    }

    /// Get the number of words.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write every word into the CPU's memory and set the program counter
    /// to the entry point.
    pub fn load_into(&self, cpu: &mut Cpu) -> Result<(), ImageError> {
        let entry = self.entry_point().ok_or(ImageError::Empty)?;
        for &(addr, word) in &self.entries {
            cpu.load_word(addr, word)?;
        }
        cpu.set_program_counter(entry)?;
        log::debug!("loaded {} words, entry point {:03X}", self.len(), entry);
        Ok(())
    }
}

/// Parse a program image from text.
pub fn parse_image(source: &str) -> Result<ProgramImage, ImageError> {
    let mut image = ProgramImage::new();

    for (line_num, line) in source.lines().enumerate() {
        let line_num = line_num + 1;
        let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();

        // Skip empty lines and comments
        match compact.chars().next() {
            Some(c) if c.is_ascii_digit() => {}
            _ => continue,
        }

        let start = compact.find('.').ok_or_else(|| ImageError::ParseError {
            line: line_num,
            message: "expected '.' after line number".into(),
        })? + 1;
        let end = compact.find(';').ok_or_else(|| ImageError::ParseError {
            line: line_num,
            message: "missing ';' terminator".into(),
        })?;
        if end < start {
            return Err(ImageError::ParseError {
                line: line_num,
                message: "';' before '.'".into(),
            });
        }

        let payload = &compact[start..end];
        if payload.len() < 4 || !payload.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ImageError::ParseError {
                line: line_num,
                message: format!("expected address and word, found {:?}", payload),
            });
        }

        let (addr_str, word_str) = payload.split_at(3);
        let addr = Word::from_str_radix(addr_str, 16).map_err(|_| ImageError::ParseError {
            line: line_num,
            message: format!("invalid hex address {:?}", addr_str),
        })?;
        let word = u32::from_str_radix(word_str, 16).map_err(|_| ImageError::ParseError {
            line: line_num,
            message: format!("invalid hex word {:?}", word_str),
        })?;
        let word = Word::try_from(word).map_err(|_| ImageError::WordTooWide {
            line: line_num,
            value: word,
        })?;

        image.push(addr & ADDRESS_MASK, word);
    }

    Ok(image)
}

/// Load a program image from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<ProgramImage, ImageError> {
    let source = std::fs::read_to_string(path.as_ref())
        .map_err(|e| ImageError::IoError(e.to_string()))?;
    parse_image(&source)
}

/// Render a program image as text.
pub fn format_image(image: &ProgramImage) -> String {
    let mut out = String::new();
    out.push_str("// simple-exec program image\n");
    out.push_str(&format!("// {} words\n\n", image.len()));

    for (i, &(addr, word)) in image.entries.iter().enumerate() {
        out.push_str(&format!(
            "{}. {:03X} {:04X};  {}\n",
            i + 1,
            addr,
            word,
            disassemble_instruction(word)
        ));
    }

    out
}

/// Save a program image to disk.
pub fn save_image<P: AsRef<Path>>(path: P, image: &ProgramImage) -> Result<(), ImageError> {
    let mut file = std::fs::File::create(path.as_ref())
        .map_err(|e| ImageError::IoError(e.to_string()))?;

    file.write_all(format_image(image).as_bytes())
        .map_err(|e| ImageError::IoError(e.to_string()))?;

    Ok(())
}

/// Errors that can occur while reading or loading an image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("word {value:#X} on line {line} does not fit in 16 bits")]
    WordTooWide { line: usize, value: u32 },

    #[error("program image contains no instructions")]
    Empty,

    #[error("load error: {0}")]
    Memory(#[from] MemoryError),
}
