//! Main memory.
//!
//! A flat store of 4096 sixteen-bit cells. Instructions and data share it.

use super::Word;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The number of memory cells (addresses 0x000-0xFFF).
pub const MEMORY_SIZE: usize = 0x1000;

/// Mask selecting the 12 address bits.
pub const ADDRESS_MASK: Word = 0x0FFF;

/// First address of the inspection window shown in status reports.
pub const INSPECT_START: Word = 0x940;

/// Last address (inclusive) of the inspection window.
pub const INSPECT_END: Word = 0x942;

/// Main memory: 4096 sixteen-bit cells.
#[derive(Clone, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<Word>,
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    /// Read a cell. Only the low 12 bits of `addr` are used.
    #[inline]
    pub fn read(&self, addr: Word) -> Word {
        self.cells[(addr & ADDRESS_MASK) as usize]
    }

    /// Write a cell. Only the low 12 bits of `addr` are used.
    #[inline]
    pub fn write(&mut self, addr: Word, value: Word) {
        self.cells[(addr & ADDRESS_MASK) as usize] = value;
    }

    /// Store a word on behalf of a program loader.
    ///
    /// Unlike [`Memory::write`], an address outside 0x000-0xFFF is rejected
    /// instead of being folded into range.
    pub fn store_word(&mut self, addr: Word, value: Word) -> Result<(), MemoryError> {
        if addr > ADDRESS_MASK {
            return Err(MemoryError::AddressOutOfRange(addr));
        }
        self.cells[addr as usize] = value;
        Ok(())
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Load a contiguous block of words starting at `start_addr`.
    pub fn load_program(&mut self, start_addr: Word, program: &[Word]) -> Result<(), MemoryError> {
        if start_addr > ADDRESS_MASK {
            return Err(MemoryError::AddressOutOfRange(start_addr));
        }
        let start = start_addr as usize;
        if start + program.len() > MEMORY_SIZE {
            return Err(MemoryError::ProgramTooLarge {
                size: program.len(),
                available: MEMORY_SIZE - start,
            });
        }

        self.cells[start..start + program.len()].copy_from_slice(program);
        Ok(())
    }

    /// Dump memory contents (for debugging).
    pub fn dump(&self, start: usize, count: usize) -> Vec<(Word, Word)> {
        let start = start.min(MEMORY_SIZE);
        let end = (start + count).min(MEMORY_SIZE);
        (start..end)
            .map(|i| (i as Word, self.cells[i]))
            .collect()
    }

    /// The cells shown in status reports (0x940-0x942).
    pub fn inspection_window(&self) -> Vec<(Word, Word)> {
        (INSPECT_START..=INSPECT_END)
            .map(|addr| (addr, self.read(addr)))
            .collect()
    }

    /// Render the inspection window, one `Memory 940 = 0000` line per cell.
    pub fn status_lines(&self) -> Vec<String> {
        self.inspection_window()
            .into_iter()
            .map(|(addr, value)| format_entry(addr, value))
            .collect()
    }
}

/// Format one inspected cell for a status report.
pub fn format_entry(addr: Word, value: Word) -> String {
    format!("Memory {:03X} = {:04X}", addr, value)
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only count non-zero cells
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Address is outside valid memory range.
    #[error("memory address {0:#05X} out of range (0x000 to 0xFFF)")]
    AddressOutOfRange(Word),
    /// Program is too large to fit in memory.
    #[error("program size {size} exceeds available space {available}")]
    ProgramTooLarge { size: usize, available: usize },
}
