//! Execution stack.
//!
//! A bounded last-in-first-out store that preserves the register file
//! across subroutine calls. Slots are addressed 0x000-0x3FF; the first
//! value pushed lands at 0x3FF and the stack grows downward.

use super::Word;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Number of slots in the execution stack.
pub const STACK_CAPACITY: usize = 0x400;

/// Number of words saved per subroutine call.
pub const FRAME_SIZE: usize = 4;

/// The execution stack.
#[derive(Clone, Serialize, Deserialize)]
pub struct ExecutionStack {
    slots: Vec<Word>,
    /// Index of the most recently pushed slot; `STACK_CAPACITY` when empty.
    top: usize,
}

impl ExecutionStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self {
            slots: vec![0; STACK_CAPACITY],
            top: STACK_CAPACITY,
        }
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        STACK_CAPACITY - self.top
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.top == STACK_CAPACITY
    }

    /// Number of free slots.
    pub fn remaining(&self) -> usize {
        self.top
    }

    /// Push a value.
    pub fn push(&mut self, value: Word) -> Result<(), StackError> {
        if self.top == 0 {
            return Err(StackError::Overflow);
        }
        self.top -= 1;
        self.slots[self.top] = value;
        Ok(())
    }

    /// Pop the most recently pushed value.
    pub fn pop(&mut self) -> Result<Word, StackError> {
        if self.is_empty() {
            return Err(StackError::Underflow);
        }
        let value = self.slots[self.top];
        self.top += 1;
        Ok(value)
    }

    /// Push a whole frame, or nothing if it does not fit.
    pub fn push_frame(&mut self, frame: &[Word; FRAME_SIZE]) -> Result<(), StackError> {
        if self.remaining() < FRAME_SIZE {
            return Err(StackError::Overflow);
        }
        for &value in frame {
            self.push(value)?;
        }
        Ok(())
    }

    /// Pop a whole frame, returned in the order it was pushed.
    ///
    /// Leaves the stack untouched if fewer than four values are present.
    pub fn pop_frame(&mut self) -> Result<[Word; FRAME_SIZE], StackError> {
        if self.len() < FRAME_SIZE {
            return Err(StackError::Underflow);
        }
        let mut frame = [0; FRAME_SIZE];
        for slot in frame.iter_mut().rev() {
            *slot = self.pop()?;
        }
        Ok(frame)
    }

    /// Occupied slots as `(slot address, value)`, starting at 0x3FF.
    pub fn entries(&self) -> Vec<(Word, Word)> {
        (self.top..STACK_CAPACITY)
            .rev()
            .map(|i| (i as Word, self.slots[i]))
            .collect()
    }

    /// Empty the stack.
    pub fn clear(&mut self) {
        self.slots.fill(0);
        self.top = STACK_CAPACITY;
    }

    /// Render the occupied slots, one `Stack contents at 3FF = 0100` line each.
    pub fn status_lines(&self) -> Vec<String> {
        entry_lines(&self.entries())
    }
}

/// Line shown in place of the listing when no slot is occupied.
pub const EMPTY_STACK_LINE: &str = "Nothing in the stack!";

/// Format one occupied slot for a status report.
pub fn format_entry(slot: Word, value: Word) -> String {
    format!("Stack contents at {:03X} = {:04X}", slot, value)
}

/// Render a stack listing as produced by [`ExecutionStack::entries`].
pub fn entry_lines(entries: &[(Word, Word)]) -> Vec<String> {
    if entries.is_empty() {
        return vec![EMPTY_STACK_LINE.to_string()];
    }
    entries
        .iter()
        .map(|&(slot, value)| format_entry(slot, value))
        .collect()
}

impl Default for ExecutionStack {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExecutionStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionStack")
            .field("len", &self.len())
            .field("entries", &self.entries())
            .finish()
    }
}

/// Errors raised by the execution stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StackError {
    #[error("stack overflow")]
    Overflow,

    #[error("stack underflow")]
    Underflow,
}
