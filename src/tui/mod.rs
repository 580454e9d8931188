//! TUI debugger.
//!
//! Provides an interactive terminal-based debugger with:
//! - Live register, stack and memory views
//! - Step/run/breakpoint controls
//! - Disassembly around the program counter

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
