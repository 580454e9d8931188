//! Debugger application state and logic.

use crate::{Cpu, ProgramImage, StatusReport, Word};
use crate::asm::disasm::disassemble_instruction;
use crate::cpu::memory::{ADDRESS_MASK, MEMORY_SIZE};
use std::collections::HashSet;

/// Debugger application state.
pub struct DebuggerApp {
    /// The CPU being debugged.
    pub cpu: Cpu,
    /// Original program for reference.
    pub program: ProgramImage,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<Word>,
    /// Reports emitted so far, newest last.
    pub reports: Vec<StatusReport>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset.
    pub mem_scroll: usize,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program.
    pub fn new(program: ProgramImage) -> Self {
        let mut cpu = Cpu::new();
        let status = match program.load_into(&mut cpu) {
            Ok(()) => "Ready. Press 's' to step, 'r' to run, 'q' to quit.".to_string(),
            Err(e) => format!("Load error: {}", e),
        };
        let mem_scroll = cpu.regs.program_counter as usize;

        Self {
            cpu,
            program,
            breakpoints: HashSet::new(),
            reports: Vec::new(),
            running: false,
            should_quit: false,
            status,
            mem_scroll,
        }
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        if !self.cpu.is_running() {
            self.status = format!("CPU stopped: {:?}", self.cpu.state);
            self.running = false;
            return;
        }

        let pc = self.cpu.regs.program_counter;
        match self.cpu.step(&mut self.reports) {
            Ok(instr) => {
                let disasm = disassemble_instruction(crate::cpu::decode::encode(&instr));
                self.status = format!("PC={:03X}: {}", pc, disasm);
            }
            Err(e) => {
                let report = self.cpu.fault_report(&e);
                self.reports.push(report);
                self.status = format!("Fault at PC={:03X}: {}", pc, e);
                self.running = false;
            }
        }
    }

    /// Run until halt, breakpoint, or error.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        if !self.cpu.is_running() {
            self.running = false;
            self.status = format!("Stopped after {} instructions", self.cpu.cycles);
            return;
        }

        // Check for breakpoint
        let pc = self.cpu.regs.program_counter;
        if self.breakpoints.contains(&pc) {
            self.running = false;
            self.status = format!("Breakpoint at PC={:03X}", pc);
            return;
        }

        self.step();
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.cpu.regs.program_counter;
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={:03X}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={:03X}", pc);
        }
    }

    /// Reset CPU to initial state.
    pub fn reset(&mut self) {
        self.cpu = Cpu::new();
        self.reports.clear();
        self.running = false;
        self.status = match self.program.load_into(&mut self.cpu) {
            Ok(()) => "Reset. Ready.".into(),
            Err(e) => format!("Load error: {}", e),
        };
    }

    /// Scroll the memory view, clamped to the address space.
    pub fn scroll_memory(&mut self, delta: isize) {
        self.mem_scroll = self
            .mem_scroll
            .saturating_add_signed(delta)
            .min(MEMORY_SIZE - 1);
    }

    /// Get disassembly around current PC.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(Word, String, bool)> {
        let pc = self.cpu.regs.program_counter;
        let start = (pc as usize).saturating_sub(lines / 2);

        (start..(start + lines).min(MEMORY_SIZE))
            .map(|idx| {
                let addr = idx as Word & ADDRESS_MASK;
                let word = self.cpu.mem.read(addr);
                (addr, disassemble_instruction(word), addr == pc)
            })
            .collect()
    }
}

/// Run the debugger with a program.
pub fn run_debugger(program: ProgramImage) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(program);

    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => app.scroll_memory(-1),
                        KeyCode::Down => app.scroll_memory(1),
                        KeyCode::PageUp => app.scroll_memory(-16),
                        KeyCode::PageDown => app.scroll_memory(16),
                        _ => {}
                    }
                }
            }
        }

        // Tick for continuous running
        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assemble;

    fn app() -> DebuggerApp {
        let image = assemble("ORG 0x100\nLDI 5\nLAR\nADR\nHALT").unwrap();
        DebuggerApp::new(image)
    }

    #[test]
    fn test_step_and_halt() {
        let mut app = app();
        for _ in 0..4 {
            app.step();
        }
        assert!(app.cpu.is_halted());
        assert_eq!(app.cpu.regs.accumulator, 10);
        assert_eq!(app.reports.len(), 1);
    }

    #[test]
    fn test_breakpoint_stops_run() {
        let mut app = app();
        app.step();
        app.toggle_breakpoint();
        assert!(app.breakpoints.contains(&0x101));

        app.reset();
        app.run();
        for _ in 0..10 {
            app.tick();
        }
        assert!(!app.running);
        assert_eq!(app.cpu.regs.program_counter, 0x101);
    }

    #[test]
    fn test_reset_reports_load_error() {
        let mut empty = DebuggerApp::new(ProgramImage::new());
        assert!(empty.status.starts_with("Load error"));

        empty.status.clear();
        empty.reset();
        assert!(empty.status.starts_with("Load error"));

        let mut app = app();
        app.step();
        app.reset();
        assert_eq!(app.status, "Reset. Ready.");
        assert_eq!(app.cpu.regs.program_counter, 0x100);
    }

    #[test]
    fn test_disassembly_marks_pc() {
        let app = app();
        let lines = app.get_disassembly(6);
        let current: Vec<_> = lines.iter().filter(|(_, _, is_pc)| *is_pc).collect();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].0, 0x100);
        assert_eq!(current[0].1, "LOAD_REG_OPERAND 0x005");
    }
}
