//! Status reports.
//!
//! The CPU snapshots its registers, execution stack and memory inspection
//! window whenever it returns from a subroutine or halts. Reports are
//! handed to a [`ReportSink`]; the CPU never decides where they end up.

use super::{memory, stack, Word, Registers};
use serde::{Serialize, Deserialize};
use std::io::Write;

/// Why a report was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportKind {
    /// Taken just before a RET_FRM_SUBROUT restores the registers.
    Return {
        /// Subroutine calls made so far.
        call: u64,
    },
    /// Taken when HALT executes.
    Halt,
    /// Taken by the top-level handler after a fatal error.
    Fault {
        error: String,
    },
}

/// A point-in-time view of the machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub kind: ReportKind,
    /// Instructions completed before this report was taken.
    pub instructions_executed: u64,
    pub registers: Registers,
    /// Occupied stack slots as `(slot, value)`, starting at 0x3FF.
    pub stack: Vec<(Word, Word)>,
    /// The memory inspection window as `(address, value)`.
    pub memory: Vec<(Word, Word)>,
}

impl StatusReport {
    /// Render the report as text lines.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        lines.push(match &self.kind {
            ReportKind::Return { call } => format!("--- Return from subroutine {} ---", call),
            ReportKind::Halt => "--- Halt ---".to_string(),
            ReportKind::Fault { error } => format!("--- Fault: {} ---", error),
        });

        lines.extend(self.registers.status_lines());

        lines.extend(stack::entry_lines(&self.stack));
        lines.extend(
            self.memory
                .iter()
                .map(|&(addr, value)| memory::format_entry(addr, value)),
        );

        lines.push(format!("Instructions executed = {}", self.instructions_executed));
        lines
    }
}

impl std::fmt::Display for StatusReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in self.lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Destination for status reports.
pub trait ReportSink {
    fn emit(&mut self, report: StatusReport);
}

impl ReportSink for Vec<StatusReport> {
    fn emit(&mut self, report: StatusReport) {
        self.push(report);
    }
}

/// Discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ReportSink for NullSink {
    fn emit(&mut self, _report: StatusReport) {}
}

/// Output format for [`WriterSink`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Writes reports to any [`Write`] implementation.
///
/// Write failures are remembered rather than raised, since a sink cannot
/// stop the machine; check [`WriterSink::finish`] once the run is over.
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: W,
    format: ReportFormat,
    error: Option<std::io::Error>,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W, format: ReportFormat) -> Self {
        Self {
            writer,
            format,
            error: None,
        }
    }

    /// Flush the writer and surface the first write error, if any.
    pub fn finish(mut self) -> std::io::Result<W> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn write_report(&mut self, report: &StatusReport) -> std::io::Result<()> {
        match self.format {
            ReportFormat::Text => write!(self.writer, "{}", report),
            ReportFormat::Json => {
                serde_json::to_writer(&mut self.writer, report)?;
                writeln!(self.writer)
            }
        }
    }
}

impl<W: Write> ReportSink for WriterSink<W> {
    fn emit(&mut self, report: StatusReport) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.write_report(&report) {
            log::error!("failed to write status report: {}", e);
            self.error = Some(e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StatusReport {
        StatusReport {
            kind: ReportKind::Return { call: 2 },
            instructions_executed: 7,
            registers: Registers {
                accumulator: 6,
                instruction_register: 0xC000,
                program_counter: 0x202,
                general_register: 3,
            },
            stack: vec![(0x3FF, 0x103), (0x3FE, 0xB200), (0x3FD, 3), (0x3FC, 3)],
            memory: vec![(0x940, 0), (0x941, 0), (0x942, 0)],
        }
    }

    #[test]
    fn test_text_rendering() {
        let text = sample().to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "--- Return from subroutine 2 ---");
        assert_eq!(lines[1], "Accumulator = 0006");
        assert!(lines.contains(&"Stack contents at 3FE = B200"));
        assert!(lines.contains(&"Memory 942 = 0000"));
        assert_eq!(*lines.last().unwrap(), "Instructions executed = 7");
    }

    #[test]
    fn test_empty_stack_rendering() {
        let mut report = sample();
        report.kind = ReportKind::Halt;
        report.stack.clear();

        let text = report.to_string();
        assert!(text.starts_with("--- Halt ---\n"));
        assert!(text.contains("Nothing in the stack!\n"));
    }

    #[test]
    fn test_lines_match_component_status_lines() {
        let mut saved = stack::ExecutionStack::new();
        saved.push_frame(&[0x103, 0xB200, 3, 3]).unwrap();
        let mut mem = memory::Memory::new();
        mem.write(0x941, 0x2A);
        let regs = sample().registers;

        let report = StatusReport {
            kind: ReportKind::Halt,
            instructions_executed: 7,
            registers: regs,
            stack: saved.entries(),
            memory: mem.inspection_window(),
        };

        let mut expected = vec!["--- Halt ---".to_string()];
        expected.extend(regs.status_lines());
        expected.extend(saved.status_lines());
        expected.extend(mem.status_lines());
        expected.push("Instructions executed = 7".to_string());
        assert_eq!(report.lines(), expected);

        saved.clear();
        assert_eq!(saved.status_lines(), vec![stack::EMPTY_STACK_LINE.to_string()]);
    }

    #[test]
    fn test_writer_sink_json() {
        let mut sink = WriterSink::new(Vec::<u8>::new(), ReportFormat::Json);
        sink.emit(sample());
        let out = String::from_utf8(sink.finish().unwrap()).unwrap();

        let parsed: StatusReport = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn test_vec_sink_collects() {
        let mut reports: Vec<StatusReport> = Vec::new();
        reports.emit(sample());
        NullSink.emit(sample());
        assert_eq!(reports.len(), 1);
    }
}
