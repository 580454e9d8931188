//! CPU execution engine.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use crate::cpu::{Word, Memory, Registers, ExecutionStack};
use crate::cpu::decode::{self, Instruction, Opcode, DecodeError};
use crate::cpu::memory::{MemoryError, ADDRESS_MASK};
use crate::cpu::stack::StackError;
use crate::cpu::report::{ReportKind, ReportSink, StatusReport};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted (executed HALT instruction).
    Halted,
    /// CPU hit a fatal error.
    Error,
}

/// The CPU.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Saved register frames for subroutine calls.
    pub stack: ExecutionStack,
    /// Current execution state.
    pub state: CpuState,
    /// Instructions executed so far.
    pub cycles: u64,
    /// Subroutine calls made so far.
    pub calls: u64,
}

impl Cpu {
    /// Create a new CPU with zeroed state.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            stack: ExecutionStack::new(),
            state: CpuState::Running,
            cycles: 0,
            calls: 0,
        }
    }

    /// Reset the CPU to initial state.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.stack.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.calls = 0;
    }

    /// Seed one memory cell before execution starts.
    pub fn load_word(&mut self, addr: Word, value: Word) -> Result<(), MemoryError> {
        self.mem.store_word(addr, value)
    }

    /// Set the address of the first instruction to execute.
    pub fn set_program_counter(&mut self, addr: Word) -> Result<(), MemoryError> {
        if addr > ADDRESS_MASK {
            return Err(MemoryError::AddressOutOfRange(addr));
        }
        self.regs.jump(addr);
        Ok(())
    }

    /// Load a contiguous program at `start` and point the PC at it.
    pub fn load_program(&mut self, start: Word, program: &[Word]) -> Result<(), MemoryError> {
        self.mem.load_program(start, program)?;
        self.regs.jump(start);
        Ok(())
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed, or an error. Any error
    /// leaves the CPU in [`CpuState::Error`].
    pub fn step(&mut self, sink: &mut impl ReportSink) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        match self.cycle(sink) {
            Ok(instr) => Ok(instr),
            Err(e) => {
                log::error!(
                    "fatal fault at PC={:03X} (IR={:04X}): {}",
                    self.regs.program_counter.wrapping_sub(1) & ADDRESS_MASK,
                    self.regs.instruction_register,
                    e
                );
                self.state = CpuState::Error;
                Err(e)
            }
        }
    }

    /// Run until halt or error.
    ///
    /// Returns the number of instructions executed.
    pub fn run(&mut self, sink: &mut impl ReportSink) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.state == CpuState::Running {
            self.step(sink)?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, max_cycles: u64, sink: &mut impl ReportSink) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles.saturating_add(max_cycles);

        while self.state == CpuState::Running && self.cycles < limit {
            self.step(sink)?;
        }

        Ok(self.cycles - start_cycles)
    }

    fn cycle(&mut self, sink: &mut impl ReportSink) -> Result<Instruction, CpuError> {
        // Fetch
        let pc = self.regs.advance_pc();
        self.regs.instruction_register = self.mem.read(pc);

        // Decode
        let instr = decode::decode(self.regs.instruction_register)?;
        log::trace!(
            "{:03X}: {:04X} {} {:03X}",
            pc,
            self.regs.instruction_register,
            instr.opcode,
            instr.address
        );

        // Execute
        self.execute(instr, sink)?;

        self.cycles += 1;

        Ok(instr)
    }

    /// Execute a decoded instruction.
    fn execute(&mut self, instr: Instruction, sink: &mut impl ReportSink) -> Result<(), CpuError> {
        let addr = instr.address;

        match instr.opcode {
            // ==================== Data Transfer ====================

            Opcode::LoadAcMem => {
                self.regs.accumulator = self.mem.read(addr);
            }

            Opcode::StoreAcMem => {
                self.mem.write(addr, self.regs.accumulator);
            }

            Opcode::LoadAcReg => {
                self.regs.accumulator = self.regs.general_register;
            }

            Opcode::StoreAcReg => {
                self.regs.general_register = self.regs.accumulator;
            }

            Opcode::LoadRegOperand => {
                self.regs.general_register = addr;
            }

            // ==================== Arithmetic ====================

            Opcode::AddAcMem => {
                let operand = self.mem.read(addr);
                self.regs.accumulator = self.regs.accumulator.wrapping_add(operand);
            }

            Opcode::AddAcReg => {
                self.regs.accumulator = self.regs.accumulator.wrapping_add(self.regs.general_register);
            }

            Opcode::MultAcReg => {
                self.regs.accumulator = self.regs.accumulator.wrapping_mul(self.regs.general_register);
            }

            Opcode::SubtAcReg => {
                self.regs.accumulator = self.regs.accumulator.wrapping_sub(self.regs.general_register);
            }

            Opcode::DivAcReg => {
                if self.regs.general_register == 0 {
                    return Err(CpuError::DivisionByZero);
                }
                self.regs.accumulator /= self.regs.general_register;
            }

            // ==================== Control Flow ====================

            Opcode::JumpToSubrout => {
                self.stack.push_frame(&self.regs.frame())?;
                self.regs.jump(addr);
                self.calls += 1;
                log::debug!("call #{} to {:03X}, stack depth {}", self.calls, addr, self.stack.len());
            }

            Opcode::RetFrmSubrout => {
                sink.emit(self.snapshot(ReportKind::Return { call: self.calls }));
                let frame = self.stack.pop_frame()?;
                self.regs.restore_frame(frame);
                log::debug!(
                    "return to {:03X}, stack depth {}",
                    self.regs.program_counter,
                    self.stack.len()
                );
            }

            Opcode::Halt => {
                sink.emit(self.snapshot(ReportKind::Halt));
                self.state = CpuState::Halted;
                log::info!("halted after {} instructions", self.cycles + 1);
            }
        }

        Ok(())
    }

    /// Take a status report of the current machine state.
    pub fn snapshot(&self, kind: ReportKind) -> StatusReport {
        StatusReport {
            kind,
            instructions_executed: self.cycles,
            registers: self.regs,
            stack: self.stack.entries(),
            memory: self.mem.inspection_window(),
        }
    }

    /// The report a top-level handler flushes after a fatal error.
    pub fn fault_report(&self, error: &CpuError) -> StatusReport {
        self.snapshot(ReportKind::Fault {
            error: error.to_string(),
        })
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("calls", &self.calls)
            .field("regs", &self.regs)
            .field("stack", &self.stack)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
///
/// All of them except [`CpuError::NotRunning`] are fatal faults of the
/// simulated machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("unrecognized opcode {0:#06b}")]
    UnrecognizedOpcode(u8),

    #[error("division by zero")]
    DivisionByZero,

    #[error("execution stack overflow")]
    StackOverflow,

    #[error("execution stack underflow")]
    StackUnderflow,

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
}

impl From<DecodeError> for CpuError {
    fn from(e: DecodeError) -> Self {
        match e {
            DecodeError::UnrecognizedOpcode(bits) => CpuError::UnrecognizedOpcode(bits),
        }
    }
}

impl From<StackError> for CpuError {
    fn from(e: StackError) -> Self {
        match e {
            StackError::Overflow => CpuError::StackOverflow,
            StackError::Underflow => CpuError::StackUnderflow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::encode;
    use crate::cpu::report::NullSink;
    use crate::cpu::stack::STACK_CAPACITY;
    use proptest::prelude::*;

    fn make_program(instructions: &[(Opcode, Word)]) -> Vec<Word> {
        instructions
            .iter()
            .map(|&(op, addr)| encode(&Instruction::new(op, addr)))
            .collect()
    }

    fn load(program: &[(Opcode, Word)]) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.load_program(0x100, &make_program(program)).unwrap();
        cpu
    }

    #[test]
    fn test_cpu_halt() {
        let mut cpu = load(&[(Opcode::Halt, 0)]);
        let mut reports: Vec<StatusReport> = Vec::new();

        let executed = cpu.run(&mut reports).unwrap();

        assert_eq!(executed, 1);
        assert!(cpu.is_halted());
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, ReportKind::Halt);
        assert_eq!(reports[0].instructions_executed, 0);
    }

    #[test]
    fn test_fetch_updates_ir_and_pc() {
        let mut cpu = load(&[(Opcode::LoadRegOperand, 0x2A), (Opcode::Halt, 0)]);

        cpu.step(&mut NullSink).unwrap();

        assert_eq!(cpu.regs.instruction_register, 0x602A);
        assert_eq!(cpu.regs.program_counter, 0x101);
        assert_eq!(cpu.regs.general_register, 0x2A);
    }

    #[test]
    fn test_cpu_load_add_store() {
        let mut cpu = load(&[
            (Opcode::LoadAcMem, 0x940),
            (Opcode::AddAcMem, 0x941),
            (Opcode::StoreAcMem, 0x942),
            (Opcode::Halt, 0),
        ]);
        cpu.mem.write(0x940, 10);
        cpu.mem.write(0x941, 5);

        cpu.run(&mut NullSink).unwrap();

        assert_eq!(cpu.regs.accumulator, 15);
        assert_eq!(cpu.mem.read(0x942), 15);
    }

    #[test]
    fn test_register_arithmetic() {
        let mut cpu = load(&[
            (Opcode::LoadRegOperand, 7),
            (Opcode::LoadAcReg, 0),
            (Opcode::MultAcReg, 0),      // 49
            (Opcode::LoadRegOperand, 9),
            (Opcode::SubtAcReg, 0),      // 40
            (Opcode::LoadRegOperand, 6),
            (Opcode::DivAcReg, 0),       // 6
            (Opcode::StoreAcReg, 0),
            (Opcode::Halt, 0),
        ]);

        cpu.run(&mut NullSink).unwrap();

        assert_eq!(cpu.regs.accumulator, 6);
        assert_eq!(cpu.regs.general_register, 6);
    }

    #[test]
    fn test_arithmetic_wraps() {
        let mut cpu = load(&[
            (Opcode::LoadRegOperand, 1),
            (Opcode::SubtAcReg, 0),
            (Opcode::Halt, 0),
        ]);

        cpu.run(&mut NullSink).unwrap();

        assert_eq!(cpu.regs.accumulator, 0xFFFF);
    }

    #[test]
    fn test_division_by_zero() {
        let mut cpu = load(&[
            (Opcode::LoadRegOperand, 8),
            (Opcode::LoadAcReg, 0),
            (Opcode::LoadRegOperand, 0),
            (Opcode::DivAcReg, 0),
            (Opcode::Halt, 0),
        ]);
        let mut reports: Vec<StatusReport> = Vec::new();

        let result = cpu.run(&mut reports);

        assert_eq!(result, Err(CpuError::DivisionByZero));
        assert_eq!(cpu.regs.accumulator, 8);
        assert_eq!(cpu.state, CpuState::Error);
        assert_eq!(cpu.cycles, 3);
        assert!(reports.is_empty());
    }

    #[test]
    fn test_unrecognized_opcode_stops_execution() {
        let mut cpu = Cpu::new();
        cpu.load_program(0x100, &[0xD123, 0x6005, 0xF000]).unwrap();

        let result = cpu.run(&mut NullSink);

        assert_eq!(result, Err(CpuError::UnrecognizedOpcode(0b1101)));
        assert_eq!(cpu.regs.general_register, 0);
        assert_eq!(cpu.cycles, 0);
        assert_eq!(cpu.step(&mut NullSink), Err(CpuError::NotRunning(CpuState::Error)));
    }

    #[test]
    fn test_return_without_call_underflows() {
        let mut cpu = load(&[(Opcode::RetFrmSubrout, 0), (Opcode::Halt, 0)]);
        let mut reports: Vec<StatusReport> = Vec::new();

        let result = cpu.run(&mut reports);

        assert_eq!(result, Err(CpuError::StackUnderflow));
        // The pre-restore report is still taken
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, ReportKind::Return { call: 0 });
    }

    #[test]
    fn test_runaway_recursion_overflows() {
        // 0x100: JUMP_TO_SUBROUT 0x100
        let mut cpu = load(&[(Opcode::JumpToSubrout, 0x100)]);

        let result = cpu.run(&mut NullSink);

        assert_eq!(result, Err(CpuError::StackOverflow));
        assert_eq!(cpu.calls, (STACK_CAPACITY / 4) as u64);
        assert_eq!(cpu.stack.remaining(), 0);
    }

    #[test]
    fn test_call_saves_frame() {
        let mut cpu = Cpu::new();
        cpu.load_program(0x100, &make_program(&[(Opcode::JumpToSubrout, 0x200)])).unwrap();
        cpu.regs.accumulator = 0x11;
        cpu.regs.general_register = 0x22;

        cpu.step(&mut NullSink).unwrap();

        assert_eq!(cpu.regs.program_counter, 0x200);
        assert_eq!(cpu.calls, 1);
        assert_eq!(
            cpu.stack.entries(),
            vec![(0x3FF, 0x101), (0x3FE, 0xB200), (0x3FD, 0x11), (0x3FC, 0x22)]
        );
    }

    #[test]
    fn test_run_limited() {
        let mut cpu = Cpu::new();
        cpu.load_program(0x000, &make_program(&[
            (Opcode::JumpToSubrout, 0x010),
            (Opcode::Halt, 0),
        ])).unwrap();
        cpu.mem.write(0x010, encode(&Instruction::new(Opcode::RetFrmSubrout, 0)));

        let executed = cpu.run_limited(1, &mut NullSink).unwrap();
        assert_eq!(executed, 1);
        assert!(cpu.is_running());

        let executed = cpu.run_limited(100, &mut NullSink).unwrap();
        assert_eq!(executed, 2);
        assert!(cpu.is_halted());
    }

    #[test]
    fn test_fault_report() {
        let cpu = Cpu::new();
        let report = cpu.fault_report(&CpuError::DivisionByZero);
        assert_eq!(
            report.kind,
            ReportKind::Fault { error: "division by zero".into() }
        );
    }

    proptest! {
        #[test]
        fn load_then_store_leaves_memory_unchanged(addr in 0u16..0x1000, value in any::<u16>()) {
            let mut cpu = Cpu::new();
            // Keep the program out of the way of the cell under test
            let start = if addr < 0x800 { 0x900 } else { 0x100 };
            cpu.load_program(start, &make_program(&[
                (Opcode::LoadAcMem, addr),
                (Opcode::StoreAcMem, addr),
                (Opcode::Halt, 0),
            ])).unwrap();
            cpu.mem.write(addr, value);

            cpu.run(&mut NullSink).unwrap();

            prop_assert_eq!(cpu.mem.read(addr), value);
        }

        #[test]
        fn call_then_return_restores_registers(
            ac in any::<u16>(),
            gr in any::<u16>(),
            target in 0x200u16..0x1000,
        ) {
            let call = encode(&Instruction::new(Opcode::JumpToSubrout, target));
            let mut cpu = Cpu::new();
            cpu.load_program(0x100, &[call, encode(&Instruction::new(Opcode::Halt, 0))]).unwrap();
            cpu.mem.write(target, encode(&Instruction::new(Opcode::RetFrmSubrout, 0)));
            cpu.regs.accumulator = ac;
            cpu.regs.general_register = gr;

            cpu.step(&mut NullSink).unwrap();
            prop_assert_eq!(cpu.regs.program_counter, target);
            cpu.step(&mut NullSink).unwrap();

            // Exactly the state the call instruction saw after its fetch
            prop_assert_eq!(cpu.regs.frame(), [0x101, call, ac, gr]);
            prop_assert!(cpu.stack.is_empty());
        }
    }
}
