//! WebAssembly bindings.
//!
//! This module provides JavaScript-friendly wrappers around the core emulator.

use wasm_bindgen::prelude::*;
use crate::{Cpu, ProgramImage, StatusReport};
use crate::asm::{assemble, image::parse_image};
use crate::asm::disasm::disassemble_instruction;
use crate::cpu::decode::encode;
use crate::cpu::memory::MEMORY_SIZE;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly CPU wrapper.
#[wasm_bindgen]
pub struct WasmCpu {
    cpu: Cpu,
    program: ProgramImage,
    reports: Vec<StatusReport>,
}

#[wasm_bindgen]
impl WasmCpu {
    /// Create a new CPU instance.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            program: ProgramImage::new(),
            reports: Vec::new(),
        }
    }

    /// Load a program from assembly source code.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<usize, JsError> {
        let image = assemble(source)
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.load(image)
    }

    /// Load a program from program image text.
    #[wasm_bindgen]
    pub fn load_image(&mut self, text: &str) -> Result<usize, JsError> {
        let image = parse_image(text)
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.load(image)
    }

    fn load(&mut self, image: ProgramImage) -> Result<usize, JsError> {
        let mut cpu = Cpu::new();
        image.load_into(&mut cpu)
            .map_err(|e| JsError::new(&e.to_string()))?;

        let len = image.len();
        self.cpu = cpu;
        self.program = image;
        self.reports.clear();
        Ok(len)
    }

    /// Step one instruction. Returns the disassembled instruction.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        let instr = self.cpu.step(&mut self.reports)
            .map_err(|e| JsError::new(&e.to_string()))?;

        Ok(disassemble_instruction(encode(&instr)))
    }

    /// Run until halt, a fault, or `max_cycles` instructions.
    #[wasm_bindgen]
    pub fn run(&mut self, max_cycles: u32) -> Result<u64, JsError> {
        self.cpu.run_limited(max_cycles as u64, &mut self.reports)
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Reset CPU to initial state with loaded program.
    #[wasm_bindgen]
    pub fn reset(&mut self) -> Result<(), JsError> {
        self.cpu = Cpu::new();
        self.reports.clear();
        if self.program.is_empty() {
            return Ok(());
        }
        self.program.load_into(&mut self.cpu)
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Check if CPU is running.
    #[wasm_bindgen]
    pub fn is_running(&self) -> bool {
        self.cpu.is_running()
    }

    /// Check if CPU is halted.
    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    /// Get the number of instructions executed.
    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    /// Get program counter.
    #[wasm_bindgen]
    pub fn pc(&self) -> u16 {
        self.cpu.regs.program_counter
    }

    /// Get accumulator value.
    #[wasm_bindgen]
    pub fn accumulator(&self) -> u16 {
        self.cpu.regs.accumulator
    }

    /// Get general register value.
    #[wasm_bindgen]
    pub fn general_register(&self) -> u16 {
        self.cpu.regs.general_register
    }

    /// Get state as string.
    #[wasm_bindgen]
    pub fn state(&self) -> String {
        format!("{:?}", self.cpu.state)
    }

    /// Get memory cell value at an address (0x000-0xFFF).
    #[wasm_bindgen]
    pub fn memory_at(&self, addr: u16) -> u16 {
        if (addr as usize) < MEMORY_SIZE {
            self.cpu.mem.read(addr)
        } else {
            0
        }
    }

    /// Get all memory as an array of words.
    #[wasm_bindgen]
    pub fn memory_all(&self) -> Vec<u16> {
        self.cpu.mem.dump(0, MEMORY_SIZE)
            .into_iter()
            .map(|(_, value)| value)
            .collect()
    }

    /// Get registers, stack depth and counters as a JSON string.
    #[wasm_bindgen]
    pub fn registers_json(&self) -> String {
        serde_json::json!({
            "registers": self.cpu.regs,
            "stack_depth": self.cpu.stack.len(),
            "cycles": self.cpu.cycles,
            "calls": self.cpu.calls,
        })
        .to_string()
    }

    /// Get every status report emitted so far as a JSON array.
    #[wasm_bindgen]
    pub fn reports_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.reports)
            .map_err(|e| JsError::new(&e.to_string()))
    }
}

impl Default for WasmCpu {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble source code and return the word count.
#[wasm_bindgen]
pub fn wasm_assemble(source: &str) -> Result<usize, JsError> {
    let image = assemble(source)
        .map_err(|e| JsError::new(&e.to_string()))?;
    Ok(image.len())
}

/// Disassemble a single instruction word.
#[wasm_bindgen]
pub fn wasm_disassemble(word: u16) -> String {
    disassemble_instruction(word)
}
