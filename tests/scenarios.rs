//! End-to-end programs run through the public API.

use simple_exec::asm::image::parse_image;
use simple_exec::{assemble, Cpu, CpuError, NullSink, ReportFormat, ReportKind, StatusReport, WriterSink};

#[test]
fn add_operand_to_itself() {
    let mut cpu = Cpu::new();
    cpu.load_word(0x100, 0x6005).unwrap(); // LOAD_REG_OPERAND 5
    cpu.load_word(0x101, 0x3000).unwrap(); // LOAD_AC_REG
    cpu.load_word(0x102, 0x7000).unwrap(); // ADD_AC_REG
    cpu.load_word(0x103, 0xF000).unwrap(); // HALT
    cpu.set_program_counter(0x100).unwrap();

    let executed = cpu.run(&mut NullSink).unwrap();

    assert_eq!(executed, 4);
    assert_eq!(cpu.regs.general_register, 5);
    assert_eq!(cpu.regs.accumulator, 10);
    assert!(cpu.is_halted());
}

/// The subroutine at 0x200 adds the general register to the accumulator
/// and leaves the sum at 0x940, since returning restores the accumulator.
const CALL_TWICE: &str = r#"
        ORG 0x100
        LDI 3
        JSR 0x200
        LDA 0x940
        JSR 0x200
        LDA 0x940
        HALT

        ORG 0x200
        ADD_AC_REG
        STORE_AC_MEM 0x940
        RET_FRM_SUBROUT
"#;

#[test]
fn subroutine_called_twice() {
    let image = assemble(CALL_TWICE).unwrap();
    let mut cpu = Cpu::new();
    image.load_into(&mut cpu).unwrap();
    let mut reports: Vec<StatusReport> = Vec::new();

    cpu.run(&mut reports).unwrap();

    assert_eq!(cpu.regs.accumulator, 6);
    assert_eq!(cpu.regs.general_register, 3);
    assert!(cpu.stack.is_empty());
    assert_eq!(cpu.calls, 2);

    let kinds: Vec<_> = reports.iter().map(|r| r.kind.clone()).collect();
    assert_eq!(
        kinds,
        vec![
            ReportKind::Return { call: 1 },
            ReportKind::Return { call: 2 },
            ReportKind::Halt,
        ]
    );

    // The first return is reported before the frame is restored
    let first = &reports[0];
    assert_eq!(first.instructions_executed, 4);
    assert_eq!(first.registers.accumulator, 3);
    assert_eq!(first.stack.len(), 4);
    assert_eq!(first.stack[0], (0x3FF, 0x102));
    assert_eq!(first.memory[0], (0x940, 3));

    assert!(reports[2].stack.is_empty());
    assert_eq!(reports[2].memory[0], (0x940, 6));
}

#[test]
fn image_text_drives_a_run() {
    let image = parse_image(
        "This line is a comment\n\
         1. 100 6005;\n\
         2. 101 3000;\n\
         3. 102 7000;\n\
         4. 103 2940;  STORE_AC_MEM 0x940\n\
         5. 104 F000;\n",
    )
    .unwrap();
    let mut cpu = Cpu::new();
    image.load_into(&mut cpu).unwrap();
    let mut sink = WriterSink::new(Vec::<u8>::new(), ReportFormat::Text);

    cpu.run(&mut sink).unwrap();

    let text = String::from_utf8(sink.finish().unwrap()).unwrap();
    assert_eq!(
        text,
        "--- Halt ---\n\
         Accumulator = 000A\n\
         Instruction Register = F000\n\
         Program Counter = 0105\n\
         General Register = 0005\n\
         Nothing in the stack!\n\
         Memory 940 = 000A\n\
         Memory 941 = 0000\n\
         Memory 942 = 0000\n\
         Instructions executed = 4\n"
    );
}

#[test]
fn fault_terminates_and_reports() {
    let image = assemble(
        "ORG 0x100\n\
         LDI 4\n\
         LAR\n\
         LDI 0\n\
         DIV\n\
         HALT",
    )
    .unwrap();
    let mut cpu = Cpu::new();
    image.load_into(&mut cpu).unwrap();
    let mut reports: Vec<StatusReport> = Vec::new();

    let err = cpu.run(&mut reports).unwrap_err();
    assert_eq!(err, CpuError::DivisionByZero);
    assert!(reports.is_empty());

    let fault = cpu.fault_report(&err);
    assert_eq!(fault.registers.accumulator, 4);
    assert_eq!(fault.instructions_executed, 3);
    assert!(fault.to_string().starts_with("--- Fault: division by zero ---"));
}
