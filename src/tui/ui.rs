//! UI rendering for the debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, List, ListItem},
    style::{Color, Style, Modifier},
};
use crate::cpu::memory::{INSPECT_START, INSPECT_END, MEMORY_SIZE};
use super::app::DebuggerApp;

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(55),
            Constraint::Percentage(45),
        ])
        .split(frame.area());

    // Left side: code, registers and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(8),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_disassembly(frame, left_chunks[0], app);
    draw_registers(frame, left_chunks[1], app);
    draw_status(frame, left_chunks[2], app);

    // Right side: memory, stack and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(10),
            Constraint::Length(4),
        ])
        .split(chunks[1]);

    draw_memory(frame, right_chunks[0], app);
    draw_stack(frame, right_chunks[1], app);
    draw_help(frame, right_chunks[2]);
}

/// Draw disassembly view around the PC.
fn draw_disassembly(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let disasm = app.get_disassembly((area.height as usize).saturating_sub(2));

    let items: Vec<ListItem> = disasm
        .iter()
        .map(|(addr, instr, is_current)| {
            let prefix = if *is_current { "▶ " } else { "  " };
            let bp = if app.breakpoints.contains(addr) { "●" } else { " " };
            let text = format!("{}{:03X}: {}", prefix, addr, instr);

            let style = if *is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if app.breakpoints.contains(addr) {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };

            ListItem::new(format!("{} {}", bp, text)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Disassembly ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)));

    frame.render_widget(list, area);
}

/// Draw register state.
fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let regs = &app.cpu.regs;
    let value = Style::default().fg(Color::White);

    let content = vec![
        Line::from(vec![
            Span::raw("AC: "),
            Span::styled(format!("{:04X}", regs.accumulator), value),
            Span::raw(format!(" = {:<6}", regs.accumulator)),
            Span::raw("GR: "),
            Span::styled(format!("{:04X}", regs.general_register), value),
            Span::raw(format!(" = {}", regs.general_register)),
        ]),
        Line::from(vec![
            Span::raw("PC: "),
            Span::styled(format!("{:04X}", regs.program_counter), Style::default().fg(Color::Yellow)),
            Span::raw("         IR: "),
            Span::styled(format!("{:04X}", regs.instruction_register), value),
        ]),
        Line::from(vec![
            Span::raw("Instructions: "),
            Span::styled(format!("{}", app.cpu.cycles), Style::default().fg(Color::Cyan)),
            Span::raw("   Calls: "),
            Span::styled(format!("{}", app.cpu.calls), Style::default().fg(Color::Cyan)),
        ]),
        Line::from(vec![
            Span::raw("State: "),
            Span::styled(format!("{:?}", app.cpu.state),
                if app.cpu.is_running() {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::Red)
                }),
            Span::raw(format!("   Reports: {}", app.reports.len())),
        ]),
    ];

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

/// Draw memory view.
fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible_rows = (area.height as usize).saturating_sub(2);
    let pc = app.cpu.regs.program_counter;

    let items: Vec<ListItem> = app.cpu.mem.dump(app.mem_scroll, visible_rows)
        .into_iter()
        .map(|(addr, value)| {
            let text = format!("{:03X}: {:04X}", addr, value);

            let style = if addr == pc {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if (INSPECT_START..=INSPECT_END).contains(&addr) {
                Style::default().fg(Color::Magenta)
            } else if value != 0 {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(text).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(format!(" Memory ({:03X}/{:03X}) ", app.mem_scroll, MEMORY_SIZE - 1))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)));

    frame.render_widget(list, area);
}

/// Draw the execution stack, most recent slot first.
fn draw_stack(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible_rows = (area.height as usize).saturating_sub(2);

    let items: Vec<ListItem> = if app.cpu.stack.is_empty() {
        vec![ListItem::new("(empty)").style(Style::default().fg(Color::DarkGray))]
    } else {
        app.cpu.stack.entries()
            .into_iter()
            .rev()
            .take(visible_rows)
            .map(|(slot, value)| ListItem::new(format!("{:03X}: {:04X}", slot, value)))
            .collect()
    };

    let list = List::new(items)
        .block(Block::default()
            .title(format!(" Stack ({}) ", app.cpu.stack.len()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)));

    frame.render_widget(list, area);
}

/// Draw status bar.
fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" Status ")
            .borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Draw help panel.
fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("s: Step  r: Run  p: Pause  b: Breakpoint  x: Reset"),
        Line::from("↑↓/PgUp/PgDn: Scroll memory  q: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Help ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}
