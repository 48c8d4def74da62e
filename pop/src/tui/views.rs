//! TUI views and rendering

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap};

use crate::domain::{ExecutorType, ResultKind, Task};
use crate::session::{ExecutionMode, Phase};

use super::state::{AppState, ConfirmDialog, InteractionMode};

/// Main render function
pub fn render(state: &AppState, frame: &mut Frame) {
    match state.session.phase() {
        Phase::Idle | Phase::Decomposing { .. } => render_hero(state, frame),
        Phase::Ready | Phase::Executing { .. } => render_board(state, frame),
    }

    match &state.interaction_mode {
        InteractionMode::Confirm(dialog) => render_confirm(dialog, frame),
        InteractionMode::Help => render_help_overlay(frame),
        InteractionMode::Normal => {}
    }
}

/// Idea input screen (Idle and Decomposing)
fn render_hero(state: &AppState, frame: &mut Frame) {
    let area = centered_rect(70, 50, frame.area());
    let decomposing = matches!(state.session.phase(), Phase::Decomposing { .. });

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // title
            Constraint::Length(2), // tagline
            Constraint::Length(3), // input
            Constraint::Length(2), // status / spinner
            Constraint::Min(0),
        ])
        .split(area);

    let title = Paragraph::new(Line::from(Span::styled(
        "P O P C O R N",
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    )))
    .centered();
    frame.render_widget(title, chunks[0]);

    let tagline = Paragraph::new(Line::from(Span::styled(
        "Unbundle an idea into an executable plan",
        Style::default().fg(Color::DarkGray),
    )))
    .centered();
    frame.render_widget(tagline, chunks[1]);

    let input_style = if decomposing {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };
    let input_text = if decomposing {
        state.idea_input.clone()
    } else {
        format!("{}▏", state.idea_input)
    };
    let input = Paragraph::new(input_text)
        .style(input_style)
        .block(Block::default().borders(Borders::ALL).title(" Your idea "));
    frame.render_widget(input, chunks[2]);

    let status = if decomposing {
        Line::from(Span::styled(
            format!("{}... {}s", state.working_word, state.working_elapsed_secs()),
            Style::default().fg(Color::Yellow),
        ))
    } else if let Some(error) = &state.error_message {
        Line::from(Span::styled(error.as_str(), Style::default().fg(Color::Red)))
    } else {
        Line::from(Span::styled(
            "Enter to unbundle · F1 help · Ctrl+C quit",
            Style::default().fg(Color::DarkGray),
        ))
    };
    frame.render_widget(Paragraph::new(status).centered(), chunks[3]);
}

/// Plan board (Ready and Executing)
fn render_board(state: &AppState, frame: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // main
            Constraint::Length(3), // footer
        ])
        .split(frame.area());

    render_header(state, frame, chunks[0]);

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(44), Constraint::Min(0)])
        .split(chunks[1]);

    render_task_list(state, frame, main[0]);
    render_detail(state, frame, main[1]);
    render_footer(state, frame, chunks[2]);
}

fn render_header(state: &AppState, frame: &mut Frame, area: Rect) {
    let (completed, total) = state.session.progress();
    let (idea, started) = state
        .session
        .plan()
        .map(|p| (p.original_idea.as_str(), p.created_at.format("%H:%M").to_string()))
        .unwrap_or_default();

    let header = Paragraph::new(Line::from(vec![
        Span::styled("popcorn ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::styled(truncated(idea, 60), Style::default().fg(Color::Gray)),
        Span::raw(" │ "),
        Span::styled(
            format!("{}/{} done", completed, total),
            Style::default().fg(if completed == total { Color::Green } else { Color::Cyan }),
        ),
        Span::styled(format!(" │ started {}", started), Style::default().fg(Color::DarkGray)),
    ]))
    .block(Block::default().borders(Borders::ALL).title(" Plan "));

    frame.render_widget(header, area);
}

fn render_task_list(state: &AppState, frame: &mut Frame, area: Rect) {
    let selected_id = state.session.selected_id();
    let tasks: &[Task] = state.session.plan().map(|p| p.tasks.as_slice()).unwrap_or_default();

    let items: Vec<ListItem> = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let status_span = if task.is_completed() {
                Span::styled("✓ ", Style::default().fg(Color::Green))
            } else {
                Span::styled("· ", Style::default().fg(Color::DarkGray))
            };

            let mut line = vec![
                Span::styled(format!("{:>2} ", i + 1), Style::default().fg(Color::DarkGray)),
                status_span,
                Span::styled(
                    format!("[{:^4}] ", task.executor.badge()),
                    Style::default().fg(executor_color(task.executor)),
                ),
                Span::raw(truncated(&task.name, 28)),
            ];
            if Some(&task.id) == selected_id {
                line.push(Span::styled(" ◂", Style::default().fg(Color::Yellow)));
            }

            let item = ListItem::new(Line::from(line));
            if i == state.cursor {
                item.style(Style::default().bg(Color::DarkGray).fg(Color::White))
            } else {
                item
            }
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" Tasks "));
    frame.render_widget(list, area);
}

fn render_detail(state: &AppState, frame: &mut Frame, area: Rect) {
    let Some(task) = state.session.selected_task() else {
        let placeholder = Paragraph::new(Line::from(Span::styled(
            "Select a task to begin...",
            Style::default().fg(Color::DarkGray),
        )))
        .centered()
        .block(Block::default().borders(Borders::ALL).title(" Task "));
        frame.render_widget(placeholder, area);
        return;
    };

    let executing = state.session.is_executing();
    let mut lines: Vec<Line> = Vec::new();

    // Executor heading
    let (heading, subtitle) = match task.executor {
        ExecutorType::Ai => ("AI INTELLIGENCE", "generative model execution"),
        ExecutorType::Human => ("HUMAN EXECUTION", "requires physical presence"),
        ExecutorType::Tool => ("SAAS TOOL", "standardized software process"),
    };
    lines.push(Line::from(vec![
        Span::styled(
            heading,
            Style::default()
                .fg(executor_color(task.executor))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  {}", subtitle), Style::default().fg(Color::DarkGray)),
    ]));
    lines.push(Line::from(Span::styled(
        task.name.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(""));

    // Actionable content
    lines.push(Line::from(Span::styled(
        task.executor.content_label().to_uppercase(),
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
    )));
    for content_line in task.actionable_content.lines() {
        lines.push(Line::from(content_line.to_string()));
    }
    lines.push(Line::from(""));

    // Execution controls (AI only)
    if task.executor.is_ai() {
        let mode = state.session.mode();
        lines.push(Line::from(vec![
            Span::styled("MODE ", Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD)),
            mode_span("Text", mode == ExecutionMode::Text),
            Span::raw("  "),
            mode_span("Image", mode == ExecutionMode::Image),
            Span::styled("   (m to switch)", Style::default().fg(Color::DarkGray)),
        ]));
        if mode == ExecutionMode::Image {
            let config = state.session.image_config();
            lines.push(Line::from(vec![
                Span::styled("     ratio ", Style::default().fg(Color::DarkGray)),
                Span::styled(config.aspect_ratio.as_str(), Style::default().fg(Color::Magenta)),
                Span::styled(" (a)   size ", Style::default().fg(Color::DarkGray)),
                Span::styled(config.size.as_str(), Style::default().fg(Color::Magenta)),
                Span::styled(" (s)", Style::default().fg(Color::DarkGray)),
            ]));
        }
        if executing {
            lines.push(Line::from(Span::styled(
                format!("{}... {}s", state.working_word, state.working_elapsed_secs()),
                Style::default().fg(Color::Yellow),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "e to run",
                Style::default().fg(Color::Cyan),
            )));
        }
        lines.push(Line::from(""));
    } else if !task.is_completed() {
        lines.push(Line::from(Span::styled(
            "This task is executed outside the studio. Press c to mark it completed.",
            Style::default().fg(Color::DarkGray),
        )));
        lines.push(Line::from(""));
    }

    // Result
    if let Some(result) = &task.result {
        lines.push(Line::from(Span::styled(
            "RESULT",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )));
        match task.result_kind {
            Some(ResultKind::Image) => {
                lines.push(Line::from(Span::styled(
                    image_summary(result),
                    Style::default().fg(Color::Green),
                )));
                lines.push(Line::from(Span::styled(
                    truncated(result, 72),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            _ => {
                for result_line in result.lines() {
                    lines.push(Line::from(result_line.to_string()));
                }
            }
        }
    }

    let detail = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((state.detail_scroll, 0))
        .block(Block::default().borders(Borders::ALL).title(" Task "));
    frame.render_widget(detail, area);
}

fn render_footer(state: &AppState, frame: &mut Frame, area: Rect) {
    let line = if let Some(error) = &state.error_message {
        Line::from(Span::styled(error.as_str(), Style::default().fg(Color::Red)))
    } else {
        Line::from(vec![
            key_hint("j/k"),
            Span::raw(" Navigate "),
            key_hint("e"),
            Span::raw(" Run "),
            key_hint("m"),
            Span::raw(" Mode "),
            key_hint("c"),
            Span::raw(" Mark done "),
            key_hint("r"),
            Span::raw(" Restart "),
            key_hint("?"),
            Span::raw(" Help "),
            key_hint("q"),
            Span::raw(" Quit "),
        ])
    };

    frame.render_widget(
        Paragraph::new(line).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn render_confirm(dialog: &ConfirmDialog, frame: &mut Frame) {
    let popup = centered_rect(50, 20, frame.area());
    frame.render_widget(Clear, popup);

    let button_style = |active: bool| {
        if active {
            Style::default().bg(Color::White).fg(Color::Black)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    };

    let body = vec![
        Line::from(""),
        Line::from(dialog.message.clone()).centered(),
        Line::from(""),
        Line::from(vec![
            Span::styled("  No  ", button_style(!dialog.selected_button)),
            Span::raw("   "),
            Span::styled("  Yes  ", button_style(dialog.selected_button)),
        ])
        .centered(),
    ];

    let widget = Paragraph::new(body)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Confirm "));
    frame.render_widget(widget, popup);
}

fn render_help_overlay(frame: &mut Frame) {
    let popup = centered_rect(60, 70, frame.area());
    frame.render_widget(Clear, popup);

    let section = |title: &'static str| {
        Line::from(Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        ))
    };
    let entry = |key: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("{:<10}", key), Style::default().fg(Color::Cyan)),
            Span::raw(what),
        ])
    };

    let help_text = vec![
        section("Idea screen"),
        entry("Enter", "Decompose the idea into a plan"),
        Line::from(""),
        section("Plan board"),
        entry("j/k, ↑/↓", "Navigate and select tasks"),
        entry("g/G", "First / last task"),
        entry("Esc", "Deselect"),
        entry("e", "Execute selected AI task"),
        entry("m", "Toggle text/image mode"),
        entry("a / s", "Cycle aspect ratio / image size"),
        entry("c", "Mark HUMAN/TOOL task completed"),
        entry("PgUp/PgDn", "Scroll task detail"),
        entry("r", "Restart (discards the plan)"),
        entry("?", "Toggle this help"),
        entry("q", "Quit"),
        Line::from(""),
        section("Anywhere"),
        entry("F1", "Toggle this help"),
        entry("Ctrl+C", "Force quit"),
    ];

    let help = Paragraph::new(help_text)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Help "));
    frame.render_widget(help, popup);
}

fn executor_color(executor: ExecutorType) -> Color {
    match executor {
        ExecutorType::Ai => Color::Magenta,
        ExecutorType::Human => Color::Yellow,
        ExecutorType::Tool => Color::Blue,
    }
}

fn mode_span(label: &'static str, active: bool) -> Span<'static> {
    if active {
        Span::styled(label, Style::default().fg(Color::Black).bg(Color::White))
    } else {
        Span::styled(label, Style::default().fg(Color::DarkGray))
    }
}

fn key_hint(key: &'static str) -> Span<'static> {
    Span::styled(
        format!(" {}", key),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )
}

/// Rough size line for an image held as a data URI
fn image_summary(uri: &str) -> String {
    let payload = uri.split_once("base64,").map(|(_, p)| p).unwrap_or(uri);
    let bytes = payload.len() * 3 / 4;
    format!("image generated ({} KB, held in memory)", bytes.div_ceil(1024))
}

fn truncated(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}…", head)
    }
}

/// Helper to create a centered rect
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
