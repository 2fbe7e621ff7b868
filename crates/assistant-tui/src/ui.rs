use ratatui::{
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Field, Focus, InputMode};
use assistant_core::state::FieldView;
use assistant_core::RunOutcome;
use unicode_width::UnicodeWidthChar;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Slice of `text` that fits in `width` columns with the cursor in view, and
/// the cursor's column within that slice. `cursor` counts chars.
fn scroll_to_cursor(text: &str, cursor: usize, width: u16) -> (String, u16) {
    let width = width.max(1) as usize;
    let chars: Vec<char> = text.chars().collect();
    let cursor = cursor.min(chars.len());
    let col = |c: &char| c.width().unwrap_or(0);

    let mut start = 0;
    let mut before: usize = chars[..cursor].iter().map(col).sum();
    while before >= width && start < cursor {
        before -= col(&chars[start]);
        start += 1;
    }

    let mut visible = String::new();
    let mut used = 0;
    for c in &chars[start..] {
        used += col(c);
        if used > width {
            break;
        }
        visible.push(*c);
    }
    (visible, before as u16)
}

pub fn render(app: &App, frame: &mut Frame) {
    let view = app.control.view();

    let system_height = if view.system_field.hidden { 0 } else { 3 };
    let [header, system, prompt, submit, response, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(system_height),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_header(app, frame, header);
    if !view.system_field.hidden {
        render_field(
            app,
            frame,
            system,
            Field::System,
            " Rules of engagement/AI persona for this interaction ",
            &view.system_field,
        );
    }
    render_field(
        app,
        frame,
        prompt,
        Field::Prompt,
        " What do you want to ask the AI Assistant? ",
        &view.prompt_field,
    );
    render_submit(app, frame, submit, view.submit_enabled);
    render_response(frame, response, &view.response_text, view.waiting);
    render_footer(app, frame, footer);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let model = app.control.state().configuration().model;
    let line = Line::from(vec![
        Span::styled(" AI Assistant ", Style::default().bold().fg(Color::Black).bg(Color::LightRed)),
        Span::raw("  "),
        Span::styled(model.display_name(), Style::default().fg(Color::Cyan)),
        Span::styled(format!(" ({})", model), Style::default().dim()),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_field(
    app: &App,
    frame: &mut Frame,
    area: Rect,
    field: Field,
    title: &str,
    view: &FieldView,
) {
    let focused = match field {
        Field::System => app.focus == Focus::System,
        Field::Prompt => app.focus == Focus::Prompt,
    };
    let editing = focused && app.input_mode == InputMode::Editing && !view.disabled;

    let border_style = if editing {
        Style::default().fg(Color::Yellow)
    } else if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::Gray)
    };
    let text_style = if view.disabled {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(title);
    let inner = block.inner(area);

    if editing {
        let (visible, cursor_x) = scroll_to_cursor(&view.value, app.cursor(field), inner.width);
        frame.render_widget(Paragraph::new(visible).style(text_style).block(block), area);
        frame.set_cursor_position(Position::new(inner.x + cursor_x, inner.y));
    } else {
        frame.render_widget(
            Paragraph::new(view.value.as_str()).style(text_style).block(block),
            area,
        );
    }
}

fn render_submit(app: &App, frame: &mut Frame, area: Rect, enabled: bool) {
    let label = if enabled {
        " Submit ".to_string()
    } else {
        format!(" {} waiting ", SPINNER[app.animation_frame as usize % SPINNER.len()])
    };

    let style = if !enabled {
        Style::default().fg(Color::DarkGray).bg(Color::Gray)
    } else if app.focus == Focus::Submit {
        Style::default().fg(Color::Black).bg(Color::LightRed).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Black).bg(Color::LightRed)
    };

    let [button, _] = Layout::horizontal([Constraint::Length(16), Constraint::Min(0)]).areas(area);
    let block = Block::default().borders(Borders::ALL).border_style(style);
    frame.render_widget(
        Paragraph::new(Span::styled(label, style)).centered().block(block),
        button,
    );
}

fn render_response(frame: &mut Frame, area: Rect, text: &str, waiting: bool) {
    let text_style = if waiting {
        Style::default().dim().italic()
    } else {
        Style::default()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if waiting { Color::Yellow } else { Color::Gray }))
        .title(" Response ");
    frame.render_widget(
        Paragraph::new(text).style(text_style).wrap(Wrap { trim: false }).block(block),
        area,
    );
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let line = if let Some(notice) = &app.notice {
        Line::from(Span::styled(notice.as_str(), Style::default().fg(Color::Yellow)))
    } else if let Some(event) = &app.last_event {
        let (label, color) = match event.outcome {
            RunOutcome::Succeeded => ("answered", Color::Green),
            RunOutcome::Failed => ("failed", Color::Red),
        };
        Line::from(vec![
            Span::styled(format!("{} ", event.name), Style::default().dim()),
            Span::styled(label, Style::default().fg(color)),
        ])
    } else {
        Line::from(Span::styled(
            "Enter submit · Tab focus · Esc normal mode · F2 model · F3 persona lock · Ctrl-S save · q quit",
            Style::default().dim(),
        ))
    };
    frame.render_widget(Paragraph::new(line), area);
}
