use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, Focus, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Host-side reconfiguration works in every mode.
    match key.code {
        KeyCode::F(2) => return app.cycle_model(),
        KeyCode::F(3) => return app.toggle_system_edit(),
        KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return app.save_settings();
        }
        _ => {}
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Tab | KeyCode::Down | KeyCode::Char('j') => app.focus_next(),
        KeyCode::BackTab | KeyCode::Up | KeyCode::Char('k') => app.focus_prev(),
        KeyCode::Enter | KeyCode::Char(' ') if app.focus == Focus::Submit => app.submit(),
        KeyCode::Enter | KeyCode::Char('i') => {
            if app.focused_field().is_some() {
                app.input_mode = InputMode::Editing;
            }
        }
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        app.input_mode = InputMode::Normal;
        return;
    }
    if key.code == KeyCode::Tab {
        app.focus_next();
        if app.focused_field().is_none() {
            app.input_mode = InputMode::Normal;
        }
        return;
    }

    let Some(field) = app.focused_field() else {
        app.input_mode = InputMode::Normal;
        return;
    };

    match key.code {
        KeyCode::Enter => app.submit(),
        KeyCode::Backspace => app.edit_field(field, |text, cursor| {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }),
        KeyCode::Delete => app.edit_field(field, |text, cursor| {
            if *cursor < text.chars().count() {
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }),
        KeyCode::Left => app.edit_field(field, |_, cursor| {
            *cursor = cursor.saturating_sub(1);
        }),
        KeyCode::Right => app.edit_field(field, |_, cursor| *cursor += 1),
        KeyCode::Home => app.edit_field(field, |_, cursor| *cursor = 0),
        KeyCode::End => app.edit_field(field, |text, cursor| *cursor = text.chars().count()),
        KeyCode::Char(c) => app.edit_field(field, |text, cursor| {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }),
        _ => {}
    }
}
