use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;

/// Handle a key event in the main view.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true
        }

        KeyCode::Char('j') | KeyCode::Down => app.move_selection_down(),
        KeyCode::Char('k') | KeyCode::Up => app.move_selection_up(),
        KeyCode::Char('g') | KeyCode::Home => app.move_selection_top(),
        KeyCode::Char('G') | KeyCode::End => app.move_selection_bottom(),

        KeyCode::Char('l') | KeyCode::Right => app.expand_selected(),
        KeyCode::Char('h') | KeyCode::Left => app.collapse_selected(),
        KeyCode::Enter => app.toggle_selected(),

        KeyCode::Char('.') => app.toggle_hidden(),
        KeyCode::Char('s') => app.cycle_sort(),
        KeyCode::Char('S') => app.toggle_sort_order(),
        KeyCode::Char('d') => app.toggle_dirs_first(),

        KeyCode::Char(' ') => app.toggle_mark_selected(),
        KeyCode::Char('c') => app.clear_marks(),

        KeyCode::Char('w') => app.watcher_active = !app.watcher_active,
        KeyCode::Char('R') => app.reload_all(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crossterm::event::{KeyEventKind, KeyEventState};
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[tokio::test]
    async fn quit_keys_set_flag() {
        let tmp = TempDir::new().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(tmp.path(), &AppConfig::default(), tx).unwrap();

        handle_key_event(&mut app, key(KeyCode::Char('q')));
        assert!(app.should_quit);

        app.should_quit = false;
        let ctrl_c = KeyEvent {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        };
        handle_key_event(&mut app, ctrl_c);
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn sort_key_cycles_attribute() {
        let tmp = TempDir::new().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(tmp.path(), &AppConfig::default(), tx).unwrap();

        assert_eq!(app.sort_by(), "name");
        handle_key_event(&mut app, key(KeyCode::Char('s')));
        assert_eq!(app.sort_by(), "size");
        handle_key_event(&mut app, key(KeyCode::Char('s')));
        assert_eq!(app.sort_by(), "type");
    }

    #[tokio::test]
    async fn watcher_toggle() {
        let tmp = TempDir::new().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(tmp.path(), &AppConfig::default(), tx).unwrap();

        assert!(app.watcher_active);
        handle_key_event(&mut app, key(KeyCode::Char('w')));
        assert!(!app.watcher_active);
    }
}
