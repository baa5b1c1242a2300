use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    MoveDown,
    MoveUp,
    PageDown,
    PageUp,
    JumpFirst,
    JumpLast,
    NextTab,
    PrevTab,
    JumpTab(usize),
    StartSearch,
    CycleType,
    Activate,
    ToggleExpand,
    Like,
    Publish,
    Edit,
    Delete,
    ClearAll,
    NewEntry,
    NewWhite,
    NewRed,
    QuickAdd,
    Import,
    Export,
    ToggleTheme,
    AddField,
    Submit,
    Reload,
    Confirm,
    InputChar(char),
    Backspace,
    CursorLeft,
    CursorRight,
    CursorStart,
    CursorEnd,
    KillToEnd,
    ToggleHelp,
    Dismiss,
    Noop,
}

pub fn map_key_with_input_mode(key: KeyEvent, input_mode_active: bool) -> KeyAction {
    if input_mode_active {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('a') {
            return KeyAction::CursorStart;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('e') {
            return KeyAction::CursorEnd;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('k') {
            return KeyAction::KillToEnd;
        }
        return match key.code {
            KeyCode::Enter => KeyAction::Activate,
            KeyCode::Esc => KeyAction::Dismiss,
            KeyCode::Backspace => KeyAction::Backspace,
            KeyCode::Left => KeyAction::CursorLeft,
            KeyCode::Right => KeyAction::CursorRight,
            KeyCode::Char(c) if !c.is_control() => KeyAction::InputChar(c),
            _ => KeyAction::Noop,
        };
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return KeyAction::Quit;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
        return KeyAction::Submit;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('d') {
        return KeyAction::PageDown;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('u') {
        return KeyAction::PageUp;
    }
    match key.code {
        KeyCode::Char('q') => KeyAction::Quit,
        KeyCode::Char('/') => KeyAction::StartSearch,
        KeyCode::Char('f') => KeyAction::CycleType,
        KeyCode::Enter => KeyAction::Activate,
        KeyCode::Char(' ') => KeyAction::ToggleExpand,
        KeyCode::Char('l') => KeyAction::Like,
        KeyCode::Char('p') => KeyAction::Publish,
        KeyCode::Char('e') => KeyAction::Edit,
        KeyCode::Char('d') | KeyCode::Delete => KeyAction::Delete,
        KeyCode::Char('D') => KeyAction::ClearAll,
        KeyCode::Char('n') => KeyAction::NewEntry,
        KeyCode::Char('W') => KeyAction::NewWhite,
        KeyCode::Char('R') => KeyAction::NewRed,
        KeyCode::Char('a') => KeyAction::QuickAdd,
        KeyCode::Char('i') => KeyAction::Import,
        KeyCode::Char('x') => KeyAction::Export,
        KeyCode::Char('t') => KeyAction::ToggleTheme,
        KeyCode::Char('+') => KeyAction::AddField,
        KeyCode::Char('r') => KeyAction::Reload,
        KeyCode::Char('y') => KeyAction::Confirm,
        KeyCode::Char('j') | KeyCode::Down => KeyAction::MoveDown,
        KeyCode::Char('k') | KeyCode::Up => KeyAction::MoveUp,
        KeyCode::PageDown => KeyAction::PageDown,
        KeyCode::PageUp => KeyAction::PageUp,
        KeyCode::Char('g') | KeyCode::Home => KeyAction::JumpFirst,
        KeyCode::Char('G') | KeyCode::End => KeyAction::JumpLast,
        KeyCode::Tab | KeyCode::Char(']') => KeyAction::NextTab,
        KeyCode::BackTab | KeyCode::Char('[') => KeyAction::PrevTab,
        KeyCode::Char('1') => KeyAction::JumpTab(1),
        KeyCode::Char('2') => KeyAction::JumpTab(2),
        KeyCode::Char('3') => KeyAction::JumpTab(3),
        KeyCode::Char('4') => KeyAction::JumpTab(4),
        KeyCode::Char('5') => KeyAction::JumpTab(5),
        KeyCode::Char('?') => KeyAction::ToggleHelp,
        KeyCode::Esc => KeyAction::Dismiss,
        _ => KeyAction::Noop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn input_mode_treats_letters_as_text() {
        assert_eq!(
            map_key_with_input_mode(key(KeyCode::Char('l')), true),
            KeyAction::InputChar('l')
        );
        assert_eq!(
            map_key_with_input_mode(key(KeyCode::Char('q')), true),
            KeyAction::InputChar('q')
        );
    }

    #[test]
    fn normal_mode_maps_row_actions() {
        assert_eq!(map_key_with_input_mode(key(KeyCode::Char('l')), false), KeyAction::Like);
        assert_eq!(
            map_key_with_input_mode(key(KeyCode::Char('p')), false),
            KeyAction::Publish
        );
        assert_eq!(
            map_key_with_input_mode(key(KeyCode::Char(' ')), false),
            KeyAction::ToggleExpand
        );
        assert_eq!(
            map_key_with_input_mode(key(KeyCode::Char('3')), false),
            KeyAction::JumpTab(3)
        );
    }

    #[test]
    fn ctrl_s_submits_form() {
        let ctrl_s = KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL);
        assert_eq!(map_key_with_input_mode(ctrl_s, false), KeyAction::Submit);
    }

    #[test]
    fn enter_and_esc_in_input_mode() {
        assert_eq!(map_key_with_input_mode(key(KeyCode::Enter), true), KeyAction::Activate);
        assert_eq!(map_key_with_input_mode(key(KeyCode::Esc), true), KeyAction::Dismiss);
        let ctrl_k = KeyEvent::new(KeyCode::Char('k'), KeyModifiers::CONTROL);
        assert_eq!(map_key_with_input_mode(ctrl_k, true), KeyAction::KillToEnd);
    }
}
