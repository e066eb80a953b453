use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque identifier for a key or modifier-combo (e.g. `"k"`, `"Ctrl+k"`,
/// `"Escape"`).
///
/// Equality is exact string match; the engine performs no normalization.
/// Whatever produces the tokens (the crossterm adapter below, a test, an
/// embedder with its own event source) is responsible for using a consistent
/// vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyToken(String);

impl KeyToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for KeyToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl From<String> for KeyToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Translate a crossterm key event into the canonical token string.
///
/// Modifier prefixes are emitted in the order `Ctrl+`, `Alt+`, `Meta+`.
/// Shift is folded into the character itself for printable keys (`?` is
/// `"?"`, not `"Shift+/"`) and only spelled out for non-character keys.
/// Returns `None` for keys this vocabulary has no name for (media keys,
/// bare modifier presses and the like).
pub fn token_from_key_event(event: &KeyEvent) -> Option<KeyToken> {
    let name = match event.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Escape".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::BackTab => "Tab".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::Delete => "Delete".to_string(),
        KeyCode::Insert => "Insert".to_string(),
        KeyCode::Up => "ArrowUp".to_string(),
        KeyCode::Down => "ArrowDown".to_string(),
        KeyCode::Left => "ArrowLeft".to_string(),
        KeyCode::Right => "ArrowRight".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::PageUp => "PageUp".to_string(),
        KeyCode::PageDown => "PageDown".to_string(),
        KeyCode::F(n) => format!("F{}", n),
        _ => return None,
    };

    let is_char = matches!(event.code, KeyCode::Char(_));

    let mut token = String::new();
    if event.modifiers.contains(KeyModifiers::CONTROL) {
        token.push_str("Ctrl+");
    }
    if event.modifiers.contains(KeyModifiers::ALT) {
        token.push_str("Alt+");
    }
    if event.modifiers.contains(KeyModifiers::SHIFT) && !is_char {
        token.push_str("Shift+");
    }
    if event.modifiers.contains(KeyModifiers::SUPER) {
        token.push_str("Meta+");
    }
    token.push_str(&name);

    Some(KeyToken(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_char() {
        let event = KeyEvent::new(KeyCode::Char('g'), KeyModifiers::empty());
        assert_eq!(token_from_key_event(&event), Some(KeyToken::from("g")));
    }

    #[test]
    fn test_shifted_char_keeps_its_face() {
        // '?' arrives as Char('?') with SHIFT set; the token is just "?"
        let event = KeyEvent::new(KeyCode::Char('?'), KeyModifiers::SHIFT);
        assert_eq!(token_from_key_event(&event), Some(KeyToken::from("?")));
    }

    #[test]
    fn test_modifier_prefixes() {
        let event = KeyEvent::new(KeyCode::Char('k'), KeyModifiers::CONTROL);
        assert_eq!(token_from_key_event(&event), Some(KeyToken::from("Ctrl+k")));

        let event = KeyEvent::new(KeyCode::Char('k'), KeyModifiers::SUPER);
        assert_eq!(token_from_key_event(&event), Some(KeyToken::from("Meta+k")));
    }

    #[test]
    fn test_named_keys() {
        let event = KeyEvent::new(KeyCode::Esc, KeyModifiers::empty());
        assert_eq!(token_from_key_event(&event), Some(KeyToken::from("Escape")));

        let event = KeyEvent::new(KeyCode::F(2), KeyModifiers::empty());
        assert_eq!(token_from_key_event(&event), Some(KeyToken::from("F2")));
    }

    #[test]
    fn test_unnamed_key() {
        let event = KeyEvent::new(KeyCode::CapsLock, KeyModifiers::empty());
        assert_eq!(token_from_key_event(&event), None);
    }
}
