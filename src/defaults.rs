use crate::key_token::KeyToken;
use crate::session::UiSessionState;
use crate::shortcut::{Shortcut, ShortcutAction};
use std::rc::Rc;

/// Navigation callback: receives the route path to go to
pub type NavigateAction = Rc<dyn Fn(&str)>;

/// The stock shortcut catalog.
///
/// Navigation and theme toggling belong to the embedding application, so
/// they arrive as opaque callbacks; the overlay-flag entries write straight
/// to the session state. The `open-command-palette` entry mirrors the combo
/// already wired at the dispatcher layer; its two-token form is primarily
/// what help surfaces display.
pub fn default_shortcuts(
    session: &Rc<UiSessionState>,
    navigate: NavigateAction,
    toggle_theme: ShortcutAction,
) -> Vec<Shortcut> {
    let dialog_session = Rc::clone(session);
    let palette_session = Rc::clone(session);
    let nav_home = Rc::clone(&navigate);
    let nav_about = navigate;

    vec![
        Shortcut::new(
            "show-shortcuts",
            "Show keyboard shortcuts",
            ["?"],
            Rc::new(move || dialog_session.open_shortcut_dialog()),
        )
        .with_description("Display all available keyboard shortcuts"),
        Shortcut::new(
            "open-command-palette",
            "Open command palette",
            ["Meta", "k"],
            Rc::new(move || palette_session.open_command_palette()),
        )
        .with_description("Open the command palette to search and execute commands"),
        Shortcut::new(
            "go-home",
            "Go to Home",
            ["g", "h"],
            Rc::new(move || nav_home("/")),
        )
        .with_description("Navigate to the home page"),
        Shortcut::new(
            "go-about",
            "Go to About",
            ["g", "a"],
            Rc::new(move || nav_about("/hi")),
        )
        .with_description("Navigate to the about page"),
        Shortcut::new(
            "search",
            "Search",
            ["s"],
            // Placeholder until search lands
            Rc::new(|| {}),
        )
        .with_description("Open search functionality"),
        Shortcut::new("toggle-theme", "Toggle Theme", ["t"], toggle_theme)
            .with_description("Switch between light and dark mode"),
    ]
}

/// The key-token vocabulary a standard keyboard source exposes press
/// signals for
pub fn standard_key_tokens() -> Vec<KeyToken> {
    let mut tokens: Vec<KeyToken> = ('a'..='z')
        .chain('0'..='9')
        .map(|c| KeyToken::new(c.to_string()))
        .collect();
    for name in [
        "?", "/", ".", ",", ";", "Escape", "Enter", "Tab", "Space", "Backspace", "ArrowUp",
        "ArrowDown", "ArrowLeft", "ArrowRight", "Meta", "Meta+k", "Ctrl+k",
    ] {
        tokens.push(KeyToken::from(name));
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_shape() {
        let session = Rc::new(UiSessionState::new());
        let shortcuts = default_shortcuts(&session, Rc::new(|_| {}), Rc::new(|| {}));

        let ids: Vec<&str> = shortcuts.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "show-shortcuts",
                "open-command-palette",
                "go-home",
                "go-about",
                "search",
                "toggle-theme"
            ]
        );

        let sequences: Vec<usize> = shortcuts.iter().map(|s| s.sequence.len()).collect();
        assert_eq!(sequences, vec![1, 2, 2, 2, 1, 1]);
    }

    #[test]
    fn test_show_shortcuts_opens_dialog() {
        let session = Rc::new(UiSessionState::new());
        let shortcuts = default_shortcuts(&session, Rc::new(|_| {}), Rc::new(|| {}));
        let show = shortcuts
            .iter()
            .find(|s| s.id == "show-shortcuts")
            .unwrap();

        (show.action)();
        assert!(session.is_shortcut_dialog_open());
    }

    #[test]
    fn test_standard_tokens_cover_the_catalog() {
        let tokens = standard_key_tokens();
        for needed in ["g", "h", "a", "s", "t", "?", "Escape", "Meta+k", "Ctrl+k"] {
            assert!(tokens.contains(&KeyToken::from(needed)), "missing {}", needed);
        }
    }
}
