use crate::key_token::KeyToken;
use serde::Serialize;
use std::fmt;
use std::rc::Rc;

/// Zero-argument callback invoked when a shortcut activates
pub type ShortcutAction = Rc<dyn Fn()>;

/// A registered shortcut: a single key-token or an ordered multi-key
/// sequence bound to an action. Immutable once registered.
#[derive(Clone)]
pub struct Shortcut {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub sequence: Vec<KeyToken>,
    pub action: ShortcutAction,
}

impl Shortcut {
    pub fn new<I, T>(
        id: impl Into<String>,
        name: impl Into<String>,
        sequence: I,
        action: ShortcutAction,
    ) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<KeyToken>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            sequence: sequence.into_iter().map(Into::into).collect(),
            action,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// True for ordered multi-key sequences (`g` then `h`), false for
    /// single-key shortcuts
    pub fn is_sequence(&self) -> bool {
        self.sequence.len() > 1
    }
}

impl fmt::Debug for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shortcut")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

/// Serializable descriptor for a registered shortcut, for help surfaces and
/// the debugger's `--list` dump
#[derive(Debug, Clone, Serialize)]
pub struct ShortcutInfo {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub sequence: Vec<KeyToken>,
}

impl From<&Shortcut> for ShortcutInfo {
    fn from(shortcut: &Shortcut) -> Self {
        Self {
            id: shortcut.id.clone(),
            name: shortcut.name.clone(),
            description: shortcut.description.clone(),
            sequence: shortcut.sequence.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_classification() {
        let noop: ShortcutAction = Rc::new(|| {});
        let single = Shortcut::new("search", "Search", ["s"], Rc::clone(&noop));
        let multi = Shortcut::new("go-home", "Go to Home", ["g", "h"], noop);

        assert!(!single.is_sequence());
        assert!(multi.is_sequence());
    }

    #[test]
    fn test_info_serializes_without_action() {
        let shortcut = Shortcut::new("go-home", "Go to Home", ["g", "h"], Rc::new(|| {}))
            .with_description("Navigate to the home page");
        let info = ShortcutInfo::from(&shortcut);
        let json = serde_json::to_value(&info).unwrap();

        assert_eq!(json["id"], "go-home");
        assert_eq!(json["sequence"][1], "h");
    }
}
