use crate::key_source::{KeyEventHub, Subscription};
use crate::key_token::KeyToken;
use crate::sequence_matcher::SequenceMatcher;
use crate::session::{FocusQuery, FocusTarget, UiSessionState};
use crate::shortcut::{Shortcut, ShortcutInfo};
use anyhow::{bail, Result};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info, trace};

/// Key that dismisses whichever overlay is open, command palette first
pub const DISMISS_KEY: &str = "Escape";

/// Synonyms that open the command palette
pub const PALETTE_KEYS: [&str; 2] = ["Meta+k", "Ctrl+k"];

/// Live progress of one registered sequence shortcut, for help and debug
/// surfaces
#[derive(Debug, Clone)]
pub struct SequenceProgress {
    pub shortcut_id: String,
    pub sequence: Vec<KeyToken>,
    pub cursor: usize,
}

/// Owns the registered shortcut list and decides, per key event, whether a
/// shortcut fires.
///
/// Multi-key shortcuts get a [`SequenceMatcher`] driven by the hub's change
/// notifications; single-key shortcuts subscribe to the token's press signal
/// and pass through the focus guard first. Two fixtures live outside the
/// generic list: Escape closes the topmost overlay (palette before help
/// dialog), and the palette-open combos set the palette flag without
/// toggling it. Those are wired once at construction and survive
/// re-registration.
pub struct ShortcutRegistry {
    hub: Rc<KeyEventHub>,
    session: Rc<UiSessionState>,
    focus: FocusQuery,
    shortcuts: Vec<ShortcutInfo>,
    matchers: Vec<(String, Rc<RefCell<SequenceMatcher>>)>,
    subscriptions: Vec<Subscription>,
    global_subscriptions: Vec<Subscription>,
}

impl ShortcutRegistry {
    /// Registry without a focus concept: single-key shortcuts always fire
    pub fn new(hub: Rc<KeyEventHub>, session: Rc<UiSessionState>) -> Self {
        Self::with_focus_query(hub, session, Rc::new(|| FocusTarget::Element))
    }

    pub fn with_focus_query(
        hub: Rc<KeyEventHub>,
        session: Rc<UiSessionState>,
        focus: FocusQuery,
    ) -> Self {
        let mut registry = Self {
            hub,
            session,
            focus,
            shortcuts: Vec::new(),
            matchers: Vec::new(),
            subscriptions: Vec::new(),
            global_subscriptions: Vec::new(),
        };
        registry.wire_overlay_keys();
        registry
    }

    // The dismiss key and the palette-open synonyms sit outside the shortcut
    // list; the focus guard does not apply to them.
    fn wire_overlay_keys(&mut self) {
        let session = Rc::clone(&self.session);
        let dismiss = self.hub.subscribe_press(&DISMISS_KEY.into(), move || {
            if session.is_command_palette_open() {
                session.close_command_palette();
            } else if session.is_shortcut_dialog_open() {
                session.close_shortcut_dialog();
            }
        });
        self.global_subscriptions.extend(dismiss);

        for key in PALETTE_KEYS {
            let session = Rc::clone(&self.session);
            let sub = self
                .hub
                .subscribe_press(&key.into(), move || session.open_command_palette());
            match sub {
                Some(sub) => self.global_subscriptions.push(sub),
                None => debug!(target: "registry", "no key signal for palette combo '{}'", key),
            }
        }
    }

    /// Replace the registered shortcut list.
    ///
    /// The whole list is validated before any rewiring happens, so a bad
    /// list leaves the previous registration intact. On success every
    /// previous binding is unwired first; no duplicate firing can result
    /// from repeated registration.
    pub fn register(&mut self, shortcuts: Vec<Shortcut>) -> Result<()> {
        for shortcut in &shortcuts {
            if shortcut.sequence.is_empty() {
                bail!("shortcut '{}' has an empty key sequence", shortcut.id);
            }
        }

        self.unwire_shortcuts();

        let mut infos = Vec::with_capacity(shortcuts.len());
        for shortcut in shortcuts {
            infos.push(ShortcutInfo::from(&shortcut));
            if shortcut.is_sequence() {
                self.wire_sequence(shortcut)?;
            } else {
                self.wire_single_key(shortcut);
            }
        }
        self.shortcuts = infos;
        info!(target: "registry", "registered {} shortcuts", self.shortcuts.len());
        Ok(())
    }

    fn wire_sequence(&mut self, shortcut: Shortcut) -> Result<()> {
        let mut matcher = SequenceMatcher::new(shortcut.sequence.clone())?;
        matcher.subscribe(Rc::clone(&shortcut.action));
        let matcher = Rc::new(RefCell::new(matcher));

        let driven = Rc::clone(&matcher);
        let sub = self
            .hub
            .subscribe_changes(move |held| driven.borrow_mut().evaluate(held));
        self.subscriptions.push(sub);
        self.matchers.push((shortcut.id, matcher));
        Ok(())
    }

    fn wire_single_key(&mut self, shortcut: Shortcut) {
        let token = shortcut.sequence[0].clone();
        let focus = Rc::clone(&self.focus);
        let action = Rc::clone(&shortcut.action);
        let id = shortcut.id.clone();

        let sub = self.hub.subscribe_press(&token, move || {
            if focus().is_text_entry() {
                trace!(target: "registry", "'{}' suppressed: text entry has focus", id);
                return;
            }
            action();
        });
        match sub {
            // Unsupported tokens degrade to unbound shortcuts; the rest of
            // the registry proceeds
            Some(sub) => self.subscriptions.push(sub),
            None => debug!(
                target: "registry",
                "no key signal for '{}', shortcut '{}' left unbound", token, shortcut.id
            ),
        }
    }

    /// Descriptors of the currently registered shortcuts, in registration
    /// order
    pub fn shortcuts(&self) -> &[ShortcutInfo] {
        &self.shortcuts
    }

    /// Cursor positions of all sequence matchers, in registration order
    pub fn sequence_progress(&self) -> Vec<SequenceProgress> {
        self.matchers
            .iter()
            .map(|(id, matcher)| {
                let matcher = matcher.borrow();
                SequenceProgress {
                    shortcut_id: id.clone(),
                    sequence: matcher.target().to_vec(),
                    cursor: matcher.cursor(),
                }
            })
            .collect()
    }

    fn unwire_shortcuts(&mut self) {
        for sub in self.subscriptions.drain(..) {
            self.hub.unsubscribe(&sub);
        }
        self.matchers.clear();
    }

    /// Stop all event delivery, including the overlay keys. Idempotent.
    pub fn teardown(&mut self) {
        self.unwire_shortcuts();
        for sub in self.global_subscriptions.drain(..) {
            self.hub.unsubscribe(&sub);
        }
        self.shortcuts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn hub_with_standard_keys() -> Rc<KeyEventHub> {
        Rc::new(KeyEventHub::with_keys([
            "Escape", "Meta+k", "Ctrl+k", "g", "h", "s", "t", "?",
        ]))
    }

    #[test]
    fn test_dismiss_closes_palette_before_dialog() {
        let hub = hub_with_standard_keys();
        let session = Rc::new(UiSessionState::new());
        let _registry = ShortcutRegistry::new(Rc::clone(&hub), Rc::clone(&session));

        session.open_command_palette();
        session.open_shortcut_dialog();

        hub.key_down("Escape".into());
        hub.key_up(&"Escape".into());
        assert!(!session.is_command_palette_open());
        assert!(session.is_shortcut_dialog_open());

        hub.key_down("Escape".into());
        assert!(!session.is_shortcut_dialog_open());
    }

    #[test]
    fn test_palette_combos_are_synonyms_and_not_toggles() {
        let hub = hub_with_standard_keys();
        let session = Rc::new(UiSessionState::new());
        let _registry = ShortcutRegistry::new(Rc::clone(&hub), Rc::clone(&session));

        hub.key_down("Ctrl+k".into());
        hub.key_up(&"Ctrl+k".into());
        assert!(session.is_command_palette_open());

        // A second activation while open has no additional effect
        hub.key_down("Meta+k".into());
        hub.key_up(&"Meta+k".into());
        assert!(session.is_command_palette_open());
    }

    #[test]
    fn test_unknown_token_skipped_without_failing_registration() {
        let hub = hub_with_standard_keys();
        let session = Rc::new(UiSessionState::new());
        let mut registry = ShortcutRegistry::new(Rc::clone(&hub), session);

        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        let result = registry.register(vec![
            Shortcut::new("odd", "Odd binding", ["VolumeUp"], Rc::new(|| {})),
            Shortcut::new("search", "Search", ["s"], Rc::new(move || f.set(f.get() + 1))),
        ]);
        assert!(result.is_ok());
        assert_eq!(registry.shortcuts().len(), 2);

        hub.key_down("s".into());
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_empty_sequence_rejected_and_previous_list_kept() {
        let hub = hub_with_standard_keys();
        let session = Rc::new(UiSessionState::new());
        let mut registry = ShortcutRegistry::new(Rc::clone(&hub), session);

        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        registry
            .register(vec![Shortcut::new(
                "search",
                "Search",
                ["s"],
                Rc::new(move || f.set(f.get() + 1)),
            )])
            .unwrap();

        let result = registry.register(vec![Shortcut::new(
            "broken",
            "Broken",
            Vec::<KeyToken>::new(),
            Rc::new(|| {}),
        )]);
        assert!(result.is_err());

        // The earlier registration is still wired
        hub.key_down("s".into());
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let hub = hub_with_standard_keys();
        let session = Rc::new(UiSessionState::new());
        let mut registry = ShortcutRegistry::new(Rc::clone(&hub), Rc::clone(&session));
        registry
            .register(vec![Shortcut::new("search", "Search", ["s"], Rc::new(|| {}))])
            .unwrap();

        registry.teardown();
        registry.teardown();

        session.open_command_palette();
        hub.key_down("Escape".into());
        assert!(session.is_command_palette_open());
    }
}
