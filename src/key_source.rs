use crate::key_token::KeyToken;
use chrono::Local;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use tracing::trace;

/// Maximum number of key presses to keep in the hub's history
const MAX_KEY_HISTORY: usize = 50;

/// The live set of key-tokens currently pressed.
///
/// The [`KeyEventHub`] owns and mutates the live instance; everything else
/// (matchers, listeners) receives it read-only.
#[derive(Debug, Clone, Default)]
pub struct HeldKeySet {
    keys: HashSet<KeyToken>,
}

impl HeldKeySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, token: &KeyToken) -> bool {
        self.keys.contains(token)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn insert(&mut self, token: KeyToken) -> bool {
        self.keys.insert(token)
    }

    pub fn remove(&mut self, token: &KeyToken) -> bool {
        self.keys.remove(token)
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyToken> {
        self.keys.iter()
    }

    /// Held tokens in sorted order, for stable display
    pub fn tokens(&self) -> Vec<KeyToken> {
        let mut tokens: Vec<KeyToken> = self.keys.iter().cloned().collect();
        tokens.sort();
        tokens
    }
}

impl<T: Into<KeyToken>> FromIterator<T> for HeldKeySet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Handle returned by the hub's subscribe operations.
///
/// Passing it back to [`KeyEventHub::unsubscribe`] stops future delivery;
/// unsubscribing twice is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: u64,
}

type ChangeListener = Rc<RefCell<dyn FnMut(&HeldKeySet)>>;
type PressListener = Rc<RefCell<dyn FnMut()>>;

/// The key-event aggregator: owns the live [`HeldKeySet`], exposes change
/// notifications on every mutation of it, and edge-triggered press signals
/// for individual key-tokens.
///
/// Press signals exist only for tokens the hub has been told to support;
/// subscribing to anything else returns `None` so callers can degrade
/// gracefully. All delivery is synchronous on the calling thread: a
/// `key_down`/`key_up` call returns only after every listener has run.
pub struct KeyEventHub {
    held: RefCell<HeldKeySet>,
    supported: RefCell<HashSet<KeyToken>>,
    change_listeners: RefCell<Vec<(u64, ChangeListener)>>,
    press_listeners: RefCell<HashMap<KeyToken, Vec<(u64, PressListener)>>>,
    key_history: RefCell<VecDeque<String>>,
    next_id: Cell<u64>,
}

impl KeyEventHub {
    pub fn new() -> Self {
        Self {
            held: RefCell::new(HeldKeySet::new()),
            supported: RefCell::new(HashSet::new()),
            change_listeners: RefCell::new(Vec::new()),
            press_listeners: RefCell::new(HashMap::new()),
            key_history: RefCell::new(VecDeque::with_capacity(MAX_KEY_HISTORY)),
            next_id: Cell::new(0),
        }
    }

    /// Create a hub that exposes press signals for the given tokens
    pub fn with_keys<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<KeyToken>,
    {
        let hub = Self::new();
        for token in tokens {
            hub.support_key(token.into());
        }
        hub
    }

    /// Declare a token as one this hub can report presses for
    pub fn support_key(&self, token: KeyToken) {
        self.supported.borrow_mut().insert(token);
    }

    pub fn is_supported(&self, token: &KeyToken) -> bool {
        self.supported.borrow().contains(token)
    }

    /// Snapshot of the currently held tokens
    pub fn held_keys(&self) -> HeldKeySet {
        self.held.borrow().clone()
    }

    /// Subscribe to every mutation of the held-key set
    pub fn subscribe_changes(&self, listener: impl FnMut(&HeldKeySet) + 'static) -> Subscription {
        let id = self.next_subscription_id();
        self.change_listeners
            .borrow_mut()
            .push((id, Rc::new(RefCell::new(listener))));
        Subscription { id }
    }

    /// Subscribe to the rising edge of a single key-token.
    ///
    /// Returns `None` when the hub exposes no signal for that token.
    pub fn subscribe_press(
        &self,
        token: &KeyToken,
        listener: impl FnMut() + 'static,
    ) -> Option<Subscription> {
        if !self.is_supported(token) {
            return None;
        }
        let id = self.next_subscription_id();
        self.press_listeners
            .borrow_mut()
            .entry(token.clone())
            .or_default()
            .push((id, Rc::new(RefCell::new(listener))));
        Some(Subscription { id })
    }

    /// Stop future delivery to a listener. Idempotent.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        self.change_listeners
            .borrow_mut()
            .retain(|(id, _)| *id != subscription.id);
        let mut press = self.press_listeners.borrow_mut();
        for listeners in press.values_mut() {
            listeners.retain(|(id, _)| *id != subscription.id);
        }
        press.retain(|_, listeners| !listeners.is_empty());
    }

    /// Record a physical key-down.
    ///
    /// A key-down for an already-held token is key repeat: the set is
    /// unchanged, so neither press signals nor change listeners fire.
    pub fn key_down(&self, token: KeyToken) {
        let newly_pressed = self.held.borrow_mut().insert(token.clone());
        if !newly_pressed {
            trace!(target: "input", "repeat ignored: {}", token);
            return;
        }
        trace!(target: "input", "key down: {}", token);
        self.log_key_press(&token);
        self.notify_press(&token);
        self.notify_change();
    }

    /// Record a physical key-up
    pub fn key_up(&self, token: &KeyToken) {
        let was_held = self.held.borrow_mut().remove(token);
        if !was_held {
            return;
        }
        trace!(target: "input", "key up: {}", token);
        self.notify_change();
    }

    /// Timestamped history of recent key-downs, oldest first
    pub fn recent_keys(&self) -> Vec<String> {
        self.key_history.borrow().iter().cloned().collect()
    }

    pub fn clear_history(&self) {
        self.key_history.borrow_mut().clear();
    }

    fn log_key_press(&self, token: &KeyToken) {
        let mut history = self.key_history.borrow_mut();
        if history.len() >= MAX_KEY_HISTORY {
            history.pop_front();
        }
        let timestamp = Local::now().format("%H:%M:%S%.3f");
        history.push_back(format!("[{}] {}", timestamp, token));
    }

    fn next_subscription_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    // Listeners are invoked from a snapshot of the current list so that a
    // listener may subscribe, unsubscribe, or query the hub without hitting
    // a re-entrant borrow.
    fn notify_change(&self) {
        let held = self.held.borrow().clone();
        let listeners: Vec<ChangeListener> = self
            .change_listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            (listener.borrow_mut())(&held);
        }
    }

    fn notify_press(&self, token: &KeyToken) {
        let listeners: Vec<PressListener> = match self.press_listeners.borrow().get(token) {
            Some(listeners) => listeners
                .iter()
                .map(|(_, listener)| Rc::clone(listener))
                .collect(),
            None => return,
        };
        for listener in listeners {
            (listener.borrow_mut())();
        }
    }
}

impl Default for KeyEventHub {
    fn default() -> Self {
        Self::new()
    }
}
