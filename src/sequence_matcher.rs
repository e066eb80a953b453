use crate::key_source::HeldKeySet;
use crate::key_token::KeyToken;
use anyhow::{bail, Result};
use std::rc::Rc;
use tracing::{debug, trace};

/// Detects an ordered key sequence (e.g. `g` then `h`) in a stream of
/// held-key-set changes.
///
/// Call [`evaluate`](Self::evaluate) on every mutation of the held-key set.
/// [`matched`](Self::matched) pulses true for exactly one evaluation when the
/// sequence completes and is cleared on the next; subscribers are notified
/// once, on that edge. Progress is broken only by an intervening unrelated
/// keypress, never by time: releasing everything mid-sequence keeps the
/// cursor where it is.
///
/// The latch remembers which token's physical press last advanced the cursor
/// and blocks further advancement until that token is released, so one press
/// contributes exactly one advancement no matter how many change events fire
/// while the key stays held.
pub struct SequenceMatcher {
    target: Vec<KeyToken>,
    cursor: usize,
    latched: Option<KeyToken>,
    matched: bool,
    listeners: Vec<Rc<dyn Fn()>>,
}

impl SequenceMatcher {
    /// Create a matcher for `target`. An empty target is a caller contract
    /// violation and is rejected here.
    pub fn new(target: Vec<KeyToken>) -> Result<Self> {
        if target.is_empty() {
            bail!("sequence matcher requires at least one key-token");
        }
        Ok(Self {
            target,
            cursor: 0,
            latched: None,
            matched: false,
            listeners: Vec::new(),
        })
    }

    pub fn target(&self) -> &[KeyToken] {
        &self.target
    }

    /// Index of the next token the matcher is waiting for, in
    /// `[0, target.len())`
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// One-shot match flag from the most recent evaluation
    pub fn matched(&self) -> bool {
        self.matched
    }

    /// Subscribe to the match pulse; invoked synchronously inside
    /// [`evaluate`](Self::evaluate) each time the sequence completes
    pub fn subscribe(&mut self, listener: Rc<dyn Fn()>) {
        self.listeners.push(listener);
    }

    /// Re-evaluate against the current held-key set.
    pub fn evaluate(&mut self, held: &HeldKeySet) {
        // The pulse lasts exactly one evaluation cycle
        if self.matched {
            self.matched = false;
        }

        let Some(target) = self.target.get(self.cursor) else {
            return;
        };

        if held.contains(target) && self.latched.is_none() {
            self.latched = Some(target.clone());
            self.cursor += 1;
            trace!(
                target: "matcher",
                "advanced to {}/{} on '{}'",
                self.cursor,
                self.target.len(),
                target
            );
        } else if self.latched.as_ref().is_some_and(|key| !held.contains(key)) {
            // The latched key was released: re-arm so the same key can
            // advance the cursor again later
            self.latched = None;
        } else if held
            .iter()
            .any(|key| key != target && Some(key) != self.latched.as_ref())
        {
            // A key unrelated to the sequence is down: progress is broken.
            // An empty set, the still-latched previous key, or the target
            // itself all fall through, preserving partial progress.
            if self.cursor > 0 {
                debug!(target: "matcher", "off-sequence key, resetting progress");
            }
            self.cursor = 0;
        }

        if self.cursor == self.target.len() {
            self.matched = true;
            self.cursor = 0;
            debug!(target: "matcher", "sequence {:?} completed", self.target);
            for listener in &self.listeners {
                listener();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn matcher(tokens: &[&str]) -> SequenceMatcher {
        SequenceMatcher::new(tokens.iter().map(|t| KeyToken::from(*t)).collect()).unwrap()
    }

    fn held(tokens: &[&str]) -> HeldKeySet {
        tokens.iter().copied().collect()
    }

    #[test]
    fn test_empty_target_rejected() {
        assert!(SequenceMatcher::new(Vec::new()).is_err());
    }

    #[test]
    fn test_single_advancement_per_press() {
        let mut m = matcher(&["a", "b"]);
        // N change events while 'a' stays held advance the cursor once
        for _ in 0..5 {
            m.evaluate(&held(&["a"]));
        }
        assert_eq!(m.cursor(), 1);
        assert!(!m.matched());
    }

    #[test]
    fn test_full_sequence_with_releases() {
        let mut m = matcher(&["g", "h"]);
        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        m.subscribe(Rc::new(move || f.set(f.get() + 1)));

        m.evaluate(&held(&["g"]));
        m.evaluate(&held(&[])); // release g; progress survives
        assert_eq!(m.cursor(), 1);
        m.evaluate(&held(&["h"]));
        assert!(m.matched());
        assert_eq!(fired.get(), 1);
        m.evaluate(&held(&[]));
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_off_sequence_reset() {
        let mut m = matcher(&["a", "b"]);
        m.evaluate(&held(&["a"]));
        m.evaluate(&held(&[]));
        assert_eq!(m.cursor(), 1);

        m.evaluate(&held(&["c"]));
        assert_eq!(m.cursor(), 0);
    }

    #[test]
    fn test_target_key_advances_even_with_unrelated_key_alongside() {
        let mut m = matcher(&["a", "b"]);
        m.evaluate(&held(&["a"]));
        m.evaluate(&held(&[]));
        // Advancement takes priority: 'b' down with 'x' alongside completes
        m.evaluate(&held(&["b", "x"]));
        assert!(m.matched());
        assert_eq!(m.cursor(), 0);
    }

    #[test]
    fn test_unrelated_key_while_latched_resets() {
        let mut m = matcher(&["a", "b"]);
        m.evaluate(&held(&["a"]));
        assert_eq!(m.cursor(), 1);
        // 'x' joins while 'a' is still held and latched: progress is gone
        m.evaluate(&held(&["a", "x"]));
        assert_eq!(m.cursor(), 0);
        assert!(!m.matched());
    }

    #[test]
    fn test_empty_set_preserves_progress() {
        let mut m = matcher(&["a", "b"]);
        m.evaluate(&held(&["a"]));
        m.evaluate(&held(&[]));
        m.evaluate(&held(&[]));
        m.evaluate(&held(&[]));
        assert_eq!(m.cursor(), 1);
    }

    #[test]
    fn test_one_shot_pulse() {
        let mut m = matcher(&["a"]);
        m.evaluate(&held(&["a"]));
        assert!(m.matched());
        // Next evaluation clears the pulse even when nothing else changed
        m.evaluate(&held(&["a"]));
        assert!(!m.matched());
    }

    #[test]
    fn test_rearm_after_match() {
        let mut m = matcher(&["a", "b"]);
        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        m.subscribe(Rc::new(move || f.set(f.get() + 1)));

        for _ in 0..2 {
            m.evaluate(&held(&["a"]));
            m.evaluate(&held(&[]));
            m.evaluate(&held(&["b"]));
            m.evaluate(&held(&[]));
        }
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn test_held_key_does_not_retrigger_advance() {
        let mut m = matcher(&["a", "a"]);
        // One long press of 'a' is a single advancement, not two
        m.evaluate(&held(&["a"]));
        m.evaluate(&held(&["a"]));
        assert_eq!(m.cursor(), 1);
        assert!(!m.matched());

        // Release then press again completes the double-tap
        m.evaluate(&held(&[]));
        m.evaluate(&held(&["a"]));
        assert!(m.matched());
    }

    #[test]
    fn test_overlapping_presses_wait_for_release() {
        let mut m = matcher(&["g", "h"]);
        m.evaluate(&held(&["g"]));
        // 'h' pressed while 'g' is still latched: no advance, no reset
        m.evaluate(&held(&["g", "h"]));
        assert_eq!(m.cursor(), 1);
        // releasing 'g' re-arms the latch
        m.evaluate(&held(&["h"]));
        assert_eq!(m.cursor(), 1);
        assert!(!m.matched());
        // a fresh press of 'h' completes the sequence
        m.evaluate(&held(&[]));
        m.evaluate(&held(&["h"]));
        assert!(m.matched());
    }

    #[test]
    fn test_single_key_sequence() {
        let mut m = matcher(&["t"]);
        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        m.subscribe(Rc::new(move || f.set(f.get() + 1)));

        m.evaluate(&held(&["t"]));
        assert_eq!(fired.get(), 1);
        m.evaluate(&held(&[]));
        m.evaluate(&held(&["t"]));
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn test_three_key_sequence() {
        let mut m = matcher(&["g", "o", "d"]);
        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        m.subscribe(Rc::new(move || f.set(f.get() + 1)));

        for key in ["g", "o", "d"] {
            m.evaluate(&held(&[key]));
            m.evaluate(&held(&[]));
        }
        assert_eq!(fired.get(), 1);
    }
}
