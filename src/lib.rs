//! Keyboard-shortcut dispatch engine.
//!
//! Binds symbolic key combinations and ordered key sequences (vim-style
//! `g` then `h`) to actions, and decides on every raw key event whether a
//! registered action should fire. The sequence-matching state machine
//! tolerates key repeat and overlapping presses, coexists with single-key
//! shortcuts and global combos, and stays quiet while a text-entry control
//! holds focus.

pub mod config;
pub mod defaults;
pub mod key_source;
pub mod key_token;
pub mod logging;
pub mod registry;
pub mod sequence_matcher;
pub mod session;
pub mod shortcut;
