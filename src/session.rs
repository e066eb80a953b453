use std::cell::Cell;
use std::rc::Rc;

/// What kind of element currently holds input focus, as reported by the
/// embedding UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusTarget {
    /// An ordinary, non-editable element
    #[default]
    Element,
    TextInput,
    TextArea,
    ContentEditable,
}

impl FocusTarget {
    /// True when ordinary typing is expected, so single-key shortcuts must
    /// stay out of the way
    pub fn is_text_entry(self) -> bool {
        !matches!(self, FocusTarget::Element)
    }
}

/// Query the dispatcher runs before firing a single-key shortcut
pub type FocusQuery = Rc<dyn Fn() -> FocusTarget>;

/// Process-wide UI session state: the two overlay-visibility flags.
///
/// Created once per application session and injected into the dispatcher,
/// which is the sole writer; any UI surface may read the flags. Single
/// thread, so plain `Cell`s suffice.
#[derive(Debug, Default)]
pub struct UiSessionState {
    command_palette_open: Cell<bool>,
    shortcut_dialog_open: Cell<bool>,
}

impl UiSessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_command_palette_open(&self) -> bool {
        self.command_palette_open.get()
    }

    pub fn open_command_palette(&self) {
        self.command_palette_open.set(true);
    }

    pub fn close_command_palette(&self) {
        self.command_palette_open.set(false);
    }

    pub fn is_shortcut_dialog_open(&self) -> bool {
        self.shortcut_dialog_open.get()
    }

    pub fn open_shortcut_dialog(&self) {
        self.shortcut_dialog_open.set(true);
    }

    pub fn close_shortcut_dialog(&self) {
        self.shortcut_dialog_open.set(false);
    }
}
