//! # Selection State Machine
//!
//! [`MenuState`] holds everything one menu invocation mutates: the cursor,
//! the scroll offset, the size of the visible window and the typed input.
//! Keys are applied with [`MenuState::apply`], which reports what the
//! event loop has to do next.
//!
//! Invariants, for a store of `len` rows and `visible` lines:
//!
//! - `selected < len` when `len > 0`, otherwise `selected == offset == 0`
//! - `offset <= selected < offset + visible`
//! - `offset <= len.saturating_sub(visible)`

use super::keys::Key;
use super::layout;
use super::row::Row;
use super::store::ItemStore;

/// Result of applying one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// State may have changed; redraw and keep going.
    Continue,
    /// Characters were appended to the input and should be echoed.
    Echo(String),
    /// The last input character was removed; it took this many cells.
    Erased(usize),
    /// Emit a result and keep the menu open.
    Emit(String),
    /// Emit a result and close the menu.
    Submit(String),
    /// Close the menu without a result.
    Cancel,
}

#[derive(Debug, Clone)]
pub struct MenuState {
    selected: usize,
    offset: usize,
    lines: usize,
    visible: usize,
    width: usize,
    input: Vec<char>,
}

impl MenuState {
    /// State for a menu of at most `lines` rows on a `width` x `height`
    /// terminal.
    pub fn new(lines: usize, width: u16, height: u16) -> Self {
        let mut state = Self {
            selected: 0,
            offset: 0,
            lines,
            visible: 1,
            width: 0,
            input: Vec::new(),
        };
        state.resize(width, height, 0);
        state
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn visible(&self) -> usize {
        self.visible
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn input(&self) -> String {
        self.input.iter().collect()
    }

    /// Cells the typed input occupies on the input line.
    pub fn input_width(&self) -> usize {
        self.input.iter().copied().map(layout::char_width).sum()
    }

    /// Recompute the window for new terminal dimensions.
    pub fn resize(&mut self, width: u16, height: u16, len: usize) {
        self.width = usize::from(width);
        self.visible = self.lines.min(usize::from(height)).max(1);
        self.clamp(len);
    }

    /// Re-establish the invariants after the store changed size.
    ///
    /// The cursor keeps its numeric index when it can, so deleting the
    /// selected row selects whatever row slides into its slot.
    pub fn clamp(&mut self, len: usize) {
        if len == 0 {
            self.selected = 0;
            self.offset = 0;
            return;
        }
        self.selected = self.selected.min(len - 1);
        let lowest = (self.selected + 1).saturating_sub(self.visible);
        self.offset = self
            .offset
            .clamp(lowest, self.selected)
            .min(len.saturating_sub(self.visible));
    }

    pub fn apply<R: Row>(&mut self, key: Key, store: &ItemStore<R>) -> Outcome {
        let len = store.len();
        match key {
            Key::Down => self.down(len),
            Key::Up => self.up(),
            Key::Top => {
                self.offset = 0;
                self.selected = 0;
            }
            Key::Bottom => {
                self.offset = len.saturating_sub(self.visible);
                self.selected = len.saturating_sub(1);
            }
            Key::Backspace => {
                return match self.input.pop() {
                    Some(c) => Outcome::Erased(layout::char_width(c)),
                    None => Outcome::Continue,
                };
            }
            Key::SubmitText => return Outcome::Emit(self.input()),
            Key::Submit => return Outcome::Submit(self.choice(store)),
            Key::Cancel => return Outcome::Cancel,
            Key::Text(text) => {
                if text.is_empty() {
                    return Outcome::Continue;
                }
                self.input.extend(text.chars());
                return Outcome::Echo(text);
            }
        }
        Outcome::Continue
    }

    /// Identity of the selected row, or the typed text when nothing is
    /// selected.
    pub fn choice<R: Row>(&self, store: &ItemStore<R>) -> String {
        match store.get(self.selected) {
            Some(row) => row.identity().to_string(),
            None => self.input(),
        }
    }

    fn down(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        self.selected = (self.selected + 1).min(len - 1);
        if self.selected >= self.offset + self.visible {
            self.offset += 1;
        }
        self.offset = self.offset.min(len.saturating_sub(self.visible));
    }

    fn up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
        if self.selected <= self.offset {
            let lowest = (self.selected + 1).saturating_sub(self.visible);
            self.offset = self.offset.saturating_sub(1).max(lowest).min(self.selected);
        }
    }
}
