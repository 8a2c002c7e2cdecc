//! # Key Decoding
//!
//! The terminal is read in raw mode, so every read returns the bytes of one
//! keystroke (or one paste). A chunk is matched as a whole against the
//! control and Meta sequences below; anything else is taken as text.
//!
//! | Bytes | Key |
//! |-------|-----|
//! | `^N` `^J` `M-n` `M-j` | [`Key::Down`] |
//! | `^P` `^K` `M-p` `M-k` | [`Key::Up`] |
//! | `^G` `M-g` | [`Key::Top`] |
//! | `M-G` | [`Key::Bottom`] |
//! | `^H` `^?` | [`Key::Backspace`] |
//! | `M-Enter` | [`Key::SubmitText`] |
//! | `Enter` (`^M`) | [`Key::Submit`] |
//! | `^D` `Esc` | [`Key::Cancel`] |

const ESC: u8 = 0x1b;

const fn ctrl(c: u8) -> u8 {
    c ^ 0x40
}

/// One decoded keystroke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Down,
    Up,
    Top,
    Bottom,
    Backspace,
    /// Emit the typed text and keep the menu open.
    SubmitText,
    /// Emit the selection (or the typed text) and close the menu.
    Submit,
    Cancel,
    /// Graphic characters to append to the input. May be empty when the
    /// chunk held nothing printable.
    Text(String),
}

impl Key {
    pub fn decode(chunk: &[u8]) -> Self {
        match chunk {
            [ESC, b'\n'] | [ESC, b'\r'] => Key::SubmitText,
            [c] if *c == ctrl(b'D') => Key::Cancel,
            [ESC] => Key::Cancel,
            [b'\r'] => Key::Submit,
            [c] if *c == ctrl(b'J') || *c == ctrl(b'N') => Key::Down,
            [ESC, b'j'] | [ESC, b'n'] => Key::Down,
            [c] if *c == ctrl(b'K') || *c == ctrl(b'P') => Key::Up,
            [ESC, b'k'] | [ESC, b'p'] => Key::Up,
            [c] if *c == ctrl(b'G') => Key::Top,
            [ESC, b'g'] => Key::Top,
            [ESC, b'G'] => Key::Bottom,
            [c] if *c == ctrl(b'?') || *c == ctrl(b'H') => Key::Backspace,
            _ => Key::Text(
                String::from_utf8_lossy(chunk)
                    .chars()
                    .filter(|&c| is_graphic(c))
                    .collect(),
            ),
        }
    }
}

/// Whether a character may be appended to the input buffer.
pub fn is_graphic(c: char) -> bool {
    !c.is_control() && c != char::REPLACEMENT_CHARACTER && !is_format(c)
}

// Zero-width format characters (Unicode category Cf) in the ranges terminals
// commonly receive.
fn is_format(c: char) -> bool {
    matches!(
        c,
        '\u{00ad}'
            | '\u{200b}'..='\u{200f}'
            | '\u{202a}'..='\u{202e}'
            | '\u{2060}'..='\u{2064}'
            | '\u{feff}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_bytes() {
        assert_eq!(Key::decode(&[0x04]), Key::Cancel);
        assert_eq!(Key::decode(&[0x1b]), Key::Cancel);
        assert_eq!(Key::decode(b"\r"), Key::Submit);
        assert_eq!(Key::decode(&[0x0e]), Key::Down);
        assert_eq!(Key::decode(b"\n"), Key::Down);
        assert_eq!(Key::decode(&[0x10]), Key::Up);
        assert_eq!(Key::decode(&[0x0b]), Key::Up);
        assert_eq!(Key::decode(&[0x07]), Key::Top);
        assert_eq!(Key::decode(&[0x08]), Key::Backspace);
        assert_eq!(Key::decode(&[0x7f]), Key::Backspace);
    }

    #[test]
    fn test_meta_sequences() {
        assert_eq!(Key::decode(b"\x1bj"), Key::Down);
        assert_eq!(Key::decode(b"\x1bn"), Key::Down);
        assert_eq!(Key::decode(b"\x1bk"), Key::Up);
        assert_eq!(Key::decode(b"\x1bp"), Key::Up);
        assert_eq!(Key::decode(b"\x1bg"), Key::Top);
        assert_eq!(Key::decode(b"\x1bG"), Key::Bottom);
        assert_eq!(Key::decode(b"\x1b\r"), Key::SubmitText);
        assert_eq!(Key::decode(b"\x1b\n"), Key::SubmitText);
    }

    #[test]
    fn test_text_keeps_only_graphic_characters() {
        assert_eq!(Key::decode(b"abc"), Key::Text("abc".to_string()));
        assert_eq!(Key::decode("héllo wörld".as_bytes()), Key::Text("héllo wörld".to_string()));
        assert_eq!(Key::decode(b"a\x01b\x1b[A"), Key::Text("ab[A".to_string()));
        assert_eq!(Key::decode(&[0xff, b'x']), Key::Text("x".to_string()));
        assert_eq!(Key::decode("a\u{200b}b".as_bytes()), Key::Text("ab".to_string()));
    }

    #[test]
    fn test_arrow_sequences_are_not_navigation() {
        // Only the Ctrl and Meta bindings navigate.
        assert_eq!(Key::decode(b"\x1b[B"), Key::Text("[B".to_string()));
    }
}
