//! Character cursor over an addressable input sequence.
//!
//! All offsets are logical character positions, not byte offsets. The
//! matching engine, finder and tokenizer only talk to the input through
//! this trait, so callers can supply their own buffer implementations.

/// Random-access cursor over a character sequence.
///
/// The position sits between characters: `current() == 0` means the next
/// `next()` call yields the first character.
pub trait Cursor {
    /// Current offset in characters.
    fn current(&self) -> usize;

    /// Reposition the cursor. Offsets past the end clamp to `len()`.
    fn move_to(&mut self, offset: usize);

    /// Consume and return the character at the current position.
    fn next(&mut self) -> Option<char>;

    /// Step backward and return the character before the current position.
    fn prev(&mut self) -> Option<char>;

    /// Peek `i` characters ahead without moving; `lookahead(0)` is the
    /// character `next()` would return.
    fn lookahead(&self, i: usize) -> Option<char>;

    /// Peek `i` characters behind without moving; `lookbehind(0)` is the
    /// character `prev()` would return.
    fn lookbehind(&self, i: usize) -> Option<char>;

    /// True when no character remains ahead.
    fn finished(&self) -> bool;

    /// Total length in characters.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy out `[start, end)` as text. Out-of-range offsets clamp.
    fn slice(&self, start: usize, end: usize) -> String;
}

/// A cursor over an in-memory text buffer.
#[derive(Clone, Debug)]
pub struct TextCursor {
    chars: Vec<char>,
    pos: usize,
}

impl TextCursor {
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }
}

impl Cursor for TextCursor {
    #[inline]
    fn current(&self) -> usize {
        self.pos
    }

    #[inline]
    fn move_to(&mut self, offset: usize) {
        self.pos = offset.min(self.chars.len());
    }

    #[inline]
    fn next(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        Some(c)
    }

    #[inline]
    fn prev(&mut self) -> Option<char> {
        if self.pos == 0 {
            return None;
        }
        self.pos -= 1;
        Some(self.chars[self.pos])
    }

    #[inline]
    fn lookahead(&self, i: usize) -> Option<char> {
        self.chars.get(self.pos + i).copied()
    }

    #[inline]
    fn lookbehind(&self, i: usize) -> Option<char> {
        if i + 1 > self.pos {
            return None;
        }
        Some(self.chars[self.pos - 1 - i])
    }

    #[inline]
    fn finished(&self) -> bool {
        self.pos >= self.chars.len()
    }

    #[inline]
    fn len(&self) -> usize {
        self.chars.len()
    }

    fn slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.chars.len());
        let start = start.min(end);
        self.chars[start..end].iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_and_back() {
        let mut c = TextCursor::new("abc");
        assert_eq!(c.current(), 0);
        assert_eq!(c.next(), Some('a'));
        assert_eq!(c.next(), Some('b'));
        assert_eq!(c.current(), 2);
        assert_eq!(c.prev(), Some('b'));
        assert_eq!(c.current(), 1);
        assert_eq!(c.lookahead(0), Some('b'));
        assert_eq!(c.lookahead(1), Some('c'));
        assert_eq!(c.lookbehind(0), Some('a'));
        assert_eq!(c.lookbehind(1), None);
    }

    #[test]
    fn test_exhaustion_and_clamping() {
        let mut c = TextCursor::new("xy");
        c.move_to(10);
        assert_eq!(c.current(), 2);
        assert!(c.finished());
        assert_eq!(c.next(), None);
        c.move_to(0);
        assert!(!c.finished());
        assert_eq!(c.prev(), None);
    }

    #[test]
    fn test_slice() {
        let c = TextCursor::new("hello");
        assert_eq!(c.slice(1, 4), "ell");
        assert_eq!(c.slice(3, 99), "lo");
        assert_eq!(c.slice(4, 2), "");
    }

    #[test]
    fn test_char_offsets_not_bytes() {
        let mut c = TextCursor::new("aßc");
        assert_eq!(c.len(), 3);
        assert_eq!(c.next(), Some('a'));
        assert_eq!(c.next(), Some('ß'));
        assert_eq!(c.current(), 2);
        assert_eq!(c.slice(1, 3), "ßc");
    }
}
