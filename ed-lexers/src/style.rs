//! Streaming cursor used by the colourisers.

use ed_text::Styler;

/// Walks a range of a [`Styler`] one byte at a time while assigning styles
/// segment-wise.
///
/// The cursor exposes the previous, current and next byte, tracks line
/// starts, and keeps the open segment: [`set_state`] closes the segment
/// *before* the current position with the old state and opens a new one at
/// it. Reading past the end of the range yields the byte actually in the
/// buffer (so a lexer can peek across an incremental split), and a space
/// once the cursor has been forwarded past the end.
///
/// [`set_state`]: StyleContext::set_state
pub struct StyleContext<'a, S: Styler + ?Sized> {
    styler: &'a mut S,
    pub pos: usize,
    end_pos: usize,
    seg_start: usize,
    pub state: u8,
    pub ch_prev: u8,
    pub ch: u8,
    pub ch_next: u8,
    pub at_line_start: bool,
}

impl<'a, S: Styler + ?Sized> StyleContext<'a, S> {
    pub fn new(styler: &'a mut S, start: usize, length: usize, init_style: u8) -> Self {
        styler.start_at(start);
        styler.start_segment(start);
        let ch_prev = if start > 0 { styler.char_at(start - 1) } else { 0 };
        let ch = styler.char_at(start);
        let ch_next = styler.char_at(start + 1);
        let at_line_start = start == 0
            || ch_prev == b'\n'
            || (ch_prev == b'\r' && ch != b'\n');
        Self {
            styler,
            pos: start,
            end_pos: start + length,
            seg_start: start,
            state: init_style,
            ch_prev,
            ch,
            ch_next,
            at_line_start,
        }
    }

    pub fn more(&self) -> bool {
        self.pos < self.end_pos
    }

    pub fn forward(&mut self) {
        if self.pos < self.end_pos {
            self.pos += 1;
            self.ch_prev = self.ch;
            self.ch = self.ch_next;
            self.ch_next = self.styler.char_at(self.pos + 1);
            self.at_line_start = self.ch_prev == b'\n'
                || (self.ch_prev == b'\r' && self.ch != b'\n');
        } else {
            self.ch_prev = b' ';
            self.ch = b' ';
            self.ch_next = b' ';
            self.at_line_start = false;
        }
    }

    /// Close the current segment with the current state and continue in
    /// `state`.
    pub fn set_state(&mut self, state: u8) {
        if self.pos > self.seg_start {
            self.styler.colour_to(self.pos - 1, self.state);
        }
        self.state = state;
        self.seg_start = self.pos;
    }

    /// Take the current byte into the segment, then switch to `state`.
    pub fn forward_set_state(&mut self, state: u8) {
        self.forward();
        self.set_state(state);
    }

    /// Retroactively relabel the open segment.
    pub fn change_state(&mut self, state: u8) {
        self.state = state;
    }

    pub fn matches(&self, a: u8, b: u8) -> bool {
        self.ch == a && self.ch_next == b
    }

    /// ASCII-lowercased text of the open segment, capped at 127 bytes.
    pub fn current_lowered(&self) -> String {
        (self.seg_start..self.pos.min(self.seg_start + 127))
            .map(|i| self.styler.char_at(i).to_ascii_lowercase() as char)
            .collect()
    }

    pub fn styler(&self) -> &S {
        self.styler
    }

    /// Flush the final segment.
    pub fn complete(&mut self) {
        if self.pos > self.seg_start {
            self.styler.colour_to(self.pos - 1, self.state);
        }
        self.styler.flush();
    }
}

#[cfg(test)]
mod tests {
    use ed_text::buffer::TextBuffer;

    use super::*;

    #[test]
    fn segment_styling() {
        let mut buf = TextBuffer::new("ab cd");
        let mut sc = StyleContext::new(&mut buf, 0, 5, 0);
        while sc.more() {
            if sc.ch == b' ' {
                sc.set_state(1);
                sc.forward_set_state(2);
            } else {
                sc.forward();
            }
        }
        sc.complete();
        assert_eq!(buf.styles(), &[0, 0, 1, 2, 2]);
    }

    #[test]
    fn line_starts() {
        let mut buf = TextBuffer::new("a\nb");
        let mut sc = StyleContext::new(&mut buf, 0, 3, 0);
        assert!(sc.at_line_start);
        sc.forward();
        assert!(!sc.at_line_start);
        sc.forward();
        assert!(sc.at_line_start);
    }

    #[test]
    fn lowered_segment() {
        let mut buf = TextBuffer::new("SeLeCT x");
        let mut sc = StyleContext::new(&mut buf, 0, 8, 0);
        for _ in 0..6 {
            sc.forward();
        }
        assert_eq!(sc.current_lowered(), "select");
    }
}
