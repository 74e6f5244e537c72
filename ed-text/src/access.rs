//! The accessor traits through which engines see the host buffer.

/// Text, style and fold-level access for lexers.
///
/// Styles are written segment-wise: the host (or [`start_segment`]) opens a
/// segment, and [`colour_to`] assigns one style to everything from the open
/// segment start through `end` inclusive, then opens the next segment at
/// `end + 1`. Reads out of range are safe and return 0.
///
/// [`start_segment`]: Styler::start_segment
/// [`colour_to`]: Styler::colour_to
pub trait Styler {
    /// Byte at `pos`, 0 when out of range.
    fn char_at(&self, pos: usize) -> u8;

    /// Total length of the text.
    fn length(&self) -> usize;

    /// Style previously assigned at `pos`, 0 when out of range.
    fn style_at(&self, pos: usize) -> u8;

    /// Line number containing `pos`.
    fn line_from_position(&self, pos: usize) -> usize;

    /// Position of the first byte of `line`.
    fn line_start(&self, line: usize) -> usize;

    /// Stored fold-level word for `line`.
    fn level_at(&self, line: usize) -> i32;

    /// Store a fold-level word for `line`.
    fn set_level(&mut self, line: usize, level: i32);

    /// Position styling; both must be called before the first `colour_to`.
    fn start_at(&mut self, pos: usize);
    fn start_segment(&mut self, pos: usize);

    /// Close the open segment: style `[segment start, end]` with `style` and
    /// open the next segment at `end + 1`.
    fn colour_to(&mut self, end: usize, style: u8);

    /// Integer configuration property, `default` when unset.
    fn property_int(&self, name: &str, default: i32) -> i32;

    /// Whether the text at `pos` starts with `text`.
    fn match_at(&self, pos: usize, text: &str) -> bool {
        text.bytes()
            .enumerate()
            .all(|(i, b)| self.char_at(pos + i) == b)
    }

    /// Hook for hosts that buffer style writes.
    fn flush(&mut self) {}
}

/// Random-access character source with word-boundary oracles, consumed by
/// the regex engine.
///
/// Positions are byte positions. For hosts whose characters span multiple
/// bytes, [`move_position_outside_char`] snaps a position to a character
/// boundary and [`next_position`] steps by whole characters; a plain byte
/// buffer implements both trivially.
///
/// [`move_position_outside_char`]: CharacterIndexer::move_position_outside_char
/// [`next_position`]: CharacterIndexer::next_position
pub trait CharacterIndexer {
    /// Byte at `pos`, 0 when out of range.
    fn char_at(&self, pos: usize) -> u8;

    /// Snap `pos` to a character boundary, moving in `move_dir` (±1) when
    /// inside a multi-byte character.
    fn move_position_outside_char(&self, pos: usize, move_dir: isize) -> usize;

    /// Position of the adjacent character in `move_dir` (±1); returns `pos`
    /// unchanged at the corresponding end of the text.
    fn next_position(&self, pos: usize, move_dir: isize) -> usize;

    /// Whether a word (or punctuation run) starts at `pos`.
    fn is_word_start_at(&self, pos: usize) -> bool;

    /// Whether a word (or punctuation run) ends at `pos`.
    fn is_word_end_at(&self, pos: usize) -> bool;

    /// Extend from `pos` over the current character-class run; `move_dir > 0`
    /// returns the end of the run, `move_dir < 0` its start.
    fn extend_word_select(&self, pos: usize, move_dir: isize) -> usize;
}
