//! Properties / INI file colouring and folding.
//!
//! A line-oriented format: each line is dispatched on its first non-space
//! byte, and every `[section]` line is a fold header with the following
//! lines one level deeper.

use ed_text::{level, Styler};

use crate::is_space_char;

/// Per-byte styles assigned to properties files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PropsStyle {
    Default = 0,
    /// `#`, `;` or `!` line.
    Comment = 1,
    /// `[section]` line.
    Section = 2,
    /// The `=` or `:` between key and value.
    Assignment = 3,
    /// `@` default-value marker.
    DefVal = 4,
    Key = 5,
}

impl From<PropsStyle> for u8 {
    fn from(style: PropsStyle) -> u8 {
        style as u8
    }
}

fn is_assign_char(ch: u8) -> bool {
    ch == b'=' || ch == b':'
}

fn is_at_eol(styler: &dyn Styler, pos: usize) -> bool {
    let ch = styler.char_at(pos);
    (ch == b'\r' && styler.char_at(pos + 1) != b'\n') || ch == b'\n'
}

// Longer lines are flushed in chunks, like any host with a fixed line
// buffer would.
const LINE_BUFFER_CAP: usize = 1024;

fn colourise_line(
    styler: &mut dyn Styler,
    line: &[u8],
    start_line: usize,
    end_pos: usize,
    allow_initial_spaces: bool,
) {
    let mut i = 0;
    if allow_initial_spaces {
        while i < line.len() && is_space_char(line[i]) {
            i += 1;
        }
    } else if !line.is_empty() && is_space_char(line[0]) {
        i = line.len();
    }

    if i >= line.len() {
        styler.colour_to(end_pos, PropsStyle::Default.into());
        return;
    }
    match line[i] {
        b'#' | b';' | b'!' => {
            styler.colour_to(end_pos, PropsStyle::Comment.into());
        }
        b'[' => {
            styler.colour_to(end_pos, PropsStyle::Section.into());
        }
        b'@' => {
            styler.colour_to(start_line + i, PropsStyle::DefVal.into());
            if line.get(i + 1).is_some_and(|&c| is_assign_char(c)) {
                i += 1;
                styler.colour_to(start_line + i, PropsStyle::Assignment.into());
            }
            styler.colour_to(end_pos, PropsStyle::Default.into());
        }
        _ => {
            while i < line.len() && !is_assign_char(line[i]) {
                i += 1;
            }
            if i < line.len() {
                if start_line + i > 0 {
                    styler.colour_to(start_line + i - 1, PropsStyle::Key.into());
                }
                styler.colour_to(start_line + i, PropsStyle::Assignment.into());
                styler.colour_to(end_pos, PropsStyle::Default.into());
            } else {
                styler.colour_to(end_pos, PropsStyle::Default.into());
            }
        }
    }
}

/// The properties lexer. Stateless; one instance serves any number of
/// passes.
#[derive(Default)]
pub struct PropsLexer;

impl PropsLexer {
    pub fn colourise(
        &mut self,
        styler: &mut dyn Styler,
        start: usize,
        length: usize,
        _init_style: u8,
    ) {
        styler.start_at(start);
        styler.start_segment(start);
        let allow_initial_spaces = styler
            .property_int("lexer.props.allow.initial.spaces", 1)
            != 0;
        let end_pos = start + length;
        let mut line_buffer = Vec::with_capacity(LINE_BUFFER_CAP);
        let mut start_line = start;
        for i in start..end_pos {
            line_buffer.push(styler.char_at(i));
            if is_at_eol(styler, i) || line_buffer.len() >= LINE_BUFFER_CAP - 1 {
                colourise_line(
                    styler,
                    &line_buffer,
                    start_line,
                    i,
                    allow_initial_spaces,
                );
                line_buffer.clear();
                start_line = i + 1;
            }
        }
        if !line_buffer.is_empty() {
            // Last line has no terminator.
            colourise_line(
                styler,
                &line_buffer,
                start_line,
                end_pos - 1,
                allow_initial_spaces,
            );
        }
    }

    pub fn fold(
        &mut self,
        styler: &mut dyn Styler,
        start: usize,
        length: usize,
        _init_style: u8,
    ) {
        if styler.property_int("fold", 0) == 0 {
            return;
        }
        let fold_compact = true;
        let end_pos = start + length;
        let mut visible_chars = 0usize;
        let mut line_current = styler.line_from_position(start);

        let mut ch_next = styler.char_at(start);
        let mut style_next = styler.style_at(start);
        let mut header_point = false;

        let continuation_level = |styler: &dyn Styler, line: usize| {
            if line > 0 {
                let level_prev = styler.level_at(line - 1);
                if level_prev & level::FOLD_HEADER_FLAG != 0 {
                    level::FOLD_BASE + 1
                } else {
                    level_prev & level::FOLD_NUMBER_MASK
                }
            } else {
                level::FOLD_BASE
            }
        };

        for i in start..end_pos {
            let ch = ch_next;
            ch_next = styler.char_at(i + 1);
            let style = style_next;
            style_next = styler.style_at(i + 1);
            let at_eol = (ch == b'\r' && ch_next != b'\n') || ch == b'\n';

            if style == PropsStyle::Section as u8 {
                header_point = true;
            }

            if at_eol {
                let mut lev = continuation_level(styler, line_current);
                if header_point {
                    lev = level::FOLD_BASE;
                }
                if visible_chars == 0 && fold_compact {
                    lev |= level::FOLD_WHITE_FLAG;
                }
                if header_point {
                    lev |= level::FOLD_HEADER_FLAG;
                }
                if lev != styler.level_at(line_current) {
                    styler.set_level(line_current, lev);
                }
                line_current += 1;
                visible_chars = 0;
                header_point = false;
            }
            if !is_space_char(ch) {
                visible_chars += 1;
            }
        }

        // The line after the range sits under the last header.
        let lev = continuation_level(styler, line_current);
        let flags_next = styler.level_at(line_current) & !level::FOLD_NUMBER_MASK;
        styler.set_level(line_current, lev | flags_next);
    }
}
