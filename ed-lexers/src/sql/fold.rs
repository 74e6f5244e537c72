//! The fold pass and its per-line nested-statement state.

use ed_text::{level, Styler};
use logos::Logos;
use tracing::trace;

use crate::is_space_char;

use super::{is_comment_style, is_word_char, SqlLexer, SqlStyle};

/// Packed per-line fold state: a saturating 9-bit nested-CASE depth plus
/// seven statement flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct LineState(u16);

impl LineState {
    const NESTED_CASES: u16 = 0x01FF;
    const SELECT_OR_ASSIGN: u16 = 0x0200;
    const CASE_MERGE_NO_WHEN: u16 = 0x0400;
    const MERGE: u16 = 0x0800;
    const DECLARE: u16 = 0x1000;
    const EXCEPTION: u16 = 0x2000;
    const CONDITION: u16 = 0x4000;
    const IGNORE_WHEN: u16 = 0x8000;

    fn with(self, mask: u16, on: bool) -> Self {
        if on {
            Self(self.0 | mask)
        } else {
            Self(self.0 & !mask)
        }
    }

    fn has(self, mask: u16) -> bool {
        self.0 & mask != 0
    }

    pub fn set_condition(self, on: bool) -> Self {
        self.with(Self::CONDITION, on)
    }

    pub fn in_condition(self) -> bool {
        self.has(Self::CONDITION)
    }

    pub fn set_exception(self, on: bool) -> Self {
        self.with(Self::EXCEPTION, on)
    }

    pub fn in_exception(self) -> bool {
        self.has(Self::EXCEPTION)
    }

    pub fn set_declare(self, on: bool) -> Self {
        self.with(Self::DECLARE, on)
    }

    pub fn in_declare(self) -> bool {
        self.has(Self::DECLARE)
    }

    pub fn set_merge(self, on: bool) -> Self {
        self.with(Self::MERGE, on)
    }

    pub fn in_merge(self) -> bool {
        self.has(Self::MERGE)
    }

    /// A CASE or MERGE is open but no WHEN has been seen yet.
    pub fn set_case_merge_no_when(self, on: bool) -> Self {
        self.with(Self::CASE_MERGE_NO_WHEN, on)
    }

    pub fn case_merge_no_when(self) -> bool {
        self.has(Self::CASE_MERGE_NO_WHEN)
    }

    pub fn set_select_or_assign(self, on: bool) -> Self {
        self.with(Self::SELECT_OR_ASSIGN, on)
    }

    pub fn in_select_or_assign(self) -> bool {
        self.has(Self::SELECT_OR_ASSIGN)
    }

    /// Set by EXIT so the WHEN of `EXIT WHEN …` opens no fold.
    pub fn set_ignore_when(self, on: bool) -> Self {
        self.with(Self::IGNORE_WHEN, on)
    }

    pub fn ignore_when(self) -> bool {
        self.has(Self::IGNORE_WHEN)
    }

    /// Saturates at the field width instead of spilling into the flags.
    pub fn begin_case(self) -> Self {
        if self.0 & Self::NESTED_CASES < Self::NESTED_CASES {
            Self(self.0 + 1)
        } else {
            self
        }
    }

    pub fn end_case(self) -> Self {
        if self.0 & Self::NESTED_CASES > 0 {
            Self(self.0 - 1)
        } else {
            self
        }
    }

    pub fn in_case(self) -> bool {
        self.0 & Self::NESTED_CASES != 0
    }

    #[cfg(test)]
    pub fn case_depth(self) -> u16 {
        self.0 & Self::NESTED_CASES
    }
}

/// Fold state of every line seen so far, kept across passes so a pass can
/// restart from any line.
#[derive(Default)]
pub(crate) struct SqlStates {
    lines: Vec<LineState>,
}

impl SqlStates {
    /// Record `state` for `line`. Nothing is stored while every state is
    /// still zero and the sequence has not started.
    pub fn set(&mut self, line: usize, state: LineState) {
        if !self.lines.is_empty() || state != LineState::default() {
            if self.lines.len() <= line {
                self.lines.resize(line + 1, LineState::default());
            }
            self.lines[line] = state;
        }
    }

    pub fn for_line(&self, line: usize) -> LineState {
        if line > 0 {
            self.lines.get(line).copied().unwrap_or_default()
        } else {
            LineState::default()
        }
    }
}

/// The keywords the fold pass reacts to.
#[derive(Logos, Clone, Copy, Debug, PartialEq, Eq)]
enum FoldKeyword {
    #[token("select")]
    Select,
    #[token("if")]
    If,
    #[token("then")]
    Then,
    #[token("loop")]
    Loop,
    #[token("case")]
    Case,
    #[token("while")]
    While,
    #[token("repeat")]
    Repeat,
    #[token("elsif")]
    Elsif,
    #[token("else")]
    Else,
    #[token("begin")]
    Begin,
    #[token("start")]
    Start,
    #[token("end")]
    End,
    #[token("endif")]
    Endif,
    #[token("when")]
    When,
    #[token("exit")]
    Exit,
    #[token("exception")]
    Exception,
    #[token("declare")]
    Declare,
    #[token("function")]
    Function,
    #[token("procedure")]
    Procedure,
    #[token("package")]
    Package,
    #[token("merge")]
    Merge,
}

// Longest trigger keyword; longer lexemes cannot be triggers.
const MAX_KW_LEN: usize = 9;

fn keyword_at(styler: &dyn Styler, pos: usize) -> Option<FoldKeyword> {
    let mut s = String::with_capacity(MAX_KW_LEN);
    for j in 0..=MAX_KW_LEN {
        let ch = styler.char_at(pos + j);
        if !is_word_char(ch) {
            break;
        }
        if j == MAX_KW_LEN {
            return None;
        }
        s.push(ch.to_ascii_lowercase() as char);
    }
    let mut lex = FoldKeyword::lexer(&s);
    match lex.next() {
        Some(Ok(kw)) if lex.remainder().is_empty() => Some(kw),
        _ => None,
    }
}

fn is_stream_comment(style: u8) -> bool {
    SqlStyle::from_u8(style) == SqlStyle::Comment
}

/// Whether the first non-blank byte of `line` carries a line-comment style.
fn is_comment_line(styler: &dyn Styler, line: isize) -> bool {
    if line < 0 {
        return false;
    }
    let line = line as usize;
    let start = styler.line_start(line);
    let end = styler.line_start(line + 1);
    let mut pos = start;
    while pos < end && matches!(styler.char_at(pos), b' ' | b'\t') {
        pos += 1;
    }
    if pos >= end {
        return false;
    }
    matches!(
        SqlStyle::from_u8(styler.style_at(pos)),
        SqlStyle::CommentLine | SqlStyle::CommentLineDoc
    )
}

impl SqlLexer {
    /// Assign a fold-level word to every line of `[start, start + length)`.
    ///
    /// Reads the styles written by [`colourise`](SqlLexer::colourise), so
    /// the colourise pass must already have covered the range.
    pub fn fold(
        &mut self,
        styler: &mut dyn Styler,
        start: usize,
        length: usize,
        init_style: u8,
    ) {
        if styler.property_int("fold", 0) == 0 {
            return;
        }
        let fold_only_begin = styler.property_int("fold.sql.only.begin", 0) != 0;
        let fold_comment = styler.property_int("fold.comment", 1) != 0;
        let fold_at_else = styler.property_int("fold.sql.at.else", 0) != 0;
        let fold_compact = styler.property_int("fold.compact", 0) != 0;

        trace!(start, length, "sql fold pass");

        let end_pos = start + length;
        let mut visible_chars = 0usize;
        let mut line_current = styler.line_from_position(start);
        let mut level_current = level::FOLD_BASE;
        if line_current > 0 {
            level_current = styler.level_at(line_current - 1) >> 16;
        }
        let mut level_next = level_current;

        let mut ch_next = styler.char_at(start);
        let mut style = init_style;
        let mut style_next = styler.style_at(start);
        let mut end_found = false;
        let mut is_unfolding_ignored = false;
        // Suppresses ELSE/ELSIF/THEN level changes when the IF or CASE
        // opener already appeared on this line.
        let mut statement_found = false;
        let mut state = self.states.for_line(line_current);

        for i in start..end_pos {
            let ch = ch_next;
            ch_next = styler.char_at(i + 1);
            let style_prev = style;
            style = style_next;
            style_next = styler.style_at(i + 1);
            let at_eol = (ch == b'\r' && ch_next != b'\n') || ch == b'\n';

            if at_eol || (!is_comment_style(style) && ch == b';') {
                if end_found {
                    // "… END;" may close an open EXCEPTION block.
                    state = state.set_exception(false);
                }
                end_found = false;
                is_unfolding_ignored = false;
            }
            if !is_comment_style(style) && ch == b';' {
                if state.in_merge() {
                    // End of the MERGE statement; without a WHEN the open
                    // credit was never spent, so one extra level remains.
                    if !state.case_merge_no_when() {
                        level_next -= 1;
                    }
                    state = state.set_merge(false);
                    level_next -= 1;
                }
                if state.in_select_or_assign() {
                    state = state.set_select_or_assign(false);
                }
            }
            if ch == b':' && ch_next == b'=' && !is_comment_style(style) {
                state = state.set_select_or_assign(true);
            }

            if fold_comment && is_stream_comment(style) {
                if !is_stream_comment(style_prev) {
                    level_next += 1;
                } else if !is_stream_comment(style_next) && !at_eol {
                    // Stream comments do not end at end of line and the
                    // next byte may be unstyled.
                    level_next -= 1;
                }
            }
            if fold_comment && at_eol {
                let line = line_current as isize;
                if is_comment_line(styler, line) {
                    if !is_comment_line(styler, line - 1)
                        && is_comment_line(styler, line + 1)
                    {
                        level_next += 1;
                    } else if is_comment_line(styler, line - 1)
                        && !is_comment_line(styler, line + 1)
                    {
                        level_next -= 1;
                    }
                }
            }

            if SqlStyle::from_u8(style) == SqlStyle::Operator {
                if ch == b'(' {
                    if level_current > level_next {
                        level_current -= 1;
                    }
                    level_next += 1;
                } else if ch == b')' {
                    level_next -= 1;
                } else if ch == b';' {
                    state = state.set_ignore_when(false);
                }
            }

            // A keyword lexeme starts here.
            if SqlStyle::from_u8(style) == SqlStyle::Word
                && SqlStyle::from_u8(style_prev) != SqlStyle::Word
            {
                match keyword_at(styler, i) {
                    Some(FoldKeyword::Select) if !fold_only_begin => {
                        state = state.set_select_or_assign(true);
                    }
                    Some(FoldKeyword::If) => {
                        if end_found {
                            // This END belonged to "END IF", not a BEGIN.
                            end_found = false;
                            if fold_only_begin && !is_unfolding_ignored {
                                level_next += 1;
                            }
                        } else {
                            if !fold_only_begin {
                                state = state.set_condition(true);
                            }
                            if level_current > level_next {
                                // "END; IF": keep this line out of the
                                // block just closed.
                                level_current = level_next;
                            }
                        }
                    }
                    Some(FoldKeyword::Then)
                        if !fold_only_begin && state.in_condition() =>
                    {
                        state = state.set_condition(false);
                        if level_current > level_next {
                            level_current = level_next;
                        }
                        if !statement_found {
                            level_next += 1;
                        }
                        statement_found = true;
                    }
                    Some(
                        kw @ (FoldKeyword::Loop
                        | FoldKeyword::Case
                        | FoldKeyword::While
                        | FoldKeyword::Repeat),
                    ) => {
                        if end_found {
                            end_found = false;
                            if fold_only_begin && !is_unfolding_ignored {
                                level_next += 1;
                            }
                            if !fold_only_begin && kw == FoldKeyword::Case {
                                state = state.end_case();
                                // "END CASE" also closes the WHEN block.
                                if !state.case_merge_no_when() {
                                    level_next -= 1;
                                }
                            }
                        } else if !fold_only_begin {
                            if kw == FoldKeyword::Case {
                                state = state.begin_case();
                                state = state.set_case_merge_no_when(true);
                            }
                            if level_current > level_next {
                                level_current = level_next;
                            }
                            if !statement_found {
                                level_next += 1;
                            }
                            statement_found = true;
                        } else if level_current > level_next {
                            level_current = level_next;
                        }
                    }
                    Some(FoldKeyword::Elsif)
                        if !fold_only_begin && fold_at_else && !statement_found =>
                    {
                        state = state.set_condition(true);
                        level_current -= 1;
                        level_next -= 1;
                    }
                    Some(FoldKeyword::Else)
                        if !fold_only_begin && fold_at_else && !statement_found =>
                    {
                        statement_found = true;
                        if state.in_case() && state.case_merge_no_when() {
                            // CASE with no WHEN: ELSE opens the block
                            // instead of re-opening it.
                            state = state.set_case_merge_no_when(false);
                            level_next += 1;
                        } else {
                            level_current -= 1;
                        }
                    }
                    Some(FoldKeyword::Begin | FoldKeyword::Start) => {
                        level_next += 1;
                        state = state.set_declare(false);
                    }
                    Some(FoldKeyword::End | FoldKeyword::Endif) => {
                        end_found = true;
                        level_next -= 1;
                        if state.in_select_or_assign()
                            && !state.case_merge_no_when()
                        {
                            level_next -= 1;
                        }
                        if level_next < level::FOLD_BASE {
                            level_next = level::FOLD_BASE;
                            is_unfolding_ignored = true;
                        }
                    }
                    Some(FoldKeyword::When)
                        if !fold_only_begin
                            && !state.ignore_when()
                            && !state.in_exception()
                            && (state.in_case() || state.in_merge()) =>
                    {
                        state = state.set_condition(true);
                        // CASE/MERGE and WHEN on one line fold as one.
                        if !statement_found {
                            if !state.case_merge_no_when() {
                                level_current -= 1;
                                level_next -= 1;
                            }
                            state = state.set_case_merge_no_when(false);
                        }
                    }
                    Some(FoldKeyword::Exit) if !fold_only_begin => {
                        state = state.set_ignore_when(true);
                    }
                    Some(FoldKeyword::Exception)
                        if !fold_only_begin && !state.in_declare() =>
                    {
                        state = state.set_exception(true);
                    }
                    Some(
                        FoldKeyword::Declare
                        | FoldKeyword::Function
                        | FoldKeyword::Procedure
                        | FoldKeyword::Package,
                    ) if !fold_only_begin => {
                        state = state.set_declare(true);
                    }
                    Some(FoldKeyword::Merge) if !fold_only_begin => {
                        state = state.set_merge(true);
                        state = state.set_case_merge_no_when(true);
                        level_next += 1;
                        statement_found = true;
                    }
                    _ => {}
                }
            }

            if !is_space_char(ch) {
                visible_chars += 1;
            }
            if at_eol || i == end_pos - 1 {
                let mut lev = level_current | (level_next << 16);
                if visible_chars == 0 && fold_compact {
                    lev |= level::FOLD_WHITE_FLAG;
                }
                if level_current < level_next {
                    lev |= level::FOLD_HEADER_FLAG;
                }
                if lev != styler.level_at(line_current) {
                    styler.set_level(line_current, lev);
                }
                line_current += 1;
                level_current = level_next;
                visible_chars = 0;
                statement_found = false;
                self.states.set(line_current, state);
            }
        }
    }
}
