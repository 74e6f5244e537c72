/*!
SQL syntax colouring and structural folding, covering procedural dialects
(PL/SQL-style blocks, MySQL quoting, merge statements).

Colouring is a restartable streaming pass assigning one [`SqlStyle`] per
byte. Folding is a second pass that reads those styles and assigns one fold
level per line, tracking nested statements in a packed per-line state word
that survives between passes so either pass can restart from any position
the host hands back.
*/

use bon::Builder;
use ed_text::{Styler, WordList};

use crate::{is_space_char, style::StyleContext};

mod fold;

pub(crate) use fold::SqlStates;

/// Per-byte styles assigned by the colourise pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SqlStyle {
    Default = 0,
    /// Keyword from the primary list.
    Word = 1,
    /// Keyword from the database-object list.
    Word2 = 2,
    /// User keyword, abbreviated form, only before a `(`.
    User1 = 3,
    Number = 4,
    /// `0x` prefixed literal.
    Hex = 5,
    /// `x'…'` / `x"…"` literal.
    Hex2 = 6,
    /// `0b` prefixed literal.
    Bit = 7,
    /// `b'…'` literal.
    Bit2 = 8,
    /// `@name` variable.
    Variable = 9,
    Identifier = 10,
    /// Backtick-quoted identifier.
    QuotedIdentifier = 11,
    /// `/* … */` stream comment.
    Comment = 12,
    /// `--` line comment.
    CommentLine = 13,
    /// `#` line comment.
    CommentLineDoc = 14,
    /// Single-quoted literal.
    Character = 15,
    /// Double-quoted literal.
    String = 16,
    Operator = 17,
}

impl From<SqlStyle> for u8 {
    fn from(style: SqlStyle) -> u8 {
        style as u8
    }
}

impl SqlStyle {
    pub fn from_u8(style: u8) -> SqlStyle {
        use SqlStyle::*;
        match style {
            1 => Word,
            2 => Word2,
            3 => User1,
            4 => Number,
            5 => Hex,
            6 => Hex2,
            7 => Bit,
            8 => Bit2,
            9 => Variable,
            10 => Identifier,
            11 => QuotedIdentifier,
            12 => Comment,
            13 => CommentLine,
            14 => CommentLineDoc,
            15 => Character,
            16 => String,
            17 => Operator,
            _ => Default,
        }
    }
}

pub(crate) fn is_comment_style(style: u8) -> bool {
    matches!(
        SqlStyle::from_u8(style),
        SqlStyle::Comment | SqlStyle::CommentLine | SqlStyle::CommentLineDoc
    )
}

fn is_sql_word_char(ch: u8, allow_dotted: bool) -> bool {
    ch < 0x80
        && (ch.is_ascii_alphanumeric()
            || ch == b'_'
            || (allow_dotted && ch == b'.'))
}

// Lexeme characters as the fold pass sees them; the dot is deliberately
// included so `end.` is not a trigger keyword.
pub(crate) fn is_word_char(ch: u8) -> bool {
    ch < 0x80 && (ch.is_ascii_alphanumeric() || ch == b'_' || ch == b'.')
}

fn is_word_start(ch: u8) -> bool {
    ch < 0x80 && (ch.is_ascii_alphanumeric() || ch == b'_')
}

fn is_number_char(ch: u8, ch_prev: u8) -> bool {
    ch < 0x80
        && (ch.is_ascii_digit()
            || (ch == b'.' && ch_prev != b'.')
            || ((ch == b'+' || ch == b'-') && (ch_prev == b'e' || ch_prev == b'E'))
            || ((ch == b'e' || ch == b'E') && ch_prev.is_ascii_digit()))
}

fn is_operator(ch: u8) -> bool {
    !ch.is_ascii_alphanumeric()
        && matches!(
            ch,
            b'%' | b'^' | b'&' | b'*' | b'(' | b')' | b'-' | b'+' | b'='
                | b'|' | b'{' | b'}' | b'[' | b']' | b':' | b';' | b'<'
                | b'>' | b',' | b'/' | b'?' | b'!' | b'.' | b'~'
        )
}

/// First byte at or after `pos` that is not whitespace.
fn next_visible_char<S: Styler + ?Sized>(styler: &S, mut pos: usize) -> u8 {
    while pos < styler.length() && is_space_char(styler.char_at(pos)) {
        pos += 1;
    }
    styler.char_at(pos)
}

struct Options {
    backticks_identifier: bool,
    numbersign_comment: bool,
    backslash_escapes: bool,
    allow_dotted_word: bool,
}

impl Options {
    fn read(styler: &dyn Styler) -> Self {
        Self {
            backticks_identifier: styler
                .property_int("lexer.sql.backticks.identifier", 1)
                != 0,
            numbersign_comment: styler
                .property_int("lexer.sql.numbersign.comment", 1)
                != 0,
            backslash_escapes: styler
                .property_int("lexer.sql.backslash.escapes", 1)
                != 0,
            allow_dotted_word: styler
                .property_int("lexer.sql.allow.dotted.word", 0)
                != 0,
        }
    }
}

/// The SQL lexer: a colourise pass and a fold pass over the same range.
///
/// Keyword lists drive identifier resolution: [`keywords`] colours
/// [`SqlStyle::Word`], [`objects`] colours [`SqlStyle::Word2`], and
/// [`user1`] (marker-abbreviated with `(`) colours [`SqlStyle::User1`] when
/// the identifier is followed by a parenthesis.
///
/// The instance also owns the per-line fold state sequence, so fold passes
/// over edited sub-ranges see the statement nesting established by earlier
/// passes.
///
/// [`keywords`]: SqlLexerBuilder::keywords
/// [`objects`]: SqlLexerBuilder::objects
/// [`user1`]: SqlLexerBuilder::user1
///
/// # Example
/// ```
/// use ed_lexers::sql::SqlLexer;
/// use ed_text::WordList;
///
/// let mut lexer = SqlLexer::builder()
///     .keywords(WordList::new("select from where begin end"))
///     .build();
/// ```
#[derive(Builder, Default)]
pub struct SqlLexer {
    /// Primary keyword list.
    #[builder(default)]
    keywords: WordList,
    /// Database-object list.
    #[builder(default)]
    objects: WordList,
    /// User keywords, abbreviated with `(`.
    #[builder(default)]
    user1: WordList,
    #[builder(skip)]
    states: SqlStates,
}

impl SqlLexer {
    /// Assign a style to every byte of `[start, start + length)`.
    ///
    /// `init_style` reopens the state active at `start`, which makes the
    /// pass restartable from any position the host recorded styles for.
    pub fn colourise(
        &mut self,
        styler: &mut dyn Styler,
        start: usize,
        length: usize,
        init_style: u8,
    ) {
        let options = Options::read(styler);
        let mut sc = StyleContext::new(styler, start, length, init_style);

        while sc.more() {
            // Does the current state end at this byte?
            match SqlStyle::from_u8(sc.state) {
                SqlStyle::Operator => sc.set_state(SqlStyle::Default.into()),
                SqlStyle::Hex => {
                    if !sc.ch.is_ascii_hexdigit() {
                        sc.set_state(SqlStyle::Default.into());
                    }
                }
                SqlStyle::Hex2 => {
                    if sc.ch == b'"' || sc.ch == b'\'' {
                        sc.forward_set_state(SqlStyle::Default.into());
                    }
                }
                SqlStyle::Bit => {
                    if sc.ch != b'0' && sc.ch != b'1' {
                        sc.set_state(SqlStyle::Default.into());
                    }
                }
                SqlStyle::Bit2 => {
                    if sc.ch == b'\'' {
                        sc.forward_set_state(SqlStyle::Default.into());
                    }
                }
                SqlStyle::Number => {
                    if !is_number_char(sc.ch, sc.ch_prev) {
                        sc.set_state(SqlStyle::Default.into());
                    }
                }
                SqlStyle::Variable => {
                    if !is_word_char(sc.ch) && sc.ch != b'@' {
                        sc.set_state(SqlStyle::Default.into());
                    }
                }
                SqlStyle::Identifier => {
                    self.resolve_identifier(&mut sc, &options);
                }
                SqlStyle::QuotedIdentifier => {
                    if sc.ch == b'`' {
                        if sc.ch_next == b'`' {
                            sc.forward(); // doubled backtick is an escape
                        } else {
                            sc.forward_set_state(SqlStyle::Default.into());
                        }
                    }
                }
                SqlStyle::Comment => {
                    if sc.matches(b'*', b'/') {
                        sc.forward();
                        sc.forward_set_state(SqlStyle::Default.into());
                    }
                }
                SqlStyle::CommentLine | SqlStyle::CommentLineDoc => {
                    if sc.at_line_start {
                        sc.set_state(SqlStyle::Default.into());
                    }
                }
                SqlStyle::Character => {
                    if options.backslash_escapes && sc.ch == b'\\' {
                        sc.forward();
                    } else if sc.ch == b'\'' {
                        // A doubled quote escapes; so does the '" pair,
                        // kept for compatibility.
                        if sc.ch_next == b'\'' || sc.ch_next == b'"' {
                            sc.forward();
                        } else {
                            sc.forward_set_state(SqlStyle::Default.into());
                        }
                    }
                }
                SqlStyle::String => {
                    if options.backslash_escapes && sc.ch == b'\\' {
                        sc.forward();
                    } else if sc.ch == b'"' {
                        if sc.ch_next == b'"' {
                            sc.forward();
                        } else {
                            sc.forward_set_state(SqlStyle::Default.into());
                        }
                    }
                }
                _ => {}
            }

            // Does a new state start here?
            if SqlStyle::from_u8(sc.state) == SqlStyle::Default {
                if sc.ch == b'0' && (sc.ch_next == b'x' || sc.ch_next == b'X') {
                    sc.set_state(SqlStyle::Hex.into());
                    sc.forward();
                } else if (sc.ch == b'x' || sc.ch == b'X')
                    && (sc.ch_next == b'"' || sc.ch_next == b'\'')
                {
                    sc.set_state(SqlStyle::Hex2.into());
                    sc.forward();
                } else if sc.ch == b'0' && (sc.ch_next == b'b' || sc.ch_next == b'B')
                {
                    sc.set_state(SqlStyle::Bit.into());
                    sc.forward();
                } else if (sc.ch == b'b' || sc.ch == b'B') && sc.ch_next == b'\'' {
                    sc.set_state(SqlStyle::Bit2.into());
                    sc.forward();
                } else if sc.ch.is_ascii_digit()
                    || (sc.ch == b'.' && sc.ch_next.is_ascii_digit())
                {
                    sc.set_state(SqlStyle::Number.into());
                } else if sc.ch == b'@' && is_word_start(sc.ch_next) {
                    sc.set_state(SqlStyle::Variable.into());
                } else if is_word_start(sc.ch) {
                    sc.set_state(SqlStyle::Identifier.into());
                } else if sc.ch == b'`' && options.backticks_identifier {
                    sc.set_state(SqlStyle::QuotedIdentifier.into());
                } else if sc.matches(b'/', b'*') {
                    sc.set_state(SqlStyle::Comment.into());
                    sc.forward(); // keep the * from also closing the comment
                } else if sc.matches(b'-', b'-') {
                    sc.set_state(SqlStyle::CommentLine.into());
                } else if sc.ch == b'#' && options.numbersign_comment {
                    sc.set_state(SqlStyle::CommentLineDoc.into());
                } else if sc.ch == b'\'' {
                    sc.set_state(SqlStyle::Character.into());
                } else if sc.ch == b'"' {
                    sc.set_state(SqlStyle::String.into());
                } else if is_operator(sc.ch) {
                    sc.set_state(SqlStyle::Operator.into());
                }
            }

            sc.forward();
        }

        // An identifier cut off by the end of the range still resolves
        // against the byte that follows it.
        if SqlStyle::from_u8(sc.state) == SqlStyle::Identifier {
            self.resolve_identifier(&mut sc, &options);
        }

        sc.complete();
    }

    fn resolve_identifier(
        &self,
        sc: &mut StyleContext<'_, dyn Styler + '_>,
        options: &Options,
    ) {
        if is_sql_word_char(sc.ch, options.allow_dotted_word) {
            return;
        }
        let s = sc.current_lowered();
        if self.keywords.in_list(&s) {
            sc.change_state(SqlStyle::Word.into());
        } else if self.objects.in_list(&s) {
            sc.change_state(SqlStyle::Word2.into());
        } else if next_visible_char(sc.styler(), sc.pos) == b'('
            && self.user1.in_list_abbreviated(&s, b'(')
        {
            sc.change_state(SqlStyle::User1.into());
        }
        sc.set_state(SqlStyle::Default.into());
    }
}
