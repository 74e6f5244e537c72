/*!
Incremental syntax colouring and structural folding for editor buffers.

Each language is a [`Lexer`] with two passes over a host-chosen range: a
colourise pass assigning one style byte per position and a fold pass
assigning one fold-level word per line. Both read and write through the
host's [`Styler`](ed_text::Styler), and both restart from whatever position
and initial style the host hands back after an edit, so the host only needs
to re-lex from the last position it knows to be stable.

The fold pass runs after the colourise pass for the same range, because it
reads the styles the first pass wrote.

## Example
```
use ed_lexers::{lexer_for, sql::SqlStyle};
use ed_text::{buffer::TextBuffer, Styler};

let mut buf = TextBuffer::new("SELECT 1; -- done\n");
let mut lexer = lexer_for("sql").unwrap();
lexer.colourise(&mut buf, 0, 18, 0);
lexer.fold(&mut buf, 0, 18, 0);
assert_eq!(buf.style_at(10), SqlStyle::CommentLine as u8);
```

The regex engine used by search lives in [`ed_regex`], re-exported as
[`regex`]; the host interfaces live in [`ed_text`], re-exported as [`text`].
*/

use ed_text::Styler;

pub mod props;
pub mod sql;
pub mod style;

pub use ed_regex as regex;
pub use ed_text as text;

pub use props::PropsLexer;
pub use sql::SqlLexer;

pub(crate) fn is_space_char(ch: u8) -> bool {
    ch == b' ' || (0x09..=0x0D).contains(&ch)
}

/// A language lexer: colourise writes styles, fold reads them and writes
/// per-line fold levels.
pub trait Lexer {
    fn language(&self) -> &'static str;

    fn colourise(
        &mut self,
        styler: &mut dyn Styler,
        start: usize,
        length: usize,
        init_style: u8,
    );

    fn fold(
        &mut self,
        styler: &mut dyn Styler,
        start: usize,
        length: usize,
        init_style: u8,
    );
}

impl Lexer for SqlLexer {
    fn language(&self) -> &'static str {
        "sql"
    }

    fn colourise(
        &mut self,
        styler: &mut dyn Styler,
        start: usize,
        length: usize,
        init_style: u8,
    ) {
        SqlLexer::colourise(self, styler, start, length, init_style)
    }

    fn fold(
        &mut self,
        styler: &mut dyn Styler,
        start: usize,
        length: usize,
        init_style: u8,
    ) {
        SqlLexer::fold(self, styler, start, length, init_style)
    }
}

impl Lexer for PropsLexer {
    fn language(&self) -> &'static str {
        "props"
    }

    fn colourise(
        &mut self,
        styler: &mut dyn Styler,
        start: usize,
        length: usize,
        init_style: u8,
    ) {
        PropsLexer::colourise(self, styler, start, length, init_style)
    }

    fn fold(
        &mut self,
        styler: &mut dyn Styler,
        start: usize,
        length: usize,
        init_style: u8,
    ) {
        PropsLexer::fold(self, styler, start, length, init_style)
    }
}

/// A fresh lexer for `language`, or `None` when the language is unknown.
pub fn lexer_for(language: &str) -> Option<Box<dyn Lexer>> {
    match language {
        "sql" => Some(Box::<SqlLexer>::default()),
        "props" => Some(Box::<PropsLexer>::default()),
        _ => None,
    }
}
