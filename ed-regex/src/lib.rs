/*!
Line-local regular expression search for editor buffers.

Patterns compile to a flat byte program (a small non-deterministic automaton)
which a recursive backtracking matcher executes against any
[`CharacterIndexer`], so the engine never sees the hosting buffer directly
and never allocates per character.

Supported syntax:

- `.` any character; `^` / `$` anchors when first / last in the pattern,
  literal elsewhere.
- `[...]` character sets with `^` complement, literal leading `-` or `]`,
  and inclusive `c1-c2` ranges.
- `*` greedy, `*?` lazy, `+` one-or-more, `?` optional, each applying to
  the last single-character atom; doubled closures are idempotent.
- `\(` `\)` tagged groups (plain `(` `)` with [`FindOption::POSIX`]) and
  `\1`..`\9` back-references.
- `\a \b \f \n \r \t \v \e` control escapes, `\xHH` hex escapes,
  `\d \D \s \S \w \W` classes, `\<` `\>` word boundaries, and the
  word-oracle forms `\h` (word start), `\H` (word end), `\i` (consume to
  word end).

Matching is line-local: the caller passes the bounds of one line and the
engine treats them as beginning and end of input. Word-ness is defined by the
host's [`CharClassify`] table.

## Example
```
use ed_regex::{FindOption, Regex};
use ed_text::buffer::TextBuffer;

let text = TextBuffer::new("foobar-foobar");
let mut re = Regex::default();
re.compile(br"\(fo.*\)-\1", FindOption::MATCH_CASE).unwrap();
let m = re.execute(&text, 0, 13).unwrap();
assert_eq!(m.range(), 0..13);
assert_eq!(re.group(1), Some(0..6));
```

A compiled program is cached: recompiling the identical pattern with the
identical options is a no-op. The worst case of the backtracking matcher is
exponential; hosts bound work by bounding the range they search.
*/

use std::ops::Range;

use bitflags::bitflags;
use ed_text::CharClassify;

mod compile;
mod execute;

pub use compile::CompileError;

/// Maximum compiled program size in bytes.
pub const MAXNFA: usize = 2048;
/// Capture slots: group 0 is the whole match, 1..9 are tagged groups.
pub const MAXTAG: usize = 10;

pub(crate) const BITBLK: usize = 32;

/// Program opcodes. A character class opcode is followed by a 32-byte
/// bitset; closure opcodes are followed by exactly one inlined atom and a
/// terminating `END`.
pub(crate) mod op {
    pub const END: u8 = 0;
    pub const CHR: u8 = 1;
    pub const ANY: u8 = 2;
    pub const CCL: u8 = 3;
    pub const BOL: u8 = 4;
    pub const EOL: u8 = 5;
    pub const BOT: u8 = 6;
    pub const EOT: u8 = 7;
    pub const BOW: u8 = 8;
    pub const EOW: u8 = 9;
    pub const REF: u8 = 10;
    pub const CLO: u8 = 11;
    pub const CLQ: u8 = 12;
    pub const LCLO: u8 = 13;
    pub const WORD_START: u8 = 14;
    pub const WORD_END: u8 = 15;
    pub const TO_WORD_END: u8 = 16;
    pub const TO_WORD_END_OPT: u8 = 17;
}

bitflags! {
    /// Search options participating in the compile cache fingerprint.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct FindOption: u32 {
        /// Match letter case exactly. Without it, both cases are
        /// materialised into the compiled program.
        const MATCH_CASE = 1 << 0;
        /// `(` `)` group directly; `\(` `\)` are then literal escapes.
        const POSIX = 1 << 1;
    }
}

/// A successful whole-pattern match (group 0).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    pub(crate) start: usize,
    pub(crate) end: usize,
}

impl Match {
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// A regular expression search engine.
///
/// One instance owns its compiled program, its compile cache and its capture
/// table; it is not meant to be shared between concurrent callers. Compile
/// once with [`compile`], then run [`execute`] over as many ranges as
/// needed; captures of the last successful execution stay readable until the
/// next call.
///
/// [`compile`]: Regex::compile
/// [`execute`]: Regex::execute
pub struct Regex {
    char_class: CharClassify,
    pub(crate) program: Vec<u8>,
    pub(crate) ready: bool,
    pub(crate) failure: bool,
    pub(crate) bol: usize,
    pub(crate) bopat: [Option<usize>; MAXTAG],
    pub(crate) eopat: [Option<usize>; MAXTAG],
    pat: [Vec<u8>; MAXTAG],
    pub(crate) cache: Option<(Vec<u8>, FindOption)>,
}

impl Default for Regex {
    fn default() -> Self {
        Self::new(CharClassify::default())
    }
}

impl Regex {
    /// An engine classifying word characters with `char_class`.
    pub fn new(char_class: CharClassify) -> Self {
        Self {
            char_class,
            program: Vec::new(),
            ready: false,
            failure: false,
            bol: 0,
            bopat: [None; MAXTAG],
            eopat: [None; MAXTAG],
            pat: Default::default(),
            cache: None,
        }
    }

    /// Reset all capture slots to not-found.
    pub fn clear(&mut self) {
        for i in 0..MAXTAG {
            self.pat[i].clear();
            self.bopat[i] = None;
            self.eopat[i] = None;
        }
    }

    /// Drop the compile-cache fingerprint; the next [`compile`](Regex::compile)
    /// recompiles unconditionally.
    pub fn clear_cache(&mut self) {
        self.ready = false;
        self.cache = None;
    }

    /// Bounds of capture group `n` from the last successful execution.
    pub fn group(&self, n: usize) -> Option<Range<usize>> {
        match (self.bopat.get(n).copied()?, self.eopat.get(n).copied()?) {
            (Some(b), Some(e)) => Some(b..e),
            _ => None,
        }
    }

    /// Text grabbed for group `n` by [`grab_matches`](Regex::grab_matches).
    pub fn captured(&self, n: usize) -> &[u8] {
        &self.pat[n]
    }

    /// Whether the last execution tripped over a structurally invalid
    /// program. Unreachable for programs produced by this compiler; kept as
    /// a diagnostic for hosts.
    pub fn failed(&self) -> bool {
        self.failure
    }

    pub(crate) fn iswordc(&self, c: u8) -> bool {
        self.char_class.is_word(c)
    }

    pub(crate) fn set_captured(&mut self, n: usize, text: Vec<u8>) {
        self.pat[n] = text;
    }
}
