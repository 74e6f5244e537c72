//! Pattern compilation.

use thiserror::Error;
use tracing::trace;

use crate::{op, FindOption, Regex, BITBLK, MAXNFA, MAXTAG};

/// Why a pattern failed to compile. The `Display` form is the short reason
/// reported to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("No previous regular expression")]
    NoPreviousPattern,
    #[error("Pattern too long")]
    PatternTooLong,
    #[error("Missing ]")]
    MissingBracket,
    #[error("Empty closure")]
    EmptyClosure,
    #[error("Illegal closure")]
    IllegalClosure,
    #[error("Null pattern inside \\<\\>")]
    NullPatternWordBoundary,
    #[error("Null pattern inside \\h\\H")]
    NullPatternWordStart,
    #[error("Null pattern inside ()")]
    NullPatternGroup,
    #[error("Cyclical reference")]
    CyclicalReference,
    #[error("Undetermined reference")]
    UndeterminedReference,
    #[error("Too many () pairs")]
    TooManyGroups,
    #[error("Unmatched )")]
    UnmatchedCloseGroup,
    #[error("Unmatched (")]
    UnmatchedOpenGroup,
}

// Program bytes the guard keeps free for the instruction being emitted: one
// bitset plus operands.
const EMIT_HEADROOM: usize = BITBLK + 10;

fn ch_set(bittab: &mut [u8; BITBLK], c: u8) {
    bittab[(c >> 3) as usize] |= 1 << (c & 7);
}

fn ch_set_with_case(bittab: &mut [u8; BITBLK], c: u8, case_sensitive: bool) {
    ch_set(bittab, c);
    if !case_sensitive {
        if c.is_ascii_lowercase() {
            ch_set(bittab, c.to_ascii_uppercase());
        } else if c.is_ascii_uppercase() {
            ch_set(bittab, c.to_ascii_lowercase());
        }
    }
}

fn escape_value(c: u8) -> Option<u8> {
    Some(match c {
        b'a' => 0x07,
        b'b' => 0x08,
        b'f' => 0x0C,
        b'n' => b'\n',
        b'r' => b'\r',
        b't' => b'\t',
        b'v' => 0x0B,
        b'e' => 0x1B,
        _ => return None,
    })
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Regex {
    /// Compile `pattern` into the engine.
    ///
    /// A successful compile records a fingerprint of the pattern bytes and
    /// options; compiling the same pair again is a no-op. An empty pattern
    /// reuses the previous program when one exists. On error the engine
    /// matches nothing until a successful recompile.
    pub fn compile(
        &mut self,
        pattern: &[u8],
        flags: FindOption,
    ) -> Result<(), CompileError> {
        if self.ready {
            let unchanged = pattern.is_empty()
                || self
                    .cache
                    .as_ref()
                    .is_some_and(|(p, f)| *f == flags && p.as_slice() == pattern);
            if unchanged {
                trace!("pattern cache hit");
                return Ok(());
            }
        }
        if pattern.is_empty() {
            return Err(CompileError::NoPreviousPattern);
        }

        match self.do_compile(pattern, flags) {
            Ok(program) => {
                trace!(bytes = program.len(), "compiled pattern");
                self.program = program;
                self.ready = true;
                self.cache = Some((pattern.to_vec(), flags));
                Ok(())
            }
            Err(err) => {
                self.program.clear();
                self.ready = false;
                Err(err)
            }
        }
    }

    fn do_compile(
        &self,
        pattern: &[u8],
        flags: FindOption,
    ) -> Result<Vec<u8>, CompileError> {
        let case_sensitive = flags.contains(FindOption::MATCH_CASE);
        let posix = flags.contains(FindOption::POSIX);

        let mut prog: Vec<u8> = Vec::with_capacity(pattern.len() * 2);
        let mut bittab = [0u8; BITBLK];
        let mut tagstk = [0usize; MAXTAG];
        let mut tagi = 0usize; // tag stack index
        let mut tagc = 1usize; // next tag number

        // Start index of the previously emitted instruction; closures apply
        // to it.
        let mut prev = 0usize;

        let mut i = 0usize;
        while i < pattern.len() {
            if prog.len() > MAXNFA - EMIT_HEADROOM {
                return Err(CompileError::PatternTooLong);
            }
            let start = prog.len();
            let mut instr = start;
            let ch = pattern[i];
            match ch {
                b'.' => prog.push(op::ANY),

                b'^' => {
                    if i == 0 {
                        prog.push(op::BOL);
                    } else {
                        prog.push(op::CHR);
                        prog.push(ch);
                    }
                }

                b'$' => {
                    if i + 1 == pattern.len() {
                        prog.push(op::EOL);
                    } else {
                        prog.push(op::CHR);
                        prog.push(ch);
                    }
                }

                b'[' => {
                    prog.push(op::CCL);
                    // Last single character seen, or -1 after a class
                    // escape (a following dash is then literal).
                    let mut prev_char: i32 = 0;
                    let mut mask = 0u8;

                    i += 1;
                    if pattern.get(i) == Some(&b'^') {
                        mask = 0xFF;
                        i += 1;
                    }
                    if pattern.get(i) == Some(&b'-') {
                        prev_char = b'-' as i32;
                        ch_set(&mut bittab, b'-');
                        i += 1;
                    }
                    if pattern.get(i) == Some(&b']') {
                        prev_char = b']' as i32;
                        ch_set(&mut bittab, b']');
                        i += 1;
                    }
                    while i < pattern.len() && pattern[i] != b']' {
                        let c = pattern[i];
                        if c == b'-' {
                            if prev_char < 0 {
                                prev_char = b'-' as i32;
                                ch_set(&mut bittab, b'-');
                            } else if i + 1 < pattern.len() {
                                if pattern[i + 1] != b']' {
                                    let c1 = prev_char + 1;
                                    i += 1;
                                    let mut c2 = pattern[i] as i32;
                                    if c2 == b'\\' as i32 {
                                        if i + 1 >= pattern.len() {
                                            return Err(CompileError::MissingBracket);
                                        }
                                        i += 1;
                                        let (value, incr) = self
                                            .backslash_expression(
                                                pattern,
                                                i,
                                                &mut bittab,
                                            );
                                        i += incr;
                                        c2 = value;
                                        if c2 >= 0 {
                                            // Escaped chars stay case
                                            // sensitive whatever the option.
                                            ch_set(&mut bittab, c2 as u8);
                                            prev_char = c2;
                                        } else {
                                            prev_char = -1;
                                        }
                                    }
                                    if prev_char < 0 {
                                        // Class after the dash: dash is
                                        // literal.
                                        prev_char = b'-' as i32;
                                        ch_set(&mut bittab, b'-');
                                    } else {
                                        let mut cc = c1;
                                        while cc <= c2 {
                                            ch_set_with_case(
                                                &mut bittab,
                                                cc as u8,
                                                case_sensitive,
                                            );
                                            cc += 1;
                                        }
                                    }
                                } else {
                                    // Dash before the ]: literal.
                                    prev_char = b'-' as i32;
                                    ch_set(&mut bittab, b'-');
                                }
                            } else {
                                return Err(CompileError::MissingBracket);
                            }
                        } else if c == b'\\' && i + 1 < pattern.len() {
                            i += 1;
                            let (value, incr) =
                                self.backslash_expression(pattern, i, &mut bittab);
                            i += incr;
                            if value >= 0 {
                                ch_set(&mut bittab, value as u8);
                                prev_char = value;
                            } else {
                                prev_char = -1;
                            }
                        } else {
                            prev_char = c as i32;
                            ch_set_with_case(&mut bittab, c, case_sensitive);
                        }
                        i += 1;
                    }
                    if i >= pattern.len() {
                        return Err(CompileError::MissingBracket);
                    }
                    for slot in bittab.iter_mut() {
                        prog.push(mask ^ *slot);
                        *slot = 0;
                    }
                }

                b'*' | b'+' | b'?' => {
                    if i == 0 {
                        return Err(CompileError::EmptyClosure);
                    }
                    let mut lp = prev;
                    instr = prev;
                    let prev_op = prog[lp];
                    if prev_op != op::CLO && prev_op != op::LCLO {
                        match prev_op {
                            op::BOL | op::BOT | op::EOT | op::BOW | op::EOW
                            | op::REF => {
                                return Err(CompileError::IllegalClosure)
                            }
                            _ => {}
                        }

                        if ch == b'?' && prev_op == op::TO_WORD_END {
                            prog[lp] = op::TO_WORD_END_OPT;
                        } else {
                            if ch == b'+' {
                                // One-or-more: keep the atom, close over a
                                // copy of it.
                                let atom = prog[lp..].to_vec();
                                lp = prog.len();
                                prog.extend_from_slice(&atom);
                                instr = lp;
                            }
                            let closure = if ch == b'?' {
                                op::CLQ
                            } else if pattern.get(i + 1) == Some(&b'?') {
                                op::LCLO
                            } else {
                                op::CLO
                            };
                            prog.insert(lp, closure);
                            prog.push(op::END);
                        }
                    }
                }

                b'\\' => {
                    i += 1;
                    match pattern.get(i).copied() {
                        Some(b'<') => prog.push(op::BOW),
                        Some(b'>') => {
                            if prog.get(prev) == Some(&op::BOW) {
                                return Err(
                                    CompileError::NullPatternWordBoundary,
                                );
                            }
                            prog.push(op::EOW);
                        }
                        Some(b'h') => prog.push(op::WORD_START),
                        Some(b'H') => {
                            if prog.get(prev) == Some(&op::WORD_START) {
                                return Err(CompileError::NullPatternWordStart);
                            }
                            prog.push(op::WORD_END);
                        }
                        Some(b'i') => prog.push(op::TO_WORD_END),
                        Some(d @ b'1'..=b'9') => {
                            let n = (d - b'0') as usize;
                            if tagi > 0 && tagstk[tagi] == n {
                                return Err(CompileError::CyclicalReference);
                            }
                            if tagc > n {
                                prog.push(op::REF);
                                prog.push(n as u8);
                            } else {
                                return Err(
                                    CompileError::UndeterminedReference,
                                );
                            }
                        }
                        Some(b'(') if !posix => {
                            if tagc < MAXTAG {
                                tagi += 1;
                                tagstk[tagi] = tagc;
                                prog.push(op::BOT);
                                prog.push(tagc as u8);
                                tagc += 1;
                            } else {
                                return Err(CompileError::TooManyGroups);
                            }
                        }
                        Some(b')') if !posix => {
                            if prog.get(prev) == Some(&op::BOT) {
                                return Err(CompileError::NullPatternGroup);
                            }
                            if tagi > 0 {
                                prog.push(op::EOT);
                                prog.push(tagstk[tagi] as u8);
                                tagi -= 1;
                            } else {
                                return Err(CompileError::UnmatchedCloseGroup);
                            }
                        }
                        None => {
                            // Trailing backslash, taken literally.
                            prog.push(op::CHR);
                            prog.push(b'\\');
                        }
                        Some(_) => {
                            let (value, incr) =
                                self.backslash_expression(pattern, i, &mut bittab);
                            i += incr;
                            if value >= 0 {
                                prog.push(op::CHR);
                                prog.push(value as u8);
                            } else {
                                prog.push(op::CCL);
                                for slot in bittab.iter_mut() {
                                    prog.push(*slot);
                                    *slot = 0;
                                }
                            }
                        }
                    }
                }

                _ => {
                    if posix && ch == b'(' {
                        if tagc < MAXTAG {
                            tagi += 1;
                            tagstk[tagi] = tagc;
                            prog.push(op::BOT);
                            prog.push(tagc as u8);
                            tagc += 1;
                        } else {
                            return Err(CompileError::TooManyGroups);
                        }
                    } else if posix && ch == b')' {
                        if prog.get(prev) == Some(&op::BOT) {
                            return Err(CompileError::NullPatternGroup);
                        }
                        if tagi > 0 {
                            prog.push(op::EOT);
                            prog.push(tagstk[tagi] as u8);
                            tagi -= 1;
                        } else {
                            return Err(CompileError::UnmatchedCloseGroup);
                        }
                    } else {
                        let c = if ch == 0 { b'\\' } else { ch };
                        if case_sensitive || !self.iswordc(c) {
                            prog.push(op::CHR);
                            prog.push(c);
                        } else {
                            // Both case mirrors as a two-bit class.
                            prog.push(op::CCL);
                            ch_set_with_case(&mut bittab, c, false);
                            for slot in bittab.iter_mut() {
                                prog.push(*slot);
                                *slot = 0;
                            }
                        }
                    }
                }
            }
            prev = instr;
            i += 1;
        }

        if tagi > 0 {
            return Err(CompileError::UnmatchedOpenGroup);
        }
        prog.push(op::END);
        Ok(prog)
    }

    /// Resolve a backslash expression at `pattern[i]` (the byte after the
    /// backslash). Returns the literal byte value, or -1 when the expression
    /// was a character class written into `bittab`, plus the number of extra
    /// bytes consumed.
    fn backslash_expression(
        &self,
        pattern: &[u8],
        i: usize,
        bittab: &mut [u8; BITBLK],
    ) -> (i32, usize) {
        let bsc = pattern[i];
        if bsc == 0 {
            return (b'\\' as i32, 0);
        }
        if let Some(value) = escape_value(bsc) {
            return (value as i32, 0);
        }
        match bsc {
            b'x' => {
                let hd1 = pattern.get(i + 1).and_then(|&c| hex_digit(c));
                let hd2 = pattern.get(i + 2).and_then(|&c| hex_digit(c));
                match (hd1, hd2) {
                    (Some(h1), Some(h2)) => (((h1 << 4) | h2) as i32, 2),
                    // \x without two digits is a plain x.
                    _ => (b'x' as i32, 0),
                }
            }
            b'd' => {
                for c in b'0'..=b'9' {
                    ch_set(bittab, c);
                }
                (-1, 0)
            }
            b'D' => {
                for c in 0..=255u8 {
                    if !c.is_ascii_digit() {
                        ch_set(bittab, c);
                    }
                }
                (-1, 0)
            }
            b's' => {
                for c in [b' ', b'\t', b'\n', b'\r', 0x0C, 0x0B] {
                    ch_set(bittab, c);
                }
                (-1, 0)
            }
            b'S' => {
                for c in 0..=255u8 {
                    if c != b' ' && !(0x09..=0x0D).contains(&c) {
                        ch_set(bittab, c);
                    }
                }
                (-1, 0)
            }
            b'w' => {
                for c in 0..=255u8 {
                    if self.iswordc(c) {
                        ch_set(bittab, c);
                    }
                }
                (-1, 0)
            }
            b'W' => {
                for c in 0..=255u8 {
                    if !self.iswordc(c) {
                        ch_set(bittab, c);
                    }
                }
                (-1, 0)
            }
            _ => (bsc as i32, 0),
        }
    }
}
