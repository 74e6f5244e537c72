//! Program execution: linear scan plus recursive backtracking.

use ed_text::CharacterIndexer;

use crate::{op, Match, Regex, BITBLK, MAXTAG};

// Bytes a closure opcode spans together with its inlined atom and END.
const ANYSKIP: usize = 2; // CLO ANY END
const CHRSKIP: usize = 3; // CLO CHR c END
const CCLSKIP: usize = 2 + BITBLK; // CLO CCL bitset END

fn in_set(set: &[u8], c: u8) -> bool {
    set[(c >> 3) as usize] & (1 << (c & 7)) != 0
}

impl Regex {
    /// Search `[lp, endp)` for the compiled pattern.
    ///
    /// On success the whole-match bounds are also recorded in capture slot 0
    /// and tagged groups are readable through [`group`](Regex::group). With
    /// no valid program compiled, returns `None`.
    pub fn execute<C: CharacterIndexer + ?Sized>(
        &mut self,
        ci: &C,
        lp: usize,
        endp: usize,
    ) -> Option<Match> {
        if !self.ready || self.program.is_empty() {
            return None;
        }

        self.bol = lp;
        self.failure = false;
        self.clear();

        let mut lp = lp;
        let ep = match self.program[0] {
            // Anchored: match from the beginning only.
            op::BOL => self.pmatch(ci, lp, endp, 0, 1, None),
            // A pattern that is only `$` matches the empty string at the
            // end; `$` followed by anything else can never match.
            op::EOL => {
                if self.program.get(1) == Some(&op::END) {
                    lp = endp;
                    Some(lp)
                } else {
                    return None;
                }
            }
            // Nothing compiled.
            op::END => return None,
            first => {
                // Ordinary char first: locate it without entering pmatch.
                if first == op::CHR {
                    let c = self.program[1];
                    while lp < endp && ci.char_at(lp) != c {
                        lp += 1;
                    }
                    if lp >= endp {
                        return None;
                    }
                }
                let mut found = None;
                while lp < endp {
                    let mut offset: isize = 1;
                    if let Some(e) =
                        self.pmatch(ci, lp, endp, 0, 1, Some(&mut offset))
                    {
                        found = Some(e);
                        break;
                    }
                    // Boundary opcodes may have asked to skip more than one
                    // byte.
                    lp = (lp as isize + offset) as usize;
                }
                found
            }
        }?;

        self.bopat[0] = Some(lp);
        self.eopat[0] = Some(ep);
        Some(Match { start: lp, end: ep })
    }

    /// Copy the text of every successful capture out of the host buffer.
    pub fn grab_matches<C: CharacterIndexer + ?Sized>(&mut self, ci: &C) {
        for i in 0..MAXTAG {
            if let (Some(b), Some(e)) = (self.bopat[i], self.eopat[i]) {
                self.set_captured(i, (b..e).map(|j| ci.char_at(j)).collect());
            }
        }
    }

    fn pmatch<C: CharacterIndexer + ?Sized>(
        &mut self,
        ci: &C,
        mut lp: usize,
        endp: usize,
        mut ap: usize,
        move_dir: isize,
        mut offset: Option<&mut isize>,
    ) -> Option<usize> {
        loop {
            let opcode = self.program[ap];
            ap += 1;
            match opcode {
                op::END => return Some(lp),

                op::CHR => {
                    let c = self.program[ap];
                    ap += 1;
                    if ci.char_at(lp) != c {
                        return None;
                    }
                    lp += 1;
                }

                op::ANY => {
                    if lp >= endp {
                        return None;
                    }
                    lp += 1;
                }

                op::CCL => {
                    if lp >= endp {
                        return None;
                    }
                    let c = ci.char_at(lp);
                    lp += 1;
                    if !in_set(&self.program[ap..ap + BITBLK], c) {
                        return None;
                    }
                    ap += BITBLK;
                }

                op::BOL => {
                    if lp != self.bol {
                        return None;
                    }
                }

                op::EOL => {
                    if lp < endp {
                        return None;
                    }
                }

                op::BOT => {
                    lp = ci.move_position_outside_char(lp, -1);
                    let n = self.program[ap] as usize;
                    ap += 1;
                    self.bopat[n] = Some(lp);
                }

                op::EOT => {
                    lp = ci.move_position_outside_char(lp, 1);
                    let n = self.program[ap] as usize;
                    ap += 1;
                    self.eopat[n] = Some(lp);
                }

                op::BOW => {
                    if (lp != self.bol && self.iswordc(ci.char_at(lp - 1)))
                        || !self.iswordc(ci.char_at(lp))
                    {
                        return None;
                    }
                }

                op::EOW => {
                    if lp == self.bol
                        || !self.iswordc(ci.char_at(lp - 1))
                        || self.iswordc(ci.char_at(lp))
                    {
                        return None;
                    }
                }

                op::WORD_START => {
                    if !ci.is_word_start_at(lp) {
                        if let Some(off) = offset.as_deref_mut() {
                            *off = movement_hint(ci, lp, move_dir);
                        }
                        return None;
                    }
                }

                op::WORD_END => {
                    if lp == self.bol || !ci.is_word_end_at(lp) {
                        if let Some(off) = offset.as_deref_mut() {
                            *off = movement_hint(ci, lp, move_dir);
                        }
                        return None;
                    }
                }

                op::TO_WORD_END | op::TO_WORD_END_OPT => {
                    let e = ci.extend_word_select(lp, move_dir);
                    if (e == lp && opcode != op::TO_WORD_END_OPT)
                        || !ci.is_word_end_at(e)
                    {
                        if let Some(off) = offset.as_deref_mut() {
                            let d = if e == lp {
                                ci.next_position(lp, move_dir) as isize
                                    - lp as isize
                            } else {
                                e as isize - lp as isize
                            };
                            *off = if d == 0 { move_dir } else { d };
                        }
                        return None;
                    }
                    lp = e;
                }

                op::REF => {
                    let n = self.program[ap] as usize;
                    ap += 1;
                    // An unset tag replays the empty string.
                    if let (Some(mut bp), Some(ep)) =
                        (self.bopat[n], self.eopat[n])
                    {
                        while bp < ep {
                            if ci.char_at(bp) != ci.char_at(lp) {
                                return None;
                            }
                            bp += 1;
                            lp += 1;
                        }
                    }
                }

                op::LCLO | op::CLQ | op::CLO => {
                    let are = lp;
                    let skip = match self.program[ap] {
                        op::ANY => {
                            if opcode == op::CLO || opcode == op::LCLO {
                                if lp < endp {
                                    lp = endp;
                                }
                            } else if lp < endp {
                                lp += 1;
                            }
                            ANYSKIP
                        }
                        op::CHR => {
                            let c = self.program[ap + 1];
                            if opcode == op::CLO || opcode == op::LCLO {
                                while lp < endp && ci.char_at(lp) == c {
                                    lp += 1;
                                }
                            } else if lp < endp && ci.char_at(lp) == c {
                                lp += 1;
                            }
                            CHRSKIP
                        }
                        op::CCL => {
                            while lp < endp
                                && in_set(
                                    &self.program[ap + 1..ap + 1 + BITBLK],
                                    ci.char_at(lp),
                                )
                            {
                                lp += 1;
                            }
                            CCLSKIP
                        }
                        _ => {
                            self.failure = true;
                            return None;
                        }
                    };
                    ap += skip;

                    // Greedy closures keep the first (longest) tail match;
                    // the lazy closure keeps overwriting until the shortest
                    // survives.
                    let mut e = None;
                    let mut llp = lp as isize;
                    while llp >= are as isize {
                        let mut qoff: isize = -1;
                        if let Some(q) = self.pmatch(
                            ci,
                            llp as usize,
                            endp,
                            ap,
                            -1,
                            Some(&mut qoff),
                        ) {
                            e = Some(q);
                            lp = llp as usize;
                            if opcode != op::LCLO {
                                return e;
                            }
                        }
                        if self.program[ap] == op::END {
                            return e;
                        }
                        llp += qoff;
                    }
                    // Close the enclosing tag over the winning span.
                    if self.program[ap] == op::EOT {
                        self.pmatch(ci, lp, endp, ap, 1, None);
                    }
                    return e;
                }

                _ => return None,
            }
        }
    }
}

fn movement_hint<C: CharacterIndexer + ?Sized>(
    ci: &C,
    lp: usize,
    move_dir: isize,
) -> isize {
    let e = ci.move_position_outside_char(lp, move_dir);
    let d = if e == lp {
        ci.next_position(lp, move_dir) as isize - lp as isize
    } else {
        e as isize - lp as isize
    };
    if d == 0 {
        move_dir
    } else {
        d
    }
}
