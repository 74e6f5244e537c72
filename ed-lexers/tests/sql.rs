use ed_lexers::sql::{SqlLexer, SqlStyle};
use ed_text::{buffer::TextBuffer, level, Styler, WordList};

const KEYWORDS: &str = "select insert update delete from where begin end if \
    then else elsif loop case when while repeat exit merge into using on \
    matched not and or exception declare function procedure package start \
    values set";

fn lexer() -> SqlLexer {
    SqlLexer::builder()
        .keywords(WordList::new(KEYWORDS))
        .objects(WordList::new("table index view sysdate"))
        .user1(WordList::new("con(cat) substr("))
        .build()
}

fn colourised(text: &str, props: &[(&str, i32)]) -> (TextBuffer, SqlLexer) {
    let mut buf = TextBuffer::new(text);
    for &(name, value) in props {
        buf.set_property(name, value);
    }
    let mut lx = lexer();
    lx.colourise(&mut buf, 0, text.len(), 0);
    (buf, lx)
}

fn folded(text: &str, props: &[(&str, i32)]) -> (TextBuffer, SqlLexer) {
    let (mut buf, mut lx) = colourised(text, props);
    lx.fold(&mut buf, 0, text.len(), 0);
    (buf, lx)
}

fn style(buf: &TextBuffer, pos: usize) -> SqlStyle {
    SqlStyle::from_u8(buf.style_at(pos))
}

fn assert_styles(buf: &TextBuffer, spans: &[(usize, usize, SqlStyle)]) {
    for &(from, to, expected) in spans {
        for pos in from..=to {
            assert_eq!(
                style(buf, pos),
                expected,
                "style at {pos} ({:?})",
                buf.char_at(pos) as char
            );
        }
    }
}

fn level_of(buf: &TextBuffer, line: usize) -> i32 {
    buf.level_at(line) & level::FOLD_NUMBER_MASK
}

fn next_level_of(buf: &TextBuffer, line: usize) -> i32 {
    (buf.level_at(line) >> 16) & level::FOLD_NUMBER_MASK
}

fn is_header(buf: &TextBuffer, line: usize) -> bool {
    buf.level_at(line) & level::FOLD_HEADER_FLAG != 0
}

const BASE: i32 = level::FOLD_BASE;

#[test]
fn token_soup() {
    let text = r#"SELECT 0x1F, 'it''s', "a""b", `ident`, 3.14e+2 FROM t;"#;
    let (buf, _) = colourised(text, &[]);
    assert_styles(
        &buf,
        &[
            (0, 5, SqlStyle::Word),           // SELECT
            (6, 6, SqlStyle::Default),
            (7, 10, SqlStyle::Hex),           // 0x1F
            (11, 11, SqlStyle::Operator),
            (13, 19, SqlStyle::Character),    // 'it''s'
            (22, 27, SqlStyle::String),       // "a""b"
            (30, 36, SqlStyle::QuotedIdentifier),
            (39, 45, SqlStyle::Number),       // 3.14e+2
            (47, 50, SqlStyle::Word),         // FROM
            (52, 52, SqlStyle::Identifier),   // t
            (53, 53, SqlStyle::Operator),
        ],
    );
}

#[test]
fn numeric_literals() {
    let text = "0b01 b'1' x'AF' .5 1e9 1.2.3";
    let (buf, _) = colourised(text, &[]);
    assert_styles(
        &buf,
        &[
            (0, 3, SqlStyle::Bit),
            (5, 8, SqlStyle::Bit2),
            (10, 14, SqlStyle::Hex2),
            (16, 17, SqlStyle::Number), // .5
            (19, 21, SqlStyle::Number), // 1e9
        ],
    );
    // Only a doubled dot ends a number, so a.b.c-style version numbers
    // lex as one token.
    assert_styles(&buf, &[(23, 27, SqlStyle::Number)]);
}

#[test]
fn variables_and_comments() {
    let text = "@var /* c */ -- eol\n# doc\nx";
    let (buf, _) = colourised(text, &[]);
    assert_styles(
        &buf,
        &[
            (0, 3, SqlStyle::Variable),
            (5, 11, SqlStyle::Comment),
            (13, 18, SqlStyle::CommentLine),
            (20, 24, SqlStyle::CommentLineDoc),
            (26, 26, SqlStyle::Identifier),
        ],
    );
}

#[test]
fn numbersign_comment_can_be_disabled() {
    let text = "# not a comment";
    let (buf, _) = colourised(text, &[("lexer.sql.numbersign.comment", 0)]);
    assert_eq!(style(&buf, 0), SqlStyle::Default);
}

#[test]
fn backtick_identifier_can_be_disabled() {
    let text = "`q`";
    let (buf, _) = colourised(text, &[("lexer.sql.backticks.identifier", 0)]);
    assert_eq!(style(&buf, 0), SqlStyle::Default);
    let (buf, _) = colourised(text, &[]);
    assert_eq!(style(&buf, 0), SqlStyle::QuotedIdentifier);
}

#[test]
fn backslash_escapes_option() {
    let text = r"'a\'b' x";
    let (buf, _) = colourised(text, &[]);
    // With escapes on (default) the escaped quote does not close.
    assert_styles(&buf, &[(0, 5, SqlStyle::Character)]);
    assert_eq!(style(&buf, 7), SqlStyle::Identifier);

    let (buf, _) = colourised(text, &[("lexer.sql.backslash.escapes", 0)]);
    // With escapes off the literal closes at the second quote.
    assert_styles(&buf, &[(0, 3, SqlStyle::Character)]);
}

#[test]
fn dotted_word_option() {
    let text = "a.b";
    let (buf, _) = colourised(text, &[]);
    assert_eq!(style(&buf, 1), SqlStyle::Operator);
    let (buf, _) = colourised(text, &[("lexer.sql.allow.dotted.word", 1)]);
    assert_eq!(style(&buf, 1), SqlStyle::Identifier);
}

#[test]
fn user_keywords_only_before_parenthesis() {
    let text = "concat (x) concat";
    let (buf, _) = colourised(text, &[]);
    // Abbreviated entry "con(cat)" matches, and a parenthesis follows.
    assert_styles(&buf, &[(0, 5, SqlStyle::User1)]);
    // No parenthesis after the second occurrence.
    assert_styles(&buf, &[(11, 16, SqlStyle::Identifier)]);
}

#[test]
fn keyword_lists_resolve() {
    let text = "select sysdate other";
    let (buf, _) = colourised(text, &[]);
    assert_styles(
        &buf,
        &[
            (0, 5, SqlStyle::Word),
            (7, 13, SqlStyle::Word2),
            (15, 19, SqlStyle::Identifier),
        ],
    );
}

#[test]
fn colourise_is_idempotent() {
    let text = "SELECT 'a' /* c\nc */ -- x\nFROM t;";
    let (mut buf, mut lx) = colourised(text, &[]);
    let first = buf.styles().to_vec();
    lx.colourise(&mut buf, 0, text.len(), 0);
    assert_eq!(buf.styles(), &first[..]);
}

#[test]
fn colourise_restarts_at_line_boundaries() {
    let text = "SELECT 'open\nstill' /* span\nspan */ -- c\nFROM t;\n";
    let (full, _) = colourised(text, &[]);

    let mut buf = TextBuffer::new(text);
    let mut lx = lexer();
    let mut start = 0;
    for line in 0..buf.lines() {
        let end = if line + 1 < buf.lines() {
            buf.line_start(line + 1)
        } else {
            text.len()
        };
        let init = if start > 0 { buf.style_at(start - 1) } else { 0 };
        lx.colourise(&mut buf, start, end - start, init);
        start = end;
    }
    assert_eq!(buf.styles(), full.styles());
}

#[test]
fn single_line_if_opens_no_fold() {
    let text = "IF a THEN b; ELSE c; END IF;\n";
    let (buf, _) = folded(text, &[("fold", 1), ("fold.sql.at.else", 1)]);
    assert!(!is_header(&buf, 0));
    assert_eq!(level_of(&buf, 0), BASE);
    assert_eq!(next_level_of(&buf, 0), BASE);
}

#[test]
fn multi_line_if_folds() {
    let text = "IF a THEN\n  b;\nEND IF;\n";
    let (buf, _) = folded(text, &[("fold", 1)]);
    assert!(is_header(&buf, 0));
    assert_eq!(next_level_of(&buf, 0), BASE + 1);
    assert_eq!(level_of(&buf, 1), BASE + 1);
    assert_eq!(next_level_of(&buf, 2), BASE);
}

#[test]
fn begin_exception_end() {
    let text = "BEGIN\n  x := 1;\nEXCEPTION\n  WHEN others THEN\n    y := 2;\nEND;\n";
    let (buf, _) = folded(text, &[("fold", 1)]);
    assert!(is_header(&buf, 0));
    assert_eq!(next_level_of(&buf, 0), BASE + 1);
    // The WHEN inside the exception block opens nothing.
    for line in 1..=4 {
        assert_eq!(level_of(&buf, line), BASE + 1, "line {line}");
        assert!(!is_header(&buf, line), "line {line}");
    }
    assert_eq!(next_level_of(&buf, 5), BASE);
}

#[test]
fn merge_statement_folds_per_when() {
    let text = "MERGE INTO t USING s ON (c)\n\
                WHEN MATCHED THEN\n\
                  UPDATE SET a = 1\n\
                WHEN NOT MATCHED THEN\n\
                  INSERT (a) VALUES (1);\n";
    let (buf, _) = folded(text, &[("fold", 1)]);
    // MERGE opens one level; the first WHEN spends the no-WHEN credit.
    assert!(is_header(&buf, 0));
    assert_eq!(next_level_of(&buf, 0), BASE + 1);
    assert!(is_header(&buf, 1));
    assert_eq!(next_level_of(&buf, 1), BASE + 2);
    // The second WHEN closes the first branch and opens its own.
    assert!(is_header(&buf, 3));
    assert_eq!(level_of(&buf, 3), BASE + 1);
    assert_eq!(next_level_of(&buf, 3), BASE + 2);
    // The terminating semicolon closes both remaining levels.
    assert_eq!(next_level_of(&buf, 4), BASE);
}

#[test]
fn nested_case_expression_nets_to_zero() {
    let text = "CASE x WHEN 1 THEN CASE y WHEN 2 THEN 'a' END END\n";
    let (buf, _) = folded(text, &[("fold", 1)]);
    assert_eq!(level_of(&buf, 0), BASE);
    assert_eq!(next_level_of(&buf, 0), BASE);
    assert!(!is_header(&buf, 0));
}

#[test]
fn case_folds_per_when() {
    let text = "CASE x\n\
                WHEN 1 THEN a;\n\
                WHEN 2 THEN b;\n\
                END CASE;\n";
    let (buf, _) = folded(text, &[("fold", 1)]);
    assert!(is_header(&buf, 0));
    assert_eq!(next_level_of(&buf, 0), BASE + 1);
    assert!(is_header(&buf, 1));
    assert_eq!(next_level_of(&buf, 1), BASE + 2);
    assert!(is_header(&buf, 2));
    assert_eq!(level_of(&buf, 2), BASE + 1);
    // END CASE closes the branch and the statement.
    assert_eq!(next_level_of(&buf, 3), BASE);
}

#[test]
fn exit_when_opens_no_fold() {
    let text = "LOOP\n  EXIT WHEN a > 1;\n  b;\nEND LOOP;\n";
    let (buf, _) = folded(text, &[("fold", 1)]);
    assert!(is_header(&buf, 0));
    assert_eq!(level_of(&buf, 1), BASE + 1);
    assert!(!is_header(&buf, 1));
    assert_eq!(level_of(&buf, 2), BASE + 1);
    assert_eq!(next_level_of(&buf, 3), BASE);
}

#[test]
fn stream_comment_opens_and_closes() {
    let text = "/* block */ -- line\nx\n";
    let (buf, _) = folded(text, &[("fold", 1)]);
    // Opened at /* and closed at */ within the line.
    assert_eq!(level_of(&buf, 0), BASE);
    assert_eq!(next_level_of(&buf, 0), BASE);
    assert!(!is_header(&buf, 0));
}

#[test]
fn multi_line_stream_comment_folds() {
    let text = "/* one\ntwo\n*/\nx\n";
    let (buf, _) = folded(text, &[("fold", 1)]);
    assert!(is_header(&buf, 0));
    assert_eq!(level_of(&buf, 1), BASE + 1);
    assert_eq!(next_level_of(&buf, 2), BASE);
}

#[test]
fn line_comment_group_folds() {
    let text = "-- first\n-- second\nx\n";
    let (buf, _) = folded(text, &[("fold", 1)]);
    assert!(is_header(&buf, 0));
    assert_eq!(next_level_of(&buf, 0), BASE + 1);
    assert_eq!(level_of(&buf, 1), BASE + 1);
    assert_eq!(next_level_of(&buf, 1), BASE);
}

#[test]
fn fold_requires_property() {
    let text = "BEGIN\nx;\nEND;\n";
    let (buf, _) = folded(text, &[]);
    for line in 0..3 {
        assert_eq!(buf.level_at(line), BASE);
    }
}

#[test]
fn fold_compact_flags_blank_lines() {
    let text = "BEGIN\n\nEND;\n";
    let (buf, _) = folded(text, &[("fold", 1), ("fold.compact", 1)]);
    assert_ne!(buf.level_at(1) & level::FOLD_WHITE_FLAG, 0);
    let (buf, _) = folded(text, &[("fold", 1)]);
    assert_eq!(buf.level_at(1) & level::FOLD_WHITE_FLAG, 0);
}

#[test]
fn header_iff_next_level_greater() {
    let text = "BEGIN\nIF a THEN\n  x;\nEND IF;\nEND;\n";
    let (buf, _) = folded(text, &[("fold", 1)]);
    for line in 0..5 {
        let header = is_header(&buf, line);
        let opens = next_level_of(&buf, line) > level_of(&buf, line);
        assert_eq!(header, opens, "line {line}");
        assert!(level_of(&buf, line) >= BASE);
    }
}

#[test]
fn fold_restarts_from_stored_line_state() {
    let text = "MERGE INTO t USING s ON (c)\n\
                WHEN MATCHED THEN\n\
                  UPDATE SET a = 1\n\
                WHEN NOT MATCHED THEN\n\
                  INSERT (a) VALUES (1);\n";
    let (mut buf, mut lx) = folded(text, &[("fold", 1)]);
    let all: Vec<i32> = (0..buf.lines()).map(|l| buf.level_at(l)).collect();

    // Refolding only the tail reuses the persisted per-line state.
    let restart = buf.line_start(3);
    let init = buf.style_at(restart - 1);
    lx.fold(&mut buf, restart, text.len() - restart, init);
    let again: Vec<i32> = (0..buf.lines()).map(|l| buf.level_at(l)).collect();
    assert_eq!(all, again);
}

#[test]
fn select_statement_unfolds_extra_level_at_end() {
    let text = "x := CASE\nWHEN 1 THEN 2\nEND;\n";
    let (buf, _) = folded(text, &[("fold", 1)]);
    // The assignment latch makes END close the implicit statement level
    // too; the base clamp keeps the level legal.
    for line in 0..3 {
        assert!(level_of(&buf, line) >= BASE);
        assert!(next_level_of(&buf, line) >= BASE);
    }
    assert_eq!(next_level_of(&buf, 2), BASE);
}

mod restart_property {
    use proptest::prelude::*;

    use super::*;

    fn fragment() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec![
            "SELECT a FROM t;",
            "BEGIN",
            "END;",
            "IF a THEN",
            "END IF;",
            "x := 'it''s';",
            "/* span",
            "span */",
            "-- note",
            "# note",
            "\"quo\"\"ted\"",
            "0x1F 3.14e+2",
            "`quoted id`",
            "CASE x WHEN 1 THEN 2 END",
            "",
            "   ",
        ])
    }

    proptest! {
        // Styling line by line, restarting with the style before each
        // line start, matches one pass over the whole document.
        #[test]
        fn line_restart_matches_full_pass(
            lines in prop::collection::vec(fragment(), 1..12),
        ) {
            let text = lines.join("\n");
            let (full, _) = colourised(&text, &[]);

            let mut buf = TextBuffer::new(&text);
            let mut lx = lexer();
            let mut start = 0;
            for line in 0..buf.lines() {
                let end = if line + 1 < buf.lines() {
                    buf.line_start(line + 1)
                } else {
                    text.len()
                };
                let init = if start > 0 { buf.style_at(start - 1) } else { 0 };
                lx.colourise(&mut buf, start, end - start, init);
                start = end;
            }
            prop_assert_eq!(buf.styles(), full.styles());
        }
    }
}
