//! Canonical SQL text for the exact-match criterion.
//!
//! The statement is tokenized, keywords are lower-cased and the original
//! whitespace is thrown away. Tokens are then laid out again with a fixed
//! policy: every clause keyword starts a new line, indented two spaces per
//! open parenthesis, and everything else is separated by single spaces.
//! Because the layout depends only on the token sequence, two statements that
//! differ only in layout or keyword casing produce the same text, and
//! normalizing twice changes nothing.

use sqlparser::dialect::SQLiteDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};

const INDENT: &str = "  ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Keyword(Keyword),
    Word,
    Comma,
    LParen,
    RParen,
    Period,
    SemiColon,
    LineComment,
    BlockComment,
    Other,
}

#[derive(Debug)]
struct Lexeme {
    text: String,
    kind: Kind,
}

/// Canonicalize `sql`. Never fails: text the tokenizer rejects comes back
/// with whitespace runs collapsed and nothing else changed.
pub fn normalize(sql: &str) -> String {
    // backtick, bracket and double-quoted names are identifiers here
    let dialect = SQLiteDialect {};
    match Tokenizer::new(&dialect, sql).tokenize() {
        Ok(tokens) => layout(&lex(&tokens)),
        Err(e) => {
            tracing::debug!(
                event = "nl2sql.normalize.fallback",
                error = %e,
                "tokenizer rejected SQL, collapsing whitespace only"
            );
            sql.split_whitespace().collect::<Vec<_>>().join(" ")
        }
    }
}

/// True when both statements normalize to the same text.
pub fn exact_match(generated: &str, reference: &str) -> bool {
    normalize(generated) == normalize(reference)
}

fn lex(tokens: &[Token]) -> Vec<Lexeme> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let tok = &tokens[i];
        i += 1;

        // the tokenizer splits `1.5e3` into a number and the word `e3`
        if let Token::Number(n, false) = tok {
            let (exp, used) = exponent(&tokens[i..]);
            i += used;
            out.push(Lexeme {
                text: format!("{}{}", n, exp),
                kind: Kind::Other,
            });
            continue;
        }

        let (text, kind) = match tok {
            Token::EOF => continue,
            Token::Whitespace(Whitespace::SingleLineComment { comment, prefix }) => (
                format!("{}{}", prefix, comment.trim_end()),
                Kind::LineComment,
            ),
            Token::Whitespace(Whitespace::MultiLineComment(c)) => {
                (format!("/*{}*/", c), Kind::BlockComment)
            }
            Token::Whitespace(_) => continue,
            Token::Word(w) => match w.quote_style {
                None if w.keyword != Keyword::NoKeyword => {
                    (w.value.to_lowercase(), Kind::Keyword(w.keyword))
                }
                None => (w.value.clone(), Kind::Word),
                Some(open) => {
                    let close = closing_quote(open);
                    (
                        format!("{}{}{}", open, double(&w.value, close), close),
                        Kind::Word,
                    )
                }
            },
            // Display does not re-escape embedded quotes
            Token::SingleQuotedString(s) => (format!("'{}'", double(s, '\'')), Kind::Other),
            Token::DoubleQuotedString(s) => (format!("\"{}\"", double(s, '"')), Kind::Other),
            Token::NationalStringLiteral(s) => (format!("N'{}'", double(s, '\'')), Kind::Other),
            Token::HexStringLiteral(s) => (format!("X'{}'", double(s, '\'')), Kind::Other),
            Token::EscapedStringLiteral(s) => (
                format!("E'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
                Kind::Other,
            ),
            Token::Comma => (",".into(), Kind::Comma),
            Token::LParen => ("(".into(), Kind::LParen),
            Token::RParen => (")".into(), Kind::RParen),
            Token::Period => (".".into(), Kind::Period),
            Token::SemiColon => (";".into(), Kind::SemiColon),
            other => (other.to_string(), Kind::Other),
        };
        out.push(Lexeme { text, kind });
    }
    out
}

/// Exponent suffix glued to the number before `tokens`, and how many tokens
/// it spans.
fn exponent(tokens: &[Token]) -> (String, usize) {
    let Some(Token::Word(w)) = tokens.first() else {
        return (String::new(), 0);
    };
    let Some(digits) = w
        .value
        .strip_prefix('e')
        .or_else(|| w.value.strip_prefix('E'))
        .filter(|_| w.quote_style.is_none())
    else {
        return (String::new(), 0);
    };

    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return (format!("e{}", digits), 1);
    }
    if digits.is_empty() {
        let sign = match tokens.get(1) {
            Some(Token::Plus) => '+',
            Some(Token::Minus) => '-',
            _ => return (String::new(), 0),
        };
        if let Some(Token::Number(d, false)) = tokens.get(2) {
            if d.bytes().all(|b| b.is_ascii_digit()) {
                return (format!("e{}{}", sign, d), 3);
            }
        }
    }
    (String::new(), 0)
}

fn closing_quote(open: char) -> char {
    match open {
        '[' => ']',
        c => c,
    }
}

fn double(s: &str, quote: char) -> String {
    s.replace(quote, &format!("{}{}", quote, quote))
}

fn layout(lexemes: &[Lexeme]) -> String {
    let mut out = String::new();
    let mut depth = 0usize;
    let mut prev: Option<Kind> = None;

    for lx in lexemes {
        if lx.kind == Kind::RParen {
            depth = depth.saturating_sub(1);
        }

        match separator(prev, lx.kind) {
            Sep::None => {}
            Sep::Space => out.push(' '),
            Sep::Newline => {
                out.push('\n');
                out.push_str(&INDENT.repeat(depth));
            }
        }
        out.push_str(&lx.text);

        if lx.kind == Kind::LParen {
            depth += 1;
        }
        prev = Some(lx.kind);
    }
    out
}

enum Sep {
    None,
    Space,
    Newline,
}

fn separator(prev: Option<Kind>, cur: Kind) -> Sep {
    let Some(prev) = prev else {
        return Sep::None;
    };
    if prev == Kind::LineComment {
        return Sep::Newline;
    }
    if let Kind::Keyword(kw) = cur {
        if starts_clause(prev, kw) {
            return Sep::Newline;
        }
    }
    match (prev, cur) {
        (_, Kind::Comma | Kind::RParen | Kind::Period | Kind::SemiColon) => Sep::None,
        (Kind::LParen | Kind::Period, _) => Sep::None,
        // function call: `count(*)`, `upper(name)`
        (Kind::Word, Kind::LParen) => Sep::None,
        (Kind::Keyword(kw), Kind::LParen) if !is_structural(kw) => Sep::None,
        _ => Sep::Space,
    }
}

fn starts_clause(prev: Kind, kw: Keyword) -> bool {
    if prev == Kind::LParen {
        return false;
    }
    match kw {
        Keyword::SELECT
        | Keyword::FROM
        | Keyword::WHERE
        | Keyword::GROUP
        | Keyword::ORDER
        | Keyword::HAVING
        | Keyword::LIMIT
        | Keyword::OFFSET
        | Keyword::UNION
        | Keyword::EXCEPT
        | Keyword::INTERSECT
        | Keyword::VALUES
        | Keyword::SET => true,
        Keyword::JOIN
        | Keyword::LEFT
        | Keyword::RIGHT
        | Keyword::INNER
        | Keyword::FULL
        | Keyword::CROSS
        | Keyword::NATURAL => !matches!(prev, Kind::Keyword(p) if is_join_modifier(p)),
        _ => false,
    }
}

fn is_join_modifier(kw: Keyword) -> bool {
    matches!(
        kw,
        Keyword::LEFT
            | Keyword::RIGHT
            | Keyword::INNER
            | Keyword::OUTER
            | Keyword::FULL
            | Keyword::CROSS
            | Keyword::NATURAL
    )
}

/// Keywords that are followed by a parenthesized operand rather than called.
fn is_structural(kw: Keyword) -> bool {
    matches!(
        kw,
        Keyword::SELECT
            | Keyword::FROM
            | Keyword::WHERE
            | Keyword::AND
            | Keyword::OR
            | Keyword::NOT
            | Keyword::IN
            | Keyword::EXISTS
            | Keyword::ON
            | Keyword::AS
            | Keyword::JOIN
            | Keyword::VALUES
            | Keyword::UNION
            | Keyword::ALL
            | Keyword::HAVING
            | Keyword::BY
            | Keyword::WHEN
            | Keyword::THEN
            | Keyword::ELSE
            | Keyword::CASE
            | Keyword::SET
            | Keyword::INTO
            | Keyword::EXCEPT
            | Keyword::INTERSECT
            | Keyword::LIKE
            | Keyword::BETWEEN
            | Keyword::IS
            | Keyword::ANY
            | Keyword::USING
    )
}
