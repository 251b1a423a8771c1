use std::borrow::Cow;
use std::iter::Peekable;
use std::str::Chars;

const ELLIPSIS: &str = "...";

/// C0, DEL and C1 (`U+0080..=U+009F`), minus tab, newline and carriage return.
fn is_stripped_control(c: char) -> bool {
    c.is_control() && !matches!(c, '\t' | '\n' | '\r')
}

fn skip_csi(chars: &mut Peekable<Chars<'_>>) {
    for p in chars.by_ref() {
        if ('@'..='~').contains(&p) {
            break;
        }
    }
}

/// OSC ends at BEL, `ESC \` or the 8-bit ST (`U+009C`).
fn skip_osc(chars: &mut Peekable<Chars<'_>>) {
    while let Some(p) = chars.next() {
        if p == '\u{07}' || p == '\u{9c}' {
            break;
        }
        if p == '\u{1b}' && chars.peek() == Some(&'\\') {
            chars.next();
            break;
        }
    }
}

/// Remove terminal control sequences from remote text before printing it.
///
/// Article titles and descriptions come from arbitrary publishers, so an
/// embedded `ESC [ 2 J` would otherwise clear the user's terminal. Removes
/// CSI sequences (`ESC [` up to a final byte in `@..~`), OSC sequences
/// (`ESC ]` up to BEL or `ESC \`), their 8-bit forms `U+009B` and `U+009D`,
/// bare ESC, DEL, and C0 and C1 controls. Tab, newline and carriage return
/// survive.
///
/// Borrows when there is nothing to strip.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_stripped_control) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\u{9b}' => skip_csi(&mut chars),
            '\u{9d}' => skip_osc(&mut chars),
            '\u{1b}' => match chars.peek() {
                Some('[') => {
                    chars.next();
                    skip_csi(&mut chars);
                }
                Some(']') => {
                    chars.next();
                    skip_osc(&mut chars);
                }
                _ => {}
            },
            c if is_stripped_control(c) => {}
            c => out.push(c),
        }
    }

    Cow::Owned(out)
}

/// Cut `s` to at most `max_chars` characters, ending in `...` when shortened.
pub fn truncate_chars(s: &str, max_chars: usize) -> Cow<'_, str> {
    if s.chars().count() <= max_chars {
        return Cow::Borrowed(s);
    }
    if max_chars <= ELLIPSIS.len() {
        return Cow::Owned(s.chars().take(max_chars).collect());
    }
    let mut out: String = s.chars().take(max_chars - ELLIPSIS.len()).collect();
    out.push_str(ELLIPSIS);
    Cow::Owned(out)
}

/// Collapse runs of whitespace (newlines included) into single spaces.
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
