//! Just enough Python lexing to find comments and brackets on a line.
//!
//! Strings are tracked within a single line only; a line inside a
//! triple-quoted string that spans lines is read as code.

/// Byte offset of the `#` starting a trailing comment, if any.
pub(crate) fn comment_start(line: &str) -> Option<usize> {
    let mut quote: Option<(char, bool)> = None;
    let mut chars = line.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match quote {
            Some((q, triple)) => {
                if c == '\\' {
                    chars.next();
                } else if c == q {
                    if !triple {
                        quote = None;
                    } else if line[i..].starts_with(&q.to_string().repeat(3)) {
                        chars.next();
                        chars.next();
                        quote = None;
                    }
                }
            }
            None => match c {
                '#' => return Some(i),
                '\'' | '"' => {
                    let triple = line[i..].starts_with(&c.to_string().repeat(3));
                    if triple {
                        chars.next();
                        chars.next();
                    }
                    quote = Some((c, triple));
                }
                _ => {}
            },
        }
    }
    None
}

/// Offset of the bracket closing the one opened at `open`, skipping strings.
pub(crate) fn matching_close(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = text[open..].char_indices();
    while let Some((rel, c)) = chars.next() {
        if let Some(q) = quote {
            if c == '\\' {
                chars.next();
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + rel);
                }
            }
            _ => {}
        }
    }
    None
}

/// Offset of the first `target` outside brackets and strings.
pub(crate) fn find_top_level(text: &str, target: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            c if c == target && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Split `text` at top-level commas, returning `(offset, piece)` pairs.
pub(crate) fn split_top_level(text: &str, base: usize) -> Vec<(usize, &str)> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut piece_start = 0;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                pieces.push((base + piece_start, &text[piece_start..i]));
                piece_start = i + 1;
            }
            _ => {}
        }
    }
    pieces.push((base + piece_start, &text[piece_start..]));
    pieces
}
