const RESERVED_STEMS: [&str; 4] = ["con", "prn", "aux", "nul"];

/// Maps a species name to a file stem that is safe on any filesystem.
///
/// Alphanumerics are kept and lowercased, apostrophes are dropped, gender
/// signs become `-f`/`-m` and any other run of whitespace or punctuation
/// collapses into a single `-`. Device names reserved on Windows get a
/// trailing `-`. Returns `None` when nothing is left.
pub fn file_stem(name: &str) -> Option<String> {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.chars() {
        match ch {
            '\'' | '\u{2019}' => {}
            '\u{2640}' => {
                pending_dash = true;
                push(&mut out, 'f', &mut pending_dash);
            }
            '\u{2642}' => {
                pending_dash = true;
                push(&mut out, 'm', &mut pending_dash);
            }
            c if c.is_alphanumeric() => push(&mut out, c, &mut pending_dash),
            _ => pending_dash = true,
        }
    }

    if out.is_empty() {
        return None;
    }
    if is_reserved(&out) {
        out.push('-');
    }
    Some(out)
}

fn is_reserved(stem: &str) -> bool {
    if RESERVED_STEMS.contains(&stem) {
        return true;
    }
    match stem.as_bytes() {
        [b'c', b'o', b'm', d] | [b'l', b'p', b't', d] => (b'1'..=b'9').contains(d),
        _ => false,
    }
}

fn push(out: &mut String, ch: char, pending_dash: &mut bool) {
    if *pending_dash && !out.is_empty() {
        out.push('-');
    }
    *pending_dash = false;
    out.extend(ch.to_lowercase());
}
