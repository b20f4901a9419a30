//! Line helpers shared by the tailer, rotator and simulator.
//!
//! Lines are split on `\n` only; a preceding `\r` stays part of the line so CRLF
//! content is written back byte-for-byte.

/// Split file content into lines. A trailing `\n` does not produce an empty last line.
pub fn split_lines(content: &[u8]) -> Vec<&[u8]> {
    if content.is_empty() {
        return Vec::new();
    }
    let body = content.strip_suffix(b"\n").unwrap_or(content);
    body.split(|&b| b == b'\n').collect()
}

/// True for lines holding nothing but ASCII whitespace (`\r` included).
pub fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

/// `split_lines` without blank lines: the lines the tailer and rotator count.
pub fn data_lines(content: &[u8]) -> Vec<&[u8]> {
    split_lines(content)
        .into_iter()
        .filter(|l| !is_blank(l))
        .collect()
}

/// Append `lines` to `out`, each terminated by `\n`.
pub fn push_lines<'a>(out: &mut Vec<u8>, lines: impl IntoIterator<Item = &'a [u8]>) {
    for line in lines {
        out.extend_from_slice(line);
        out.push(b'\n');
    }
}

/// Make sure non-empty `buf` ends with `\n` before more lines are appended.
pub fn terminate(buf: &mut Vec<u8>) {
    if buf.last().is_some_and(|&b| b != b'\n') {
        buf.push(b'\n');
    }
}
