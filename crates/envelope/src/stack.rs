//! Stack-trace trimming and transport-safe encoding.
//!
//! Error traces surfaced to callers must end at the last frame belonging to
//! the gateway's own code; runtime, executor, and test-harness frames below
//! it carry no value outside this process. The trimmed text then has to
//! survive an HTTP header, so it is percent-encoded the way the consuming
//! host decodes it (JS `encodeURI`/`decodeURI` semantics).

/// Substring identifying this gateway's own frames in a stack trace.
pub const OWN_FRAME_MARKER: &str = "fngate";

/// Trims a stack trace at the last line referencing `marker`, inclusive.
///
/// Scans from the end toward the start; everything below the last marker
/// line is dropped. A trace with no marker line is returned unchanged, and
/// an empty trace stays empty. At most one trim is meaningful per trace:
/// applying the function twice gives the same result.
pub fn trim_stack(stack: &str, marker: &str) -> String {
    if stack.is_empty() {
        return String::new();
    }

    let lines: Vec<&str> = stack.lines().collect();
    match lines.iter().rposition(|line| line.contains(marker)) {
        Some(last_own) => lines[..=last_own].join("\n"),
        None => stack.to_string(),
    }
}

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Percent-encodes a string with `encodeURI`-compatible coverage.
///
/// Unreserved characters and URI reserved punctuation pass through;
/// everything else, including spaces, quotes, and newlines, becomes `%XX`
/// escapes over the UTF-8 byte encoding.
pub fn encode_uri(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for &byte in input.as_bytes() {
        if is_passthrough(byte) {
            out.push(byte as char);
        } else {
            out.push('%');
            out.push(HEX[(byte >> 4) as usize] as char);
            out.push(HEX[(byte & 0x0f) as usize] as char);
        }
    }
    out
}

/// Reverses [`encode_uri`]. Malformed escapes are kept literally rather than
/// rejected; the decoder is for diagnostics, not validation.
pub fn decode_uri(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3).and_then(|pair| {
                let text = std::str::from_utf8(pair).ok()?;
                u8::from_str_radix(text, 16).ok()
            });
            if let Some(value) = hex {
                out.push(value);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn is_passthrough(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
        || matches!(
            byte,
            b'-' | b'_'
                | b'.'
                | b'!'
                | b'~'
                | b'*'
                | b'\''
                | b'('
                | b')'
                | b';'
                | b'/'
                | b'?'
                | b':'
                | b'@'
                | b'&'
                | b'='
                | b'+'
                | b'$'
                | b','
                | b'#'
        )
}
