/// Strips the trailing CRLF (or bare LF) from a line read off the wire.
pub fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Undoes byte-stuffing on one line of a multi-line response: a leading
/// termination octet is dropped, so `..foo` becomes `.foo`.
pub fn unstuff_line(line: &str) -> &str {
    line.strip_prefix('.').unwrap_or(line)
}

/// Host part of a `host:port` address, with IPv6 brackets removed.
pub fn host_of(addr: &str) -> &str {
    let host = match addr.rfind(':') {
        Some(idx) if !addr[idx + 1..].contains(']') => &addr[..idx],
        _ => addr,
    };
    host.trim_start_matches('[').trim_end_matches(']')
}
