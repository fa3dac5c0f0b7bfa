//! Shared utilities for sshdrop.

/// Byte length of the shell word at the start of `s`, honouring quotes and
/// backslash escapes.
fn shell_word_len(s: &str) -> usize {
    let mut quote: Option<char> = None;
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        match (quote, c) {
            (_, '\\') => {
                chars.next();
            }
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, c) if c.is_whitespace() => return i,
            _ => {}
        }
    }
    s.len()
}

/// Prefixes whose following shell word is a credential.
const SECRET_PREFIXES: &[&str] = &[
    "SSHPASS=",
    "PASSWORD=",
    "PASS=",
    "TOKEN=",
    "SECRET=",
    "--password=",
    "--password ",
    "--token=",
    "--token ",
    "sshpass -p ",
];

/// Replace credential values in a command with `***` before it is logged.
pub fn mask_sensitive_command(cmd: &str) -> String {
    let mut masked = cmd.to_string();
    for prefix in SECRET_PREFIXES {
        let mut from = 0;
        while let Some(pos) = masked[from..].find(prefix) {
            let value_start = from + pos + prefix.len();
            let value_end = value_start + shell_word_len(&masked[value_start..]);
            masked.replace_range(value_start..value_end, "***");
            from = value_start + 3;
        }
    }
    masked
}

/// Shorten long commands (chunk appends carry tens of kilobytes) for logs.
pub fn truncate_for_log(s: &str, max_chars: usize) -> String {
    let total = s.chars().count();
    if total <= max_chars {
        return s.to_string();
    }
    let head: String = s.chars().take(max_chars).collect();
    format!("{}... ({} chars)", head, total)
}

/// Format bytes in human-readable form.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    const GB: u64 = 1024 * 1024 * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
