//! Remote shell command construction.
//!
//! All commands are plain POSIX `sh` so they work on any host with coreutils.
//! Paths and chunk text are quoted with `shell-escape`.

use std::borrow::Cow;
use std::path::Path;

fn quote(s: &str) -> Cow<'_, str> {
    shell_escape::escape(Cow::Borrowed(s))
}

/// Remove any previous scratch file and create it empty.
pub fn clear_command(temp_path: &str) -> String {
    let tmp = quote(temp_path);
    format!("rm -f {tmp} && : > {tmp}")
}

/// Append one chunk of encoded text to the scratch file.
///
/// The scratch file is first cut back to `offset`, the length of everything
/// before this chunk, so running the same command twice leaves one copy.
/// `printf '%s'` is used instead of `echo -n` since `echo` flag handling
/// differs between shells.
pub fn append_command(chunk: &str, offset: usize, temp_path: &str) -> String {
    append_with(&quote(chunk), &offset.to_string(), temp_path)
}

/// [`append_command`] with placeholders, for plan previews.
pub fn append_preview(temp_path: &str) -> String {
    append_with("'<chunk>'", "<offset>", temp_path)
}

fn append_with(chunk: &str, offset: &str, temp_path: &str) -> String {
    let tmp = quote(temp_path);
    format!("truncate -s {offset} {tmp} && printf '%s' {chunk} >> {tmp}")
}

/// Decode the scratch file into the destination, then print its byte count
/// followed by an `ls -lh` line for the completion report.
pub fn decode_command(temp_path: &str, dest_path: &str) -> String {
    let dest = quote(dest_path);
    format!(
        "base64 -d {} > {dest} && wc -c < {dest} && ls -lh {dest}",
        quote(temp_path)
    )
}

/// Create the destination's parent directory, if it has one.
pub fn mkdir_command(dest_path: &str) -> Option<String> {
    let parent = Path::new(dest_path).parent()?.to_str()?;
    if parent.is_empty() || parent == "/" {
        return None;
    }
    Some(format!("mkdir -p {}", quote(parent)))
}

/// Print the SHA-256 of the destination in `sha256sum` format.
pub fn checksum_command(dest_path: &str) -> String {
    format!("sha256sum {}", quote(dest_path))
}

/// Remove the scratch file.
pub fn cleanup_command(temp_path: &str) -> String {
    format!("rm -f {}", quote(temp_path))
}

/// Trivial command used to probe connectivity.
pub fn probe_command() -> &'static str {
    "echo ok"
}

/// Parse `wc -c` output into a byte count.
pub fn parse_byte_count(stdout: &str) -> Option<u64> {
    stdout.split_whitespace().next()?.parse().ok()
}

/// Split decode output into the byte count and the listing line.
pub fn parse_decode_output(stdout: &str) -> Option<(u64, Option<String>)> {
    let mut lines = stdout.lines().map(str::trim).filter(|l| !l.is_empty());
    let bytes = parse_byte_count(lines.next()?)?;
    let listing = lines.next().map(str::to_string);
    Some((bytes, listing))
}

/// Parse the digest out of `sha256sum` output.
pub fn parse_sha256(stdout: &str) -> Option<String> {
    let digest = stdout.split_whitespace().next()?;
    if digest.len() == 64 && digest.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(digest.to_ascii_lowercase())
    } else {
        None
    }
}
