//! Log file naming and stream capture.
//!
//! Every execution writes two files into the configured output directory:
//!
//! ```text
//! {timestamp}-{sanitized key}-output.log
//! {timestamp}-{sanitized key}-error.log
//! ```
//!
//! The timestamp is the millisecond Unix epoch at the moment the paths are
//! created and is shared by both files of a pair. The key is sanitized by
//! [`sanitize_key`] so that a caller-controlled key can never place a log file
//! outside the output directory.

use once_cell::sync::Lazy;
use regex::Regex;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWriteExt};

/// Maximum length of a sanitized key, in characters.
pub const MAX_KEY_LEN: usize = 200;

/// Replacement for keys that sanitize to nothing.
pub const DEFAULT_KEY: &str = "default";

/// Characters replaced by `_` because they are reserved in file names.
const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

static UNDERSCORE_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_{2,}").expect("underscore regex should compile"));

/// Paths of the two log files produced by one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPaths {
    /// File receiving the command's standard output.
    pub output_path: PathBuf,
    /// File receiving the command's standard error.
    pub error_path: PathBuf,
}

impl LogPaths {
    /// Returns the directory both files live in.
    #[must_use]
    pub fn dir(&self) -> Option<&Path> {
        self.output_path.parent()
    }
}

/// Turns an arbitrary command key into a token that is safe in a file name.
///
/// The result never contains `..`, `/`, `\`, ASCII control characters or any
/// of `< > : " | ? *`, is never empty and is at most [`MAX_KEY_LEN`]
/// characters long. Sanitizing an already sanitized key returns it unchanged.
///
/// # Examples
///
/// ```
/// use long_run_command_mcp::logs::sanitize_key;
///
/// assert_eq!(sanitize_key("../../../etc/passwd"), "etc_passwd");
/// assert_eq!(sanitize_key("build:prod"), "build_prod");
/// assert_eq!(sanitize_key(".."), "default");
/// ```
#[must_use]
pub fn sanitize_key(key: &str) -> String {
    // One pass can expose new matches (dots joined by a stripped control
    // character, a `_` left at the cut by truncation), so run to a fixpoint.
    let mut current = sanitize_pass(key);
    loop {
        let next = sanitize_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn sanitize_pass(key: &str) -> String {
    let without_traversal = key.replace("..", "");

    let cleaned: String = without_traversal
        .chars()
        .filter(|c| !is_control(*c))
        .map(|c| match c {
            '/' | '\\' => '_',
            c if RESERVED_CHARS.contains(&c) => '_',
            c => c,
        })
        .collect();

    let collapsed = UNDERSCORE_RUNS.replace_all(&cleaned, "_");
    let trimmed = collapsed.trim().trim_matches('_');

    let token = if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        DEFAULT_KEY
    } else {
        trimmed
    };

    token.chars().take(MAX_KEY_LEN).collect()
}

fn is_control(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{1f}' | '\u{7f}')
}

/// Builds the log paths for an execution of `key` starting now.
#[must_use]
pub fn create_log_paths(key: &str, output_dir: &Path) -> LogPaths {
    create_log_paths_at(key, output_dir, now_millis())
}

/// Builds the log paths for an execution of `key` at `timestamp_ms`.
#[must_use]
pub fn create_log_paths_at(key: &str, output_dir: &Path, timestamp_ms: u128) -> LogPaths {
    let key = sanitize_key(key);
    LogPaths {
        output_path: output_dir.join(format!("{timestamp_ms}-{key}-output.log")),
        error_path: output_dir.join(format!("{timestamp_ms}-{key}-error.log")),
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Drains two streams into the log files named by `paths`.
///
/// The output directory is created if needed. Returns only after both streams
/// have reached EOF and both files have been flushed to disk.
///
/// # Errors
///
/// Returns an error if a file cannot be created or a stream fails mid-copy.
pub async fn write_streams<O, E>(stdout: O, stderr: E, paths: &LogPaths) -> io::Result<()>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    if let Some(dir) = paths.dir() {
        tokio::fs::create_dir_all(dir).await?;
    }

    let (output_file, error_file) = tokio::try_join!(
        File::create(&paths.output_path),
        File::create(&paths.error_path)
    )?;

    tokio::try_join!(drain(stdout, output_file), drain(stderr, error_file))?;
    Ok(())
}

async fn drain<R: AsyncRead + Unpin>(mut reader: R, mut file: File) -> io::Result<u64> {
    let copied = tokio::io::copy(&mut reader, &mut file).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(copied)
}
