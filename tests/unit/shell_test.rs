//! Tests for shell invocation and command line construction.
//!
//! The execution tests run real `/bin/sh` processes and are Unix-only.

use long_run_command_mcp::logs::LogPaths;
use long_run_command_mcp::shell::{build_command_line, quote_arg, with_redirection, ShellConfig};
use std::path::PathBuf;
use std::process::Stdio;

// ============================================================================
// Command line construction
// ============================================================================

#[test]
fn test_quote_arg_escapes_quotes() {
    assert_eq!(quote_arg(""), r#""""#);
    assert_eq!(quote_arg(r#"a"b"#), r#""a\"b""#);
}

#[test]
fn test_command_line_keeps_base_command_verbatim() {
    // The configured command is trusted and may use shell syntax.
    let line = build_command_line("npm run build && npm test", &["--ci".to_string()]);
    assert_eq!(line, r#"npm run build && npm test "--ci""#);
}

#[test]
fn test_redirection_quotes_paths_with_spaces() {
    let paths = LogPaths {
        output_path: PathBuf::from("/tmp/my logs/1-k-output.log"),
        error_path: PathBuf::from("/tmp/my logs/1-k-error.log"),
    };
    assert_eq!(
        with_redirection("make", &paths),
        r#"make > "/tmp/my logs/1-k-output.log" 2> "/tmp/my logs/1-k-error.log""#
    );
}

#[test]
fn test_custom_shell() {
    let shell = ShellConfig::new("/bin/bash", vec!["-lc".to_string()]);
    let cmd = shell.build_command("true");
    let args: Vec<_> = cmd.as_std().get_args().collect();
    assert_eq!(args, vec!["-lc", "true"]);
}

// ============================================================================
// Execution
// ============================================================================

#[cfg(unix)]
async fn run(line: &str) -> String {
    let output = ShellConfig::default()
        .build_command(line)
        .stdin(Stdio::null())
        .output()
        .await
        .unwrap();
    assert!(output.status.success(), "{line} failed");
    String::from_utf8(output.stdout).unwrap()
}

#[cfg(unix)]
#[tokio::test]
async fn test_quoted_args_arrive_as_single_words() {
    let line = build_command_line(
        "printf '%s|'",
        &["two words".to_string(), r#"say "hi""#.to_string()],
    );
    assert_eq!(run(&line).await, r#"two words|say "hi"|"#);
}

#[cfg(unix)]
#[tokio::test]
async fn test_redirection_writes_both_files() {
    let temp = tempfile::tempdir().unwrap();
    let paths = LogPaths {
        output_path: temp.path().join("out.log"),
        error_path: temp.path().join("err.log"),
    };

    let line = with_redirection("echo out; echo err >&2", &paths);
    assert_eq!(run(&line).await, "");

    assert_eq!(std::fs::read_to_string(&paths.output_path).unwrap(), "out\n");
    assert_eq!(std::fs::read_to_string(&paths.error_path).unwrap(), "err\n");
}
