//! Blocking execution of external command-line tools
//!

use std::process::Command;

use log::{debug, info};

use crate::errors::{GapSupportError, GapSupportResult};

/// Maximum number of trailing stderr lines reported from a failed tool
const STDERR_TAIL_LINES: usize = 20;

fn get_stderr_tail(stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let lines = stderr.lines().collect::<Vec<_>>();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Run `tool` with `args` and wait for it to complete
///
/// Launch failures and non-zero exit status are both reported as an upstream tool failure.
///
/// # Arguments
/// * `label` - Describes the pipeline stage for logging
///
pub fn run_external_tool(label: &str, tool: &str, args: &[String]) -> GapSupportResult<()> {
    let command = std::iter::once(tool)
        .chain(args.iter().map(|x| x.as_str()))
        .collect::<Vec<_>>()
        .join(" ");

    info!("Starting {label}");
    debug!("{label} command: '{command}'");

    let tool_failure = |status: String, stderr: String| GapSupportError::UpstreamToolFailure {
        tool: tool.to_string(),
        command: command.clone(),
        status,
        stderr,
    };

    let output = Command::new(tool)
        .args(args)
        .output()
        .map_err(|e| tool_failure(format!("failed to launch: {e}"), String::new()))?;

    if !output.status.success() {
        return Err(tool_failure(
            output.status.to_string(),
            get_stderr_tail(&output.stderr),
        ));
    }

    info!("Completed {label}");
    Ok(())
}
