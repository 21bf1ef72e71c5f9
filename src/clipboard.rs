//! Clipboard delivery of recognized text.

use std::process::{Command, Stdio};

use thiserror::Error;
use wl_clipboard_rs::copy::{MimeType, Options, ServeRequests, Source};

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("wl-copy failed: {0}")]
    Command(String),

    #[error("wl-clipboard-rs failed: {0}")]
    Library(String),

    #[error("{command}; {library}")]
    Both {
        command: Box<ClipboardError>,
        library: Box<ClipboardError>,
    },
}

/// Puts `text` on the Wayland clipboard as `text/plain`.
///
/// Uses the `wl-copy` command when installed, otherwise serves the selection
/// through wl-clipboard-rs.
pub fn copy_text(text: &str) -> Result<(), ClipboardError> {
    log::debug!("Copying {} bytes of text to clipboard", text.len());

    match copy_via_command(text) {
        Ok(()) => {
            log::info!("Copied recognized text via wl-copy");
            Ok(())
        }
        Err(cmd_err) => {
            log::warn!("{}. Falling back to wl-clipboard-rs", cmd_err);
            match copy_via_library(text) {
                Ok(()) => {
                    log::info!("Copied recognized text via wl-clipboard-rs");
                    Ok(())
                }
                Err(lib_err) => Err(ClipboardError::Both {
                    command: Box::new(cmd_err),
                    library: Box::new(lib_err),
                }),
            }
        }
    }
}

/// Copies on a blocking worker so the dispatch thread never waits on
/// `wl-copy`.
pub fn copy_text_async(runtime_handle: &tokio::runtime::Handle, text: String) {
    runtime_handle.spawn_blocking(move || {
        if let Err(e) = copy_text(&text) {
            log::warn!("Clipboard copy failed: {}", e);
        }
    });
}

fn copy_via_library(text: &str) -> Result<(), ClipboardError> {
    let mut opts = Options::new();
    // Keep serving after the overlay closes, until the next paste.
    opts.serve_requests(ServeRequests::Only(1));
    opts.copy(
        Source::Bytes(text.as_bytes().into()),
        MimeType::Specific("text/plain;charset=utf-8".to_string()),
    )
    .map_err(|e| ClipboardError::Library(e.to_string()))
}

fn copy_via_command(text: &str) -> Result<(), ClipboardError> {
    use std::io::Write;

    let mut child = Command::new("wl-copy")
        .arg("--type")
        .arg("text/plain")
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ClipboardError::Command(format!("spawn failed (is it installed?): {}", e)))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(text.as_bytes())
            .map_err(|e| ClipboardError::Command(format!("write to stdin: {}", e)))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| ClipboardError::Command(format!("wait: {}", e)))?;

    if !output.status.success() {
        return Err(ClipboardError::Command(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_error_names_both_paths() {
        let err = ClipboardError::Both {
            command: Box::new(ClipboardError::Command("not found".into())),
            library: Box::new(ClipboardError::Library("no seat".into())),
        };
        assert_eq!(
            err.to_string(),
            "wl-copy failed: not found; wl-clipboard-rs failed: no seat"
        );
    }
}
