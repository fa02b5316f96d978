//! Terminal rendering of notices and dialogs, plus the native-prompt stand-in

use std::io::{self, BufRead, Write};

use permflow::flow::{RationaleDialog, SettingsDialog};
use permflow::permission::PermissionId;
use permflow::simulated::{NativePromptResponder, NativeResponse};

/// Read one trimmed, lowercased line; `None` on EOF
pub fn read_answer(prompt: &str) -> io::Result<Option<String>> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", prompt)?;
    stdout.flush()?;

    let mut input = String::new();
    if io::stdin().lock().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_lowercase()))
}

pub fn show_notice(text: &str) {
    println!();
    println!("  ┃ {}", text);
    println!();
}

/// Returns true when the user confirms
pub fn ask_rationale(dialog: &RationaleDialog) -> io::Result<bool> {
    println!();
    println!("== {} ==", dialog.title);
    println!("{}", dialog.message);
    println!("(asking for {})", dialog.permissions);
    confirm(&dialog.confirm_label, &dialog.cancel_label)
}

/// Returns true when the user chooses to open settings
pub fn ask_settings(dialog: &SettingsDialog) -> io::Result<bool> {
    println!();
    println!("== {} ==", dialog.title);
    println!("{}", dialog.message);
    confirm(&dialog.confirm_label, &dialog.cancel_label)
}

fn confirm(yes: &str, no: &str) -> io::Result<bool> {
    let answer = read_answer(&format!("[y] {} / [n] {}: ", yes, no))?;
    Ok(matches!(answer.as_deref(), Some("y" | "yes")))
}

/// Answers the simulated OS prompt from the terminal
#[derive(Debug, Default)]
pub struct TerminalResponder;

impl NativePromptResponder for TerminalResponder {
    fn respond(&self, permission: &PermissionId) -> NativeResponse {
        println!();
        println!("[system] Allow this app to use {}?", permission.short_name());
        let answer = match read_answer("[a]llow / [d]eny / [n]ever ask again: ") {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read prompt answer, denying");
                return NativeResponse::Deny;
            }
        };

        match answer.as_deref() {
            Some("a" | "allow") => NativeResponse::Allow,
            Some("n" | "never") => NativeResponse::DenyPermanently,
            _ => NativeResponse::Deny,
        }
    }
}

/// Prompts need a person on both ends: answers come from stdin and dialogs go to stdout
pub fn is_interactive() -> bool {
    stream_is_tty(&io::stdin()) && stream_is_tty(&io::stdout())
}

#[cfg(unix)]
fn stream_is_tty(stream: &impl std::os::unix::io::AsRawFd) -> bool {
    // SAFETY: isatty only inspects the descriptor and tolerates invalid ones
    unsafe { libc::isatty(stream.as_raw_fd()) == 1 }
}

#[cfg(windows)]
fn stream_is_tty(stream: &impl std::os::windows::io::AsRawHandle) -> bool {
    use windows_sys::Win32::System::Console::{GetConsoleMode, CONSOLE_MODE};
    let mut mode: CONSOLE_MODE = 0;
    // SAFETY: GetConsoleMode fails cleanly on handles that are not consoles
    unsafe { GetConsoleMode(stream.as_raw_handle() as _, &mut mode) != 0 }
}

#[cfg(not(any(unix, windows)))]
fn stream_is_tty<T>(_stream: &T) -> bool {
    false
}
