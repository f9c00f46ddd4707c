//! Interactive site-name question on stdin, bounded by a timeout.

use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::mirror::site::SitePrompt;

/// Sentinel answer that discards the suggestion.
pub const CLEAR_ANSWER: &str = "-";

/// Map a raw reply onto a site name.
///
/// `None` (EOF or timeout) and the clear sentinel yield no answer; an empty
/// reply accepts the suggestion; anything else replaces it.
pub fn interpret_answer(reply: Option<&str>, suggestion: Option<&str>) -> Option<String> {
    let reply = reply?.trim();
    if reply.is_empty() {
        return suggestion.map(ToOwned::to_owned);
    }
    if reply == CLEAR_ANSWER {
        return None;
    }
    Some(reply.to_string())
}

fn read_line_within(timeout: Duration) -> Option<String> {
    let (tx, rx) = mpsc::channel();
    // The reader may outlive a timeout; it is dropped with the process.
    thread::spawn(move || {
        let mut line = String::new();
        let reply = match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line),
        };
        let _ = tx.send(reply);
    });
    rx.recv_timeout(timeout).ok().flatten()
}

pub fn ask_site(prompt: &SitePrompt, timeout_secs: u64) -> Option<String> {
    let mut stderr = io::stderr();
    let scope = prompt.project_root.as_deref().unwrap_or(&prompt.file_path);
    let _ = write!(
        stderr,
        "site name for {scope} [{}] (Enter accepts, `{CLEAR_ANSWER}` clears): ",
        prompt.suggestion.as_deref().unwrap_or("")
    );
    let _ = stderr.flush();

    let reply = read_line_within(Duration::from_secs(timeout_secs));
    interpret_answer(reply.as_deref(), prompt.suggestion.as_deref())
}
