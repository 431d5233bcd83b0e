use std::io::{self, Write};

use async_trait::async_trait;
use bang_core::Confirm;

/// y/N question on the terminal.
pub(crate) struct TerminalConfirm {
    pub assume_yes: bool,
}

#[async_trait]
impl Confirm for TerminalConfirm {
    async fn confirm(&self, title: &str, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        let prompt = format!("{title}: {message} [y/N] ");
        tokio::task::spawn_blocking(move || {
            print!("{prompt}");
            let _ = io::stdout().flush();
            let mut line = String::new();
            if io::stdin().read_line(&mut line).is_err() {
                return false;
            }
            matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
        })
        .await
        .unwrap_or(false)
    }
}
