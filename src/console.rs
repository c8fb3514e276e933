// ─── Console View ───
// Terminal rendition of the launch UI: progress on one line, overlays as
// plain text, prompts answered on stdin.

use std::io::Write;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};
use tracing::warn;

use launchsuite_lib::core::progress::OsProgress;
use launchsuite_lib::core::view::{LaunchFailure, LaunchView, Prompt, PromptChoice};

pub struct ConsoleView {
    stdin: BufReader<Stdin>,
    details: String,
    percent: u8,
}

impl ConsoleView {
    pub fn new() -> Self {
        Self {
            stdin: BufReader::new(tokio::io::stdin()),
            details: String::new(),
            percent: 0,
        }
    }

    fn render(&self) {
        let mut out = std::io::stdout().lock();
        let _ = write!(out, "\r\x1b[2K[{:>3}%] {}", self.percent, self.details);
        let _ = out.flush();
    }
}

#[async_trait]
impl LaunchView for ConsoleView {
    fn toggle_launch_area(&mut self, loading: bool) {
        if !loading {
            println!();
        }
    }

    fn set_launch_details(&mut self, details: &str) {
        self.details = details.to_string();
        self.render();
    }

    fn set_launch_percentage(&mut self, percent: u8) {
        self.percent = percent;
        self.render();
    }

    fn set_os_progress(&mut self, _progress: OsProgress) {}

    fn show_failure(&mut self, failure: &LaunchFailure) {
        println!();
        println!("== {} ==", failure.title);
        println!("{}", failure.description);
    }

    async fn prompt(&mut self, prompt: &Prompt) -> PromptChoice {
        println!();
        println!("== {} ==", prompt.title);
        println!("{}", prompt.description);

        loop {
            print!("[1] {}  [2] {} > ", prompt.primary, prompt.secondary);
            let _ = std::io::stdout().flush();

            let mut answer = String::new();
            match self.stdin.read_line(&mut answer).await {
                Ok(0) => {
                    warn!("No input available, dismissing \"{}\"", prompt.title);
                    return PromptChoice::Dismissed;
                }
                Ok(_) => match answer.trim() {
                    "1" => return PromptChoice::Primary,
                    "2" => return PromptChoice::Secondary,
                    _ => continue,
                },
                Err(e) => {
                    warn!("Could not read answer, dismissing \"{}\": {}", prompt.title, e);
                    return PromptChoice::Dismissed;
                }
            }
        }
    }
}
