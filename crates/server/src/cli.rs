//! Interactive command line
//!
//! Each input line is one turn. A few lines are commands handled here
//! instead of being sent to the assistant.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use shadow_agent::Assistant;

/// What one input line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    Language(String),
    Preference { key: String, value: String },
    State,
    Help,
    Query(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let mut words = line.splitn(3, char::is_whitespace);
        let head = words.next().unwrap_or_default().to_lowercase();

        match head.as_str() {
            "exit" | "quit" | "bye" if words.next().is_none() => Self::Exit,
            "state" if words.next().is_none() => Self::State,
            "help" if words.next().is_none() => Self::Help,
            "language" | "lang" => match words.next() {
                Some(code) if words.next().is_none() => Self::Language(code.to_string()),
                _ => Self::Query(line.to_string()),
            },
            "pref" => match (words.next(), words.next()) {
                (Some(key), Some(value)) => Self::Preference {
                    key: key.to_string(),
                    value: value.trim().to_string(),
                },
                _ => Self::Query(line.to_string()),
            },
            _ => Self::Query(line.to_string()),
        }
    }
}

const HELP: &str = "Commands: language <en|ur|ps>, pref <key> <value>, state, exit";

/// Read stdin until EOF or `exit`
pub async fn run_repl(assistant: Arc<Assistant>, name: &str) -> std::io::Result<()> {
    if let Some(mut notifications) = assistant.take_notifications() {
        tokio::spawn(async move {
            while let Some(notification) = notifications.recv().await {
                println!("\n* {}", notification.announcement());
            }
        });
    }

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(format!("{} is ready. {}\n", name, HELP).as_bytes())
        .await?;

    loop {
        stdout.write_all(b"you> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let output = match Command::parse(&line) {
            Command::Exit => break,
            Command::Help => HELP.to_string(),
            Command::State => assistant.get_state().to_string(),
            Command::Language(code) => {
                if assistant.set_language(&code) {
                    format!("Language set to {}.", assistant.current_language().name())
                } else {
                    format!("Unsupported language '{}'. Use en, ur or ps.", code)
                }
            }
            Command::Preference { key, value } => {
                assistant.set_preference(key.as_str(), value.as_str());
                format!("Saved {} = {}.", key, value)
            }
            Command::Query(text) => assistant.safe_handle_query(&text).await,
        };

        stdout
            .write_all(format!("{}> {}\n", name.to_lowercase(), output).as_bytes())
            .await?;
    }

    tracing::info!("Session ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands() {
        assert_eq!(Command::parse("  quit "), Command::Exit);
        assert_eq!(Command::parse("language ur"), Command::Language("ur".into()));
        assert_eq!(
            Command::parse("pref units metric system"),
            Command::Preference {
                key: "units".into(),
                value: "metric system".into()
            }
        );
        assert_eq!(Command::parse("STATE"), Command::State);
    }

    #[test]
    fn test_everything_else_is_a_query() {
        assert_eq!(
            Command::parse("exit the application"),
            Command::Query("exit the application".into())
        );
        assert_eq!(
            Command::parse("language is hard"),
            Command::Query("language is hard".into())
        );
        assert_eq!(Command::parse("pref"), Command::Query("pref".into()));
        assert_eq!(Command::parse(""), Command::Query(String::new()));
    }
}
