use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use pgpt_core::{AgeGroup, FeedbackType, ReadingLevel};
use pgpt_session::{ClickEvents, ClickTarget, DocumentSession, FeedbackOutcome, RequestOutcome};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::debug;

use crate::{files, render};

const HELP: &str = "\
Commands:
  add <file>...                       select PDF files
  upload                              summarize the selected files
  lang <code>                         pick a summary language
  level <basic|intermediate|advanced> reading level
  interest <code> <on|off>            toggle a customer interest
  age <18-25|26-35|36-50|51+|none>    age group
  feedback <file> <helpful|unclear|inaccurate>
  languages | interests               list the catalogs
  show                                print the session
  clear                               drop files and results
  quit";

#[derive(Debug, PartialEq)]
enum Command {
    Add(Vec<String>),
    Upload,
    Lang(String),
    Level(ReadingLevel),
    Interest(String, bool),
    Age(Option<AgeGroup>),
    Feedback(String, FeedbackType),
    Languages,
    Interests,
    Show,
    Clear,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            bail!("empty command");
        };
        let args: Vec<&str> = words.collect();
        let command = match (verb, args.as_slice()) {
            ("add", []) => bail!("add needs at least one file"),
            ("add", paths) => Command::Add(paths.iter().map(|p| p.to_string()).collect()),
            ("upload", []) => Command::Upload,
            ("lang", [code]) => Command::Lang(code.to_string()),
            ("lang", []) => Command::Lang(String::new()),
            ("level", [level]) => Command::Level(level.parse().map_err(|e: String| anyhow!(e))?),
            ("interest", [code, "on"]) => Command::Interest(code.to_string(), true),
            ("interest", [code, "off"]) => Command::Interest(code.to_string(), false),
            ("age", ["none"]) => Command::Age(None),
            ("age", [group]) => Command::Age(Some(group.parse().map_err(|e: String| anyhow!(e))?)),
            ("feedback", [file, kind]) => {
                Command::Feedback(file.to_string(), kind.parse().map_err(|e: String| anyhow!(e))?)
            }
            ("languages", []) => Command::Languages,
            ("interests", []) => Command::Interests,
            ("show", []) => Command::Show,
            ("clear", []) => Command::Clear,
            ("help", []) => Command::Help,
            ("quit" | "exit", []) => Command::Quit,
            _ => bail!("unrecognised command: {} (try help)", line.trim()),
        };
        Ok(command)
    }
}

pub struct Repl {
    session: DocumentSession,
    clicks: ClickEvents,
    lines: Lines<BufReader<Stdin>>,
}

impl Repl {
    pub fn new(session: DocumentSession) -> Self {
        Self {
            session,
            clicks: ClickEvents::default(),
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let _mounted = self.session.mount_dialog(&self.clicks);
        self.session.load_options().await;
        println!("PolicyGPT session. Type help for commands.");

        while let Some(line) = self.lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let command = match line.parse::<Command>() {
                Ok(command) => command,
                Err(err) => {
                    println!("{}", err);
                    continue;
                }
            };
            if command == Command::Quit {
                break;
            }
            if let Err(err) = self.execute(command).await {
                println!("{:#}", err);
            }
        }
        Ok(())
    }

    async fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Add(paths) => {
                let selected = files::read_all(paths.as_slice()).await?;
                self.session.handle_files(selected);
                print!("{}", render::pending(&self.session.snapshot()));
                if let Some(error) = self.session.error_message() {
                    println!("⚠️ {}", error);
                }
            }
            Command::Upload => match self.session.upload_files().await {
                RequestOutcome::Skipped => println!("Nothing to upload"),
                _ => print!("{}", render::results(&self.session.snapshot())),
            },
            Command::Lang(code) => {
                if self.session.on_language_change(&code).await == RequestOutcome::Applied {
                    print!("{}", render::results(&self.session.snapshot()));
                } else if let Some(error) = self.session.error_message() {
                    println!("⚠️ {}", error);
                }
            }
            Command::Level(level) => self.session.set_reading_level(level),
            Command::Interest(code, on) => self.session.set_interest(&code, on),
            Command::Age(group) => self.session.set_age_group(group),
            Command::Feedback(filename, feedback_type) => {
                self.feedback(&filename, feedback_type).await?
            }
            Command::Languages => {
                print!("{}", render::languages(&self.session.snapshot().languages))
            }
            Command::Interests => {
                print!("{}", render::interests(&self.session.snapshot().interests))
            }
            Command::Show => {
                let snapshot = self.session.snapshot();
                print!("{}", render::pending(&snapshot));
                println!();
                print!("{}", render::results(&snapshot));
            }
            Command::Clear => self.session.clear_files(),
            Command::Help => println!("{}", HELP),
            Command::Quit => {}
        }
        Ok(())
    }

    async fn feedback(&mut self, filename: &str, feedback_type: FeedbackType) -> Result<()> {
        let mut outcome = self.session.submit_feedback(filename, feedback_type).await?;
        if outcome == FeedbackOutcome::DialogOpened {
            let Some(dialog) = self.session.snapshot().dialog else {
                return Ok(());
            };
            println!("{}", dialog.title);
            println!("({}; empty line cancels)", dialog.placeholder);
            let text = self.lines.next_line().await?.unwrap_or_default();
            if text.trim().is_empty() {
                debug!("Treating empty dialog input as a click outside");
                self.clicks.dispatch(ClickTarget::Outside);
                println!("Feedback cancelled");
                return Ok(());
            }
            outcome = self.session.submit_dialog(text.trim()).await?;
        }

        let status_message = || {
            self.session
                .feedback_status(filename)
                .and_then(|status| status.message)
        };
        match outcome {
            FeedbackOutcome::Recorded { refined } => {
                if let Some(message) = status_message() {
                    println!("✅ {}", message);
                }
                if refined {
                    let snapshot = self.session.snapshot();
                    if let Some(summary) = snapshot
                        .results
                        .iter()
                        .find(|r| r.filename == filename)
                        .and_then(|r| r.original_summary())
                    {
                        println!("{}", summary);
                    }
                }
            }
            FeedbackOutcome::Failed => {
                if let Some(message) = status_message() {
                    println!("❌ {}", message);
                }
            }
            FeedbackOutcome::Ignored => println!("Feedback for {} is already being sent", filename),
            FeedbackOutcome::DialogOpened | FeedbackOutcome::Discarded => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(
            "add a.pdf b.pdf".parse::<Command>().unwrap(),
            Command::Add(vec!["a.pdf".into(), "b.pdf".into()])
        );
        assert_eq!("lang hi".parse::<Command>().unwrap(), Command::Lang("hi".into()));
        assert_eq!("level basic".parse::<Command>().unwrap(), Command::Level(ReadingLevel::Basic));
        assert_eq!(
            "interest claim_process off".parse::<Command>().unwrap(),
            Command::Interest("claim_process".into(), false)
        );
        assert_eq!("age 51+".parse::<Command>().unwrap(), Command::Age(Some(AgeGroup::Over50)));
        assert_eq!("age none".parse::<Command>().unwrap(), Command::Age(None));
        assert_eq!(
            "feedback a.pdf Unclear".parse::<Command>().unwrap(),
            Command::Feedback("a.pdf".into(), FeedbackType::Unclear)
        );
        assert_eq!("exit".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn rejects_bad_input() {
        assert!("add".parse::<Command>().is_err());
        assert!("feedback a.pdf great".parse::<Command>().is_err());
        assert!("level expert".parse::<Command>().is_err());
        assert!("upload now".parse::<Command>().is_err());
    }
}
