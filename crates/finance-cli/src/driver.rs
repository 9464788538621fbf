//! Session Driver
//!
//! Line-oriented read/eval loop around one [`Session`]. Each non-blank line
//! becomes exactly one agent turn; the next line is not read until that turn
//! has finished.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use agent_core::{Agent, Session};

pub const WELCOME: &str = "Welcome! I'm FinAI, your personal finance assistant. Type 'bye' to exit.";
pub const GOODBYE: &str = "Goodbye! Have a great day!";
pub const USER_PROMPT: &str = "User: ";
pub const ASSISTANT_PREFIX: &str = "Assistant: ";

const EXIT_SENTINEL: &str = "bye";

/// What a line of user input asks for
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserInput {
    Exit,
    Blank,
    Message(String),
}

impl UserInput {
    /// Classify one line; only the line terminator is stripped
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\n', '\r']);
        if line.eq_ignore_ascii_case(EXIT_SENTINEL) {
            Self::Exit
        } else if line.trim().is_empty() {
            Self::Blank
        } else {
            Self::Message(line.to_string())
        }
    }
}

/// Drives one session between a reader and a writer
pub struct SessionDriver {
    agent: Agent,
    session: Session,
}

impl SessionDriver {
    pub const fn new(agent: Agent, session: Session) -> Self {
        Self { agent, session }
    }

    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Run until the exit sentinel or end of input.
    ///
    /// Turn failures are answered with the apology and the loop continues;
    /// only I/O errors end the session early.
    pub async fn run<R, W>(&mut self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!(session = %self.session.id, "Session started");
        writer.write_all(format!("{WELCOME}\n\n").as_bytes()).await?;

        let mut lines = reader.lines();
        loop {
            writer.write_all(USER_PROMPT.as_bytes()).await?;
            writer.flush().await?;

            let Some(line) = lines.next_line().await? else {
                // EOF: finish the prompt line so the shell starts clean
                writer.write_all(b"\n").await?;
                break;
            };

            match UserInput::parse(&line) {
                UserInput::Exit => {
                    writer.write_all(format!("{GOODBYE}\n").as_bytes()).await?;
                    break;
                }
                UserInput::Blank => continue,
                UserInput::Message(text) => {
                    let outcome = self
                        .agent
                        .respond(&mut self.session.conversation, &text)
                        .await;
                    self.session.record_turn();
                    tracing::debug!(
                        turn = self.session.turns,
                        answered = outcome.is_answer(),
                        messages = self.session.message_count(),
                        "Turn finished"
                    );

                    writer
                        .write_all(format!("{ASSISTANT_PREFIX}{}\n\n", outcome.text()).as_bytes())
                        .await?;
                }
            }
        }

        writer.flush().await?;
        self.session.end();
        tracing::info!(
            session = %self.session.id,
            turns = self.session.turns,
            messages = self.session.message_count(),
            duration_secs = self.session.duration().num_seconds(),
            "Session ended"
        );
        Ok(())
    }
}
