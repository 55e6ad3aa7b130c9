//! Terminal client for playing one rock-paper-scissors match at a time.
//!
//! # Architecture
//!
//! ```text
//! Client (composition root)
//!   ├─→ SyncEngine (match state, event stream, move submission)
//!   └─→ line input / text output (presentation only)
//! ```
//!
//! The client never changes match state itself. Input is turned into
//! [`SyncHandle`](match_sync::SyncHandle) calls and every published
//! [`SyncState`](match_sync::SyncState) is rendered as text.

mod builder;
pub mod command;
pub mod config;
pub mod logging;
pub mod render;

pub use builder::ClientBuilder;

use anyhow::Result;
use match_core::PlayerId;
use match_sync::{SyncEngine, SyncHandle};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::command::{HELP, UnknownCommand, UserCommand};

pub struct Client {
    engine: SyncEngine,
    player: PlayerId,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Runs until the input ends or the player quits, then tears the match
    /// view down.
    pub async fn run<R, W>(self, input: R, mut output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let handle = self.engine.handle();
        let mut state_rx = handle.subscribe();
        let mut lines = input.lines();
        let mut last_frame = String::new();

        output.write_all(HELP.as_bytes()).await?;
        output.write_all(b"\n\n").await?;

        loop {
            tokio::select! {
                changed = state_rx.changed() => {
                    if changed.is_err() {
                        tracing::warn!("sync engine stopped");
                        break;
                    }
                    let frame = render::render(&state_rx.borrow_and_update(), &self.player);
                    if frame != last_frame {
                        output.write_all(frame.as_bytes()).await?;
                        output.write_all(b"\n").await?;
                        output.flush().await?;
                        last_frame = frame;
                    }
                }
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match line.parse::<UserCommand>() {
                        Ok(UserCommand::Quit) => break,
                        Ok(UserCommand::Help) => {
                            output.write_all(HELP.as_bytes()).await?;
                            output.write_all(b"\n").await?;
                        }
                        Ok(command) => dispatch(&handle, command).await,
                        Err(UnknownCommand(text)) => {
                            let message = format!("unknown command `{}` (try `help`)\n", text);
                            output.write_all(message.as_bytes()).await?;
                        }
                    }
                    output.flush().await?;
                }
            }
        }

        tracing::info!("Client shutting down");
        self.engine.shutdown().await?;
        Ok(())
    }
}

/// Forwards a command to the engine. Failures show up in the rendered state,
/// so they are only logged here.
async fn dispatch(handle: &SyncHandle, command: UserCommand) {
    match command {
        UserCommand::Play(choice) => {
            // The display keeps updating while the move is in flight.
            let handle = handle.clone();
            tokio::spawn(async move {
                match handle.submit_current(choice).await {
                    Ok(_) => tracing::info!("Move {} accepted", choice),
                    Err(e) => tracing::warn!("Move {} not played: {}", choice, e),
                }
            });
        }
        UserCommand::Reload => {
            if let Err(e) = handle.reload().await {
                tracing::warn!("Reload failed: {}", e);
            }
        }
        UserCommand::Switch(match_id) => {
            tracing::info!("Switching to match {}", match_id);
            if let Err(e) = handle.switch_match(match_id).await {
                tracing::warn!("Switch failed: {}", e);
            }
        }
        UserCommand::Help | UserCommand::Quit => {}
    }
}
