//! CLI channel — paste a hand history on stdin, read the report on stdout.
//!
//! Hand histories span many lines, so input is buffered until a blank
//! line (or EOF) ends the submission.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedSender;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::error::ChannelError;

/// A CLI channel that reads submissions from stdin and writes to stdout.
pub struct CliChannel;

impl CliChannel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Read blank-line separated submissions from `reader` until EOF.
async fn read_submissions<R>(reader: R, tx: UnboundedSender<IncomingMessage>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut buffer: Vec<String> = Vec::new();

    eprint!("> ");

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if !line.trim().is_empty() {
                    buffer.push(line.trim_end().to_string());
                    continue;
                }
                if buffer.is_empty() {
                    eprint!("> ");
                    continue;
                }
                let content = buffer.join("\n");
                buffer.clear();
                if tx.send(IncomingMessage::new("cli", "local-user", content)).is_err() {
                    return;
                }
            }
            Ok(None) => break, // EOF
            Err(e) => {
                tracing::error!("Error reading stdin: {}", e);
                break;
            }
        }
    }

    if !buffer.is_empty() {
        let _ = tx.send(IncomingMessage::new("cli", "local-user", buffer.join("\n")));
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(read_submissions(BufReader::new(tokio::io::stdin()), tx));

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        _msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        println!("\n{}\n", response.content);
        eprint!("> ");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
