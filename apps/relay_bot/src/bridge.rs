// relay_bot/src/bridge.rs

//! Line-delimited JSON in place of a chat platform: inbound events are read
//! from stdin, every transport action is written to stdout as one JSON object
//! per line.

use anyhow::Context;
use async_trait::async_trait;
use order_relay::{ChannelId, ChatTransport, Controls, InboundEvent, MessageId, MessageRef, OutgoingText, PhotoRef, TextFormat};
use serde::Serialize;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, warn};

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BridgeAction<'a> {
  PostText {
    message: MessageRef,
    #[serde(flatten)]
    body: &'a OutgoingText,
  },
  PostPhoto {
    message: MessageRef,
    photo: &'a PhotoRef,
    caption: &'a str,
    format: TextFormat,
  },
  EditControls {
    message: &'a MessageRef,
    controls: Option<&'a Controls>,
  },
  DeleteMessage {
    message: &'a MessageRef,
  },
  AnswerCallback {
    callback_id: &'a str,
    text: &'a str,
  },
}

/// `ChatTransport` that hands serialized actions to a single writer task.
pub struct StdioBridge {
  lines: mpsc::UnboundedSender<String>,
  next_id: AtomicI64,
}

impl StdioBridge {
  /// Returns the bridge and the writer task draining it into `out`.
  pub fn new<W>(out: W) -> (Self, JoinHandle<()>)
  where
    W: AsyncWrite + Unpin + Send + 'static,
  {
    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_lines(out, rx));
    (
      Self {
        lines: tx,
        next_id: AtomicI64::new(1),
      },
      writer,
    )
  }

  fn allocate(&self, chat: ChannelId) -> MessageRef {
    MessageRef {
      chat,
      id: MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)),
    }
  }

  fn emit(&self, action: &BridgeAction<'_>) -> anyhow::Result<()> {
    let line = serde_json::to_string(action).context("serializing bridge action")?;
    self.lines.send(line).context("bridge writer has stopped")?;
    Ok(())
  }
}

async fn write_lines<W>(mut out: W, mut rx: mpsc::UnboundedReceiver<String>)
where
  W: AsyncWrite + Unpin,
{
  while let Some(mut line) = rx.recv().await {
    line.push('\n');
    if let Err(e) = out.write_all(line.as_bytes()).await {
      error!(error = %e, "Failed to write bridge output.");
      break;
    }
    if let Err(e) = out.flush().await {
      error!(error = %e, "Failed to flush bridge output.");
      break;
    }
  }
}

#[async_trait]
impl ChatTransport for StdioBridge {
  async fn post_text(&self, message: OutgoingText) -> anyhow::Result<MessageRef> {
    let sent = self.allocate(message.channel);
    self.emit(&BridgeAction::PostText {
      message: sent,
      body: &message,
    })?;
    Ok(sent)
  }

  async fn post_photo(
    &self,
    channel: ChannelId,
    photo: &PhotoRef,
    caption: &str,
    format: TextFormat,
  ) -> anyhow::Result<MessageRef> {
    let sent = self.allocate(channel);
    self.emit(&BridgeAction::PostPhoto {
      message: sent,
      photo,
      caption,
      format,
    })?;
    Ok(sent)
  }

  async fn edit_controls(&self, message: &MessageRef, controls: Option<Controls>) -> anyhow::Result<()> {
    self.emit(&BridgeAction::EditControls {
      message,
      controls: controls.as_ref(),
    })
  }

  async fn delete_message(&self, message: &MessageRef) -> anyhow::Result<()> {
    self.emit(&BridgeAction::DeleteMessage { message })
  }

  async fn answer_callback(&self, callback_id: &str, text: &str) -> anyhow::Result<()> {
    self.emit(&BridgeAction::AnswerCallback { callback_id, text })
  }
}

/// Reads one event per line until EOF, handing each to `on_event`. Blank and
/// unparsable lines are skipped.
pub async fn read_events<R>(input: R, mut on_event: impl FnMut(InboundEvent)) -> std::io::Result<()>
where
  R: tokio::io::AsyncRead + Unpin,
{
  let mut lines = BufReader::new(input).lines();
  while let Some(line) = lines.next_line().await? {
    if line.trim().is_empty() {
      continue;
    }
    match serde_json::from_str::<InboundEvent>(&line) {
      Ok(event) => on_event(event),
      Err(e) => warn!(error = %e, "Skipping unparsable event line."),
    }
  }
  Ok(())
}
