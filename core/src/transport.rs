// order_relay/src/transport.rs

//! The chat transport, seen from the engine: inbound events in, a handful of
//! outbound operations out. Nothing here knows about a concrete messenger.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub i64);

/// A message as addressed by the transport: the channel it lives in and its id
/// within that channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
  pub chat: ChannelId,
  pub id: MessageId,
}

/// Opaque transport handle to an uploaded photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRef(pub String);

impl fmt::Display for PhotoRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
  pub id: UserId,
  pub display_name: String,
  #[serde(default)]
  pub username: Option<String>,
}

impl Sender {
  /// Username when set, display name otherwise.
  pub fn handle(&self) -> &str {
    self.username.as_deref().unwrap_or(&self.display_name)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Content {
  Text(String),
  Photo {
    photo: PhotoRef,
    #[serde(default)]
    caption: Option<String>,
  },
}

/// The message an inbound message replies to, as the transport delivers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepliedMessage {
  pub message: MessageRef,
  #[serde(default)]
  pub text: Option<String>,
  #[serde(default)]
  pub caption: Option<String>,
}

impl RepliedMessage {
  /// Text, or the photo caption when the replied message has no text.
  pub fn body(&self) -> Option<&str> {
    self.text.as_deref().or(self.caption.as_deref())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
  pub message: MessageRef,
  pub sender: Sender,
  pub content: Content,
  #[serde(default)]
  pub reply_to: Option<RepliedMessage>,
}

impl InboundMessage {
  pub fn channel(&self) -> ChannelId {
    self.message.chat
  }

  pub fn text(&self) -> Option<&str> {
    match &self.content {
      Content::Text(text) => Some(text),
      Content::Photo { .. } => None,
    }
  }
}

/// A button press, delivered back with the token the button was created with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackQuery {
  pub id: String,
  pub actor: Sender,
  pub data: String,
  pub message: MessageRef,
  #[serde(default)]
  pub message_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundEvent {
  Message(InboundMessage),
  Callback(CallbackQuery),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFormat {
  #[default]
  Plain,
  Html,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
  pub label: String,
  pub token: String,
}

/// Inline buttons attached under a message, row by row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controls {
  pub rows: Vec<Vec<Button>>,
}

impl Controls {
  pub fn single(label: impl Into<String>, token: impl Into<String>) -> Self {
    Self {
      rows: vec![vec![Button {
        label: label.into(),
        token: token.into(),
      }]],
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingText {
  pub channel: ChannelId,
  pub text: String,
  pub format: TextFormat,
  pub reply_to: Option<MessageId>,
  pub controls: Option<Controls>,
}

impl OutgoingText {
  pub fn plain(channel: ChannelId, text: impl Into<String>) -> Self {
    Self {
      channel,
      text: text.into(),
      format: TextFormat::Plain,
      reply_to: None,
      controls: None,
    }
  }

  pub fn html(channel: ChannelId, text: impl Into<String>) -> Self {
    Self {
      format: TextFormat::Html,
      ..Self::plain(channel, text)
    }
  }

  pub fn replying_to(mut self, message: MessageId) -> Self {
    self.reply_to = Some(message);
    self
  }

  pub fn with_controls(mut self, controls: Controls) -> Self {
    self.controls = Some(controls);
    self
  }
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
  async fn post_text(&self, message: OutgoingText) -> anyhow::Result<MessageRef>;

  async fn post_photo(
    &self,
    channel: ChannelId,
    photo: &PhotoRef,
    caption: &str,
    format: TextFormat,
  ) -> anyhow::Result<MessageRef>;

  /// Replaces the buttons under `message`; `None` removes them.
  async fn edit_controls(&self, message: &MessageRef, controls: Option<Controls>) -> anyhow::Result<()>;

  /// Deleting a message that is already gone must not be treated as fatal by
  /// callers.
  async fn delete_message(&self, message: &MessageRef) -> anyhow::Result<()>;

  async fn answer_callback(&self, callback_id: &str, text: &str) -> anyhow::Result<()>;
}
