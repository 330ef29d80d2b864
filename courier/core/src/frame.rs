//! Frame Model
//!
//! The data shapes exchanged with a streaming inference backend: outbound
//! conversation messages, and the inbound [`Frame`] update units that carry
//! answer text and side-channel signals.
//!
//! # Design Philosophy
//!
//! Backends disagree about delivery: some send deltas, some resend the full
//! answer-so-far on every update. A frame states which strategy it uses via
//! [`Frame::replace`], so the controller never has to diff old text against
//! new. Everything that is not primary content rides the same frame as a
//! [`SideChannel`] variant, keeping dispatch to a single `match` no matter
//! how many signal kinds are added.

use serde::{Deserialize, Serialize};

/// Caller-supplied correlation token identifying one logical exchange.
///
/// The controller never interprets the value; it is echoed on every sink
/// notification so the hosting application can route updates.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExchangeId(pub String);

impl ExchangeId {
    /// Create an exchange id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored an outbound message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// End-user input
    User,
    /// A prior assistant answer (conversation history)
    Assistant,
    /// System instruction
    System,
}

/// One message of the conversation payload handed to the transport.
///
/// The core does not assemble prompts or context; callers build the full
/// outbound sequence themselves and pass it to `start`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Who authored this message
    pub role: MessageRole,
    /// The message text
    pub content: String,
}

impl OutboundMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message (conversation history)
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// A cited source attached to an answer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Human-readable source title
    pub title: String,
    /// Source location
    pub url: String,
    /// Quoted excerpt (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Cost and latency telemetry reported by the backend
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageMetrics {
    /// Tokens consumed by the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u32>,
    /// Tokens produced by the answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u32>,
    /// Wall-clock generation time in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    /// Billed cost in USD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
}

/// An out-of-band payload riding on a frame alongside primary content.
///
/// One tagged variant per signal kind; the controller translates each to
/// the matching sink notification in a single dispatch `match`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SideChannel {
    /// Model reasoning trace
    Reasoning {
        /// Reasoning text fragment
        text: String,
    },
    /// Sources cited by the answer
    Citations {
        /// The cited sources
        sources: Vec<Citation>,
    },
    /// A follow-up question the backend wants the user to answer
    InteractiveQuestion {
        /// The question text
        question: String,
    },
    /// Context the backend enriched the exchange with (retrieval, tools)
    EnrichedContext {
        /// The enriched context text
        context: String,
    },
    /// Cost/latency telemetry
    UsageMetrics(UsageMetrics),
}

/// One immutable update unit received from the transport.
///
/// A frame may carry content, side-channel signals, both, or neither (a
/// liveness-only keepalive). No further frames are valid for a session
/// after its terminal frame; the controller enforces this.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Text fragment, if this frame carries content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Whether `content` supersedes the accumulated text instead of
    /// extending it (full-resend backends set this on every frame)
    #[serde(default)]
    pub replace: bool,
    /// Whether this frame ends the exchange
    #[serde(default)]
    pub terminal: bool,
    /// Side-channel signals riding on this frame (empty = none)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub side_channels: Vec<SideChannel>,
}

impl Frame {
    /// Create a delta content frame
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            ..Default::default()
        }
    }

    /// Create a full-resend frame superseding all accumulated text
    pub fn replacement(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            replace: true,
            ..Default::default()
        }
    }

    /// Create a terminal frame with no content
    #[must_use]
    pub fn terminal() -> Self {
        Self {
            terminal: true,
            ..Default::default()
        }
    }

    /// Create a liveness-only frame (no content, no signals)
    #[must_use]
    pub fn keepalive() -> Self {
        Self::default()
    }

    /// Attach a side-channel signal
    #[must_use]
    pub fn with_side_channel(mut self, channel: SideChannel) -> Self {
        self.side_channels.push(channel);
        self
    }

    /// Mark this frame as terminal
    #[must_use]
    pub fn with_terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    /// Whether this frame carries neither content nor signals
    #[must_use]
    pub fn is_keepalive(&self) -> bool {
        self.content.is_none() && self.side_channels.is_empty() && !self.terminal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_builders() {
        let frame = Frame::content("Hello");
        assert_eq!(frame.content.as_deref(), Some("Hello"));
        assert!(!frame.replace);
        assert!(!frame.terminal);

        let frame = Frame::replacement("All of it");
        assert!(frame.replace);

        let frame = Frame::terminal();
        assert!(frame.terminal);
        assert!(frame.content.is_none());

        assert!(Frame::keepalive().is_keepalive());
        assert!(!Frame::terminal().is_keepalive());
    }

    #[test]
    fn test_frame_side_channels_coexist_with_content() {
        let frame = Frame::content("answer text")
            .with_side_channel(SideChannel::Reasoning {
                text: "thinking...".to_string(),
            })
            .with_side_channel(SideChannel::UsageMetrics(UsageMetrics {
                output_tokens: Some(42),
                ..Default::default()
            }));

        assert!(frame.content.is_some());
        assert_eq!(frame.side_channels.len(), 2);
    }

    #[test]
    fn test_frame_wire_decoding() {
        // Sparse wire lines decode with defaults
        let frame: Frame = serde_json::from_str(r#"{"content":"hi"}"#).unwrap();
        assert_eq!(frame.content.as_deref(), Some("hi"));
        assert!(!frame.terminal);
        assert!(frame.side_channels.is_empty());

        let frame: Frame = serde_json::from_str(r#"{"terminal":true}"#).unwrap();
        assert!(frame.terminal);

        let frame: Frame = serde_json::from_str(
            r#"{"side_channels":[{"kind":"citations","sources":[{"title":"Doc","url":"https://example.com"}]}]}"#,
        )
        .unwrap();
        assert!(matches!(
            frame.side_channels[0],
            SideChannel::Citations { .. }
        ));

        // Empty object is a valid keepalive
        let frame: Frame = serde_json::from_str("{}").unwrap();
        assert!(frame.is_keepalive());
    }

    #[test]
    fn test_side_channel_tagging() {
        let json = serde_json::to_string(&SideChannel::Reasoning {
            text: "hmm".to_string(),
        })
        .unwrap();
        assert!(json.contains(r#""kind":"reasoning""#));

        let json = serde_json::to_string(&SideChannel::InteractiveQuestion {
            question: "Which file?".to_string(),
        })
        .unwrap();
        assert!(json.contains(r#""kind":"interactive_question""#));
    }

    #[test]
    fn test_outbound_message_constructors() {
        let msg = OutboundMessage::user("hi");
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(OutboundMessage::system("be terse").role, MessageRole::System);
        assert_eq!(
            OutboundMessage::assistant("earlier answer").role,
            MessageRole::Assistant
        );
    }

    #[test]
    fn test_exchange_id_display() {
        let id = ExchangeId::new("m1");
        assert_eq!(id.to_string(), "m1");
        assert_eq!(id, ExchangeId("m1".to_string()));
    }
}
