//! action.rs - Decides what the host should do with an incoming message.
//!
//! The chat transport is not part of this crate. It hands over an
//! [`IncomingMessage`], gets back an [`Action`], and performs the edit,
//! reply or delete itself.
//!
//! License: MIT OR APACHE 2.0

use std::fmt;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::engine::CleaningEngine;
use crate::pipeline::process_message;
use crate::processed_url::MessageReport;
use crate::reply::compose_reply;
use crate::stats::ScrubStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The transport-neutral view of a chat message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub text: String,
    #[serde(default)]
    pub author_is_bot: bool,
    #[serde(default)]
    pub is_reply: bool,
    /// The message this one replies to, when it is a reply.
    #[serde(default)]
    pub reply_target: Option<MessageId>,
    #[serde(default)]
    pub mentioned_users: Vec<UserId>,
}

impl IncomingMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Which message the reply should reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyTarget {
    /// The incoming message itself.
    Incoming,
    /// The message the incoming one was replying to.
    Referenced(MessageId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    NoAction,
    /// Suppress link previews on the original and send nothing.
    EditToSuppressPreview,
    /// Suppress previews on the original and send `text`.
    EditAndReply {
        text: String,
        reply_to: Option<ReplyTarget>,
    },
    /// Send `text` and delete the original.
    EditReplyAndDeleteOriginal { text: String, reply_to: ReplyTarget },
}

impl Action {
    /// The reply text, if this action sends one.
    pub fn reply_text(&self) -> Option<&str> {
        match self {
            Action::EditAndReply { text, .. } | Action::EditReplyAndDeleteOriginal { text, .. } => Some(text),
            Action::NoAction | Action::EditToSuppressPreview => None,
        }
    }

    pub fn deletes_original(&self) -> bool {
        matches!(self, Action::EditReplyAndDeleteOriginal { .. })
    }
}

/// Maps a finished report and its composed reply to an [`Action`].
pub fn decide_action(message: &IncomingMessage, report: &MessageReport, reply: String) -> Action {
    if message.author_is_bot || !report.is_actionable() {
        return Action::NoAction;
    }
    if reply.is_empty() {
        return Action::EditToSuppressPreview;
    }

    let counts = report.counts();
    let pure = !report.not_pure_url;
    let deletable = pure && counts.cleaned > 0 && counts.redirects == 0;

    if !deletable {
        let reply_to = pure.then_some(ReplyTarget::Incoming);
        return Action::EditAndReply { text: reply, reply_to };
    }

    if message.is_reply {
        // Deleting a reply that pings someone would silently drop the ping.
        if !message.mentioned_users.is_empty() {
            return Action::EditAndReply {
                text: reply,
                reply_to: Some(ReplyTarget::Incoming),
            };
        }
        return match message.reply_target {
            Some(target) => Action::EditReplyAndDeleteOriginal {
                text: reply,
                reply_to: ReplyTarget::Referenced(target),
            },
            None => {
                debug!("Reply without a known target; keeping the original.");
                Action::EditAndReply {
                    text: reply,
                    reply_to: Some(ReplyTarget::Incoming),
                }
            }
        };
    }

    Action::EditReplyAndDeleteOriginal {
        text: reply,
        reply_to: ReplyTarget::Incoming,
    }
}

/// Full per-message entry point: pipeline, reply composition and decision.
pub fn on_incoming_message(message: &IncomingMessage, engine: &dyn CleaningEngine, stats: &ScrubStats) -> Action {
    if message.author_is_bot {
        return Action::NoAction;
    }
    stats.record_message();

    let report = process_message(&message.text, engine, stats);
    if !report.is_actionable() {
        return Action::NoAction;
    }
    if report.counts().cleaned > 0 {
        stats.record_cleaned_message();
    }

    let reply = compose_reply(&report);
    let action = decide_action(message, &report, reply);
    info!(
        "Message handled: {} URL(s), counts {:?}, deletes original: {}",
        report.len(),
        report.counts(),
        action.deletes_original()
    );
    action
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleDocument;
    use crate::engines::rule_engine::RuleEngine;
    use crate::store::build_rule_set;
    use std::path::Path;
    use std::sync::Arc;

    const RULES: &str = r#"{
        "providers": {
            "globalRules": { "urlPattern": ".*", "rules": ["^utm_"] },
            "redirector": {
                "urlPattern": "^https?://go\\.example\\.net",
                "redirections": ["^https?://go\\.example\\.net/out\\?"]
            }
        }
    }"#;

    fn engine() -> RuleEngine {
        let doc = RuleDocument::from_json(RULES, Path::new("test")).unwrap();
        RuleEngine::new(Arc::new(build_rule_set(doc, None, None).unwrap()))
    }

    fn handle(message: &IncomingMessage) -> Action {
        on_incoming_message(message, &engine(), &ScrubStats::new())
    }

    const TRACKED: &str = "https://example.com/a?utm_source=x&b=1";

    #[test]
    fn test_pure_cleaned_message_is_replaced() {
        let action = handle(&IncomingMessage::new(TRACKED));
        assert_eq!(
            action,
            Action::EditReplyAndDeleteOriginal {
                text: "https://example.com/a?&b=1".into(),
                reply_to: ReplyTarget::Incoming,
            }
        );
    }

    #[test]
    fn test_impure_message_gets_unreferenced_reply() {
        let action = handle(&IncomingMessage::new(format!("look at this {TRACKED}")));
        assert_eq!(
            action,
            Action::EditAndReply {
                text: "https://example.com/a?&b=1".into(),
                reply_to: None,
            }
        );
    }

    #[test]
    fn test_single_redirect_replies_with_notice_and_keeps_original() {
        let action = handle(&IncomingMessage::new("https://go.example.net/out?to=elsewhere"));
        assert_eq!(
            action,
            Action::EditAndReply {
                text: crate::reply::REDIRECT_NOTICE.into(),
                reply_to: Some(ReplyTarget::Incoming),
            }
        );
    }

    #[test]
    fn test_masked_link_reply() {
        let action = handle(&IncomingMessage::new("[label](https://example.com/a)"));
        assert_eq!(action.reply_text(), Some("label ↔️ https://example.com/a"));
        assert!(!action.deletes_original());
    }

    #[test]
    fn test_reply_without_mentions_is_replaced_under_its_target() {
        let message = IncomingMessage {
            is_reply: true,
            reply_target: Some(MessageId(42)),
            ..IncomingMessage::new(TRACKED)
        };
        assert_eq!(
            handle(&message),
            Action::EditReplyAndDeleteOriginal {
                text: "https://example.com/a?&b=1".into(),
                reply_to: ReplyTarget::Referenced(MessageId(42)),
            }
        );
    }

    #[test]
    fn test_reply_with_mentions_is_kept() {
        let message = IncomingMessage {
            is_reply: true,
            reply_target: Some(MessageId(42)),
            mentioned_users: vec![UserId(7)],
            ..IncomingMessage::new(TRACKED)
        };
        assert_eq!(
            handle(&message),
            Action::EditAndReply {
                text: "https://example.com/a?&b=1".into(),
                reply_to: Some(ReplyTarget::Incoming),
            }
        );
    }

    #[test]
    fn test_bot_and_clean_messages_need_no_action() {
        let bot = IncomingMessage {
            author_is_bot: true,
            ..IncomingMessage::new(TRACKED)
        };
        assert_eq!(handle(&bot), Action::NoAction);
        assert_eq!(handle(&IncomingMessage::new("https://example.com/a?b=1")), Action::NoAction);
        assert_eq!(handle(&IncomingMessage::new("no links")), Action::NoAction);
    }

    #[test]
    fn test_empty_reply_suppresses_preview() {
        let report = {
            let mut r = MessageReport::new(false);
            r.insert(TRACKED, "https://example.com/a?&b=1".into(), false);
            r
        };
        assert_eq!(
            decide_action(&IncomingMessage::new(TRACKED), &report, String::new()),
            Action::EditToSuppressPreview
        );
    }

    #[test]
    fn test_action_serialises_with_tag() {
        let action = Action::EditReplyAndDeleteOriginal {
            text: "x".into(),
            reply_to: ReplyTarget::Referenced(MessageId(9)),
        };
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(
            json,
            r#"{"action":"edit_reply_and_delete_original","text":"x","reply_to":{"referenced":9}}"#
        );
    }

    #[test]
    fn test_counters_follow_messages() {
        let stats = ScrubStats::new();
        let e = engine();
        on_incoming_message(&IncomingMessage::new(TRACKED), &e, &stats);
        on_incoming_message(&IncomingMessage::new("nothing here"), &e, &stats);
        let snap = stats.snapshot();
        assert_eq!(snap.total_messages, 2);
        assert_eq!(snap.cleaned_messages, 1);
    }
}
