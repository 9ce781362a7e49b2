//! Decides what an inbound Events API request asks of us.

use tracing::{debug, instrument};

use crate::{
    base::types::{ActionableMention, EventEnvelope, WebhookError},
    interaction::context::strip_self_mention,
};

const URL_VERIFICATION: &str = "url_verification";
const APP_MENTION: &str = "app_mention";

/// Outcome of classifying an inbound webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Slack is verifying the endpoint; echo the challenge back.
    Verification { challenge: String },
    /// Nothing to do, acknowledge with an empty 200.
    Ignored,
    /// A mention that must be answered out-of-band.
    Actionable(ActionableMention),
}

/// Classifies a raw request body.
#[instrument(skip_all)]
pub fn classify(body: &[u8]) -> Result<Classification, WebhookError> {
    let envelope = serde_json::from_slice::<EventEnvelope>(body).map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;

    classify_envelope(envelope)
}

/// Classifies an already decoded envelope.
pub fn classify_envelope(envelope: EventEnvelope) -> Result<Classification, WebhookError> {
    if envelope.kind.as_deref() == Some(URL_VERIFICATION)
        && let Some(challenge) = envelope.challenge
    {
        return Ok(Classification::Verification { challenge });
    }

    let event = envelope.event.ok_or(WebhookError::MissingEvent)?;

    if event.kind != APP_MENTION || event.text.is_empty() {
        debug!("Ignoring `{}` event.", event.kind);
        return Ok(Classification::Ignored);
    }

    let bot_id = envelope
        .authorizations
        .into_iter()
        .next()
        .map(|a| a.user_id)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| WebhookError::MalformedPayload("authorizations missing bot user id".to_string()))?;

    let thread_anchor_ts = if event.thread_ts.is_empty() { event.ts.clone() } else { event.thread_ts.clone() };
    let mention_text = strip_self_mention(&event.text, &bot_id);

    debug!("Actionable mention: channel={}, ts={}, thread_ts={}", event.channel, event.ts, event.thread_ts);

    Ok(Classification::Actionable(ActionableMention {
        channel_id: event.channel,
        thread_anchor_ts,
        event_ts: event.event_ts,
        requester_id: event.user,
        mention_text,
        bot_id,
    }))
}

// Tests.

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn mention_body(text: &str, thread_ts: Option<&str>) -> Vec<u8> {
        let mut event = json!({
            "type": "app_mention",
            "text": text,
            "ts": "1700000000.000200",
            "event_ts": "1700000000.000200",
            "channel": "C123",
            "user": "U_REQUESTER",
        });

        if let Some(thread_ts) = thread_ts {
            event["thread_ts"] = json!(thread_ts);
        }

        json!({
            "type": "event_callback",
            "event": event,
            "authorizations": [{ "user_id": "U_BOT" }],
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn test_verification_echoes_challenge() {
        let body = json!({ "type": "url_verification", "challenge": "3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P" }).to_string();

        let result = classify(body.as_bytes()).unwrap();

        assert_eq!(
            result,
            Classification::Verification {
                challenge: "3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(classify(b"not json"), Err(WebhookError::MalformedPayload(_))));
        assert!(matches!(classify(br#"{"event": "nope"}"#), Err(WebhookError::MalformedPayload(_))));
    }

    #[test]
    fn test_missing_event() {
        let body = json!({ "type": "event_callback" }).to_string();

        assert!(matches!(classify(body.as_bytes()), Err(WebhookError::MissingEvent)));
    }

    #[test]
    fn test_verification_without_challenge_needs_event() {
        let body = json!({ "type": "url_verification" }).to_string();

        assert!(matches!(classify(body.as_bytes()), Err(WebhookError::MissingEvent)));
    }

    #[test]
    fn test_other_event_types_are_ignored() {
        let body = json!({
            "type": "event_callback",
            "event": { "type": "message", "text": "hello", "channel": "C123", "user": "U1" },
            "authorizations": [{ "user_id": "U_BOT" }],
        })
        .to_string();

        assert_eq!(classify(body.as_bytes()).unwrap(), Classification::Ignored);
    }

    #[test]
    fn test_empty_text_is_ignored() {
        assert_eq!(classify(&mention_body("", None)).unwrap(), Classification::Ignored);
    }

    #[test]
    fn test_top_level_mention() {
        let result = classify(&mention_body("<@U_BOT> what's up, <@U_OTHER>?", None)).unwrap();

        let Classification::Actionable(mention) = result else {
            panic!("expected an actionable mention, got {result:?}");
        };

        assert_eq!(mention.channel_id, "C123");
        assert_eq!(mention.thread_anchor_ts, "1700000000.000200");
        assert_eq!(mention.event_ts, "1700000000.000200");
        assert_eq!(mention.requester_id, "U_REQUESTER");
        assert_eq!(mention.mention_text, " what's up, <@U_OTHER>?");
        assert_eq!(mention.bot_id, "U_BOT");
    }

    #[test]
    fn test_threaded_mention_anchors_to_thread_root() {
        let result = classify(&mention_body("<@U_BOT> and then?", Some("1699999999.000100"))).unwrap();

        let Classification::Actionable(mention) = result else {
            panic!("expected an actionable mention, got {result:?}");
        };

        assert_eq!(mention.thread_anchor_ts, "1699999999.000100");
        assert_eq!(mention.event_ts, "1700000000.000200");
        assert_eq!(mention.mention_text, " and then?");
    }

    #[test]
    fn test_mention_text_is_stripped_like_transcript_entries() {
        let text = "  <@U_BOT|relay> hi there ";
        let result = classify(&mention_body(text, None)).unwrap();

        let Classification::Actionable(mention) = result else {
            panic!("expected an actionable mention, got {result:?}");
        };

        assert_eq!(mention.mention_text, "   hi there ");
        assert_eq!(mention.mention_text, strip_self_mention(text, "U_BOT"));
    }

    #[test]
    fn test_missing_authorizations_is_malformed() {
        let body = json!({
            "type": "event_callback",
            "event": { "type": "app_mention", "text": "<@U_BOT> hi", "channel": "C123", "user": "U1", "ts": "1.2", "event_ts": "1.2" },
        })
        .to_string();

        assert!(matches!(classify(body.as_bytes()), Err(WebhookError::MalformedPayload(_))));
    }
}
