//! Rebuilds the model-facing conversation from a thread transcript.
//!
//! Chat-completion APIs want strictly alternating roles, and the newest user
//! messages (everything since the bot last spoke) belong to the prompt rather
//! than to settled history.

use crate::base::types::{ConversationContext, RawMessage, Role, Turn};

/// Separator used when joining consecutive same-speaker messages.
const MERGE_SEPARATOR: &str = ", ";

/// Removes every occurrence of the bot's own mention marker from `text`.
///
/// Handles both `<@BOTID>` and the labelled `<@BOTID|name>` form. Mentions of
/// other users are left untouched.
pub fn strip_self_mention(text: &str, bot_id: &str) -> String {
    if bot_id.is_empty() {
        return text.to_string();
    }

    let prefix = format!("<@{bot_id}");
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(&prefix) {
        let after = &rest[start + prefix.len()..];

        // Only `>` or `|label>` may follow, otherwise this is a longer id sharing our prefix.
        let end = match after.chars().next() {
            Some('>') => Some(1),
            Some('|') => after.find('>').map(|i| i + 1),
            _ => None,
        };

        match end {
            Some(end) => {
                result.push_str(&rest[..start]);
                rest = &after[end..];
            }
            None => {
                result.push_str(&rest[..start + prefix.len()]);
                rest = after;
            }
        }
    }

    result.push_str(rest);
    result
}

/// Classifies a transcript author.
pub fn role_of(author: &str, bot_id: &str) -> Role {
    if author == bot_id { Role::Assistant } else { Role::User }
}

/// Builds the history and the consolidated new input for a mention.
///
/// The last transcript entry is the triggering message itself (already in
/// `new_input`), so it is skipped. A trailing user turn has not been answered
/// yet and is folded into the new input instead of the history.
pub fn build_conversation_context(transcript: &[RawMessage], bot_id: &str, new_input: &str) -> ConversationContext {
    let settled = match transcript.split_last() {
        Some((_, rest)) => rest,
        None => transcript,
    };

    let mut history = settled.iter().fold(Vec::<Turn>::with_capacity(settled.len()), |mut turns, message| {
        let role = role_of(&message.author, bot_id);
        let text = strip_self_mention(&message.text, bot_id);

        match turns.last_mut() {
            Some(last) if last.role == role => {
                last.text.push_str(MERGE_SEPARATOR);
                last.text.push_str(&text);
            }
            _ => turns.push(Turn::new(role, text)),
        }

        turns
    });

    let new_input_text = match history.pop_if(|turn| turn.role == Role::User) {
        Some(pending) => format!("{}{MERGE_SEPARATOR}{new_input}", pending.text),
        None => new_input.to_string(),
    };

    ConversationContext { history, new_input_text }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    const USER: &str = "user";
    const BOT: &str = "bot";

    fn user(text: &str) -> RawMessage {
        RawMessage::new(USER, text)
    }

    fn bot(text: &str) -> RawMessage {
        RawMessage::new(BOT, text)
    }

    fn assert_invariants(context: &ConversationContext) {
        for pair in context.history.windows(2) {
            assert_ne!(pair[0].role, pair[1].role, "adjacent turns share a role: {:?}", context.history);
        }

        if let Some(last) = context.history.last() {
            assert_eq!(last.role, Role::Assistant, "history ends on a user turn: {:?}", context.history);
        }
    }

    #[test]
    fn test_normal_thread() {
        let transcript = vec![user("text1"), bot("answer1"), user("text2")];

        let context = build_conversation_context(&transcript, BOT, "test");

        assert_eq!(context.history, vec![Turn::new(Role::User, "text1"), Turn::new(Role::Assistant, "answer1")]);
        assert_eq!(context.new_input_text, "test");
        assert_invariants(&context);
    }

    #[test]
    fn test_no_history() {
        let context = build_conversation_context(&[], BOT, "test");

        assert!(context.history.is_empty());
        assert_eq!(context.new_input_text, "test");
    }

    #[test]
    fn test_user_posts_twice_before_answer() {
        let transcript = vec![user("text1"), user("text2"), bot("answer1"), user("text3")];

        let context = build_conversation_context(&transcript, BOT, "test");

        assert_eq!(context.history, vec![Turn::new(Role::User, "text1, text2"), Turn::new(Role::Assistant, "answer1")]);
        assert_eq!(context.new_input_text, "test");
        assert_invariants(&context);
    }

    #[test]
    fn test_unanswered_user_post_joins_new_input() {
        let transcript = vec![user("text1"), bot("answer1"), user("text2"), user("test")];

        let context = build_conversation_context(&transcript, BOT, "test");

        assert_eq!(context.history, vec![Turn::new(Role::User, "text1"), Turn::new(Role::Assistant, "answer1")]);
        assert_eq!(context.new_input_text, "text2, test");
        assert_invariants(&context);
    }

    #[test]
    fn test_runs_on_both_sides_of_answer() {
        let transcript = vec![user("text1"), user("text2"), user("text3"), bot("answer1"), user("text4"), user("text5"), user("test")];

        let context = build_conversation_context(&transcript, BOT, "test");

        assert_eq!(context.history, vec![Turn::new(Role::User, "text1, text2, text3"), Turn::new(Role::Assistant, "answer1")]);
        assert_eq!(context.new_input_text, "text4, text5, test");
        assert_invariants(&context);
    }

    #[test]
    fn test_single_entry_transcript_has_no_history() {
        let context = build_conversation_context(&[user("hello")], BOT, "hello");

        assert!(context.history.is_empty());
        assert_eq!(context.new_input_text, "hello");
    }

    #[test]
    fn test_single_speaker_transcript() {
        let transcript = vec![user("a"), user("b"), user("c"), user("trigger")];

        let context = build_conversation_context(&transcript, BOT, "trigger");

        assert!(context.history.is_empty());
        assert_eq!(context.new_input_text, "a, b, c, trigger");

        let transcript = vec![bot("a"), bot("b"), bot("c"), user("trigger")];

        let context = build_conversation_context(&transcript, BOT, "trigger");

        assert_eq!(context.history, vec![Turn::new(Role::Assistant, "a, b, c")]);
        assert_eq!(context.new_input_text, "trigger");
    }

    #[test]
    fn test_bot_replies_are_merged() {
        let transcript = vec![user("q"), bot("part one"), bot("part two"), user("trigger")];

        let context = build_conversation_context(&transcript, BOT, "trigger");

        assert_eq!(context.history, vec![Turn::new(Role::User, "q"), Turn::new(Role::Assistant, "part one, part two")]);
        assert_invariants(&context);
    }

    #[test]
    fn test_other_users_share_the_user_role() {
        let transcript = vec![RawMessage::new("alice", "hi"), RawMessage::new("bob", "hey"), bot("hello both"), RawMessage::new("alice", "trigger")];

        let context = build_conversation_context(&transcript, BOT, "trigger");

        assert_eq!(context.history, vec![Turn::new(Role::User, "hi, hey"), Turn::new(Role::Assistant, "hello both")]);
    }

    #[test]
    fn test_history_mentions_are_stripped() {
        let transcript = vec![user("<@bot> what is rust?"), bot("A language."), user("<@bot> thanks")];

        let context = build_conversation_context(&transcript, BOT, "thanks");

        assert_eq!(context.history[0].text, " what is rust?");
    }

    #[test]
    fn test_invariants_hold_for_mixed_transcripts() {
        let speakers = [USER, BOT];

        // Every transcript of length <= 6 over two speakers.
        for len in 0..=6u32 {
            for mask in 0..(1u32 << len) {
                let transcript = (0..len)
                    .map(|i| RawMessage::new(speakers[((mask >> i) & 1) as usize], format!("m{i}")))
                    .collect::<Vec<_>>();

                let context = build_conversation_context(&transcript, BOT, "new");

                assert_invariants(&context);
                assert!(!context.new_input_text.is_empty());
                assert!(context.new_input_text.ends_with("new"));
            }
        }
    }

    #[test]
    fn test_role_classification_is_stable() {
        assert_eq!(role_of(BOT, BOT), Role::Assistant);
        assert_eq!(role_of(BOT, BOT), role_of(BOT, BOT));
        assert_eq!(role_of(USER, BOT), Role::User);
        assert_eq!(role_of(USER, BOT), role_of(USER, BOT));
    }

    #[test]
    fn test_strip_self_mention() {
        assert_eq!(strip_self_mention("<@U123> hello", "U123"), " hello");
        assert_eq!(strip_self_mention("hi <@U123> and <@U123>!", "U123"), "hi  and !");
        assert_eq!(strip_self_mention("<@U123|relay> hello", "U123"), " hello");
        assert_eq!(strip_self_mention("ask <@U999> please", "U123"), "ask <@U999> please");
        assert_eq!(strip_self_mention("<@U1234> is someone else", "U123"), "<@U1234> is someone else");
        assert_eq!(strip_self_mention("no mention", "U123"), "no mention");
        assert_eq!(strip_self_mention("<@U123", "U123"), "<@U123");
        assert_eq!(strip_self_mention("<@U123> x", ""), "<@U123> x");
    }
}
