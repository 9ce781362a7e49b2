//! Answers an actionable mention out-of-band.

use tokio::{task::JoinHandle, time::timeout};
use tracing::{Instrument, error, info, instrument, warn};

use crate::{
    base::{
        config::Config,
        types::{ActionableMention, Void},
    },
    interaction::context::build_conversation_context,
    service::{chat::ChatClient, llm::LlmClient},
};

/// Handles an app mention on its own task.
///
/// The webhook has already been acknowledged, so failures (including the
/// overall deadline) are only logged; the user simply gets no reply.
#[instrument(skip_all, fields(channel = %mention.channel_id, ts = %mention.event_ts))]
pub fn handle_app_mention(mention: ActionableMention, config: Config, llm: LlmClient, chat: ChatClient) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            let deadline = config.pipeline_timeout();

            // Process the event.
            let result = timeout(deadline, process_app_mention(&mention, &llm, &chat)).await;

            // Log any errors.
            match result {
                Ok(Ok(())) => {}
                Ok(Err(err)) => error!("Error while handling: {}", err),
                Err(_) => error!("Gave up on mention after {}s.", deadline.as_secs()),
            }
        }
        .in_current_span(),
    )
}

/// Fetches context, asks the model and posts the reply in the thread.
#[instrument(skip_all)]
pub async fn process_app_mention(mention: &ActionableMention, llm: &LlmClient, chat: &ChatClient) -> Void {
    // An image shared with the mention switches to the vision model.

    let image = match chat.get_recent_image(&mention.channel_id, &mention.requester_id, &mention.event_ts).await {
        Ok(image) => image,
        Err(err) => {
            warn!("Image lookup failed, continuing without one: {}", err);
            None
        }
    };

    let reply = if let Some(image) = image {
        info!("Answering with the vision model ...");

        llm.get_vision_response(&image, &mention.mention_text).await?
    } else {
        // Rebuild the conversation from the thread.

        let transcript = chat.get_thread_replies(&mention.channel_id, &mention.thread_anchor_ts).await?;
        let context = build_conversation_context(&transcript, &mention.bot_id, &mention.mention_text);

        info!("Answering with {} turns of history (transcript had {}) ...", context.history.len(), transcript.len());

        llm.get_chat_response(&context).await?
    };

    // Reply to the requester in the thread.

    let message = format!("<@{}> {}", mention.requester_id, reply);
    chat.send_message(&mention.channel_id, &mention.event_ts, &message).await?;

    info!("Replied to <@{}>.", mention.requester_id);

    Ok(())
}
