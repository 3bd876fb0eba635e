use std::{sync::Arc, time::Duration};

use {
    courier_config::TelegramConfig,
    courier_engine::Engine,
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, BotCommand, Update, UpdateKind},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use crate::{handlers, script::Script, state::BotState, transport::parse_mode};

/// Pause after a failed `getUpdates` before polling again.
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Start long polling.
///
/// Spawns a background task that handles updates, each in its own task,
/// until the returned `CancellationToken` is cancelled.
pub async fn start_polling(
    bot: Bot,
    engine: Arc<Engine>,
    script: Script,
    config: &TelegramConfig,
) -> anyhow::Result<CancellationToken> {
    let poll_timeout_secs = config.poll_timeout_secs;

    // Verify credentials and get bot username.
    let me = bot.get_me().await?;
    let bot_username = me.username.clone();

    // Delete any existing webhook so long polling works.
    bot.delete_webhook().send().await?;

    let commands = vec![BotCommand::new("start", "Open your gift")];
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!("failed to register bot commands: {e}");
    }

    info!(
        username = ?bot_username,
        steps = script.steps.len(),
        followup = script.followup.is_some(),
        "telegram bot connected (webhook cleared)"
    );

    let cancel = CancellationToken::new();
    let state = Arc::new(BotState {
        bot: bot.clone(),
        bot_username,
        parse_mode: config.parse_mode.map(parse_mode),
        engine,
        script,
    });

    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        info!("starting telegram polling loop");
        let mut offset: i32 = 0;

        loop {
            let request = bot
                .get_updates()
                .offset(offset)
                .timeout(poll_timeout_secs)
                .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery]);

            let result = tokio::select! {
                () = cancel_clone.cancelled() => {
                    info!("telegram polling stopped");
                    break;
                },
                result = request.send() => result,
            };

            match result {
                Ok(updates) => {
                    debug!(count = updates.len(), "got telegram updates");
                    for update in updates {
                        offset = update.id.as_offset();
                        let state = Arc::clone(&state);
                        tokio::spawn(async move { dispatch(update, &state).await });
                    }
                },
                Err(RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) => {
                    warn!("telegram polling disabled: another instance is already running with this token");
                    cancel_clone.cancel();
                    break;
                },
                Err(e) => {
                    warn!(error = %e, "telegram getUpdates failed");
                    tokio::select! {
                        () = cancel_clone.cancelled() => break,
                        () = tokio::time::sleep(POLL_ERROR_BACKOFF) => {},
                    }
                },
            }
        }
    });

    Ok(cancel)
}

async fn dispatch(update: Update, state: &BotState) {
    match update.kind {
        UpdateKind::Message(msg) => {
            let chat_id = msg.chat.id.0;
            debug!(chat_id, "received telegram message");
            if let Err(e) = handlers::handle_message(msg, state).await {
                error!(chat_id, error = %e, "error handling telegram message");
            }
        },
        UpdateKind::CallbackQuery(query) => {
            debug!(callback_data = ?query.data, "received telegram callback query");
            if let Err(e) = handlers::handle_callback_query(query, state).await {
                error!(error = %e, "error handling telegram callback query");
            }
        },
        other => {
            debug!("ignoring update: {other:?}");
        },
    }
}
