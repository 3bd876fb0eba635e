use std::fmt::Display;

use {
    courier_common::RecipientId,
    courier_engine::{Engine, Outcome},
    teloxide::{
        prelude::*,
        types::{CallbackQuery, Message},
    },
    tracing::{debug, info, warn},
};

use crate::{
    keyboard::inline_keyboard,
    script::{Reveal, Script},
    state::BotState,
};

/// Whether `text` is `/start`, optionally addressed as `/start@<bot>` and
/// optionally followed by a deep-link payload.
pub fn is_start_command(text: &str, bot_username: Option<&str>) -> bool {
    let Some(command) = text.split_whitespace().next() else {
        return false;
    };
    match command.split_once('@') {
        None => command == "/start",
        Some((name, target)) => {
            name == "/start" && bot_username.is_some_and(|u| u.eq_ignore_ascii_case(target))
        },
    }
}

pub async fn handle_message(msg: Message, state: &BotState) -> anyhow::Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    if !is_start_command(text, state.bot_username.as_deref()) {
        debug!(chat_id = msg.chat.id.0, "ignoring non-command message");
        return Ok(());
    }
    run_start(&state.engine, &state.script, RecipientId::from(msg.chat.id.0)).await;
    Ok(())
}

/// Arm the follow-up, then send the start sequence. A reveal tapped while
/// later steps are still uploading must find the follow-up armed. It is
/// withdrawn again when no step reached the recipient.
pub async fn run_start(engine: &Engine, script: &Script, to: RecipientId) -> Vec<Outcome> {
    let armed = match script.followup_task(to) {
        Some(task) => {
            let armed = engine.schedule_followup(task);
            if !armed {
                debug!(recipient = %to, "follow-up already pending");
            }
            armed
        },
        None => false,
    };

    let requests = script.start_requests(to);
    info!(recipient = %to, steps = requests.len(), "start sequence");
    let outcomes = engine.send_sequence(&requests).await;

    if armed && !outcomes.is_empty() && !outcomes.iter().any(Outcome::is_delivered) {
        engine.cancel_followup(to);
        warn!(recipient = %to, "start sequence failed entirely, follow-up withdrawn");
    }
    outcomes
}

/// Match callback `data` against the reveal and, on a match, cancel the
/// recipient's pending follow-up.
pub fn begin_reveal<'a>(
    engine: &Engine,
    script: &'a Script,
    to: RecipientId,
    data: &str,
) -> Option<&'a Reveal> {
    let reveal = script.reveal_for(data)?;
    if engine.cancel_followup(to) {
        debug!(recipient = %to, "follow-up cancelled by reveal");
    }
    Some(reveal)
}

/// Settle the reveal after the in-place caption edit. A failed edit falls
/// back to sending the reveal as a new message.
pub async fn finish_reveal<E: Display>(
    engine: &Engine,
    to: RecipientId,
    reveal: &Reveal,
    edited: Result<(), E>,
) -> courier_engine::Result<()> {
    match edited {
        Ok(()) => info!(recipient = %to, "reveal shown in place"),
        Err(e) => {
            debug!(recipient = %to, error = %e, "caption edit failed, replying with text");
            engine
                .send_text(to, &reveal.text, reveal.markup.as_ref())
                .await?;
            info!(recipient = %to, "reveal sent as new message");
        },
    }
    Ok(())
}

async fn answer(state: &BotState, query: &CallbackQuery) {
    if let Err(e) = state.bot.answer_callback_query(&query.id).await {
        warn!(error = %e, "failed to answer callback query");
    }
}

pub async fn handle_callback_query(query: CallbackQuery, state: &BotState) -> anyhow::Result<()> {
    let data = query.data.as_deref().unwrap_or_default();
    let Some(message) = query.message.as_ref() else {
        debug!(callback_data = data, "callback query without message");
        answer(state, &query).await;
        return Ok(());
    };

    let chat_id = message.chat().id;
    let to = RecipientId::from(chat_id.0);
    let Some(reveal) = begin_reveal(&state.engine, &state.script, to, data) else {
        debug!(callback_data = data, "ignoring callback query");
        answer(state, &query).await;
        return Ok(());
    };

    // Dismiss the client-side spinner before the slower edit.
    answer(state, &query).await;

    let mut edit = state
        .bot
        .edit_message_caption(chat_id, message.id())
        .caption(&reveal.text);
    if let Some(mode) = state.parse_mode {
        edit = edit.parse_mode(mode);
    }
    if let Some(ref markup) = reveal.markup {
        edit = edit.reply_markup(inline_keyboard(markup));
    }

    let edited = edit.await.map(|_| ());
    finish_reveal(&state.engine, to, reveal, edited).await?;
    Ok(())
}
