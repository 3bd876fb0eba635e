//! Telegram front end for courier.
//!
//! Implements the engine's `Transport` on top of teloxide and runs a
//! long-polling loop that plays the configured script: `/start` sends the
//! asset sequence and arms the follow-up, the reveal button cancels it.

pub mod bot;
pub mod error;
pub mod handlers;
pub mod keyboard;
pub mod script;
pub mod state;
pub mod transport;

pub use {
    bot::start_polling,
    error::{Error, Result},
    script::Script,
    state::BotState,
    transport::{TelegramTransport, build_bot, parse_mode},
};
