use std::sync::Arc;

use courier_engine::Engine;

use crate::script::Script;

/// Everything an update handler needs. Shared across the per-update tasks.
pub struct BotState {
    pub bot: teloxide::Bot,
    pub bot_username: Option<String>,
    /// Applied to the reveal when it is edited into the media caption.
    pub parse_mode: Option<teloxide::types::ParseMode>,
    pub engine: Arc<Engine>,
    pub script: Script,
}
