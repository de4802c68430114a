use once_cell::sync::Lazy;

use crate::model::ChatTurn;

// Bumped whenever the coaching prompt text changes; reported by /health.
pub const PROMPT_VERSION: &str = "1.2";

macro_rules! prompt_file {
    ($lang:literal) => {
        include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/lang/",
            $lang,
            "/system_prompt.txt"
        ))
    };
}

pub const SYSTEM_PROMPT: &str = prompt_file!("en");

static SYSTEM_TURN: Lazy<ChatTurn> = Lazy::new(|| ChatTurn::system(SYSTEM_PROMPT));

/// The coaching instruction placed ahead of every conversation sent upstream.
pub fn system_turn() -> &'static ChatTurn {
    &SYSTEM_TURN
}
