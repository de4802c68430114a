pub mod chat;
pub mod message;

pub use chat::{ChatCompletion, ChatRequest, UpstreamRequest};
pub use message::{ChatTurn, Role};
