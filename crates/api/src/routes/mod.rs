pub mod chat;
pub mod health;

pub use chat::{chat, chat_history, ChatState};
pub use health::health_check;
