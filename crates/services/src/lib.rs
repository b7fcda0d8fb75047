pub mod chat;

pub use chat::{ChatServiceImpl, ChatSettings};
