//! Interactive chat with Mia, the style assistant.
//!
//! Entry point: `loop_runner::run_chat_loop`. The loop reads shopper input,
//! handles slash commands, renders new transcript messages with their
//! product cards and walks the shopper through sign-in when the assistant
//! asks for it.

pub mod commands;
pub mod loop_runner;
pub mod renderer;
