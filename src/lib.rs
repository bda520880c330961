//! Sticker User Bot Library
//!
//! A Telegram userbot that keeps groups lively with stickers.
//!
//! This crate provides the core functionality for:
//! - Persisting the sticker rotation
//! - Connecting to Telegram via `MTProto`
//! - Posting random stickers to random groups on a timer
//! - Handling owner commands, reactions and invite-link auto-join

pub mod automation;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod store;
pub mod telegram;
