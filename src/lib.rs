//! Poker hand-history bot — recognizes pasted hand histories, checks them
//! against Mystery Battle Royale rules, and asks a remote coach for advice.

pub mod advice;
pub mod bot;
pub mod channels;
pub mod config;
pub mod error;
pub mod hand;
pub mod pipeline;
pub mod store;
