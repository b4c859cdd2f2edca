//! Panchayat Sahayika core library — chat session management, Q&A client,
//! durable chat store, capability traits, and the scheme finder, shared by
//! the CLI front end.

pub mod chat;
pub mod clipboard;
pub mod config;
pub mod finder;
pub mod qa;
pub mod speech;
pub mod store;
pub mod text;
