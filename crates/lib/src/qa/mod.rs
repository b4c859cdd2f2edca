//! Q&A service abstraction and HTTP client.
//!
//! The backend answers scheme questions over POST /ask; responses come in two
//! shapes (new: message + cards, legacy: response + sources) and are
//! normalized into [`Answer`] at this boundary.

mod client;

pub use client::{Answer, Card, HistoryEntry, QaClient, QaError, Role, Source, UiLang};
