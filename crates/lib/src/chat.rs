//! Chat session manager: the multi-conversation model, the exchange with the
//! Q&A service, per-message ephemeral UI state, and persistence.
//!
//! All state mutation happens in response to discrete commands; the only
//! suspending operation is the send exchange, which is single-flight per
//! manager. A send is routed back to the conversation that was active when it
//! was issued, even if the user has switched conversations in the meantime;
//! that is the product behavior, not an accident.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clipboard::Clipboard;
use crate::qa::{Answer, Card, HistoryEntry, QaClient, QaError, Role, Source, UiLang};
use crate::speech::{RecognizerEvent, SpeechRecognizer, SpeechSynth};
use crate::store::ChatStore;
use crate::text;

/// Title of a conversation that has not seen a user message yet.
pub const NEW_CHAT_TITLE: &str = "New chat";

/// Greeting that opens every new conversation.
pub const GREETING_TEXT: &str =
    "नमस्ते! मैं आपकी पंचायत सहायिका हूं। Aap apna sawal bolkar ya likhkar pooch sakte hain.";

/// Fixed apology appended when the exchange with the Q&A service fails.
pub const SEND_ERROR_TEXT: &str =
    "माफ़ कीजिए, सर्वर से कनेक्शन नहीं हो पाया। कृपया थोड़ी देर बाद पुनः प्रयास करें।";

/// Locale for speech-to-text input.
pub const VOICE_INPUT_LOCALE: &str = "hi-IN";

const TITLE_MAX_CHARS: usize = 30;
const HISTORY_LIMIT: usize = 6;
const COPIED_INDICATOR_TTL: Duration = Duration::from_millis(1500);

/// One turn in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Message {
    /// Typed (or transcribed) user question.
    UserText { text: String },
    /// Bot text with no answer payload: the greeting, or a locally
    /// synthesized error.
    BotText { text: String },
    /// Bot answer in the new API shape: HTML-bearing text plus result cards.
    AnswerCards {
        text: String,
        #[serde(default)]
        cards: Vec<Card>,
        lang: UiLang,
    },
    /// Bot answer in the legacy API shape: HTML-bearing text plus sources.
    AnswerSources {
        text: String,
        #[serde(default)]
        sources: Vec<Source>,
        lang: UiLang,
    },
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Message::UserText { text: text.into() }
    }

    pub fn greeting() -> Self {
        Message::BotText {
            text: GREETING_TEXT.to_string(),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Message::UserText { text }
            | Message::BotText { text }
            | Message::AnswerCards { text, .. }
            | Message::AnswerSources { text, .. } => text,
        }
    }

    /// UI language captured when the answer was requested; None for user
    /// turns and bot text.
    pub fn lang(&self) -> Option<UiLang> {
        match self {
            Message::AnswerCards { lang, .. } | Message::AnswerSources { lang, .. } => Some(*lang),
            _ => None,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Message::UserText { .. })
    }

    fn role(&self) -> Role {
        if self.is_user() {
            Role::User
        } else {
            Role::Assistant
        }
    }
}

/// One persisted chat thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Fresh conversation: generated id, sentinel title, greeting first.
    pub fn new() -> Self {
        Self {
            id: format!("chat-{}", uuid::Uuid::new_v4()),
            title: NEW_CHAT_TITLE.to_string(),
            created_at: Utc::now(),
            messages: vec![Message::greeting()],
        }
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// The durable whole: every conversation plus the active pointer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(rename = "chats")]
    pub conversations: Vec<Conversation>,
    #[serde(rename = "activeChatId")]
    pub active_id: String,
}

/// Key identifying one message for the ephemeral speak/copy indicators.
pub fn message_key(conversation_id: &str, index: usize) -> String {
    format!("{}:{}", conversation_id, index)
}

/// User-visible notices surfaced by capability failures. These are shown to
/// the user, never raised as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    VoiceOutputUnsupported,
    VoiceInputUnsupported,
    CopyFailed,
    MicError(String),
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::VoiceOutputUnsupported => {
                write!(f, "Aapka system voice output support nahi karta.")
            }
            Notice::VoiceInputUnsupported => {
                write!(f, "आपका डिवाइस वॉइस इनपुट सपोर्ट नहीं करता।")
            }
            Notice::CopyFailed => write!(f, "Copy karne me dikkat aayi."),
            Notice::MicError(e) => write!(f, "Mic error: {}", e),
        }
    }
}

/// An exchange in flight: everything captured when the send was issued.
/// The answer is appended to `conversation_id` regardless of which
/// conversation is active by then.
#[derive(Debug)]
pub struct PendingSend {
    conversation_id: String,
    question: String,
    ui_lang: UiLang,
    history: Vec<HistoryEntry>,
}

impl PendingSend {
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }
}

/// Owns the session state and drives every chat command.
pub struct ChatManager {
    state: SessionState,
    store: ChatStore,
    qa: QaClient,
    synth: Box<dyn SpeechSynth>,
    ui_lang: UiLang,
    loading: bool,
    listening: bool,
    input: String,
    speaking_key: Option<String>,
    copied_key: Option<String>,
    copied_until: Option<Instant>,
}

impl ChatManager {
    /// Restore saved state, or start with a single fresh conversation.
    /// A saved active id that no longer resolves falls back to the first
    /// conversation.
    pub fn new(qa: QaClient, store: ChatStore, synth: Box<dyn SpeechSynth>, ui_lang: UiLang) -> Self {
        let (state, dirty) = match store.load() {
            Some(mut state) => {
                let stale = !state.conversations.iter().any(|c| c.id == state.active_id);
                if stale {
                    state.active_id = state.conversations[0].id.clone();
                }
                (state, stale)
            }
            None => {
                let conversation = Conversation::new();
                let state = SessionState {
                    active_id: conversation.id.clone(),
                    conversations: vec![conversation],
                };
                (state, true)
            }
        };
        let manager = Self {
            state,
            store,
            qa,
            synth,
            ui_lang,
            loading: false,
            listening: false,
            input: String::new(),
            speaking_key: None,
            copied_key: None,
            copied_until: None,
        };
        if dirty {
            manager.persist();
        }
        manager
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.state.conversations
    }

    pub fn active_id(&self) -> &str {
        &self.state.active_id
    }

    /// The conversation the input bar is pointed at.
    pub fn active(&self) -> &Conversation {
        self.state
            .conversations
            .iter()
            .find(|c| c.id == self.state.active_id)
            .unwrap_or(&self.state.conversations[0])
    }

    pub fn ui_lang(&self) -> UiLang {
        self.ui_lang
    }

    pub fn set_ui_lang(&mut self, lang: UiLang) {
        self.ui_lang = lang;
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn listening(&self) -> bool {
        self.listening
    }

    pub fn speaking_key(&self) -> Option<&str> {
        self.speaking_key.as_deref()
    }

    pub fn copied_key(&self) -> Option<&str> {
        self.copied_key.as_deref()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn take_input(&mut self) -> String {
        std::mem::take(&mut self.input)
    }

    /// Start a fresh conversation and make it active.
    pub fn new_conversation(&mut self) -> &Conversation {
        let conversation = Conversation::new();
        self.state.active_id = conversation.id.clone();
        self.state.conversations.push(conversation);
        self.input.clear();
        self.clear_ephemeral();
        self.persist();
        self.active()
    }

    /// Switch the active conversation. Unknown ids are ignored.
    pub fn select_conversation(&mut self, id: &str) {
        if !self.state.conversations.iter().any(|c| c.id == id) {
            log::debug!("select of unknown conversation {} ignored", id);
            return;
        }
        self.state.active_id = id.to_string();
        self.clear_ephemeral();
        self.persist();
    }

    /// Send a question through the full exchange. Returns false when the
    /// send was rejected (empty input or an exchange already in flight).
    pub async fn send(&mut self, question: &str) -> bool {
        let Some(pending) = self.begin_send(question) else {
            return false;
        };
        let result = self
            .qa
            .ask(&pending.question, pending.ui_lang, &pending.history)
            .await;
        self.finish_send(pending, result);
        true
    }

    /// First half of the exchange: validate, append the user message, apply
    /// the title rule, build bounded history, flip `loading`, persist.
    /// Returns None when the send is rejected.
    pub fn begin_send(&mut self, question: &str) -> Option<PendingSend> {
        let question = question.trim();
        if question.is_empty() || self.loading {
            return None;
        }
        let conversation_id = self.state.active_id.clone();
        let ui_lang = self.ui_lang;
        let conversation = self.conversation_mut(&conversation_id)?;

        // History covers the turns before the message being sent now.
        let history = bounded_history(&conversation.messages);

        if conversation.title == NEW_CHAT_TITLE {
            conversation.title = truncate_title(question);
        }
        conversation.messages.push(Message::user(question));

        self.input.clear();
        self.loading = true;
        self.persist();
        Some(PendingSend {
            conversation_id,
            question: question.to_string(),
            ui_lang,
            history,
        })
    }

    /// Second half: append the normalized answer (or the fixed apology) to
    /// the conversation the send was issued from, drop `loading`, persist.
    pub fn finish_send(&mut self, pending: PendingSend, result: Result<Answer, QaError>) {
        let message = match result {
            Ok(Answer::Cards { text, cards }) => Message::AnswerCards {
                text,
                cards,
                lang: pending.ui_lang,
            },
            Ok(Answer::Sources { text, sources }) => Message::AnswerSources {
                text,
                sources,
                lang: pending.ui_lang,
            },
            Err(e) => {
                log::error!("ask failed: {}", e);
                Message::BotText {
                    text: SEND_ERROR_TEXT.to_string(),
                }
            }
        };
        if let Some(conversation) = self.conversation_mut(&pending.conversation_id) {
            conversation.messages.push(message);
        } else {
            log::warn!(
                "conversation {} gone before the answer arrived",
                pending.conversation_id
            );
        }
        self.loading = false;
        self.persist();
    }

    /// Read a message aloud, or stop if that message is already speaking.
    pub fn speak(&mut self, key: &str, message: &Message) -> Option<Notice> {
        if !self.synth.is_available() {
            return Some(Notice::VoiceOutputUnsupported);
        }
        if self.speaking_key.as_deref() == Some(key) {
            self.synth.cancel();
            self.speaking_key = None;
            return None;
        }
        let plain = text::strip_html(message.text());
        let plain = plain.trim();
        if plain.is_empty() {
            return None;
        }
        // English voice only for an English-mode answer with no Devanagari.
        let lang_tag = if message.lang() == Some(UiLang::En) && !text::has_devanagari(plain) {
            "en-IN"
        } else {
            "hi-IN"
        };
        self.synth.cancel();
        match self.synth.speak(plain, lang_tag) {
            Ok(()) => self.speaking_key = Some(key.to_string()),
            Err(e) => {
                log::error!("speech output failed: {}", e);
                self.speaking_key = None;
            }
        }
        None
    }

    /// Clear the speaking indicator once the utterance has ended naturally.
    pub fn poll_speech(&mut self) {
        if self.speaking_key.is_some() && self.synth.poll_finished() {
            self.speaking_key = None;
        }
    }

    /// Copy a message's plain text; shows the "copied" indicator for 1.5s.
    pub fn copy(
        &mut self,
        key: &str,
        message: &Message,
        clipboard: &mut dyn Clipboard,
        now: Instant,
    ) -> Option<Notice> {
        let plain = text::strip_html(message.text());
        let plain = plain.trim();
        if plain.is_empty() {
            return None;
        }
        match clipboard.set_text(plain) {
            Ok(()) => {
                self.copied_key = Some(key.to_string());
                self.copied_until = Some(now + COPIED_INDICATOR_TTL);
                None
            }
            Err(e) => {
                log::error!("copy failed: {}", e);
                Some(Notice::CopyFailed)
            }
        }
    }

    /// Expire the "copied" indicator.
    pub fn tick(&mut self, now: Instant) {
        if let Some(until) = self.copied_until {
            if now >= until {
                self.copied_key = None;
                self.copied_until = None;
            }
        }
    }

    /// Begin a speech-to-text session in the fixed locale.
    pub fn start_voice_input(&mut self, recognizer: &mut dyn SpeechRecognizer) -> Option<Notice> {
        if !recognizer.is_available() {
            return Some(Notice::VoiceInputUnsupported);
        }
        match recognizer.start(VOICE_INPUT_LOCALE) {
            Ok(()) => {
                self.listening = true;
                None
            }
            Err(e) => {
                log::error!("speech recognition failed to start: {}", e);
                self.listening = false;
                Some(Notice::MicError(e.to_string()))
            }
        }
    }

    /// Feed one recognizer event through the listening lifecycle.
    pub fn handle_recognizer_event(&mut self, event: RecognizerEvent) -> Option<Notice> {
        match event {
            RecognizerEvent::Transcript(transcript) => {
                if !transcript.is_empty() {
                    if self.input.is_empty() {
                        self.input = transcript;
                    } else {
                        self.input = format!("{} {}", self.input.trim_end(), transcript);
                    }
                }
                None
            }
            RecognizerEvent::End => {
                self.listening = false;
                None
            }
            RecognizerEvent::Error(e) => {
                log::error!("speech recognition error: {}", e);
                self.listening = false;
                Some(Notice::MicError(e))
            }
        }
    }

    fn conversation_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        self.state.conversations.iter_mut().find(|c| c.id == id)
    }

    fn clear_ephemeral(&mut self) {
        self.speaking_key = None;
        self.copied_key = None;
        self.copied_until = None;
        self.synth.cancel();
    }

    /// Best-effort mirror to disk; a failure is logged and never rolls back
    /// the in-memory transition that triggered it.
    fn persist(&self) {
        if let Err(e) = self.store.save(&self.state) {
            log::warn!("failed to save chats: {}", e);
        }
    }
}

/// The last few turns, reduced to role + plain text, for the backend.
fn bounded_history(messages: &[Message]) -> Vec<HistoryEntry> {
    let start = messages.len().saturating_sub(HISTORY_LIMIT);
    messages[start..]
        .iter()
        .map(|m| HistoryEntry {
            role: m.role(),
            content: text::strip_html(m.text()),
        })
        .collect()
}

fn truncate_title(question: &str) -> String {
    if question.chars().count() > TITLE_MAX_CHARS {
        let cut: String = question.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}...", cut)
    } else {
        question.to_string()
    }
}
