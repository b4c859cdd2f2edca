//! Q&A service HTTP client (http://127.0.0.1:8000 by default).
//! POST /ask with the question, UI language, and bounded plain-text history.

use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Client for the Q&A backend HTTP API.
#[derive(Clone)]
pub struct QaClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum QaError {
    #[error("ask request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("ask api error: {0}")]
    Api(String),
}

/// UI language, also sent on the wire as `ui_lang`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiLang {
    #[default]
    Hi,
    En,
}

impl UiLang {
    pub fn as_str(self) -> &'static str {
        match self {
            UiLang::Hi => "hi",
            UiLang::En => "en",
        }
    }
}

/// Role of a history entry sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One prior turn, reduced to plain text, for conversational context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

/// One result card in the new answer shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badges: Option<Vec<String>>,
}

/// One source reference in the legacy answer shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_hi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_en: Option<String>,
}

/// Normalized answer. The raw response shape is inspected exactly once, here;
/// downstream code only ever sees this tagged form.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    /// New shape: HTML-bearing message plus result cards.
    Cards { text: String, cards: Vec<Card> },
    /// Legacy shape: HTML-bearing response plus source references.
    Sources { text: String, sources: Vec<Source> },
}

#[derive(Debug, Serialize)]
struct AskRequest<'a> {
    question: &'a str,
    ui_lang: UiLang,
    mode: &'static str,
    history: &'a [HistoryEntry],
}

#[derive(Debug, Deserialize)]
struct RawAnswer {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    cards: Option<Vec<Card>>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    sources: Option<Vec<Source>>,
}

impl RawAnswer {
    /// New shape wins when `message` or `cards` is present; missing
    /// collections default to empty.
    fn normalize(self) -> Answer {
        if self.message.is_some() || self.cards.is_some() {
            Answer::Cards {
                text: self.message.unwrap_or_default(),
                cards: self.cards.unwrap_or_default(),
            }
        } else {
            Answer::Sources {
                text: self.response.unwrap_or_default(),
                sources: self.sources.unwrap_or_default(),
            }
        }
    }
}

impl QaClient {
    pub fn new(base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// POST /ask — one question with bounded history; returns the normalized answer.
    pub async fn ask(
        &self,
        question: &str,
        ui_lang: UiLang,
        history: &[HistoryEntry],
    ) -> Result<Answer, QaError> {
        let url = format!("{}/ask", self.base_url);
        let body = AskRequest {
            question,
            ui_lang,
            mode: "auto",
            history,
        };
        let res = self.client.post(&url).json(&body).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(QaError::Api(format!("{} {}", status, body)));
        }
        let data: RawAnswer = res.json().await?;
        Ok(data.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> RawAnswer {
        serde_json::from_str(json).expect("parse raw answer")
    }

    #[test]
    fn new_shape_normalizes_to_cards() {
        let answer = raw(r#"{"message": "<b>ok</b>", "cards": [{"title": "Pension"}]}"#).normalize();
        match answer {
            Answer::Cards { text, cards } => {
                assert_eq!(text, "<b>ok</b>");
                assert_eq!(cards.len(), 1);
                assert_eq!(cards[0].title, "Pension");
            }
            other => panic!("expected cards, got {:?}", other),
        }
    }

    #[test]
    fn cards_without_message_still_new_shape() {
        let answer = raw(r#"{"cards": []}"#).normalize();
        assert_eq!(
            answer,
            Answer::Cards {
                text: String::new(),
                cards: vec![],
            }
        );
    }

    #[test]
    fn legacy_shape_normalizes_to_sources() {
        let answer = raw(r#"{"response": "ok", "sources": [{"name_hi": "X"}]}"#).normalize();
        assert_eq!(
            answer,
            Answer::Sources {
                text: "ok".to_string(),
                sources: vec![Source {
                    name_hi: Some("X".to_string()),
                    name_en: None,
                }],
            }
        );
    }

    #[test]
    fn empty_response_defaults_to_empty_sources() {
        let answer = raw("{}").normalize();
        assert_eq!(
            answer,
            Answer::Sources {
                text: String::new(),
                sources: vec![],
            }
        );
    }

    #[test]
    fn ask_request_wire_format() {
        let history = vec![HistoryEntry {
            role: Role::Assistant,
            content: "hello".to_string(),
        }];
        let body = AskRequest {
            question: "pension?",
            ui_lang: UiLang::Hi,
            mode: "auto",
            history: &history,
        };
        let v: serde_json::Value = serde_json::to_value(&body).expect("serialize");
        assert_eq!(v["question"], "pension?");
        assert_eq!(v["ui_lang"], "hi");
        assert_eq!(v["mode"], "auto");
        assert_eq!(v["history"][0]["role"], "assistant");
        assert_eq!(v["history"][0]["content"], "hello");
    }
}
