//! Leaderboard
//!
//! A local top-N board persisted to LocalStorage, plus a Firestore REST
//! client for the shared board on wasm. Both sort descending by score.
//! Failures never touch game state; the caller turns them into a HUD
//! message.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::consts::LEADERBOARD_SIZE;

/// Placeholder city until a location source exists
pub const UNKNOWN_CITY: &str = "Unknown";

/// Errors from saving or loading scores
#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("storage is unavailable")]
    StorageUnavailable,
    #[error("could not encode scores: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("network request failed: {0}")]
    Network(String),
    #[error("leaderboard service returned HTTP {0}")]
    Status(u16),
    #[error("unexpected leaderboard response: {0}")]
    Decode(String),
}

/// A single leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub initials: String,
    pub city: String,
    pub score: u64,
    /// Unix timestamp (ms) when submitted
    pub timestamp: f64,
}

impl LeaderboardEntry {
    /// Build an entry for `email`, deriving the public identity from it
    pub fn for_email(email: &str, score: u64, timestamp: f64) -> Self {
        Self {
            initials: initials_from_email(email),
            city: city_from_email(email),
            score,
            timestamp,
        }
    }

    /// "AB (City)" as shown in the list
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.initials, self.city)
    }
}

/// Initials from the user part of an email address.
///
/// Splits on `.`, then `_`, then on capitalised words ("JaneDoe"); one
/// letter per part. Anything that does not split falls back to the first
/// three characters.
pub fn initials_from_email(email: &str) -> String {
    let user = email.split('@').next().unwrap_or_default();

    let parts: Vec<&str> = if user.contains('.') {
        user.split('.').collect()
    } else if user.contains('_') {
        user.split('_').collect()
    } else {
        capitalised_words(user)
    };

    if parts.len() <= 1 {
        return user.chars().take(3).collect::<String>().to_uppercase();
    }
    parts
        .iter()
        .filter_map(|part| part.chars().next())
        .collect::<String>()
        .to_uppercase()
}

/// One uppercase ASCII letter followed by lowercase letters
static CAPITALISED_WORD: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new("[A-Z][a-z]+").ok());

fn capitalised_words(s: &str) -> Vec<&str> {
    match CAPITALISED_WORD.as_ref() {
        Some(re) => re.find_iter(s).map(|m| m.as_str()).collect(),
        None => Vec::new(),
    }
}

/// City shown next to the initials. No lookup exists yet.
pub fn city_from_email(_email: &str) -> String {
    UNKNOWN_CITY.to_string()
}

/// Storage for submitted scores
pub trait ScoreStore {
    /// Record a score
    fn submit(&mut self, entry: LeaderboardEntry) -> Result<(), LeaderboardError>;
    /// Best `n` scores, highest first
    fn top(&self, n: usize) -> Result<Vec<LeaderboardEntry>, LeaderboardError>;
}

/// Top-N board kept on this device
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LocalLeaderboard {
    pub entries: Vec<LeaderboardEntry>,
}

impl LocalLeaderboard {
    /// LocalStorage key (used only in wasm32)
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    const STORAGE_KEY: &'static str = "cookie_dunk_leaderboard";

    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Check if a score would make the board
    pub fn qualifies(&self, score: u64) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < LEADERBOARD_SIZE {
            return true;
        }
        self.entries.last().is_none_or(|e| score > e.score)
    }

    /// Insert in rank order. Returns the 1-indexed rank, or None if it did not qualify.
    pub fn add(&mut self, entry: LeaderboardEntry) -> Option<usize> {
        if !self.qualifies(entry.score) {
            return None;
        }
        let pos = self
            .entries
            .iter()
            .position(|e| entry.score > e.score)
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, entry);
        self.entries.truncate(LEADERBOARD_SIZE);
        Some(pos + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    /// Load the board from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let stored = crate::platform::web::local_storage()
            .and_then(|storage| storage.get_item(Self::STORAGE_KEY).ok().flatten());

        if let Some(json) = stored {
            match serde_json::from_str::<LocalLeaderboard>(&json) {
                Ok(board) => {
                    log::info!("Loaded {} leaderboard entries", board.entries.len());
                    return board;
                }
                Err(e) => log::warn!("Discarding unreadable leaderboard: {e}"),
            }
        }

        log::info!("No leaderboard found, starting fresh");
        Self::new()
    }

    /// Save the board to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) -> Result<(), LeaderboardError> {
        let storage =
            crate::platform::web::local_storage().ok_or(LeaderboardError::StorageUnavailable)?;
        let json = serde_json::to_string(self)?;
        storage
            .set_item(Self::STORAGE_KEY, &json)
            .map_err(|_| LeaderboardError::StorageUnavailable)?;
        log::info!("Leaderboard saved ({} entries)", self.entries.len());
        Ok(())
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::new()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) -> Result<(), LeaderboardError> {
        Ok(())
    }
}

impl ScoreStore for LocalLeaderboard {
    fn submit(&mut self, entry: LeaderboardEntry) -> Result<(), LeaderboardError> {
        if let Some(rank) = self.add(entry) {
            log::info!("New local rank #{rank}");
            self.save()?;
        }
        Ok(())
    }

    fn top(&self, n: usize) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        Ok(self.entries.iter().take(n).cloned().collect())
    }
}

// === Firestore REST encoding ===

/// Firestore document body for one entry
pub fn encode_document(entry: &LeaderboardEntry) -> Value {
    json!({
        "fields": {
            "initials": { "stringValue": entry.initials },
            "city": { "stringValue": entry.city },
            "score": { "integerValue": entry.score.to_string() },
            "timestamp": { "doubleValue": entry.timestamp },
        }
    })
}

/// `runQuery` body for the top `limit` scores
pub fn top_scores_query(limit: usize) -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": "scores" }],
            "orderBy": [{ "field": { "fieldPath": "score" }, "direction": "DESCENDING" }],
            "limit": limit,
        }
    })
}

/// Parse a `runQuery` response into entries, keeping server order
pub fn decode_query_response(body: &str) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
    let rows: Vec<Value> =
        serde_json::from_str(body).map_err(|e| LeaderboardError::Decode(e.to_string()))?;

    // Rows without a document mark an empty result
    rows.iter()
        .filter_map(|row| row.get("document"))
        .map(decode_document)
        .collect()
}

fn decode_document(doc: &Value) -> Result<LeaderboardEntry, LeaderboardError> {
    let fields = doc
        .get("fields")
        .ok_or_else(|| LeaderboardError::Decode("document without fields".into()))?;

    let string = |name: &str| {
        fields
            .pointer(&format!("/{name}/stringValue"))
            .and_then(Value::as_str)
            .map(str::to_owned)
    };
    let score = fields
        .pointer("/score/integerValue")
        .and_then(|v| match v {
            Value::String(s) => s.parse().ok(),
            other => other.as_u64(),
        })
        .ok_or_else(|| LeaderboardError::Decode("score missing".into()))?;
    let timestamp = fields
        .pointer("/timestamp/doubleValue")
        .and_then(Value::as_f64)
        .unwrap_or_default();

    Ok(LeaderboardEntry {
        initials: string("initials").unwrap_or_else(|| "???".into()),
        city: string("city").unwrap_or_else(|| UNKNOWN_CITY.into()),
        score,
        timestamp,
    })
}

/// Shared board on Firestore, over its REST API
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone)]
pub struct FirestoreClient {
    pub project_id: String,
    pub api_key: String,
}

#[cfg(target_arch = "wasm32")]
impl FirestoreClient {
    fn documents_url(&self) -> String {
        format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/(default)/documents",
            self.project_id
        )
    }

    /// Append a score document
    pub async fn submit(&self, entry: &LeaderboardEntry) -> Result<(), LeaderboardError> {
        let url = format!("{}/scores?key={}", self.documents_url(), self.api_key);
        self.post(&url, &encode_document(entry)).await?;
        log::info!("Score {} submitted", entry.score);
        Ok(())
    }

    /// Best `n` scores, highest first
    pub async fn top(&self, n: usize) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        let url = format!("{}:runQuery?key={}", self.documents_url(), self.api_key);
        let body = self.post(&url, &top_scores_query(n)).await?;
        let entries = decode_query_response(&body)?;
        log::info!("Loaded {} leaderboard entries", entries.len());
        Ok(entries)
    }

    async fn post(&self, url: &str, body: &Value) -> Result<String, LeaderboardError> {
        use wasm_bindgen::{JsCast, JsValue};
        use wasm_bindgen_futures::JsFuture;
        use web_sys::{Request, RequestInit, RequestMode, Response};

        let net = |e: JsValue| LeaderboardError::Network(format!("{e:?}"));

        let init = RequestInit::new();
        init.set_method("POST");
        init.set_mode(RequestMode::Cors);
        init.set_body(&JsValue::from_str(&body.to_string()));

        let request = Request::new_with_str_and_init(url, &init).map_err(net)?;
        request
            .headers()
            .set("Content-Type", "application/json")
            .map_err(net)?;

        let window = web_sys::window().ok_or(LeaderboardError::StorageUnavailable)?;
        let response: Response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(net)?
            .dyn_into()
            .map_err(net)?;
        if !response.ok() {
            return Err(LeaderboardError::Status(response.status()));
        }

        let text = JsFuture::from(response.text().map_err(net)?)
            .await
            .map_err(net)?;
        text.as_string()
            .ok_or_else(|| LeaderboardError::Decode("response body is not text".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(score: u64) -> LeaderboardEntry {
        LeaderboardEntry {
            initials: "AB".into(),
            city: UNKNOWN_CITY.into(),
            score,
            timestamp: 0.0,
        }
    }

    #[test]
    fn test_initials() {
        assert_eq!(initials_from_email("jane.doe@example.com"), "JD");
        assert_eq!(initials_from_email("jane_q_public@example.com"), "JQP");
        assert_eq!(initials_from_email("JaneDoe@example.com"), "JD");
        assert_eq!(initials_from_email("cookie@example.com"), "COO");
        assert_eq!(initials_from_email("al@example.com"), "AL");
        assert_eq!(initials_from_email("Jane@example.com"), "JAN");
    }

    #[test]
    fn test_capitalised_words() {
        assert_eq!(capitalised_words("JaneQPublic"), vec!["Jane", "Public"]);
        assert_eq!(capitalised_words("xxMilkDunker99"), vec!["Milk", "Dunker"]);
        assert!(capitalised_words("ÉmileZola").contains(&"Zola"));
        assert!(capitalised_words("lowercase").is_empty());
        assert_eq!(initials_from_email("MilkDunker99@example.com"), "MD");
    }

    #[test]
    fn test_city_placeholder() {
        assert_eq!(city_from_email("x@gmail.com"), "Unknown");
        let e = LeaderboardEntry::for_email("jane.doe@gmail.com", 10, 1.0);
        assert_eq!(e.display_name(), "JD (Unknown)");
    }

    #[test]
    fn test_sorted_descending() {
        let mut board = LocalLeaderboard::new();
        assert_eq!(board.add(entry(10)), Some(1));
        assert_eq!(board.add(entry(30)), Some(1));
        assert_eq!(board.add(entry(20)), Some(2));
        let scores: Vec<u64> = board.entries.iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![30, 20, 10]);
        assert_eq!(board.top_score(), Some(30));
    }

    #[test]
    fn test_zero_never_qualifies() {
        let mut board = LocalLeaderboard::new();
        assert_eq!(board.add(entry(0)), None);
        assert!(board.is_empty());
    }

    #[test]
    fn test_board_is_capped() {
        let mut board = LocalLeaderboard::new();
        for score in 1..=(LEADERBOARD_SIZE as u64 + 5) {
            board.add(entry(score));
        }
        assert_eq!(board.entries.len(), LEADERBOARD_SIZE);
        assert!(!board.qualifies(5));
        assert_eq!(board.entries.last().map(|e| e.score), Some(6));
    }

    #[test]
    fn test_store_top_n() {
        let mut board = LocalLeaderboard::new();
        for score in [5, 50, 15] {
            board.submit(entry(score)).unwrap();
        }
        let top = board.top(2).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].score, 50);
        assert_eq!(top[1].score, 15);
    }

    #[test]
    fn test_firestore_document_shape() {
        let doc = encode_document(&entry(42));
        assert_eq!(doc["fields"]["score"]["integerValue"], "42");
        assert_eq!(doc["fields"]["initials"]["stringValue"], "AB");
        assert_eq!(top_scores_query(25)["structuredQuery"]["limit"], 25);
    }

    #[test]
    fn test_decode_query_response() {
        let body = r#"[
            {"document": {"fields": {
                "initials": {"stringValue": "JD"},
                "city": {"stringValue": "Unknown"},
                "score": {"integerValue": "120"},
                "timestamp": {"doubleValue": 1.5}
            }}},
            {"document": {"fields": {
                "initials": {"stringValue": "QQ"},
                "score": {"integerValue": "90"}
            }}}
        ]"#;
        let entries = decode_query_response(body).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].score, 120);
        assert_eq!(entries[1].city, UNKNOWN_CITY);
        assert_eq!(entries[1].timestamp, 0.0);
    }

    #[test]
    fn test_decode_empty_result() {
        let body = r#"[{"readTime": "2024-01-01T00:00:00Z"}]"#;
        assert!(decode_query_response(body).unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_missing_score() {
        let body = r#"[{"document": {"fields": {"initials": {"stringValue": "JD"}}}}]"#;
        assert!(matches!(
            decode_query_response(body),
            Err(LeaderboardError::Decode(_))
        ));
    }
}
