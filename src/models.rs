// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Secret Record Models
//!
//! Value types shared by the local agent, the sync protocol and the remote
//! service. The storage layer treats every record as an opaque serialized
//! payload; only the identifier is interpreted.
//!
//! ## Record Kinds
//!
//! - **Text**: free-form notes
//! - **Binary**: arbitrary blobs (base64 on the wire)
//! - **Credential**: login/password pairs
//! - **Card**: payment card details
//!
//! Each kind implements [`Record`], which lets one generic repository serve
//! all four.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Record Kind
// =============================================================================

/// Discriminates the four record collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Text,
    Binary,
    Credential,
    Card,
}

impl RecordKind {
    /// Every kind, in sync order.
    pub const ALL: [RecordKind; 4] = [
        RecordKind::Text,
        RecordKind::Binary,
        RecordKind::Credential,
        RecordKind::Card,
    ];

    /// Stable lowercase name used in table names and URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Text => "text",
            RecordKind::Binary => "binary",
            RecordKind::Credential => "credential",
            RecordKind::Card => "card",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a record kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown record kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for RecordKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

// =============================================================================
// Record Trait
// =============================================================================

/// A secret record that can be stored, synced and sent over the wire.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection this record belongs to.
    const KIND: RecordKind;

    fn id(&self) -> Uuid;

    fn set_id(&mut self, id: Uuid);

    fn into_any(self) -> AnyRecord;

    /// `None` when `record` holds another kind.
    fn from_any(record: AnyRecord) -> Option<Self>;

    fn into_batch(records: Vec<Self>) -> RecordBatch;

    /// `None` when `batch` holds another kind.
    fn from_batch(batch: RecordBatch) -> Option<Vec<Self>>;
}

macro_rules! impl_record {
    ($ty:ty, $kind:ident, $variant:ident, $batch:ident) => {
        impl Record for $ty {
            const KIND: RecordKind = RecordKind::$kind;

            fn id(&self) -> Uuid {
                self.id
            }

            fn set_id(&mut self, id: Uuid) {
                self.id = id;
            }

            fn into_any(self) -> AnyRecord {
                AnyRecord::$variant(self)
            }

            fn from_any(record: AnyRecord) -> Option<Self> {
                match record {
                    AnyRecord::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn into_batch(records: Vec<Self>) -> RecordBatch {
                RecordBatch::$batch(records)
            }

            fn from_batch(batch: RecordBatch) -> Option<Vec<Self>> {
                match batch {
                    RecordBatch::$batch(records) => Some(records),
                    _ => None,
                }
            }
        }
    };
}

// =============================================================================
// Record Types
// =============================================================================

/// Free-form text secret.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextRecord {
    pub id: Uuid,
    pub name: String,
    pub text: String,
    #[serde(default)]
    pub meta: String,
}

/// Arbitrary binary secret.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BinaryRecord {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    #[serde(default)]
    pub meta: String,
}

/// Login/password pair for some site or service.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialRecord {
    pub id: Uuid,
    pub name: String,
    pub login: String,
    pub password: String,
    #[serde(default)]
    pub meta: String,
}

/// Payment card details.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardRecord {
    pub id: Uuid,
    pub number: String,
    pub valid_thru: String,
    pub cvv: String,
    pub holder: String,
    #[serde(default)]
    pub meta: String,
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .field("meta", &self.meta)
            .finish()
    }
}

impl fmt::Debug for CardRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Keep only the last four digits of the card number.
        let tail: String = self
            .number
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        f.debug_struct("CardRecord")
            .field("id", &self.id)
            .field("number", &format!("****{tail}"))
            .field("valid_thru", &self.valid_thru)
            .field("cvv", &"<redacted>")
            .field("holder", &self.holder)
            .field("meta", &self.meta)
            .finish()
    }
}

impl_record!(TextRecord, Text, Text, Texts);
impl_record!(BinaryRecord, Binary, Binary, Binaries);
impl_record!(CredentialRecord, Credential, Credential, Credentials);
impl_record!(CardRecord, Card, Card, Cards);

// =============================================================================
// Wire Envelopes
// =============================================================================

/// One record of any kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum AnyRecord {
    Text(TextRecord),
    Binary(BinaryRecord),
    Credential(CredentialRecord),
    Card(CardRecord),
}

impl AnyRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            AnyRecord::Text(_) => RecordKind::Text,
            AnyRecord::Binary(_) => RecordKind::Binary,
            AnyRecord::Credential(_) => RecordKind::Credential,
            AnyRecord::Card(_) => RecordKind::Card,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            AnyRecord::Text(r) => r.id,
            AnyRecord::Binary(r) => r.id,
            AnyRecord::Credential(r) => r.id,
            AnyRecord::Card(r) => r.id,
        }
    }

    pub fn set_id(&mut self, id: Uuid) {
        match self {
            AnyRecord::Text(r) => r.id = id,
            AnyRecord::Binary(r) => r.id = id,
            AnyRecord::Credential(r) => r.id = id,
            AnyRecord::Card(r) => r.id = id,
        }
    }
}

/// Every record of a single kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "records", rename_all = "snake_case")]
pub enum RecordBatch {
    #[serde(rename = "text")]
    Texts(Vec<TextRecord>),
    #[serde(rename = "binary")]
    Binaries(Vec<BinaryRecord>),
    #[serde(rename = "credential")]
    Credentials(Vec<CredentialRecord>),
    #[serde(rename = "card")]
    Cards(Vec<CardRecord>),
}

impl RecordBatch {
    pub fn kind(&self) -> RecordKind {
        match self {
            RecordBatch::Texts(_) => RecordKind::Text,
            RecordBatch::Binaries(_) => RecordKind::Binary,
            RecordBatch::Credentials(_) => RecordKind::Credential,
            RecordBatch::Cards(_) => RecordKind::Card,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RecordBatch::Texts(r) => r.len(),
            RecordBatch::Binaries(r) => r.len(),
            RecordBatch::Credentials(r) => r.len(),
            RecordBatch::Cards(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Full remote state of one user: all four kinds at once.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    pub texts: Vec<TextRecord>,
    pub binaries: Vec<BinaryRecord>,
    pub credentials: Vec<CredentialRecord>,
    pub cards: Vec<CardRecord>,
}

impl Snapshot {
    /// Place `batch` into the matching field, replacing what was there.
    pub fn insert(&mut self, batch: RecordBatch) {
        match batch {
            RecordBatch::Texts(r) => self.texts = r,
            RecordBatch::Binaries(r) => self.binaries = r,
            RecordBatch::Credentials(r) => self.credentials = r,
            RecordBatch::Cards(r) => self.cards = r,
        }
    }

    /// Copy of the records of `kind`.
    pub fn batch(&self, kind: RecordKind) -> RecordBatch {
        match kind {
            RecordKind::Text => RecordBatch::Texts(self.texts.clone()),
            RecordKind::Binary => RecordBatch::Binaries(self.binaries.clone()),
            RecordKind::Credential => RecordBatch::Credentials(self.credentials.clone()),
            RecordKind::Card => RecordBatch::Cards(self.cards.clone()),
        }
    }
}

// =============================================================================
// Session & Auth Payloads
// =============================================================================

/// Authenticated principal as cached by the local agent.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub token: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Login or registration request body.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Bearer token returned by login and registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Identifier assigned to a newly created record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatedResponse {
    pub id: Uuid,
}

/// Serde adapter that encodes bytes as standard base64 strings.
mod base64_bytes {
    use base64ct::{Base64, Encoding};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&Base64::encode_string(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Base64::decode_vec(&encoded).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential() -> CredentialRecord {
        CredentialRecord {
            id: Uuid::new_v4(),
            name: "site".into(),
            login: "bob".into(),
            password: "pw".into(),
            meta: String::new(),
        }
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in RecordKind::ALL {
            assert_eq!(kind.as_str().parse::<RecordKind>().unwrap(), kind);
        }
        assert!("wallet".parse::<RecordKind>().is_err());
    }

    #[test]
    fn any_record_is_tagged_by_kind() {
        let record = credential();
        let json = serde_json::to_value(record.clone().into_any()).unwrap();
        assert_eq!(json["kind"], "credential");
        assert_eq!(json["record"]["login"], "bob");

        let back: AnyRecord = serde_json::from_value(json).unwrap();
        assert_eq!(CredentialRecord::from_any(back), Some(record));
    }

    #[test]
    fn batch_conversion_rejects_other_kinds() {
        let batch = CredentialRecord::into_batch(vec![credential()]);
        assert_eq!(batch.kind(), RecordKind::Credential);
        assert_eq!(serde_json::to_value(&batch).unwrap()["kind"], "credential");
        assert!(TextRecord::from_batch(batch.clone()).is_none());
        assert_eq!(CredentialRecord::from_batch(batch).unwrap().len(), 1);
    }

    #[test]
    fn binary_data_is_base64_on_the_wire() {
        let record = BinaryRecord {
            id: Uuid::nil(),
            name: "blob".into(),
            data: vec![0, 1, 2, 250],
            meta: String::new(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["data"], "AAEC+g==");
        let back: BinaryRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn debug_output_hides_secrets() {
        let rendered = format!("{:?}", credential());
        assert!(!rendered.contains("\"pw\""));

        let card = CardRecord {
            id: Uuid::nil(),
            number: "4111111111111111".into(),
            valid_thru: "12/30".into(),
            cvv: "123".into(),
            holder: "BOB".into(),
            meta: String::new(),
        };
        let rendered = format!("{card:?}");
        assert!(rendered.contains("****1111"));
        assert!(!rendered.contains("123\""));
    }
}
