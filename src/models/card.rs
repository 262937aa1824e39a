// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Business card record.

use crate::db::paths;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationError};

/// Document key holding the card name.
pub const CARD_NAME_KEY: &str = "cardName";

/// A named business card owned by a user.
///
/// Stored remotely at `/users/{uid}/cards/{cardName}`. Apart from the name,
/// cards carry whatever fields the app puts on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    #[validate(length(min = 1), custom(function = "validate_card_name"))]
    pub card_name: String,
    #[serde(flatten)]
    #[validate(custom(function = "validate_extra_fields"))]
    pub fields: Map<String, Value>,
}

fn validate_card_name(name: &str) -> std::result::Result<(), ValidationError> {
    match paths::segment_problem(name) {
        None => Ok(()),
        Some(problem) => Err(ValidationError::new("path_segment").with_message(problem.into())),
    }
}

fn validate_extra_fields(fields: &Map<String, Value>) -> std::result::Result<(), ValidationError> {
    if fields.contains_key(CARD_NAME_KEY) {
        return Err(ValidationError::new("reserved_key")
            .with_message("cardName is set through card_name only".into()));
    }
    Ok(())
}

impl CardRecord {
    pub fn new(card_name: impl Into<String>) -> Self {
        Self {
            card_name: card_name.into(),
            fields: Map::new(),
        }
    }

    /// Add an extra field. The name key is reserved and ignored here.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key == CARD_NAME_KEY {
            tracing::warn!(card_name = %self.card_name, "Ignoring extra cardName field");
            return self;
        }
        self.fields.insert(key, value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Flatten into the document shape written to the remote store.
    ///
    /// The name always comes from `card_name`, so the body matches the
    /// document path.
    pub fn to_fields(&self) -> Result<Map<String, Value>> {
        let mut map = self
            .fields
            .iter()
            .filter(|(key, _)| key.as_str() != CARD_NAME_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect::<Map<String, Value>>();
        map.insert(CARD_NAME_KEY.to_string(), Value::String(self.card_name.clone()));
        Ok(map)
    }

    /// Parse a document returned by the remote store.
    pub fn from_fields(fields: Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| AppError::Remote(format!("Malformed card document: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_flattens_extra_fields() {
        let card = CardRecord::new("work")
            .with_field("phone", "555-0100")
            .with_field("title", "Engineer");
        let fields = card.to_fields().unwrap();
        assert_eq!(fields["cardName"], "work");
        assert_eq!(fields["phone"], "555-0100");
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn test_card_from_document() {
        let mut doc = Map::new();
        doc.insert("cardName".into(), "home".into());
        doc.insert("email".into(), "me@home.net".into());
        let card = CardRecord::from_fields(doc).unwrap();
        assert_eq!(card.card_name, "home");
        assert_eq!(card.field("email"), Some(&Value::from("me@home.net")));
    }

    #[test]
    fn test_document_without_name_is_rejected() {
        let mut doc = Map::new();
        doc.insert("email".into(), "me@home.net".into());
        let err = CardRecord::from_fields(doc).unwrap_err();
        assert!(matches!(err, AppError::Remote(_)));
    }

    #[test]
    fn test_card_name_validation() {
        assert!(CardRecord::new("work").validate().is_ok());
        assert!(CardRecord::new("").validate().is_err());
        assert!(CardRecord::new("a/b").validate().is_err());
        assert!(CardRecord::new("..").validate().is_err());
    }

    #[test]
    fn test_extra_card_name_cannot_override_name() {
        let card = CardRecord::new("work").with_field("cardName", "home");
        assert!(card.fields.is_empty());
        assert_eq!(card.to_fields().unwrap()["cardName"], "work");

        let mut forced = CardRecord::new("work");
        forced.fields.insert("cardName".into(), "home".into());
        assert!(forced.validate().is_err());
        let fields = forced.to_fields().unwrap();
        assert_eq!(fields["cardName"], "work");
        assert_eq!(fields.len(), 1);
    }
}
