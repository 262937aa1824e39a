// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Validated remote-store paths.
//!
//! Every identifier that ends up in a path goes through [`validate_segment`]
//! first, so a user id or card name can never address a different document.

use crate::db::collections;
use crate::error::{AppError, Result};
use std::fmt;

/// Firestore limit on a single document id, in bytes.
const MAX_SEGMENT_BYTES: usize = 1500;

/// Path to a single document: alternating collection and document ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath {
    segments: Vec<String>,
}

/// Path to a collection: document path plus one trailing collection id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    segments: Vec<String>,
}

/// Describe why `segment` is not usable as a path component.
pub fn segment_problem(segment: &str) -> Option<&'static str> {
    if segment.is_empty() {
        return Some("segment is empty");
    }
    if segment.contains('/') {
        return Some("segment contains '/'");
    }
    if segment == "." || segment == ".." {
        return Some("segment is a relative path component");
    }
    if segment.chars().any(char::is_control) {
        return Some("segment contains control characters");
    }
    if segment.len() >= 4 && segment.starts_with("__") && segment.ends_with("__") {
        return Some("segment uses the reserved __name__ form");
    }
    if segment.len() > MAX_SEGMENT_BYTES {
        return Some("segment is too long");
    }
    None
}

/// Check a single path component.
pub fn validate_segment(segment: &str) -> Result<()> {
    match segment_problem(segment) {
        None => Ok(()),
        Some(problem) => Err(AppError::InvalidPath(format!("{:?}: {}", segment, problem))),
    }
}

/// `/users/{uid}`
pub fn user_doc(uid: &str) -> Result<DocPath> {
    validate_segment(uid)?;
    Ok(DocPath {
        segments: vec![collections::USERS.to_string(), uid.to_string()],
    })
}

/// `/users/{uid}/cards`
pub fn cards_collection(uid: &str) -> Result<CollectionPath> {
    Ok(user_doc(uid)?.collection(collections::CARDS))
}

/// `/users/{uid}/cards/{card_name}`
pub fn card_doc(uid: &str, card_name: &str) -> Result<DocPath> {
    cards_collection(uid)?.doc(card_name)
}

impl DocPath {
    /// Collection containing this document.
    pub fn collection_id(&self) -> &str {
        &self.segments[self.segments.len() - 2]
    }

    pub fn document_id(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    /// (collection, document) pairs of the ancestors, outermost first.
    pub fn ancestors(&self) -> Vec<(&str, &str)> {
        pairs(&self.segments[..self.segments.len() - 2])
    }

    fn collection(&self, id: &str) -> CollectionPath {
        let mut segments = self.segments.clone();
        segments.push(id.to_string());
        CollectionPath { segments }
    }
}

impl CollectionPath {
    pub fn collection_id(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    pub fn ancestors(&self) -> Vec<(&str, &str)> {
        pairs(&self.segments[..self.segments.len() - 1])
    }

    /// Document `id` inside this collection.
    pub fn doc(&self, id: &str) -> Result<DocPath> {
        validate_segment(id)?;
        let mut segments = self.segments.clone();
        segments.push(id.to_string());
        Ok(DocPath { segments })
    }
}

fn pairs(segments: &[String]) -> Vec<(&str, &str)> {
    segments
        .chunks_exact(2)
        .map(|pair| (pair[0].as_str(), pair[1].as_str()))
        .collect()
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_render() {
        assert_eq!(user_doc("u1").unwrap().to_string(), "/users/u1");
        assert_eq!(cards_collection("u1").unwrap().to_string(), "/users/u1/cards");
        assert_eq!(
            card_doc("u1", "work").unwrap().to_string(),
            "/users/u1/cards/work"
        );
    }

    #[test]
    fn test_path_parts() {
        let doc = card_doc("u1", "work").unwrap();
        assert_eq!(doc.collection_id(), "cards");
        assert_eq!(doc.document_id(), "work");
        assert_eq!(doc.ancestors(), vec![("users", "u1")]);

        let root = user_doc("u1").unwrap();
        assert!(root.ancestors().is_empty());

        let col = cards_collection("u1").unwrap();
        assert_eq!(col.collection_id(), "cards");
        assert_eq!(col.ancestors(), vec![("users", "u1")]);
    }

    #[test]
    fn test_rejects_unsafe_segments() {
        assert!(matches!(user_doc(""), Err(AppError::InvalidPath(_))));
        assert!(matches!(user_doc("a/b"), Err(AppError::InvalidPath(_))));
        assert!(card_doc("u1", "..").is_err());
        assert!(card_doc("u1", "__name__").is_err());
        assert!(card_doc("u1", "line\nbreak").is_err());
        assert!(card_doc("u1", &"x".repeat(MAX_SEGMENT_BYTES + 1)).is_err());
    }

    #[test]
    fn test_accepts_ordinary_names() {
        assert!(card_doc("u1", "My Card").is_ok());
        assert!(card_doc("u1", "__").is_ok());
        assert!(card_doc("u1", "名刺").is_ok());
    }
}
