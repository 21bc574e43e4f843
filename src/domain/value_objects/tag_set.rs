use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Party size used when no `size` tag is selected
pub const DEFAULT_PARTY_SIZE: u32 = 4;
/// Smallest party that can be matched
pub const MIN_PARTY_SIZE: u32 = 2;
/// Largest party that can be matched
pub const MAX_PARTY_SIZE: u32 = 16;

/// Category of the tag that carries the party capacity
pub const SIZE_CATEGORY: &str = "size";

/// A user-selectable play preference (game mode, skill level, party size...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub category: String,
    /// Lower values sort first
    #[serde(default)]
    pub priority: i32,
    /// Party capacity, only meaningful for the `size` category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

impl Tag {
    pub fn is_size(&self) -> bool {
        self.category == SIZE_CATEGORY
    }
}

/// Ordered, deduplicated set of tags used as a matchmaking key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSet {
    tags: Vec<Tag>,
    max_size: u32,
}

impl TagSet {
    pub fn new(tags: Vec<Tag>) -> Result<Self, TagSetError> {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(tags.len());
        for tag in tags {
            if tag.id.trim().is_empty() {
                return Err(TagSetError::EmptyTagId);
            }
            if seen.insert(tag.id.clone()) {
                unique.push(tag);
            }
        }

        unique.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));

        let mut size_tags = unique.iter().filter(|t| t.is_size());
        let max_size = match (size_tags.next(), size_tags.next()) {
            (None, _) => DEFAULT_PARTY_SIZE,
            (Some(_), Some(_)) => return Err(TagSetError::MultipleSizeTags),
            (Some(tag), None) => {
                let size = tag
                    .size
                    .ok_or_else(|| TagSetError::MissingSize(tag.id.clone()))?;
                if !(MIN_PARTY_SIZE..=MAX_PARTY_SIZE).contains(&size) {
                    return Err(TagSetError::SizeOutOfRange(size));
                }
                size
            }
        };

        Ok(Self {
            tags: unique,
            max_size,
        })
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn into_tags(self) -> Vec<Tag> {
        self.tags
    }

    /// Tag ids in priority order
    pub fn tag_ids(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.id.clone()).collect()
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TagSetError {
    #[error("Tag id must not be empty")]
    EmptyTagId,
    #[error("Only one size tag can be selected")]
    MultipleSizeTags,
    #[error("Size tag {0} has no size")]
    MissingSize(String),
    #[error("Party size must be between 2 and 16, got {0}")]
    SizeOutOfRange(u32),
}
