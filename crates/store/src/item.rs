//! The repository-owned content model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use docflow_core::{ItemId, ItemKind, RepoStatus, UserId};

// ---------------------------------------------------------------------------
// ContentItem
// ---------------------------------------------------------------------------

/// A content item as the repository sees it.
///
/// The workflow never rewrites `slug`: it is the item's stable public
/// identity and survives fork merges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ItemId,
    pub kind: ItemKind,
    pub title: String,
    pub body: String,
    pub excerpt: String,
    pub slug: String,
    pub author: UserId,
    pub status: RepoStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// NewContentItem
// ---------------------------------------------------------------------------

/// Payload for creating an item. The repository assigns id, slug and
/// timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContentItem {
    pub kind: ItemKind,
    pub title: String,
    pub body: String,
    pub excerpt: String,
    pub author: UserId,
    pub status: RepoStatus,
}

/// Derive a URL-safe slug from a title: lowercase alphanumerics, runs of
/// anything else collapse to a single hyphen.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Sample Method"), "sample-method");
        assert_eq!(slugify("Sample Method - Revision v1.1"), "sample-method-revision-v1-1");
    }

    #[test]
    fn slugify_collapses_and_trims_separators() {
        assert_eq!(slugify("  A --- B  "), "a-b");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify("Ünïcode Title"), "n-code-title");
    }
}
