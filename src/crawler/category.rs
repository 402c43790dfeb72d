//! Catalog payload types
//!
//! `CategoryNode` is the bootstrap tree; `CategoryInfo` is the part of the
//! per-category response we look at. Both are decoded with serde and are
//! immutable afterwards.

use serde::{Deserialize, Deserializer};

/// One node of the category tree returned by the menu endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryNode {
    pub id: i64,
    pub slug: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    /// Builds a leaf node
    pub fn leaf(id: i64, slug: impl Into<String>) -> Self {
        Self {
            id,
            slug: slug.into(),
            children: Vec::new(),
        }
    }

    /// Builds a node with the given children
    pub fn with_children(id: i64, slug: impl Into<String>, children: Vec<CategoryNode>) -> Self {
        Self {
            id,
            slug: slug.into(),
            children,
        }
    }

    /// Number of nodes in this subtree, including `self`
    pub fn subtree_size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

/// Total number of nodes reachable from `roots`
pub fn count_nodes(roots: &[CategoryNode]) -> usize {
    roots.iter().map(CategoryNode::subtree_size).sum()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<CategoryNode>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<CategoryNode>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decodes the menu endpoint payload (a JSON array of root categories)
///
/// Nesting depth is unlimited. The parser's recursion limit is off and the
/// stack grows on demand while decoding deep trees.
pub fn decode_categories(bytes: &[u8]) -> Result<Vec<CategoryNode>, serde_json::Error> {
    let mut json = serde_json::Deserializer::from_slice(bytes);
    json.disable_recursion_limit();
    let roots = Vec::<CategoryNode>::deserialize(serde_stacker::Deserializer::new(&mut json))?;
    json.end()?;
    Ok(roots)
}

/// Pagination block of a category response
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: Option<u32>,
    pub last_page: Option<u32>,
    pub path: Option<String>,
    pub per_page: Option<u32>,
    pub total: Option<u64>,
}

/// Per-category response body
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CategoryInfo {
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// Decodes a per-category response body
pub fn decode_category_info(bytes: &[u8]) -> Result<CategoryInfo, serde_json::Error> {
    serde_json::from_slice(bytes)
}
