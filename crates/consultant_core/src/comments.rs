//! Comment tree construction and ordering.
//!
//! Comments arrive as a flat, parent-referencing list. The nested tree is a
//! derived structure: it is rebuilt from the flat source after every change,
//! never mutated in place.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// Depth past which replying is disabled. Rendering policy only; deeper
/// parent chains in the source data still build into the tree.
pub const REPLY_DEPTH_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Presence signals "edited".
    pub updated_at: Option<DateTime<Utc>>,
    /// Absence means root. An unresolvable reference is promoted to root.
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentNode {
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    OldestFirst,
    NewestFirst,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::OldestFirst => SortOrder::NewestFirst,
            SortOrder::NewestFirst => SortOrder::OldestFirst,
        }
    }
}

/// Builds the nested tree from a flat list in two passes.
///
/// Pass one maps id to entry, last-seen entry winning on duplicate ids. Pass
/// two attaches each entry to its parent's replies when `parent_id` resolves
/// within the set, otherwise the entry becomes a root. Self-references count
/// as unresolvable. Deterministic and O(n) in the input length.
pub fn build_comment_tree(comments: &[Comment]) -> Vec<CommentNode> {
    let mut last_index: HashMap<&str, usize> = HashMap::with_capacity(comments.len());
    for (index, comment) in comments.iter().enumerate() {
        last_index.insert(comment.id.as_str(), index);
    }

    // Indices that survived deduplication, in input order.
    let kept: Vec<usize> = comments
        .iter()
        .enumerate()
        .filter(|(index, comment)| last_index[comment.id.as_str()] == *index)
        .map(|(index, _)| index)
        .collect();

    let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut roots: Vec<usize> = Vec::new();
    for &index in &kept {
        let parent = comments[index]
            .parent_id
            .as_deref()
            .and_then(|parent_id| last_index.get(parent_id))
            .copied();
        match parent {
            Some(parent_index) if parent_index != index => {
                children.entry(parent_index).or_default().push(index);
            }
            _ => roots.push(index),
        }
    }

    roots
        .iter()
        .map(|&index| assemble(index, comments, &children))
        .collect()
}

fn assemble(
    index: usize,
    comments: &[Comment],
    children: &HashMap<usize, Vec<usize>>,
) -> CommentNode {
    let replies = children
        .get(&index)
        .map(|indices| {
            indices
                .iter()
                .map(|&child| assemble(child, comments, children))
                .collect()
        })
        .unwrap_or_default();
    CommentNode {
        comment: comments[index].clone(),
        replies,
    }
}

/// Recursively orders every level by `created_at`, with the id as a
/// deterministic tie-breaker. One global toggle covers all levels.
pub fn sort_comment_tree(nodes: &mut [CommentNode], order: SortOrder) {
    nodes.sort_by(|a, b| {
        let key_a = (a.comment.created_at, a.comment.id.as_str());
        let key_b = (b.comment.created_at, b.comment.id.as_str());
        match order {
            SortOrder::OldestFirst => key_a.cmp(&key_b),
            SortOrder::NewestFirst => key_b.cmp(&key_a),
        }
    });
    for node in nodes {
        sort_comment_tree(&mut node.replies, order);
    }
}

/// Pre-order traversal of the tree, yielding each contained id once.
pub fn flatten_ids(nodes: &[CommentNode]) -> Vec<String> {
    let mut ids = Vec::new();
    collect_ids(nodes, &mut ids);
    ids
}

fn collect_ids(nodes: &[CommentNode], ids: &mut Vec<String>) {
    for node in nodes {
        ids.push(node.comment.id.clone());
        collect_ids(&node.replies, ids);
    }
}

/// Depth of a comment measured by following resolvable parent references.
/// Roots are depth 0. Walks at most the collection length to stay safe
/// against malformed reference chains.
pub fn comment_depth(comments: &[Comment], id: &str) -> usize {
    let by_id: HashMap<&str, &Comment> = comments
        .iter()
        .map(|comment| (comment.id.as_str(), comment))
        .collect();
    let mut depth = 0;
    let mut current = by_id.get(id).copied();
    while let Some(comment) = current {
        match comment.parent_id.as_deref() {
            Some(parent_id) if parent_id != comment.id => {
                match by_id.get(parent_id) {
                    Some(parent) if depth < comments.len() => {
                        depth += 1;
                        current = Some(*parent);
                    }
                    _ => break,
                }
            }
            _ => break,
        }
    }
    depth
}
