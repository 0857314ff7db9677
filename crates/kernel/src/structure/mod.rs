//! Course structure engine.
//!
//! Courses order their topics as a two-level hierarchy. Clients submit and
//! receive the structure as a nested JSON sequence; persistence is a flat
//! list of indexed entries. This module owns the index type, the wire
//! representation, and the reconciler that keeps both in sync.

mod index;
mod reconciler;

pub use index::StructureIndex;
pub use reconciler::{apply, to_nested, validate_topics};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::StructureEntryRow;

/// Structure engine errors.
#[derive(Debug, Error)]
pub enum StructureError {
    /// A structure index string did not parse.
    #[error("malformed structure index: {0:?}")]
    MalformedIndex(String),

    /// The submitted tree references topics that do not exist.
    #[error("unknown topic ids: {}", join_ids(.0))]
    UnknownTopics(Vec<i64>),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// One node of the nested wire representation.
///
/// `children` is absent for "no sub-topics"; when serializing, the key is
/// present only if more than one entry occupies the node's main position.
/// That asymmetry is part of the wire format; callers must treat absence
/// as empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicNode {
    /// Topic display string.
    pub value: String,

    /// Topic ID; must reference an existing topic on submission.
    pub id: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TopicNode>>,
}

impl TopicNode {
    /// Leaf node without children.
    pub fn leaf(value: impl Into<String>, id: i64) -> Self {
        Self {
            value: value.into(),
            id,
            children: None,
        }
    }

    /// Node with children.
    pub fn with_children(value: impl Into<String>, id: i64, children: Vec<TopicNode>) -> Self {
        Self {
            value: value.into(),
            id,
            children: Some(children),
        }
    }
}

/// Every topic ID referenced by a tree, mains first, depth-first.
pub fn referenced_ids(tree: &[TopicNode]) -> Vec<i64> {
    let mut ids = Vec::new();
    for node in tree {
        ids.push(node.id);
        for child in node.children.iter().flatten() {
            ids.push(child.id);
        }
    }
    ids
}

/// Flatten a nested tree into (index, topic id) pairs with dense 1-based
/// numbering, in depth-first order. Nesting below the second level is
/// ignored; the structure is two levels deep by contract.
pub fn plan(tree: &[TopicNode]) -> Vec<(StructureIndex, i64)> {
    let mut slots = Vec::new();
    for (i, node) in tree.iter().enumerate() {
        let main = i as u32 + 1;
        slots.push((StructureIndex::main(main), node.id));
        for (j, child) in node.children.iter().flatten().enumerate() {
            slots.push((StructureIndex::sub(main, j as u32 + 1), child.id));
        }
    }
    slots
}

/// Group flat entry rows (ordered by index) back into the nested wire form.
///
/// A main entry gets a `children` key only if more than one entry shares
/// its main position; a lone main topic never carries an empty list.
pub fn group_rows(rows: &[StructureEntryRow]) -> Vec<TopicNode> {
    let mut nested: Vec<TopicNode> = Vec::new();

    for row in rows {
        let value = format!("{} ({})", row.topic_title, row.category_title);
        if row.sub_position == 0 {
            let has_subs = rows
                .iter()
                .filter(|other| other.position == row.position)
                .count()
                > 1;
            nested.push(if has_subs {
                TopicNode::with_children(value, row.topic_id, Vec::new())
            } else {
                TopicNode::leaf(value, row.topic_id)
            });
        } else if let Some(children) = nested.last_mut().and_then(|node| node.children.as_mut()) {
            children.push(TopicNode::leaf(value, row.topic_id));
        }
    }

    nested
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn row(topic_id: i64, position: i32, sub_position: i32) -> StructureEntryRow {
        StructureEntryRow {
            topic_id,
            position,
            sub_position,
            topic_title: format!("Topic {topic_id}"),
            category_title: "Math".to_string(),
        }
    }

    #[test]
    fn plan_assigns_dense_indexes() {
        let tree = vec![
            TopicNode::leaf("A", 2),
            TopicNode::with_children("B", 3, vec![TopicNode::leaf("C", 4)]),
        ];

        let slots = plan(&tree);
        assert_eq!(
            slots,
            vec![
                (StructureIndex::main(1), 2),
                (StructureIndex::main(2), 3),
                (StructureIndex::sub(2, 1), 4),
            ]
        );
    }

    #[test]
    fn plan_ignores_third_level() {
        let grandchild = TopicNode::leaf("X", 9);
        let child = TopicNode::with_children("C", 4, vec![grandchild]);
        let tree = vec![TopicNode::with_children("B", 3, vec![child])];

        let slots = plan(&tree);
        assert_eq!(
            slots,
            vec![(StructureIndex::main(1), 3), (StructureIndex::sub(1, 1), 4)]
        );
    }

    #[test]
    fn group_rows_builds_children_only_when_shared() {
        let rows = vec![row(2, 1, 0), row(3, 2, 0), row(4, 2, 1)];
        let nested = group_rows(&rows);

        assert_eq!(nested.len(), 2);
        // Lone main: no children key at all.
        assert!(nested[0].children.is_none());
        // Main with a sub: children present.
        let children = nested[1].children.as_ref().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, 4);
    }

    #[test]
    fn round_trip_plan_and_group() {
        let tree = vec![
            TopicNode::leaf("ignored", 2),
            TopicNode::with_children(
                "ignored",
                3,
                vec![TopicNode::leaf("ignored", 4), TopicNode::leaf("ignored", 5)],
            ),
            TopicNode::leaf("ignored", 6),
        ];

        let rows: Vec<StructureEntryRow> = plan(&tree)
            .into_iter()
            .map(|(index, topic_id)| {
                let (position, sub_position) = index.to_columns();
                row(topic_id, position, sub_position)
            })
            .collect();

        let nested = group_rows(&rows);
        let ids: Vec<i64> = referenced_ids(&nested);
        assert_eq!(ids, vec![2, 3, 4, 5, 6]);
        assert!(nested[0].children.is_none());
        assert_eq!(nested[1].children.as_ref().unwrap().len(), 2);
        assert!(nested[2].children.is_none());
    }

    #[test]
    fn unknown_topics_error_lists_ids() {
        let err = StructureError::UnknownTopics(vec![4, 7]);
        assert_eq!(err.to_string(), "unknown topic ids: 4, 7");
    }
}
