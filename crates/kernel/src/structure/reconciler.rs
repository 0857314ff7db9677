//! Course structure reconciler.
//!
//! Rewrites a course's persisted structure entries to match a
//! client-submitted nested tree, then garbage-collects topics that lost
//! their last reference. The whole write sequence runs in one transaction
//! so concurrent readers never observe sparse or duplicate indexes.

use std::collections::HashSet;

use anyhow::Context;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};

use crate::models::{StructureEntry, Topic};

use super::{StructureError, TopicNode, group_rows, plan, referenced_ids};

/// Check that every topic referenced by the tree exists.
///
/// Fails with [`StructureError::UnknownTopics`] listing all offending ids;
/// callers run this before any write happens.
pub async fn validate_topics(pool: &PgPool, tree: &[TopicNode]) -> Result<(), StructureError> {
    let ids = referenced_ids(tree);
    let missing = Topic::missing_ids(pool, &ids).await?;

    if missing.is_empty() {
        Ok(())
    } else {
        Err(StructureError::UnknownTopics(missing))
    }
}

/// Rewrite the course's structure entries to match the submitted tree.
///
/// Slots that already exist are updated in place (preserving row
/// identity); slots beyond the new tree are swept away by probing
/// ascending indexes until the first absent one. Topics referenced before
/// but not after the rewrite are deleted unless a structure entry in some
/// other course still references them.
pub async fn apply(pool: &PgPool, course_id: i64, tree: &[TopicNode]) -> Result<(), StructureError> {
    validate_topics(pool, tree).await?;

    let mut tx = pool
        .begin()
        .await
        .context("failed to start structure transaction")?;

    let before: HashSet<i64> = StructureEntry::topic_ids_for_course(&mut *tx, course_id)
        .await?
        .into_iter()
        .collect();

    let mut main_count = 0i32;
    for (i, node) in tree.iter().enumerate() {
        let position = i as i32 + 1;
        main_count = position;
        StructureEntry::set_slot(&mut *tx, course_id, position, 0, node.id).await?;

        let mut sub_count = 0i32;
        for (j, child) in node.children.iter().flatten().enumerate() {
            sub_count = j as i32 + 1;
            StructureEntry::set_slot(&mut *tx, course_id, position, sub_count, child.id).await?;
        }

        sweep_subs(&mut *tx, course_id, position, sub_count + 1).await?;
    }

    sweep_mains(&mut *tx, course_id, main_count + 1).await?;

    // Orphan cleanup: topics referenced before the rewrite but not after,
    // and unreferenced everywhere else, are garbage-collected.
    let after: HashSet<i64> = plan(tree).into_iter().map(|(_, id)| id).collect();
    for topic_id in before.difference(&after) {
        if Topic::delete_if_unreferenced(&mut *tx, *topic_id).await? {
            debug!(topic_id, "orphaned topic deleted");
        }
    }

    tx.commit()
        .await
        .context("failed to commit structure transaction")?;

    info!(course_id, mains = main_count, "course structure applied");
    Ok(())
}

/// Read the course structure back as the nested wire form.
pub async fn to_nested(pool: &PgPool, course_id: i64) -> Result<Vec<TopicNode>, StructureError> {
    let rows = StructureEntry::list_for_course(pool, course_id).await?;
    Ok(group_rows(&rows))
}

/// Delete sub entries of `position` starting at `from`, stopping at the
/// first sub index that does not exist. O(removed entries).
async fn sweep_subs(
    conn: &mut PgConnection,
    course_id: i64,
    position: i32,
    from: i32,
) -> Result<(), StructureError> {
    let mut sub = from;
    while StructureEntry::delete_slot(conn, course_id, position, sub).await? {
        sub += 1;
    }
    Ok(())
}

/// Delete main entries (and their sub-trees) starting at `from`, stopping
/// at the first main index that does not exist.
async fn sweep_mains(
    conn: &mut PgConnection,
    course_id: i64,
    from: i32,
) -> Result<(), StructureError> {
    let mut position = from;
    while StructureEntry::delete_slot(conn, course_id, position, 0).await? {
        sweep_subs(conn, course_id, position, 1).await?;
        position += 1;
    }
    Ok(())
}
