#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Course structure engine integration tests.
//!
//! Pure tests cover the index type, planning, and grouping; the
//! database-backed reconciler scenario runs only when DATABASE_URL points
//! at a test database.

use coursebook_kernel::structure::{StructureIndex, TopicNode, plan, referenced_ids};

// -------------------------------------------------------------------------
// Wire format
// -------------------------------------------------------------------------

#[test]
fn wire_format_round_trip() {
    let json = r#"[{"value":"A (Math)","id":2},{"value":"B (Math)","id":3,"children":[{"value":"C (Math)","id":4}]}]"#;
    let tree: Vec<TopicNode> = serde_json::from_str(json).unwrap();

    assert_eq!(tree.len(), 2);
    assert!(tree[0].children.is_none());
    assert_eq!(tree[1].children.as_ref().unwrap()[0].id, 4);

    // Absent children serializes back as an absent key, not null or [].
    let out = serde_json::to_string(&tree).unwrap();
    assert!(!out.contains("children\":null"));
    assert_eq!(out.matches("children").count(), 1);
}

#[test]
fn referenced_ids_walks_depth_first() {
    let tree = vec![
        TopicNode::with_children("B", 3, vec![TopicNode::leaf("C", 4)]),
        TopicNode::leaf("A", 2),
    ];
    assert_eq!(referenced_ids(&tree), vec![3, 4, 2]);
}

// -------------------------------------------------------------------------
// Index ordering
// -------------------------------------------------------------------------

#[test]
fn index_order_matches_depth_first_render_order() {
    let ordered: Vec<StructureIndex> = ["1", "1/1", "1/2", "2", "2/1", "10"]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();

    for pair in ordered.windows(2) {
        assert!(pair[0] < pair[1], "{} should sort before {}", pair[0], pair[1]);
    }
}

#[test]
fn malformed_indexes_are_rejected() {
    for bad in ["", "x", "1/x", "1/2/3", "0", "3/0"] {
        assert!(bad.parse::<StructureIndex>().is_err());
    }
}

// -------------------------------------------------------------------------
// Planning: reorder scenarios at the slot level
// -------------------------------------------------------------------------

#[test]
fn plan_scenario_initial_submission() {
    // [{id:2},{id:3,children:[{id:4}]}] -> {"1":2, "2":3, "2/1":4}
    let tree = vec![
        TopicNode::leaf("A", 2),
        TopicNode::with_children("B", 3, vec![TopicNode::leaf("C", 4)]),
    ];

    let slots: Vec<(String, i64)> = plan(&tree)
        .into_iter()
        .map(|(index, id)| (index.to_string(), id))
        .collect();

    assert_eq!(
        slots,
        vec![
            ("1".to_string(), 2),
            ("2".to_string(), 3),
            ("2/1".to_string(), 4),
        ]
    );
}

#[test]
fn plan_scenario_resubmission_moves_children() {
    // Resubmitting [{id:3,children:[{id:4}]},{id:2}] -> {"1":3, "1/1":4, "2":2}
    let tree = vec![
        TopicNode::with_children("B", 3, vec![TopicNode::leaf("C", 4)]),
        TopicNode::leaf("A", 2),
    ];

    let slots: Vec<(String, i64)> = plan(&tree)
        .into_iter()
        .map(|(index, id)| (index.to_string(), id))
        .collect();

    assert_eq!(
        slots,
        vec![
            ("1".to_string(), 3),
            ("1/1".to_string(), 4),
            ("2".to_string(), 2),
        ]
    );
}

// -------------------------------------------------------------------------
// Database-backed reconciler tests (skipped without DATABASE_URL)
// -------------------------------------------------------------------------

mod db {
    use coursebook_kernel::models::{Course, CreateCourse, StructureEntry, Topic};
    use coursebook_kernel::structure::{self, StructureError, TopicNode};
    use sqlx::PgPool;

    async fn test_pool() -> Option<PgPool> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("skipping: DATABASE_URL not set");
            return None;
        };
        let pool = PgPool::connect(&url).await.expect("connect test database");
        sqlx::raw_sql(include_str!("../src/schema.sql"))
            .execute(&pool)
            .await
            .expect("apply schema");
        Some(pool)
    }

    async fn seed_course(pool: &PgPool, base: &str) -> (Course, Vec<Topic>) {
        // Unique per run so the suite can be re-run against a persistent
        // test database.
        let title = format!("{base} {}", uuid::Uuid::now_v7().simple());

        let category_id: i64 = sqlx::query_scalar(
            "INSERT INTO category (title) VALUES ($1) ON CONFLICT (title) DO UPDATE SET title = EXCLUDED.title RETURNING id",
        )
        .bind(format!("Category {title}"))
        .fetch_one(pool)
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO profile (username, display_name, created) VALUES ('tester', 'tester', 0) ON CONFLICT (username) DO NOTHING",
        )
        .execute(pool)
        .await
        .unwrap();
        let owner_id: i64 =
            sqlx::query_scalar("SELECT id FROM profile WHERE username = 'tester'")
                .fetch_one(pool)
                .await
                .unwrap();

        let course = Course::create(
            pool,
            CreateCourse {
                title: title.to_string(),
                description: "test course".to_string(),
                category_id,
                period_id: None,
                restrict_changes: None,
            },
            owner_id,
        )
        .await
        .unwrap();

        let mut topics = Vec::new();
        for name in ["Alpha", "Beta", "Gamma", "Delta"] {
            topics.push(
                Topic::get_or_create(pool, &format!("{name} {title}"), category_id)
                    .await
                    .unwrap(),
            );
        }

        (course, topics)
    }

    async fn slots(pool: &PgPool, course_id: i64) -> Vec<(i32, i32, i64)> {
        StructureEntry::list_for_course(pool, course_id)
            .await
            .unwrap()
            .into_iter()
            .map(|row| (row.position, row.sub_position, row.topic_id))
            .collect()
    }

    #[tokio::test]
    async fn apply_reapply_scenario() {
        let Some(pool) = test_pool().await else { return };
        let (course, topics) = seed_course(&pool, "Apply Scenario").await;
        let (a, b, c) = (topics[0].id, topics[1].id, topics[2].id);

        let tree = vec![
            TopicNode::leaf("", a),
            TopicNode::with_children("", b, vec![TopicNode::leaf("", c)]),
        ];
        structure::apply(&pool, course.id, &tree).await.unwrap();
        assert_eq!(
            slots(&pool, course.id).await,
            vec![(1, 0, a), (2, 0, b), (2, 1, c)]
        );

        // Resubmit with the groups swapped: no leftover 2/1 row.
        let tree = vec![
            TopicNode::with_children("", b, vec![TopicNode::leaf("", c)]),
            TopicNode::leaf("", a),
        ];
        structure::apply(&pool, course.id, &tree).await.unwrap();
        assert_eq!(
            slots(&pool, course.id).await,
            vec![(1, 0, b), (1, 1, c), (2, 0, a)]
        );
    }

    #[tokio::test]
    async fn shrinking_removes_exactly_the_absent_rows() {
        let Some(pool) = test_pool().await else { return };
        let (course, topics) = seed_course(&pool, "Shrink Scenario").await;
        let (a, b, c, d) = (topics[0].id, topics[1].id, topics[2].id, topics[3].id);

        let tree = vec![
            TopicNode::with_children(
                "",
                a,
                vec![
                    TopicNode::leaf("", b),
                    TopicNode::leaf("", c),
                    TopicNode::leaf("", d),
                ],
            ),
            TopicNode::leaf("", b),
        ];
        structure::apply(&pool, course.id, &tree).await.unwrap();
        assert_eq!(slots(&pool, course.id).await.len(), 5);

        // 3 children -> 1 child, 2 mains -> 1 main.
        let tree = vec![TopicNode::with_children("", a, vec![TopicNode::leaf("", b)])];
        structure::apply(&pool, course.id, &tree).await.unwrap();
        assert_eq!(slots(&pool, course.id).await, vec![(1, 0, a), (1, 1, b)]);
    }

    #[tokio::test]
    async fn dense_indexes_after_any_apply() {
        let Some(pool) = test_pool().await else { return };
        let (course, topics) = seed_course(&pool, "Density Scenario").await;
        let ids: Vec<i64> = topics.iter().map(|t| t.id).collect();

        let trees = vec![
            vec![
                TopicNode::leaf("", ids[0]),
                TopicNode::leaf("", ids[1]),
                TopicNode::leaf("", ids[2]),
            ],
            vec![TopicNode::with_children(
                "",
                ids[1],
                vec![TopicNode::leaf("", ids[2]), TopicNode::leaf("", ids[3])],
            )],
            vec![
                TopicNode::leaf("", ids[3]),
                TopicNode::with_children("", ids[1], vec![TopicNode::leaf("", ids[2])]),
            ],
        ];

        for tree in trees {
            structure::apply(&pool, course.id, &tree).await.unwrap();

            let rows = slots(&pool, course.id).await;
            let mut mains = 0;
            let mut subs_per_main: std::collections::HashMap<i32, i32> = Default::default();
            for (position, sub_position, _) in &rows {
                if *sub_position == 0 {
                    mains += 1;
                    assert_eq!(*position, mains, "main positions must be dense");
                } else {
                    let next = subs_per_main.entry(*position).or_insert(0);
                    *next += 1;
                    assert_eq!(*sub_position, *next, "sub positions must be dense");
                }
            }
        }
    }

    #[tokio::test]
    async fn round_trip_preserves_grouping() {
        let Some(pool) = test_pool().await else { return };
        let (course, topics) = seed_course(&pool, "Round Trip").await;
        let ids: Vec<i64> = topics.iter().map(|t| t.id).collect();

        let tree = vec![
            TopicNode::leaf("", ids[0]),
            TopicNode::with_children(
                "",
                ids[1],
                vec![TopicNode::leaf("", ids[2]), TopicNode::leaf("", ids[3])],
            ),
        ];
        structure::apply(&pool, course.id, &tree).await.unwrap();

        let nested = structure::to_nested(&pool, course.id).await.unwrap();
        assert_eq!(nested.len(), 2);
        assert_eq!(nested[0].id, ids[0]);
        // Lone main topic: no children key at all.
        assert!(nested[0].children.is_none());
        let children = nested[1].children.as_ref().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].id, ids[2]);
        assert_eq!(children[1].id, ids[3]);
    }

    #[tokio::test]
    async fn validate_topics_lists_offending_ids() {
        let Some(pool) = test_pool().await else { return };
        let (_, topics) = seed_course(&pool, "Validation Scenario").await;

        let tree = vec![
            TopicNode::leaf("", topics[0].id),
            TopicNode::with_children("", -5, vec![TopicNode::leaf("", -9)]),
        ];

        let err = structure::validate_topics(&pool, &tree).await.unwrap_err();
        match err {
            StructureError::UnknownTopics(ids) => {
                assert!(ids.contains(&-5));
                assert!(ids.contains(&-9));
                assert!(!ids.contains(&topics[0].id));
            }
            other => panic!("expected UnknownTopics, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn orphan_cleanup_is_cross_course_safe() {
        let Some(pool) = test_pool().await else { return };
        let (course_a, topics) = seed_course(&pool, "Orphan A").await;
        let (course_b, _) = seed_course(&pool, "Orphan B").await;
        let shared = topics[0].id;
        let private = topics[1].id;

        // Both courses reference `shared`; only course A references `private`.
        structure::apply(
            &pool,
            course_a.id,
            &[TopicNode::leaf("", shared), TopicNode::leaf("", private)],
        )
        .await
        .unwrap();
        structure::apply(&pool, course_b.id, &[TopicNode::leaf("", shared)])
            .await
            .unwrap();

        // Drop both from course A: `private` is orphaned, `shared` survives
        // through course B.
        structure::apply(&pool, course_a.id, &[TopicNode::leaf("", topics[2].id)])
            .await
            .unwrap();

        assert!(Topic::find_by_id(&pool, shared).await.unwrap().is_some());
        assert!(Topic::find_by_id(&pool, private).await.unwrap().is_none());
    }
}
