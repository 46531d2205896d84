//! Integration tests for the mutation engine.

use tasks_md::config::{BehaviorConfig, Config, Limits};
use tasks_md::{Document, InsertOptions, Status, TaskError, UpdateFields, parse, render};

fn setup_doc() -> Document {
    parse(
        "# Project\n\n\
- [ ] 1. Design\n  \
- [ ] 1.1. Sketch API\n  \
- [ ] 1.2. Review\n\n\
- [ ] 2. Build\n  \
- [ ] 2.1. Core\n\n\
- [ ] 3. Ship\n",
    )
    .unwrap()
}

fn titles(doc: &Document) -> Vec<(String, String)> {
    doc.list
        .walk()
        .map(|t| (t.id.clone(), t.title.clone()))
        .collect()
}

mod insert {
    use super::*;

    #[test]
    fn urgent_insert_at_front_renumbers_everything_after() {
        let mut doc = setup_doc();
        doc.list.assign_stable_ids().unwrap();
        let stable_before: Vec<Option<String>> =
            doc.list.walk().map(|t| t.stable_id.clone()).collect();

        let id = doc
            .insert("", "Urgent", Some("1"), &InsertOptions::default())
            .unwrap();
        assert_eq!(id, "1");

        let expected = [
            ("1", "Urgent"),
            ("2", "Design"),
            ("2.1", "Sketch API"),
            ("2.2", "Review"),
            ("3", "Build"),
            ("3.1", "Core"),
            ("4", "Ship"),
        ];
        let actual = titles(&doc);
        for ((id, title), (actual_id, actual_title)) in expected.iter().zip(&actual) {
            assert_eq!((*id, *title), (actual_id.as_str(), actual_title.as_str()));
        }

        // Stable IDs survive renumbering
        let stable_after: Vec<Option<String>> =
            doc.list.walk().skip(1).map(|t| t.stable_id.clone()).collect();
        assert_eq!(stable_after, stable_before);
    }

    #[test]
    fn nested_insert_uses_last_segment_as_position() {
        let mut doc = setup_doc();
        let id = doc
            .insert("1", "Prototype", Some("1.2"), &InsertOptions::default())
            .unwrap();
        assert_eq!(id, "1.2");
        assert_eq!(doc.list.find_task("1.3").unwrap().title, "Review");
    }

    #[test]
    fn insert_with_options_is_atomic() {
        let mut doc = setup_doc();
        doc.list.assign_stable_ids().unwrap();
        let opts = InsertOptions {
            stream: Some(2),
            owner: Some("agent-1".to_string()),
            blocked_by: vec!["1".to_string(), "2.1".to_string()],
            details: vec!["first pass".to_string()],
            ..Default::default()
        };
        let id = doc.insert("", "Integrate", None, &opts).unwrap();
        let task = doc.list.find_task(&id).unwrap();
        assert_eq!(task.stream, 2);
        assert_eq!(task.owner.as_deref(), Some("agent-1"));
        assert_eq!(task.blocked_by.len(), 2);
        assert_eq!(parse(&render(&doc)).unwrap(), doc);
    }

    #[test]
    fn failed_insert_leaves_document_unchanged() {
        let mut doc = setup_doc();
        let before = doc.clone();
        let bad_blocker = InsertOptions {
            blocked_by: vec!["9".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            doc.insert("", "X", None, &bad_blocker),
            Err(TaskError::TaskNotFound(_))
        ));
        assert!(matches!(
            doc.insert("7", "X", None, &InsertOptions::default()),
            Err(TaskError::ParentNotFound(_))
        ));
        let bad_stream = InsertOptions {
            stream: Some(-3),
            ..Default::default()
        };
        assert!(matches!(
            doc.insert("", "X", None, &bad_stream),
            Err(TaskError::InvalidStream)
        ));
        assert_eq!(doc, before);
    }

    #[test]
    fn depth_limit_applies_to_parent() {
        let mut doc = setup_doc();
        let limits = Limits {
            max_depth: 2,
            ..Default::default()
        };
        doc.insert_with_limits("1", "ok", None, &InsertOptions::default(), &limits)
            .unwrap();
        let err = doc
            .insert_with_limits("1.1", "too deep", None, &InsertOptions::default(), &limits)
            .unwrap_err();
        assert!(matches!(err, TaskError::LimitExceeded(_)));
    }
}

mod update_and_remove {
    use super::*;

    #[test]
    fn partial_update_touches_only_given_fields() {
        let mut doc = setup_doc();
        doc.list
            .update(
                "1.1",
                &UpdateFields {
                    details: Some(vec!["use REST".to_string()]),
                    references: Some(vec!["api.md".to_string()]),
                    requirements: Some(vec!["3.2".to_string()]),
                    ..Default::default()
                },
            )
            .unwrap();
        let task = doc.list.find_task("1.1").unwrap();
        assert_eq!(task.title, "Sketch API");
        assert_eq!(task.details, vec!["use REST"]);
        assert_eq!(task.references, vec!["api.md"]);
        assert_eq!(task.requirements, vec!["3.2"]);
        assert_eq!(parse(&render(&doc)).unwrap(), doc);
    }

    #[test]
    fn update_rejects_bad_values() {
        let mut doc = setup_doc();
        let before = doc.clone();
        let bad_ref = UpdateFields {
            references: Some(vec!["a.md, b.md".to_string()]),
            ..Default::default()
        };
        assert!(doc.list.update("1", &bad_ref).is_err());
        let bad_req = UpdateFields {
            requirements: Some(vec!["1.x".to_string()]),
            ..Default::default()
        };
        assert!(matches!(
            doc.list.update("1", &bad_req),
            Err(TaskError::InvalidRequirement(_))
        ));
        assert_eq!(
            doc.list
                .update("4", &UpdateFields::default())
                .unwrap_err()
                .to_string(),
            "task 4 not found"
        );
        assert_eq!(doc, before);
    }

    #[test]
    fn remove_renumbers_later_siblings() {
        let mut doc = setup_doc();
        doc.remove("1").unwrap();
        let ids: Vec<(String, String)> = titles(&doc);
        assert_eq!(
            ids,
            vec![
                ("1".to_string(), "Build".to_string()),
                ("1.1".to_string(), "Core".to_string()),
                ("2".to_string(), "Ship".to_string()),
            ]
        );
    }

    #[test]
    fn cycle_rejected_and_state_unchanged() {
        let mut doc = setup_doc();
        doc.list.assign_stable_ids().unwrap();
        let design = doc.list.find_task("1").unwrap().stable_id.clone().unwrap();
        let build = doc.list.find_task("2").unwrap().stable_id.clone().unwrap();

        let blocks = |tokens: &[&str]| UpdateFields {
            blocked_by: Some(tokens.iter().map(|t| t.to_string()).collect()),
            ..Default::default()
        };
        doc.list.update("2", &blocks(&["1"])).unwrap();
        let before = doc.clone();

        let err = doc.list.update("1", &blocks(&["2"])).unwrap_err();
        match &err {
            TaskError::CircularDependency { path } => {
                assert_eq!(path, &vec![design.clone(), build.clone(), design.clone()]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
        assert_eq!(doc, before);

        // Self-dependency is the shortest cycle
        assert!(matches!(
            doc.list.update("3", &blocks(&["3"])),
            Err(TaskError::CircularDependency { .. })
        ));
    }

    #[test]
    fn dependent_without_stable_id_can_take_blockers() {
        let mut doc =
            parse("# T\n\n- [ ] 1. Schema <!-- id:aaaaaa1 -->\n\n- [ ] 2. Legacy\n").unwrap();
        doc.list
            .update(
                "2",
                &UpdateFields {
                    blocked_by: Some(vec!["1".to_string()]),
                    ..Default::default()
                },
            )
            .unwrap();
        let legacy = doc.list.find_task("2").unwrap();
        assert_eq!(legacy.blocked_by, vec!["aaaaaa1"]);
        assert!(legacy.stable_id.is_none());
        assert_eq!(parse(&render(&doc)).unwrap(), doc);
    }

    #[test]
    fn malformed_ids_are_validation_errors() {
        let mut doc = setup_doc();
        assert!(matches!(doc.remove("two"), Err(TaskError::InvalidId(_))));
        assert!(matches!(
            doc.insert("1..2", "X", None, &InsertOptions::default()),
            Err(TaskError::InvalidId(_))
        ));
    }

    #[test]
    fn remove_strips_blockers_and_warns() {
        let mut doc = setup_doc();
        doc.list.assign_stable_ids().unwrap();
        doc.list
            .update(
                "3",
                &UpdateFields {
                    blocked_by: Some(vec!["1.2".to_string(), "2".to_string()]),
                    ..Default::default()
                },
            )
            .unwrap();
        let build = doc.list.find_task("2").unwrap().stable_id.clone().unwrap();

        let warnings = doc.remove("1").unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].task_id.as_deref(), Some("2"));
        assert_eq!(doc.list.find_task("2").unwrap().title, "Ship");
        assert_eq!(doc.list.find_task("2").unwrap().blocked_by, vec![build]);
    }

    #[test]
    fn remove_nested() {
        let mut doc = setup_doc();
        doc.remove("1.1").unwrap();
        assert_eq!(doc.list.find_task("1.1").unwrap().title, "Review");
        assert!(doc.list.find_task("1.2").is_none());
    }
}

mod status {
    use super::*;

    #[test]
    fn transitions_are_unrestricted() {
        let mut doc = setup_doc();
        doc.list.set_status("3", Status::Completed).unwrap();
        doc.list.set_status("3", Status::Pending).unwrap();
        doc.list.set_status("3", Status::InProgress).unwrap();
        assert_eq!(doc.list.find_task("3").unwrap().status, Status::InProgress);
    }

    #[test]
    fn completing_last_child_completes_parent_when_enabled() {
        let mut doc = setup_doc();
        let behavior = BehaviorConfig::default();
        assert!(doc.list.complete("1.1", &behavior).unwrap().is_empty());
        let auto = doc.list.complete("1.2", &behavior).unwrap();
        assert_eq!(auto, vec!["1"]);
        assert_eq!(doc.list.find_task("1").unwrap().status, Status::Completed);
    }

    #[test]
    fn claim_marks_in_progress() {
        let mut doc = setup_doc();
        doc.list.claim("2.1", "agent-2").unwrap();
        let task = doc.list.find_task("2.1").unwrap();
        assert_eq!(task.status, Status::InProgress);
        assert_eq!(task.owner.as_deref(), Some("agent-2"));
        assert_eq!(parse(&render(&doc)).unwrap(), doc);
    }
}

mod phases {
    use super::*;

    #[test]
    fn add_phase_and_insert_into_it() {
        let mut doc = setup_doc();
        doc.add_phase("Later").unwrap();
        let id = doc
            .insert_into_phase("Later", "", "Polish", &InsertOptions::default())
            .unwrap();
        assert_eq!(id, "4");
        assert_eq!(doc.phase_of(3), Some("Later"));
        assert!(render(&doc).contains("## Later\n\n- [ ] 4. Polish <!-- id:"));
    }

    #[test]
    fn nested_insert_still_creates_missing_phase() {
        let mut doc = setup_doc();
        let id = doc
            .insert_into_phase("Later", "1", "Sub", &InsertOptions::default())
            .unwrap();
        assert_eq!(id, "1.3");
        assert_eq!(doc.phases.len(), 1);
        assert_eq!(doc.phases[0].name, "Later");
        assert_eq!(doc.phases[0].position, 3);
        assert!(render(&doc).ends_with("## Later\n"));

        // Existing phase is reused, not duplicated
        doc.insert_into_phase("Later", "2", "Sub", &InsertOptions::default())
            .unwrap();
        assert_eq!(doc.phases.len(), 1);
    }

    #[test]
    fn failed_nested_insert_creates_no_phase() {
        let mut doc = setup_doc();
        assert!(doc
            .insert_into_phase("Later", "9", "Sub", &InsertOptions::default())
            .is_err());
        assert!(doc.phases.is_empty());
    }

    #[test]
    fn new_document_uses_configured_requirements_file() {
        let mut config = Config::default();
        config.files.requirements_file = "reqs/product.md".to_string();
        let mut doc = Document::with_config("Plan", &config);
        let opts = InsertOptions {
            requirements: vec!["2.1".to_string()],
            ..Default::default()
        };
        doc.insert("", "Login", None, &opts).unwrap();
        let text = render(&doc);
        assert!(text.contains("[2.1](reqs/product.md#2.1)"));
        assert_eq!(parse(&text).unwrap().list.requirements_file, "reqs/product.md");
    }

    #[test]
    fn remove_keeps_headings_in_place() {
        let mut doc = parse("# T\n\n## A\n\n- [ ] 1. a1\n\n- [ ] 2. a2\n\n## B\n\n- [ ] 3. b1\n").unwrap();
        doc.remove("2").unwrap();
        assert_eq!(doc.phases[1].position, 1);
        assert_eq!(doc.phase_of(1), Some("B"));
        assert_eq!(
            render(&doc),
            "# T\n\n## A\n\n- [ ] 1. a1\n\n## B\n\n- [ ] 2. b1\n"
        );
    }
}
