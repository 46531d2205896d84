//! Integration tests for batch execution.

use tasks_md::batch::execute_batch_with_config;
use tasks_md::config::Config;
use tasks_md::{Document, Operation, Status, execute_batch, parse, render};

fn setup_doc() -> Document {
    parse("# Sprint\n\n- [ ] 1. Backend\n  - [ ] 1.1. Models\n  - [x] 1.2. Routes\n\n- [ ] 2. Frontend\n")
        .unwrap()
}

fn ops(json: &str) -> Vec<Operation> {
    serde_json::from_str(json).unwrap()
}

mod atomicity {
    use super::*;

    #[test]
    fn all_operations_apply_in_order() {
        let mut doc = setup_doc();
        let response = execute_batch(
            &mut doc,
            &ops(r#"[
                {"type": "add", "title": "Auth", "position": "1"},
                {"type": "add", "parent": "3", "title": "Login page", "blocked_by": ["1"]},
                {"type": "update", "id": "3", "owner": "agent-a", "status": "in-progress"}
            ]"#),
            false,
        );
        assert!(response.success, "{:?}", response.errors);
        assert_eq!(response.applied, 3);

        assert_eq!(doc.list.find_task("1").unwrap().title, "Auth");
        let auth = doc.list.find_task("1").unwrap().stable_id.clone().unwrap();
        let login = doc.list.find_task("3.1").unwrap();
        assert_eq!(login.blocked_by, vec![auth]);
        let frontend = doc.list.find_task("3").unwrap();
        assert_eq!(frontend.status, Status::InProgress);
        assert_eq!(frontend.owner.as_deref(), Some("agent-a"));
    }

    #[test]
    fn failure_leaves_document_untouched() {
        let mut doc = setup_doc();
        let before = doc.clone();
        let response = execute_batch(
            &mut doc,
            &ops(r#"[
                {"type": "add", "title": "Fine"},
                {"type": "remove", "id": "9"},
                {"type": "add", "title": "Never reached"}
            ]"#),
            false,
        );
        assert!(!response.success);
        assert_eq!(response.applied, 0);
        assert_eq!(response.errors, vec!["operation 2: task 9 not found"]);
        assert_eq!(doc, before);
    }

    #[test]
    fn phase_and_position_conflict() {
        let mut doc = setup_doc();
        let response = execute_batch(
            &mut doc,
            &ops(r#"[{"type": "add", "title": "X", "phase": "Later", "position": "1"}]"#),
            false,
        );
        assert!(!response.success);
        assert!(response.errors[0].starts_with("operation 1: invalid position"));
    }
}

mod dry_run {
    use super::*;

    #[test]
    fn preview_without_mutation() {
        let mut doc = setup_doc();
        let before = doc.clone();
        let response = execute_batch(
            &mut doc,
            &ops(r#"[
                {"type": "add-phase", "phase": "Launch"},
                {"type": "add", "title": "Announce", "phase": "Launch"}
            ]"#),
            true,
        );
        assert!(response.success);
        assert_eq!(doc, before);

        let preview = response.preview.unwrap();
        let previewed = parse(&preview).unwrap();
        assert_eq!(previewed.phase_of(2), Some("Launch"));
        assert_eq!(previewed.list.find_task("3").unwrap().title, "Announce");
    }

    #[test]
    fn real_run_has_no_preview() {
        let mut doc = setup_doc();
        let response = execute_batch(&mut doc, &ops(r#"[{"type": "add-phase", "phase": "Next"}]"#), false);
        assert!(response.preview.is_none());
        assert!(render(&doc).ends_with("## Next\n"));
    }
}

mod completion {
    use super::*;

    #[test]
    fn completing_last_child_reports_parent() {
        let mut doc = setup_doc();
        let response = execute_batch(
            &mut doc,
            &ops(r#"[{"type": "update", "id": "1.1", "status": "completed"}]"#),
            false,
        );
        assert_eq!(response.auto_completed, vec!["1"]);
        assert_eq!(doc.list.find_task("1").unwrap().status, Status::Completed);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["auto_completed"], serde_json::json!(["1"]));
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn policy_can_be_disabled() {
        let mut doc = setup_doc();
        let mut config = Config::default();
        config.behavior.auto_complete_parents = false;
        let response = execute_batch_with_config(
            &mut doc,
            &ops(r#"[{"type": "update", "id": "1.1", "status": "completed"}]"#),
            false,
            &config,
        );
        assert!(response.success);
        assert!(response.auto_completed.is_empty());
        assert_eq!(doc.list.find_task("1").unwrap().status, Status::Pending);
    }

    #[test]
    fn remove_warnings_surface_in_response() {
        let mut doc = setup_doc();
        doc.list.assign_stable_ids().unwrap();
        let response = execute_batch(
            &mut doc,
            &ops(r#"[
                {"type": "update", "id": "2", "blocked_by": ["1.1"]},
                {"type": "remove", "id": "1"}
            ]"#),
            false,
        );
        assert!(response.success);
        assert_eq!(response.warnings.len(), 1);
        assert_eq!(response.warnings[0].task_id.as_deref(), Some("1"));
        assert!(doc.list.find_task("1").unwrap().blocked_by.is_empty());
    }
}
