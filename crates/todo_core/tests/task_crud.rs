mod common;

use common::{date, register_user, task_service};
use todo_core::db::open_db_in_memory;
use todo_core::{Priority, Recurrence, TaskDraft, TaskListQuery, TaskServiceError};

#[test]
fn add_task_applies_defaults_and_normalizes_tags() {
    let mut conn = open_db_in_memory().unwrap();
    let alice = register_user(&mut conn, "alice");
    let mut service = task_service(&mut conn);

    let draft = TaskDraft {
        tags: vec!["Home".to_string(), "home ".to_string()],
        ..TaskDraft::titled("  Buy milk  ")
    };
    let task = service.add_task(alice, &draft).unwrap();

    assert_eq!(task.user_id, alice);
    assert_eq!(task.title, "Buy milk");
    assert_eq!(task.category, "Other");
    assert_eq!(task.priority, Priority::Medium);
    assert_eq!(task.recurrence, Recurrence::None);
    assert_eq!(task.tags, vec!["home".to_string()]);
    assert!(!task.completed);
    assert!(task.created_at > 0);
}

#[test]
fn add_task_rejects_blank_title() {
    let mut conn = open_db_in_memory().unwrap();
    let alice = register_user(&mut conn, "alice");
    let mut service = task_service(&mut conn);

    let err = service
        .add_task(alice, &TaskDraft::titled("   "))
        .unwrap_err();
    assert!(matches!(err, TaskServiceError::Validation(_)));
    assert!(service
        .list_tasks(alice, &TaskListQuery::default())
        .unwrap()
        .is_empty());
}

#[test]
fn edit_task_replaces_all_fields_including_tags() {
    let mut conn = open_db_in_memory().unwrap();
    let alice = register_user(&mut conn, "alice");
    let mut service = task_service(&mut conn);

    let created = service
        .add_task(
            alice,
            &TaskDraft {
                tags: vec!["a".to_string(), "b".to_string()],
                ..TaskDraft::titled("draft")
            },
        )
        .unwrap();

    let edited = service
        .edit_task(
            alice,
            created.id,
            &TaskDraft {
                title: "final".to_string(),
                description: "details".to_string(),
                category: "Work".to_string(),
                priority: Priority::High,
                due_date: Some(date(2024, 6, 1)),
                tags: vec!["c".to_string()],
                recurrence: Recurrence::Weekly,
            },
        )
        .unwrap();

    assert_eq!(edited.id, created.id);
    assert_eq!(edited.title, "final");
    assert_eq!(edited.description, "details");
    assert_eq!(edited.category, "Work");
    assert_eq!(edited.priority, Priority::High);
    assert_eq!(edited.due_date, Some(date(2024, 6, 1)));
    assert_eq!(edited.tags, vec!["c".to_string()]);
    assert_eq!(edited.recurrence, Recurrence::Weekly);

    let tags = service.list_tags(alice).unwrap();
    assert_eq!(tags, vec!["a", "b", "c"]);
}

#[test]
fn edit_missing_task_returns_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let alice = register_user(&mut conn, "alice");
    let mut service = task_service(&mut conn);

    let err = service
        .edit_task(alice, 999, &TaskDraft::titled("nope"))
        .unwrap_err();
    assert!(matches!(err, TaskServiceError::TaskNotFound(999)));
}

#[test]
fn complete_is_idempotent() {
    let mut conn = open_db_in_memory().unwrap();
    let alice = register_user(&mut conn, "alice");
    let mut service = task_service(&mut conn);
    let today = date(2024, 5, 1);

    let task = service
        .add_task(alice, &TaskDraft::titled("write report"))
        .unwrap();

    let first = service.complete_task(alice, task.id, today).unwrap();
    assert!(first.changed);
    assert!(first.task.completed);
    assert!(first.spawned.is_none());

    let second = service.complete_task(alice, task.id, today).unwrap();
    assert!(!second.changed);
    assert!(second.spawned.is_none());

    let mut expected = first.task.clone();
    expected.updated_at = second.task.updated_at;
    assert_eq!(second.task, expected);
    assert_eq!(
        service
            .list_tasks(alice, &TaskListQuery::default())
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn reopen_clears_completion() {
    let mut conn = open_db_in_memory().unwrap();
    let alice = register_user(&mut conn, "alice");
    let mut service = task_service(&mut conn);

    let task = service.add_task(alice, &TaskDraft::titled("call mom")).unwrap();
    service
        .complete_task(alice, task.id, date(2024, 5, 1))
        .unwrap();

    let reopened = service.reopen_task(alice, task.id).unwrap();
    assert!(!reopened.completed);
    let again = service.reopen_task(alice, task.id).unwrap();
    assert!(!again.completed);
}

#[test]
fn completing_recurring_task_spawns_next_occurrence_once() {
    let mut conn = open_db_in_memory().unwrap();
    let alice = register_user(&mut conn, "alice");
    let mut service = task_service(&mut conn);

    let task = service
        .add_task(
            alice,
            &TaskDraft {
                due_date: Some(date(2024, 1, 31)),
                recurrence: Recurrence::Monthly,
                tags: vec!["bills".to_string()],
                ..TaskDraft::titled("pay rent")
            },
        )
        .unwrap();

    let done = service
        .complete_task(alice, task.id, date(2024, 1, 31))
        .unwrap();
    let spawned = done.spawned.expect("monthly task should spawn a follow-up");
    assert_ne!(spawned.id, task.id);
    assert_eq!(spawned.title, "pay rent");
    assert_eq!(spawned.due_date, Some(date(2024, 2, 29)));
    assert_eq!(spawned.tags, vec!["bills".to_string()]);
    assert_eq!(spawned.recurrence, Recurrence::Monthly);
    assert!(!spawned.completed);

    let again = service
        .complete_task(alice, task.id, date(2024, 1, 31))
        .unwrap();
    assert!(again.spawned.is_none());
    assert_eq!(
        service
            .list_tasks(alice, &TaskListQuery::default())
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn toggling_recurring_task_done_and_open_spawns_one_follow_up() {
    let mut conn = open_db_in_memory().unwrap();
    let alice = register_user(&mut conn, "alice");
    let mut service = task_service(&mut conn);
    let today = date(2024, 5, 10);

    let task = service
        .add_task(
            alice,
            &TaskDraft {
                due_date: Some(today),
                recurrence: Recurrence::Weekly,
                ..TaskDraft::titled("water plants")
            },
        )
        .unwrap();

    let first = service.complete_task(alice, task.id, today).unwrap();
    assert!(first.spawned.is_some());
    for _ in 0..3 {
        service.reopen_task(alice, task.id).unwrap();
        let again = service.complete_task(alice, task.id, today).unwrap();
        assert!(again.changed);
        assert!(again.spawned.is_none());
    }

    let tasks = service
        .list_tasks(alice, &TaskListQuery::default())
        .unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(
        tasks
            .iter()
            .filter(|task| task.due_date == Some(date(2024, 5, 17)))
            .count(),
        1
    );
}

#[test]
fn overdue_recurring_task_catches_up_to_today() {
    let mut conn = open_db_in_memory().unwrap();
    let alice = register_user(&mut conn, "alice");
    let mut service = task_service(&mut conn);

    let task = service
        .add_task(
            alice,
            &TaskDraft {
                due_date: Some(date(2024, 3, 1)),
                recurrence: Recurrence::Daily,
                ..TaskDraft::titled("stretch")
            },
        )
        .unwrap();

    let done = service
        .complete_task(alice, task.id, date(2024, 3, 10))
        .unwrap();
    assert_eq!(
        done.spawned.and_then(|spawned| spawned.due_date),
        Some(date(2024, 3, 10))
    );
}

#[test]
fn delete_removes_task_and_its_tag_links() {
    let mut conn = open_db_in_memory().unwrap();
    let alice = register_user(&mut conn, "alice");

    let id = {
        let mut service = task_service(&mut conn);
        let task = service
            .add_task(
                alice,
                &TaskDraft {
                    tags: vec!["x".to_string()],
                    ..TaskDraft::titled("temp")
                },
            )
            .unwrap();
        service.delete_task(alice, task.id).unwrap();
        assert!(service.get_task(alice, task.id).unwrap().is_none());
        assert!(matches!(
            service.delete_task(alice, task.id).unwrap_err(),
            TaskServiceError::TaskNotFound(_)
        ));
        task.id
    };

    let links: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM task_tags WHERE task_id = ?1;",
            [id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(links, 0);
}

#[test]
fn categories_include_defaults_then_custom_ones() {
    let mut conn = open_db_in_memory().unwrap();
    let alice = register_user(&mut conn, "alice");
    let mut service = task_service(&mut conn);

    for category in ["Garden", "work", "Errands"] {
        service
            .add_task(
                alice,
                &TaskDraft {
                    category: category.to_string(),
                    ..TaskDraft::titled(category)
                },
            )
            .unwrap();
    }

    let categories = service.list_categories(alice).unwrap();
    assert_eq!(
        categories,
        vec!["Work", "Personal", "Shopping", "Other", "Errands", "Garden"]
    );
}

#[test]
fn calendar_month_groups_tasks_by_due_date() {
    let mut conn = open_db_in_memory().unwrap();
    let alice = register_user(&mut conn, "alice");
    let mut service = task_service(&mut conn);

    for (title, due) in [
        ("a", Some(date(2024, 5, 15))),
        ("b", Some(date(2024, 5, 15))),
        ("c", Some(date(2024, 6, 1))),
        ("d", None),
    ] {
        service
            .add_task(
                alice,
                &TaskDraft {
                    due_date: due,
                    ..TaskDraft::titled(title)
                },
            )
            .unwrap();
    }

    let month = service.calendar_month(alice, 2024, 5).unwrap();
    let busy: Vec<_> = month.busy_days().collect();
    assert_eq!(busy.len(), 1);
    assert_eq!(busy[0].date, date(2024, 5, 15));
    assert_eq!(busy[0].tasks.len(), 2);

    assert!(matches!(
        service.calendar_month(alice, 2024, 0).unwrap_err(),
        TaskServiceError::InvalidMonth { .. }
    ));
}
