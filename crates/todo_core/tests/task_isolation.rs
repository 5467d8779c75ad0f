mod common;

use common::{date, register_user, task_service};
use todo_core::db::open_db_in_memory;
use todo_core::{TaskDraft, TaskListQuery, TaskServiceError};

#[test]
fn users_never_see_each_others_tasks() {
    let mut conn = open_db_in_memory().unwrap();
    let alice = register_user(&mut conn, "alice");
    let bob = register_user(&mut conn, "bob");
    let mut service = task_service(&mut conn);

    let alice_task = service
        .add_task(
            alice,
            &TaskDraft {
                tags: vec!["secret".to_string()],
                ..TaskDraft::titled("alice only")
            },
        )
        .unwrap();
    service.add_task(bob, &TaskDraft::titled("bob only")).unwrap();

    let bob_tasks = service.list_tasks(bob, &TaskListQuery::default()).unwrap();
    assert_eq!(bob_tasks.len(), 1);
    assert_eq!(bob_tasks[0].title, "bob only");

    assert!(service.get_task(bob, alice_task.id).unwrap().is_none());
    assert!(service.list_tags(bob).unwrap().is_empty());
}

#[test]
fn users_cannot_modify_each_others_tasks() {
    let mut conn = open_db_in_memory().unwrap();
    let alice = register_user(&mut conn, "alice");
    let bob = register_user(&mut conn, "bob");
    let mut service = task_service(&mut conn);

    let task = service
        .add_task(alice, &TaskDraft::titled("alice only"))
        .unwrap();

    assert!(matches!(
        service
            .edit_task(bob, task.id, &TaskDraft::titled("hijacked"))
            .unwrap_err(),
        TaskServiceError::TaskNotFound(_)
    ));
    assert!(matches!(
        service
            .complete_task(bob, task.id, date(2024, 1, 1))
            .unwrap_err(),
        TaskServiceError::TaskNotFound(_)
    ));
    assert!(matches!(
        service.reopen_task(bob, task.id).unwrap_err(),
        TaskServiceError::TaskNotFound(_)
    ));
    assert!(matches!(
        service.delete_task(bob, task.id).unwrap_err(),
        TaskServiceError::TaskNotFound(_)
    ));

    let untouched = service.get_task(alice, task.id).unwrap().unwrap();
    assert_eq!(untouched.title, "alice only");
    assert!(!untouched.completed);
}

#[test]
fn deleting_a_task_does_not_affect_other_users() {
    let mut conn = open_db_in_memory().unwrap();
    let alice = register_user(&mut conn, "alice");
    let bob = register_user(&mut conn, "bob");
    let mut service = task_service(&mut conn);

    let shared_tag = TaskDraft {
        tags: vec!["groceries".to_string()],
        ..TaskDraft::titled("buy bread")
    };
    let alice_task = service.add_task(alice, &shared_tag).unwrap();
    let bob_task = service.add_task(bob, &shared_tag).unwrap();

    service.delete_task(alice, alice_task.id).unwrap();

    assert!(service
        .list_tasks(alice, &TaskListQuery::default())
        .unwrap()
        .is_empty());
    let remaining = service.list_tasks(bob, &TaskListQuery::default()).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, bob_task.id);
    assert_eq!(remaining[0].tags, vec!["groceries".to_string()]);
}

#[test]
fn same_tag_name_is_tracked_per_user() {
    let mut conn = open_db_in_memory().unwrap();
    let alice = register_user(&mut conn, "alice");
    let bob = register_user(&mut conn, "bob");

    {
        let mut service = task_service(&mut conn);
        for user in [alice, bob] {
            service
                .add_task(
                    user,
                    &TaskDraft {
                        tags: vec!["home".to_string()],
                        ..TaskDraft::titled("chores")
                    },
                )
                .unwrap();
        }
    }

    let tag_rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM tags WHERE name = 'home';", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(tag_rows, 2);
}
