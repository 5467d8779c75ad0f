#![allow(dead_code)]

use chrono::NaiveDate;
use rusqlite::Connection;
use todo_core::{AuthService, SqliteTaskRepository, SqliteUserRepository, TaskService, UserId};

pub fn register_user(conn: &mut Connection, username: &str) -> UserId {
    let repo = SqliteUserRepository::try_new(conn).unwrap();
    AuthService::new(repo)
        .register(
            username,
            &format!("{username}@example.com"),
            "password1",
            "password1",
        )
        .unwrap()
        .id
}

pub fn task_service(conn: &mut Connection) -> TaskService<SqliteTaskRepository<'_>> {
    TaskService::new(SqliteTaskRepository::try_new(conn).unwrap())
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
