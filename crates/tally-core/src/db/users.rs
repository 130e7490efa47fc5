//! Registered users and their roles.

use super::{get_parsed, get_time, get_uuid, micros};
use crate::model::{RoleSet, User};
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

const SELECT_USER: &str = "SELECT user_id, name, roles, created_at_us FROM users";

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: get_uuid(row, 0)?,
        name: row.get(1)?,
        roles: get_parsed::<RoleSet>(row, 2)?,
        created_at: get_time(row, 3)?,
    })
}

/// # Errors
///
/// Returns an error if the write fails, including a duplicate name.
pub fn insert(conn: &Connection, user: &User) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO users (user_id, name, roles, created_at_us) VALUES (?1, ?2, ?3, ?4)",
        params![
            user.id.to_string(),
            user.name,
            user.roles.to_db_string(),
            micros(user.created_at),
        ],
    )?;
    Ok(())
}

/// # Errors
///
/// Returns an error if the query fails.
pub fn find(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("{SELECT_USER} WHERE user_id = ?1"),
        params![id.to_string()],
        row_to_user,
    )
    .optional()
}

/// # Errors
///
/// Returns an error if the query fails.
pub fn find_by_name(conn: &Connection, name: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("{SELECT_USER} WHERE name = ?1"),
        params![name],
        row_to_user,
    )
    .optional()
}

/// All users ordered by name.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list(conn: &Connection) -> rusqlite::Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!("{SELECT_USER} ORDER BY name"))?;
    let rows = stmt.query_map([], row_to_user)?;
    rows.collect()
}

/// # Errors
///
/// Returns an error if the query fails.
pub fn count(conn: &Connection) -> rusqlite::Result<u64> {
    conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
}

/// Replace a user's roles. Returns false for an unknown user.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn set_roles(conn: &Connection, id: Uuid, roles: &RoleSet) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE users SET roles = ?2 WHERE user_id = ?1",
        params![id.to_string(), roles.to_db_string()],
    )?;
    Ok(changed > 0)
}

#[cfg(test)]
mod tests {
    use super::{find_by_name, insert, set_roles};
    use crate::db::open_in_memory;
    use crate::model::{Role, RoleSet, User};
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn roles_survive_storage() {
        let conn = open_in_memory().expect("open");
        let user = User {
            id: Uuid::new_v4(),
            name: "alice".into(),
            roles: RoleSet::new([Role::Edit, Role::Vote]),
            created_at: Utc::now(),
        };
        insert(&conn, &user).expect("insert");

        let loaded = find_by_name(&conn, "alice").expect("find").expect("present");
        assert_eq!(loaded.roles, user.roles);

        assert!(set_roles(&conn, user.id, &RoleSet::new([Role::Admin])).expect("update"));
        let loaded = find_by_name(&conn, "alice").expect("find").expect("present");
        assert!(loaded.roles.has(Role::Modify));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let conn = open_in_memory().expect("open");
        let user = User {
            id: Uuid::new_v4(),
            name: "bob".into(),
            roles: RoleSet::default(),
            created_at: Utc::now(),
        };
        insert(&conn, &user).expect("insert");
        let dup = User {
            id: Uuid::new_v4(),
            ..user
        };
        assert!(insert(&conn, &dup).is_err());
    }
}
