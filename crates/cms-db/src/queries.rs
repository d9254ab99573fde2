use crate::Database;
use crate::models::{ComplaintRow, NewComplaint, UserRow};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};

const COMPLAINT_COLUMNS: &str =
    "c.id, c.title, c.description, c.category, c.created_at, c.complaint_status,
     u.id, u.username, u.email, u.role";

impl Database {
    // -- Users --

    /// Inserts a user and returns its generated id.
    pub fn create_user(&self, username: &str, email: &str, password_hash: &str, role: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, email, password, role) VALUES (?1, ?2, ?3, ?4)",
                (username, email, password_hash, role),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", &email))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", &id))
    }

    /// Returns false when no user has this id.
    pub fn set_user_role(&self, id: i64, role: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("UPDATE users SET role = ?1 WHERE id = ?2", (role, id))?;
            Ok(changed > 0)
        })
    }

    // -- Complaints --

    /// Inserts a complaint and returns its generated id. The owner must
    /// already exist; the foreign key rejects dangling user ids.
    pub fn insert_complaint(&self, complaint: &NewComplaint<'_>) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO complaints (title, description, category, complaint_status, created_at, user_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    complaint.title,
                    complaint.description,
                    complaint.category,
                    complaint.status,
                    complaint.created_at,
                    complaint.user_id,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_complaint(&self, id: i64) -> Result<Option<ComplaintRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {COMPLAINT_COLUMNS}
                 FROM complaints c
                 JOIN users u ON c.user_id = u.id
                 WHERE c.id = ?1"
            );
            let row = conn.query_row(&sql, [id], complaint_from_row).optional()?;
            Ok(row)
        })
    }

    pub fn get_complaints_by_user(&self, user_id: i64) -> Result<Vec<ComplaintRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {COMPLAINT_COLUMNS}
                 FROM complaints c
                 JOIN users u ON c.user_id = u.id
                 WHERE c.user_id = ?1
                 ORDER BY c.id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], complaint_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_all_complaints(&self) -> Result<Vec<ComplaintRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {COMPLAINT_COLUMNS}
                 FROM complaints c
                 JOIN users u ON c.user_id = u.id
                 ORDER BY c.id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], complaint_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Overwrites the status. Returns false when the complaint does not exist.
    pub fn update_complaint_status(&self, id: i64, status: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE complaints SET complaint_status = ?1 WHERE id = ?2",
                rusqlite::params![status, id],
            )?;
            Ok(changed > 0)
        })
    }
}

fn query_user(conn: &Connection, column: &str, key: &dyn rusqlite::ToSql) -> Result<Option<UserRow>> {
    // `column` is always one of our own literals, never caller input
    let sql = format!(
        "SELECT id, username, email, password, role, created_at FROM users WHERE {column} = ?1"
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([key], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                role: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn complaint_from_row(row: &Row<'_>) -> rusqlite::Result<ComplaintRow> {
    Ok(ComplaintRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        created_at: row.get(4)?,
        status: row.get(5)?,
        user_id: row.get(6)?,
        username: row.get(7)?,
        email: row.get(8)?,
        role: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_unique_violation;

    fn complaint(user_id: i64, title: &str) -> NewComplaint<'_> {
        NewComplaint {
            title,
            description: "water under the sink",
            category: "Plumbing",
            status: "OPEN",
            created_at: "2026-10-17T09:30:00+00:00",
            user_id,
        }
    }

    #[test]
    fn create_and_fetch_user() {
        let db = Database::open_in_memory().unwrap();
        let id = db.create_user("ana", "ana@example.com", "hash", "USER").unwrap();

        let by_email = db.get_user_by_email("ana@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, id);
        assert_eq!(by_email.role, "USER");

        let by_id = db.get_user_by_id(id).unwrap().unwrap();
        assert_eq!(by_id.username, "ana");
        assert!(db.get_user_by_id(id + 1).unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_a_unique_violation() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("ana", "ana@example.com", "hash", "USER").unwrap();

        let err = db
            .create_user("other", "ana@example.com", "hash", "USER")
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn complaint_for_missing_user_is_rejected_by_foreign_key() {
        let db = Database::open_in_memory().unwrap();

        assert!(db.insert_complaint(&complaint(42, "Leak")).is_err());
        assert!(db.get_all_complaints().unwrap().is_empty());
    }

    #[test]
    fn complaints_are_filtered_by_owner() {
        let db = Database::open_in_memory().unwrap();
        let ana = db.create_user("ana", "ana@example.com", "hash", "USER").unwrap();
        let bob = db.create_user("bob", "bob@example.com", "hash", "USER").unwrap();

        db.insert_complaint(&complaint(ana, "Leak")).unwrap();
        db.insert_complaint(&complaint(bob, "Noise")).unwrap();
        db.insert_complaint(&complaint(ana, "Draft")).unwrap();

        let mine = db.get_complaints_by_user(ana).unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|c| c.user_id == ana && c.email == "ana@example.com"));
        assert_eq!(mine[0].title, "Leak");
        assert_eq!(mine[1].title, "Draft");

        assert_eq!(db.get_all_complaints().unwrap().len(), 3);
    }

    #[test]
    fn update_status_reports_missing_rows() {
        let db = Database::open_in_memory().unwrap();
        let ana = db.create_user("ana", "ana@example.com", "hash", "USER").unwrap();
        let id = db.insert_complaint(&complaint(ana, "Leak")).unwrap();

        assert!(db.update_complaint_status(id, "RESOLVED").unwrap());
        assert_eq!(db.get_complaint(id).unwrap().unwrap().status, "RESOLVED");
        assert!(!db.update_complaint_status(id + 100, "RESOLVED").unwrap());
    }

    #[test]
    fn set_role_promotes_user() {
        let db = Database::open_in_memory().unwrap();
        let id = db.create_user("root", "root@example.com", "hash", "USER").unwrap();

        assert!(db.set_user_role(id, "ADMIN").unwrap());
        assert_eq!(db.get_user_by_id(id).unwrap().unwrap().role, "ADMIN");
        assert!(!db.set_user_role(id + 1, "ADMIN").unwrap());
    }
}
