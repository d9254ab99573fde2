//! Database row types. These map directly to SQLite rows and stay
//! independent of the cms-types API models; enum columns are kept as their
//! stored text.

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub created_at: String,
}

/// A complaint joined with its owner.
pub struct ComplaintRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub created_at: String,
    pub status: String,
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
}

pub struct NewComplaint<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub category: &'a str,
    pub status: &'a str,
    pub created_at: &'a str,
    pub user_id: i64,
}
