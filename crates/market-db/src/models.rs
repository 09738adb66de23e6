//! Database row types. These map directly to SQLite rows.
//! Distinct from market-types API models to keep the DB layer independent.

/// Reserved user id that reviews are repointed to when their user is deleted.
pub const NO_OWNER_ID: i64 = 0;

#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub password: String,
    pub picture: Vec<u8>,
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunityRow {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub service: bool,
    pub price: i64,
    pub upload_date: String,
    pub description: String,
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRow {
    pub id: i64,
    pub rating: i64,
    pub content: String,
    pub reviewer_id: i64,
    pub owner_id: i64,
}

/// Stored credential looked up by phone at login.
pub struct CredentialRow {
    pub id: i64,
    pub password: String,
}

/// Every mutable user column. Used for create (rating ignored) and full-overwrite update.
pub struct UserFields {
    pub name: String,
    pub phone: String,
    pub password: String,
    pub picture: Vec<u8>,
    pub rating: f64,
}

/// Every mutable product column; the owner is passed separately.
pub struct ProductFields {
    pub name: String,
    pub service: bool,
    pub price: i64,
    pub upload_date: String,
    pub description: String,
}

/// Result of a statement that can miss its target or hit a uniqueness constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome<T = ()> {
    Written(T),
    /// The row addressed by id, or a referenced row, does not exist.
    Missing,
    /// A unique key (phone, membership or follow edge) already exists.
    Conflict,
}
