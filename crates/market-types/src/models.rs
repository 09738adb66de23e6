use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Public view of a user. The stored credential never leaves the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub phone: String,
    /// Base64 (standard alphabet) encoded picture bytes.
    pub picture: String,
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub service: bool,
    pub price: i64,
    pub upload_date: NaiveDate,
    pub description: String,
    pub user_id: i64,
}

/// `owner_id` is the reviewed user, `reviewer_id` the author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub rating: i64,
    pub content: String,
    pub reviewer_id: i64,
    pub owner_id: i64,
}
