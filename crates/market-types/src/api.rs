use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// -- Token claims --

/// Claims carried by the bearer token issued on login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub iat: usize,
    pub nbf: usize,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub id: i64,
    pub token: String,
}

// -- Users --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub name: String,
    pub phone: String,
    pub password: String,
    #[serde(default)]
    pub picture: String,
}

/// Full overwrite: any field left out is written back as its zero value.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub name: String,
    pub phone: String,
    pub password: String,
    pub picture: String,
    pub rating: f64,
}

// -- Products --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub service: bool,
    pub price: i64,
    /// Defaults to today (UTC).
    #[serde(default)]
    pub upload_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
}

/// Full overwrite, same rules as [`UpdateUserRequest`]. The owner is fixed.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpdateProductRequest {
    pub name: String,
    pub service: bool,
    pub price: i64,
    pub upload_date: NaiveDate,
    pub description: String,
}

// -- Reviews --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateReviewRequest {
    pub rating: i64,
    #[serde(default)]
    pub content: String,
    pub reviewer_id: i64,
}

// -- Relations --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinCommunityRequest {
    pub community_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FollowRequest {
    pub follower_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_user_missing_fields_are_zeroed() {
        let req: UpdateUserRequest = serde_json::from_str(r#"{"name":"Ada"}"#).unwrap();
        assert_eq!(req.name, "Ada");
        assert_eq!(req.phone, "");
        assert_eq!(req.password, "");
        assert_eq!(req.rating, 0.0);
    }

    #[test]
    fn update_product_missing_date_is_epoch() {
        let req: UpdateProductRequest = serde_json::from_str(r#"{"price":10}"#).unwrap();
        assert_eq!(req.upload_date, NaiveDate::default());
        assert!(!req.service);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let res = serde_json::from_str::<CreateProductRequest>(
            r#"{"name":"x","price":1,"user_id":7}"#,
        );
        assert!(res.is_err());
    }
}
