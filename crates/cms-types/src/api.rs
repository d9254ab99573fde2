use serde::{Deserialize, Serialize};

use crate::models::{ComplaintStatus, Role};

// -- JWT Claims --

/// JWT claims issued on register/login and checked by the API middleware.
/// `sub` is the account email; `id` and `role` are what clients read back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub id: i64,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    #[serde(alias = "name")]
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
}

// -- Complaints --

/// Unknown fields (such as a caller-chosen `status`) are ignored: new
/// complaints always start out open.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComplaintRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(alias = "user_id")]
    pub user_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusUpdateRequest {
    pub status: ComplaintStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_accepts_name_alias() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"name":"ana","email":"ana@example.com","password":"hunter22"}"#,
        )
        .unwrap();
        assert_eq!(req.username, "ana");
    }

    #[test]
    fn create_complaint_accepts_both_owner_spellings_and_ignores_status() {
        let camel: CreateComplaintRequest = serde_json::from_str(
            r#"{"title":"Leak","description":"Sink","category":"Plumbing","userId":1,"status":"CLOSED"}"#,
        )
        .unwrap();
        assert_eq!(camel.user_id, 1);

        let snake: CreateComplaintRequest = serde_json::from_str(
            r#"{"title":"Leak","category":"Plumbing","user_id":7}"#,
        )
        .unwrap();
        assert_eq!(snake.user_id, 7);
        assert_eq!(snake.description, "");
    }
}
