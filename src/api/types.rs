use serde::{Deserialize, Serialize};

use crate::capture::types::MarkResult;

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub user: AuthenticatedUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub assigned_class: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub msg: String,
}

/// Body of `GET /attendance/mark/{uuid}`. The backend answers a duplicate
/// mark with 200 and `already_marked` instead of creating a second record.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkResponse {
    pub msg: String,
    pub student: StudentIdentity,
    #[serde(default)]
    pub already_marked: bool,
    #[serde(default)]
    pub marked_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StudentIdentity {
    pub name: String,
    pub roll_no: String,
    #[serde(rename = "class")]
    pub class_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

impl MarkResponse {
    pub fn into_result(self) -> MarkResult {
        if self.already_marked {
            MarkResult::Failure { reason: self.msg }
        } else {
            MarkResult::Success {
                message: self.msg,
                student_name: self.student.name,
                roll_number: self.student.roll_no,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_mark_response_is_success() {
        let body = r#"{
            "msg": "Attendance marked successfully",
            "student": {"name": "Alice", "roll_no": "10A001", "class": "10A"},
            "marked_at": "2026-08-07 09:14:02"
        }"#;
        let response: MarkResponse = serde_json::from_str(body).unwrap();
        assert!(!response.already_marked);
        assert_eq!(
            response.into_result(),
            MarkResult::Success {
                message: "Attendance marked successfully".to_string(),
                student_name: "Alice".to_string(),
                roll_number: "10A001".to_string(),
            }
        );
    }

    #[test]
    fn duplicate_mark_response_is_failure_with_backend_message() {
        let body = r#"{
            "msg": "Attendance already marked for today",
            "student": {"name": "Alice", "roll_no": "10A001", "class": "10A"},
            "already_marked": true
        }"#;
        let response: MarkResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            response.into_result(),
            MarkResult::Failure {
                reason: "Attendance already marked for today".to_string()
            }
        );
    }

    #[test]
    fn login_response_carries_tokens_and_identity() {
        let body = r#"{
            "access_token": "header.payload.sig",
            "refresh_token": "header.payload2.sig2",
            "token_type": "bearer",
            "user": {
                "id": 7,
                "username": "mr_jones",
                "email": "jones@school.example",
                "role": "teacher",
                "assigned_class": "10A"
            }
        }"#;
        let response: LoginResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.token_type, "bearer");
        assert_eq!(response.user.role, "teacher");
        assert_eq!(response.user.assigned_class.as_deref(), Some("10A"));
    }

    #[test]
    fn rejection_detail_is_plain() {
        let body = r#"{"detail": "Invalid QR Code"}"#;
        let detail: ErrorDetail = serde_json::from_str(body).unwrap();
        assert_eq!(detail.detail, "Invalid QR Code");
    }
}
