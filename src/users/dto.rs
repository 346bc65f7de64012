use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Role, User};

/// JSON carried in the `user` part of a profile update.
#[derive(Debug, Deserialize)]
pub struct UserUpdateRequest {
    pub username: String,
    pub email: String,
    /// Keeps the current password when absent or blank.
    pub password: Option<String>,
    /// Honoured only on the admin endpoint.
    pub role: Option<Role>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl UserResponse {
    pub fn new(user: User, image_url: Option<String>) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            image_url,
            created_at: user.created_at,
        }
    }
}
