use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,                   // unique user ID
    pub username: String,           // unique login name
    pub email: String,              // unique, lower-cased
    #[serde(skip_serializing)]
    pub password_hash: String,      // Argon2 hash, not exposed in JSON
    pub role: Role,
    pub image_key: Option<String>,  // object key in the image bucket
    pub created_at: OffsetDateTime, // creation timestamp
}

/// Column values for an insert or a full update.
#[derive(Debug, Clone)]
pub struct UserWrite {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}
