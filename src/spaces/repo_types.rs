use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "space_type", rename_all = "UPPERCASE")]
pub enum SpaceType {
    Room,
    Table,
}

/// A bookable room or table.
#[derive(Debug, Clone, FromRow)]
pub struct Space {
    pub id: Uuid,
    pub name: String,
    pub capacity: i32,
    pub space_type: SpaceType,
    pub image_key: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceWrite {
    pub name: String,
    pub capacity: i32,
    pub space_type: SpaceType,
}
