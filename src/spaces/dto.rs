use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Space, SpaceType, SpaceWrite};
use crate::error::AppError;

pub const MAX_NAME_LEN: usize = 60;

/// JSON carried in the `space` part of the multipart body.
#[derive(Debug, Deserialize)]
pub struct SpaceRequest {
    pub name: Option<String>,
    pub capacity: Option<i32>,
    #[serde(rename = "type")]
    pub space_type: Option<SpaceType>,
}

impl SpaceRequest {
    pub fn validate(&self) -> Result<SpaceWrite, AppError> {
        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            return Err(AppError::Validation("name: Name is required".into()));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(AppError::Validation(
                "name: Name must be at most 60 characters".into(),
            ));
        }
        let capacity = self
            .capacity
            .ok_or_else(|| AppError::Validation("capacity: Capacity is required".into()))?;
        if capacity < 1 {
            return Err(AppError::Validation(
                "capacity: Capacity must be at least 1".into(),
            ));
        }
        let space_type = self
            .space_type
            .ok_or_else(|| AppError::Validation("type: Space type is required".into()))?;
        Ok(SpaceWrite {
            name: name.to_string(),
            capacity,
            space_type,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SpaceFilter {
    #[serde(rename = "type")]
    pub space_type: Option<SpaceType>,
}

#[derive(Debug, Serialize)]
pub struct SpaceResponse {
    pub id: Uuid,
    pub name: String,
    pub capacity: i32,
    #[serde(rename = "type")]
    pub space_type: SpaceType,
    pub image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl SpaceResponse {
    pub fn new(space: Space, image_url: Option<String>) -> Self {
        Self {
            id: space.id,
            name: space.name,
            capacity: space.capacity,
            space_type: space.space_type,
            image_url,
            created_at: space.created_at,
        }
    }
}
