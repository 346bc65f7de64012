use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{SpaceRequest, SpaceResponse},
    repo_types::{Space, SpaceType},
};
use crate::{
    auth::policy::{authorize, Action, Principal},
    error::{unique_or_internal, AppError},
    images::{
        form::JsonWithFile,
        services::{delete_image, image_url, upload_image, validate},
    },
    state::AppState,
};

pub const SPACE_PART: &str = "space";
const IMAGE_PREFIX: &str = "spaces";
const DUPLICATE_NAME: &str = "A space with this name already exists";

async fn to_response(st: &AppState, space: Space) -> SpaceResponse {
    let url = image_url(st.storage.as_ref(), space.image_key.as_deref()).await;
    SpaceResponse::new(space, url)
}

pub async fn list(st: &AppState, space_type: Option<SpaceType>) -> Result<Vec<SpaceResponse>, AppError> {
    let spaces = Space::list(&st.db, space_type).await?;
    let mut out = Vec::with_capacity(spaces.len());
    for s in spaces {
        out.push(to_response(st, s).await);
    }
    Ok(out)
}

pub async fn get(st: &AppState, id: Uuid) -> Result<SpaceResponse, AppError> {
    let space = Space::find_by_id(&st.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Space", id))?;
    Ok(to_response(st, space).await)
}

pub async fn create(
    st: &AppState,
    principal: &Principal,
    form: JsonWithFile,
) -> Result<SpaceResponse, AppError> {
    authorize(principal, Action::ManageSpaces, None)?;
    let data = form.parse::<SpaceRequest>(SPACE_PART)?.validate()?;
    if let Some(file) = &form.file {
        validate(file)?;
    }

    let id = Uuid::new_v4();
    let image_key = match form.file {
        Some(file) => Some(upload_image(st.storage.as_ref(), IMAGE_PREFIX, id, file).await?),
        None => None,
    };

    let space = match Space::create(&st.db, id, &data, image_key.as_deref()).await {
        Ok(s) => s,
        Err(e) => {
            if let Some(key) = &image_key {
                delete_image(st.storage.as_ref(), key).await;
            }
            let err = unique_or_internal(e, DUPLICATE_NAME);
            if matches!(err, AppError::AlreadyExists(_)) {
                warn!(name = %data.name, "space name taken");
            }
            return Err(err);
        }
    };
    info!(space_id = %space.id, name = %space.name, "space created");
    Ok(to_response(st, space).await)
}

/// Full replacement of the space's fields. A new file replaces the stored image.
pub async fn update(
    st: &AppState,
    principal: &Principal,
    id: Uuid,
    form: JsonWithFile,
) -> Result<SpaceResponse, AppError> {
    authorize(principal, Action::ManageSpaces, None)?;
    let data = form.parse::<SpaceRequest>(SPACE_PART)?.validate()?;
    if let Some(file) = &form.file {
        validate(file)?;
    }

    let existing = Space::find_by_id(&st.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Space", id))?;

    let new_key = match form.file {
        Some(file) => Some(upload_image(st.storage.as_ref(), IMAGE_PREFIX, id, file).await?),
        None => None,
    };
    let image_key = new_key.as_deref().or(existing.image_key.as_deref());

    let updated = match Space::update(&st.db, id, &data, image_key).await {
        Ok(Some(s)) => s,
        Ok(None) => return Err(AppError::not_found("Space", id)),
        Err(e) => {
            if let Some(key) = &new_key {
                delete_image(st.storage.as_ref(), key).await;
            }
            return Err(unique_or_internal(e, DUPLICATE_NAME));
        }
    };

    if let (Some(_), Some(old)) = (&new_key, &existing.image_key) {
        delete_image(st.storage.as_ref(), old).await;
    }
    info!(space_id = %id, "space updated");
    Ok(to_response(st, updated).await)
}

/// Reservations of the space are removed by the foreign key cascade.
pub async fn delete(st: &AppState, principal: &Principal, id: Uuid) -> Result<(), AppError> {
    authorize(principal, Action::ManageSpaces, None)?;
    let deleted = Space::delete(&st.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Space", id))?;
    if let Some(key) = &deleted.image_key {
        delete_image(st.storage.as_ref(), key).await;
    }
    info!(space_id = %id, name = %deleted.name, "space deleted");
    Ok(())
}
