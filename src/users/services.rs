use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{
    dto::{UserResponse, UserUpdateRequest},
    repo_types::{Role, User, UserWrite},
};
use crate::{
    auth::{
        password::hash_password,
        policy::{authorize, Action, Principal},
        services::{normalize_email, validate_password, validate_username},
    },
    config::AdminSeed,
    error::{unique_or_internal, AppError},
    images::{
        form::JsonWithFile,
        services::{delete_image, image_url, upload_image, validate, UploadItem},
    },
    state::AppState,
};

pub const USER_PART: &str = "user";
const IMAGE_PREFIX: &str = "users";

async fn to_response(st: &AppState, user: User) -> UserResponse {
    let url = image_url(st.storage.as_ref(), user.image_key.as_deref()).await;
    UserResponse::new(user, url)
}

async fn load(db: &PgPool, id: Uuid) -> Result<User, AppError> {
    User::find_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::not_found("User", id))
}

/// Validates the request against the stored row and builds the new column values.
fn build_write(
    current: &User,
    req: &UserUpdateRequest,
    allow_role: bool,
) -> Result<UserWrite, AppError> {
    let username = validate_username(&req.username)?;
    let email = normalize_email(&req.email)?;
    let password_hash = match req.password.as_deref().filter(|p| !p.is_empty()) {
        Some(plain) => {
            validate_password(plain)?;
            hash_password(plain)?
        }
        None => current.password_hash.clone(),
    };
    let role = match req.role {
        Some(role) if allow_role => role,
        _ => current.role,
    };
    Ok(UserWrite {
        username,
        email,
        password_hash,
        role,
    })
}

async fn replace_image(
    st: &AppState,
    user: User,
    file: UploadItem,
) -> Result<User, AppError> {
    let key = upload_image(st.storage.as_ref(), IMAGE_PREFIX, user.id, file).await?;
    let updated = match User::set_image_key(&st.db, user.id, Some(&key)).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            delete_image(st.storage.as_ref(), &key).await;
            return Err(AppError::not_found("User", user.id));
        }
        Err(e) => {
            delete_image(st.storage.as_ref(), &key).await;
            return Err(e.into());
        }
    };
    if let Some(old) = &user.image_key {
        delete_image(st.storage.as_ref(), old).await;
    }
    Ok(updated)
}

async fn apply_update(
    st: &AppState,
    id: Uuid,
    form: JsonWithFile,
    allow_role: bool,
) -> Result<UserResponse, AppError> {
    let req = form.parse::<UserUpdateRequest>(USER_PART)?;
    if let Some(file) = &form.file {
        validate(file)?;
    }
    let current = load(&st.db, id).await?;
    let data = build_write(&current, &req, allow_role)?;

    let mut user = User::update(&st.db, id, &data)
        .await
        .map_err(|e| unique_or_internal(e, "Username or email is already taken"))?
        .ok_or_else(|| AppError::not_found("User", id))?;
    if let Some(file) = form.file {
        user = replace_image(st, user, file).await?;
    }
    info!(user_id = %id, "user updated");
    Ok(to_response(st, user).await)
}

pub async fn me(st: &AppState, principal: &Principal) -> Result<UserResponse, AppError> {
    let user = load(&st.db, principal.id).await?;
    Ok(to_response(st, user).await)
}

pub async fn update_me(
    st: &AppState,
    principal: &Principal,
    form: JsonWithFile,
) -> Result<UserResponse, AppError> {
    apply_update(st, principal.id, form, false).await
}

pub async fn list(st: &AppState, principal: &Principal) -> Result<Vec<UserResponse>, AppError> {
    authorize(principal, Action::ManageUsers, None)?;
    let users = User::list(&st.db).await?;
    let mut out = Vec::with_capacity(users.len());
    for u in users {
        out.push(to_response(st, u).await);
    }
    Ok(out)
}

pub async fn get(st: &AppState, principal: &Principal, id: Uuid) -> Result<UserResponse, AppError> {
    authorize(principal, Action::ManageUsers, None)?;
    let user = load(&st.db, id).await?;
    Ok(to_response(st, user).await)
}

pub async fn update(
    st: &AppState,
    principal: &Principal,
    id: Uuid,
    form: JsonWithFile,
) -> Result<UserResponse, AppError> {
    authorize(principal, Action::ManageUsers, None)?;
    apply_update(st, id, form, true).await
}

/// Reservations of the user are removed by the foreign key cascade.
pub async fn delete(st: &AppState, principal: &Principal, id: Uuid) -> Result<(), AppError> {
    authorize(principal, Action::ManageUsers, None)?;
    let user = load(&st.db, id).await?;
    if !User::delete(&st.db, id).await? {
        return Err(AppError::not_found("User", id));
    }
    if let Some(key) = &user.image_key {
        delete_image(st.storage.as_ref(), key).await;
    }
    info!(user_id = %id, by = %principal.id, "user deleted");
    Ok(())
}

pub async fn set_image(
    st: &AppState,
    principal: &Principal,
    id: Uuid,
    form: JsonWithFile,
) -> Result<UserResponse, AppError> {
    authorize(principal, Action::ManageUsers, None)?;
    let file = form
        .file
        .ok_or_else(|| AppError::Upload("file: Image file is required".into()))?;
    validate(&file)?;
    let user = load(&st.db, id).await?;
    let user = replace_image(st, user, file).await?;
    info!(user_id = %id, "user image replaced");
    Ok(to_response(st, user).await)
}

pub async fn remove_image(
    st: &AppState,
    principal: &Principal,
    id: Uuid,
) -> Result<UserResponse, AppError> {
    authorize(principal, Action::ManageUsers, None)?;
    let user = load(&st.db, id).await?;
    let Some(key) = user.image_key.clone() else {
        return Ok(to_response(st, user).await);
    };
    let user = User::set_image_key(&st.db, id, None)
        .await?
        .ok_or_else(|| AppError::not_found("User", id))?;
    delete_image(st.storage.as_ref(), &key).await;
    info!(user_id = %id, "user image removed");
    Ok(to_response(st, user).await)
}

/// Creates the configured administrator unless that email is already registered.
pub async fn ensure_admin(db: &PgPool, seed: &AdminSeed) -> anyhow::Result<()> {
    let email = seed.email.trim().to_lowercase();
    if User::find_by_email(db, &email).await?.is_some() {
        return Ok(());
    }
    let admin = User::create(
        db,
        &UserWrite {
            username: seed.username.trim().to_string(),
            email,
            password_hash: hash_password(&seed.password)?,
            role: Role::Admin,
        },
    )
    .await?;
    info!(user_id = %admin.id, email = %admin.email, "bootstrap admin created");
    Ok(())
}
