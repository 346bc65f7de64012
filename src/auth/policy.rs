//! Role and ownership checks. Every service operation that needs the caller
//! receives a [`Principal`] explicitly and consults [`authorize`] first.

use uuid::Uuid;

use crate::{error::AppError, users::repo_types::Role};

/// The authenticated actor performing an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ListAllReservations,
    ViewReservation,
    CancelReservation,
    DeleteReservation,
    ManageSpaces,
    ManageUsers,
}

/// Admins may do anything. Regular users may only view or cancel what they own.
pub fn is_allowed(principal: &Principal, action: Action, owner: Option<Uuid>) -> bool {
    if principal.is_admin() {
        return true;
    }
    match action {
        Action::ViewReservation | Action::CancelReservation => owner == Some(principal.id),
        Action::ListAllReservations
        | Action::DeleteReservation
        | Action::ManageSpaces
        | Action::ManageUsers => false,
    }
}

pub fn authorize(principal: &Principal, action: Action, owner: Option<Uuid>) -> Result<(), AppError> {
    if is_allowed(principal, action, owner) {
        return Ok(());
    }
    let msg = match action {
        Action::CancelReservation => "You cannot cancel a reservation that doesn't belong to you",
        Action::ViewReservation => "You cannot view a reservation that doesn't belong to you",
        _ => "Administrator privileges required",
    };
    Err(AppError::Forbidden(msg.into()))
}
