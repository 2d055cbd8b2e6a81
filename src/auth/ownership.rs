use crate::db::models::{User, Video};
use crate::error::{AppError, AppResult};

/// A record with a single, immutable owning user.
pub trait Owned {
    fn owner_id(&self) -> &str;
}

impl Owned for Video {
    fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

pub fn is_owner<R: Owned + ?Sized>(user: &User, resource: &R) -> bool {
    user.id == resource.owner_id()
}

pub fn ensure_owner<R: Owned + ?Sized>(user: &User, resource: &R) -> AppResult<()> {
    if is_owner(user, resource) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You are not allowed to modify this resource".into(),
        ))
    }
}
