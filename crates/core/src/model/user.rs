use thiserror::Error;

use crate::model::ids::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UserError {
    #[error("display name cannot be empty")]
    EmptyName,
}

/// A learner as known to the platform. Identity comes from the auth layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    display_name: String,
}

impl User {
    /// # Errors
    ///
    /// Returns `UserError::EmptyName` for a blank display name.
    pub fn new(id: UserId, display_name: impl Into<String>) -> Result<Self, UserError> {
        let display_name = display_name.into();
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(UserError::EmptyName);
        }
        Ok(Self {
            id,
            display_name: display_name.to_owned(),
        })
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_display_name() {
        let user = User::new(UserId::new(1), "  Ada Lovelace ").unwrap();
        assert_eq!(user.display_name(), "Ada Lovelace");
        assert_eq!(User::new(UserId::new(1), " ").unwrap_err(), UserError::EmptyName);
    }
}
