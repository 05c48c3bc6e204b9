//! User row model.

use adflow_core::{Role, User};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::store::StoreError;

/// A row of the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::from_str(&row.role)
            .ok_or_else(|| StoreError::Corrupt(format!("user {} has role '{}'", row.id, row.role)))?;
        Ok(User {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            role,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_row_conversion() {
        let row = UserRow {
            id: Uuid::new_v4(),
            email: "advertiser@example.com".to_string(),
            full_name: "Ada Advertiser".to_string(),
            role: "advertiser".to_string(),
            created_at: Utc::now(),
        };
        let user = User::try_from(row).unwrap();
        assert_eq!(user.role, Role::Advertiser);
    }

    #[test]
    fn test_unknown_role_is_corrupt() {
        let row = UserRow {
            id: Uuid::new_v4(),
            email: "root@example.com".to_string(),
            full_name: "Root".to_string(),
            role: "admin".to_string(),
            created_at: Utc::now(),
        };
        assert!(matches!(User::try_from(row), Err(StoreError::Corrupt(_))));
    }
}
