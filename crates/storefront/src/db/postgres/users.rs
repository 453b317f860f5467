//! Accounts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bazaar_core::{Email, UserId, UserRole, Username};

use super::PgStore;
use crate::db::{RepositoryError, UserStore, conflict_on_unique};
use crate::models::{NewUser, User};

const USER_COLUMNS: &str = "id, username, email, role, date_joined";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    username: String,
    email: String,
    role: UserRole,
    date_joined: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let username = Username::parse(&row.username).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid username in database: {e}"))
        })?;
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        Ok(Self {
            id: row.id,
            username,
            email,
            role: row.role,
            date_joined: row.date_joined,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let sql = format!(
            "INSERT INTO app_user (username, email, password_hash, role) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        let row: UserRow = sqlx::query_as(&sql)
            .bind(user.username.as_str())
            .bind(user.email.as_str())
            .bind(&user.password_hash)
            .bind(user.role)
            .fetch_one(self.pool())
            .await
            .map_err(|e| conflict_on_unique(e, "username"))?;
        row.try_into()
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM app_user WHERE id = $1");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS}, password_hash FROM app_user WHERE username = $1");
        let row: Option<CredentialRow> = sqlx::query_as(&sql)
            .bind(username)
            .fetch_optional(self.pool())
            .await?;
        match row {
            Some(r) => Ok(Some((r.user.try_into()?, r.password_hash))),
            None => Ok(None),
        }
    }

    async fn set_role(&self, id: UserId, role: UserRole) -> Result<User, RepositoryError> {
        let sql = format!("UPDATE app_user SET role = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(role)
            .fetch_optional(self.pool())
            .await?;
        row.ok_or(RepositoryError::NotFound)?.try_into()
    }
}
