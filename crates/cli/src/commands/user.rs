//! Account management commands.

use bazaar_core::UserRole;
use bazaar_storefront::db::{PgStore, UserStore};
use bazaar_storefront::services::AuthService;

use super::{CliError, connect};

/// Create an account with the given role.
pub async fn create(
    username: &str,
    email: &str,
    password: &str,
    role: &str,
) -> Result<(), CliError> {
    let role: UserRole = role.parse()?;
    let store = PgStore::new(connect().await?);

    let user = AuthService::new(&store)
        .create_user(username, email, password, role)
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, %role, "Account created");
    Ok(())
}

/// Change the role of an existing account.
pub async fn set_role(username: &str, role: &str) -> Result<(), CliError> {
    let role: UserRole = role.parse()?;
    let store = PgStore::new(connect().await?);

    let (user, _) = store
        .find_credentials(username.trim())
        .await?
        .ok_or_else(|| CliError::UserNotFound(username.to_owned()))?;

    let previous = user.role;
    let user = store.set_role(user.id, role).await?;
    tracing::info!(
        user_id = %user.id,
        username = %user.username,
        from = %previous,
        to = %user.role,
        "Role changed"
    );
    Ok(())
}
