use std::sync::Arc;

use anyhow::{Context, anyhow};

use crate::configs::Admin;
use crate::models::User;
use crate::repositories::UserRepository;
use crate::services::AuthService;

/// Writes the configured administrator, replacing any account with the same email.
pub async fn seed_admin(
    admin: &Admin,
    user_repository: &Arc<UserRepository>,
    auth_service: &AuthService,
) -> anyhow::Result<User> {
    let password = auth_service
        .hash(&admin.password)
        .map_err(|e| anyhow!("failed to hash admin password: {}", e))?;

    let user = User {
        id: 0,
        email: admin.email.clone(),
        password,
        name: admin.name.clone(),
    };

    let mut transaction = user_repository.get_pool().begin().await?;
    user_repository.upsert_by_email(&user, &mut transaction).await?;
    transaction.commit().await?;

    let seeded = user_repository
        .find_by_email(&admin.email)
        .await?
        .context("seeded admin account is missing")?;

    tracing::info!("admin account {} is ready", seeded.email);

    Ok(seeded)
}

#[cfg(test)]
mod tests {
    use crate::configs::{Database, SchemaManager, Storage};

    use super::*;

    #[tokio::test]
    async fn test_seed_admin_is_idempotent() {
        let storage = Arc::new(
            Storage::new(
                Database {
                    migration_path: None,
                    clean_start: true,
                    url: String::from("sqlite::memory:"),
                },
                SchemaManager::default(),
            )
            .await
            .unwrap(),
        );
        let user_repository = Arc::new(UserRepository::new(storage));
        let auth_service = AuthService::new();
        let mut admin = Admin {
            email: "admin@sensorhub.local".to_string(),
            password: "first".to_string(),
            name: "Admin".to_string(),
        };

        let first = seed_admin(&admin, &user_repository, &auth_service).await.unwrap();

        admin.password = "second".to_string();
        let second = seed_admin(&admin, &user_repository, &auth_service).await.unwrap();

        assert_eq!(first.id, second.id);
        assert!(auth_service.verify(&second, "second").unwrap());
        assert!(!auth_service.verify(&second, "first").unwrap());
    }
}
