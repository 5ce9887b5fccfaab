use std::sync::Arc;

use sqlx::{Error, Sqlite, SqlitePool, Transaction};

use crate::configs::Storage;
use crate::models::User;

pub struct UserRepository {
    storage: Arc<Storage>,
}

impl UserRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn get_pool(&self) -> &SqlitePool {
        self.storage.get_pool()
    }
}

impl UserRepository {
    // Insert or replace the user owning the given email
    pub async fn upsert_by_email(&self, item: &User, transaction: &mut Transaction<'_, Sqlite>) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO users (email, password, name)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE SET password = excluded.password, name = excluded.name
            "#,
        )
        .bind(&item.email)
        .bind(&item.password)
        .bind(&item.name)
        .execute(&mut **transaction)
        .await?;

        Ok(())
    }

    // Find user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(self.storage.get_pool())
            .await?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use crate::configs::{Database, SchemaManager};

    use super::*;

    async fn setup_test_db() -> Arc<Storage> {
        Arc::new(
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
        )
    }

    #[tokio::test]
    async fn test_find_user_by_email() {
        let storage = setup_test_db().await;

        let user = User {
            id: 0,
            email: "findme@example.com".to_string(),
            password: "secret123".to_string(),
            name: "Find Me".to_string(),
        };

        let repo = UserRepository::new(storage.clone());
        let mut tx = storage.get_pool().begin().await.unwrap();
        repo.upsert_by_email(&user, &mut tx).await.unwrap();
        tx.commit().await.unwrap();

        let found = repo.find_by_email("findme@example.com").await.unwrap().unwrap();
        assert!(found.id > 0);
        assert_eq!(found.name, "Find Me");

        assert!(repo.find_by_email("missing@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_user() {
        let storage = setup_test_db().await;
        let repo = UserRepository::new(storage.clone());

        let original = User {
            id: 0,
            email: "admin@example.com".to_string(),
            password: "first".to_string(),
            name: "First".to_string(),
        };
        let replacement = User {
            password: "second".to_string(),
            name: "Second".to_string(),
            ..original.clone()
        };

        let mut tx = storage.get_pool().begin().await.unwrap();
        repo.upsert_by_email(&original, &mut tx).await.unwrap();
        repo.upsert_by_email(&replacement, &mut tx).await.unwrap();
        tx.commit().await.unwrap();

        let found = repo.find_by_email("admin@example.com").await.unwrap().unwrap();
        assert_eq!(found.password, "second");
        assert_eq!(found.name, "Second");

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(storage.get_pool())
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }
}
