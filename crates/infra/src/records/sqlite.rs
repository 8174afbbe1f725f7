//! sqlite-backed record store (`sqlite` feature).

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use filequeue_core::{FileChanges, FileFilter, FileId, FileRecord, NewFile, NewUser, User, UserId};

use super::{RecordStore, StoreError};

const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
)"#;

const CREATE_FILES: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    size INTEGER NOT NULL,
    type TEXT NOT NULL,
    path TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)"#;

const FILE_COLUMNS: &str = "id, user_id, name, size, type, path, created_at, updated_at";
const USER_COLUMNS: &str = "id, username, email, password_hash, created_at";

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Duplicate(db.message().to_string())
            }
            _ => StoreError::Backend(e.to_string()),
        }
    }
}

/// Record store persisted in a sqlite database.
#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Connect (creating the database file if needed) and ensure the schema.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        // Every connection to `:memory:` is a separate database.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_USERS).execute(&self.pool).await?;
        sqlx::query(CREATE_FILES).execute(&self.pool).await?;
        tracing::debug!("record store schema ready");
        Ok(())
    }
}

fn to_i64(value: u64, field: &str) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Backend(format!("{field} out of range: {value}")))
}

fn to_u64(value: i64, field: &str) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Backend(format!("{field} out of range: {value}")))
}

fn user_from_row(row: &SqliteRow) -> Result<User, StoreError> {
    Ok(User {
        id: UserId::new(to_u64(row.try_get("id")?, "id")?),
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn file_from_row(row: &SqliteRow) -> Result<FileRecord, StoreError> {
    Ok(FileRecord {
        id: FileId::new(to_u64(row.try_get("id")?, "id")?),
        user_id: UserId::new(to_u64(row.try_get("user_id")?, "user_id")?),
        name: row.try_get("name")?,
        size: to_u64(row.try_get("size")?, "size")?,
        file_type: row.try_get("type")?,
        path: row.try_get("path")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let now = Utc::now();
        let res = sqlx::query(
            "INSERT INTO users (username, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = UserId::new(to_u64(res.last_insert_rowid(), "id")?);
        Ok(user.into_user(id, now))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn create_file(&self, file: NewFile) -> Result<FileRecord, StoreError> {
        let now = Utc::now();
        let res = sqlx::query(
            "INSERT INTO files (user_id, name, size, type, path, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(to_i64(file.user_id.get(), "user_id")?)
        .bind(&file.name)
        .bind(to_i64(file.size, "size")?)
        .bind(&file.file_type)
        .bind(&file.path)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = FileId::new(to_u64(res.last_insert_rowid(), "id")?);
        Ok(file.into_record(id, now))
    }

    async fn list_files(&self, filter: FileFilter) -> Result<Vec<FileRecord>, StoreError> {
        let rows = match filter.user_id {
            Some(user_id) => {
                sqlx::query(&format!(
                    "SELECT {FILE_COLUMNS} FROM files WHERE user_id = ? ORDER BY id"
                ))
                .bind(to_i64(user_id.get(), "user_id")?)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!("SELECT {FILE_COLUMNS} FROM files ORDER BY id"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.iter().map(file_from_row).collect()
    }

    async fn find_file(&self, id: FileId) -> Result<Option<FileRecord>, StoreError> {
        let row = sqlx::query(&format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?"))
            .bind(to_i64(id.get(), "id")?)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(file_from_row).transpose()
    }

    async fn update_file(
        &self,
        id: FileId,
        changes: FileChanges,
    ) -> Result<Option<FileRecord>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?"))
            .bind(to_i64(id.get(), "id")?)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut record = file_from_row(&row)?;
        changes.apply(&mut record, Utc::now());

        sqlx::query("UPDATE files SET name = ?, size = ?, type = ?, path = ?, updated_at = ? WHERE id = ?")
            .bind(&record.name)
            .bind(to_i64(record.size, "size")?)
            .bind(&record.file_type)
            .bind(&record.path)
            .bind(record.updated_at)
            .bind(to_i64(id.get(), "id")?)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(record))
    }

    async fn delete_file(&self, id: FileId) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(to_i64(id.get(), "id")?)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteRecordStore {
        SqliteRecordStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_maps_to_duplicate() {
        let store = store().await;
        let user = NewUser::new("u", "e@x.com", "hash").unwrap();

        let created = store.create_user(user.clone()).await.unwrap();
        assert!(matches!(
            store.create_user(user).await.unwrap_err(),
            StoreError::Duplicate(_)
        ));

        let found = store.find_user_by_email("e@x.com").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.password_hash, "hash");
    }

    #[tokio::test]
    async fn file_crud_round_trip() {
        let store = store().await;
        let new = NewFile::new(UserId::new(1), "a.txt", 10, "text/plain", "/uploads/a.txt").unwrap();

        let created = store.create_file(new).await.unwrap();
        let fetched = store.find_file(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "a.txt");
        assert_eq!(fetched.size, 10);

        let updated = store
            .update_file(
                created.id,
                FileChanges {
                    path: Some("/uploads/b.txt".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.path, "/uploads/b.txt");
        assert_eq!(updated.name, "a.txt");

        assert_eq!(store.list_files(FileFilter::owned_by(UserId::new(1))).await.unwrap().len(), 1);
        assert!(store.list_files(FileFilter::owned_by(UserId::new(2))).await.unwrap().is_empty());

        assert!(store.delete_file(created.id).await.unwrap());
        assert!(store.find_file(created.id).await.unwrap().is_none());
        assert!(store.update_file(created.id, FileChanges::default()).await.unwrap().is_none());
    }
}
