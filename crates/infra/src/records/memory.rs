use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use filequeue_core::{
    Entity, FileChanges, FileFilter, FileId, FileRecord, NewFile, NewUser, User, UserId,
};

use super::{RecordStore, StoreError};

/// Id-keyed table with its own id sequence.
#[derive(Debug)]
struct Table<E: Entity> {
    inner: RwLock<TableState<E>>,
}

#[derive(Debug)]
struct TableState<E: Entity> {
    rows: BTreeMap<E::Id, E>,
    next_id: u64,
}

impl<E> Table<E>
where
    E: Entity + Clone,
    E::Id: From<u64>,
{
    fn new() -> Self {
        Self {
            inner: RwLock::new(TableState {
                rows: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Insert a row built from a fresh id, unless `conflict` finds a clash.
    fn insert_with(
        &self,
        conflict: impl Fn(&E) -> bool,
        build: impl FnOnce(E::Id) -> E,
    ) -> Result<Option<E>, StoreError> {
        let mut state = self.inner.write().map_err(poisoned)?;
        if state.rows.values().any(conflict) {
            return Ok(None);
        }
        let id = E::Id::from(state.next_id);
        state.next_id += 1;
        let row = build(id);
        state.rows.insert(id, row.clone());
        Ok(Some(row))
    }

    fn get(&self, id: E::Id) -> Result<Option<E>, StoreError> {
        let state = self.inner.read().map_err(poisoned)?;
        Ok(state.rows.get(&id).cloned())
    }

    fn find(&self, pred: impl Fn(&E) -> bool) -> Result<Vec<E>, StoreError> {
        let state = self.inner.read().map_err(poisoned)?;
        Ok(state.rows.values().filter(|r| pred(r)).cloned().collect())
    }

    fn update(&self, id: E::Id, apply: impl FnOnce(&mut E)) -> Result<Option<E>, StoreError> {
        let mut state = self.inner.write().map_err(poisoned)?;
        Ok(state.rows.get_mut(&id).map(|row| {
            apply(row);
            row.clone()
        }))
    }

    fn remove(&self, id: E::Id) -> Result<bool, StoreError> {
        let mut state = self.inner.write().map_err(poisoned)?;
        Ok(state.rows.remove(&id).is_some())
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("record store lock poisoned".to_string())
}

/// In-memory record store for tests/dev.
#[derive(Debug)]
pub struct InMemoryRecordStore {
    users: Table<User>,
    files: Table<FileRecord>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self {
            users: Table::new(),
            files: Table::new(),
        }
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let email = user.email.clone();
        self.users
            .insert_with(|u| u.email == email, |id| user.into_user(id, Utc::now()))?
            .ok_or_else(|| StoreError::Duplicate(format!("email {email} is already registered")))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.find(|u| u.email == email)?.into_iter().next())
    }

    async fn create_file(&self, file: NewFile) -> Result<FileRecord, StoreError> {
        self.files
            .insert_with(|_| false, |id| file.into_record(id, Utc::now()))?
            .ok_or_else(|| StoreError::Backend("file insert rejected".to_string()))
    }

    async fn list_files(&self, filter: FileFilter) -> Result<Vec<FileRecord>, StoreError> {
        self.files.find(|f| filter.matches(f))
    }

    async fn find_file(&self, id: FileId) -> Result<Option<FileRecord>, StoreError> {
        self.files.get(id)
    }

    async fn update_file(
        &self,
        id: FileId,
        changes: FileChanges,
    ) -> Result<Option<FileRecord>, StoreError> {
        self.files.update(id, |f| changes.apply(f, Utc::now()))
    }

    async fn delete_file(&self, id: FileId) -> Result<bool, StoreError> {
        self.files.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_file(user: u64, name: &str) -> NewFile {
        NewFile::new(UserId::new(user), name, 1234, "text/plain", format!("/uploads/{name}")).unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryRecordStore::new();
        let user = NewUser::new("u", "e@x.com", "hash").unwrap();

        let created = store.create_user(user.clone()).await.unwrap();
        assert_eq!(created.id, UserId::new(1));

        let err = store.create_user(user).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        let found = store.find_user_by_email("e@x.com").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(store.find_user_by_email("nobody@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_crud_round_trip() {
        let store = InMemoryRecordStore::new();

        let created = store.create_file(new_file(1, "a.txt")).await.unwrap();
        let fetched = store.find_file(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);

        let updated = store
            .update_file(
                created.id,
                FileChanges {
                    name: Some("b.txt".into()),
                    size: Some(5678),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "b.txt");
        assert_eq!(updated.size, 5678);
        assert_eq!(updated.path, created.path);
        assert_eq!(store.find_file(created.id).await.unwrap(), Some(updated));

        assert!(store.delete_file(created.id).await.unwrap());
        assert!(store.find_file(created.id).await.unwrap().is_none());
        assert!(!store.delete_file(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn update_of_missing_file_is_none() {
        let store = InMemoryRecordStore::new();
        let res = store
            .update_file(FileId::new(999), FileChanges::default())
            .await
            .unwrap();
        assert!(res.is_none());
    }

    #[tokio::test]
    async fn list_filters_by_owner_in_id_order() {
        let store = InMemoryRecordStore::new();
        store.create_file(new_file(1, "a")).await.unwrap();
        store.create_file(new_file(2, "b")).await.unwrap();
        store.create_file(new_file(1, "c")).await.unwrap();

        let all = store.list_files(FileFilter::default()).await.unwrap();
        assert_eq!(all.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(), ["a", "b", "c"]);

        let mine = store.list_files(FileFilter::owned_by(UserId::new(1))).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|f| f.user_id == UserId::new(1)));
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let store = InMemoryRecordStore::new();
        let a = store.create_file(new_file(1, "a")).await.unwrap();
        store.delete_file(a.id).await.unwrap();
        let b = store.create_file(new_file(1, "b")).await.unwrap();
        assert!(b.id > a.id);
    }
}
