//! In-process backend used for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{session::Session, todo::Todo, user::User},
    repositories::{SessionStore, TodoRepository, UserRepository},
};

#[derive(Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn insert(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        if users.values().any(|existing| existing.email == user.email) {
            return Err(AppError::DuplicateEmail);
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.email == email)
            .cloned())
    }
}

/// Todos kept in insertion order.
#[derive(Default)]
pub struct MemoryTodoRepository {
    todos: RwLock<Vec<Todo>>,
}

#[async_trait]
impl TodoRepository for MemoryTodoRepository {
    async fn insert(&self, todo: &Todo) -> Result<()> {
        self.todos.write().await.push(todo.clone());
        Ok(())
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Todo>> {
        Ok(self
            .todos
            .read()
            .await
            .iter()
            .filter(|todo| todo.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Todo>> {
        Ok(self
            .todos
            .read()
            .await
            .iter()
            .find(|todo| todo.id == id)
            .cloned())
    }

    async fn update(&self, todo: &Todo) -> Result<bool> {
        let mut todos = self.todos.write().await;
        let found = todos
            .iter_mut()
            .find(|stored| stored.id == todo.id && stored.owner_id == todo.owner_id);

        let Some(stored) = found else {
            return Ok(false);
        };
        stored.title = todo.title.clone();
        stored.completed = todo.completed;
        stored.updated_at = todo.updated_at;
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut todos = self.todos.write().await;
        let before = todos.len();
        todos.retain(|todo| todo.id != id);
        Ok(todos.len() < before)
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, key: &str, session: &Session) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(key.to_string(), session.clone());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().await.get(key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.sessions.write().await.remove(key);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now));
        Ok(before - sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn email_uniqueness_is_exact_match() {
        let repo = MemoryUserRepository::default();
        repo.insert(&User::new("A".into(), "a@x.com".into(), None))
            .await
            .unwrap();

        let clash = repo
            .insert(&User::new("B".into(), "a@x.com".into(), None))
            .await;
        assert!(matches!(clash, Err(AppError::DuplicateEmail)));

        repo.insert(&User::new("C".into(), "A@x.com".into(), None))
            .await
            .unwrap();
        assert_eq!(
            repo.find_by_email("a@x.com").await.unwrap().unwrap().name,
            "A"
        );
    }

    #[tokio::test]
    async fn todos_list_in_insertion_order_per_owner() {
        let repo = MemoryTodoRepository::default();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

        for (title, owner) in [("one", alice), ("other", bob), ("two", alice)] {
            repo.insert(&Todo::new(title.into(), owner)).await.unwrap();
        }

        let titles: Vec<_> = repo
            .find_by_owner(alice)
            .await
            .unwrap()
            .into_iter()
            .map(|todo| todo.title)
            .collect();
        assert_eq!(titles, ["one", "two"]);
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_went() {
        let repo = MemoryTodoRepository::default();
        let todo = Todo::new("gone".into(), Uuid::new_v4());
        repo.insert(&todo).await.unwrap();

        assert!(repo.delete(todo.id).await.unwrap());
        assert!(!repo.delete(todo.id).await.unwrap());
        assert!(repo.find_by_id(todo.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_reports_a_missing_record() {
        let repo = MemoryTodoRepository::default();
        let mut todo = Todo::new("draft".into(), Uuid::new_v4());
        repo.insert(&todo).await.unwrap();

        todo.completed = true;
        assert!(repo.update(&todo).await.unwrap());

        repo.delete(todo.id).await.unwrap();
        assert!(!repo.update(&todo).await.unwrap());
        assert!(repo.find_by_id(todo.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn purge_drops_only_expired_sessions() {
        let store = MemorySessionStore::default();
        let owner = Uuid::new_v4();
        store
            .insert("live", &Session::new(owner, chrono::Duration::days(1)))
            .await
            .unwrap();
        store
            .insert("dead", &Session::new(owner, chrono::Duration::seconds(-1)))
            .await
            .unwrap();

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert!(store.get("live").await.unwrap().is_some());
        assert!(store.get("dead").await.unwrap().is_none());
    }
}
