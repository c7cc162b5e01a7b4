use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::todo::Todo,
    repositories::TodoRepository,
};

/// Maps a `tokio_postgres::Row` to a `Todo`.
fn row_to_todo(row: &Row) -> Result<Todo> {
    Ok(Todo {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        title: row.try_get("title").map_err(|_| AppError::MissingData("title".to_string()))?,
        completed: row.try_get("completed").map_err(|_| AppError::MissingData("completed".to_string()))?,
        owner_id: row.try_get("owner_id").map_err(|_| AppError::MissingData("owner_id".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|_| AppError::MissingData("updated_at".to_string()))?,
    })
}

/// Todos stored in the `todos` table.
#[derive(Clone)]
pub struct PgTodoRepository {
    pool: Pool,
}

impl PgTodoRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TodoRepository for PgTodoRepository {
    async fn insert(&self, todo: &Todo) -> Result<()> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                INSERT INTO todos (id, title, completed, owner_id, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .await?;
        client
            .execute(
                &statement,
                &[
                    &todo.id,
                    &todo.title,
                    &todo.completed,
                    &todo.owner_id,
                    &todo.created_at,
                    &todo.updated_at,
                ],
            )
            .await?;
        Ok(())
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Todo>> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                SELECT id, title, completed, owner_id, created_at, updated_at
                FROM todos
                WHERE owner_id = $1
                ORDER BY created_at ASC, id ASC
                "#,
            )
            .await?;
        let rows = client.query(&statement, &[&owner_id]).await?;
        rows.iter().map(row_to_todo).collect()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Todo>> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                SELECT id, title, completed, owner_id, created_at, updated_at
                FROM todos
                WHERE id = $1
                "#,
            )
            .await?;
        let row = client.query_opt(&statement, &[&id]).await?;
        row.as_ref().map(row_to_todo).transpose()
    }

    async fn update(&self, todo: &Todo) -> Result<bool> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                UPDATE todos
                SET title = $2, completed = $3, updated_at = $4
                WHERE id = $1 AND owner_id = $5
                "#,
            )
            .await?;
        let updated = client
            .execute(
                &statement,
                &[&todo.id, &todo.title, &todo.completed, &todo.updated_at, &todo.owner_id],
            )
            .await?;
        Ok(updated > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached("DELETE FROM todos WHERE id = $1")
            .await?;
        let deleted = client.execute(&statement, &[&id]).await?;
        Ok(deleted > 0)
    }
}
