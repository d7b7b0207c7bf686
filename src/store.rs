use crate::error::StoreError;
use crate::models::{NewTodo, Todo};
use crate::schema::todos;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::sync::{Arc, Mutex, MutexGuard};

static CREATE_TODOS: &str = "CREATE TABLE IF NOT EXISTS todos (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    title TEXT NOT NULL,
    completed BOOLEAN NOT NULL DEFAULT 0
)";

type Result<T> = std::result::Result<T, StoreError>;

/// Shared handle to the todo table.
///
/// Cloning is cheap; every clone talks to the same connection.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<SqliteConnection>>,
}

impl Store {
    pub fn open(database_url: &str) -> Result<Store> {
        let conn = SqliteConnection::establish(database_url)?;
        Ok(Store {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn ensure_schema(&self) -> Result<()> {
        let mut conn = self.lock()?;
        diesel::sql_query(CREATE_TODOS).execute(&mut *conn)?;
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<Todo>> {
        let mut conn = self.lock()?;
        let todos = todos::table
            .select(Todo::as_select())
            .load(&mut *conn)?;
        Ok(todos)
    }

    pub fn create(&self, new_todo: &NewTodo) -> Result<Todo> {
        let mut conn = self.lock()?;
        let todo = diesel::insert_into(todos::table)
            .values(new_todo)
            .returning(Todo::as_returning())
            .get_result(&mut *conn)?;
        Ok(todo)
    }

    pub fn find(&self, id: i32) -> Result<Option<Todo>> {
        let mut conn = self.lock()?;
        let todo = todos::table
            .find(id)
            .select(Todo::as_select())
            .first(&mut *conn)
            .optional()?;
        Ok(todo)
    }

    /// Writes title and completed back to the row identified by `todo.id`.
    /// Returns the number of rows written; zero when the row is gone.
    pub fn save(&self, todo: &Todo) -> Result<usize> {
        let mut conn = self.lock()?;
        let updated = diesel::update(todos::table.find(todo.id))
            .set((
                todos::title.eq(&todo.title),
                todos::completed.eq(todo.completed),
            ))
            .execute(&mut *conn)?;
        Ok(updated)
    }

    /// Returns how many rows went away; zero when the id was unknown.
    pub fn delete(&self, id: i32) -> Result<usize> {
        let mut conn = self.lock()?;
        let removed = diesel::delete(todos::table.find(id)).execute(&mut *conn)?;
        Ok(removed)
    }

    fn lock(&self) -> Result<MutexGuard<'_, SqliteConnection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}
