use super::schema::todos;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Queryable, Selectable, Serialize, Clone, PartialEq, Debug)]
#[diesel(table_name = todos)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Todo {
    #[serde(rename = "ID")]
    pub id: i32,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Completed")]
    pub completed: bool,
}

#[derive(Insertable)]
#[diesel(table_name = todos)]
pub struct NewTodo<'a> {
    pub title: &'a str,
    pub completed: bool,
}

/// Request body for create and update. Absent keys stay `None`, and a
/// `null` body decodes to the empty payload.
///
/// Keys are accepted capitalized or lowercase. `ID` is accepted so clients
/// can send back a record they received, but it never selects which row
/// gets written.
#[derive(Deserialize, Default, Debug)]
pub struct TodoPayload {
    #[serde(rename = "ID", alias = "id", alias = "Id", default)]
    _id: Option<u64>,
    #[serde(rename = "Title", alias = "title", default)]
    pub title: Option<String>,
    #[serde(rename = "Completed", alias = "completed", default)]
    pub completed: Option<bool>,
}

impl TodoPayload {
    pub fn to_new_todo(&self) -> NewTodo<'_> {
        NewTodo {
            title: self.title.as_deref().unwrap_or(""),
            completed: self.completed.unwrap_or(false),
        }
    }

    /// Overwrites only the fields present in the payload. The id is left alone.
    pub fn apply_to(self, todo: &mut Todo) {
        if let Some(title) = self.title {
            todo.title = title;
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
    }
}
