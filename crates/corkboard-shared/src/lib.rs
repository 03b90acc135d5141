pub mod dates;

use std::fmt;

use chrono::NaiveDate;
use serde::{
  Deserialize,
  Serialize
};
use uuid::Uuid;

use crate::dates::{
  due_date_serde,
  nullable
};

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for TaskId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for TaskId {
  fn from(value: &str) -> Self {
    Self(value.to_string())
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl fmt::Display for ProjectId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for ProjectId {
  fn from(value: &str) -> Self {
    Self(value.to_string())
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
#[serde(transparent)]
pub struct SubtaskId(pub Uuid);

impl SubtaskId {
  pub fn generate() -> Self {
    Self(Uuid::new_v4())
  }
}

impl fmt::Display for SubtaskId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Column membership. The declaration order is
/// the left-to-right board order.
#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
  Todo,
  InProgress,
  Done
}

impl TaskStatus {
  pub const ALL: [TaskStatus; 3] = [
    TaskStatus::Todo,
    TaskStatus::InProgress,
    TaskStatus::Done
  ];

  pub fn label(self) -> &'static str {
    match self {
      | TaskStatus::Todo => "To Do",
      | TaskStatus::InProgress => {
        "In Progress"
      }
      | TaskStatus::Done => "Done"
    }
  }

  pub fn key(self) -> &'static str {
    match self {
      | TaskStatus::Todo => "todo",
      | TaskStatus::InProgress => {
        "in_progress"
      }
      | TaskStatus::Done => "done"
    }
  }

  pub fn parse(
    raw: &str
  ) -> Option<TaskStatus> {
    TaskStatus::ALL
      .into_iter()
      .find(|status| {
        status.key()
          == raw.trim().to_ascii_lowercase()
      })
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
  Low,
  #[default]
  Medium,
  High,
  Urgent
}

impl TaskPriority {
  pub fn label(self) -> &'static str {
    match self {
      | TaskPriority::Low => "low",
      | TaskPriority::Medium => "medium",
      | TaskPriority::High => "high",
      | TaskPriority::Urgent => "urgent"
    }
  }

  pub fn parse(
    raw: &str
  ) -> Option<TaskPriority> {
    match raw
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "low" => Some(TaskPriority::Low),
      | "medium" => {
        Some(TaskPriority::Medium)
      }
      | "high" => Some(TaskPriority::High),
      | "urgent" => {
        Some(TaskPriority::Urgent)
      }
      | _ => None
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct UserRef {
  #[serde(rename = "_id")]
  pub id:   String,
  #[serde(default)]
  pub name: String
}

impl UserRef {
  /// Avatar fallback: up to two initials.
  pub fn initials(&self) -> String {
    initials(&self.name)
      .chars()
      .take(2)
      .collect()
  }
}

/// The signed-in user as the session exposes
/// it.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct CurrentUser {
  pub name:  String,
  pub email: String
}

impl CurrentUser {
  pub fn initials(&self) -> String {
    initials(&self.name)
  }
}

fn initials(name: &str) -> String {
  name
    .split_whitespace()
    .filter_map(|part| part.chars().next())
    .flat_map(char::to_uppercase)
    .collect()
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
  #[serde(
    rename = "_id",
    default = "SubtaskId::generate"
  )]
  pub id:           SubtaskId,
  pub title:        String,
  #[serde(default)]
  pub is_completed: bool
}

impl Subtask {
  pub fn new(
    title: impl Into<String>
  ) -> Self {
    Self {
      id:           SubtaskId::generate(),
      title:        title.into(),
      is_completed: false
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
#[serde(rename_all = "camelCase")]
pub struct TaskDto {
  #[serde(rename = "_id")]
  pub id:          TaskId,
  pub project:     ProjectId,
  pub title:       String,
  #[serde(default)]
  pub description: Option<String>,
  pub status:      TaskStatus,
  #[serde(default)]
  pub priority:    TaskPriority,
  #[serde(default)]
  pub assignee:    Option<UserRef>,
  #[serde(
    default,
    with = "due_date_serde::option"
  )]
  pub due_date:    Option<NaiveDate>,
  #[serde(default)]
  pub tags:        Vec<String>,
  #[serde(default)]
  pub subtasks:    Vec<Subtask>,
  pub created_by:  UserRef
}

impl TaskDto {
  /// Returns the task as it looks once `patch`
  /// is applied. Fields the patch leaves out
  /// are carried over untouched, so subtask
  /// order survives a title edit.
  pub fn apply(
    &self,
    patch: &TaskPatch
  ) -> TaskDto {
    let mut next = self.clone();
    if let Some(title) = &patch.title {
      next.title = title.clone();
    }
    if let Some(description) =
      &patch.description
    {
      next.description =
        description.clone();
    }
    if let Some(status) = patch.status {
      next.status = status;
    }
    if let Some(priority) = patch.priority
    {
      next.priority = priority;
    }
    if let Some(due_date) = patch.due_date
    {
      next.due_date = due_date;
    }
    if let Some(subtasks) = &patch.subtasks
    {
      next.subtasks = subtasks.clone();
    }
    next
  }

  pub fn completed_subtasks(
    &self
  ) -> usize {
    self
      .subtasks
      .iter()
      .filter(|subtask| {
        subtask.is_completed
      })
      .count()
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDto {
  #[serde(rename = "_id")]
  pub id:          ProjectId,
  pub name:        String,
  #[serde(default)]
  pub description: Option<String>,
  pub status:      String,
  #[serde(default)]
  pub members:     Vec<UserRef>,
  #[serde(
    default,
    with = "due_date_serde::option"
  )]
  pub due_date:    Option<NaiveDate>
}

impl ProjectDto {
  pub fn is_active(&self) -> bool {
    self.status == "active"
  }

  pub fn member_count(&self) -> usize {
    self.members.len()
  }
}

/// Partial task update. `description` and
/// `due_date` distinguish "leave alone"
/// (`None`) from "clear" (`Some(None)`).
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Default,
)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub title:       Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none",
    with = "nullable"
  )]
  pub description: Option<Option<String>>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub status:      Option<TaskStatus>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub priority:    Option<TaskPriority>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none",
    with = "nullable"
  )]
  pub due_date:
    Option<Option<NaiveDate>>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub subtasks:    Option<Vec<Subtask>>
}

impl TaskPatch {
  pub fn status(
    status: TaskStatus
  ) -> Self {
    Self {
      status: Some(status),
      ..Self::default()
    }
  }

  pub fn subtasks(
    subtasks: Vec<Subtask>
  ) -> Self {
    Self {
      subtasks: Some(subtasks),
      ..Self::default()
    }
  }

  pub fn is_empty(&self) -> bool {
    *self == Self::default()
  }

  /// Folds a later patch into this one; fields
  /// set in `later` win.
  pub fn merge(
    &mut self,
    later: TaskPatch
  ) {
    let TaskPatch {
      title,
      description,
      status,
      priority,
      due_date,
      subtasks
    } = later;
    if title.is_some() {
      self.title = title;
    }
    if description.is_some() {
      self.description = description;
    }
    if status.is_some() {
      self.status = status;
    }
    if priority.is_some() {
      self.priority = priority;
    }
    if due_date.is_some() {
      self.due_date = due_date;
    }
    if subtasks.is_some() {
      self.subtasks = subtasks;
    }
  }

  /// Names of the fields this patch carries, for
  /// logging.
  pub fn field_names(
    &self
  ) -> Vec<&'static str> {
    let mut out = Vec::new();
    if self.title.is_some() {
      out.push("title");
    }
    if self.description.is_some() {
      out.push("description");
    }
    if self.status.is_some() {
      out.push("status");
    }
    if self.priority.is_some() {
      out.push("priority");
    }
    if self.due_date.is_some() {
      out.push("dueDate");
    }
    if self.subtasks.is_some() {
      out.push("subtasks");
    }
    out
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdateArgs {
  pub task_id: TaskId,
  pub patch:   TaskPatch
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct TasksListArgs {
  pub project_id: ProjectId
}
