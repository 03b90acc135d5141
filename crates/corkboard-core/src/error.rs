use corkboard_shared::{
  ProjectId,
  SubtaskId,
  TaskId
};
use thiserror::Error;

/// Invariant violations. These refuse the
/// operation instead of producing an
/// inconsistent projection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
  #[error("task {0} is not on the board")]
  UnknownTask(TaskId),

  #[error(
    "subtask index {index} out of range for \
     task {task_id} ({len} subtasks)"
  )]
  SubtaskIndexOutOfRange {
    task_id: TaskId,
    index:   usize,
    len:     usize
  },

  #[error(
    "subtask {subtask_id} not found on task \
     {task_id}"
  )]
  UnknownSubtask {
    task_id:    TaskId,
    subtask_id: SubtaskId
  },

  #[error("board is not loaded")]
  NotLoaded
}

/// Failures reported by the remote store. The
/// core rolls back on every kind alike.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
  #[error("transport error: {0}")]
  Transport(String),

  #[error("validation failed: {0}")]
  Validation(String),

  #[error("task {0} not found")]
  TaskNotFound(TaskId),

  #[error("project {0} not found")]
  ProjectNotFound(ProjectId)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
  #[error("detail surface is not editing")]
  NotEditing,

  #[error("no task detail is open")]
  NoOpenDetail,

  #[error("title cannot be empty")]
  EmptyTitle,

  #[error(transparent)]
  Board(#[from] BoardError)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to load board for project {project_id}: {source}")]
pub struct LoadError {
  pub project_id: ProjectId,
  #[source]
  pub source:     RemoteError
}
