//! Checklist toggles. Each toggle yields the
//! whole new subtask list, which is what gets
//! sent as the patch.
//!
//! Toggling by position trusts that the list
//! the user saw is the list in the store; a
//! concurrent reorder or a duplicate title can
//! flip the wrong item. The workspace toggles
//! by subtask id; the positional form is kept
//! for callers that only have the rendered
//! index.

use corkboard_shared::{
  Subtask,
  SubtaskId,
  TaskDto
};
use tracing::error;

use crate::error::BoardError;

pub fn toggle_subtask(
  task: &TaskDto,
  index: usize
) -> Result<Vec<Subtask>, BoardError> {
  if index >= task.subtasks.len() {
    error!(
      task_id = %task.id,
      index,
      len = task.subtasks.len(),
      "subtask index out of range; refusing toggle"
    );
    return Err(
      BoardError::SubtaskIndexOutOfRange {
        task_id: task.id.clone(),
        index,
        len: task.subtasks.len()
      }
    );
  }

  Ok(flip_at(&task.subtasks, index))
}

pub fn toggle_subtask_by_id(
  task: &TaskDto,
  subtask_id: SubtaskId
) -> Result<Vec<Subtask>, BoardError> {
  let Some(index) = task
    .subtasks
    .iter()
    .position(|subtask| {
      subtask.id == subtask_id
    })
  else {
    error!(
      task_id = %task.id,
      %subtask_id,
      "unknown subtask; refusing toggle"
    );
    return Err(BoardError::UnknownSubtask {
      task_id: task.id.clone(),
      subtask_id
    });
  };

  Ok(flip_at(&task.subtasks, index))
}

fn flip_at(
  subtasks: &[Subtask],
  index: usize
) -> Vec<Subtask> {
  subtasks
    .iter()
    .enumerate()
    .map(|(idx, subtask)| {
      let mut next = subtask.clone();
      if idx == index {
        next.is_completed = !next.is_completed;
      }
      next
    })
    .collect()
}
