use std::collections::HashMap;

use corkboard_shared::{
  TaskDto,
  TaskId
};
use tracing::debug;

/// Flat task collection in load order. Only
/// the mutation queue and the workspace refetch
/// path write to it.
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
  tasks: Vec<TaskDto>,
  index: HashMap<TaskId, usize>
}

impl TaskStore {
  pub fn new(tasks: Vec<TaskDto>) -> Self {
    let mut store = Self::default();
    store.replace_all(tasks);
    store
  }

  pub fn get(
    &self,
    id: &TaskId
  ) -> Option<&TaskDto> {
    self
      .index
      .get(id)
      .map(|&idx| &self.tasks[idx])
  }

  pub fn contains(
    &self,
    id: &TaskId
  ) -> bool {
    self.index.contains_key(id)
  }

  /// Tasks in load order.
  pub fn tasks(&self) -> &[TaskDto] {
    &self.tasks
  }

  pub fn len(&self) -> usize {
    self.tasks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tasks.is_empty()
  }

  /// Overwrites a known task in place, keeping
  /// its load position. Unknown ids are
  /// appended.
  pub(crate) fn put(
    &mut self,
    task: TaskDto
  ) {
    match self.index.get(&task.id) {
      | Some(&idx) => self.tasks[idx] = task,
      | None => {
        self
          .index
          .insert(task.id.clone(), self.tasks.len());
        self.tasks.push(task);
      }
    }
  }

  pub(crate) fn replace_all(
    &mut self,
    tasks: Vec<TaskDto>
  ) {
    self.tasks.clear();
    self.index.clear();
    for task in tasks {
      if self.index.contains_key(&task.id) {
        debug!(
          task_id = %task.id,
          "duplicate task id in fetch; keeping first"
        );
        continue;
      }
      self.put(task);
    }
  }

  pub(crate) fn clear(&mut self) {
    self.tasks.clear();
    self.index.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::task;
  use corkboard_shared::TaskStatus;

  #[test]
  fn put_overwrites_in_place() {
    let mut store = TaskStore::new(vec![
      task("T1", TaskStatus::Todo),
      task("T2", TaskStatus::Todo),
    ]);

    let mut changed = store
      .get(&TaskId::from("T1"))
      .cloned()
      .expect("T1 loaded");
    changed.status = TaskStatus::Done;
    store.put(changed);

    let ids: Vec<&str> = store
      .tasks()
      .iter()
      .map(|t| t.id.as_str())
      .collect();
    assert_eq!(ids, vec!["T1", "T2"]);
    assert_eq!(
      store
        .get(&TaskId::from("T1"))
        .map(|t| t.status),
      Some(TaskStatus::Done)
    );
  }

  #[test]
  fn replace_all_drops_duplicate_ids() {
    let store = TaskStore::new(vec![
      task("T1", TaskStatus::Todo),
      task("T1", TaskStatus::Done),
    ]);
    assert_eq!(store.len(), 1);
    assert_eq!(
      store.tasks()[0].status,
      TaskStatus::Todo
    );
  }
}
