//! Per-status column projection of the flat
//! task collection.
//!
//! The projection is never persisted. It is
//! recomputed from the store after every
//! confirmed or optimistic change; the only
//! session state it carries is the display
//! order the user produced by dragging, which
//! is fed back in as a hint.

use std::collections::{
  BTreeMap,
  HashMap
};

use corkboard_shared::{
  TaskDto,
  TaskId,
  TaskPatch,
  TaskStatus
};
use tracing::{
  debug,
  warn
};

use crate::error::BoardError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Columns {
  lanes: BTreeMap<TaskStatus, Vec<TaskId>>
}

impl Default for Columns {
  fn default() -> Self {
    Self {
      lanes: TaskStatus::ALL
        .into_iter()
        .map(|status| (status, Vec::new()))
        .collect()
    }
  }
}

impl Columns {
  pub fn column(
    &self,
    status: TaskStatus
  ) -> &[TaskId] {
    self
      .lanes
      .get(&status)
      .map(Vec::as_slice)
      .unwrap_or_default()
  }

  /// Columns in board order.
  pub fn iter(
    &self
  ) -> impl Iterator<Item = (TaskStatus, &[TaskId])>
  {
    self.lanes.iter().map(|(status, ids)| {
      (*status, ids.as_slice())
    })
  }

  /// Where `id` currently sits: its column and
  /// position within it.
  pub fn locate(
    &self,
    id: &TaskId
  ) -> Option<(TaskStatus, usize)> {
    self.lanes.iter().find_map(
      |(status, ids)| {
        ids
          .iter()
          .position(|candidate| {
            candidate == id
          })
          .map(|idx| (*status, idx))
      }
    )
  }

  pub fn len(&self) -> usize {
    self.lanes.values().map(Vec::len).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Every id on the board, sorted. Two
  /// projections hold the same multiset of
  /// tasks iff these are equal.
  pub fn sorted_ids(&self) -> Vec<TaskId> {
    let mut ids: Vec<TaskId> = self
      .lanes
      .values()
      .flatten()
      .cloned()
      .collect();
    ids.sort();
    ids
  }

  fn lane_mut(
    &mut self,
    status: TaskStatus
  ) -> &mut Vec<TaskId> {
    self.lanes.entry(status).or_default()
  }
}

/// Groups tasks by status, keeping load order
/// inside each column.
pub fn derive_columns(
  tasks: &[TaskDto]
) -> Columns {
  let mut columns = Columns::default();
  for task in tasks {
    columns
      .lane_mut(task.status)
      .push(task.id.clone());
  }
  columns
}

/// Like [`derive_columns`], but tasks that
/// were already in the same column of `hint`
/// keep their hinted relative order. Tasks new
/// to a column follow, in load order.
pub fn derive_columns_with_hint(
  tasks: &[TaskDto],
  hint: &Columns
) -> Columns {
  let mut columns = Columns::default();

  for status in TaskStatus::ALL {
    let hinted: HashMap<&TaskId, usize> =
      hint
        .column(status)
        .iter()
        .enumerate()
        .map(|(idx, id)| (id, idx))
        .collect();

    let mut members: Vec<(usize, usize, &TaskId)> =
      tasks
        .iter()
        .enumerate()
        .filter(|(_, task)| {
          task.status == status
        })
        .map(|(load_idx, task)| {
          let rank = hinted
            .get(&task.id)
            .copied()
            .unwrap_or(usize::MAX);
          (rank, load_idx, &task.id)
        })
        .collect();
    members.sort();

    let lane = columns.lane_mut(status);
    lane.extend(
      members
        .into_iter()
        .map(|(_, _, id)| id.clone())
    );
  }

  columns
}

/// Moves `task_id` into `target_status` at
/// `target_index` (clamped to the column
/// length). Returns the new projection and,
/// when the column changed, the status patch to
/// persist. Intra-column reorders produce no
/// patch since position is not task state.
#[tracing::instrument(skip(columns))]
pub fn move_task(
  columns: &Columns,
  task_id: &TaskId,
  target_status: TaskStatus,
  target_index: usize
) -> Result<(Columns, Option<TaskPatch>), BoardError>
{
  let Some((from_status, from_idx)) =
    columns.locate(task_id)
  else {
    warn!("refusing to move a task that is not on the board");
    return Err(BoardError::UnknownTask(
      task_id.clone()
    ));
  };

  let mut next = columns.clone();
  next.lane_mut(from_status).remove(from_idx);

  let lane = next.lane_mut(target_status);
  let insert_at = target_index.min(lane.len());

  if from_status == target_status
    && insert_at == from_idx
  {
    debug!(
      status = from_status.key(),
      index = from_idx,
      "null move; nothing to do"
    );
    return Ok((columns.clone(), None));
  }

  lane.insert(insert_at, task_id.clone());

  let patch = (from_status != target_status)
    .then(|| TaskPatch::status(target_status));

  debug!(
    from = from_status.key(),
    from_index = from_idx,
    to = target_status.key(),
    to_index = insert_at,
    emits_patch = patch.is_some(),
    "moved task"
  );

  Ok((next, patch))
}

/// The board projection held by a workspace.
#[derive(Debug, Clone, Default)]
pub struct BoardState {
  columns: Columns,
  /// Slot each card held before its first
  /// unsettled cross-column move.
  origins: HashMap<TaskId, (TaskStatus, usize)>
}

impl BoardState {
  pub fn derive(tasks: &[TaskDto]) -> Self {
    Self {
      columns: derive_columns(tasks),
      origins: HashMap::new()
    }
  }

  pub fn columns(&self) -> &Columns {
    &self.columns
  }

  /// Recomputes from the store, keeping the
  /// current order as a hint.
  pub fn refresh(
    &mut self,
    tasks: &[TaskDto]
  ) {
    self.columns = derive_columns_with_hint(
      tasks,
      &self.columns
    );
  }

  pub fn move_task(
    &mut self,
    task_id: &TaskId,
    target_status: TaskStatus,
    target_index: usize
  ) -> Result<Option<TaskPatch>, BoardError>
  {
    let (columns, patch) = move_task(
      &self.columns,
      task_id,
      target_status,
      target_index
    )?;
    if patch.is_some()
      && let Some(slot) =
        self.columns.locate(task_id)
    {
      self
        .origins
        .entry(task_id.clone())
        .or_insert(slot);
    }
    self.columns = columns;
    Ok(patch)
  }

  /// Forgets the pre-move slot of `task_id`.
  /// With `restore`, a card that is back in its
  /// original column is also put back at its
  /// original position (clamped).
  pub fn settle(
    &mut self,
    task_id: &TaskId,
    restore: bool
  ) {
    let Some((status, index)) =
      self.origins.remove(task_id)
    else {
      return;
    };
    if !restore {
      return;
    }
    let Some((current, from)) =
      self.columns.locate(task_id)
    else {
      return;
    };
    if current != status {
      debug!(
        %task_id,
        origin = status.key(),
        now = current.key(),
        "card settled elsewhere; not restoring"
      );
      return;
    }
    let lane = self.columns.lane_mut(status);
    let id = lane.remove(from);
    let at = index.min(lane.len());
    lane.insert(at, id);
    debug!(%task_id, index = at, "restored card slot");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{
    ids,
    task
  };

  fn board(
    todo: &[&str],
    done: &[&str]
  ) -> Vec<TaskDto> {
    todo
      .iter()
      .map(|id| task(id, TaskStatus::Todo))
      .chain(
        done
          .iter()
          .map(|id| task(id, TaskStatus::Done))
      )
      .collect()
  }

  #[test]
  fn derive_groups_by_status_in_load_order()
  {
    let tasks = vec![
      task("T3", TaskStatus::Done),
      task("T1", TaskStatus::Todo),
      task("T4", TaskStatus::InProgress),
      task("T2", TaskStatus::Todo),
    ];
    let columns = derive_columns(&tasks);

    assert_eq!(
      columns.column(TaskStatus::Todo),
      ids(&["T1", "T2"]).as_slice()
    );
    assert_eq!(
      columns.column(TaskStatus::InProgress),
      ids(&["T4"]).as_slice()
    );
    assert_eq!(
      columns.column(TaskStatus::Done),
      ids(&["T3"]).as_slice()
    );
    assert_eq!(derive_columns(&tasks), columns);
  }

  #[test]
  fn move_across_columns_emits_status_patch()
  {
    let columns =
      derive_columns(&board(&["T1", "T2"], &[]));

    let (next, patch) = move_task(
      &columns,
      &TaskId::from("T2"),
      TaskStatus::Done,
      0
    )
    .expect("move T2");

    assert_eq!(
      next.column(TaskStatus::Todo),
      ids(&["T1"]).as_slice()
    );
    assert_eq!(
      next.column(TaskStatus::Done),
      ids(&["T2"]).as_slice()
    );
    assert_eq!(
      patch,
      Some(TaskPatch::status(TaskStatus::Done))
    );
  }

  #[test]
  fn same_slot_is_a_null_move() {
    let columns =
      derive_columns(&board(&["T1", "T2"], &[]));

    let (next, patch) = move_task(
      &columns,
      &TaskId::from("T1"),
      TaskStatus::Todo,
      0
    )
    .expect("null move");
    assert_eq!(next, columns);
    assert!(patch.is_none());

    // Past the end of its own column, the last
    // card lands where it already is.
    let (next, patch) = move_task(
      &columns,
      &TaskId::from("T2"),
      TaskStatus::Todo,
      99
    )
    .expect("null move past end");
    assert_eq!(next, columns);
    assert!(patch.is_none());
  }

  #[test]
  fn reorder_within_column_has_no_patch() {
    let columns = derive_columns(&board(
      &["T1", "T2", "T3"],
      &[]
    ));

    let (next, patch) = move_task(
      &columns,
      &TaskId::from("T3"),
      TaskStatus::Todo,
      0
    )
    .expect("reorder");
    assert_eq!(
      next.column(TaskStatus::Todo),
      ids(&["T3", "T1", "T2"]).as_slice()
    );
    assert!(patch.is_none());
  }

  #[test]
  fn index_beyond_length_appends() {
    let columns = derive_columns(&board(
      &["T1"],
      &["D1", "D2"]
    ));

    let (next, _) = move_task(
      &columns,
      &TaskId::from("T1"),
      TaskStatus::Done,
      42
    )
    .expect("append");
    assert_eq!(
      next.column(TaskStatus::Done),
      ids(&["D1", "D2", "T1"]).as_slice()
    );
  }

  #[test]
  fn unknown_task_is_refused() {
    let columns =
      derive_columns(&board(&["T1"], &[]));
    let err = move_task(
      &columns,
      &TaskId::from("ghost"),
      TaskStatus::Done,
      0
    )
    .expect_err("ghost is not on the board");
    assert_eq!(
      err,
      BoardError::UnknownTask(TaskId::from(
        "ghost"
      ))
    );
  }

  #[test]
  fn move_sequences_preserve_the_multiset() {
    let mut columns = derive_columns(&board(
      &["T1", "T2", "T3", "T4"],
      &["D1", "D2"]
    ));
    let before = columns.sorted_ids();
    let all = before.clone();

    let mut seed: u64 = 0x5eed;
    for _ in 0..200 {
      seed = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
      let pick = (seed >> 33) as usize;
      let id = &all[pick % all.len()];
      let status = TaskStatus::ALL
        [(pick / 7) % TaskStatus::ALL.len()];
      let index = (pick / 11) % 8;

      let (next, _) =
        move_task(&columns, id, status, index)
          .expect("known task");
      columns = next;
      assert_eq!(columns.sorted_ids(), before);
    }
  }

  #[test]
  fn refresh_keeps_dragged_order() {
    let tasks = board(&["T1", "T2", "T3"], &[]);
    let mut state = BoardState::derive(&tasks);

    state
      .move_task(
        &TaskId::from("T3"),
        TaskStatus::Todo,
        0
      )
      .expect("reorder");
    state.refresh(&tasks);

    assert_eq!(
      state.columns().column(TaskStatus::Todo),
      ids(&["T3", "T1", "T2"]).as_slice()
    );
  }

  #[test]
  fn settle_restores_pre_move_slot() {
    let mut tasks =
      board(&["T1", "T2", "T3"], &[]);
    let mut state = BoardState::derive(&tasks);
    let t1 = TaskId::from("T1");

    state
      .move_task(&t1, TaskStatus::Done, 0)
      .expect("move");
    state
      .move_task(&t1, TaskStatus::Done, 0)
      .expect("null move");
    tasks[0].status = TaskStatus::Done;
    state.refresh(&tasks);

    // Rolled back: the store has it in todo
    // again and the refresh appends it.
    tasks[0].status = TaskStatus::Todo;
    state.refresh(&tasks);
    assert_eq!(
      state.columns().column(TaskStatus::Todo),
      ids(&["T2", "T3", "T1"]).as_slice()
    );

    state.settle(&t1, true);
    assert_eq!(
      state.columns().column(TaskStatus::Todo),
      ids(&["T1", "T2", "T3"]).as_slice()
    );

    // Nothing left to restore.
    state
      .move_task(&t1, TaskStatus::Todo, 2)
      .expect("reorder");
    state.settle(&t1, true);
    assert_eq!(
      state.columns().column(TaskStatus::Todo),
      ids(&["T2", "T3", "T1"]).as_slice()
    );
  }

  #[test]
  fn hint_places_newcomers_after_known_tasks()
  {
    let tasks = board(&["T1", "T2"], &[]);
    let hint = derive_columns(&board(
      &["T2", "T1"],
      &[]
    ));

    let mut with_new = vec![task(
      "T0",
      TaskStatus::Todo
    )];
    with_new.extend(tasks);

    let columns =
      derive_columns_with_hint(&with_new, &hint);
    assert_eq!(
      columns.column(TaskStatus::Todo),
      ids(&["T2", "T1", "T0"]).as_slice()
    );
  }
}
