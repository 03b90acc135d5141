//! One open project board and everything the
//! user can do to it.
//!
//! The workspace is the only writer of the task
//! store: every change goes through the mutation
//! queue, and the board projection is refreshed
//! after each one. Event handlers here are
//! synchronous; the only asynchronous entry
//! points are the fetches and [`Workspace::pump`].

use corkboard_shared::{
  ProjectId,
  SubtaskId,
  TaskDto,
  TaskId,
  TaskPatch
};
use futures::future::join_all;
use tracing::{
  debug,
  error,
  info,
  warn
};

use crate::board::{
  BoardState,
  Columns
};
use crate::drag::{
  DragController,
  Slot
};
use crate::editor::{
  Draft,
  PatchMode,
  TaskDetailEditor
};
use crate::error::{
  BoardError,
  EditorError,
  LoadError,
  RemoteError
};
use crate::mutation::{
  MutationQueue,
  Reconciliation,
  SubmitHandle,
  WriteRequest,
  WriteTicket
};
use crate::remote::Remote;
use crate::session::{
  Session,
  SessionProvider
};
use crate::store::TaskStore;
use crate::subtasks::{
  toggle_subtask,
  toggle_subtask_by_id
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
  Idle,
  Loaded(ProjectId),
  Failed(LoadError)
}

/// User-facing, non-fatal messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
  WriteFailed {
    task_id: TaskId,
    title:   String,
    error:   RemoteError
  },
  LoadFailed(LoadError)
}

impl std::fmt::Display for Notice {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>
  ) -> std::fmt::Result {
    match self {
      | Notice::WriteFailed {
        title,
        error,
        ..
      } => {
        write!(
          f,
          "Failed to update \"{title}\": {error}"
        )
      }
      | Notice::LoadFailed(err) => {
        write!(f, "{err}")
      }
    }
  }
}

#[derive(Debug)]
pub struct Workspace {
  session:    Session,
  patch_mode: PatchMode,
  load:       LoadState,
  store:      TaskStore,
  board:      BoardState,
  queue:      MutationQueue,
  drag:       DragController,
  detail:     Option<TaskDetailEditor>,
  notices:    Vec<Notice>
}

impl Workspace {
  pub fn new(
    session: Session,
    patch_mode: PatchMode
  ) -> Self {
    Self {
      session,
      patch_mode,
      load: LoadState::Idle,
      store: TaskStore::default(),
      board: BoardState::default(),
      queue: MutationQueue::new(),
      drag: DragController::new(),
      detail: None,
      notices: Vec::new()
    }
  }

  pub fn session(&self) -> &Session {
    &self.session
  }

  pub fn load_state(&self) -> &LoadState {
    &self.load
  }

  pub fn tasks(&self) -> &[TaskDto] {
    self.store.tasks()
  }

  pub fn task(
    &self,
    task_id: &TaskId
  ) -> Option<&TaskDto> {
    self.store.get(task_id)
  }

  pub fn queue(&self) -> &MutationQueue {
    &self.queue
  }

  pub fn drag(&self) -> &DragController {
    &self.drag
  }

  pub fn detail(
    &self
  ) -> Option<&TaskDetailEditor> {
    self.detail.as_ref()
  }

  /// The column projection. Unavailable unless
  /// a load succeeded, so a failed or
  /// half-loaded board is never rendered.
  pub fn columns(
    &self
  ) -> Result<&Columns, BoardError> {
    match self.load {
      | LoadState::Loaded(_) => {
        Ok(self.board.columns())
      }
      | _ => Err(BoardError::NotLoaded)
    }
  }

  // ---- loading -------------------------------

  #[tracing::instrument(skip(self, remote))]
  pub async fn load<R: Remote>(
    &mut self,
    remote: &R,
    project_id: ProjectId
  ) -> Result<(), LoadError> {
    match remote.fetch_tasks(&project_id).await
    {
      | Ok(tasks) => {
        if !self.is_current(&project_id) {
          self.board = BoardState::default();
        }
        self.install_tasks(project_id, tasks);
        Ok(())
      }
      | Err(source) => {
        let err = LoadError {
          project_id,
          source
        };
        self.fail_load(err.clone());
        Err(err)
      }
    }
  }

  fn is_current(
    &self,
    project_id: &ProjectId
  ) -> bool {
    match &self.load {
      | LoadState::Loaded(id) => id == project_id,
      | LoadState::Failed(err) => {
        err.project_id == *project_id
      }
      | LoadState::Idle => false
    }
  }

  /// Refetches the loaded project.
  pub async fn refetch<R: Remote>(
    &mut self,
    remote: &R
  ) -> Result<(), LoadError> {
    let project_id = match &self.load {
      | LoadState::Loaded(id) => id.clone(),
      | LoadState::Failed(err) => {
        err.project_id.clone()
      }
      | LoadState::Idle => {
        warn!("refetch with no project loaded");
        return Ok(());
      }
    };
    self.load(remote, project_id).await
  }

  /// Installs a fetched task list. Pending
  /// optimistic writes are replayed on top.
  pub fn install_tasks(
    &mut self,
    project_id: ProjectId,
    tasks: Vec<TaskDto>
  ) {
    info!(
      %project_id,
      count = tasks.len(),
      "board loaded"
    );
    self.queue.rebase(&mut self.store, tasks);
    self.board.refresh(self.store.tasks());
    self.load = LoadState::Loaded(project_id);

    if let Some(detail) = &self.detail
      && !self.store.contains(detail.task_id())
    {
      warn!(
        task_id = %detail.task_id(),
        "open task disappeared; closing detail"
      );
      self.detail = None;
    }
  }

  /// A failed read only hides the board. For the
  /// project already on screen the store and the
  /// queue are kept, so writes still in flight
  /// settle normally once they complete.
  fn fail_load(&mut self, err: LoadError) {
    error!(error = %err, "board load failed");
    if !self.is_current(&err.project_id) {
      self.store.clear();
      self.queue.clear();
      self.board = BoardState::default();
    }
    self.drag.cancel();
    self.detail = None;
    self.load = LoadState::Failed(err.clone());
    self.notices.push(Notice::LoadFailed(err));
  }

  // ---- writes --------------------------------

  /// The single write path: optimistic apply,
  /// then schedule the remote write.
  pub fn submit(
    &mut self,
    task_id: &TaskId,
    patch: TaskPatch
  ) -> Result<SubmitHandle, BoardError> {
    let handle = self.queue.submit(
      &mut self.store,
      task_id,
      patch
    )?;
    self.board.refresh(self.store.tasks());
    Ok(handle)
  }

  pub fn take_ready_writes(
    &mut self
  ) -> Vec<WriteRequest> {
    self.queue.take_ready()
  }

  pub fn complete_write(
    &mut self,
    ticket: WriteTicket,
    result: Result<TaskDto, RemoteError>
  ) -> Reconciliation {
    let outcome = self.queue.complete(
      &mut self.store,
      ticket,
      result
    );
    self.board.refresh(self.store.tasks());

    match &outcome {
      | Reconciliation::Confirmed {
        task_id,
        ..
      } => self.board.settle(task_id, false),
      | Reconciliation::RolledBack {
        task_id,
        ..
      } => self.board.settle(task_id, true),
      | Reconciliation::Stale { .. } => {}
    }

    if let Reconciliation::RolledBack {
      task_id,
      error,
      ..
    } = &outcome
    {
      let title = self
        .store
        .get(task_id)
        .map(|t| t.title.clone())
        .unwrap_or_default();
      self.notices.push(Notice::WriteFailed {
        task_id: task_id.clone(),
        title,
        error: error.clone()
      });
    }
    outcome
  }

  /// Dispatches ready writes, awaits them
  /// together, reconciles, and repeats until no
  /// follow-up is left.
  pub async fn pump<R: Remote>(
    &mut self,
    remote: &R
  ) -> Vec<Reconciliation> {
    let mut outcomes = Vec::new();
    loop {
      let batch = self.take_ready_writes();
      if batch.is_empty() {
        break;
      }
      debug!(writes = batch.len(), "pumping writes");

      let results = join_all(batch.iter().map(
        |req| {
          remote
            .update_task(&req.task_id, &req.patch)
        }
      ))
      .await;

      for (req, result) in
        batch.into_iter().zip(results)
      {
        outcomes.push(
          self.complete_write(req.ticket, result)
        );
      }
    }
    outcomes
  }

  pub fn drain_notices(
    &mut self
  ) -> Vec<Notice> {
    std::mem::take(&mut self.notices)
  }

  // ---- board moves ---------------------------

  /// Moves a card. Returns the write handle when
  /// the column changed; reorders and null
  /// moves only touch the projection.
  #[tracing::instrument(skip(self))]
  pub fn move_task(
    &mut self,
    task_id: &TaskId,
    target: Slot
  ) -> Result<Option<SubmitHandle>, BoardError>
  {
    self.columns()?;
    let Some(patch) = self.board.move_task(
      task_id,
      target.status,
      target.index
    )?
    else {
      return Ok(None);
    };
    self.submit(task_id, patch).map(Some)
  }

  pub fn drag_start(
    &mut self,
    task_id: &TaskId
  ) -> Result<bool, BoardError> {
    let origin = self
      .columns()?
      .locate(task_id)
      .map(|(status, index)| {
        Slot::new(status, index)
      })
      .ok_or_else(|| {
        BoardError::UnknownTask(task_id.clone())
      })?;
    Ok(self.drag.start(task_id.clone(), origin))
  }

  pub fn drag_hover(
    &mut self,
    target: Option<Slot>
  ) {
    self.drag.hover_over(target);
  }

  /// Finishes the gesture: at most one move.
  pub fn drag_release(
    &mut self
  ) -> Result<Option<SubmitHandle>, BoardError>
  {
    match self.drag.release() {
      | Some(intent) => {
        let task_id = intent.task_id().clone();
        self.move_task(&task_id, intent.target())
      }
      | None => Ok(None)
    }
  }

  pub fn drag_cancel(&mut self) {
    self.drag.cancel();
  }

  // ---- detail surface ------------------------

  /// Opens the detail surface for `task_id`.
  /// Only one surface exists; opening another
  /// task discards any draft on the current one.
  pub fn open_detail(
    &mut self,
    task_id: &TaskId
  ) -> Result<(), BoardError> {
    if !self.store.contains(task_id) {
      return Err(BoardError::UnknownTask(
        task_id.clone()
      ));
    }
    if self
      .detail
      .as_ref()
      .is_some_and(|d| d.task_id() == task_id)
    {
      return Ok(());
    }
    self.close_detail();
    debug!(%task_id, "open detail");
    self.detail = Some(TaskDetailEditor::new(
      task_id.clone(),
      self.patch_mode
    ));
    Ok(())
  }

  /// Dismissing the surface while editing is a
  /// cancel. Writes already submitted keep
  /// running.
  pub fn close_detail(&mut self) {
    if let Some(mut detail) = self.detail.take()
    {
      detail.cancel();
      debug!(task_id = %detail.task_id(), "close detail");
    }
  }

  pub fn begin_edit(
    &mut self
  ) -> Result<(), EditorError> {
    let detail = self
      .detail
      .as_mut()
      .ok_or(EditorError::NoOpenDetail)?;
    let task = self
      .store
      .get(detail.task_id())
      .ok_or_else(|| {
        BoardError::UnknownTask(
          detail.task_id().clone()
        )
      })?;
    detail.begin_edit(task);
    Ok(())
  }

  pub fn draft_mut(
    &mut self
  ) -> Result<&mut Draft, EditorError> {
    self
      .detail
      .as_mut()
      .ok_or(EditorError::NoOpenDetail)?
      .draft_mut()
  }

  /// Saves the draft through the mutation queue
  /// and leaves edit mode without waiting for
  /// the server.
  pub fn save_edit(
    &mut self
  ) -> Result<Option<SubmitHandle>, EditorError>
  {
    let detail = self
      .detail
      .as_mut()
      .ok_or(EditorError::NoOpenDetail)?;
    let task_id = detail.task_id().clone();
    let Some(patch) = detail.save()? else {
      return Ok(None);
    };
    Ok(Some(self.submit(&task_id, patch)?))
  }

  pub fn cancel_edit(
    &mut self
  ) -> Result<bool, EditorError> {
    Ok(
      self
        .detail
        .as_mut()
        .ok_or(EditorError::NoOpenDetail)?
        .cancel()
    )
  }

  // ---- subtasks ------------------------------

  pub fn toggle_subtask(
    &mut self,
    task_id: &TaskId,
    subtask_id: SubtaskId
  ) -> Result<SubmitHandle, BoardError> {
    let task = self.store.get(task_id).ok_or_else(
      || BoardError::UnknownTask(task_id.clone())
    )?;
    let next = toggle_subtask_by_id(task, subtask_id)?;
    self.submit(task_id, TaskPatch::subtasks(next))
  }

  /// Positional toggle; see [`crate::subtasks`]
  /// for why the id form is preferred.
  pub fn toggle_subtask_at(
    &mut self,
    task_id: &TaskId,
    index: usize
  ) -> Result<SubmitHandle, BoardError> {
    let task = self.store.get(task_id).ok_or_else(
      || BoardError::UnknownTask(task_id.clone())
    )?;
    let next = toggle_subtask(task, index)?;
    self.submit(task_id, TaskPatch::subtasks(next))
  }

  // ---- session -------------------------------

  /// Ends the session and drops every piece of
  /// board state. In-flight writes are not
  /// cancelled; their completions come back
  /// stale.
  pub fn logout(
    &mut self,
    provider: &mut dyn SessionProvider
  ) {
    provider.logout();
    self.session = Session::anonymous();
    self.drag.cancel();
    self.detail = None;
    self.queue.clear();
    self.store.clear();
    self.board = BoardState::default();
    self.load = LoadState::Idle;
    self.notices.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::remote::MemoryRemote;
  use crate::session::StaticSession;
  use crate::testing::{
    ids,
    task
  };
  use corkboard_shared::{
    CurrentUser,
    Subtask,
    TaskStatus
  };

  fn loaded(
    tasks: Vec<TaskDto>
  ) -> Workspace {
    let mut ws = Workspace::new(
      Session::anonymous(),
      PatchMode::FullDraft
    );
    ws.install_tasks(ProjectId::from("P1"), tasks);
    ws
  }

  #[test]
  fn drag_between_columns_submits_one_status_write(
  ) {
    let mut ws = loaded(vec![
      task("T1", TaskStatus::Todo),
      task("T2", TaskStatus::Todo),
    ]);
    let t2 = TaskId::from("T2");

    assert_eq!(ws.drag_start(&t2), Ok(true));
    ws.drag_hover(Some(Slot::new(
      TaskStatus::Done,
      0
    )));
    let handle = ws
      .drag_release()
      .expect("valid move")
      .expect("column changed");
    assert_eq!(handle.task_id(), &t2);

    let columns = ws.columns().expect("loaded");
    assert_eq!(
      columns.column(TaskStatus::Todo),
      ids(&["T1"]).as_slice()
    );
    assert_eq!(
      columns.column(TaskStatus::Done),
      ids(&["T2"]).as_slice()
    );

    let writes = ws.take_ready_writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(
      writes[0].patch,
      TaskPatch::status(TaskStatus::Done)
    );
  }

  #[test]
  fn null_drag_issues_no_write() {
    let mut ws = loaded(vec![
      task("T1", TaskStatus::Todo),
      task("T2", TaskStatus::Todo),
    ]);
    let before =
      ws.columns().expect("loaded").clone();

    ws.drag_start(&TaskId::from("T1"))
      .expect("on board");
    ws.drag_hover(Some(Slot::new(
      TaskStatus::Todo,
      0
    )));
    assert_eq!(ws.drag_release(), Ok(None));
    assert_eq!(ws.columns(), Ok(&before));
    assert!(ws.take_ready_writes().is_empty());
  }

  #[test]
  fn reorder_moves_card_without_writing() {
    let mut ws = loaded(vec![
      task("T1", TaskStatus::Todo),
      task("T2", TaskStatus::Todo),
    ]);
    ws.drag_start(&TaskId::from("T2"))
      .expect("on board");
    ws.drag_hover(Some(Slot::new(
      TaskStatus::Todo,
      0
    )));
    assert_eq!(ws.drag_release(), Ok(None));
    assert_eq!(
      ws.columns()
        .expect("loaded")
        .column(TaskStatus::Todo),
      ids(&["T2", "T1"]).as_slice()
    );
    assert!(ws.take_ready_writes().is_empty());
  }

  #[test]
  fn failed_move_returns_card_to_its_column() {
    let mut ws = loaded(vec![
      task("T1", TaskStatus::Todo),
      task("T2", TaskStatus::Todo),
    ]);
    let t1 = TaskId::from("T1");
    ws.move_task(
      &t1,
      Slot::new(TaskStatus::InProgress, 0)
    )
    .expect("move");
    let writes = ws.take_ready_writes();

    ws.complete_write(
      writes[0].ticket,
      Err(RemoteError::Transport(
        "offline".to_string()
      ))
    );

    let columns = ws.columns().expect("loaded");
    assert!(
      columns
        .column(TaskStatus::InProgress)
        .is_empty()
    );
    assert_eq!(
      columns.column(TaskStatus::Todo),
      ids(&["T1", "T2"]).as_slice()
    );
    assert_eq!(
      ws.task(&t1).map(|t| t.status),
      Some(TaskStatus::Todo)
    );

    let notices = ws.drain_notices();
    assert_eq!(notices.len(), 1);
    assert!(
      notices[0]
        .to_string()
        .contains("Task T1")
    );
  }

  #[test]
  fn edit_cancel_leaves_store_and_queue_untouched(
  ) {
    let mut ws =
      loaded(vec![task("T1", TaskStatus::Todo)]);
    let t1 = TaskId::from("T1");
    let before = ws.task(&t1).cloned();

    ws.open_detail(&t1).expect("open");
    ws.begin_edit().expect("edit");
    {
      let draft = ws.draft_mut().expect("draft");
      draft.title = "Changed".to_string();
      draft.status = TaskStatus::Done;
    }
    assert_eq!(ws.cancel_edit(), Ok(true));

    assert_eq!(ws.task(&t1).cloned(), before);
    assert!(ws.take_ready_writes().is_empty());
    assert_eq!(ws.queue().pending_count(), 0);
  }

  #[test]
  fn closing_while_editing_discards_the_draft() {
    let mut ws =
      loaded(vec![task("T1", TaskStatus::Todo)]);
    let t1 = TaskId::from("T1");

    ws.open_detail(&t1).expect("open");
    ws.begin_edit().expect("edit");
    ws.draft_mut().expect("draft").title =
      "Never saved".to_string();
    ws.close_detail();

    assert!(ws.detail().is_none());
    assert_eq!(
      ws.task(&t1).map(|t| t.title.as_str()),
      Some("Task T1")
    );
    assert!(ws.take_ready_writes().is_empty());
    assert_eq!(
      ws.save_edit(),
      Err(EditorError::NoOpenDetail)
    );
  }

  #[test]
  fn save_is_optimistic_and_leaves_edit_mode() {
    let mut ws =
      loaded(vec![task("T1", TaskStatus::Todo)]);
    let t1 = TaskId::from("T1");

    ws.open_detail(&t1).expect("open");
    ws.begin_edit().expect("edit");
    ws.draft_mut().expect("draft").status =
      TaskStatus::InProgress;
    let handle = ws
      .save_edit()
      .expect("save")
      .expect("submitted");

    assert!(
      !ws.detail()
        .expect("still open")
        .is_editing()
    );
    assert!(ws.queue().is_unsettled(&handle));
    assert_eq!(
      ws.columns()
        .expect("loaded")
        .column(TaskStatus::InProgress),
      ids(&["T1"]).as_slice()
    );
  }

  #[test]
  fn opening_another_task_closes_the_current_editor(
  ) {
    let mut ws = loaded(vec![
      task("T1", TaskStatus::Todo),
      task("T2", TaskStatus::Todo),
    ]);
    ws.open_detail(&TaskId::from("T1"))
      .expect("open T1");
    ws.begin_edit().expect("edit T1");

    ws.open_detail(&TaskId::from("T2"))
      .expect("open T2");
    let detail = ws.detail().expect("open");
    assert_eq!(detail.task_id(), &TaskId::from("T2"));
    assert!(!detail.is_editing());
  }

  #[tokio::test]
  async fn subtask_scenario_rolls_back_to_confirmed_state(
  ) {
    let mut t1 = task("T1", TaskStatus::Todo);
    t1.subtasks = vec![Subtask::new("A")];
    let subtask_id = t1.subtasks[0].id;
    let remote =
      MemoryRemote::new(vec![], vec![t1]);
    let id = TaskId::from("T1");

    let mut ws = Workspace::new(
      Session::anonymous(),
      PatchMode::FullDraft
    );
    ws.load(&remote, ProjectId::from("P1"))
      .await
      .expect("load");

    ws.toggle_subtask(&id, subtask_id)
      .expect("toggle");
    let outcomes = ws.pump(&remote).await;
    assert!(matches!(
      outcomes.as_slice(),
      [Reconciliation::Confirmed { .. }]
    ));
    assert!(
      ws.task(&id).expect("T1").subtasks[0]
        .is_completed
    );

    remote.fail_next_update(
      &id,
      RemoteError::Transport(
        "offline".to_string()
      )
    );
    ws.toggle_subtask(&id, subtask_id)
      .expect("toggle again");
    assert!(
      !ws.task(&id).expect("T1").subtasks[0]
        .is_completed,
      "optimistic toggle is visible at once"
    );

    ws.pump(&remote).await;
    assert!(
      ws.task(&id).expect("T1").subtasks[0]
        .is_completed
    );
    assert_eq!(remote.update_calls().len(), 2);
  }

  #[tokio::test]
  async fn failed_load_blocks_the_board() {
    let remote = MemoryRemote::new(
      vec![],
      vec![task("T1", TaskStatus::Todo)]
    );
    let mut ws = Workspace::new(
      Session::anonymous(),
      PatchMode::FullDraft
    );
    ws.load(&remote, ProjectId::from("P1"))
      .await
      .expect("first load");

    remote.set_read_fault(Some(
      RemoteError::Transport(
        "502".to_string()
      )
    ));
    let err = ws
      .refetch(&remote)
      .await
      .expect_err("read fault");
    assert_eq!(
      err.project_id,
      ProjectId::from("P1")
    );
    assert_eq!(
      ws.columns(),
      Err(BoardError::NotLoaded)
    );

    remote.set_read_fault(None);
    ws.refetch(&remote).await.expect("recovered");
    assert_eq!(
      ws.columns().expect("loaded").len(),
      1
    );
  }

  #[tokio::test]
  async fn read_failure_keeps_unsettled_writes() {
    let remote = MemoryRemote::new(
      vec![],
      vec![
        task("T1", TaskStatus::Todo),
        task("T2", TaskStatus::Todo),
      ]
    );
    let (t1, t2) =
      (TaskId::from("T1"), TaskId::from("T2"));
    let mut ws = Workspace::new(
      Session::anonymous(),
      PatchMode::FullDraft
    );
    ws.load(&remote, ProjectId::from("P1"))
      .await
      .expect("load");

    ws.move_task(
      &t1,
      Slot::new(TaskStatus::Done, 0)
    )
    .expect("move T1");
    ws.move_task(
      &t2,
      Slot::new(TaskStatus::InProgress, 0)
    )
    .expect("move T2");
    let writes = ws.take_ready_writes();
    assert_eq!(writes.len(), 2);

    remote.set_read_fault(Some(
      RemoteError::Transport(
        "502".to_string()
      )
    ));
    ws.refetch(&remote)
      .await
      .expect_err("read fault");
    assert_eq!(ws.queue().in_flight_count(), 2);

    remote.set_read_fault(None);
    ws.refetch(&remote).await.expect("recovered");
    assert_eq!(
      ws.task(&t1).map(|t| t.status),
      Some(TaskStatus::Done)
    );

    let first = writes
      .iter()
      .find(|req| req.task_id == t1)
      .expect("T1 write");
    let result =
      remote.update_task(&t1, &first.patch).await;
    assert!(matches!(
      ws.complete_write(first.ticket, result),
      Reconciliation::Confirmed { .. }
    ));

    let second = writes
      .iter()
      .find(|req| req.task_id == t2)
      .expect("T2 write");
    assert!(matches!(
      ws.complete_write(
        second.ticket,
        Err(RemoteError::Transport(
          "offline".to_string()
        ))
      ),
      Reconciliation::RolledBack { .. }
    ));
    assert_eq!(
      ws.task(&t2).map(|t| t.status),
      Some(TaskStatus::Todo)
    );
    assert_eq!(ws.queue().pending_count(), 0);

    let write_failures = ws
      .drain_notices()
      .into_iter()
      .filter(|notice| {
        matches!(
          notice,
          Notice::WriteFailed { .. }
        )
      })
      .count();
    assert_eq!(write_failures, 1);
  }

  #[tokio::test]
  async fn refetch_keeps_in_flight_optimistic_state(
  ) {
    let remote = MemoryRemote::new(
      vec![],
      vec![task("T1", TaskStatus::Todo)]
    );
    let id = TaskId::from("T1");
    let mut ws = Workspace::new(
      Session::anonymous(),
      PatchMode::FullDraft
    );
    ws.load(&remote, ProjectId::from("P1"))
      .await
      .expect("load");

    ws.move_task(
      &id,
      Slot::new(TaskStatus::Done, 0)
    )
    .expect("move");
    let writes = ws.take_ready_writes();

    ws.refetch(&remote).await.expect("refetch");
    assert_eq!(
      ws.task(&id).map(|t| t.status),
      Some(TaskStatus::Done)
    );

    let result = remote
      .update_task(&id, &writes[0].patch)
      .await;
    let outcome =
      ws.complete_write(writes[0].ticket, result);
    assert!(matches!(
      outcome,
      Reconciliation::Confirmed { .. }
    ));
    assert_eq!(ws.queue().pending_count(), 0);
  }

  #[test]
  fn logout_clears_board_state() {
    let mut provider =
      StaticSession::new(Some(CurrentUser {
        name:  "Ada".to_string(),
        email: "ada@example.com".to_string()
      }));
    let mut ws = Workspace::new(
      Session::from_provider(&provider),
      PatchMode::FullDraft
    );
    ws.install_tasks(
      ProjectId::from("P1"),
      vec![task("T1", TaskStatus::Todo)]
    );
    let t1 = TaskId::from("T1");
    ws.move_task(&t1, Slot::new(TaskStatus::Done, 0))
      .expect("move");
    let writes = ws.take_ready_writes();

    ws.logout(&mut provider);
    assert!(!ws.session().is_signed_in());
    assert_eq!(ws.load_state(), &LoadState::Idle);
    assert_eq!(
      ws.complete_write(
        writes[0].ticket,
        Err(RemoteError::Transport(
          "late".to_string()
        ))
      ),
      Reconciliation::Stale {
        ticket: writes[0].ticket
      }
    );
  }

  #[test]
  fn board_ops_before_load_are_refused() {
    let mut ws = Workspace::new(
      Session::anonymous(),
      PatchMode::FullDraft
    );
    assert_eq!(
      ws.drag_start(&TaskId::from("T1")),
      Err(BoardError::NotLoaded)
    );
    assert_eq!(
      ws.move_task(
        &TaskId::from("T1"),
        Slot::new(TaskStatus::Done, 0)
      ),
      Err(BoardError::NotLoaded)
    );
  }
}
