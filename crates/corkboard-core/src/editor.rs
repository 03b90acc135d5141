use chrono::NaiveDate;
use corkboard_shared::{
  TaskDto,
  TaskId,
  TaskPatch,
  TaskPriority,
  TaskStatus
};
use tracing::{
  debug,
  warn
};

use crate::error::EditorError;

/// Editable copy of a task's form fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
  pub title:       String,
  pub description: String,
  pub status:      TaskStatus,
  pub priority:    TaskPriority,
  pub due_date:    Option<NaiveDate>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
  Title,
  Description,
  Status,
  Priority,
  DueDate
}

impl Draft {
  pub fn from_task(task: &TaskDto) -> Self {
    Self {
      title:       task.title.clone(),
      description: task
        .description
        .clone()
        .unwrap_or_default(),
      status:      task.status,
      priority:    task.priority,
      due_date:    task.due_date
    }
  }

  fn description_value(
    &self
  ) -> Option<String> {
    let trimmed = self.description.trim();
    (!trimmed.is_empty())
      .then(|| self.description.clone())
  }

  /// Every form field. Untouched fields carry
  /// `original`'s stored values verbatim; only
  /// edited ones are normalized.
  pub fn full_patch(
    &self,
    original: &TaskDto
  ) -> TaskPatch {
    let mut patch = TaskPatch {
      title: Some(original.title.clone()),
      description: Some(
        original.description.clone()
      ),
      status: Some(original.status),
      priority: Some(original.priority),
      due_date: Some(original.due_date),
      subtasks: None
    };
    patch.merge(self.diff_patch(original));
    patch
  }

  /// Only the fields that differ from
  /// `original`, normalized.
  pub fn diff_patch(
    &self,
    original: &TaskDto
  ) -> TaskPatch {
    let dirty = self.dirty_fields(original);
    let has = |field| dirty.contains(&field);
    TaskPatch {
      title: has(DraftField::Title)
        .then(|| self.title.trim().to_string()),
      description: has(DraftField::Description)
        .then(|| self.description_value()),
      status: has(DraftField::Status)
        .then_some(self.status),
      priority: has(DraftField::Priority)
        .then_some(self.priority),
      due_date: has(DraftField::DueDate)
        .then_some(self.due_date),
      subtasks: None
    }
  }

  pub fn dirty_fields(
    &self,
    original: &TaskDto
  ) -> Vec<DraftField> {
    let snapshot = Draft::from_task(original);
    let mut out = Vec::new();
    if self.title.trim() != snapshot.title.trim()
    {
      out.push(DraftField::Title);
    }
    if self.description_value()
      != snapshot.description_value()
    {
      out.push(DraftField::Description);
    }
    if self.status != snapshot.status {
      out.push(DraftField::Status);
    }
    if self.priority != snapshot.priority {
      out.push(DraftField::Priority);
    }
    if self.due_date != snapshot.due_date {
      out.push(DraftField::DueDate);
    }
    out
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchMode {
  /// Re-send every draft field on save.
  #[default]
  FullDraft,
  /// Send only dirty fields; same end state.
  DiffOnly
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorMode {
  Viewing,
  /// `original` is the task as it was when
  /// editing began.
  Editing {
    original: TaskDto,
    draft:    Draft
  }
}

/// View/edit state machine for one open task
/// detail surface. It never writes to the
/// store; `save` hands the caller a patch to
/// submit.
#[derive(Debug, Clone)]
pub struct TaskDetailEditor {
  task_id:    TaskId,
  mode:       EditorMode,
  patch_mode: PatchMode
}

impl TaskDetailEditor {
  pub fn new(
    task_id: TaskId,
    patch_mode: PatchMode
  ) -> Self {
    Self {
      task_id,
      mode: EditorMode::Viewing,
      patch_mode
    }
  }

  pub fn task_id(&self) -> &TaskId {
    &self.task_id
  }

  pub fn mode(&self) -> &EditorMode {
    &self.mode
  }

  pub fn is_editing(&self) -> bool {
    matches!(
      self.mode,
      EditorMode::Editing { .. }
    )
  }

  /// `viewing -> editing`. Snapshots the task as
  /// it is now. Calling it while already
  /// editing keeps the existing draft.
  pub fn begin_edit(
    &mut self,
    task: &TaskDto
  ) -> bool {
    if self.is_editing() {
      debug!(task_id = %self.task_id, "already editing");
      return false;
    }
    debug!(task_id = %self.task_id, "enter edit mode");
    self.mode = EditorMode::Editing {
      draft:    Draft::from_task(task),
      original: task.clone()
    };
    true
  }

  pub fn draft(&self) -> Option<&Draft> {
    match &self.mode {
      | EditorMode::Editing {
        draft,
        ..
      } => Some(draft),
      | EditorMode::Viewing => None
    }
  }

  pub fn draft_mut(
    &mut self
  ) -> Result<&mut Draft, EditorError> {
    match &mut self.mode {
      | EditorMode::Editing {
        draft,
        ..
      } => Ok(draft),
      | EditorMode::Viewing => {
        Err(EditorError::NotEditing)
      }
    }
  }

  pub fn dirty_fields(
    &self
  ) -> Vec<DraftField> {
    match &self.mode {
      | EditorMode::Editing {
        original,
        draft
      } => draft.dirty_fields(original),
      | EditorMode::Viewing => Vec::new()
    }
  }

  /// `editing -> viewing` via save. Returns the
  /// patch to submit, or `None` when diffing
  /// found nothing to send. An empty title
  /// keeps the surface in edit mode.
  pub fn save(
    &mut self
  ) -> Result<Option<TaskPatch>, EditorError>
  {
    let EditorMode::Editing {
      original,
      draft
    } = &self.mode
    else {
      return Err(EditorError::NotEditing);
    };

    if draft.title.trim().is_empty() {
      warn!(
        task_id = %self.task_id,
        "refusing to save a draft with an empty title"
      );
      return Err(EditorError::EmptyTitle);
    }

    let patch = match self.patch_mode {
      | PatchMode::FullDraft => {
        draft.full_patch(original)
      }
      | PatchMode::DiffOnly => {
        draft.diff_patch(original)
      }
    };

    debug!(
      task_id = %self.task_id,
      fields = ?patch.field_names(),
      "leaving edit mode via save"
    );
    self.mode = EditorMode::Viewing;
    Ok((!patch.is_empty()).then_some(patch))
  }

  /// `editing -> viewing` via cancel. The draft
  /// is dropped; nothing is submitted.
  pub fn cancel(&mut self) -> bool {
    if !self.is_editing() {
      return false;
    }
    debug!(
      task_id = %self.task_id,
      dirty = ?self.dirty_fields(),
      "discarding draft"
    );
    self.mode = EditorMode::Viewing;
    true
  }
}
