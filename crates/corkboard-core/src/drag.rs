use corkboard_shared::{
  TaskId,
  TaskStatus
};
use tracing::{
  debug,
  warn
};

/// A position on the board: a column and an
/// insertion index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
  pub status: TaskStatus,
  pub index:  usize
}

impl Slot {
  pub fn new(
    status: TaskStatus,
    index: usize
  ) -> Self {
    Self { status, index }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveDrag {
  pub task_id: TaskId,
  pub origin:  Slot,
  pub hover:   Option<Slot>
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragState {
  #[default]
  Idle,
  Dragging(ActiveDrag)
}

/// What a finished gesture asks the board to
/// do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveIntent {
  Reorder {
    task_id: TaskId,
    target:  Slot
  },
  MoveToColumn {
    task_id: TaskId,
    from:    TaskStatus,
    target:  Slot
  }
}

impl MoveIntent {
  pub fn task_id(&self) -> &TaskId {
    match self {
      | MoveIntent::Reorder {
        task_id,
        ..
      }
      | MoveIntent::MoveToColumn {
        task_id,
        ..
      } => task_id
    }
  }

  pub fn target(&self) -> Slot {
    match self {
      | MoveIntent::Reorder {
        target,
        ..
      }
      | MoveIntent::MoveToColumn {
        target,
        ..
      } => *target
    }
  }
}

/// `idle -> dragging -> idle`. Hovering only
/// updates feedback state; the board is touched
/// once, by the caller, with the intent that
/// `release` hands back.
#[derive(Debug, Clone, Default)]
pub struct DragController {
  state: DragState
}

impl DragController {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn state(&self) -> &DragState {
    &self.state
  }

  pub fn is_dragging(&self) -> bool {
    matches!(
      self.state,
      DragState::Dragging(_)
    )
  }

  pub fn dragging_task(
    &self
  ) -> Option<&TaskId> {
    match &self.state {
      | DragState::Dragging(active) => {
        Some(&active.task_id)
      }
      | DragState::Idle => None
    }
  }

  /// Current drop hint for rendering.
  pub fn hover(&self) -> Option<Slot> {
    match &self.state {
      | DragState::Dragging(active) => {
        active.hover
      }
      | DragState::Idle => None
    }
  }

  /// Starts a gesture. Returns `false` and
  /// leaves the active gesture alone if one is
  /// already running.
  pub fn start(
    &mut self,
    task_id: TaskId,
    origin: Slot
  ) -> bool {
    if let DragState::Dragging(active) =
      &self.state
    {
      warn!(
        active = %active.task_id,
        rejected = %task_id,
        "drag already in progress; ignoring new gesture"
      );
      return false;
    }

    debug!(
      %task_id,
      status = origin.status.key(),
      index = origin.index,
      "drag start"
    );
    self.state =
      DragState::Dragging(ActiveDrag {
        task_id,
        origin,
        hover: Some(origin)
      });
    true
  }

  /// Pointer moved. `None` means the pointer is
  /// outside every valid drop target.
  pub fn hover_over(
    &mut self,
    target: Option<Slot>
  ) {
    let DragState::Dragging(active) =
      &mut self.state
    else {
      return;
    };
    if active.hover != target {
      debug!(
        task_id = %active.task_id,
        ?target,
        "drag over"
      );
      active.hover = target;
    }
  }

  /// Ends the gesture. Yields an intent only if
  /// the pointer is over a valid target other
  /// than the origin slot.
  pub fn release(
    &mut self
  ) -> Option<MoveIntent> {
    let DragState::Dragging(active) =
      std::mem::take(&mut self.state)
    else {
      return None;
    };

    let Some(target) = active.hover else {
      debug!(
        task_id = %active.task_id,
        "released outside any column; restoring origin"
      );
      return None;
    };

    if target == active.origin {
      debug!(
        task_id = %active.task_id,
        "released on origin slot"
      );
      return None;
    }

    let intent = if target.status
      == active.origin.status
    {
      MoveIntent::Reorder {
        task_id: active.task_id,
        target
      }
    } else {
      MoveIntent::MoveToColumn {
        task_id: active.task_id,
        from: active.origin.status,
        target
      }
    };
    debug!(?intent, "drag release");
    Some(intent)
  }

  /// Escape key or lost pointer. Returns the
  /// origin the card snaps back to.
  pub fn cancel(&mut self) -> Option<Slot> {
    match std::mem::take(&mut self.state) {
      | DragState::Dragging(active) => {
        debug!(
          task_id = %active.task_id,
          "drag cancelled"
        );
        Some(active.origin)
      }
      | DragState::Idle => None
    }
  }
}
