//! Optimistic writes with per-task coalescing.
//!
//! `submit` publishes the patched task to the
//! store before any request exists. Requests are
//! only handed out by `take_ready`, which the
//! driver calls once the current event handler
//! has returned, so patches submitted within one
//! turn travel as a single write. At most one
//! write per task is ever on the wire; patches
//! arriving meanwhile are folded into a single
//! follow-up.
//!
//! Each task with unsettled writes keeps a
//! baseline: the task as it was before the first
//! of those patches. A failed write restores the
//! baseline exactly.

use std::collections::BTreeMap;

use corkboard_shared::{
  TaskDto,
  TaskId,
  TaskPatch
};
use tracing::{
  debug,
  error,
  info,
  warn
};

use crate::error::{
  BoardError,
  RemoteError
};
use crate::store::TaskStore;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
pub struct WriteTicket(u64);

impl std::fmt::Display for WriteTicket {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>
  ) -> std::fmt::Result {
    write!(f, "w{}", self.0)
  }
}

/// Returned by `submit`; lets the caller ask
/// whether that submission has settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitHandle {
  task_id:    TaskId,
  submission: u64
}

impl SubmitHandle {
  pub fn task_id(&self) -> &TaskId {
    &self.task_id
  }
}

/// One network write the driver must perform.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
  pub ticket:  WriteTicket,
  pub task_id: TaskId,
  pub patch:   TaskPatch
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
  Confirmed {
    task_id:   TaskId,
    ticket:    WriteTicket,
    /// A follow-up write is queued on top of
    /// the confirmed state.
    follow_up: bool
  },
  RolledBack {
    task_id:             TaskId,
    ticket:              WriteTicket,
    error:               RemoteError,
    discarded_follow_up: bool
  },
  /// The ticket no longer matches an in-flight
  /// write (dropped by a refetch or logout).
  Stale {
    ticket: WriteTicket
  }
}

#[derive(Debug, Clone)]
struct Batch {
  patch:            TaskPatch,
  first_submission: u64
}

#[derive(Debug, Clone)]
struct InFlight {
  ticket: WriteTicket,
  batch:  Batch
}

#[derive(Debug, Clone)]
struct PendingEntry {
  baseline:  TaskDto,
  in_flight: Option<InFlight>,
  queued:    Option<Batch>
}

impl PendingEntry {
  fn earliest_submission(&self) -> u64 {
    self
      .in_flight
      .as_ref()
      .map(|f| f.batch.first_submission)
      .or_else(|| {
        self
          .queued
          .as_ref()
          .map(|q| q.first_submission)
      })
      .unwrap_or(u64::MAX)
  }
}

#[derive(Debug, Default)]
pub struct MutationQueue {
  entries:         BTreeMap<TaskId, PendingEntry>,
  next_submission: u64,
  next_ticket:     u64
}

impl MutationQueue {
  pub fn new() -> Self {
    Self::default()
  }

  /// Applies `patch` to the stored task right
  /// away and schedules it for the remote. Only
  /// an unknown task id can fail, and then
  /// nothing is touched.
  #[tracing::instrument(
    skip(self, store, task_id, patch),
    fields(task_id = %task_id, patch_fields = ?patch.field_names())
  )]
  pub fn submit(
    &mut self,
    store: &mut TaskStore,
    task_id: &TaskId,
    patch: TaskPatch
  ) -> Result<SubmitHandle, BoardError> {
    let Some(current) =
      store.get(task_id).cloned()
    else {
      error!("submit for a task that is not in the store");
      return Err(BoardError::UnknownTask(
        task_id.clone()
      ));
    };

    let submission = self.next_submission;
    self.next_submission += 1;

    store.put(current.apply(&patch));

    let entry = self
      .entries
      .entry(task_id.clone())
      .or_insert_with(|| PendingEntry {
        baseline:  current,
        in_flight: None,
        queued:    None
      });

    match &mut entry.queued {
      | Some(batch) => {
        debug!(
          in_flight = entry.in_flight.is_some(),
          "coalescing into pending write"
        );
        batch.patch.merge(patch);
      }
      | None => {
        entry.queued = Some(Batch {
          patch,
          first_submission: submission
        });
      }
    }

    Ok(SubmitHandle {
      task_id: task_id.clone(),
      submission
    })
  }

  /// Hands out every write that may go on the
  /// wire now: one per task, and never for a
  /// task that already has one in flight.
  pub fn take_ready(
    &mut self
  ) -> Vec<WriteRequest> {
    let mut out = Vec::new();
    for (task_id, entry) in &mut self.entries
    {
      if entry.in_flight.is_some() {
        continue;
      }
      let Some(batch) = entry.queued.take()
      else {
        continue;
      };

      let ticket =
        WriteTicket(self.next_ticket);
      self.next_ticket += 1;

      debug!(
        %task_id,
        %ticket,
        fields = ?batch.patch.field_names(),
        "dispatching write"
      );
      out.push(WriteRequest {
        ticket,
        task_id: task_id.clone(),
        patch: batch.patch.clone()
      });
      entry.in_flight =
        Some(InFlight { ticket, batch });
    }
    out
  }

  /// Reconciles a finished write. Success makes
  /// the server copy authoritative (re-applying
  /// any queued follow-up on top); failure
  /// restores the baseline and drops the
  /// follow-up.
  #[tracing::instrument(skip(self, store, result))]
  pub fn complete(
    &mut self,
    store: &mut TaskStore,
    ticket: WriteTicket,
    result: Result<TaskDto, RemoteError>
  ) -> Reconciliation {
    let Some(task_id) = self
      .entries
      .iter()
      .find(|(_, entry)| {
        entry
          .in_flight
          .as_ref()
          .is_some_and(|f| f.ticket == ticket)
      })
      .map(|(id, _)| id.clone())
    else {
      warn!("completion for unknown write; ignoring");
      return Reconciliation::Stale { ticket };
    };

    match result {
      | Ok(confirmed) => {
        self.confirm(store, task_id, ticket, confirmed)
      }
      | Err(err) => {
        self.roll_back(store, task_id, ticket, err)
      }
    }
  }

  fn confirm(
    &mut self,
    store: &mut TaskStore,
    task_id: TaskId,
    ticket: WriteTicket,
    confirmed: TaskDto
  ) -> Reconciliation {
    let follow_up = match self
      .entries
      .get_mut(&task_id)
    {
      | Some(entry) => {
        entry.in_flight = None;
        match &entry.queued {
          | Some(batch) => {
            store.put(
              confirmed.apply(&batch.patch)
            );
            entry.baseline = confirmed;
            true
          }
          | None => {
            store.put(confirmed);
            false
          }
        }
      }
      | None => false
    };

    if !follow_up {
      self.entries.remove(&task_id);
    }

    info!(
      %task_id,
      %ticket,
      follow_up,
      "write confirmed"
    );
    Reconciliation::Confirmed {
      task_id,
      ticket,
      follow_up
    }
  }

  fn roll_back(
    &mut self,
    store: &mut TaskStore,
    task_id: TaskId,
    ticket: WriteTicket,
    err: RemoteError
  ) -> Reconciliation {
    let discarded_follow_up = match self
      .entries
      .remove(&task_id)
    {
      | Some(entry) => {
        store.put(entry.baseline);
        entry.queued.is_some()
      }
      | None => false
    };

    error!(
      %task_id,
      %ticket,
      error = %err,
      discarded_follow_up,
      "write failed; rolled back to last confirmed state"
    );
    Reconciliation::RolledBack {
      task_id,
      ticket,
      error: err,
      discarded_follow_up
    }
  }

  /// True while the submission behind `handle`
  /// is queued or on the wire.
  pub fn is_unsettled(
    &self,
    handle: &SubmitHandle
  ) -> bool {
    self
      .entries
      .get(&handle.task_id)
      .is_some_and(|entry| {
        handle.submission
          >= entry.earliest_submission()
      })
  }

  pub fn has_pending(
    &self,
    task_id: &TaskId
  ) -> bool {
    self.entries.contains_key(task_id)
  }

  pub fn in_flight_count(&self) -> usize {
    self
      .entries
      .values()
      .filter(|entry| {
        entry.in_flight.is_some()
      })
      .count()
  }

  /// Tasks whose local state is not yet
  /// confirmed.
  pub fn pending_count(&self) -> usize {
    self.entries.len()
  }

  /// The state a failure would restore.
  pub fn baseline(
    &self,
    task_id: &TaskId
  ) -> Option<&TaskDto> {
    self
      .entries
      .get(task_id)
      .map(|entry| &entry.baseline)
  }

  /// Installs a full refetch. Tasks with
  /// unsettled writes take the fetched copy as
  /// their new baseline and get their pending
  /// patches replayed on top; entries for tasks
  /// the fetch no longer contains are dropped.
  #[tracing::instrument(skip_all, fields(fetched = fetched.len()))]
  pub(crate) fn rebase(
    &mut self,
    store: &mut TaskStore,
    fetched: Vec<TaskDto>
  ) {
    store.replace_all(fetched);
    self.entries.retain(|task_id, entry| {
      let Some(server) =
        store.get(task_id).cloned()
      else {
        warn!(
          %task_id,
          "task vanished from refetch; dropping its pending writes"
        );
        return false;
      };

      let mut local = server.clone();
      if let Some(in_flight) = &entry.in_flight
      {
        local =
          local.apply(&in_flight.batch.patch);
      }
      if let Some(queued) = &entry.queued {
        local = local.apply(&queued.patch);
      }
      entry.baseline = server;
      store.put(local);
      true
    });
  }

  /// Forgets every pending write. Completions
  /// that arrive later are stale.
  pub(crate) fn clear(&mut self) {
    if !self.entries.is_empty() {
      warn!(
        pending = self.entries.len(),
        "discarding pending writes"
      );
    }
    self.entries.clear();
  }
}
