//! The remote store boundary. Transport and
//! framing belong to whoever implements
//! [`Remote`]; the core only relies on the
//! request/response contract.

use std::cell::RefCell;
use std::collections::{
  HashMap,
  VecDeque
};
use std::future::Future;

use corkboard_shared::{
  ProjectDto,
  ProjectId,
  TaskDto,
  TaskId,
  TaskPatch,
  TaskUpdateArgs,
  TasksListArgs
};
use tracing::debug;

use crate::error::RemoteError;

pub trait Remote {
  fn fetch_projects(
    &self
  ) -> impl Future<
    Output = Result<Vec<ProjectDto>, RemoteError>
  >;

  fn fetch_tasks(
    &self,
    project_id: &ProjectId
  ) -> impl Future<
    Output = Result<Vec<TaskDto>, RemoteError>
  >;

  /// Partial update; resolves to the full task
  /// as the server stored it.
  fn update_task(
    &self,
    task_id: &TaskId,
    patch: &TaskPatch
  ) -> impl Future<
    Output = Result<TaskDto, RemoteError>
  >;
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
  FetchProjects,
  FetchTasks(TasksListArgs),
  UpdateTask(TaskUpdateArgs)
}

#[derive(Debug, Default)]
struct MemoryState {
  projects:      Vec<ProjectDto>,
  tasks:         Vec<TaskDto>,
  update_faults:
    HashMap<TaskId, VecDeque<RemoteError>>,
  read_fault:    Option<RemoteError>,
  calls:         Vec<RemoteCall>
}

/// Single-threaded in-memory remote with
/// scripted faults and a call log.
#[derive(Debug, Default)]
pub struct MemoryRemote {
  state: RefCell<MemoryState>
}

impl MemoryRemote {
  pub fn new(
    projects: Vec<ProjectDto>,
    tasks: Vec<TaskDto>
  ) -> Self {
    Self {
      state: RefCell::new(MemoryState {
        projects,
        tasks,
        ..MemoryState::default()
      })
    }
  }

  /// The next update of `task_id` fails with
  /// `error`. Faults queue up per task.
  pub fn fail_next_update(
    &self,
    task_id: &TaskId,
    error: RemoteError
  ) {
    self
      .state
      .borrow_mut()
      .update_faults
      .entry(task_id.clone())
      .or_default()
      .push_back(error);
  }

  /// Every fetch fails until cleared with
  /// `None`.
  pub fn set_read_fault(
    &self,
    error: Option<RemoteError>
  ) {
    self.state.borrow_mut().read_fault = error;
  }

  /// Replaces a task server side, as another
  /// client would.
  pub fn put_task(&self, task: TaskDto) {
    let mut state = self.state.borrow_mut();
    match state
      .tasks
      .iter_mut()
      .find(|t| t.id == task.id)
    {
      | Some(slot) => *slot = task,
      | None => state.tasks.push(task)
    }
  }

  pub fn task(
    &self,
    task_id: &TaskId
  ) -> Option<TaskDto> {
    self
      .state
      .borrow()
      .tasks
      .iter()
      .find(|t| &t.id == task_id)
      .cloned()
  }

  pub fn calls(&self) -> Vec<RemoteCall> {
    self.state.borrow().calls.clone()
  }

  pub fn update_calls(
    &self
  ) -> Vec<TaskUpdateArgs> {
    self
      .state
      .borrow()
      .calls
      .iter()
      .filter_map(|call| match call {
        | RemoteCall::UpdateTask(args) => {
          Some(args.clone())
        }
        | _ => None
      })
      .collect()
  }
}

impl Remote for MemoryRemote {
  async fn fetch_projects(
    &self
  ) -> Result<Vec<ProjectDto>, RemoteError> {
    let mut state = self.state.borrow_mut();
    state.calls.push(RemoteCall::FetchProjects);
    if let Some(err) = &state.read_fault {
      return Err(err.clone());
    }
    Ok(state.projects.clone())
  }

  async fn fetch_tasks(
    &self,
    project_id: &ProjectId
  ) -> Result<Vec<TaskDto>, RemoteError> {
    let mut state = self.state.borrow_mut();
    state.calls.push(RemoteCall::FetchTasks(
      TasksListArgs {
        project_id: project_id.clone()
      }
    ));
    if let Some(err) = &state.read_fault {
      return Err(err.clone());
    }
    if !state.projects.is_empty()
      && !state
        .projects
        .iter()
        .any(|p| &p.id == project_id)
    {
      return Err(RemoteError::ProjectNotFound(
        project_id.clone()
      ));
    }
    Ok(
      state
        .tasks
        .iter()
        .filter(|t| &t.project == project_id)
        .cloned()
        .collect()
    )
  }

  async fn update_task(
    &self,
    task_id: &TaskId,
    patch: &TaskPatch
  ) -> Result<TaskDto, RemoteError> {
    let mut state = self.state.borrow_mut();
    state.calls.push(RemoteCall::UpdateTask(
      TaskUpdateArgs {
        task_id: task_id.clone(),
        patch:   patch.clone()
      }
    ));

    if let Some(err) = state
      .update_faults
      .get_mut(task_id)
      .and_then(VecDeque::pop_front)
    {
      debug!(%task_id, error = %err, "injected update fault");
      return Err(err);
    }

    if patch
      .title
      .as_deref()
      .is_some_and(|title| title.trim().is_empty())
    {
      return Err(RemoteError::Validation(
        "title is required".to_string()
      ));
    }

    let Some(slot) = state
      .tasks
      .iter_mut()
      .find(|t| &t.id == task_id)
    else {
      return Err(RemoteError::TaskNotFound(
        task_id.clone()
      ));
    };
    *slot = slot.apply(patch);
    Ok(slot.clone())
  }
}
