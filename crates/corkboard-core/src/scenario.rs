//! JSON scenarios replayed against an in-memory
//! remote. Each step drives the workspace the way
//! a user or the network would.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow};
use corkboard_shared::dates::parse_due_date;
use corkboard_shared::{
    ProjectDto, ProjectId, SubtaskId, TaskDto, TaskId, TaskPriority, TaskStatus,
};
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::drag::Slot;
use crate::error::RemoteError;
use crate::mutation::WriteRequest;
use crate::remote::{MemoryRemote, Remote};
use crate::session::{Session, StaticSession};
use crate::workspace::{Notice, Workspace};

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub project: ProjectId,
    #[serde(default)]
    pub projects: Vec<ProjectDto>,
    pub tasks: Vec<TaskDto>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotSpec {
    pub status: TaskStatus,
    #[serde(default)]
    pub index: usize,
}

impl From<&SlotSpec> for Slot {
    fn from(spec: &SlotSpec) -> Self {
        Slot::new(spec.status, spec.index)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SubtaskRef {
    Index(usize),
    Id(Uuid),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Full gesture. No `to` means released
    /// outside every column.
    Drag {
        task: TaskId,
        #[serde(default)]
        to: Option<SlotSpec>,
    },
    Move {
        task: TaskId,
        status: TaskStatus,
        #[serde(default)]
        index: usize,
    },
    Toggle {
        task: TaskId,
        subtask: SubtaskRef,
    },
    /// Opens the detail surface, enters edit
    /// mode and changes the given fields.
    Edit {
        task: TaskId,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        status: Option<TaskStatus>,
        #[serde(default)]
        priority: Option<TaskPriority>,
        /// Empty string clears the date.
        #[serde(default)]
        due_date: Option<String>,
    },
    Save,
    Cancel,
    Close,
    /// Hands every ready write to the network
    /// without completing it.
    Dispatch,
    /// Completes the oldest dispatched write,
    /// optionally of one task only.
    Resolve {
        #[serde(default)]
        task: Option<TaskId>,
    },
    /// Completes everything dispatched, then
    /// pumps until the queue is quiet.
    Settle,
    Refetch,
    FailNext {
        task: TaskId,
        #[serde(default = "default_fault")]
        error: String,
    },
    FailReads {
        #[serde(default)]
        error: Option<String>,
    },
    Logout,
    Expect(Expectation),
}

fn default_fault() -> String {
    "injected failure".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Expectation {
    /// Column key (`todo`, `in_progress`,
    /// `done`) to task ids in display order.
    #[serde(default)]
    pub columns: BTreeMap<String, Vec<TaskId>>,
    #[serde(default)]
    pub pending: Option<usize>,
    #[serde(default)]
    pub notices: Option<usize>,
    #[serde(default)]
    pub errors: Option<usize>,
    #[serde(default)]
    pub tasks: Vec<TaskExpectation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskExpectation {
    pub id: TaskId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub completed_subtasks: Option<usize>,
}

#[derive(Debug, Default)]
pub struct ScenarioReport {
    pub name: String,
    pub projects: Vec<ProjectDto>,
    pub steps_run: usize,
    pub notices: Vec<Notice>,
    pub step_errors: Vec<String>,
    pub failures: Vec<String>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

pub fn load_scenarios<P: AsRef<Path>>(paths: &[P]) -> anyhow::Result<Vec<Scenario>> {
    let mut out = Vec::new();

    for path in paths {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        let scenario: Scenario = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse scenario {}", path.display()))?;
        out.push(scenario);
    }

    Ok(out)
}

/// Owns the workspace, the fake remote and the
/// writes that are "on the wire" between a
/// `dispatch` and their `resolve`.
#[derive(Debug)]
pub struct ScenarioRunner {
    pub workspace: Workspace,
    pub remote: MemoryRemote,
    provider: StaticSession,
    wire: Vec<WriteRequest>,
    report: ScenarioReport,
}

impl ScenarioRunner {
    pub fn new(scenario: &Scenario, settings: &Settings) -> Self {
        let provider = StaticSession::new(settings.user.clone());
        let workspace = Workspace::new(Session::from_provider(&provider), settings.patch_mode);
        Self {
            workspace,
            remote: MemoryRemote::new(scenario.projects.clone(), scenario.tasks.clone()),
            provider,
            wire: Vec::new(),
            report: ScenarioReport {
                name: scenario.name.clone(),
                ..ScenarioReport::default()
            },
        }
    }

    /// Loads the project, then replays every
    /// step. Step errors are recorded, not fatal;
    /// only a failed initial load aborts.
    #[tracing::instrument(skip_all, fields(scenario = %scenario.name))]
    pub async fn run(mut self, scenario: &Scenario) -> anyhow::Result<(Workspace, ScenarioReport)> {
        self.report.projects = self
            .remote
            .fetch_projects()
            .await
            .context("failed to list projects")?;
        self.workspace
            .load(&self.remote, scenario.project.clone())
            .await
            .with_context(|| format!("scenario {} could not load its board", scenario.name))?;

        for (idx, step) in scenario.steps.iter().enumerate() {
            debug!(step = idx + 1, ?step, "replaying step");
            if let Err(err) = self.apply(idx + 1, step).await {
                warn!(step = idx + 1, error = %err, "step failed");
                self.report.step_errors.push(format!("step {}: {err:#}", idx + 1));
            }
            self.report.notices.extend(self.workspace.drain_notices());
            self.report.steps_run += 1;
        }

        info!(
            steps = self.report.steps_run,
            failures = self.report.failures.len(),
            "scenario finished"
        );
        Ok((self.workspace, self.report))
    }

    async fn apply(&mut self, step_no: usize, step: &Step) -> anyhow::Result<()> {
        match step {
            Step::Drag { task, to } => {
                if !self.workspace.drag_start(task)? {
                    return Err(anyhow!("a drag is already in progress"));
                }
                self.workspace.drag_hover(to.as_ref().map(Slot::from));
                self.workspace.drag_release()?;
            }
            Step::Move {
                task,
                status,
                index,
            } => {
                self.workspace.move_task(task, Slot::new(*status, *index))?;
            }
            Step::Toggle { task, subtask } => match subtask {
                SubtaskRef::Index(index) => {
                    self.workspace.toggle_subtask_at(task, *index)?;
                }
                SubtaskRef::Id(id) => {
                    self.workspace.toggle_subtask(task, SubtaskId(*id))?;
                }
            },
            Step::Edit {
                task,
                title,
                description,
                status,
                priority,
                due_date,
            } => {
                let due_date = match due_date.as_deref().map(str::trim) {
                    None => None,
                    Some("") => Some(None),
                    Some(raw) => Some(Some(
                        parse_due_date(raw).ok_or_else(|| anyhow!("invalid due date: {raw}"))?,
                    )),
                };
                self.workspace.open_detail(task)?;
                self.workspace.begin_edit()?;
                let draft = self.workspace.draft_mut()?;
                if let Some(title) = title {
                    draft.title = title.clone();
                }
                if let Some(description) = description {
                    draft.description = description.clone();
                }
                if let Some(status) = status {
                    draft.status = *status;
                }
                if let Some(priority) = priority {
                    draft.priority = *priority;
                }
                if let Some(due_date) = due_date {
                    draft.due_date = due_date;
                }
            }
            Step::Save => {
                self.workspace.save_edit()?;
            }
            Step::Cancel => {
                self.workspace.cancel_edit()?;
            }
            Step::Close => self.workspace.close_detail(),
            Step::Dispatch => {
                let ready = self.workspace.take_ready_writes();
                debug!(writes = ready.len(), "dispatched");
                self.wire.extend(ready);
            }
            Step::Resolve { task } => {
                let pos = self
                    .wire
                    .iter()
                    .position(|req| task.as_ref().is_none_or(|id| &req.task_id == id))
                    .ok_or_else(|| anyhow!("no dispatched write to resolve"))?;
                let req = self.wire.remove(pos);
                self.resolve(req).await;
            }
            Step::Settle => {
                for req in std::mem::take(&mut self.wire) {
                    self.resolve(req).await;
                }
                self.workspace.pump(&self.remote).await;
            }
            Step::Refetch => {
                self.workspace.refetch(&self.remote).await?;
            }
            Step::FailNext { task, error } => {
                self.remote
                    .fail_next_update(task, RemoteError::Transport(error.clone()));
            }
            Step::FailReads { error } => {
                self.remote
                    .set_read_fault(error.clone().map(RemoteError::Transport));
            }
            Step::Logout => {
                self.wire.clear();
                self.workspace.logout(&mut self.provider);
            }
            Step::Expect(expectation) => {
                let failures = self.check(expectation);
                for failure in failures {
                    warn!(step = step_no, %failure, "expectation failed");
                    self.report.failures.push(format!("step {step_no}: {failure}"));
                }
            }
        }
        Ok(())
    }

    async fn resolve(&mut self, req: WriteRequest) {
        let result = self.remote.update_task(&req.task_id, &req.patch).await;
        let outcome = self.workspace.complete_write(req.ticket, result);
        debug!(?outcome, "write resolved");
    }

    fn check(&self, expect: &Expectation) -> Vec<String> {
        let mut failures = Vec::new();

        if !expect.columns.is_empty() {
            match self.workspace.columns() {
                Ok(columns) => {
                    for (key, want) in &expect.columns {
                        let Some(status) = TaskStatus::parse(key) else {
                            failures.push(format!("unknown column {key:?}"));
                            continue;
                        };
                        let got = columns.column(status);
                        if got != want.as_slice() {
                            failures.push(format!(
                                "column {key}: expected {}, got {}",
                                join_ids(want),
                                join_ids(got)
                            ));
                        }
                    }
                }
                Err(err) => failures.push(format!("columns unavailable: {err}")),
            }
        }

        if let Some(want) = expect.pending {
            let got = self.workspace.queue().pending_count();
            if got != want {
                failures.push(format!("pending writes: expected {want}, got {got}"));
            }
        }

        if let Some(want) = expect.notices {
            let got = self.report.notices.len();
            if got != want {
                failures.push(format!("notices: expected {want}, got {got}"));
            }
        }

        if let Some(want) = expect.errors {
            let got = self.report.step_errors.len();
            if got != want {
                failures.push(format!("step errors: expected {want}, got {got}"));
            }
        }

        for want in &expect.tasks {
            let Some(task) = self.workspace.task(&want.id) else {
                failures.push(format!("task {} is not on the board", want.id));
                continue;
            };
            if let Some(title) = &want.title
                && &task.title != title
            {
                failures.push(format!(
                    "task {} title: expected {title:?}, got {:?}",
                    want.id, task.title
                ));
            }
            if let Some(status) = want.status
                && task.status != status
            {
                failures.push(format!(
                    "task {} status: expected {}, got {}",
                    want.id,
                    status.key(),
                    task.status.key()
                ));
            }
            if let Some(done) = want.completed_subtasks
                && task.completed_subtasks() != done
            {
                failures.push(format!(
                    "task {} completed subtasks: expected {done}, got {}",
                    want.id,
                    task.completed_subtasks()
                ));
            }
        }

        failures
    }
}

fn join_ids(ids: &[TaskId]) -> String {
    let joined = ids.iter().map(TaskId::as_str).collect::<Vec<_>>().join(", ");
    format!("[{joined}]")
}
