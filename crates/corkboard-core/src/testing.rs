use corkboard_shared::{
  ProjectId,
  TaskDto,
  TaskId,
  TaskPriority,
  TaskStatus,
  UserRef
};

pub(crate) fn task(
  id: &str,
  status: TaskStatus
) -> TaskDto {
  TaskDto {
    id: TaskId::from(id),
    project: ProjectId::from("P1"),
    title: format!("Task {id}"),
    description: None,
    status,
    priority: TaskPriority::Medium,
    assignee: None,
    due_date: None,
    tags: vec![],
    subtasks: vec![],
    created_by: UserRef {
      id:   "u1".to_string(),
      name: "Grace Hopper".to_string()
    }
  }
}

pub(crate) fn ids(raw: &[&str]) -> Vec<TaskId> {
  raw.iter().map(|id| TaskId::from(*id)).collect()
}
