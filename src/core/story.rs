//! Story field sets, task lists, and the story text-file format.
//!
//! A story file is TOML with one table per field, each holding a single
//! `text` key of portable markup, plus one `[tasks]` table whose values are
//! comma-joined 5-tuples. The last task row is always the synthetic Total
//! row; its numeric columns are story-point-rounded sums of the real rows.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use thiserror::Error;

use super::points::story_points;
use super::status::{Status, UnknownStatus};

/// Table name of the task list inside a story file.
pub const TASKS_SECTION: &str = "tasks";

/// Field names with special meaning to the pipelines.
pub const STATUS_FIELD: &str = "status";
pub const TITLE_FIELD: &str = "title";
pub const DEVS_FIELD: &str = "devs";
pub const ID_FIELD: &str = "id";
pub const VALUE_FIELD: &str = "value";

/// The remaining-work fields, in the order their values concatenate into a
/// burndown series.
pub const SIZE_FIELDS: &[&str] = &["size 1", "size 2", "size 3", "size 4"];

const TOTAL_LABEL: &str = "Total";
const TOTAL_UNIT: &str = "Points";

#[derive(Debug, Error)]
pub enum StoryFileError {
    #[error("section '{0}' is not a table")]
    NotATable(String),

    #[error("section '{0}' has no 'text' key")]
    MissingText(String),

    #[error("task '{key}' is not a comma-joined 5-tuple: '{value}'")]
    MalformedTask { key: String, value: String },

    #[error("task '{key}' has a non-numeric points column: '{value}'")]
    BadPoints { key: String, value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("story file is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// One task row: what, planned points, remaining points, done points, who.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Task {
    pub description: String,
    pub planned: u32,
    pub remaining: u32,
    pub done: u32,
    pub assignee: String,
}

impl Task {
    /// Parse the comma-joined 5-tuple stored under `key`.
    pub fn parse(key: &str, value: &str) -> Result<Self, StoryFileError> {
        let parts: Vec<&str> = value.split(',').collect();
        let [description, planned, remaining, done, assignee] = parts[..] else {
            return Err(StoryFileError::MalformedTask {
                key: key.to_string(),
                value: value.to_string(),
            });
        };
        let points = |column: &str| {
            column.trim().parse::<u32>().map_err(|_| StoryFileError::BadPoints {
                key: key.to_string(),
                value: column.to_string(),
            })
        };
        Ok(Self {
            description: description.to_string(),
            planned: points(planned)?,
            remaining: points(remaining)?,
            done: points(done)?,
            assignee: assignee.to_string(),
        })
    }

    /// The comma-joined persisted form.
    pub fn to_row(&self) -> String {
        format!(
            "{},{},{},{},{}",
            self.description, self.planned, self.remaining, self.done, self.assignee
        )
    }

    /// A row counts as edited once its description no longer holds the
    /// `<taskN>` template placeholder and some work is planned for it.
    fn is_edited(&self, key: &str) -> bool {
        self.description != format!("<{key}>") && self.planned > 0
    }
}

/// Synthetic Total row for a task table: rounded sums of the real rows.
pub fn rollup_total(tasks: &[Task]) -> Task {
    let planned: u32 = tasks.iter().map(|t| t.planned).sum();
    let remaining: u32 = tasks.iter().map(|t| t.remaining).sum();
    let done: u32 = tasks.iter().map(|t| t.done).sum();
    Task {
        description: TOTAL_LABEL.to_string(),
        planned: story_points(planned),
        remaining: story_points(remaining),
        done: story_points(done),
        assignee: TOTAL_UNIT.to_string(),
    }
}

/// One backlog item: ordered field name to markup text, plus its task rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Story {
    pub fields: IndexMap<String, String>,
    pub tasks: IndexMap<String, Task>,
}

impl Story {
    pub fn load(path: &Path) -> Result<Self, StoryFileError> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, StoryFileError> {
        let table: toml::Table = raw.parse()?;
        let mut story = Self::default();

        for (key, value) in table {
            let section = value
                .as_table()
                .ok_or_else(|| StoryFileError::NotATable(key.clone()))?;
            if key == TASKS_SECTION {
                for (task_key, row) in section {
                    let row = row.as_str().ok_or_else(|| StoryFileError::MalformedTask {
                        key: task_key.clone(),
                        value: row.to_string(),
                    })?;
                    story.tasks.insert(task_key.clone(), Task::parse(task_key, row)?);
                }
            } else {
                let text = section
                    .get("text")
                    .and_then(toml::Value::as_str)
                    .ok_or_else(|| StoryFileError::MissingText(key.clone()))?;
                story.fields.insert(key, text.to_string());
            }
        }
        Ok(story)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoryFileError> {
        fs::write(path, self.to_toml_string())?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> String {
        let mut root = toml::Table::new();
        for (field, text) in &self.fields {
            let mut section = toml::Table::new();
            section.insert("text".to_string(), toml::Value::String(text.clone()));
            root.insert(field.clone(), toml::Value::Table(section));
        }
        if !self.tasks.is_empty() {
            let mut section = toml::Table::new();
            for (key, task) in &self.tasks {
                section.insert(key.clone(), toml::Value::String(task.to_row()));
            }
            root.insert(TASKS_SECTION.to_string(), toml::Value::Table(section));
        }
        root.to_string()
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Parse the status field exactly; a missing field reads as empty.
    pub fn try_status(&self) -> Result<Status, UnknownStatus> {
        self.field(STATUS_FIELD).unwrap_or("").parse()
    }

    /// Status with a fallback: anything unparseable is treated as the given
    /// boundary state instead of failing, so one corrupt story cannot block
    /// a batch.
    pub fn status_or(&self, fallback: Status) -> Status {
        self.try_status().unwrap_or(fallback)
    }

    /// Put all edited tasks back into their planning state: remaining =
    /// planned, nothing done. Used for stories that are planned but not yet
    /// picked up (`ready`, `accepted`, `committed`).
    pub fn reset_task_points(&mut self) {
        let Some(total_key) = self.tasks.keys().last().cloned() else {
            return;
        };
        let mut planned_sum = 0;
        for (key, task) in &mut self.tasks {
            if *key == total_key || !task.is_edited(key) {
                continue;
            }
            task.remaining = task.planned;
            task.done = 0;
            planned_sum += task.planned;
        }
        let rounded = story_points(planned_sum);
        self.tasks[&total_key] = Task {
            description: TOTAL_LABEL.to_string(),
            planned: rounded,
            remaining: rounded,
            done: 0,
            assignee: TOTAL_UNIT.to_string(),
        };
    }

    /// Recompute done points from planned minus remaining and refresh the
    /// Total row. Used for stories a developer is working (`ANALYSING`,
    /// `SPRINTING`). The Total row rounds planned and remaining to story
    /// points; done stays a raw sum.
    pub fn consolidate_task_points(&mut self) {
        let Some(total_key) = self.tasks.keys().last().cloned() else {
            return;
        };
        let (mut planned_sum, mut remaining_sum, mut done_sum) = (0, 0, 0);
        for (key, task) in &mut self.tasks {
            if *key == total_key || !task.is_edited(key) {
                continue;
            }
            task.done = if task.planned >= task.remaining {
                task.planned - task.remaining
            } else {
                task.planned
            };
            planned_sum += task.planned;
            remaining_sum += task.remaining;
            done_sum += task.done;
        }
        self.tasks[&total_key] = Task {
            description: TOTAL_LABEL.to_string(),
            planned: story_points(planned_sum),
            remaining: story_points(remaining_sum),
            done: done_sum,
            assignee: TOTAL_UNIT.to_string(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(description: &str, planned: u32, remaining: u32, done: u32, who: &str) -> Task {
        Task {
            description: description.to_string(),
            planned,
            remaining,
            done,
            assignee: who.to_string(),
        }
    }

    fn story_with_tasks(status: &str, tasks: Vec<(&str, Task)>) -> Story {
        let mut story = Story::default();
        story.fields.insert(STATUS_FIELD.to_string(), status.to_string());
        for (key, value) in tasks {
            story.tasks.insert(key.to_string(), value);
        }
        story
    }

    #[test]
    fn task_rows_round_trip() {
        let original = task("wire the codec", 5, 3, 2, "alice");
        let parsed = Task::parse("task1", &original.to_row()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn short_task_rows_are_malformed() {
        let err = Task::parse("task1", "only,four,columns,here").unwrap_err();
        assert!(matches!(err, StoryFileError::MalformedTask { .. }));
    }

    #[test]
    fn non_numeric_points_are_rejected() {
        let err = Task::parse("task2", "desc,five,3,0,bob").unwrap_err();
        assert!(matches!(err, StoryFileError::BadPoints { .. }));
    }

    #[test]
    fn story_file_round_trips_in_order() {
        let mut story = Story::default();
        story.fields.insert("title".to_string(), "A story".to_string());
        story.fields.insert("status".to_string(), "ready".to_string());
        story.fields.insert("size 1".to_string(), "8".to_string());
        story.tasks.insert("task1".to_string(), task("build", 5, 5, 0, "alice"));
        story.tasks.insert("total".to_string(), task("Total", 5, 5, 0, "Points"));

        let reloaded = Story::from_toml_str(&story.to_toml_string()).unwrap();
        assert_eq!(reloaded, story);
        assert_eq!(
            reloaded.fields.keys().collect::<Vec<_>>(),
            vec!["title", "status", "size 1"]
        );
    }

    #[test]
    fn fields_without_text_key_are_rejected() {
        let err = Story::from_toml_str("[title]\nlabel = \"x\"\n").unwrap_err();
        assert!(matches!(err, StoryFileError::MissingText(section) if section == "title"));
    }

    #[test]
    fn status_falls_back_on_garbage() {
        let mut story = Story::default();
        story.fields.insert(STATUS_FIELD.to_string(), "shipped".to_string());
        assert!(story.try_status().is_err());
        assert_eq!(story.status_or(Status::Out), Status::Out);
    }

    #[test]
    fn reset_returns_edited_tasks_to_planning_state() {
        let mut story = story_with_tasks(
            "ready",
            vec![
                ("task1", task("build codec", 5, 2, 3, "alice")),
                ("task2", task("<task2>", 0, 0, 0, "<dev>")),
                ("task3", task("review", 3, 1, 2, "bob")),
                ("total", task("Total", 8, 3, 5, "Points")),
            ],
        );
        story.reset_task_points();

        assert_eq!(story.tasks["task1"], task("build codec", 5, 5, 0, "alice"));
        // Unedited template rows stay untouched.
        assert_eq!(story.tasks["task2"], task("<task2>", 0, 0, 0, "<dev>"));
        assert_eq!(story.tasks["task3"], task("review", 3, 3, 0, "bob"));
        // 5 + 3 = 8 is already a sanctioned size.
        assert_eq!(story.tasks["total"], task("Total", 8, 8, 0, "Points"));
    }

    #[test]
    fn consolidate_recomputes_done_and_rounds_totals() {
        let mut story = story_with_tasks(
            "SPRINTING",
            vec![
                ("task1", task("build codec", 5, 2, 0, "alice")),
                ("task2", task("review", 3, 4, 0, "bob")),
                ("total", task("Total", 0, 0, 0, "Points")),
            ],
        );
        story.consolidate_task_points();

        // done = planned - remaining, clamped at planned.
        assert_eq!(story.tasks["task1"].done, 3);
        assert_eq!(story.tasks["task2"].done, 3);
        // planned 8 rounds to 8, remaining 6 rounds to 8, done stays raw.
        assert_eq!(story.tasks["total"], task("Total", 8, 8, 6, "Points"));
    }

    #[test]
    fn rollup_total_rounds_every_column() {
        let rows = vec![task("a", 4, 3, 1, "x"), task("b", 10, 9, 1, "y")];
        let total = rollup_total(&rows);
        assert_eq!(total, task("Total", 21, 13, 2, "Points"));
    }

    #[test]
    fn consolidation_without_tasks_is_a_no_op() {
        let mut story = story_with_tasks("ready", Vec::new());
        story.reset_task_points();
        story.consolidate_task_points();
        assert!(story.tasks.is_empty());
    }
}
