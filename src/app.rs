//! Command pipelines.
//!
//! Each public function here backs one CLI subcommand and owns all of its
//! filesystem traffic; the core modules stay free of paths and environment.
//! Pipelines are fail-fast: the first structural error aborts the batch
//! with enough context (slide, file, field) to fix the source.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{info, warn};

use crate::core::markup;
use crate::core::story::{
    DEVS_FIELD, ID_FIELD, SIZE_FIELDS, TITLE_FIELD, VALUE_FIELD,
};
use crate::core::{
    rollup_total, BurndownAggregator, BurndownSeries, Feasibility, FieldMap, LengthPolicy,
    SprintConfig, Status, Story, Task,
};
use crate::deck::{Deck, Slide, TaskRow};

/// Default directory for persisted configuration.
pub fn default_config_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".scrumdeck")
}

/// Default location of the learned field map.
pub fn default_field_map_path() -> PathBuf {
    default_config_dir().join("fieldmap.toml")
}

/// Default location of the sprint configuration.
pub fn default_sprint_path() -> PathBuf {
    default_config_dir().join("sprint.toml")
}

// ============================================================================
// Export
// ============================================================================

/// Options for exporting stories from a deck to text files.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Route stories into a directory tree keyed by status (and developer
    /// for owned states).
    pub kanban: bool,
    /// Lowest status to consider.
    pub status_first: Status,
    /// Highest status to consider.
    pub status_last: Status,
    /// Append up to this many title characters to the file name; 0 for
    /// purely numeric names.
    pub with_title: usize,
    /// Prefix the file name with a priority derived from the value field.
    pub with_values: bool,
    /// Prefix the file name with the id field.
    pub with_ids: bool,
    pub dry_run: bool,
}

/// Export story slides of `deck_path` into one text file each under
/// `out_dir`.
pub fn export(
    deck_path: &Path,
    out_dir: &Path,
    field_map_path: &Path,
    opts: &ExportOptions,
) -> Result<()> {
    if (opts.with_values || opts.with_ids) && opts.kanban {
        bail!("kanban export cannot be combined with id or value prefixes");
    }
    let fields = load_resolved_fields(field_map_path)?;
    let deck = load_deck(deck_path)?;
    info!("backlog '{}' has {} slide(s)", deck_path.display(), deck.len());

    if opts.dry_run {
        info!("would create the story directory '{}'", out_dir.display());
    } else {
        if out_dir.exists() {
            bail!(
                "story directory '{}' already exists, consider deleting it",
                out_dir.display()
            );
        }
        fs::create_dir_all(out_dir)
            .with_context(|| format!("creating story directory '{}'", out_dir.display()))?;
        info!("created the story directory '{}'", out_dir.display());
    }

    let mut selected = 0;
    for (num, slide) in deck.slides.iter().enumerate() {
        let Some(story) = story_from_slide(slide, &fields) else {
            info!("skipped slide #{} with foreign format", num + 1);
            continue;
        };

        // Anything unparseable is treated as the upper boundary so a single
        // corrupt story cannot block the batch.
        let status = story.status_or(opts.status_last);
        if status < opts.status_first {
            info!("skipped slide #{}: status '{status}' is below '{}'", num + 1, opts.status_first);
            continue;
        }
        if status > opts.status_last {
            info!("skipped slide #{}: status '{status}' is after '{}'", num + 1, opts.status_last);
            continue;
        }

        let mut target_dir = out_dir.to_path_buf();
        if opts.kanban {
            target_dir = target_dir.join(status.as_str().to_lowercase());
            if status.is_owned() {
                // A developer owns a story only while analysing or
                // sprinting; the kanban tree nests those under the first
                // listed developer.
                let devs = story.field(DEVS_FIELD).unwrap_or("");
                let Some(developer) = devs.split_whitespace().next() else {
                    bail!("slide #{} is in state '{status}' but names no developer", num + 1);
                };
                target_dir = target_dir.join(developer);
            }
            if !opts.dry_run {
                fs::create_dir_all(&target_dir).with_context(|| {
                    format!("creating kanban directory '{}'", target_dir.display())
                })?;
            }
        }

        let file_name = story_file_name(num + 1, &story, opts);
        let story_path = target_dir.join(file_name);
        if opts.dry_run {
            info!("would save slide #{} as '{}'", num + 1, story_path.display());
        } else {
            story
                .save(&story_path)
                .with_context(|| format!("writing story file '{}'", story_path.display()))?;
            info!("saved slide #{} as '{}'", num + 1, story_path.display());
        }
        selected += 1;
    }

    if opts.dry_run {
        info!("would have saved {selected} story file(s)");
    } else {
        info!("saved {selected} story file(s)");
    }
    Ok(())
}

/// Turn a story slide into a story by encoding every mapped placeholder.
/// `None` means the slide does not carry the learned layout at all.
fn story_from_slide(slide: &Slide, fields: &IndexMap<String, u32>) -> Option<Story> {
    let mut story = Story::default();
    for (field, slot) in fields {
        let styled = slide.placeholder(*slot)?;
        story
            .fields
            .insert(field.clone(), markup::encode(styled).trim().to_string());
    }
    Some(story)
}

/// Build the story file name for the slide at 1-based position `number`.
///
/// Names sort by slide position (`10 * number`, zero-padded), optionally
/// carry a title fragment for humans, and are normalized to survive shells
/// and filesystems.
fn story_file_name(number: usize, story: &Story, opts: &ExportOptions) -> String {
    let sequence = 10 * number;
    let mut name = if opts.with_title > 0 {
        let title = story.field(TITLE_FIELD).unwrap_or("").trim();
        let title: String = title.chars().take(opts.with_title).collect();
        format!("{sequence:04}_{}.story", title.trim())
    } else {
        format!("{sequence:04}.story")
    };
    name = name.to_lowercase().replace([' ', '/'], "_");

    if opts.with_ids {
        let id = story
            .field(ID_FIELD)
            .and_then(|text| text.trim().parse::<u32>().ok())
            .unwrap_or(0);
        name = format!("{id:04}_{name}");
    }
    if opts.with_values {
        let value = story
            .field(VALUE_FIELD)
            .and_then(|text| text.trim().parse::<i64>().ok())
            .unwrap_or(0);
        let priority = if (0..=100).contains(&value) { 100 - value } else { 0 };
        name = format!("{priority:03}_{name}");
    }
    name
}

// ============================================================================
// Import
// ============================================================================

/// Options for importing story files into a deck.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub status_first: Status,
    pub status_last: Status,
    /// Start from an empty deck instead of appending to the target.
    pub empty: bool,
    pub dry_run: bool,
}

/// Append one story slide (and one tasks slide) per story file to the deck.
pub fn import(
    deck_path: &Path,
    story_files: &[PathBuf],
    field_map_path: &Path,
    opts: &ImportOptions,
) -> Result<()> {
    let fields = load_resolved_fields(field_map_path)?;
    check_deck_extension(deck_path)?;
    let mut deck = if opts.empty {
        Deck::default()
    } else {
        load_deck(deck_path)?
    };
    info!("deck has {} slide(s) before import", deck.len());

    for story_file in story_files {
        let number = story_file_number(story_file)?;
        let story = Story::load(story_file)
            .with_context(|| format!("reading story file '{}'", story_file.display()))?;

        // Import feeds the authoritative deck; a story whose status does
        // not even parse is not allowed in.
        let status = story.try_status().with_context(|| {
            format!("story file prefixed #{number} has a wrong status field")
        })?;
        if status < opts.status_first {
            info!("skipped story #{number}: status '{status}' is below '{}'", opts.status_first);
            continue;
        }
        if status > opts.status_last {
            info!("skipped story #{number}: status '{status}' is after '{}'", opts.status_last);
            continue;
        }

        let mut placeholders = BTreeMap::new();
        for (field, slot) in &fields {
            let Some(text) = story.field(field) else {
                bail!(
                    "wrong story format in '{}': field '{field}' is missing",
                    story_file.display()
                );
            };
            placeholders.insert(*slot, markup::decode(text));
        }
        deck.slides.push(Slide::Story { placeholders });

        if story.tasks.is_empty() {
            warn!("there are no tasks in '{}'", story_file.display());
        } else {
            deck.slides.push(Slide::Tasks { rows: task_rows(&story) });
        }
        info!("import ok: '{}'", story_file.display());
    }

    if opts.dry_run {
        info!("would save the deck to '{}'", deck_path.display());
    } else {
        deck.save(deck_path)
            .with_context(|| format!("writing deck '{}'", deck_path.display()))?;
        info!("deck saved to '{}'", deck_path.display());
    }
    Ok(())
}

/// Task table rows for a story: the real rows in file order, closed by a
/// freshly computed Total row. The stored total is ignored; it may be stale.
fn task_rows(story: &Story) -> Vec<TaskRow> {
    let real: Vec<Task> = story
        .tasks
        .iter()
        .take(story.tasks.len().saturating_sub(1))
        .map(|(_, task)| task.clone())
        .collect();

    let mut rows: Vec<TaskRow> = real.iter().map(task_row).collect();
    rows.push(task_row(&rollup_total(&real)));
    rows
}

fn task_row(task: &Task) -> TaskRow {
    [
        task.description.clone(),
        task.planned.to_string(),
        task.remaining.to_string(),
        task.done.to_string(),
        task.assignee.clone(),
    ]
}

// ============================================================================
// Modify
// ============================================================================

/// Re-export a single story from its deck slide into an existing story
/// file. `field` restricts the update to one field; otherwise the whole
/// file is rewritten from the slide.
pub fn modify(
    deck_path: &Path,
    story_path: &Path,
    field_map_path: &Path,
    field: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    if !story_path.is_file() {
        bail!("story file '{}' does not exist", story_path.display());
    }
    let fields = load_resolved_fields(field_map_path)?;
    if let Some(name) = field {
        if !fields.contains_key(name) {
            bail!("the field '{name}' is not in the field map");
        }
        info!("about to modify the field '{name}'");
    } else {
        info!("all fields are taken into account");
    }

    // Story files are named after their slide position.
    let slide_number = story_file_number(story_path)? as usize / 10;
    let deck = load_deck(deck_path)?;
    if slide_number == 0 || slide_number > deck.len() {
        bail!("slide number {slide_number} is outside the deck (1 to {})", deck.len());
    }

    let slide = &deck.slides[slide_number - 1];
    let Some(slide_story) = story_from_slide(slide, &fields) else {
        bail!("slide #{slide_number} has a foreign format");
    };

    let updated = match field {
        None => slide_story,
        Some(name) => {
            let mut on_file = Story::load(story_path)
                .with_context(|| format!("reading story file '{}'", story_path.display()))?;
            let new_text = slide_story.field(name).unwrap_or("").to_string();
            let old_text = on_file.field(name).unwrap_or("").to_string();
            info!("'{new_text}' replaces '{old_text}'");
            on_file.fields.insert(name.to_string(), new_text);
            on_file
        }
    };

    if dry_run {
        info!("would modify '{}' from slide #{slide_number}", story_path.display());
    } else {
        updated
            .save(story_path)
            .with_context(|| format!("writing story file '{}'", story_path.display()))?;
        info!("modified '{}' from slide #{slide_number}", story_path.display());
    }
    Ok(())
}

// ============================================================================
// Learn
// ============================================================================

/// Learn the placeholder layout from a labeled template slide and persist
/// the field map. All-or-nothing: on any template defect the map file is
/// left untouched.
pub fn learn(deck_path: &Path, slide_number: usize, field_map_path: &Path) -> Result<()> {
    let mut map = FieldMap::load(field_map_path).with_context(|| {
        format!("reading the initial field map '{}'", field_map_path.display())
    })?;
    if map.is_empty() {
        bail!("the initial field map '{}' names no fields", field_map_path.display());
    }

    let deck = load_deck(deck_path)?;
    if slide_number == 0 || slide_number > deck.len() {
        bail!("slide number must be within the deck (1 to {})", deck.len());
    }

    let Slide::Story { placeholders } = &deck.slides[slide_number - 1] else {
        bail!("slide #{slide_number} has no placeholders to learn from");
    };
    map.learn(
        placeholders
            .iter()
            .map(|(slot, styled)| (*slot, styled.text_content())),
    )
    .with_context(|| format!("learning from slide #{slide_number}"))?;

    map.save(field_map_path)
        .with_context(|| format!("writing the field map '{}'", field_map_path.display()))?;
    info!("'{}' successfully generated", field_map_path.display());
    Ok(())
}

// ============================================================================
// Burndown
// ============================================================================

/// Options for the burndown aggregation.
#[derive(Debug, Clone)]
pub struct BurndownOptions {
    /// Truncate series longer than the consistency boundary instead of
    /// rejecting the run.
    pub lenient: bool,
    /// Write the aggregated series and verdict as JSON for the chart
    /// renderer.
    pub out: Option<PathBuf>,
    pub dry_run: bool,
}

/// The renderer hand-off: everything a chart or report needs, no more.
#[derive(Debug, Serialize)]
struct BurndownReport<'a> {
    days: u32,
    periods: u32,
    capacity: u32,
    #[serde(flatten)]
    series: &'a BurndownSeries,
    feasibility: Feasibility,
}

/// Fold the size-field series of every story slide into the sprint
/// forecast and report feasibility.
pub fn burndown(
    deck_path: &Path,
    field_map_path: &Path,
    sprint_path: &Path,
    opts: &BurndownOptions,
) -> Result<()> {
    let fields = load_resolved_fields(field_map_path)?;
    let sprint = SprintConfig::load(sprint_path)
        .with_context(|| format!("reading the sprint setup '{}'", sprint_path.display()))?;

    info!("the sprint length is {} day(s)", sprint.days);
    info!(
        "the sprint has {} period(s) of {} working day(s)",
        sprint.periods,
        sprint.days / (sprint.periods + 1)
    );
    info!("the team has a capacity of {} story points", sprint.capacity);

    let deck = load_deck(deck_path)?;
    info!("backlog '{}' has {} slide(s)", deck_path.display(), deck.len());

    let policy = if opts.lenient { LengthPolicy::Lenient } else { LengthPolicy::Strict };
    let mut aggregator = BurndownAggregator::new(sprint.days as usize, policy);

    for (num, slide) in deck.slides.iter().enumerate() {
        let series = extract_work(slide, &fields)
            .with_context(|| format!("slide #{}: wrong syntax in size fields", num + 1))?;
        if series.is_empty() {
            info!("slide #{}: skipped since no size", num + 1);
            continue;
        }
        aggregator
            .fold(&series)
            .with_context(|| format!("slide #{}: inconsistent size series", num + 1))?;
        info!("slide #{}: included in work to be done", num + 1);
    }

    let series = aggregator.finish();
    info!(
        "work left is consistently entered including sprint day {}",
        series.last_consistent_day
    );
    for (period, estimate) in series.period_summaries(sprint.periods).iter().enumerate() {
        info!("work left estimate for period {period}: {estimate:?}");
    }

    let feasibility = series.feasibility(sprint.capacity);
    let committed = series.total.first().copied().unwrap_or(0);
    match feasibility {
        Feasibility::Feasible { slack } => {
            info!(
                "devs offer at least the points required ({} >= {committed}), sprint can work",
                sprint.capacity
            );
            info!("{slack} point(s) are available for analysis and spikes");
        }
        Feasibility::Infeasible { overcommit } => {
            warn!(
                "devs offer less points than required ({} < {committed}), sprint cannot work",
                sprint.capacity
            );
            warn!("stories are to be reduced by {overcommit} point(s)");
        }
    }

    if let Some(out) = &opts.out {
        let report = BurndownReport {
            days: sprint.days,
            periods: sprint.periods,
            capacity: sprint.capacity,
            series: &series,
            feasibility,
        };
        if opts.dry_run {
            info!("would save the burndown report to '{}'", out.display());
        } else {
            let mut raw = serde_json::to_string_pretty(&report)?;
            raw.push('\n');
            fs::write(out, raw)
                .with_context(|| format!("writing burndown report '{}'", out.display()))?;
            info!("saved the burndown report to '{}'", out.display());
        }
    }
    Ok(())
}

/// Collect the remaining-work series entered in the slide's size fields.
///
/// An empty result means the slide carries no sizes at all (not an error;
/// an untouched story contributes nothing). A size field with multiple
/// paragraphs or non-digit content is a syntax error.
fn extract_work(slide: &Slide, fields: &IndexMap<String, u32>) -> Result<Vec<u32>> {
    let mut text = String::new();
    for (field, slot) in fields {
        if !SIZE_FIELDS.contains(&field.as_str()) {
            continue;
        }
        let Some(styled) = slide.placeholder(*slot) else {
            return Ok(Vec::new());
        };
        if styled.paragraphs.len() > 1 {
            bail!("size field '{field}' has more than one paragraph");
        }
        for paragraph in &styled.paragraphs {
            for run in &paragraph.runs {
                for c in run.text.trim().chars() {
                    if !(c.is_ascii_digit() || c.is_whitespace()) {
                        bail!("size field '{field}' contains '{c}', expected digits");
                    }
                    text.push(c);
                }
                text.push(' ');
            }
        }
    }
    text.split_whitespace()
        .map(|value| value.parse::<u32>().map_err(Into::into))
        .collect()
}

// ============================================================================
// Consolidate
// ============================================================================

/// Bring the task points of every story file in line with its status:
/// planned stories go back to their planning state, stories in work get
/// their done points and Total row recomputed.
pub fn consolidate(story_files: &[PathBuf], sprint_path: &Path, dry_run: bool) -> Result<()> {
    // Check all names before touching anything.
    for story_file in story_files {
        story_file_number(story_file)?;
    }

    let sprint = match SprintConfig::load(sprint_path) {
        Ok(sprint) => sprint,
        Err(err) => {
            info!("using permissive sprint defaults: {err}");
            SprintConfig::permissive()
        }
    };
    info!("the team has a capacity of {} story points", sprint.capacity);

    for story_file in story_files {
        let readonly = fs::metadata(story_file)
            .map(|meta| meta.permissions().readonly())
            .unwrap_or(false);
        if readonly {
            info!("story file is not writable, skipped '{}'", story_file.display());
            continue;
        }
        info!("processing '{}'", story_file.display());

        let mut story = match Story::load(story_file) {
            Ok(story) => story,
            Err(err) => {
                warn!("story file is illegal, skipped '{}': {err}", story_file.display());
                continue;
            }
        };

        match story.status_or(Status::Out) {
            Status::Ready | Status::Accepted | Status::Committed => story.reset_task_points(),
            Status::Analysing | Status::Sprinting => story.consolidate_task_points(),
            _ => {}
        }

        if dry_run {
            info!("would consolidate '{}'", story_file.display());
        } else {
            story
                .save(story_file)
                .with_context(|| format!("writing story file '{}'", story_file.display()))?;
            info!("consolidated '{}'", story_file.display());
        }
    }
    Ok(())
}

// ============================================================================
// Shared helpers
// ============================================================================

fn check_deck_extension(deck_path: &Path) -> Result<()> {
    if deck_path.extension().and_then(|ext| ext.to_str()) != Some("json") {
        bail!("deck file '{}' must have a '.json' extension", deck_path.display());
    }
    Ok(())
}

fn load_deck(deck_path: &Path) -> Result<Deck> {
    check_deck_extension(deck_path)?;
    Deck::load(deck_path).with_context(|| format!("reading deck '{}'", deck_path.display()))
}

fn load_resolved_fields(field_map_path: &Path) -> Result<IndexMap<String, u32>> {
    let map = FieldMap::load(field_map_path).with_context(|| {
        format!(
            "reading field map '{}'; run the learn command first",
            field_map_path.display()
        )
    })?;
    Ok(map.resolve()?)
}

/// Story files carry their slide position as leading digits,
/// `NNNN[_title].story`.
fn story_file_number(story_file: &Path) -> Result<u32> {
    if story_file.extension().and_then(|ext| ext.to_str()) != Some("story") {
        bail!("story file '{}' must have a '.story' extension", story_file.display());
    }
    let stem = story_file
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("");
    stem.split('_')
        .next()
        .and_then(|digits| digits.parse::<u32>().ok())
        .with_context(|| {
            format!("story file '{}' must be prefixed with digits", story_file.display())
        })
}
