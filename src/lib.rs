//! # Scrumdeck
//!
//! Shuttle agile stories between slide decks and plain text files, and run
//! sprint burndown analytics over them.
//!
//! The authoritative storage of a story alternates between slide-shaped
//! placeholders in a presentation and a section-per-field text file. An
//! external collaborator extracts the presentation into a deck JSON file;
//! Scrumdeck does everything with semantics:
//!
//! - **Markup codec**: hyperlink-bearing slide text to a portable ASCII
//!   markup string (`<address>text</>`) and back.
//! - **Status workflow**: a totally ordered story lifecycle gating which
//!   stories are visible and exportable.
//! - **Story points**: raw task totals rounded up to the sanctioned
//!   Fibonacci scale.
//! - **Burndown**: per-story remaining-work series folded into one
//!   sprint-level forecast with a capacity verdict.
//!
//! ## Quick Start
//!
//! ```bash
//! # Learn the placeholder layout from a labeled template slide
//! scrumdeck learn backlog.json 1
//!
//! # Export stories to text files, one per slide
//! scrumdeck export backlog.json stories/
//!
//! # Check the sprint forecast
//! scrumdeck burndown backlog.json
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod core;
pub mod deck;

pub use crate::core::{
    story_points, BurndownAggregator, BurndownSeries, Feasibility, FieldMap, LengthPolicy,
    SprintConfig, Status, Story, StyledText, Task,
};
pub use crate::deck::{Deck, Slide};
