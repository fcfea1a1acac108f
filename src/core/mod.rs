//! Core types and algorithms for Scrumdeck.
//!
//! Everything with real semantics lives here: the status workflow, the
//! story point scale, the markup codec, field-slot learning, sprint
//! configuration, the story model, and burndown aggregation. Nothing in
//! this module touches the presentation; the deck boundary feeds it plain
//! data.

pub mod burndown;
pub mod fields;
pub mod markup;
pub mod points;
pub mod sprint;
pub mod status;
pub mod story;

pub use burndown::{
    BurndownAggregator, BurndownError, BurndownSeries, Feasibility, LengthPolicy,
};
pub use fields::{FieldMap, FieldMapError};
pub use markup::{Paragraph, Run, StyledText};
pub use points::story_points;
pub use sprint::{SprintConfig, SprintError};
pub use status::{Status, UnknownStatus};
pub use story::{rollup_total, Story, StoryFileError, Task};
