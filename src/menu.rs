use crate::data::RegionSnapshot;
use crate::summary::{summarize, CallSummaryEntry};
use crate::timestamp::DurationFormat;

/// Horizontal indent per call tree level, in points.
pub const INDENT_PER_LEVEL: f32 = 20.0;

/// Secondary click on the timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextEvent {
    /// Region row under the pointer, if any.
    pub group_id: Option<String>,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuBlock {
    Header {
        runtime: String,
        tracked_runtime: String,
    },
    CallSummary(Vec<CallSummaryEntry>),
}

/// Popup with the details of one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMenu {
    pub region: String,
    pub x: i32,
    pub y: i32,
    pub blocks: Vec<MenuBlock>,
}

impl CallSummaryEntry {
    /// `name: runtime (pct% CR)`
    pub fn line(&self) -> String {
        format!("{}: {} ({}% CR)", self.name, self.runtime, self.percentage)
    }

    pub fn indent(&self) -> f32 {
        self.level as f32 * INDENT_PER_LEVEL
    }
}

/// Builds the details popup for a secondary click. Clicks outside any
/// region row, or on a region that is not in the snapshot, open nothing.
pub fn build_context_menu(
    event: &ContextEvent,
    snapshot: &RegionSnapshot,
    format: DurationFormat,
) -> Option<ContextMenu> {
    let id = event.group_id.as_deref()?;
    let region = snapshot.get(id)?;
    let summary = summarize(region, format);

    Some(ContextMenu {
        region: id.to_owned(),
        x: event.x,
        y: event.y,
        blocks: vec![
            MenuBlock::Header {
                runtime: summary.runtime,
                tracked_runtime: summary.tracked_runtime,
            },
            MenuBlock::CallSummary(summary.entries),
        ],
    })
}
