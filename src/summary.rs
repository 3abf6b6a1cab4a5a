use crate::data::{CallNode, RegionRecord};
use crate::timestamp::{format_duration, format_percentage, DurationFormat};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSummaryEntry {
    pub name: String,
    pub length: i64, // ns
    pub runtime: String,
    /// Share of the region's GPU-related runtime, without the `%`.
    pub percentage: String,
    /// Depth in the call tree, top-level calls are 0.
    pub level: usize,
}

/// Drill-down of one region, built on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSummary {
    pub runtime: String,
    pub tracked_runtime: String,
    pub entries: Vec<CallSummaryEntry>,
}

fn by_length_desc<'a>(
    calls: impl Iterator<Item = (&'a String, &'a CallNode)>,
) -> Vec<(&'a String, &'a CallNode)> {
    let mut calls: Vec<_> = calls.collect();
    calls.sort_by(|a, b| b.1.length.cmp(&a.1.length));
    calls
}

/// Flattens the call tree of `region` depth-first, longest calls first at
/// every level. Percentages are relative to the region's top-level total so
/// they share one denominator at every depth.
pub fn summarize(region: &RegionRecord, format: DurationFormat) -> CallSummary {
    let total = region.tracked_total();

    let mut entries = Vec::new();
    let mut stack: Vec<(&String, &CallNode, usize)> = Vec::new();

    // Pushed in reverse so the longest call is popped first
    for (name, call) in by_length_desc(region.data.iter()).into_iter().rev() {
        stack.push((name, call, 0));
    }

    while let Some((name, call, level)) = stack.pop() {
        entries.push(CallSummaryEntry {
            name: name.clone(),
            length: call.length,
            runtime: format_duration(call.length, format),
            percentage: format_percentage(call.length as f64 / total as f64 * 100.0),
            level,
        });
        for (child_name, child) in by_length_desc(call.children.iter()).into_iter().rev() {
            stack.push((child_name, child, level + 1));
        }
    }

    CallSummary {
        runtime: format_duration(region.length, format),
        tracked_runtime: format_duration(total, format),
        entries,
    }
}
