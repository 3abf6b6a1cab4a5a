use egui::Color32;

use crate::data::RegionSnapshot;
use crate::timestamp::format_percentage;

/// Visual style shared by every region block.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ItemStyle {
    pub text: Color32,
    pub fill: Color32,
    /// Drawn underneath the axis grid instead of on top of it.
    pub background: bool,
}

impl ItemStyle {
    pub const BACKGROUND: Self = Self {
        text: Color32::WHITE,
        fill: Color32::from_rgb(0x00, 0x99, 0x33),
        background: true,
    };
}

/// One block on the timeline, in milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineItem {
    pub id: String,
    pub group: String,
    pub start: f64,
    pub end: f64,
    pub content: String,
    pub style: ItemStyle,
}

/// One row of the timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineGroup {
    pub id: String,
    pub content: String,
    pub show_nested: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub items: Vec<TimelineItem>,
    pub groups: Vec<TimelineGroup>,
    /// Latest end of any region, in milliseconds.
    pub max_end: f64,
}

impl Projection {
    pub fn item(&self, id: &str) -> Option<&TimelineItem> {
        self.items.iter().find(|item| item.id == id)
    }
}

/// Turns a snapshot into one item and one group per region. Each item is
/// labelled with the share of the region spent in GPU-related calls.
pub fn project(snapshot: &RegionSnapshot) -> Projection {
    let mut projection = Projection {
        items: Vec::with_capacity(snapshot.len()),
        groups: Vec::with_capacity(snapshot.len()),
        max_end: 0.0,
    };

    for (id, region) in snapshot.iter() {
        let interval = region.interval();
        let start = interval.start.to_ms();
        let end = start + region.length as f64 / 1_000_000.0;
        projection.max_end = projection.max_end.max(end);

        projection.items.push(TimelineItem {
            id: id.clone(),
            group: id.clone(),
            start,
            end,
            content: format!("{}%", format_percentage(region.tracked_percentage())),
            style: ItemStyle::BACKGROUND,
        });
        projection.groups.push(TimelineGroup {
            id: id.clone(),
            content: id.clone(),
            show_nested: false,
        });
    }

    projection
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TimeUnit {
    Millisecond,
    Second,
    Minute,
    Hour,
    Weekday,
    Day,
    Week,
    Month,
    Year,
}

/// How a tick value is written on the axis.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LabelFormat {
    /// `x [ms]`: the raw millisecond value.
    Milliseconds,
    /// `X [s]`: whole seconds.
    Seconds,
}

impl LabelFormat {
    pub fn pattern(self) -> &'static str {
        match self {
            LabelFormat::Milliseconds => "x [ms]",
            LabelFormat::Seconds => "X [s]",
        }
    }

    pub fn label(self, ms: f64) -> String {
        match self {
            LabelFormat::Milliseconds => format!("{} [ms]", trim_float(ms)),
            LabelFormat::Seconds => format!("{} [s]", (ms / 1000.0).floor()),
        }
    }
}

fn trim_float(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        let text = format!("{:.3}", value);
        text.trim_end_matches('0').trim_end_matches('.').to_owned()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MinorLabels {
    pub millisecond: LabelFormat,
    pub second: LabelFormat,
    pub minute: LabelFormat,
    pub hour: LabelFormat,
    pub weekday: LabelFormat,
    pub day: LabelFormat,
    pub week: LabelFormat,
    pub month: LabelFormat,
    pub year: LabelFormat,
}

impl Default for MinorLabels {
    fn default() -> Self {
        Self {
            millisecond: LabelFormat::Milliseconds,
            second: LabelFormat::Seconds,
            minute: LabelFormat::Seconds,
            hour: LabelFormat::Seconds,
            weekday: LabelFormat::Seconds,
            day: LabelFormat::Seconds,
            week: LabelFormat::Seconds,
            month: LabelFormat::Seconds,
            year: LabelFormat::Seconds,
        }
    }
}

impl MinorLabels {
    pub fn get(&self, unit: TimeUnit) -> LabelFormat {
        match unit {
            TimeUnit::Millisecond => self.millisecond,
            TimeUnit::Second => self.second,
            TimeUnit::Minute => self.minute,
            TimeUnit::Hour => self.hour,
            TimeUnit::Weekday => self.weekday,
            TimeUnit::Day => self.day,
            TimeUnit::Week => self.week,
            TimeUnit::Month => self.month,
            TimeUnit::Year => self.year,
        }
    }
}

/// Options handed to the timeline painter. All bounds are milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayOptions {
    pub minor_labels: MinorLabels,
    pub show_major_labels: bool,
    pub min: f64,
    pub max: f64,
}

impl DisplayOptions {
    pub fn for_max_end(max_end: f64) -> Self {
        Self {
            minor_labels: MinorLabels::default(),
            show_major_labels: false,
            min: 0.0,
            max: 2.0 * max_end,
        }
    }

    /// Picks the unit for minor ticks given the visible span. Returns the
    /// tick step in milliseconds as well.
    pub fn tick_unit(visible_ms: f64, max_ticks: usize) -> (TimeUnit, f64) {
        let max_ticks = max_ticks.max(1) as f64;
        let mut step = 1.0;
        for &candidate in &[
            1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0, 500.0, 1_000.0, 2_000.0, 5_000.0,
            10_000.0, 30_000.0, 60_000.0, 300_000.0, 600_000.0, 3_600_000.0,
        ] {
            step = candidate;
            if visible_ms / candidate <= max_ticks {
                break;
            }
        }
        // Spans beyond the largest candidate still get at most `max_ticks`
        let step = step.max(visible_ms / max_ticks);
        let unit = match step {
            s if s < 1_000.0 => TimeUnit::Millisecond,
            s if s < 60_000.0 => TimeUnit::Second,
            s if s < 3_600_000.0 => TimeUnit::Minute,
            _ => TimeUnit::Hour,
        };
        (unit, step)
    }
}
