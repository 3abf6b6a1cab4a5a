use egui::{Align2, NumExt, Pos2, Rect, RichText, ScrollArea, Stroke, TextStyle, Vec2};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

use crate::data::{DataSource, FetchError, RegionSnapshot};
use crate::fetch::Loader;
use crate::menu::{build_context_menu, ContextEvent, ContextMenu, MenuBlock};
use crate::timeline::{project, DisplayOptions, Projection, TimelineGroup, TimelineItem};
use crate::timestamp::{DurationFormat, Interval, Timestamp};

/// Overview:
///   TimelineViewer -> TimelineWindow
///   TimelineWindow -> Axis, Row *
///   Row -> label, TimelineItem
///
/// TimelineWindow:
///   * Owns the ScrollArea (there is only **ONE** ScrollArea)
///   * Handles pan/zoom (there is only **ONE** pan/zoom setting)
///   * Owns the snapshot and the outstanding fetch
///
/// Row:
///   * One region, one block
///   * Secondary click opens the details menu

const LABEL_WIDTH: f32 = 120.0;
const COL_PADDING: f32 = 4.0;
const ROW_PADDING: f32 = 4.0;
const ROW_LINES: f32 = 2.0;

pub type SharedSource = Arc<Mutex<Box<dyn DataSource + Send>>>;

/// Hooks the hosting session calls on every window it manages.
pub trait HostWindow {
    fn window_type(&self) -> &'static str;
    fn title(&self) -> &'static str;
    fn content_help(&self) -> &'static str;

    fn start_resize(&mut self) {}
    fn finish_resize(&mut self) {}
    fn prepare_refresh(&mut self) {}
    fn prepare_close(&mut self) {}
}

#[derive(Default, Deserialize, Serialize)]
#[serde(default)] // deserialize missing fields as default value
pub struct Settings {
    /// Show every duration in the details menu in milliseconds.
    pub always_ms: bool,
}

impl Settings {
    pub fn duration_format(&self) -> DurationFormat {
        DurationFormat {
            always_ms: self.always_ms,
        }
    }
}

pub struct TimelineWindow {
    source: SharedSource,
    loader: Loader,

    snapshot: Option<RegionSnapshot>,
    projection: Projection,
    options: DisplayOptions,

    // Visible time range, in ms
    view_start: f64,
    view_stop: f64,

    menu: Option<ContextMenu>,
    menu_just_opened: bool,
    alert: Option<String>,
}

impl HostWindow for TimelineWindow {
    fn window_type(&self) -> &'static str {
        "nvgpu_timeline"
    }

    fn title(&self) -> &'static str {
        "NVIDIA GPU timeline"
    }

    fn content_help(&self) -> &'static str {
        "The number inside blocks indicates what percentage of the region runtime is CUDA-related. \
         Right-click any region to open the details menu (CR = CUDA-related runtime)."
    }

    fn prepare_refresh(&mut self) {
        self.loader.invalidate();
        self.menu = None;
    }

    fn prepare_close(&mut self) {
        self.loader.invalidate();
        self.menu = None;
        self.snapshot = None;
    }
}

impl TimelineWindow {
    pub fn new(source: Box<dyn DataSource + Send>) -> Self {
        Self {
            source: Arc::new(Mutex::new(source)),
            loader: Loader::new(),
            snapshot: None,
            projection: Projection::default(),
            options: DisplayOptions::for_max_end(0.0),
            view_start: 0.0,
            view_stop: 0.0,
            menu: None,
            menu_just_opened: false,
            alert: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loader.is_loading()
    }

    /// Starts fetching a fresh snapshot. Whatever is still in flight is
    /// abandoned.
    pub fn refresh(&mut self, ctx: &egui::Context) {
        self.prepare_refresh();

        let ticket = self.loader.begin();
        let loader = self.loader.clone();
        let source = Arc::clone(&self.source);
        let ctx = ctx.clone();
        let task = move || {
            let mut source = source.lock().unwrap_or_else(|p| p.into_inner());
            loader.run(ticket, &mut **source);
            ctx.request_repaint();
        };

        #[cfg(not(target_arch = "wasm32"))]
        std::thread::spawn(task);
        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(async move { task() });
    }

    /// Picks up a finished fetch, if any.
    pub fn poll(&mut self) {
        if let Some(result) = self.loader.poll() {
            self.apply(result);
        }
    }

    fn apply(&mut self, result: Result<RegionSnapshot, FetchError>) {
        match result {
            Ok(snapshot) => {
                self.projection = project(&snapshot);
                self.options = DisplayOptions::for_max_end(self.projection.max_end);
                self.view_start = self.options.min;
                self.view_stop = self.options.max;
                self.snapshot = Some(snapshot);
                self.alert = None;
            }
            Err(e) => {
                tracing::error!("could not download the module data: {}", e);
                self.alert = Some(e.to_string());
            }
        }
    }

    fn view_span(&self) -> f64 {
        (self.view_stop - self.view_start).at_least(1e-6)
    }

    fn time_to_x(&self, rect: Rect, ms: f64) -> f32 {
        rect.min.x + ((ms - self.view_start) / self.view_span()) as f32 * rect.width()
    }

    fn x_to_time(&self, rect: Rect, x: f32) -> f64 {
        self.view_start + ((x - rect.min.x) / rect.width()) as f64 * self.view_span()
    }

    fn pan_zoom(&mut self, ui: &egui::Ui, rect: Rect) {
        let (zoom, scroll, hover) = {
            let input = ui.input();
            (input.zoom_delta(), input.scroll_delta, input.pointer.hover_pos())
        };
        let Some(hover) = hover.filter(|h| rect.contains(*h)) else {
            return;
        };

        if zoom != 1.0 {
            let anchor = self.x_to_time(rect, hover.x);
            let span = self.view_span() / zoom as f64;
            let fraction = (anchor - self.view_start) / self.view_span();
            self.view_start = anchor - fraction * span;
            self.view_stop = self.view_start + span;
        }
        if scroll.x != 0.0 {
            let shift = -(scroll.x / rect.width()) as f64 * self.view_span();
            self.view_start += shift;
            self.view_stop += shift;
        }

        // Stay inside the display bounds
        let span = self.view_span().at_most(self.options.max - self.options.min);
        if self.view_start < self.options.min {
            self.view_start = self.options.min;
            self.view_stop = self.view_start + span;
        }
        if self.view_stop > self.options.max {
            self.view_stop = self.options.max;
            self.view_start = (self.view_stop - span).at_least(self.options.min);
        }
    }

    fn axis(&self, ui: &mut egui::Ui, rect: Rect) {
        let style = ui.style();
        let font_id = TextStyle::Small.resolve(style);
        let color = style.visuals.text_color();
        let grid = style.visuals.widgets.noninteractive.bg_stroke;

        let max_ticks = (rect.width() / 80.0).at_least(1.0) as usize;
        let (unit, step) = DisplayOptions::tick_unit(self.view_span(), max_ticks);
        let format = self.options.minor_labels.get(unit);

        let mut tick = (self.view_start / step).ceil() * step;
        while tick <= self.view_stop {
            let x = self.time_to_x(rect, tick);
            ui.painter().line_segment(
                [Pos2::new(x, rect.max.y - 4.0), Pos2::new(x, rect.max.y)],
                grid,
            );
            ui.painter().text(
                Pos2::new(x + 2.0, rect.min.y),
                Align2::LEFT_TOP,
                format.label(tick),
                font_id.clone(),
                color,
            );
            tick += step;
        }

        if self.options.show_major_labels {
            ui.painter().text(
                rect.left_bottom(),
                Align2::LEFT_BOTTOM,
                Timestamp((self.view_start * 1_000_000.0) as i64).to_string(),
                font_id,
                color,
            );
        }
    }

    fn label(ui: &mut egui::Ui, rect: Rect, group: &TimelineGroup) {
        let response = ui.allocate_rect(rect, egui::Sense::hover());
        let style = ui.style();
        let font_id = TextStyle::Body.resolve(style);
        let visuals = style.noninteractive();

        ui.painter()
            .rect(rect, 0.0, visuals.bg_fill, visuals.bg_stroke);
        ui.painter().text(
            rect.min + style.spacing.item_spacing,
            Align2::LEFT_TOP,
            &group.content,
            font_id,
            visuals.text_color(),
        );
        if response.hovered() {
            response.on_hover_text(group.id.as_str());
        }
    }

    fn paint_item(&self, ui: &egui::Ui, rect: Rect, item: &TimelineItem) {
        let min_x = self.time_to_x(rect, item.start).at_least(rect.min.x);
        let max_x = self.time_to_x(rect, item.end).at_most(rect.max.x);
        if min_x > max_x {
            return;
        }
        let item_rect = Rect::from_min_max(
            Pos2::new(min_x, rect.min.y + 2.0),
            Pos2::new(max_x.at_least(min_x + 1.0), rect.max.y - 2.0),
        );
        ui.painter()
            .rect(item_rect, 0.0, item.style.fill, Stroke::NONE);
        ui.painter().text(
            item_rect.center(),
            Align2::CENTER_CENTER,
            &item.content,
            TextStyle::Body.resolve(ui.style()),
            item.style.text,
        );
    }

    fn paint_grid(&self, ui: &egui::Ui, rect: Rect) {
        let grid = ui.style().visuals.widgets.noninteractive.bg_stroke;
        let stroke = Stroke::new(grid.width, grid.color.linear_multiply(0.5));
        let max_ticks = (rect.width() / 80.0).at_least(1.0) as usize;
        let (_, step) = DisplayOptions::tick_unit(self.view_span(), max_ticks);
        let mut tick = (self.view_start / step).ceil() * step;
        while tick <= self.view_stop {
            let x = self.time_to_x(rect, tick);
            ui.painter()
                .line_segment([Pos2::new(x, rect.min.y), Pos2::new(x, rect.max.y)], stroke);
            tick += step;
        }
    }

    fn content(
        &self,
        ui: &mut egui::Ui,
        rect: Rect,
        group: &TimelineGroup,
        item: Option<&TimelineItem>,
    ) -> Option<ContextEvent> {
        let response = ui.allocate_rect(rect, egui::Sense::click());
        let style = ui.style();
        let visuals = style.interact_selectable(&response, false);
        ui.painter()
            .rect(rect, 0.0, visuals.bg_fill, visuals.bg_stroke);

        match item {
            Some(item) if item.style.background => {
                self.paint_item(ui, rect, item);
                self.paint_grid(ui, rect);
            }
            Some(item) => {
                self.paint_grid(ui, rect);
                self.paint_item(ui, rect, item);
            }
            None => self.paint_grid(ui, rect),
        }

        if response.secondary_clicked() {
            let pos = response.interact_pointer_pos().unwrap_or(rect.center());
            return Some(ContextEvent {
                group_id: Some(group.id.clone()),
                x: pos.x as i32,
                y: pos.y as i32,
            });
        }
        if let (Some(item), Some(hover)) = (item, response.hover_pos()) {
            let start = Timestamp((item.start * 1_000_000.0).round() as i64);
            let stop = Timestamp((item.end * 1_000_000.0).round() as i64);
            if (self.time_to_x(rect, item.start)..=self.time_to_x(rect, item.end))
                .contains(&hover.x)
            {
                response.on_hover_text(format!(
                    "{}: {} GPU-related\n{}",
                    group.id,
                    item.content,
                    Interval::new(start, stop)
                ));
            }
        }
        None
    }

    fn handle_context(&mut self, event: ContextEvent, settings: &Settings) {
        let Some(snapshot) = &self.snapshot else {
            return;
        };
        self.menu = build_context_menu(&event, snapshot, settings.duration_format());
        self.menu_just_opened = self.menu.is_some();
    }

    pub fn ui(&mut self, ui: &mut egui::Ui, settings: &Settings) {
        // Use body font to figure out how tall to draw rectangles.
        let font_id = TextStyle::Body.resolve(ui.style());
        let row_height = ui.fonts().row_height(&font_id);

        ui.label(self.content_help());
        ui.separator();

        if self.is_loading() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading regions...");
            });
            return;
        }
        if self.snapshot.is_none() {
            ui.label("No region data loaded.");
            return;
        }

        let width = ui.available_width();
        let (axis_rect, _) =
            ui.allocate_exact_size(Vec2::new(width, row_height * 1.5), egui::Sense::hover());
        let content_min = (axis_rect.min.x + LABEL_WIDTH + COL_PADDING).at_most(axis_rect.max.x);
        let axis_rect = Rect::from_min_max(Pos2::new(content_min, axis_rect.min.y), axis_rect.max);
        let zoom_rect =
            Rect::from_min_max(axis_rect.min, Pos2::new(axis_rect.max.x, ui.max_rect().max.y));
        self.pan_zoom(ui, zoom_rect);
        self.axis(ui, axis_rect);

        let mut event = None;
        ScrollArea::vertical()
            .auto_shrink([false; 2])
            .show_viewport(ui, |ui, viewport| {
                let slot_height = ROW_LINES * row_height;
                let count = self.projection.groups.len() as f32;
                let height = (count * (slot_height + ROW_PADDING) - ROW_PADDING).at_least(0.0);
                ui.set_height(height);
                ui.set_width(ui.available_width());

                let rect = Rect::from_min_size(ui.min_rect().min, viewport.size());

                let mut y = rect.min.y;
                for group in &self.projection.groups {
                    let min_y = y;
                    let max_y = min_y + slot_height;
                    y = max_y + ROW_PADDING;

                    // Cull if out of bounds
                    // Note: need to shift by rect.min to get to viewport space
                    if max_y - rect.min.y < viewport.min.y {
                        continue;
                    } else if min_y - rect.min.y > viewport.max.y {
                        break;
                    }

                    let label_max = (rect.min.x + LABEL_WIDTH).at_most(rect.max.x);
                    let content_min = (label_max + COL_PADDING).at_most(rect.max.x);
                    let label_rect = Rect::from_min_max(
                        Pos2::new(rect.min.x, min_y),
                        Pos2::new(label_max, max_y),
                    );
                    let content_rect = Rect::from_min_max(
                        Pos2::new(content_min, min_y),
                        Pos2::new(rect.max.x, max_y),
                    );

                    let item = self.projection.item(&group.id);
                    if let Some(e) = self.content(ui, content_rect, group, item) {
                        event = Some(e);
                    }
                    Self::label(ui, label_rect, group);
                }

                // Clicks below the last row are not on any region
                let response = ui.allocate_rect(ui.min_rect(), egui::Sense::click());
                if event.is_none() && response.secondary_clicked() {
                    let pos = response.interact_pointer_pos().unwrap_or_default();
                    event = Some(ContextEvent {
                        group_id: None,
                        x: pos.x as i32,
                        y: pos.y as i32,
                    });
                }
            });

        if let Some(event) = event {
            self.handle_context(event, settings);
        }
    }

    fn show_menu(&mut self, ctx: &egui::Context) {
        let Some(menu) = &self.menu else {
            return;
        };

        let area = egui::Area::new(self.window_type())
            .order(egui::Order::Foreground)
            .fixed_pos(Pos2::new(menu.x as f32, menu.y as f32))
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.set_max_width(480.0);
                    for block in &menu.blocks {
                        menu_block(ui, block);
                    }
                });
            });

        let escape = ctx.input().key_pressed(egui::Key::Escape);
        if escape || (!self.menu_just_opened && area.response.clicked_elsewhere()) {
            self.menu = None;
        }
        self.menu_just_opened = false;
    }

    fn show_alert(&mut self, ctx: &egui::Context) {
        let mut open = self.alert.is_some();
        if let Some(message) = &self.alert {
            egui::Window::new("Error")
                .collapsible(false)
                .resizable(false)
                .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
                .open(&mut open)
                .show(ctx, |ui| {
                    ui.label("Could not download the module data!");
                    ui.label(RichText::new(message).weak());
                });
        }
        if !open {
            self.alert = None;
        }
    }
}

fn menu_block(ui: &mut egui::Ui, block: &MenuBlock) {
    match block {
        MenuBlock::Header {
            runtime,
            tracked_runtime,
        } => {
            ui.label(format!("Runtime: {}", runtime));
            ui.label(format!("CUDA-related runtime: {}", tracked_runtime));
            ui.separator();
        }
        MenuBlock::CallSummary(entries) => {
            ScrollArea::vertical().max_height(400.0).show(ui, |ui| {
                for entry in entries {
                    ui.horizontal(|ui| {
                        ui.add_space(entry.indent());
                        ui.label(entry.line());
                    });
                }
            });
        }
    }
}

pub struct TimelineViewer {
    window: TimelineWindow,
    settings: Settings,
    screen_rect: Rect,
    resizing: bool,

    #[cfg(not(target_arch = "wasm32"))]
    last_update: Instant,
}

impl TimelineViewer {
    /// Called once before the first frame.
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        source: Box<dyn DataSource + Send>,
        always_ms: Option<bool>,
    ) -> Self {
        // Load previous settings (if any).
        // Note that you must enable the `persistence` feature for this to work.
        let mut settings: Settings = if let Some(storage) = cc.storage {
            eframe::get_value(storage, eframe::APP_KEY).unwrap_or_default()
        } else {
            Default::default()
        };
        if let Some(always_ms) = always_ms {
            settings.always_ms = always_ms;
        }

        let mut window = TimelineWindow::new(source);
        window.refresh(&cc.egui_ctx);

        Self {
            window,
            settings,
            screen_rect: Rect::NOTHING,
            resizing: false,
            #[cfg(not(target_arch = "wasm32"))]
            last_update: Instant::now(),
        }
    }

    fn track_resize(&mut self, ctx: &egui::Context) {
        let screen_rect = ctx.input().screen_rect();
        if screen_rect != self.screen_rect {
            if !self.resizing && self.screen_rect != Rect::NOTHING {
                self.resizing = true;
                self.window.start_resize();
            }
            self.screen_rect = screen_rect;
        } else if self.resizing {
            self.resizing = false;
            self.window.finish_resize();
        }
    }
}

impl eframe::App for TimelineViewer {
    /// Called to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, &self.settings);
    }

    fn on_close_event(&mut self) -> bool {
        self.window.prepare_close();
        true
    }

    /// Called each time the UI needs repainting.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.track_resize(ctx);
        self.window.poll();

        let mut _fps = 0.0;
        #[cfg(not(target_arch = "wasm32"))]
        {
            let now = Instant::now();
            _fps = 1.0 / now.duration_since(self.last_update).as_secs_f64();
            self.last_update = now;
        }

        #[cfg(not(target_arch = "wasm32"))]
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Quit").clicked() {
                        self.window.prepare_close();
                        _frame.close();
                    }
                });
            });
        });

        let window = &mut self.window;
        let settings = &mut self.settings;
        egui::SidePanel::left("side_panel").show(ctx, |ui| {
            ui.heading(window.title());

            ui.separator();

            let refresh = ui.add_enabled(!window.is_loading(), egui::Button::new("Refresh"));
            if refresh.clicked() {
                window.refresh(ctx);
            }
            if ui
                .checkbox(&mut settings.always_ms, "Always show milliseconds")
                .changed()
            {
                // The open menu was formatted with the old preference
                window.menu = None;
            }

            ui.with_layout(egui::Layout::bottom_up(egui::Align::LEFT), |ui| {
                ui.horizontal(|ui| {
                    ui.spacing_mut().item_spacing.x = 0.0;
                    ui.label("powered by ");
                    ui.hyperlink_to("egui", "https://github.com/emilk/egui");
                    ui.label(" and ");
                    ui.hyperlink_to(
                        "eframe",
                        "https://github.com/emilk/egui/tree/master/crates/eframe",
                    );
                    ui.label(".");
                });

                #[cfg(not(target_arch = "wasm32"))]
                {
                    ui.separator();
                    ui.label(format!("FPS: {:.0}", _fps));
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            window.ui(ui, settings);
            egui::warn_if_debug_build(ui);
        });

        window.show_menu(ctx);
        window.show_alert(ctx);
    }
}

/// Opens the viewer on `source`. `always_ms` overrides the saved preference.
#[cfg(not(target_arch = "wasm32"))]
pub fn start(source: Box<dyn DataSource + Send>, always_ms: Option<bool>) {
    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "NVIDIA GPU timeline",
        native_options,
        Box::new(move |cc| Box::new(TimelineViewer::new(cc, source, always_ms))),
    );
}

#[cfg(target_arch = "wasm32")]
pub fn start(source: Box<dyn DataSource + Send>, always_ms: Option<bool>) {
    // Make sure panics are logged using `console.error`.
    console_error_panic_hook::set_once();

    // Redirect tracing to console.log and friends:
    tracing_wasm::set_as_global_default();

    let web_options = eframe::WebOptions::default();
    wasm_bindgen_futures::spawn_local(async move {
        if let Err(e) = eframe::start_web(
            "the_canvas_id", // hardcode it
            web_options,
            Box::new(move |cc| Box::new(TimelineViewer::new(cc, source, always_ms))),
        )
        .await
        {
            tracing::error!("failed to start eframe: {:?}", e);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CallNode, RegionRecord};

    struct Empty;

    impl DataSource for Empty {
        fn fetch_regions(&mut self) -> Result<RegionSnapshot, FetchError> {
            Ok(RegionSnapshot::new())
        }
    }

    fn loaded_window() -> TimelineWindow {
        let mut window = TimelineWindow::new(Box::new(Empty));
        let mut snapshot = RegionSnapshot::new();
        snapshot.insert(
            "step",
            RegionRecord::new(0, 4_000_000).with_call("cudaMemset", CallNode::leaf(1_000_000)),
        );
        window.apply(Ok(snapshot));
        window
    }

    #[test]
    fn host_contract() {
        let mut window = TimelineWindow::new(Box::new(Empty));
        assert_eq!(window.window_type(), "nvgpu_timeline");
        assert_eq!(window.title(), "NVIDIA GPU timeline");
        assert!(window.content_help().contains("CR = CUDA-related runtime"));
        window.start_resize();
        window.finish_resize();
        assert!(!window.is_loading());
    }

    #[test]
    fn applying_snapshot_sets_display_range() {
        let window = loaded_window();
        assert_eq!(window.projection.items.len(), 1);
        assert_eq!(window.options.max, 8.0);
        assert_eq!((window.view_start, window.view_stop), (0.0, 8.0));
    }

    #[test]
    fn failure_raises_alert_and_keeps_old_data() {
        let mut window = loaded_window();
        window.apply(Err(FetchError::BadRequest("node")));
        assert!(window.alert.as_deref().unwrap().contains("node"));
        assert!(window.snapshot.is_some());
    }

    #[test]
    fn context_click_opens_menu() {
        let mut window = loaded_window();
        let settings = Settings::default();
        window.handle_context(
            ContextEvent {
                group_id: Some("step".to_owned()),
                x: 10,
                y: 20,
            },
            &settings,
        );
        let menu = window.menu.as_ref().unwrap();
        assert_eq!(menu.region, "step");
        assert!(window.menu_just_opened);

        window.handle_context(
            ContextEvent {
                group_id: None,
                x: 0,
                y: 0,
            },
            &settings,
        );
        assert!(window.menu.is_none());
    }

    #[test]
    fn close_drops_snapshot_and_fetch() {
        let mut window = loaded_window();
        let ticket = window.loader.begin();
        window.prepare_close();
        assert!(window.snapshot.is_none());
        assert!(!window.loader.complete(ticket, Ok(RegionSnapshot::new())));
        window.poll();
        assert!(window.snapshot.is_none());
    }

    #[test]
    fn settings_default_and_persist() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert!(!settings.always_ms);
        assert_eq!(settings.duration_format(), DurationFormat::default());

        let stored = serde_json::to_string(&Settings { always_ms: true }).unwrap();
        let restored: Settings = serde_json::from_str(&stored).unwrap();
        assert!(restored.always_ms);
        assert!(restored.duration_format().always_ms);
    }
}
