//! The interactive session: sole owner of every piece of viewer state.
//!
//! Input arrives one event at a time through [`Session::handle`]; nothing in
//! here blocks. Basemap fetches run on the tokio runtime and come back as
//! completions that the host pumps between inputs.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use export::{
    BulkExportReport, ExportPipeline, ExportScene, ExportTarget, OverlayContent, OverlaySnapshot,
    swatch_rects,
};
use formats::MapData;
use foundation::math::Vec2;
use foundation::{Extent, ExtentError, ScreenRect, compute_locked_extent, regions_bounds};
use image::RgbaImage;
use layers::{
    Activation, CatalogError, LabelStyle, LayerCatalog, LayerDefinition, LayerError, LayerManager,
    LayerSelection, LegendMetrics, OutlineStyle, Rgba, WardTable, ward_labels,
};
use render::{MapContent, RenderCommand, RenderFrame, Renderer, rasterize};
use runtime::{Envelope, EventBus, HandlerTable, Metrics};
use scene::{
    DragController, DragOutcome, DragTarget, Draggable, DraggableElement, ElementId, ElementKind,
    Position, ScaleBar, ScaleBarLocation, SurfaceGeometry, ViewContext, ViewportController,
    ZoomDirection, ZoomRejected,
};
use streaming::{BasemapRefresher, BasemapSource, BasemapStore, Completion, Request, StoreUpdate};
use thiserror::Error;
use tracing::{debug, info};

use crate::input::{Handler, InputEvent, PointerButton, Topic};

/// Gap between an image badge and the surface edge.
pub const BADGE_INSET_PX: f64 = 5.0;
const LEGEND_INSET_PX: f64 = 10.0;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no boundary geometry to frame the view")]
    NoBoundaries,
    #[error(transparent)]
    Extent(#[from] ExtentError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RedrawReason {
    Pan,
    Zoom,
    ElementMoved,
    LayerChanged,
    Basemap,
    Visibility,
}

/// Outbound notifications for the host (the render surface and its UI).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Notification {
    Redraw(RedrawReason),
    BasemapRequested(Request),
    BasemapApplied(Request),
    BasemapFailed(Request),
}

/// What one input event did.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Handled {
    Ignored,
    Drag(DragOutcome),
    Zoomed(Extent),
    ZoomRejected(ZoomRejected),
}

/// Everything needed to open a session.
pub struct SessionInit<S> {
    pub surface: SurfaceGeometry,
    pub aspect: f64,
    pub padding_deg: f64,
    pub zoom_step: f64,
    pub class_count: usize,
    pub navigation: bool,
    pub definitions: Vec<LayerDefinition>,
    pub data: MapData,
    pub refresher: BasemapRefresher<S>,
    /// Already sized for the surface.
    pub logo: Option<RgbaImage>,
    pub arrow: Option<RgbaImage>,
}

pub struct Session<S> {
    surface: SurfaceGeometry,
    viewport: ViewportController,
    drag: DragController,
    layers: LayerManager,
    content: MapContent,
    refresher: BasemapRefresher<S>,
    basemap: BasemapStore,
    handlers: HandlerTable<Topic, Handler>,
    notifications: EventBus<Notification>,
    metrics: Metrics,
    busy: bool,
    zoom_step: f64,
    sprites: BTreeMap<ElementId, Arc<RgbaImage>>,
    labels: Vec<ElementId>,
    table: ElementId,
    legend: Option<ElementId>,
    scale_bar: ScaleBar,
    outline: OutlineStyle,
}

impl<S: BasemapSource + 'static> Session<S> {
    pub fn new(init: SessionInit<S>) -> Result<Self, SessionError> {
        let bounds = regions_bounds(&init.data.wards).ok_or(SessionError::NoBoundaries)?;
        let extent = compute_locked_extent(bounds, init.aspect, init.padding_deg)?;
        let MapData {
            wards,
            small_areas,
            layers,
        } = init.data;
        let catalog = LayerCatalog::new(init.definitions, layers, init.class_count)?;

        let surface = init.surface;
        let dpi = surface.dpi;
        let mut drag = DragController::new();

        let label_style = LabelStyle::default();
        let labels = ward_labels(&wards)
            .into_iter()
            .map(|l| {
                drag.register(
                    ElementKind::Label,
                    Position::Map(l.anchor),
                    label_style.text_size(&l.text, dpi),
                )
            })
            .collect();

        let table_style = LabelStyle {
            font_pt: 8.0,
            ..LabelStyle::default()
        };
        let table = drag.register(
            ElementKind::Table,
            Position::Normalized(Vec2::ZERO),
            WardTable::from_regions(&wards).estimated_size(&table_style, dpi),
        );

        let mut sprites = BTreeMap::new();
        let (w, h) = (surface.width_px, surface.height_px);
        if let Some(logo) = init.logo {
            let size = sprite_size(&logo);
            let at = Vec2::new(w - size.x - BADGE_INSET_PX, h - size.y - BADGE_INSET_PX);
            let id = drag.register(ElementKind::Image, Position::Screen(at), size);
            sprites.insert(id, Arc::new(logo));
        }
        if let Some(arrow) = init.arrow {
            let size = sprite_size(&arrow);
            let at = Vec2::new(w - size.x - BADGE_INSET_PX, BADGE_INSET_PX);
            let id = drag.register(ElementKind::Image, Position::Screen(at), size);
            sprites.insert(id, Arc::new(arrow));
        }

        let mut handlers = HandlerTable::new();
        for topic in [Topic::Press, Topic::Move, Topic::Release] {
            handlers.subscribe(topic, Handler::Elements);
        }

        let mut session = Self {
            surface,
            viewport: ViewportController::new(extent),
            drag,
            layers: LayerManager::new(catalog),
            content: MapContent::from_lonlat(&wards, &small_areas),
            refresher: init.refresher,
            basemap: BasemapStore::new(),
            handlers,
            notifications: EventBus::new(),
            metrics: Metrics::new(),
            busy: false,
            zoom_step: init.zoom_step,
            sprites,
            labels,
            table,
            legend: None,
            scale_bar: ScaleBar::default(),
            outline: OutlineStyle::default(),
        };
        session.set_navigation(init.navigation);
        info!(
            wards = wards.len(),
            small_areas = small_areas.len(),
            elements = session.drag.elements().count(),
            "session ready"
        );
        Ok(session)
    }

    pub fn view(&self) -> ViewContext {
        ViewContext::new(self.surface, self.viewport.extent())
    }

    pub fn extent(&self) -> Extent {
        self.viewport.extent()
    }

    pub fn elements(&self) -> &DragController {
        &self.drag
    }

    pub fn layers(&self) -> &LayerManager {
        &self.layers
    }

    pub fn basemap(&self) -> &BasemapStore {
        &self.basemap
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn label_ids(&self) -> &[ElementId] {
        &self.labels
    }

    pub fn table_id(&self) -> ElementId {
        self.table
    }

    pub fn legend_id(&self) -> Option<ElementId> {
        self.legend
    }

    pub fn scale_bar(&self) -> ScaleBar {
        self.scale_bar
    }

    pub fn navigation_enabled(&self) -> bool {
        self.handlers.is_subscribed(Topic::Press, Handler::MapExtent)
    }

    pub fn drain_notifications(&mut self) -> Vec<Envelope<Notification>> {
        self.notifications.drain()
    }

    fn notify(&mut self, notification: Notification) {
        if let Notification::Redraw(_) = notification {
            self.metrics.inc("redraws");
        }
        self.notifications.emit(notification);
    }

    /// Dispatches one input event to the handlers subscribed to its topic.
    pub fn handle(&mut self, event: InputEvent) -> Handled {
        if self.busy {
            self.metrics.inc("input_ignored_busy");
            debug!(?event, "input ignored while busy");
            return Handled::Ignored;
        }
        let handlers = self.handlers.handlers(event.topic()).to_vec();
        match event {
            InputEvent::Press { pointer, button } => {
                if button != PointerButton::Primary {
                    return Handled::Ignored;
                }
                for handler in handlers {
                    let view = self.view();
                    let outcome = match handler {
                        Handler::Elements => self.drag.press(pointer, &view),
                        Handler::MapExtent => self.drag.press_map(pointer, &view, &mut self.viewport),
                        Handler::WheelZoom => DragOutcome::Ignored,
                    };
                    if outcome != DragOutcome::Ignored {
                        debug!(?outcome, "drag started");
                        return Handled::Drag(outcome);
                    }
                }
                Handled::Ignored
            }
            InputEvent::Move { pointer } => {
                if !handlers.contains(&Handler::Elements) {
                    return Handled::Ignored;
                }
                let view = self.view();
                let outcome = self.drag.motion(pointer, &view, &mut self.viewport);
                self.after_drag(outcome)
            }
            InputEvent::Release { button, .. } => {
                if button != PointerButton::Primary || !handlers.contains(&Handler::Elements) {
                    return Handled::Ignored;
                }
                let outcome = self.drag.release(&mut self.viewport);
                self.after_drag(outcome)
            }
            InputEvent::Wheel { delta } => {
                if !handlers.contains(&Handler::WheelZoom) || delta == 0.0 || self.drag.active().is_some() {
                    return Handled::Ignored;
                }
                let direction = if delta > 0.0 {
                    ZoomDirection::In
                } else {
                    ZoomDirection::Out
                };
                self.zoom(direction)
            }
        }
    }

    fn after_drag(&mut self, outcome: DragOutcome) -> Handled {
        match outcome {
            DragOutcome::Ignored => return Handled::Ignored,
            DragOutcome::Started(_) => {}
            DragOutcome::Moved {
                target: DragTarget::MapExtent,
                ..
            } => {
                self.metrics.inc("pan_steps");
                self.notify(Notification::Redraw(RedrawReason::Pan));
            }
            DragOutcome::Moved { .. } => self.notify(Notification::Redraw(RedrawReason::ElementMoved)),
            DragOutcome::Released { settled, .. } => {
                if let Some(settled) = settled {
                    debug!(generation = settled.generation, "view settled after pan");
                    self.notify(Notification::Redraw(RedrawReason::Pan));
                    self.refresh_basemap();
                } else {
                    self.notify(Notification::Redraw(RedrawReason::ElementMoved));
                }
            }
        }
        Handled::Drag(outcome)
    }

    /// One fixed-size zoom step; settles immediately.
    pub fn zoom(&mut self, direction: ZoomDirection) -> Handled {
        match self.viewport.zoom(direction, self.zoom_step) {
            Ok(extent) => {
                self.metrics.inc("zoom_steps");
                self.notify(Notification::Redraw(RedrawReason::Zoom));
                let settled = self.viewport.settle();
                debug!(generation = settled.generation, ?direction, "view settled after zoom");
                self.refresh_basemap();
                Handled::Zoomed(extent)
            }
            Err(rejected) => {
                debug!(%rejected, "zoom step rejected");
                Handled::ZoomRejected(rejected)
            }
        }
    }

    /// Subscribes or unsubscribes drag-pan and wheel-zoom. Disabling while a
    /// pan is in flight ends it as if the pointer had been released.
    pub fn set_navigation(&mut self, enabled: bool) -> bool {
        let changed = if enabled {
            self.handlers.subscribe(Topic::Press, Handler::MapExtent)
                | self.handlers.subscribe(Topic::Wheel, Handler::WheelZoom)
        } else {
            self.handlers.unsubscribe(Topic::Press, Handler::MapExtent)
                | self.handlers.unsubscribe(Topic::Wheel, Handler::WheelZoom)
        };
        if !enabled && self.drag.active() == Some(DragTarget::MapExtent) {
            let outcome = self.drag.release(&mut self.viewport);
            self.after_drag(outcome);
        }
        if changed {
            info!(enabled, "map navigation toggled");
        }
        changed
    }

    /// Layer menu entry point. Ignored while an export owns the session.
    pub fn select_layer(&mut self, selection: &LayerSelection) -> Result<Activation, LayerError> {
        if self.busy {
            debug!(layer = %selection, "layer change ignored while busy");
            return Ok(Activation::Ignored);
        }
        self.apply_layer(selection)
    }

    fn apply_layer(&mut self, selection: &LayerSelection) -> Result<Activation, LayerError> {
        let activation = self.layers.activate(selection)?;
        match activation {
            Activation::Ignored => return Ok(activation),
            Activation::Cleared => self.remove_legend(),
            Activation::Activated { .. } => {
                self.remove_legend();
                if let Some(legend) = self.layers.legend() {
                    let size = legend.estimated_size(&LegendMetrics::for_dpi(self.surface.dpi));
                    let plot = self.surface.plot;
                    let at = Vec2::new(plot.x + LEGEND_INSET_PX, plot.y + LEGEND_INSET_PX);
                    self.legend = Some(self.drag.register(ElementKind::Legend, Position::Screen(at), size));
                }
            }
        }
        self.metrics.inc("layer_activations");
        self.notify(Notification::Redraw(RedrawReason::LayerChanged));
        Ok(activation)
    }

    fn remove_legend(&mut self) {
        if let Some(id) = self.legend.take() {
            self.drag.remove(id);
        }
    }

    pub fn set_table_visible(&mut self, visible: bool) -> bool {
        let changed = self.drag.set_visible(self.table, visible);
        if changed {
            self.notify(Notification::Redraw(RedrawReason::Visibility));
        }
        changed
    }

    pub fn set_scale_bar_visible(&mut self, visible: bool) -> bool {
        if self.scale_bar.visible == visible {
            return false;
        }
        self.scale_bar.visible = visible;
        self.notify(Notification::Redraw(RedrawReason::Visibility));
        true
    }

    pub fn set_scale_bar_location(&mut self, location: ScaleBarLocation) {
        if self.scale_bar.location != location {
            self.scale_bar.location = location;
            self.notify(Notification::Redraw(RedrawReason::Visibility));
        }
    }

    /// Issues a fetch for the current extent without waiting for it.
    pub fn refresh_basemap(&mut self) -> Request {
        let width = self.surface.width_px.round().max(1.0) as u32;
        let request = self.refresher.request(self.viewport.extent(), width);
        self.metrics.inc("basemap_requests");
        self.notify(Notification::BasemapRequested(request));
        request
    }

    /// Applies every completion that has arrived. Returns how many there were.
    pub fn pump_basemap(&mut self) -> usize {
        let completions = self.refresher.drain();
        let n = completions.len();
        for completion in completions {
            self.apply_completion(completion);
        }
        n
    }

    /// Waits up to `timeout` for one completion and applies it.
    pub async fn wait_basemap(&mut self, timeout: Duration) -> Option<StoreUpdate> {
        match tokio::time::timeout(timeout, self.refresher.next()).await {
            Ok(Some(completion)) => Some(self.apply_completion(completion)),
            Ok(None) => None,
            Err(_) => {
                debug!(?timeout, in_flight = self.refresher.in_flight(), "basemap wait timed out");
                None
            }
        }
    }

    fn apply_completion(&mut self, completion: Completion) -> StoreUpdate {
        let update = self.basemap.apply(completion);
        match update {
            StoreUpdate::Applied(request) => {
                self.metrics.inc("basemap_applied");
                self.notify(Notification::BasemapApplied(request));
                self.notify(Notification::Redraw(RedrawReason::Basemap));
            }
            StoreUpdate::KeptStale(request) => {
                self.metrics.inc("basemap_failed");
                self.notify(Notification::BasemapFailed(request));
            }
        }
        update
    }

    fn map_frame(&self, view: &ViewContext, stroke_scale: f64) -> RenderFrame<'_> {
        let mut frame = Renderer::collect_map(
            &self.content,
            self.layers.choropleth(),
            self.basemap.image(),
            self.outline,
            &view.transform(),
            stroke_scale as f32,
        );
        if let Some(layout) = self.scale_bar.layout(view) {
            let r = layout.rect;
            let bar_h = r.height / 4.0;
            frame.push(RenderCommand::Panel {
                rect: ScreenRect::new(r.x, r.bottom() - bar_h, r.width, bar_h),
                background: Rgba::BLACK,
                border: Rgba::BLACK,
            });
        }
        frame
    }

    /// Display list of the interactive surface: map, scale bar, overlays.
    pub fn frame(&self) -> RenderFrame<'_> {
        let view = self.view();
        let mut frame = self.map_frame(&view, 1.0);
        let mut elements: Vec<&DraggableElement> = self.drag.elements().filter(|e| e.visible).collect();
        elements.sort_by_key(|e| (e.z, e.id));
        for el in elements {
            let rect = el.screen_rect(&view);
            if let Some(sprite) = self.sprites.get(&el.id) {
                frame.push(RenderCommand::Image {
                    image: sprite.as_ref(),
                    dest: rect,
                });
                continue;
            }
            if let OverlayContent::Panel {
                background,
                border,
                header_rows,
                swatches,
            } = self.panel_for(el)
            {
                frame.push(RenderCommand::Panel {
                    rect,
                    background,
                    border,
                });
                for (swatch, color) in swatch_rects(rect, header_rows, swatches.len()).into_iter().zip(swatches) {
                    frame.push(RenderCommand::Panel {
                        rect: swatch,
                        background: color,
                        border: Rgba::BLACK,
                    });
                }
            }
        }
        frame
    }

    pub fn render_interactive(&self) -> RgbaImage {
        rasterize(&self.frame(), Rgba::WHITE)
    }

    fn panel_for(&self, el: &DraggableElement) -> OverlayContent {
        match el.kind {
            ElementKind::Legend => {
                let (header_rows, swatches) = self
                    .layers
                    .legend()
                    .map(|l| (l.title.lines().count(), l.entries.iter().map(|e| e.color).collect()))
                    .unwrap_or((0, Vec::new()));
                OverlayContent::Panel {
                    background: Rgba::WHITE,
                    border: Rgba::BLACK,
                    header_rows,
                    swatches,
                }
            }
            // White halo, no frame.
            ElementKind::Label => OverlayContent::Panel {
                background: Rgba::WHITE,
                border: Rgba::WHITE,
                header_rows: 1,
                swatches: Vec::new(),
            },
            ElementKind::Table | ElementKind::Image => OverlayContent::Panel {
                background: Rgba::WHITE,
                border: Rgba::BLACK,
                header_rows: 1,
                swatches: Vec::new(),
            },
        }
    }

    pub fn export(&mut self, pipeline: &ExportPipeline, target: ExportTarget) -> BulkExportReport {
        pipeline.run(self, target)
    }
}

impl<S: BasemapSource + 'static> ExportScene for Session<S> {
    fn surface(&self) -> SurfaceGeometry {
        self.surface
    }

    fn render_base(&self, width: u32, height: u32, scale: f64) -> RgbaImage {
        let surface = SurfaceGeometry::new(f64::from(width), f64::from(height), self.surface.dpi * scale);
        let view = ViewContext::new(surface, self.viewport.extent());
        rasterize(&self.map_frame(&view, scale), Rgba::WHITE)
    }

    fn overlays(&self) -> Vec<OverlaySnapshot> {
        let view = self.view();
        self.drag
            .elements()
            .filter(|e| e.visible)
            .map(|el| OverlaySnapshot {
                id: el.id,
                kind: el.kind,
                rect: el.screen_rect(&view),
                z: el.z,
                content: match self.sprites.get(&el.id) {
                    Some(sprite) => OverlayContent::Sprite(Arc::clone(sprite)),
                    None => self.panel_for(el),
                },
            })
            .collect()
    }

    fn active_layer(&self) -> LayerSelection {
        self.layers.active().clone()
    }

    fn layer_selections(&self) -> Vec<LayerSelection> {
        self.layers.catalog().selections().collect()
    }

    fn activate(&mut self, selection: &LayerSelection) -> Result<(), LayerError> {
        self.apply_layer(selection).map(|_| ())
    }

    /// Busy blocks all pointer input and ends any drag in progress.
    fn set_busy(&mut self, busy: bool) {
        if busy && self.drag.active().is_some() {
            let outcome = self.drag.release(&mut self.viewport);
            self.after_drag(outcome);
        }
        if self.busy != busy {
            debug!(busy, "session busy state changed");
        }
        self.busy = busy;
    }
}

fn sprite_size(image: &RgbaImage) -> Vec2 {
    Vec2::new(f64::from(image.width()), f64::from(image.height()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{Handled, Notification, RedrawReason, Session, SessionInit};
    use crate::input::{InputEvent, PointerButton};
    use export::{ExportPipeline, ExportScene, ExportTarget};
    use formats::MapData;
    use foundation::math::Vec2;
    use foundation::{Extent, Polygon, Region, RegionId};
    use image::RgbaImage;
    use layers::{Activation, ColorRamp, LayerDefinition, LayerDescriptor, LayerId, LayerSelection};
    use pretty_assertions::assert_eq;
    use scene::{DragOutcome, DragTarget, Draggable, Position, SurfaceGeometry, ZoomDirection};
    use streaming::{BasemapError, BasemapImage, BasemapRefresher, BasemapSource, BoxFuture, RetryPolicy};
    use tokio::runtime::Handle;

    struct SolidSource;

    impl BasemapSource for SolidSource {
        fn fetch(&self, extent: Extent, _width_px: u32) -> BoxFuture<'_, Result<BasemapImage, BasemapError>> {
            Box::pin(async move {
                Ok(BasemapImage {
                    extent,
                    image: RgbaImage::from_pixel(8, 6, image::Rgba([220, 220, 220, 255])),
                })
            })
        }
    }

    fn square(id: &str, lon: f64, lat: f64, size: f64) -> Region {
        let ring = vec![
            Vec2::new(lon, lat),
            Vec2::new(lon + size, lat),
            Vec2::new(lon + size, lat + size),
            Vec2::new(lon, lat + size),
        ];
        Region::new(id, format!("Ward {id}"), vec![Polygon::new(vec![ring])])
    }

    fn ramp() -> ColorRamp {
        ColorRamp::from_hex(&["#ffffdd", "#ffd799", "#f29d52", "#c06e46", "#a66141"]).unwrap()
    }

    fn session() -> Session<SolidSource> {
        let wards = vec![square("W1", -0.35, 50.82, 0.02), square("W2", -0.33, 50.82, 0.02)];
        let small_areas: Vec<Region> = (0..10)
            .map(|i| square(&format!("E{i:02}"), -0.35 + 0.004 * f64::from(i), 50.83, 0.004))
            .collect();
        let values = |f: fn(u32) -> f64| {
            (0..10u32)
                .map(|i| (RegionId::new(format!("E{i:02}")), f(i)))
                .collect::<Vec<_>>()
        };
        let data = MapData {
            wards,
            small_areas,
            layers: vec![
                LayerDescriptor::new(LayerId::new("pcHHSRS"), values(|i| f64::from(i + 1))),
                LayerDescriptor::new(LayerId::new("SimpleCO2"), values(|i| f64::from(i) * 0.5)),
            ],
        };
        let refresher = BasemapRefresher::new(
            std::sync::Arc::new(SolidSource),
            Handle::current(),
            RetryPolicy::default(),
        );
        Session::new(SessionInit {
            surface: SurfaceGeometry::new(800.0, 600.0, 95.0),
            aspect: 800.0 / 600.0,
            padding_deg: 0.003,
            zoom_step: 300.0,
            class_count: 5,
            navigation: false,
            definitions: vec![
                LayerDefinition::new("pcHHSRS", "HHSRS Cat. 1 Hazards", ramp()),
                LayerDefinition::new("SimpleCO2", "Average SimpleCO2", ramp())
                    .with_unit("Tonnes/year")
                    .with_precision(1),
            ],
            data,
            refresher,
            logo: Some(RgbaImage::from_pixel(100, 40, image::Rgba([0, 0, 255, 255]))),
            arrow: None,
        })
        .unwrap()
    }

    fn press(x: f64, y: f64) -> InputEvent {
        InputEvent::Press {
            pointer: Vec2::new(x, y),
            button: PointerButton::Primary,
        }
    }

    fn release() -> InputEvent {
        InputEvent::Release {
            pointer: Vec2::ZERO,
            button: PointerButton::Primary,
        }
    }

    #[tokio::test]
    async fn layer_swap_adds_and_removes_fills_and_legend() {
        let mut s = session();
        let labels_before: Vec<_> = s.label_ids().to_vec();
        let table_before = s.elements().get(s.table_id()).cloned();

        let a = s.select_layer(&LayerSelection::parse("pcHHSRS")).unwrap();
        assert!(matches!(a, Activation::Activated { classes: 5, .. }));
        let counts: usize = s.layers().legend().unwrap().entries.iter().map(|e| e.count).sum();
        assert_eq!(counts, 10);
        assert!(s.legend_id().is_some());
        let legend_first = s.layers().legend().cloned();

        assert_eq!(s.select_layer(&LayerSelection::None).unwrap(), Activation::Cleared);
        assert!(s.layers().choropleth().is_none());
        assert!(s.legend_id().is_none());
        assert_eq!(s.label_ids(), labels_before.as_slice());
        assert_eq!(s.elements().get(s.table_id()).cloned(), table_before);

        s.select_layer(&LayerSelection::parse("pcHHSRS")).unwrap();
        assert_eq!(s.layers().legend().cloned(), legend_first);
        assert_eq!(s.select_layer(&LayerSelection::parse("nope")).unwrap(), Activation::Ignored);
    }

    #[tokio::test]
    async fn navigation_gates_pan_and_zoom() {
        let mut s = session();
        let start = s.extent();
        // Centre of the map, away from labels and the table.
        let empty = Vec2::new(400.0, 60.0);
        assert_eq!(s.handle(InputEvent::Wheel { delta: 1.0 }), Handled::Ignored);
        assert_eq!(s.handle(press(empty.x, empty.y)), Handled::Ignored);

        assert!(s.set_navigation(true));
        assert!(s.navigation_enabled());
        assert_eq!(
            s.handle(press(empty.x, empty.y)),
            Handled::Drag(DragOutcome::Started(DragTarget::MapExtent))
        );
        s.handle(InputEvent::Move {
            pointer: Vec2::new(empty.x - 10.0, empty.y + 20.0),
        });
        let moved = s.extent();
        assert!((moved.width() - start.width()).abs() < 1e-6);
        assert!((moved.height() - start.height()).abs() < 1e-6);
        assert!(moved.xmin > start.xmin);
        assert!(moved.ymin > start.ymin);

        s.drain_notifications();
        assert!(matches!(
            s.handle(release()),
            Handled::Drag(DragOutcome::Released { settled: Some(_), .. })
        ));
        let notes: Vec<Notification> = s.drain_notifications().into_iter().map(|e| e.event).collect();
        assert!(notes.contains(&Notification::Redraw(RedrawReason::Pan)));
        assert!(notes.iter().any(|n| matches!(n, Notification::BasemapRequested(_))));

        assert!(matches!(s.handle(InputEvent::Wheel { delta: 1.0 }), Handled::Zoomed(_)));
        assert!(matches!(s.zoom(ZoomDirection::Out), Handled::Zoomed(_)));
        assert!(s.extent().approx_eq(&moved, 1e-9));
    }

    #[tokio::test]
    async fn basemap_completion_is_applied() {
        let mut s = session();
        let request = s.refresh_basemap();
        let update = s.wait_basemap(Duration::from_secs(5)).await;
        assert_eq!(update, Some(streaming::StoreUpdate::Applied(request)));
        assert_eq!(s.basemap().shown(), Some(request));
        assert_eq!(s.metrics().counter("basemap_applied"), 1);
    }

    #[tokio::test]
    async fn table_drag_moves_in_normalized_space() {
        let mut s = session();
        let view = s.view();
        let rect = s.elements().get(s.table_id()).unwrap().screen_rect(&view);
        let grab = Vec2::new(rect.x + 2.0, rect.bottom() - 2.0);
        assert_eq!(
            s.handle(press(grab.x, grab.y)),
            Handled::Drag(DragOutcome::Started(DragTarget::Element(s.table_id())))
        );
        s.handle(InputEvent::Move {
            pointer: Vec2::new(grab.x + 80.0, grab.y - 60.0),
        });
        s.handle(release());
        let Position::Normalized(f) = s.elements().get(s.table_id()).unwrap().position else {
            panic!("table position must stay normalized");
        };
        assert!((f.x - 0.1).abs() < 1e-9);
        assert!((f.y - 0.1).abs() < 1e-9);
        assert!(s.elements().active().is_none());
    }

    #[tokio::test]
    async fn busy_session_ignores_input() {
        let mut s = session();
        s.set_navigation(true);
        s.set_busy(true);
        assert_eq!(s.handle(press(400.0, 60.0)), Handled::Ignored);
        assert_eq!(
            s.select_layer(&LayerSelection::parse("pcHHSRS")).unwrap(),
            Activation::Ignored
        );
        s.set_busy(false);
        assert!(matches!(s.handle(press(400.0, 60.0)), Handled::Drag(_)));
    }

    #[tokio::test]
    async fn export_places_logo_like_the_screen() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session();
        s.select_layer(&LayerSelection::parse("SimpleCO2")).unwrap();

        let pipeline = ExportPipeline::new(dir.path(), 95.0);
        let report = s.export(&pipeline, ExportTarget::CurrentLayer);
        assert!(report.is_complete());
        let img = image::open(dir.path().join("SimpleCO2.png")).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (800, 600));
        // Logo: 100 x 40 at the bottom-right corner, 5 px in.
        assert_eq!(img.get_pixel(695, 555).0, [0, 0, 255, 255]);
        assert_eq!(img.get_pixel(794, 594).0, [0, 0, 255, 255]);
        assert_ne!(img.get_pixel(795, 595).0, [0, 0, 255, 255]);

        let interactive = s.render_interactive();
        assert_eq!(interactive.get_pixel(695, 555), img.get_pixel(695, 555));
        assert_eq!(s.active_layer(), LayerSelection::parse("SimpleCO2"));
    }

    #[tokio::test]
    async fn bulk_export_writes_every_layer() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session();
        let pipeline = ExportPipeline::new(dir.path(), 190.0);
        let report = s.export(&pipeline, ExportTarget::AllLayers);
        assert!(report.is_complete());
        assert_eq!(report.written.len(), 3);
        assert!(!s.is_busy());
        let img = image::open(dir.path().join("pcHHSRS.png")).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (1600, 1200));
        assert_eq!(s.active_layer(), LayerSelection::None);
    }
}
