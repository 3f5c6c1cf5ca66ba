//! DOM-free viewer core: scene, camera, input, selection and lifecycle.
//!
//! `lib.rs` owns one `Viewer` and forwards browser events to it; everything
//! here runs natively under `cargo test`.

use std::sync::Arc;

use catalog::{Catalog, MuseumEntry};
use foundation::math::{Vec2, vector3_to_lat_lng};
use runtime::{EventBus, EventKind, Frame, FrameClock, Lifecycle, Transition};
use scene::camera::PerspectiveCamera;
use scene::picking::pick_screen;
use scene::prefabs::{GlobeHandles, MarkerPayload, spawn_globe, spawn_starfield};
use scene::selection::Selection;
use scene::{NodeId, World};
use tracing::{debug, info, warn};

use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::globe_controller::{
    ControllerSettings, GlobeController, MoveOutcome, PressOutcome, ReleaseOutcome,
};
use crate::overlay::{PopupPlacement, place_popup};

/// What the popup should do after an input event.
#[derive(Debug, Clone, PartialEq)]
pub enum PopupChange {
    Show {
        index: usize,
        entry: Arc<MuseumEntry>,
    },
    Hide,
    Unchanged,
}

/// Entries handed over by the host page as a JSON array. `None` or a blank
/// string keeps the built-in museums.
pub fn catalog_from_json(json: Option<&str>) -> Result<Catalog, ViewerError> {
    match json.map(str::trim) {
        None | Some("") => Ok(Catalog::builtin()),
        Some(text) => Ok(Catalog::from_json(text)?),
    }
}

pub struct Viewer {
    config: ViewerConfig,
    catalog: Catalog,
    world: World<MarkerPayload>,
    camera: PerspectiveCamera,
    controller: GlobeController,
    selection: Selection,
    globe: Option<GlobeHandles>,
    lifecycle: Lifecycle,
    clock: FrameClock,
    events: EventBus,
    viewport: Vec2,
    frame_index: u64,
}

impl Viewer {
    /// Builds the camera and the starfield. The globe waits for
    /// [`Viewer::finish_loading`].
    pub fn new(config: ViewerConfig, catalog: Catalog) -> Result<Self, ViewerError> {
        config.validate()?;

        let mut world = World::new();
        spawn_starfield(&mut world, &config.starfield_settings())?;

        let controller = GlobeController::new(
            ControllerSettings {
                rotate_speed: config.rotate_speed,
                zoom_step: config.zoom_step,
                min_distance: config.min_distance,
                max_distance: config.max_distance,
                focus_duration_s: config.focus_duration_s,
            },
            config.initial_distance,
        );
        let camera = PerspectiveCamera::orbiting_origin(
            config.fov_deg,
            1.0,
            config.near,
            config.far,
            controller.distance(),
        );

        Ok(Self {
            config,
            catalog,
            world,
            camera,
            controller,
            selection: Selection::new(),
            globe: None,
            lifecycle: Lifecycle::new(),
            clock: FrameClock::new(),
            events: EventBus::new(),
            viewport: Vec2::new(1.0, 1.0),
            frame_index: 0,
        })
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn world(&self) -> &World<MarkerPayload> {
        &self.world
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn controller(&self) -> &GlobeController {
        &self.controller
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn globe(&self) -> Option<&GlobeHandles> {
        self.globe.as_ref()
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn drain_events(&mut self) -> Vec<runtime::Event> {
        self.events.drain()
    }

    pub fn begin_loading(&mut self) -> Result<(), ViewerError> {
        let phase = self.lifecycle.apply(Transition::BeginLoading)?;
        self.events.emit(self.frame_index, EventKind::Lifecycle, phase.as_str());
        Ok(())
    }

    /// Builds the globe and its markers once the texture is ready.
    pub fn finish_loading(&mut self) -> Result<(), ViewerError> {
        let phase = self.lifecycle.apply(Transition::FinishLoading)?;
        let handles = spawn_globe(&mut self.world, &self.config.globe_settings(), &self.catalog)?;
        info!(markers = handles.markers.len(), "globe ready");
        self.globe = Some(handles);
        self.controller.set_globe_ready(true);
        self.sync_scene();
        self.events.emit(self.frame_index, EventKind::Lifecycle, phase.as_str());
        Ok(())
    }

    /// Terminal. The globe never appears after this.
    pub fn fail(&mut self, err: &ViewerError) {
        match self.lifecycle.apply(Transition::Fail) {
            Ok(phase) => {
                self.events.emit(self.frame_index, EventKind::Error, err.to_string());
                self.events.emit(self.frame_index, EventKind::Lifecycle, phase.as_str());
            }
            Err(lifecycle_err) => warn!(%lifecycle_err, "failure reported outside loading"),
        }
    }

    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        if width <= 0.0 || height <= 0.0 {
            debug!(width, height, "ignoring degenerate viewport");
            return;
        }
        self.viewport = Vec2::new(width, height);
        self.camera.set_aspect(width, height);
        self.events
            .emit(self.frame_index, EventKind::Resize, format!("{width}x{height}"));
    }

    pub fn pointer_down(&mut self, pos_px: Vec2) -> PressOutcome {
        self.controller.on_pointer_down(pos_px)
    }

    pub fn pointer_move(&mut self, pos_px: Vec2) -> MoveOutcome {
        let outcome = self.controller.on_pointer_move(pos_px);
        if outcome == MoveOutcome::Rotated {
            self.sync_scene();
        }
        outcome
    }

    /// Ends a press. A click hit-tests the markers and selects or clears.
    pub fn pointer_up(&mut self, pos_px: Vec2) -> PopupChange {
        match self.controller.on_pointer_up(pos_px) {
            ReleaseOutcome::Click(at) => self.click(at),
            ReleaseOutcome::DragEnded | ReleaseOutcome::Ignored => PopupChange::Unchanged,
        }
    }

    pub fn wheel(&mut self, delta_y: f64) {
        self.controller.on_wheel(delta_y);
        self.sync_scene();
    }

    fn click(&mut self, at: Vec2) -> PopupChange {
        if !self.lifecycle.is_loaded() {
            return PopupChange::Unchanged;
        }
        let hit = pick_screen(&self.world, &self.camera, at, self.viewport.x, self.viewport.y);
        match hit {
            Some(hit) => self.select(hit.target),
            None => self.hide_popup(),
        }
    }

    fn select(&mut self, target: NodeId) -> PopupChange {
        let Some(payload) = self.world.payload(target).cloned() else {
            return self.hide_popup();
        };
        self.selection.select(target);
        let node = self.world.node(target).map_or("", |n| n.name.as_str());
        debug!(index = payload.index, node, title = %payload.entry.title, "marker selected");
        self.events
            .emit(self.frame_index, EventKind::Select, payload.entry.title.clone());
        PopupChange::Show {
            index: payload.index,
            entry: payload.entry,
        }
    }

    /// Clears the selection. Idempotent.
    pub fn hide_popup(&mut self) -> PopupChange {
        if self.selection.clear().is_some() {
            self.events.emit(self.frame_index, EventKind::Deselect, "");
        }
        PopupChange::Hide
    }

    /// Eases the globe so entry `index` faces the camera, then selects it.
    pub fn focus_entry(&mut self, index: usize) -> Result<PopupChange, ViewerError> {
        let phase = self.lifecycle.phase();
        let globe = self.globe.as_ref().ok_or(ViewerError::NotLoaded(phase))?;
        let target = *globe.markers.get(index).ok_or(ViewerError::UnknownEntry {
            index,
            len: self.catalog.len(),
        })?;

        let local = self
            .world
            .node(target)
            .map(|n| n.transform.position)
            .ok_or(ViewerError::Scene(scene::SceneError::UnknownNode(target)))?;
        let to = self.controller.focus_on(local);
        let (lat, lng) = vector3_to_lat_lng(local);
        debug!(index, lat, lng, yaw = to.yaw_rad, pitch = to.pitch_rad, "focus started");
        self.events
            .emit(self.frame_index, EventKind::FocusStart, format!("entry {index}"));

        Ok(self.select(target))
    }

    pub fn selected(&self) -> Option<&MarkerPayload> {
        self.selection.target().and_then(|t| self.world.payload(t))
    }

    /// One animation frame: advance time and transitions, push controller
    /// state into the scene, and place the popup if something is selected.
    pub fn frame(&mut self, timestamp_ms: f64) -> Option<PopupPlacement> {
        let frame: Frame = self.clock.tick(timestamp_ms);
        self.frame_index = frame.index;

        if self.controller.update(frame.dt_s) {
            self.events.emit_in(frame, EventKind::FocusEnd, "");
        }
        self.sync_scene();
        self.popup_placement()
    }

    /// Current popup position for the selected marker.
    pub fn popup_placement(&self) -> Option<PopupPlacement> {
        let target = self.selection.target()?;
        let world_pos = self.world.world_position(target)?;
        Some(place_popup(
            &self.camera,
            world_pos,
            self.viewport.x,
            self.viewport.y,
            self.config.popup_margin_px,
        ))
    }

    fn sync_scene(&mut self) {
        self.camera.set_distance(self.controller.distance());
        if let Some(globe) = &self.globe {
            if let Some(t) = self.world.transform_mut(globe.globe) {
                t.rotation = self.controller.orientation().as_euler();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PopupChange, Viewer, catalog_from_json};
    use crate::config::ViewerConfig;
    use crate::error::ViewerError;
    use catalog::{Catalog, CatalogError};
    use foundation::math::{Vec2, Vec3};
    use runtime::{EventKind, Phase};
    use scene::camera::ndc_to_pixel;

    const W: f64 = 1000.0;
    const H: f64 = 800.0;

    fn loaded() -> Viewer {
        let mut v = Viewer::new(ViewerConfig::default(), Catalog::builtin()).expect("viewer");
        v.set_viewport_size(W, H);
        v.begin_loading().expect("loading");
        v.finish_loading().expect("loaded");
        v
    }

    fn marker_px(v: &Viewer, index: usize) -> Vec2 {
        let marker = v.globe().expect("globe").markers[index];
        let world = v.world().world_position(marker).expect("position");
        let ndc = v.camera().project(world);
        ndc_to_pixel(Vec2::new(ndc.x, ndc.y), W, H)
    }

    fn click(v: &mut Viewer, at: Vec2) -> PopupChange {
        v.pointer_down(at);
        v.pointer_up(at)
    }

    #[test]
    fn click_on_a_marker_shows_its_entry() {
        let mut v = loaded();
        let at = marker_px(&v, 3);
        let change = click(&mut v, at);
        let PopupChange::Show { index, entry } = change else {
            panic!("expected popup, got {change:?}");
        };
        assert_eq!(index, 3);
        assert_eq!(entry.title, "Red de Museos Comunitarios de Oaxaca");
        assert_eq!(v.selected().map(|p| p.index), Some(3));
    }

    #[test]
    fn drag_over_a_marker_does_not_select() {
        let mut v = loaded();
        let first = marker_px(&v, 3);
        assert!(matches!(click(&mut v, first), PopupChange::Show { index: 3, .. }));

        let other = marker_px(&v, 4);
        v.pointer_down(other);
        v.pointer_move(other + Vec2::new(1.0, 0.0));
        assert_eq!(v.pointer_up(other + Vec2::new(1.0, 0.0)), PopupChange::Unchanged);
        assert_eq!(v.selected().map(|p| p.index), Some(3));
        assert!(v.popup_placement().is_some());
    }

    #[test]
    fn click_on_empty_space_hides_the_popup() {
        let mut v = loaded();
        let at = marker_px(&v, 3);
        click(&mut v, at);
        assert_eq!(click(&mut v, Vec2::new(5.0, 5.0)), PopupChange::Hide);
        assert!(v.selected().is_none());
        assert!(v.popup_placement().is_none());
    }

    #[test]
    fn clicks_before_loading_do_nothing() {
        let mut v = Viewer::new(ViewerConfig::default(), Catalog::builtin()).expect("viewer");
        v.set_viewport_size(W, H);
        assert_eq!(click(&mut v, Vec2::new(500.0, 400.0)), PopupChange::Unchanged);
        assert!(v.globe().is_none());
    }

    #[test]
    fn popup_follows_the_marker_and_stays_inside() {
        let mut v = loaded();
        let at = marker_px(&v, 3);
        click(&mut v, at);

        let first = v.frame(0.0).expect("placement");
        assert!((first.left_px - at.x).abs() < 1e-6);
        assert!((first.top_px - at.y).abs() < 1e-6);

        // Spin the globe so the marker goes round the back.
        for step in 0..40 {
            let x = 500.0 + step as f64 * 20.0;
            v.pointer_down(Vec2::new(x, 400.0));
            v.pointer_move(Vec2::new(x + 20.0, 420.0));
            v.pointer_up(Vec2::new(x + 20.0, 420.0));
            let p = v.frame(16.0 * (step + 1) as f64).expect("placement");
            assert!(p.left_px >= 16.0 && p.left_px <= W - 16.0);
            assert!(p.top_px >= 16.0 && p.top_px <= H - 16.0);
        }
        assert_eq!(v.selected().map(|p| p.index), Some(3));
    }

    #[test]
    fn focus_faces_the_entry_and_selects_it() {
        let mut v = loaded();
        let change = v.focus_entry(1).expect("focus");
        assert!(matches!(change, PopupChange::Show { index: 1, .. }));
        assert!(v.controller().is_transitioning());

        let mut t = 0.0;
        while v.controller().is_transitioning() {
            t += 16.0;
            v.frame(t);
        }
        let marker = v.globe().expect("globe").markers[1];
        let p = v.world().world_position(marker).expect("position");
        assert!((p - Vec3::new(0.0, 0.0, 5.1)).length() < 1e-9, "{p:?}");

        let placement = v.popup_placement().expect("placement");
        assert!((placement.left_px - W / 2.0).abs() < 1e-6);

        let kinds: Vec<_> = v.drain_events().into_iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&EventKind::FocusStart));
        assert!(kinds.contains(&EventKind::FocusEnd));
    }

    #[test]
    fn focus_rejects_unknown_entries() {
        let mut v = loaded();
        assert_eq!(v.focus_entry(5), Err(ViewerError::UnknownEntry { index: 5, len: 5 }));
        assert!(!v.controller().is_transitioning());
        assert!(v.selected().is_none());
    }

    #[test]
    fn resizes_while_loading_are_kept() {
        let mut v = Viewer::new(ViewerConfig::default(), Catalog::builtin()).expect("viewer");
        v.set_viewport_size(400.0, 300.0);
        v.begin_loading().expect("loading");
        v.set_viewport_size(W, H);
        v.wheel(100.0);
        v.finish_loading().expect("loaded");

        assert_eq!(v.viewport(), Vec2::new(W, H));
        assert!((v.camera().distance() - 12.6).abs() < 1e-12);
        let at = marker_px(&v, 3);
        assert!(matches!(click(&mut v, at), PopupChange::Show { index: 3, .. }));
        let placement = v.frame(0.0).expect("placement");
        assert!((placement.left_px - at.x).abs() < 1e-6);
    }

    #[test]
    fn focus_before_loading_reports_the_phase() {
        let mut v = Viewer::new(ViewerConfig::default(), Catalog::builtin()).expect("viewer");
        v.begin_loading().expect("loading");
        assert_eq!(v.focus_entry(0), Err(ViewerError::NotLoaded(Phase::Loading)));
        assert!(v.selected().is_none());
    }

    #[test]
    fn host_catalog_replaces_the_builtin_museums() {
        let json = r#"[
            {"country": "Perú", "title": "Museo Larco", "description": "Lima",
             "lat": -12.07, "lng": -77.07},
            {"country": "Chile", "title": "Museo Chileno de Arte Precolombino",
             "description": "Santiago", "lat": -33.44, "lng": -70.65}
        ]"#;
        let catalog = catalog_from_json(Some(json)).expect("catalog");
        let mut v = Viewer::new(ViewerConfig::default(), catalog).expect("viewer");
        v.set_viewport_size(W, H);
        v.begin_loading().expect("loading");
        v.finish_loading().expect("loaded");

        assert_eq!(v.globe().expect("globe").markers.len(), 2);
        let change = v.focus_entry(1).expect("focus");
        let PopupChange::Show { entry, .. } = change else {
            panic!("expected popup, got {change:?}");
        };
        assert_eq!(entry.title, "Museo Chileno de Arte Precolombino");
        assert_eq!(v.focus_entry(2), Err(ViewerError::UnknownEntry { index: 2, len: 2 }));
    }

    #[test]
    fn host_catalog_is_validated() {
        assert_eq!(catalog_from_json(None).expect("builtin").len(), 5);
        assert_eq!(catalog_from_json(Some("  ")).expect("builtin").len(), 5);
        assert_eq!(
            catalog_from_json(Some("[]")),
            Err(ViewerError::Catalog(CatalogError::Empty))
        );
        let out_of_range =
            r#"[{"country": "X", "title": "Y", "description": "", "lat": 95.0, "lng": 0.0}]"#;
        assert_eq!(
            catalog_from_json(Some(out_of_range)),
            Err(ViewerError::Catalog(CatalogError::OutOfRange {
                index: 0,
                field: "lat",
                value: 95.0,
            }))
        );
    }

    #[test]
    fn failure_is_terminal() {
        let mut v = Viewer::new(ViewerConfig::default(), Catalog::builtin()).expect("viewer");
        v.begin_loading().expect("loading");
        v.fail(&ViewerError::TextureFetch("404".into()));
        assert_eq!(v.lifecycle().phase(), Phase::Failed);
        assert!(v.finish_loading().is_err());
        assert!(!v.lifecycle().is_loaded());
    }

    #[test]
    fn wheel_moves_the_camera() {
        let mut v = loaded();
        v.wheel(100.0);
        assert!((v.camera().distance() - 12.6).abs() < 1e-12);
    }
}
