//! Browser entry points for the museum globe.
//!
//! The host page owns the pointer/wheel/resize listeners and the animation
//! frame loop and forwards them to the exports below. All mutable state lives
//! in one thread-local `ViewerState`.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};

use catalog::Catalog;
use foundation::math::Vec2;
use runtime::Phase;
use tracing::{debug, error, info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlCanvasElement};

pub mod config;
pub mod console;
pub mod draw;
pub mod error;
pub mod globe_controller;
pub mod overlay;
pub mod popup;
pub mod tabs;
pub mod texture;
pub mod viewer;
pub mod wgpu;

use config::ViewerConfig;
use error::{ViewerError, dom_error};
use globe_controller::PressOutcome;
use viewer::{PopupChange, Viewer, catalog_from_json};
use wgpu::{WgpuContext, init_wgpu_from_canvas, render_frame, resize_wgpu, set_globe_texture};

// Guard against double initialization (hot reload).
static INITIALIZED: AtomicBool = AtomicBool::new(false);

#[derive(Default)]
struct ViewerState {
    viewer: Option<Viewer>,
    gpu: Option<WgpuContext>,
    document: Option<Document>,
    canvas: Option<HtmlCanvasElement>,
    /// Bound to the popup close button on every show.
    on_close: Option<js_sys::Function>,
    pixel_ratio: f64,
}

thread_local! {
    static STATE: RefCell<ViewerState> = RefCell::new(ViewerState::default());
}

/// TLS access that yields a default during teardown instead of panicking.
fn with_state<F, R>(f: F) -> R
where
    F: FnOnce(&RefCell<ViewerState>) -> R,
    R: Default,
{
    STATE.try_with(f).unwrap_or_default()
}

/// Device pixel ratio capped at `max`. Bogus inputs fall back to 1.
fn effective_pixel_ratio(device: f64, max: f64) -> f64 {
    let ratio = if device.is_finite() && device > 0.0 { device } else { 1.0 };
    if max.is_finite() && max > 0.0 { ratio.min(max) } else { ratio }
}

/// Backing-store size for a CSS length, never zero.
fn backing_px(css: f64, ratio: f64) -> u32 {
    let px = (css * ratio).round();
    if px.is_finite() && px >= 1.0 { px as u32 } else { 1 }
}

fn window() -> Result<web_sys::Window, ViewerError> {
    web_sys::window().ok_or_else(|| ViewerError::MissingElement("window".to_string()))
}

fn window_size(window: &web_sys::Window) -> Result<(f64, f64), ViewerError> {
    let w = window.inner_width().map_err(dom_error)?.as_f64().unwrap_or(1.0);
    let h = window.inner_height().map_err(dom_error)?.as_f64().unwrap_or(1.0);
    Ok((w, h))
}

/// Finds the canvas by id, or creates it and appends it to `<body>`.
fn canvas_element(document: &Document, id: &str) -> Result<HtmlCanvasElement, ViewerError> {
    if let Some(el) = document.get_element_by_id(id) {
        return el
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| ViewerError::MissingElement(format!("#{id} is not a canvas")));
    }
    let body = document
        .body()
        .ok_or_else(|| ViewerError::MissingElement("body".to_string()))?;
    let canvas = document
        .create_element("canvas")
        .map_err(dom_error)?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| ViewerError::Dom("created element is not a canvas".to_string()))?;
    canvas.set_id(id);
    body.append_child(&canvas).map_err(dom_error)?;
    debug!(id, "canvas created");
    Ok(canvas)
}

fn size_canvas(
    canvas: &HtmlCanvasElement,
    width_css: f64,
    height_css: f64,
    ratio: f64,
) -> Result<(u32, u32), ViewerError> {
    let (w, h) = (backing_px(width_css, ratio), backing_px(height_css, ratio));
    canvas.set_width(w);
    canvas.set_height(h);
    let style = canvas.style();
    style
        .set_property("width", &format!("{width_css}px"))
        .map_err(dom_error)?;
    style
        .set_property("height", &format!("{height_css}px"))
        .map_err(dom_error)?;
    style.set_property("display", "block").map_err(dom_error)?;
    style.set_property("touch-action", "none").map_err(dom_error)?;
    Ok((w, h))
}

fn close_handler() -> js_sys::Function {
    let closure = Closure::<dyn FnMut(web_sys::Event)>::new(|event: web_sys::Event| {
        event.stop_propagation();
        if let Err(err) = hide_popup_inner() {
            warn!(%err, "popup close failed");
        }
    });
    closure.into_js_value().unchecked_into()
}

/// Pushes a selection change to the DOM and places the popup right away.
fn apply_popup_change(change: PopupChange) -> Result<(), ViewerError> {
    if change == PopupChange::Unchanged {
        return Ok(());
    }
    let Some((document, popup_id, on_close, placement)) = with_state(|state| {
        let s = state.borrow();
        let viewer = s.viewer.as_ref()?;
        Some((
            s.document.clone()?,
            viewer.config().popup_id.clone(),
            s.on_close.clone()?,
            viewer.popup_placement(),
        ))
    }) else {
        return Ok(());
    };

    match change {
        PopupChange::Show { entry, .. } => {
            popup::show(&document, &popup_id, &entry, &on_close)?;
            if let Some(at) = placement {
                popup::position(&document, &popup_id, at)?;
            }
        }
        PopupChange::Hide => popup::hide(&document, &popup_id)?,
        PopupChange::Unchanged => {}
    }
    Ok(())
}

fn hide_popup_inner() -> Result<(), ViewerError> {
    let change = with_state(|state| {
        let mut s = state.borrow_mut();
        s.viewer.as_mut().map(Viewer::hide_popup)
    });
    match change {
        Some(change) => apply_popup_change(change),
        None => Ok(()),
    }
}

async fn load_globe(
    canvas: HtmlCanvasElement,
    texture_url: &str,
) -> Result<WgpuContext, ViewerError> {
    let mut gpu = init_wgpu_from_canvas(canvas).await?;
    let texture = texture::fetch_texture(texture_url).await?;
    set_globe_texture(&mut gpu, &texture);
    Ok(gpu)
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }
    console_error_panic_hook::set_once();
    Ok(())
}

/// Sets up the canvas, tabs and popup, then loads the GPU and the globe
/// texture. `catalog_json` replaces the built-in museums when given.
/// Resolves once the globe is drawable; [`frame`] is a no-op until then.
/// A load failure is terminal.
#[wasm_bindgen]
pub async fn init_globe(
    canvas_id: String,
    config_json: Option<String>,
    catalog_json: Option<String>,
) -> Result<(), JsValue> {
    let config = ViewerConfig::from_json(config_json.as_deref())?;
    console::init_logging(&config.log_filter)?;

    if with_state(|state| state.borrow().viewer.is_some()) {
        warn!("globe already initialized");
        return Ok(());
    }

    let window = window()?;
    let document = window
        .document()
        .ok_or_else(|| ViewerError::MissingElement("document".to_string()))?;
    let canvas = canvas_element(&document, &canvas_id)?;

    let ratio = effective_pixel_ratio(window.device_pixel_ratio(), config.max_pixel_ratio);
    let (width_css, height_css) = window_size(&window)?;
    size_canvas(&canvas, width_css, height_css, ratio)?;

    let catalog = catalog_from_json(catalog_json.as_deref())?;
    let mut viewer = Viewer::new(config.clone(), catalog)?;
    viewer.set_viewport_size(width_css, height_css);

    // Sidebar widgets degrade silently.
    match tabs::install_tabs(&document, &config.tab_button_class, &config.tab_panel_class) {
        Ok(0) => debug!("no tab buttons on page"),
        Ok(_) => {}
        Err(err) => warn!(%err, "tabs not wired"),
    }
    if let Err(err) = popup::install_pointer_guard(&document, &config.popup_id) {
        warn!(%err, "popup pointer guard not installed");
    }

    viewer.begin_loading()?;
    with_state(|state| {
        let mut s = state.borrow_mut();
        s.viewer = Some(viewer);
        s.document = Some(document);
        s.canvas = Some(canvas.clone());
        s.on_close = Some(close_handler());
        s.pixel_ratio = ratio;
    });
    info!(canvas = %canvas_id, ratio, "globe loading");

    match load_globe(canvas, &config.texture_url).await {
        Ok(gpu) => {
            let finished = with_state(|state| {
                let mut s = state.borrow_mut();
                s.gpu = Some(gpu);
                s.viewer.as_mut().map(Viewer::finish_loading)
            });
            finished.unwrap_or(Ok(()))?;
            Ok(())
        }
        Err(err) => {
            error!(%err, "globe failed to load");
            with_state(|state| {
                if let Some(viewer) = state.borrow_mut().viewer.as_mut() {
                    viewer.fail(&err);
                }
            });
            Err(err.into())
        }
    }
}

/// One animation frame: advance transitions, move the popup, then draw.
/// Returns false until the globe has loaded.
#[wasm_bindgen]
pub fn frame(timestamp_ms: f64) -> bool {
    let step = with_state(|state| {
        let mut s = state.borrow_mut();
        let document = s.document.clone();
        let viewer = s.viewer.as_mut()?;
        if !viewer.lifecycle().is_loaded() {
            return None;
        }
        let placement = viewer.frame(timestamp_ms);
        Some((document, viewer.config().popup_id.clone(), placement))
    });
    let Some((document, popup_id, placement)) = step else {
        return false;
    };

    if let (Some(document), Some(at)) = (document, placement) {
        if let Err(err) = popup::position(&document, &popup_id, at) {
            debug!(%err, "popup position not applied");
        }
    }

    with_state(|state| {
        let mut s = state.borrow_mut();
        let s = &mut *s;
        let (Some(gpu), Some(viewer)) = (s.gpu.as_mut(), s.viewer.as_ref()) else {
            return;
        };
        let list = draw::build_draw_list(viewer.world(), viewer.camera());
        if let Err(err) = render_frame(gpu, &list, viewer.world()) {
            warn!(%err, "frame skipped");
        }
    });
    true
}

/// Pointer press at canvas-local CSS pixels. Captures the pointer so the
/// drag keeps tracking outside the canvas.
#[wasm_bindgen]
pub fn pointer_down(x_px: f64, y_px: f64, pointer_id: i32) {
    let canvas = with_state(|state| {
        let mut s = state.borrow_mut();
        let outcome = s.viewer.as_mut()?.pointer_down(Vec2::new(x_px, y_px));
        match outcome {
            PressOutcome::Started => s.canvas.clone(),
            PressOutcome::Ignored => None,
        }
    });
    if let Some(canvas) = canvas {
        if let Err(err) = canvas.set_pointer_capture(pointer_id) {
            debug!(?err, pointer_id, "pointer capture unavailable");
        }
    }
}

#[wasm_bindgen]
pub fn pointer_move(x_px: f64, y_px: f64) {
    with_state(|state| {
        if let Some(viewer) = state.borrow_mut().viewer.as_mut() {
            viewer.pointer_move(Vec2::new(x_px, y_px));
        }
    });
}

/// Pointer release. A release without movement is a click and hit-tests the
/// markers.
#[wasm_bindgen]
pub fn pointer_up(x_px: f64, y_px: f64, pointer_id: i32) -> Result<(), JsValue> {
    let (change, canvas) = with_state(|state| {
        let mut s = state.borrow_mut();
        let change = s.viewer.as_mut().map(|v| v.pointer_up(Vec2::new(x_px, y_px)));
        (change, s.canvas.clone())
    });
    if let Some(canvas) = canvas {
        if canvas.has_pointer_capture(pointer_id) {
            if let Err(err) = canvas.release_pointer_capture(pointer_id) {
                debug!(?err, pointer_id, "pointer release failed");
            }
        }
    }
    if let Some(change) = change {
        apply_popup_change(change)?;
    }
    Ok(())
}

/// Zooms one step; only the sign of `delta_y` matters.
#[wasm_bindgen]
pub fn wheel(delta_y: f64) {
    with_state(|state| {
        if let Some(viewer) = state.borrow_mut().viewer.as_mut() {
            viewer.wheel(delta_y);
        }
    });
}

/// Resizes the canvas to `width_css` x `height_css` and updates the camera
/// aspect.
#[wasm_bindgen]
pub fn set_canvas_size(width_css: f64, height_css: f64) -> Result<(), JsValue> {
    let Some((canvas, ratio)) = with_state(|state| {
        let s = state.borrow();
        Some((s.canvas.clone()?, s.pixel_ratio))
    }) else {
        return Ok(());
    };
    let (w, h) = size_canvas(&canvas, width_css, height_css, ratio)?;
    with_state(|state| {
        let mut s = state.borrow_mut();
        if let Some(viewer) = s.viewer.as_mut() {
            viewer.set_viewport_size(width_css, height_css);
        }
        if let Some(gpu) = s.gpu.as_mut() {
            resize_wgpu(gpu, w, h);
        }
    });
    Ok(())
}

/// Turns the globe so entry `index` faces the camera and opens its popup.
#[wasm_bindgen]
pub fn focus_entry(index: usize) -> Result<(), JsValue> {
    let change = with_state(|state| {
        let mut s = state.borrow_mut();
        s.viewer.as_mut().map(|v| v.focus_entry(index))
    })
    .unwrap_or(Err(ViewerError::NotLoaded(Phase::Unloaded)))?;
    apply_popup_change(change)?;
    Ok(())
}

#[wasm_bindgen]
pub fn hide_popup() -> Result<(), JsValue> {
    hide_popup_inner().map_err(JsValue::from)
}

/// Catalog entry index of the open popup.
#[wasm_bindgen]
pub fn selected_entry() -> Option<usize> {
    with_state(|state| {
        let s = state.borrow();
        s.viewer.as_ref()?.selected().map(|p| p.index)
    })
}

/// `"unloaded"`, `"loading"`, `"loaded"` or `"failed"`.
#[wasm_bindgen]
pub fn globe_phase() -> String {
    with_state(|state| {
        let s = state.borrow();
        s.viewer
            .as_ref()
            .map(|v| v.lifecycle().phase().as_str().to_string())
    })
    .unwrap_or_else(|| "unloaded".to_string())
}

/// The catalog as a JSON array, in marker order.
#[wasm_bindgen]
pub fn entries_json() -> Result<String, JsValue> {
    let catalog = with_state(|state| state.borrow().viewer.as_ref().map(|v| v.catalog().clone()))
        .unwrap_or_else(Catalog::builtin);
    Ok(catalog.to_json().map_err(ViewerError::from)?)
}

/// Events since the last call, as a JSON array.
#[wasm_bindgen]
pub fn drain_events_json() -> Result<String, JsValue> {
    let events = with_state(|state| {
        state
            .borrow_mut()
            .viewer
            .as_mut()
            .map(Viewer::drain_events)
            .unwrap_or_default()
    });
    serde_json::to_string(&events).map_err(|e| JsValue::from_str(&e.to_string()))
}
