//! The marker detail panel.
//!
//! Missing containers are logged and skipped; the globe keeps working
//! without a popup.

use catalog::{MuseumEntry, escape_html};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{Document, HtmlElement};

use crate::error::{ViewerError, dom_error};
use crate::overlay::PopupPlacement;

const GUARD_ATTR: &str = "data-pointer-guard";

/// Text that goes into the panel. Only `country_html` is set as markup, and
/// it is escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupContent {
    pub title: String,
    pub country_html: String,
    pub description: String,
}

impl PopupContent {
    pub fn from_entry(entry: &MuseumEntry) -> Self {
        Self {
            title: entry.title.clone(),
            country_html: escape_html(&entry.country),
            description: entry.description.clone(),
        }
    }
}

fn container(document: &Document, id: &str) -> Option<HtmlElement> {
    let found = document
        .get_element_by_id(id)
        .and_then(|el| el.dyn_into::<HtmlElement>().ok());
    if found.is_none() {
        tracing::debug!(id, "popup container not found");
    }
    found
}

/// Stops pointer presses inside the panel from reaching the canvas.
/// Installed at most once per element.
pub fn install_pointer_guard(document: &Document, id: &str) -> Result<(), ViewerError> {
    let Some(panel) = container(document, id) else {
        return Ok(());
    };
    if panel.has_attribute(GUARD_ATTR) {
        return Ok(());
    }
    let stop = Closure::<dyn FnMut(web_sys::Event)>::new(|event: web_sys::Event| {
        event.stop_propagation();
    });
    panel
        .add_event_listener_with_callback("pointerdown", stop.as_ref().unchecked_ref())
        .map_err(dom_error)?;
    stop.forget();
    panel.set_attribute(GUARD_ATTR, "1").map_err(dom_error)?;
    Ok(())
}

/// Rebuilds the panel for `entry` and makes it visible. `on_close` is bound
/// to the close button.
pub fn show(
    document: &Document,
    id: &str,
    entry: &MuseumEntry,
    on_close: &js_sys::Function,
) -> Result<(), ViewerError> {
    let Some(panel) = container(document, id) else {
        return Ok(());
    };
    let content = PopupContent::from_entry(entry);
    panel.set_inner_html("");

    let close = document.create_element("button").map_err(dom_error)?;
    close.set_id("closePopup");
    close.set_attribute("type", "button").map_err(dom_error)?;
    close.set_attribute("aria-label", "Close").map_err(dom_error)?;
    close.set_text_content(Some("\u{00d7}"));
    close
        .add_event_listener_with_callback("click", on_close)
        .map_err(dom_error)?;
    panel.append_child(&close).map_err(dom_error)?;

    let title = document.create_element("h3").map_err(dom_error)?;
    title.set_text_content(Some(&content.title));
    panel.append_child(&title).map_err(dom_error)?;

    let country = document.create_element("p").map_err(dom_error)?;
    country.set_class_name("pais");
    country.set_inner_html(&content.country_html);
    panel.append_child(&country).map_err(dom_error)?;

    let description = document.create_element("p").map_err(dom_error)?;
    description.set_text_content(Some(&content.description));
    panel.append_child(&description).map_err(dom_error)?;

    panel.style().set_property("display", "block").map_err(dom_error)
}

pub fn hide(document: &Document, id: &str) -> Result<(), ViewerError> {
    match container(document, id) {
        Some(panel) => panel.style().set_property("display", "none").map_err(dom_error),
        None => Ok(()),
    }
}

pub fn position(document: &Document, id: &str, at: PopupPlacement) -> Result<(), ViewerError> {
    let Some(panel) = container(document, id) else {
        return Ok(());
    };
    let style = panel.style();
    style.set_property("left", &at.left_style()).map_err(dom_error)?;
    style.set_property("top", &at.top_style()).map_err(dom_error)
}

#[cfg(test)]
mod tests {
    use super::PopupContent;
    use catalog::MuseumEntry;

    #[test]
    fn only_the_country_is_markup_and_it_is_escaped() {
        let entry = MuseumEntry {
            country: "<b>México</b>".to_string(),
            title: "Museo <i>Nacional</i>".to_string(),
            description: "Piezas & <script>".to_string(),
            lat: 19.4,
            lng: -99.1,
        };
        let content = PopupContent::from_entry(&entry);
        assert_eq!(content.country_html, "&lt;b&gt;México&lt;/b&gt;");
        // Title and description are set as text nodes, so they stay raw.
        assert_eq!(content.title, "Museo <i>Nacional</i>");
        assert_eq!(content.description, "Piezas & <script>");
    }
}
