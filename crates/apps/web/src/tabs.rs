//! Tab strip: `.tab-btn[data-target]` buttons switching `.tab-panel`s.

use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{Document, Element, HtmlElement};

use crate::error::{ViewerError, dom_error};

fn class_selector(class: &str) -> String {
    format!(".{class}")
}

fn elements_by_class(document: &Document, class: &str) -> Result<Vec<Element>, ViewerError> {
    let list = document
        .query_selector_all(&class_selector(class))
        .map_err(dom_error)?;
    Ok((0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect())
}

fn set_display(el: &Element, value: &str) -> Result<(), ViewerError> {
    if let Some(html) = el.dyn_ref::<HtmlElement>() {
        html.style().set_property("display", value).map_err(dom_error)?;
    }
    Ok(())
}

fn activate(
    document: &Document,
    clicked: &Element,
    button_class: &str,
    panel_class: &str,
) -> Result<(), ViewerError> {
    for button in elements_by_class(document, button_class)? {
        button.class_list().remove_1("active").map_err(dom_error)?;
        button.set_attribute("aria-selected", "false").map_err(dom_error)?;
    }
    for panel in elements_by_class(document, panel_class)? {
        set_display(&panel, "none")?;
    }

    clicked.class_list().add_1("active").map_err(dom_error)?;
    clicked.set_attribute("aria-selected", "true").map_err(dom_error)?;

    let target = clicked.get_attribute("data-target");
    match target.as_deref().and_then(|id| document.get_element_by_id(id)) {
        Some(panel) => set_display(&panel, "block")?,
        None => tracing::debug!(target = ?target, "tab target panel not found"),
    }
    Ok(())
}

/// Wires a click handler on every tab button. Returns how many were found;
/// zero is not an error.
pub fn install_tabs(
    document: &Document,
    button_class: &str,
    panel_class: &str,
) -> Result<usize, ViewerError> {
    let buttons = elements_by_class(document, button_class)?;
    for button in &buttons {
        let doc = document.clone();
        let clicked = button.clone();
        let button_class = button_class.to_string();
        let panel_class = panel_class.to_string();
        let on_click = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
            event.prevent_default();
            if let Err(err) = activate(&doc, &clicked, &button_class, &panel_class) {
                tracing::warn!(%err, "tab switch failed");
            }
        });
        button
            .add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())
            .map_err(dom_error)?;
        on_click.forget();
    }
    tracing::debug!(count = buttons.len(), "tab buttons wired");
    Ok(buttons.len())
}

#[cfg(test)]
mod tests {
    use super::class_selector;

    #[test]
    fn class_names_become_selectors() {
        assert_eq!(class_selector("tab-btn"), ".tab-btn");
    }
}
