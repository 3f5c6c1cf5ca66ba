use wasm_bindgen::JsValue;

use runtime::{LifecycleError, Phase};

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerError {
    /// A required DOM node (window, document, body, element id) is absent.
    MissingElement(String),
    /// A DOM call threw.
    Dom(String),
    Gpu(String),
    TextureFetch(String),
    TextureDecode(String),
    Config(String),
    UnknownEntry { index: usize, len: usize },
    /// The operation needs the globe, which is not built yet (or failed).
    NotLoaded(Phase),
    Lifecycle(LifecycleError),
    Scene(scene::SceneError),
    Catalog(catalog::CatalogError),
}

impl std::fmt::Display for ViewerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewerError::MissingElement(what) => write!(f, "missing element: {what}"),
            ViewerError::Dom(msg) => write!(f, "dom error: {msg}"),
            ViewerError::Gpu(msg) => write!(f, "gpu error: {msg}"),
            ViewerError::TextureFetch(msg) => write!(f, "texture fetch failed: {msg}"),
            ViewerError::TextureDecode(msg) => write!(f, "texture decode failed: {msg}"),
            ViewerError::Config(msg) => write!(f, "config error: {msg}"),
            ViewerError::UnknownEntry { index, len } => {
                write!(f, "unknown entry {index} (catalog has {len})")
            }
            ViewerError::NotLoaded(phase) => {
                write!(f, "globe not loaded (phase {})", phase.as_str())
            }
            ViewerError::Lifecycle(err) => write!(f, "lifecycle error: {err}"),
            ViewerError::Scene(err) => write!(f, "scene error: {err}"),
            ViewerError::Catalog(err) => write!(f, "catalog error: {err}"),
        }
    }
}

impl std::error::Error for ViewerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ViewerError::Lifecycle(err) => Some(err),
            ViewerError::Scene(err) => Some(err),
            ViewerError::Catalog(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LifecycleError> for ViewerError {
    fn from(err: LifecycleError) -> Self {
        ViewerError::Lifecycle(err)
    }
}

impl From<scene::SceneError> for ViewerError {
    fn from(err: scene::SceneError) -> Self {
        ViewerError::Scene(err)
    }
}

impl From<catalog::CatalogError> for ViewerError {
    fn from(err: catalog::CatalogError) -> Self {
        ViewerError::Catalog(err)
    }
}

impl From<ViewerError> for JsValue {
    fn from(err: ViewerError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

/// Stringifies a thrown JS value for a [`ViewerError::Dom`].
pub(crate) fn dom_error(err: JsValue) -> ViewerError {
    ViewerError::Dom(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}
