use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// One museum placed on the globe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuseumEntry {
    /// Country or region label shown under the title.
    pub country: String,
    pub title: String,
    /// Free text, always rendered as plain text.
    pub description: String,
    /// Degrees, north positive.
    pub lat: f64,
    /// Degrees, east positive.
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogError {
    Empty,
    Malformed(String),
    OutOfRange { index: usize, field: &'static str, value: f64 },
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Empty => write!(f, "catalog has no entries"),
            CatalogError::Malformed(msg) => write!(f, "catalog json malformed: {msg}"),
            CatalogError::OutOfRange { index, field, value } => {
                write!(f, "entry {index}: {field} {value} out of range")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

/// Immutable, ordered list of entries. Cheap to clone; entries are shared.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    entries: Vec<Arc<MuseumEntry>>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog {
    /// The five museums the viewer ships with, in display order.
    pub fn builtin() -> Self {
        let entries = [
            (
                "Bélgica",
                "Museo Real de África Central (Tervuren)",
                "Reabierto en 2018 para ofrecer una mirada crítica a su pasado colonial, contrastando la propaganda original con obras de artistas congoleños contemporáneos.",
                50.84,
                4.47,
            ),
            (
                "Nueva Zelanda",
                "Te Papa Tongarewa",
                "Fundado en un principio bicultural (Maorí y Pākehā). La curaduría y repatriación de tesoros (taonga) se gestiona en asociación con las tribus (iwi) Maorí.",
                -41.29,
                174.78,
            ),
            (
                "Alemania / Nigeria",
                "Foro Humboldt (Berlín) y otros",
                "Líder en la restitución física de los 'Bronces de Benín' a Nigeria, artefactos saqueados en 1897, reconociendo el robo colonial.",
                6.33,
                5.62,
            ),
            (
                "México",
                "Red de Museos Comunitarios de Oaxaca",
                "Un modelo de descolonización 'desde abajo', donde las propias comunidades indígenas gestionan sus museos y controlan su propia narrativa histórica.",
                17.07,
                -96.72,
            ),
            (
                "EE.UU. / Perú",
                "Museo Nacional del Indígena Americano",
                "Ejemplo de repatriación activa, incluyendo la devolución a Perú de objetos simbólicos como el 'Sol de Echenique' y miles de otros artefactos.",
                -12.04,
                -77.04,
            ),
        ];

        Self {
            entries: entries
                .into_iter()
                .map(|(country, title, description, lat, lng)| {
                    Arc::new(MuseumEntry {
                        country: country.to_string(),
                        title: title.to_string(),
                        description: description.to_string(),
                        lat,
                        lng,
                    })
                })
                .collect(),
        }
    }

    /// Builds a catalog from entries, rejecting an empty list and
    /// coordinates outside `[-90, 90]` x `[-180, 180]`.
    pub fn from_entries(entries: Vec<MuseumEntry>) -> Result<Self, CatalogError> {
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }
        for (index, e) in entries.iter().enumerate() {
            if !(-90.0..=90.0).contains(&e.lat) {
                return Err(CatalogError::OutOfRange { index, field: "lat", value: e.lat });
            }
            if !(-180.0..=180.0).contains(&e.lng) {
                return Err(CatalogError::OutOfRange { index, field: "lng", value: e.lng });
            }
        }
        Ok(Self {
            entries: entries.into_iter().map(Arc::new).collect(),
        })
    }

    /// Parses a JSON array of entries embedded by the host page.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let entries: Vec<MuseumEntry> =
            serde_json::from_str(json).map_err(|e| CatalogError::Malformed(e.to_string()))?;
        Self::from_entries(entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<MuseumEntry>> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Arc<MuseumEntry>)> + '_ {
        self.entries.iter().enumerate()
    }

    pub fn to_json(&self) -> Result<String, CatalogError> {
        let plain: Vec<&MuseumEntry> = self.entries.iter().map(|e| e.as_ref()).collect();
        serde_json::to_string(&plain).map_err(|e| CatalogError::Malformed(e.to_string()))
    }
}

/// Escapes `&`, `<` and `>` for insertion as HTML.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
