use std::sync::Arc;

use catalog::{Catalog, MuseumEntry};
use foundation::math::lat_lng_to_vector3;

use crate::World;
use crate::components::{Blending, Color, Drawable3D, Material, Side, Transform};
use crate::node::NodeId;
use crate::world::SceneError;

/// Interaction payload attached to each marker group.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerPayload {
    pub index: usize,
    pub entry: Arc<MuseumEntry>,
}

/// Geometry and look of the globe and its markers.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GlobeSettings {
    pub radius: f64,
    pub segments: u32,
    pub atmosphere_scale: f64,
    pub marker_radius: f64,
    pub marker_altitude: f64,
    pub marker_segments: u32,
}

impl Default for GlobeSettings {
    fn default() -> Self {
        Self {
            radius: 5.0,
            segments: 64,
            atmosphere_scale: 1.03,
            marker_radius: 0.10,
            marker_altitude: 0.10,
            marker_segments: 20,
        }
    }
}

impl GlobeSettings {
    pub fn globe_material() -> Material {
        Material {
            color: Color::from_hex(0xeeeeff),
            roughness: 0.95,
            metalness: 0.05,
            textured: true,
            ..Material::default()
        }
    }

    pub fn atmosphere_material() -> Material {
        Material {
            color: Color::from_hex(0x66aaff),
            opacity: 0.06,
            unlit: true,
            side: Side::Back,
            blending: Blending::Additive,
            ..Material::default()
        }
    }

    pub fn marker_material() -> Material {
        Material {
            color: Color::from_hex(0x3cf6ff),
            opacity: 0.92,
            emissive: Color::from_hex(0x3cf6ff),
            emissive_intensity: 0.7,
            metalness: 0.2,
            roughness: 0.5,
            ..Material::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobeHandles {
    pub globe: NodeId,
    pub atmosphere: NodeId,
    pub markers_group: NodeId,
    /// Marker groups in catalog order.
    pub markers: Vec<NodeId>,
}

/// Builds the globe, its atmosphere shell and one marker per catalog entry.
///
/// Markers hang off the globe (`globe -> markersGroup -> marker group ->
/// mesh`) so they rotate with it. The atmosphere is a root sibling and
/// stays fixed.
pub fn spawn_globe(
    world: &mut World<MarkerPayload>,
    settings: &GlobeSettings,
    catalog: &Catalog,
) -> Result<GlobeHandles, SceneError> {
    let globe = world.spawn("earth");
    world.set_drawable(
        globe,
        Drawable3D::sphere(settings.radius, settings.segments, GlobeSettings::globe_material()),
    )?;

    let atmosphere = world.spawn("atmosphere");
    world.set_drawable(
        atmosphere,
        Drawable3D::sphere(
            settings.radius * settings.atmosphere_scale,
            settings.segments,
            GlobeSettings::atmosphere_material(),
        ),
    )?;

    let markers_group = world.spawn_child(globe, "markersGroup")?;

    let marker_material = GlobeSettings::marker_material();
    let mut markers = Vec::with_capacity(catalog.len());
    for (index, entry) in catalog.iter() {
        let group = world.spawn_child(markers_group, format!("marker-{index}"))?;
        let altitude = settings.radius + settings.marker_altitude;
        let position = lat_lng_to_vector3(entry.lat, entry.lng, altitude);
        world.set_transform(group, Transform::translate(position))?;
        world.set_payload(
            group,
            MarkerPayload {
                index,
                entry: Arc::clone(entry),
            },
        )?;

        let mesh = world.spawn_child(group, format!("marker-{index}-mesh"))?;
        world.set_drawable(
            mesh,
            Drawable3D::sphere(settings.marker_radius, settings.marker_segments, marker_material),
        )?;
        markers.push(group);
    }

    tracing::debug!(markers = markers.len(), "spawned globe");

    Ok(GlobeHandles {
        globe,
        atmosphere,
        markers_group,
        markers,
    })
}
