use super::Material;

/// Index into `World`'s point cloud storage.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PointCloudId(pub u32);

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Shape3D {
    /// UV sphere centred on the node origin.
    Sphere { radius: f64, segments: u32 },
    /// Unconnected points in node-local space. Never pickable.
    Points { cloud: PointCloudId },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Drawable3D {
    pub shape: Shape3D,
    pub material: Material,
}

impl Drawable3D {
    pub fn sphere(radius: f64, segments: u32, material: Material) -> Self {
        Self {
            shape: Shape3D::Sphere { radius, segments },
            material,
        }
    }

    pub fn points(cloud: PointCloudId, material: Material) -> Self {
        Self {
            shape: Shape3D::Points { cloud },
            material,
        }
    }
}
