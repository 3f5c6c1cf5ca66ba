//! Flattens the scene graph into what the GPU renderer draws this frame.

use std::cmp::Ordering;

use foundation::math::precision::stable_total_cmp_f64;
use foundation::math::{Mat4, Vec3};
use scene::camera::PerspectiveCamera;
use scene::components::{Lighting, Material, PointCloudId, Shape3D};
use scene::{NodeId, World};

/// One sphere, radius baked into `model`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SphereDraw {
    pub node: NodeId,
    pub model: Mat4,
    pub segments: u32,
    pub material: Material,
    /// Eye to sphere centre.
    pub view_depth: f64,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointsDraw {
    pub node: NodeId,
    pub cloud: PointCloudId,
    pub model: Mat4,
    pub material: Material,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawList {
    /// Clip-from-world with wgpu's `[0, 1]` depth range.
    pub view_proj: Mat4,
    pub eye: Vec3,
    pub aspect: f64,
    pub lighting: Lighting,
    /// Scene order.
    pub opaque: Vec<SphereDraw>,
    /// Farthest first.
    pub transparent: Vec<SphereDraw>,
    pub points: Vec<PointsDraw>,
}

pub fn build_draw_list<P>(world: &World<P>, camera: &PerspectiveCamera) -> DrawList {
    let mut opaque = Vec::new();
    let mut transparent = Vec::new();
    let mut points = Vec::new();

    for (node, n) in world.nodes() {
        let Some(drawable) = n.drawable else {
            continue;
        };
        let Some(model) = world.world_matrix(node) else {
            continue;
        };
        match drawable.shape {
            Shape3D::Sphere { radius, segments } => {
                let draw = SphereDraw {
                    node,
                    model: model * Mat4::from_scale(radius),
                    segments,
                    material: drawable.material,
                    view_depth: (model.translation() - camera.position).length(),
                };
                if drawable.material.is_transparent() {
                    transparent.push(draw);
                } else {
                    opaque.push(draw);
                }
            }
            Shape3D::Points { cloud } => points.push(PointsDraw {
                node,
                cloud,
                model,
                material: drawable.material,
            }),
        }
    }

    transparent.sort_by(|a: &SphereDraw, b: &SphereDraw| -> Ordering {
        stable_total_cmp_f64(b.view_depth, a.view_depth).then_with(|| a.node.cmp(&b.node))
    });

    DrawList {
        view_proj: Mat4::OPENGL_TO_WGPU * camera.view_projection(),
        eye: camera.position,
        aspect: camera.aspect,
        lighting: world.lighting,
        opaque,
        transparent,
        points,
    }
}

#[cfg(test)]
mod tests {
    use super::build_draw_list;
    use catalog::Catalog;
    use scene::World;
    use scene::camera::PerspectiveCamera;
    use scene::components::Side;
    use scene::prefabs::{GlobeSettings, StarfieldSettings, spawn_globe, spawn_starfield};

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::orbiting_origin(60.0, 1.5, 0.1, 1000.0, 12.0)
    }

    #[test]
    fn globe_is_opaque_and_the_rest_is_sorted_back_to_front() {
        let catalog = Catalog::builtin();
        let mut world = World::new();
        spawn_starfield(&mut world, &StarfieldSettings::default()).expect("stars");
        let handles = spawn_globe(&mut world, &GlobeSettings::default(), &catalog).expect("globe");

        let list = build_draw_list(&world, &camera());
        assert_eq!(list.opaque.len(), 1);
        assert_eq!(list.opaque[0].node, handles.globe);
        assert_eq!(list.points.len(), 1);

        // Atmosphere plus one mesh per marker.
        assert_eq!(list.transparent.len(), 1 + catalog.len());
        for pair in list.transparent.windows(2) {
            assert!(pair[0].view_depth >= pair[1].view_depth);
        }
        let atmosphere = list
            .transparent
            .iter()
            .find(|d| d.node == handles.atmosphere)
            .expect("atmosphere");
        assert_eq!(atmosphere.material.side, Side::Back);
        assert!((atmosphere.view_depth - 12.0).abs() < 1e-9);
    }

    #[test]
    fn radius_is_baked_into_the_model_matrix() {
        let catalog = Catalog::builtin();
        let mut world = World::new();
        spawn_globe(&mut world, &GlobeSettings::default(), &catalog).expect("globe");

        let list = build_draw_list(&world, &camera());
        assert!((list.opaque[0].model.max_scale() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn view_projection_uses_zero_to_one_depth() {
        let world: World<()> = World::new();
        let list = build_draw_list(&world, &camera());

        let near = list.view_proj.transform_vec4(foundation::math::Vec3::new(0.0, 0.0, 11.9));
        let far = list.view_proj.transform_vec4(foundation::math::Vec3::new(0.0, 0.0, -988.0));
        assert!((near[2] / near[3]).abs() < 1e-6);
        assert!((far[2] / far[3] - 1.0).abs() < 1e-6);
    }
}
