use foundation::math::precision::stable_total_cmp_f64;
use foundation::math::{Vec2, Vec3};

use crate::World;
use crate::camera::PerspectiveCamera;
use crate::components::{Shape3D, Side};
use crate::node::NodeId;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }

    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.dir * t
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Intersection {
    pub node: NodeId,
    pub distance: f64,
    pub point: Vec3,
}

/// A hit resolved to the node that carries the interaction payload.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickHit {
    pub target: NodeId,
    pub hit: Intersection,
}

/// How far above a hit mesh a payload may live.
pub const PAYLOAD_SEARCH_DEPTH: usize = 1;

/// All sphere drawables hit by `ray`, nearest first.
///
/// Ordering contract:
/// - Sorted by distance along the normalized ray.
/// - Equal distances fall back to ascending `NodeId`.
///
/// Which surface counts as a hit follows the material side: front faces
/// report the entry point, back faces the exit point. Point clouds are
/// never hit.
pub fn raycast<P>(world: &World<P>, ray: Ray) -> Vec<Intersection> {
    let Some(dir) = ray.dir.normalized() else {
        return Vec::new();
    };
    let ray = Ray::new(ray.origin, dir);

    let mut hits: Vec<Intersection> = world
        .nodes()
        .filter_map(|(id, node)| {
            let drawable = node.drawable?;
            let Shape3D::Sphere { radius, .. } = drawable.shape else {
                return None;
            };
            let m = world.world_matrix(id)?;
            let (t0, t1) = ray_sphere(ray, m.translation(), radius * m.max_scale())?;

            let t = match drawable.material.side {
                Side::Front => (t0 >= 0.0).then_some(t0),
                Side::Back => (t1 >= 0.0).then_some(t1),
                Side::Double => {
                    if t0 >= 0.0 {
                        Some(t0)
                    } else {
                        (t1 >= 0.0).then_some(t1)
                    }
                }
            }?;

            Some(Intersection {
                node: id,
                distance: t,
                point: ray.at(t),
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        stable_total_cmp_f64(a.distance, b.distance).then_with(|| a.node.cmp(&b.node))
    });
    hits
}

/// First intersection along `ray` that resolves to a payload.
///
/// Hits on nodes without a payload (globe, atmosphere) do not occlude
/// later hits; they are skipped.
pub fn pick<P>(world: &World<P>, ray: Ray) -> Option<PickHit> {
    raycast(world, ray).into_iter().find_map(|hit| {
        world
            .payload_owner(hit.node, PAYLOAD_SEARCH_DEPTH)
            .map(|(target, _)| PickHit { target, hit })
    })
}

/// [`pick`] for a pixel position inside a `width x height` viewport.
pub fn pick_screen<P>(
    world: &World<P>,
    camera: &PerspectiveCamera,
    px: Vec2,
    width: f64,
    height: f64,
) -> Option<PickHit> {
    let ndc = crate::camera::pixel_to_ndc(px, width, height);
    pick(world, camera.ray_from_ndc(ndc))
}

/// Entry and exit distances of a ray with unit `dir`.
fn ray_sphere(ray: Ray, center: Vec3, radius: f64) -> Option<(f64, f64)> {
    let oc = ray.origin - center;
    let b = oc.dot(ray.dir);
    let c = oc.dot(oc) - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 || !disc.is_finite() {
        return None;
    }
    let s = disc.sqrt();
    Some((-b - s, -b + s))
}

#[cfg(test)]
mod tests {
    use super::{Ray, pick, raycast};
    use crate::World;
    use crate::components::{Drawable3D, Material, Side, Transform};
    use foundation::math::Vec3;

    fn toward_origin() -> Ray {
        Ray::new(Vec3::new(0.0, 0.0, 12.0), Vec3::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn front_side_reports_entry_point() {
        let mut world: World<()> = World::new();
        let globe = world.spawn("globe");
        world
            .set_drawable(globe, Drawable3D::sphere(5.0, 64, Material::default()))
            .expect("drawable");

        let hits = raycast(&world, toward_origin());
        assert_eq!(hits.len(), 1);
        assert!((hits[0].distance - 7.0).abs() < 1e-12);
        assert!((hits[0].point - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-12);
    }

    #[test]
    fn back_side_reports_exit_point() {
        let mut world: World<()> = World::new();
        let shell = world.spawn("atmosphere");
        world.set_transform(shell, Transform::scaled(1.03)).expect("transform");
        let material = Material {
            side: Side::Back,
            ..Material::default()
        };
        world
            .set_drawable(shell, Drawable3D::sphere(5.0, 64, material))
            .expect("drawable");

        let hits = raycast(&world, toward_origin());
        assert_eq!(hits.len(), 1);
        assert!((hits[0].distance - (12.0 + 5.15)).abs() < 1e-9);
    }

    #[test]
    fn misses_and_spheres_behind_are_ignored() {
        let mut world: World<()> = World::new();
        let behind = world.spawn("behind");
        world
            .set_transform(behind, Transform::translate(Vec3::new(0.0, 0.0, 20.0)))
            .expect("transform");
        world
            .set_drawable(behind, Drawable3D::sphere(1.0, 8, Material::default()))
            .expect("drawable");
        let aside = world.spawn("aside");
        world
            .set_transform(aside, Transform::translate(Vec3::new(4.0, 0.0, 0.0)))
            .expect("transform");
        world
            .set_drawable(aside, Drawable3D::sphere(1.0, 8, Material::default()))
            .expect("drawable");

        assert!(raycast(&world, toward_origin()).is_empty());
    }

    #[test]
    fn payloadless_hits_do_not_occlude() {
        let mut world: World<u32> = World::new();
        let globe = world.spawn("globe");
        world
            .set_drawable(globe, Drawable3D::sphere(5.0, 64, Material::default()))
            .expect("drawable");

        // Marker on the far side of the globe, still on the ray.
        let group = world.spawn_child(globe, "marker").expect("group");
        world
            .set_transform(group, Transform::translate(Vec3::new(0.0, 0.0, -5.1)))
            .expect("transform");
        world.set_payload(group, 7).expect("payload");
        let mesh = world.spawn_child(group, "marker-mesh").expect("mesh");
        world
            .set_drawable(mesh, Drawable3D::sphere(0.1, 20, Material::default()))
            .expect("drawable");

        let hit = pick(&world, toward_origin()).expect("marker hit");
        assert_eq!(hit.target, group);
        assert_eq!(hit.hit.node, mesh);
        assert_eq!(world.payload(hit.target), Some(&7));
    }

    #[test]
    fn equal_distances_sort_by_node() {
        let mut world: World<()> = World::new();
        let a = world.spawn("a");
        let b = world.spawn("b");
        for id in [b, a] {
            world
                .set_drawable(id, Drawable3D::sphere(1.0, 8, Material::default()))
                .expect("drawable");
        }
        let hits = raycast(&world, toward_origin());
        assert_eq!(hits.iter().map(|h| h.node).collect::<Vec<_>>(), vec![a, b]);
    }
}
