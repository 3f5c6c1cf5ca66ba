use foundation::math::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::World;
use crate::components::{Color, Drawable3D, Material};
use crate::node::NodeId;
use crate::world::SceneError;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StarfieldSettings {
    pub count: usize,
    pub min_radius: f64,
    pub radius_span: f64,
    pub seed: u64,
}

impl Default for StarfieldSettings {
    fn default() -> Self {
        Self {
            count: 800,
            min_radius: 60.0,
            radius_span: 120.0,
            seed: 42,
        }
    }
}

/// Points spread uniformly over directions in a spherical shell.
///
/// Identical seeds give identical skies.
pub fn star_positions(settings: &StarfieldSettings) -> Vec<Vec3> {
    let mut rng = ChaCha8Rng::seed_from_u64(settings.seed);
    (0..settings.count)
        .map(|_| {
            let r = settings.min_radius + rng.r#gen::<f64>() * settings.radius_span;
            let theta = rng.r#gen::<f64>() * std::f64::consts::TAU;
            let phi = (2.0 * rng.r#gen::<f64>() - 1.0).acos();
            Vec3::new(
                r * phi.sin() * theta.cos(),
                r * phi.sin() * theta.sin(),
                r * phi.cos(),
            )
        })
        .collect()
}

pub fn spawn_starfield<P>(
    world: &mut World<P>,
    settings: &StarfieldSettings,
) -> Result<NodeId, SceneError> {
    let cloud = world.add_point_cloud(star_positions(settings));
    let stars = world.spawn("stars");
    world.set_drawable(
        stars,
        Drawable3D::points(
            cloud,
            Material {
                color: Color::WHITE,
                opacity: 0.6,
                unlit: true,
                point_size: 0.8,
                ..Material::default()
            },
        ),
    )?;
    Ok(stars)
}
