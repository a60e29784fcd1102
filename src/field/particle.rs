//! A single point of light drifting over the terminal.

use glam::Vec2;

/// The most a particle can drift per frame, per axis, in pixels.
pub const MAX_DRIFT: f32 = 0.25;

/// The smallest and largest radii a particle can be born with, in pixels.
pub const RADIUS_RANGE: std::ops::Range<f32> = 1.0..4.0;

/// The range of opacities a particle can be born with.
pub const OPACITY_RANGE: std::ops::Range<f32> = 0.2..0.7;

/// How far a particle at the exact pointer position gets pushed, in pixels.
const NUDGE_STRENGTH: f32 = 2.0;

/// `Particle`
#[derive(Debug, Clone, Copy)]
pub struct Particle {
    /// Current position, in pixels.
    pub position: Vec2,
    /// Drift per frame. Fixed at birth; pointer repulsion moves the position, never this.
    pub velocity: Vec2,
    /// Radius of the rendered circle, in pixels. Fixed at birth.
    pub radius: f32,
    /// Opacity of the rendered circle. Fixed at birth.
    pub opacity: f32,
}

impl Particle {
    /// Create a particle at a uniformly random position within the viewport, with random drift,
    /// size and opacity.
    pub fn spawn(rng: &mut impl rand::Rng, width: f32, height: f32) -> Self {
        Self {
            position: Vec2::new(rng.gen_range(0.0..width), rng.gen_range(0.0..height)),
            velocity: Vec2::new(
                rng.gen_range(-MAX_DRIFT..MAX_DRIFT),
                rng.gen_range(-MAX_DRIFT..MAX_DRIFT),
            ),
            radius: rng.gen_range(RADIUS_RANGE),
            opacity: rng.gen_range(OPACITY_RANGE),
        }
    }

    /// One frame of drift: Euler integration with an implicit unit time-step, then a toroidal
    /// wrap. Leaving one edge re-enters from the opposite edge; positions are never clamped and
    /// velocity is never reflected.
    pub fn advance(&mut self, width: f32, height: f32) {
        self.position += self.velocity;

        if self.position.x > width {
            self.position.x = 0.0;
        }
        if self.position.x < 0.0 {
            self.position.x = width;
        }
        if self.position.y > height {
            self.position.y = 0.0;
        }
        if self.position.y < 0.0 {
            self.position.y = height;
        }
    }

    /// A one-shot positional nudge away from the pointer. Particles closer than `radius` are
    /// displaced in proportion to their proximity; velocity is untouched, so normal wandering
    /// resumes on the next frame.
    pub fn repel(&mut self, pointer: Vec2, radius: f32) {
        let delta = self.position - pointer;
        let distance = delta.length();
        if distance >= radius {
            return;
        }

        let force = (radius - distance) / radius;
        let angle = delta.y.atan2(delta.x);
        self.position.x += angle.cos() * force * NUDGE_STRENGTH;
        self.position.y += angle.sin() * force * NUDGE_STRENGTH;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn still_particle(x: f32, y: f32) -> Particle {
        Particle {
            position: Vec2::new(x, y),
            velocity: Vec2::ZERO,
            radius: 1.0,
            opacity: 0.5,
        }
    }

    #[test]
    fn wrap_crosses_to_near_edge() {
        let mut particle = still_particle(99.9, 50.0);
        particle.velocity = Vec2::new(0.2, 0.0);
        particle.advance(100.0, 100.0);
        assert!((particle.position.x - 0.0).abs() < f32::EPSILON);
        assert!((particle.position.y - 50.0).abs() < f32::EPSILON);
    }

    #[test]
    fn wrap_crosses_to_far_edge() {
        let mut particle = still_particle(0.1, 50.0);
        particle.velocity = Vec2::new(-0.2, 0.0);
        particle.advance(100.0, 100.0);
        assert!((particle.position.x - 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn vertical_wrap_is_independent_of_horizontal() {
        let mut particle = still_particle(50.0, 99.9);
        particle.velocity = Vec2::new(0.1, 0.2);
        particle.advance(100.0, 100.0);
        assert!((particle.position.x - 50.1).abs() < 0.001);
        assert!((particle.position.y - 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn repulsion_at_the_pointer_is_full_force() {
        // atan2(0, 0) is 0, so a particle exactly under the pointer moves (2, 0).
        let mut particle = still_particle(75.0, 75.0);
        particle.repel(Vec2::new(75.0, 75.0), 150.0);
        assert!((particle.position.x - 77.0).abs() < f32::EPSILON);
        assert!((particle.position.y - 75.0).abs() < f32::EPSILON);
    }

    #[test]
    fn repulsion_fades_with_distance() {
        let mut near = still_particle(110.0, 100.0);
        near.repel(Vec2::new(100.0, 100.0), 150.0);
        let near_push = near.position.x - 110.0;

        let mut far = still_particle(240.0, 100.0);
        far.repel(Vec2::new(100.0, 100.0), 150.0);
        let far_push = far.position.x - 240.0;

        assert!(near_push > far_push);
        assert!(far_push > 0.0);

        // force = (150 - 10) / 150, directly away from the pointer.
        assert!((near_push - (140.0 / 150.0 * 2.0)).abs() < 0.001);
    }

    #[test]
    fn repulsion_beyond_the_radius_is_nothing() {
        let mut particle = still_particle(250.0, 100.0);
        particle.repel(Vec2::new(100.0, 100.0), 150.0);
        assert!((particle.position.x - 250.0).abs() < f32::EPSILON);
    }

    #[test]
    fn repulsion_leaves_velocity_alone() {
        let mut particle = still_particle(100.0, 100.0);
        particle.velocity = Vec2::new(0.1, -0.2);
        particle.repel(Vec2::new(101.0, 101.0), 150.0);
        assert!((particle.velocity.x - 0.1).abs() < f32::EPSILON);
        assert!((particle.velocity.y - -0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn spawned_attributes_are_within_their_ranges() {
        let mut rng = rand::thread_rng();
        for _ in 0_usize..100 {
            let particle = Particle::spawn(&mut rng, 200.0, 100.0);
            assert!(particle.position.x >= 0.0 && particle.position.x < 200.0);
            assert!(particle.position.y >= 0.0 && particle.position.y < 100.0);
            assert!(particle.velocity.x >= -MAX_DRIFT && particle.velocity.x < MAX_DRIFT);
            assert!(particle.velocity.y >= -MAX_DRIFT && particle.velocity.y < MAX_DRIFT);
            assert!(particle.radius >= 1.0 && particle.radius < 4.0);
            assert!(particle.opacity >= 0.2 && particle.opacity < 0.7);
        }
    }
}
