//! The particle field: a fixed population of drifting points over a toroidal viewport.

use glam::Vec2;

use super::particle::Particle;

/// A line between two particles that have drifted close enough to link.
#[derive(Debug, Clone, Copy)]
pub struct Link {
    /// One end of the line.
    pub from: Vec2,
    /// The other end.
    pub to: Vec2,
    /// The line's opacity, fading with the distance between the two particles.
    pub opacity: f32,
}

/// `Simulation`
#[derive(Default)]
pub struct Simulation {
    /// Width of the viewport, in pixels.
    pub width: f32,
    /// Height of the viewport, in pixels (double the rows of the TTY).
    pub height: f32,
    /// All the particles. The population is decided once, at initialisation, and never changes
    /// for the lifetime of the field.
    pub particles: Vec<Particle>,
    /// The last known pointer position, in pixels. `None` until the mouse first moves.
    pub pointer: Option<Vec2>,
    /// The field's tunables.
    pub config: crate::config::Field,
}

#[expect(
    clippy::cast_precision_loss,
    reason = "Viewport dimensions are far below f32's integer limit"
)]
impl Simulation {
    /// Initialise a new simulation. A degenerate viewport simply produces an empty field; the
    /// loop then runs as a no-op rather than being an error.
    #[must_use]
    pub fn new(width: usize, height: usize, config: crate::config::Field) -> Self {
        let mut simulation = Self {
            width: width as f32,
            height: height as f32,
            particles: Vec::new(),
            pointer: None,
            config,
        };

        let population = simulation.population_for(width, height);
        simulation.particles.reserve(population);
        let mut rng = rand::thread_rng();
        for _ in 0..population {
            simulation
                .particles
                .push(Particle::spawn(&mut rng, simulation.width, simulation.height));
        }

        simulation
    }

    /// How many particles a viewport gets: one per `columns_per_particle` columns, capped at
    /// `max_particles`.
    fn population_for(&self, width: usize, height: usize) -> usize {
        if height == 0 {
            return 0;
        }
        self.config
            .max_particles
            .min(width.checked_div(self.config.columns_per_particle).unwrap_or(0))
    }

    /// One frame of the simulation: every particle drifts and wraps.
    pub fn tick(&mut self) {
        for particle in &mut self.particles {
            particle.advance(self.width, self.height);
        }
    }

    /// The pointer moved: remember where it is and give every nearby particle a one-shot nudge
    /// away from it. This happens on the event, not on the frame tick.
    pub fn pointer_moved(&mut self, pointer: Vec2) {
        self.pointer = Some(pointer);
        for particle in &mut self.particles {
            particle.repel(pointer, self.config.pointer_radius);
        }
    }

    /// The viewport changed size. Only the recorded dimensions change: the particles are neither
    /// regenerated nor rescaled, so after a shrink some may sit beyond the new edges until their
    /// drift wraps them back into view.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width as f32;
        self.height = height as f32;
    }

    /// The connection pass: every unordered pair of particles closer than `link_distance` yields
    /// a line, its opacity fading linearly from `link_opacity` at zero distance to nothing at
    /// `link_distance`. O(n²), which is fine for a population capped at 100.
    #[must_use]
    pub fn links(&self) -> Vec<Link> {
        let mut links = Vec::new();
        for (i, particle) in self.particles.iter().enumerate() {
            for other in self.particles.iter().skip(i.saturating_add(1)) {
                let distance = particle.position.distance(other.position);
                if distance < self.config.link_distance {
                    links.push(Link {
                        from: particle.position,
                        to: other.position,
                        opacity: (1.0 - distance / self.config.link_distance)
                            * self.config.link_opacity,
                    });
                }
            }
        }
        links
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing, reason = "Tests aren't so strict")]
mod test {
    use super::*;

    fn field_config() -> crate::config::Field {
        crate::config::Field::default()
    }

    fn empty_simulation(width: usize, height: usize) -> Simulation {
        let mut simulation = Simulation::new(0, 0, field_config());
        simulation.resize(width, height);
        simulation
    }

    #[test]
    fn population_follows_the_viewport_width() {
        assert_eq!(Simulation::new(1500, 500, field_config()).particles.len(), 100);
        assert_eq!(Simulation::new(600, 500, field_config()).particles.len(), 40);
        assert_eq!(Simulation::new(10, 500, field_config()).particles.len(), 0);
    }

    #[test]
    fn degenerate_viewports_yield_an_empty_field() {
        assert!(Simulation::new(0, 0, field_config()).particles.is_empty());
        assert!(Simulation::new(1500, 0, field_config()).particles.is_empty());
    }

    #[test]
    fn particles_stay_within_the_viewport() {
        let mut simulation = Simulation::new(300, 150, field_config());
        for _ in 0_usize..10_000 {
            simulation.tick();
        }
        for particle in &simulation.particles {
            assert!(particle.position.x >= 0.0 && particle.position.x <= 300.0);
            assert!(particle.position.y >= 0.0 && particle.position.y <= 150.0);
        }
    }

    #[test]
    fn population_is_fixed_for_the_field_lifetime() {
        let mut simulation = Simulation::new(600, 300, field_config());
        simulation.tick();
        simulation.pointer_moved(Vec2::new(10.0, 10.0));
        simulation.resize(1500, 700);
        simulation.tick();
        assert_eq!(simulation.particles.len(), 40);
    }

    #[test]
    fn links_join_exactly_the_close_pairs() {
        let mut simulation = empty_simulation(1000, 1000);
        let mut at = |x: f32, y: f32| {
            simulation.particles.push(Particle {
                position: Vec2::new(x, y),
                velocity: Vec2::ZERO,
                radius: 1.0,
                opacity: 0.5,
            });
        };
        at(0.0, 0.0);
        at(100.0, 0.0); // 100 from the first: linked
        at(500.0, 0.0); // 400 from the second: not linked

        let links = simulation.links();
        assert_eq!(links.len(), 1);
        assert!((links[0].from.x - 0.0).abs() < f32::EPSILON);
        assert!((links[0].to.x - 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn link_opacity_fades_with_distance() {
        let mut simulation = empty_simulation(1000, 1000);
        for x in [0.0, 0.0, 60.0, 119.9] {
            simulation.particles.push(Particle {
                position: Vec2::new(x, 0.0),
                velocity: Vec2::ZERO,
                radius: 1.0,
                opacity: 0.5,
            });
        }

        let links = simulation.links();
        let opacity_at = |from: f32, to: f32| -> f32 {
            links
                .iter()
                .find(|link| {
                    (link.from.x - from).abs() < 0.01 && (link.to.x - to).abs() < 0.01
                })
                .map_or(f32::NAN, |link| link.opacity)
        };

        // Coincident particles get the full link opacity.
        assert!((opacity_at(0.0, 0.0) - 0.2).abs() < f32::EPSILON);
        // Opacity decreases monotonically with distance, towards zero at the threshold.
        let mid = opacity_at(0.0, 60.0);
        let far = opacity_at(0.0, 119.9);
        assert!(opacity_at(0.0, 0.0) > mid);
        assert!(mid > far);
        assert!(far > 0.0 && far < 0.001);
    }

    #[test]
    fn pairs_at_the_threshold_are_not_linked() {
        let mut simulation = empty_simulation(1000, 1000);
        for x in [0.0, 120.0] {
            simulation.particles.push(Particle {
                position: Vec2::new(x, 0.0),
                velocity: Vec2::ZERO,
                radius: 1.0,
                opacity: 0.5,
            });
        }
        assert!(simulation.links().is_empty());
    }

    #[test]
    fn resize_keeps_positions() {
        let mut simulation = Simulation::new(600, 300, field_config());
        let before: Vec<Vec2> = simulation
            .particles
            .iter()
            .map(|particle| particle.position)
            .collect();

        simulation.resize(150, 75);

        for (particle, original) in simulation.particles.iter().zip(before) {
            assert!((particle.position - original).length() < f32::EPSILON);
        }
        assert!((simulation.width - 150.0).abs() < f32::EPSILON);
        assert!((simulation.height - 75.0).abs() < f32::EPSILON);
    }

    #[test]
    fn stranded_particles_wrap_back_into_a_shrunk_viewport() {
        let mut simulation = empty_simulation(100, 100);
        simulation.particles.push(Particle {
            position: Vec2::new(90.0, 50.0),
            velocity: Vec2::new(0.25, 0.0),
            radius: 1.0,
            opacity: 0.5,
        });

        // Shrink the viewport so the particle is stranded beyond the right edge. Its very next
        // step finds it past the far edge, so the wrap brings it back in at the left.
        simulation.resize(50, 100);
        assert!(simulation.particles[0].position.x > 50.0);
        simulation.tick();
        assert!((simulation.particles[0].position.x - 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn pointer_state_starts_absent() {
        let mut simulation = Simulation::new(600, 300, field_config());
        assert!(simulation.pointer.is_none());
        simulation.pointer_moved(Vec2::new(5.0, 5.0));
        assert!(simulation.pointer.is_some());
    }
}
