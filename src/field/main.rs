//! The particle field's frame loop: drift, repel, paint, repeat, until told to stop.

use std::collections::VecDeque;
use std::sync::Arc;

use color_eyre::eyre::Result;
use glam::Vec2;

use super::simulation::Simulation;
use crate::shared_state::SharedState;
use crate::surface::Canvas;

/// The number of microseconds in a second
const ONE_MICROSECOND: u64 = 1_000_000;

/// The number of paint durations to keep for the rolling FPS average.
const STATS_WINDOW: usize = 30;

/// `Field`
pub struct Field {
    /// Shared app state
    state: Arc<SharedState>,
    /// The simulation itself
    simulation: Simulation,
    /// TTY width
    width: u16,
    /// TTY height
    height: u16,
    /// The base hue everything is drawn in.
    colour: crate::surface::Colour,
    /// A channel to send finished frames to the renderer.
    output: tokio::sync::mpsc::Sender<Canvas>,
    /// The target frame rate.
    frame_rate: u32,
    /// The time at which the previous frame was rendered.
    last_frame_tick: std::time::Instant,
    /// Whether to draw the stats overlay.
    show_stats: bool,
    /// Durations of recent paints, for the stats overlay.
    durations: VecDeque<f64>,
}

impl Field {
    /// Instantiate. The population is decided here, once, from the current viewport; later
    /// resizes only move the field's edges.
    async fn new(state: Arc<SharedState>, output: tokio::sync::mpsc::Sender<Canvas>) -> Self {
        let tty_size = state.get_tty_size().await;
        let config = state.config.read().await.clone();
        let simulation = Simulation::new(
            tty_size.width.into(),
            usize::from(tty_size.height).saturating_mul(2),
            config.field,
        );
        tracing::debug!(
            "Field initialised with {} particles for a {}x{} terminal",
            simulation.particles.len(),
            tty_size.width,
            tty_size.height
        );

        let show_stats = *state.show_stats.read().await;
        Self {
            state,
            simulation,
            width: tty_size.width,
            height: tty_size.height,
            colour: config.color.as_colour(),
            output,
            frame_rate: config.frame_rate,
            last_frame_tick: std::time::Instant::now(),
            show_stats,
            durations: VecDeque::default(),
        }
    }

    /// Our main entrypoint.
    pub async fn start(
        state: Arc<SharedState>,
        output: tokio::sync::mpsc::Sender<Canvas>,
    ) -> Result<()> {
        let mut protocol = state.protocol_tx.subscribe();
        let mut field = Self::new(state, output).await;

        loop {
            tokio::select! {
                () = field.sleep_until_next_frame_tick() => {
                    field.render().await?;
                },
                Ok(message) = protocol.recv() => {
                    if matches!(message, crate::run::Protocol::End) {
                        break;
                    }
                    field.handle_protocol_message(&message);
                }
            }
        }

        tracing::debug!("Particle field loop finished");
        Ok(())
    }

    /// Handle resizes and user input.
    fn handle_protocol_message(&mut self, message: &crate::run::Protocol) {
        #[allow(clippy::wildcard_enum_match_arm, reason = "It's our internal protocol")]
        match message {
            crate::run::Protocol::Resize { width, height } => {
                self.width = *width;
                self.height = *height;
                self.simulation.resize(
                    usize::from(*width),
                    usize::from(*height).saturating_mul(2),
                );
            }
            crate::run::Protocol::Input(event) => self.handle_input(event),
            _ => (),
        }
    }

    /// React to parsed STDIN events: mouse movement perturbs the field, a few keys quit.
    fn handle_input(&mut self, event: &termwiz::input::InputEvent) {
        match event {
            termwiz::input::InputEvent::Mouse(mouse) => {
                // Termwiz mouse coordinates are 1-based cells.
                let pixel = Vec2::new(
                    f32::from(mouse.x.saturating_sub(1)),
                    f32::from(mouse.y.saturating_sub(1)) * 2.0,
                );
                self.simulation.pointer_moved(pixel);
            }
            termwiz::input::InputEvent::Key(key) => {
                let is_quit_key = matches!(
                    key.key,
                    termwiz::input::KeyCode::Char('q') | termwiz::input::KeyCode::Escape
                ) || (matches!(key.key, termwiz::input::KeyCode::Char('c'))
                    && key.modifiers.contains(termwiz::input::Modifiers::CTRL));

                if is_quit_key {
                    crate::run::broadcast_protocol_end(&self.state.protocol_tx);
                }
            }
            _ => (),
        }
    }

    /// One frame: drift everything, paint a fresh canvas, ship it to the renderer.
    async fn render(&mut self) -> Result<()> {
        let start = std::time::Instant::now();

        self.simulation.tick();

        let mut canvas = Canvas::new(self.width.into(), self.height.into());
        paint_frame(&self.simulation, &mut canvas, self.colour);

        if self.show_stats {
            self.paint_stats(&mut canvas);
        }

        self.durations.push_front(start.elapsed().as_secs_f64());
        if self.durations.len() > STATS_WINDOW {
            self.durations.pop_back();
        }

        self.output.send(canvas).await?;
        Ok(())
    }

    /// Overlay the particle count and a rolling FPS average in the top-right corner.
    fn paint_stats(&mut self, canvas: &mut Canvas) {
        let column = usize::from(self.width).saturating_sub(20);
        canvas.overlay_text(
            column,
            0,
            format!("Particles: {}", self.simulation.particles.len()),
        );

        #[expect(
            clippy::cast_precision_loss,
            reason = "This is just debugging output"
        )]
        if !self.durations.is_empty() {
            let average_tick = self.durations.iter().sum::<f64>() / self.durations.len() as f64;
            let fps = (1.0 / average_tick).min(f64::from(self.frame_rate));
            canvas.overlay_text(column, 1, format!("FPS: {fps:.3}"));
        }
    }

    /// Sleep until the next frame render is due.
    async fn sleep_until_next_frame_tick(&mut self) {
        let target = ONE_MICROSECOND.wrapping_div(self.frame_rate.max(1).into());
        let target_frame_rate_micro = std::time::Duration::from_micros(target);
        if let Some(wait) = target_frame_rate_micro.checked_sub(self.last_frame_tick.elapsed()) {
            tokio::time::sleep(wait).await;
        }
        self.last_frame_tick = std::time::Instant::now();
    }
}

/// Paint one frame of the field onto a fresh canvas: every particle as a filled circle faded by
/// its own opacity, then a line for every linked pair. Painting depends only on the simulation
/// state, so painting the same state twice gives identical frames.
pub fn paint_frame(
    simulation: &Simulation,
    canvas: &mut Canvas,
    colour: crate::surface::Colour,
) {
    for particle in &simulation.particles {
        canvas.fill_circle(
            particle.position,
            particle.radius,
            crate::surface::faded(colour, particle.opacity),
        );
    }

    for link in simulation.links() {
        canvas.stroke_line(
            link.from,
            link.to,
            crate::surface::faded(colour, link.opacity),
        );
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing, reason = "Tests aren't so strict")]
mod test {
    use super::*;
    use crate::field::particle::Particle;

    const INDIGO: crate::surface::Colour = (99.0 / 255.0, 102.0 / 255.0, 241.0 / 255.0, 1.0);

    fn fixed_simulation() -> Simulation {
        let mut simulation = Simulation::new(0, 0, crate::config::Field::default());
        simulation.resize(40, 20);
        for (x, y) in [(5.0, 5.0), (15.0, 8.0), (35.0, 18.0)] {
            simulation.particles.push(Particle {
                position: Vec2::new(x, y),
                velocity: Vec2::new(0.1, -0.1),
                radius: 1.5,
                opacity: 0.5,
            });
        }
        simulation
    }

    fn canvas_cells(canvas: &mut Canvas) -> Vec<(String, String)> {
        let mut cells = Vec::new();
        for row in canvas.cells.screen_cells() {
            for cell in row.iter() {
                cells.push((
                    cell.str().to_owned(),
                    format!("{:?}/{:?}", cell.attrs().foreground(), cell.attrs().background()),
                ));
            }
        }
        cells
    }

    #[test]
    fn painting_is_idempotent() {
        let simulation = fixed_simulation();

        let mut first = Canvas::new(40, 10);
        paint_frame(&simulation, &mut first, INDIGO);

        let mut second = Canvas::new(40, 10);
        paint_frame(&simulation, &mut second, INDIGO);

        assert_eq!(canvas_cells(&mut first), canvas_cells(&mut second));
    }

    #[test]
    fn painting_draws_something() {
        let simulation = fixed_simulation();
        let mut canvas = Canvas::new(40, 10);
        paint_frame(&simulation, &mut canvas, INDIGO);

        let painted = canvas_cells(&mut canvas)
            .iter()
            .filter(|(glyph, _)| glyph.as_str() != " ")
            .count();
        assert!(painted > 0);
    }

    #[test]
    fn an_empty_field_paints_nothing() {
        let simulation = Simulation::new(10, 20, crate::config::Field::default());
        assert!(simulation.particles.is_empty());

        let mut canvas = Canvas::new(10, 10);
        paint_frame(&simulation, &mut canvas, INDIGO);
        for (glyph, _) in canvas_cells(&mut canvas) {
            assert_eq!(glyph, " ");
        }
    }
}
