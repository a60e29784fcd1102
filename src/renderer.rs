//! Render finished frames to the user's terminal.

use std::sync::Arc;

use color_eyre::eyre::Result;
use tokio::sync::mpsc;

use termwiz::surface::Change as TermwizChange;
use termwiz::terminal::buffered::BufferedTerminal;
use termwiz::terminal::{ScreenSize, Terminal as TermwizTerminal};

use crate::shared_state::SharedState;
use crate::surface::Canvas;

/// How many frames may queue up before the field's send blocks.
const FRAME_QUEUE_SIZE: usize = 2;

/// `Renderer`
pub struct Renderer {
    /// Shared app state
    pub state: Arc<SharedState>,
    /// The terminal's width
    pub width: u16,
    /// The terminal's height
    pub height: u16,
}

impl Renderer {
    /// Create a renderer to render to a user's terminal
    fn new(state: Arc<SharedState>) -> Result<Self> {
        let mut renderer = Self {
            state,
            width: Default::default(),
            height: Default::default(),
        };

        let size = Self::get_users_tty_size()?;
        renderer.width = size.cols.try_into()?;
        renderer.height = size.rows.try_into()?;

        Ok(renderer)
    }

    /// Instantiate and run. Returns the task handle and the channel on which to send frames.
    pub fn start(
        state: Arc<SharedState>,
        protocol_tx: tokio::sync::broadcast::Sender<crate::run::Protocol>,
    ) -> (
        tokio::task::JoinHandle<Result<()>>,
        mpsc::Sender<Canvas>,
    ) {
        let (frames_tx, frames_rx) = mpsc::channel(FRAME_QUEUE_SIZE);
        let protocol_rx = protocol_tx.subscribe();
        let handle = tokio::spawn(async move {
            // This would be much simpler if async closures were stable, because then we could use
            // the `?` syntax.
            match Self::new(Arc::clone(&state)) {
                Ok(mut renderer) => {
                    let result = renderer.run(frames_rx, protocol_rx, protocol_tx.clone()).await;

                    if let Err(error) = result {
                        crate::run::broadcast_protocol_end(&protocol_tx);
                        return Err(error);
                    };
                }
                Err(error) => {
                    crate::run::broadcast_protocol_end(&protocol_tx);
                    return Err(error);
                }
            };

            Ok(())
        });

        (handle, frames_tx)
    }

    /// We need this just because I can't figure out how to pass `Box<dyn Terminal>` to
    /// `BufferedTerminal::new()`
    fn get_termwiz_terminal() -> Result<impl TermwizTerminal> {
        let capabilities = termwiz::caps::Capabilities::new_from_env()?;
        Ok(termwiz::terminal::new_terminal(capabilities)?)
    }

    /// Just for initialisation
    pub fn get_users_tty_size() -> Result<ScreenSize> {
        let mut terminal = Self::get_termwiz_terminal()?;
        Ok(terminal.get_screen_size()?)
    }

    /// Get the user's current terminal size and propagate it
    async fn handle_resize<T: TermwizTerminal + Send>(
        &mut self,
        buffered_terminal: &mut BufferedTerminal<T>,
        protocol_tx: &tokio::sync::broadcast::Sender<crate::run::Protocol>,
    ) -> Result<()> {
        let is_resized = buffered_terminal.check_for_resize()?;
        if !is_resized {
            return Ok(());
        }

        buffered_terminal.repaint()?;

        let (width, height) = buffered_terminal.dimensions();
        self.width = width.try_into()?;
        self.height = height.try_into()?;
        self.state.set_tty_size(self.width, self.height).await;
        protocol_tx.send(crate::run::Protocol::Resize {
            width: self.width,
            height: self.height,
        })?;

        Ok(())
    }

    /// Listen for finished frames from the particle field and draw them.
    /// It lives in its own method so that we can catch any errors and ensure that the user's
    /// terminal is always returned to cooked mode.
    async fn run(
        &mut self,
        mut frames: mpsc::Receiver<Canvas>,
        mut protocol_rx: tokio::sync::broadcast::Receiver<crate::run::Protocol>,
        protocol_tx: tokio::sync::broadcast::Sender<crate::run::Protocol>,
    ) -> Result<()> {
        tracing::debug!("Putting user's terminal into raw mode");
        let mut users_terminal = Self::get_termwiz_terminal()?;
        users_terminal.set_raw_mode()?;
        users_terminal.enter_alternate_screen()?;
        let mut buffered_terminal = BufferedTerminal::new(users_terminal)?;
        buffered_terminal.add_change(TermwizChange::CursorVisibility(
            termwiz::surface::CursorVisibility::Hidden,
        ));

        tracing::debug!("Starting render loop");
        loop {
            tokio::select! {
                Some(canvas) = frames.recv() => {
                    self.handle_resize(&mut buffered_terminal, &protocol_tx).await?;
                    Self::render(canvas, &mut buffered_terminal)?;
                }
                Ok(message) = protocol_rx.recv() => {
                    if matches!(message, crate::run::Protocol::End) {
                        break;
                    }
                }
            }
        }
        tracing::debug!("Exited render loop");

        tracing::debug!("Setting user's terminal back to cooked mode");
        buffered_terminal.add_change(TermwizChange::CursorVisibility(
            termwiz::surface::CursorVisibility::Visible,
        ));
        buffered_terminal.flush()?;
        buffered_terminal.terminal().exit_alternate_screen()?;
        buffered_terminal.terminal().set_cooked_mode()?;

        Ok(())
    }

    /// Draw a single frame to the user's actual terminal. The buffered terminal diffs it against
    /// what's already on screen and makes the minimum number of changes.
    fn render(
        canvas: Canvas,
        buffered_terminal: &mut BufferedTerminal<impl TermwizTerminal + Send>,
    ) -> Result<()> {
        buffered_terminal.draw_from_screen(&canvas.cells, 0, 0);
        buffered_terminal.flush()?;

        Ok(())
    }
}
