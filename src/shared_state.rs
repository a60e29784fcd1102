//! Here we store all the shared data that the app's tasks might use.
//! Access is mediated with locks to support asynchronicity

use std::sync::Arc;

use color_eyre::eyre::Result;
use tokio::sync::RwLock;

use crate::renderer::Renderer;

/// The size of the user's terminal
#[derive(Default, Debug, Copy, Clone)]
#[non_exhaustive]
pub struct TTYSize {
    /// Width of the TTY
    pub width: u16,
    /// Height of the TTY
    pub height: u16,
}

/// All the shared data the app uses
#[non_exhaustive]
pub struct SharedState {
    /// The channel on which all Constellation protocol messages are sent.
    pub protocol_tx: tokio::sync::broadcast::Sender<crate::run::Protocol>,
    /// Location of the config directory.
    pub config_path: tokio::sync::RwLock<std::path::PathBuf>,
    /// User config
    pub config: tokio::sync::RwLock<crate::config::Config>,
    /// Just the size of the user's terminal. The particle field and the renderer follow this.
    pub tty_size: tokio::sync::RwLock<TTYSize>,
    /// Whether to render the stats overlay.
    pub show_stats: tokio::sync::RwLock<bool>,
    /// Is the application logging?
    pub is_logging: tokio::sync::RwLock<bool>,
}

impl SharedState {
    /// Initialise the shared state
    pub async fn init(
        width: u16,
        height: u16,
        protocol_tx: tokio::sync::broadcast::Sender<crate::run::Protocol>,
    ) -> Result<Arc<Self>> {
        let state = Self {
            protocol_tx,
            config_path: RwLock::default(),
            config: RwLock::default(),
            tty_size: RwLock::new(TTYSize { width, height }),
            show_stats: RwLock::default(),
            is_logging: RwLock::default(),
        };

        state.set_tty_size(width, height).await;
        Ok(Arc::new(state))
    }

    /// Convenience method to initialise the shared state with the user's terminal's size.
    pub async fn init_with_users_tty_size(
        protocol_tx: tokio::sync::broadcast::Sender<crate::run::Protocol>,
    ) -> Result<Arc<Self>> {
        let tty_size = Renderer::get_users_tty_size()?;
        Self::init(
            tty_size.cols.try_into()?,
            tty_size.rows.try_into()?,
            protocol_tx,
        )
        .await
    }

    /// Get a read lock and return the current TTY size
    pub async fn get_tty_size(&self) -> TTYSize {
        let tty_size = self.tty_size.read().await;
        *tty_size
    }

    /// Get a write lock and set the a new TTY size
    pub async fn set_tty_size(&self, width: u16, height: u16) {
        let mut tty_size = self.tty_size.write().await;
        *tty_size = TTYSize { width, height };
    }
}
