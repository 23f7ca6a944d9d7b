pub mod ai;
pub mod config;
pub mod exercise;
pub mod history;
pub mod onboard;
pub mod routine;
pub mod session;
pub mod status;
pub mod weight;

use std::sync::Arc;

use anyhow::{Context, Result};
use ironlog::{
    clock::{self, Clock},
    config::Settings,
    db,
    kv::FileStore,
    session::SessionStore,
    storage::Database,
    types::{OutputFmt, Units},
};

/// Everything a command needs: the database, resolved settings, the output
/// format and a clock.
pub struct App {
    pub db: Database,
    pub settings: Settings,
    pub fmt: OutputFmt,
    pub clock: Arc<dyn Clock>,
}

impl App {
    pub async fn open(settings: Settings, fmt: OutputFmt) -> Result<Self> {
        let pool = db::open(&settings.db_path).await?;
        Ok(Self {
            db: Database::new(pool),
            settings,
            fmt,
            clock: clock::system(),
        })
    }

    pub fn state_store(&self) -> Result<FileStore> {
        let dir = self.settings.state_dir();
        FileStore::open(&dir).with_context(|| format!("Failed to open state dir {}", dir.display()))
    }

    /// Display units from the saved profile, metric when there is none.
    pub async fn units(&self) -> Result<Units> {
        Ok(self
            .db
            .profile()
            .await?
            .map(|p| p.preferred_units)
            .unwrap_or_default())
    }

    pub fn session_store(&self) -> Result<SessionStore> {
        let kv = self.state_store()?;
        SessionStore::load(Box::new(kv), self.clock.clone()).context("Failed to load session")
    }
}

/// 1-based user index to a 0-based position, checked against `len`.
pub fn position(index: usize, len: usize, what: &str) -> Result<usize> {
    if index == 0 || index > len {
        anyhow::bail!("no {what} at position {index} (valid: 1..={len})");
    }
    Ok(index - 1)
}
