use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::NaiveDate;
use stackscout_core::usage::UsageRecord;
use stackscout_core::ScoutError;

/// Device-scoped demo usage counter
pub trait UsageLedger: Send + Sync {
    fn used_today(&self) -> Result<bool, ScoutError>;
    fn record(&self) -> Result<(), ScoutError>;
}

fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Ledger stored as JSON in the user cache directory
pub struct FileLedger {
    path: PathBuf,
    today: fn() -> NaiveDate,
}

impl FileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            today: local_today,
        }
    }

    /// `<cache dir>/stackscout/usage.json`
    pub fn default_location() -> Result<Self, ScoutError> {
        let dir = dirs_next::cache_dir()
            .ok_or_else(|| {
                ScoutError::Configuration("Unable to determine cache directory".to_string())
            })?
            .join("stackscout");
        Ok(Self::new(dir.join("usage.json")))
    }

    #[cfg(test)]
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// A missing or unreadable file counts as no usage
    fn load(&self) -> UsageRecord {
        let Ok(contents) = fs::read_to_string(&self.path) else {
            return UsageRecord::default();
        };
        serde_json::from_str(&contents).unwrap_or_else(|e| {
            log::warn!("ignoring corrupt usage file {}: {e}", self.path.display());
            UsageRecord::default()
        })
    }
}

impl UsageLedger for FileLedger {
    fn used_today(&self) -> Result<bool, ScoutError> {
        Ok(self.load().used_today((self.today)()))
    }

    fn record(&self) -> Result<(), ScoutError> {
        let record = self.load().record((self.today)());

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                ScoutError::Internal(format!("Failed to create {}: {e}", dir.display()))
            })?;
        }

        let contents = serde_json::to_string_pretty(&record)
            .map_err(|e| ScoutError::Internal(format!("Failed to encode usage record: {e}")))?;
        fs::write(&self.path, contents).map_err(|e| {
            ScoutError::Internal(format!("Failed to write {}: {e}", self.path.display()))
        })
    }
}

/// In-process ledger, used when no cache directory is available
pub struct MemoryLedger {
    record: Mutex<UsageRecord>,
    today: fn() -> NaiveDate,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self {
            record: Mutex::new(UsageRecord::default()),
            today: local_today,
        }
    }
}

impl MemoryLedger {
    #[cfg(test)]
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }
}

impl UsageLedger for MemoryLedger {
    fn used_today(&self) -> Result<bool, ScoutError> {
        let record = self.record.lock().unwrap_or_else(|e| e.into_inner());
        Ok(record.used_today((self.today)()))
    }

    fn record(&self) -> Result<(), ScoutError> {
        let mut record = self.record.lock().unwrap_or_else(|e| e.into_inner());
        *record = record.record((self.today)());
        Ok(())
    }
}
