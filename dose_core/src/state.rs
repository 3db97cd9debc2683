//! Tracker state persistence with file locking.
//!
//! The on-disk document is JSON:
//!
//! ```json
//! {
//!   "treatmentStartDate": "2025-03-28",
//!   "doses": { "2025-03-28": "taken" },
//!   "userName": null,
//!   "userAge": null,
//!   "schedule": [ { "effective_from": "2025-03-28", "rule": { "type": "daily" } } ]
//! }
//! ```
//!
//! Anything malformed degrades to "no regimen configured" rather than an
//! error; a bad individual dose key only loses that key.

use crate::{DoseLedger, Era, Error, Profile, Regimen, Result, SchedulePolicy};
use chrono::NaiveDate;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const TAKEN: &str = "taken";

/// Serialized form of the tracker state
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedDocument {
    #[serde(default)]
    treatment_start_date: Option<String>,
    #[serde(default)]
    doses: BTreeMap<String, String>,
    // Profile fields stay untyped so a bad value only loses that field
    #[serde(default)]
    user_name: Option<Value>,
    #[serde(default)]
    user_age: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schedule: Option<Vec<Era>>,
}

/// Everything a client keeps between runs
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackerState {
    /// `None` until the first dose is recorded
    pub regimen: Option<Regimen>,
    pub profile: Profile,
}

impl TrackerState {
    /// Decode a JSON document
    ///
    /// `default_policy` is used when the document carries no schedule of its
    /// own. Returns [`Error::MalformedPersistedState`] when the document or
    /// its start date can't be understood; see [`TrackerState::decode_or_default`]
    /// for the recovering variant.
    pub fn decode(contents: &str, default_policy: &SchedulePolicy) -> Result<Self> {
        let doc: PersistedDocument = serde_json::from_str(contents)
            .map_err(|e| Error::MalformedPersistedState(e.to_string()))?;

        let profile = Profile {
            name: doc.user_name.and_then(stored_name),
            age: doc.user_age.and_then(stored_age),
        }
        .sanitized();

        let Some(raw_start) = doc.treatment_start_date else {
            if !doc.doses.is_empty() {
                tracing::warn!(
                    "Ignoring {} dose entries stored without a start date",
                    doc.doses.len()
                );
            }
            return Ok(Self {
                regimen: None,
                profile,
            });
        };

        let start_date = parse_day(&raw_start).ok_or_else(|| {
            Error::MalformedPersistedState(format!("invalid start date {:?}", raw_start))
        })?;

        let policy = match doc.schedule {
            Some(eras) => SchedulePolicy::new(eras).unwrap_or_else(|e| {
                tracing::warn!("Stored schedule rejected ({}); using default", e);
                default_policy.clone()
            }),
            None => default_policy.clone(),
        };

        let ledger: DoseLedger = doc
            .doses
            .iter()
            .filter_map(|(key, status)| {
                let day = parse_day(key);
                if day.is_none() {
                    tracing::warn!("Skipping dose entry with invalid date {:?}", key);
                } else if status != TAKEN {
                    tracing::warn!("Skipping dose entry {} with status {:?}", key, status);
                    return None;
                }
                day
            })
            .collect();

        Ok(Self {
            regimen: Some(Regimen::from_parts(start_date, policy, ledger)),
            profile,
        })
    }

    /// Decode, falling back to the empty state on malformed input
    pub fn decode_or_default(contents: &str, default_policy: &SchedulePolicy) -> Self {
        match Self::decode(contents, default_policy) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("{}. Falling back to no regimen.", e);
                Self::default()
            }
        }
    }

    /// Encode as the JSON document described in the module docs
    pub fn encode(&self) -> Result<String> {
        let doc = match &self.regimen {
            Some(regimen) => PersistedDocument {
                treatment_start_date: Some(regimen.start_date().to_string()),
                doses: regimen
                    .ledger()
                    .taken_days()
                    .map(|day| (day.to_string(), TAKEN.to_string()))
                    .collect(),
                user_name: self.profile.name.clone().map(Value::from),
                user_age: self.profile.age.map(Value::from),
                schedule: Some(regimen.policy().eras().to_vec()),
            },
            None => PersistedDocument {
                user_name: self.profile.name.clone().map(Value::from),
                user_age: self.profile.age.map(Value::from),
                ..PersistedDocument::default()
            },
        };
        Ok(serde_json::to_string(&doc)?)
    }

    /// Load tracker state from a file with shared locking
    ///
    /// Returns default state if file doesn't exist.
    /// If file is corrupted, logs a warning and returns default state.
    pub fn load(path: &Path, default_policy: &SchedulePolicy) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No state file found, no regimen configured");
            return Ok(Self::default());
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(
                    "Unable to open state file {:?}: {}. Using defaults.",
                    path,
                    e
                );
                return Ok(Self::default());
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!(
                "Unable to lock state file {:?}: {}. Using defaults.",
                path,
                e
            );
            return Ok(Self::default());
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!(
                "Failed to read state file {:?}: {}. Using defaults.",
                path,
                e
            );
            return Ok(Self::default());
        }

        file.unlock()?;

        let state = Self::decode_or_default(&contents, default_policy);
        tracing::debug!("Loaded tracker state from {:?}", path);
        Ok(state)
    }

    /// Save tracker state to a file with exclusive locking
    ///
    /// Atomically writes state by:
    /// 1. Writing to a temp file
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Temp file in the same directory so the rename stays atomic
        let temp = NamedTempFile::new_in(path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "state path missing parent")
        })?)?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = self.encode()?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved tracker state to {:?}", path);
        Ok(())
    }

    /// Load state, modify it, and save it back
    ///
    /// The whole cycle runs under an exclusive lock on a sidecar
    /// `<state>.lock` file, so concurrent writers apply one after another.
    /// Nothing is written if `f` fails, so a rejected transition leaves the
    /// stored state as it was.
    pub fn update<F>(path: &Path, default_policy: &SchedulePolicy, f: F) -> Result<Self>
    where
        F: FnOnce(&TrackerState) -> Result<TrackerState>,
    {
        let lock_path = lock_path(path);
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        lock.lock_exclusive()?;

        let result = Self::load(path, default_policy)
            .and_then(|state| f(&state))
            .and_then(|next| next.save(path).map(|()| next));

        lock.unlock()?;
        result
    }

    /// The regimen, or [`Error::NoRegimen`] if treatment hasn't started
    pub fn require_regimen(&self) -> Result<&Regimen> {
        self.regimen.as_ref().ok_or(Error::NoRegimen)
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".lock");
    path.with_file_name(name)
}

fn stored_name(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(name) => Some(name),
        other => {
            tracing::warn!("Ignoring stored name {}", other);
            None
        }
    }
}

fn stored_age(value: Value) -> Option<u32> {
    match value {
        Value::Null => None,
        other => match other.as_u64().and_then(|age| u32::try_from(age).ok()) {
            Some(age) => Some(age),
            None => {
                tracing::warn!("Ignoring stored age {}", other);
                None
            }
        },
    }
}

fn parse_day(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}
