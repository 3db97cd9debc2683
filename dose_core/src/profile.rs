//! User profile metadata (name, age).
//!
//! Stored next to the regimen but never consulted by the analytics.

use crate::{Error, Profile, Result};

const MIN_NAME_CHARS: usize = 2;
const MIN_AGE: u32 = 1;
const MAX_AGE: u32 = 120;

impl Profile {
    /// Build a validated profile; either field may be left unset
    pub fn new(name: Option<String>, age: Option<u32>) -> Result<Self> {
        let name = name.map(|n| validate_name(&n)).transpose()?;
        let age = age.map(validate_age).transpose()?;
        Ok(Self { name, age })
    }

    /// Profile with the given fields replaced, validating only what changed
    pub fn with_changes(&self, name: Option<String>, age: Option<u32>) -> Result<Self> {
        Ok(Self {
            name: match name {
                Some(n) => Some(validate_name(&n)?),
                None => self.name.clone(),
            },
            age: match age {
                Some(a) => Some(validate_age(a)?),
                None => self.age,
            },
        })
    }

    /// Drop any field that no longer passes validation
    pub(crate) fn sanitized(self) -> Self {
        let name = self.name.and_then(|n| match validate_name(&n) {
            Ok(n) => Some(n),
            Err(e) => {
                tracing::warn!("Ignoring stored name: {}", e);
                None
            }
        });
        let age = self.age.and_then(|a| match validate_age(a) {
            Ok(a) => Some(a),
            Err(e) => {
                tracing::warn!("Ignoring stored age: {}", e);
                None
            }
        });
        Self { name, age }
    }
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.chars().count() < MIN_NAME_CHARS {
        return Err(Error::InvalidProfile(format!(
            "name must be at least {} characters",
            MIN_NAME_CHARS
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_age(age: u32) -> Result<u32> {
    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return Err(Error::InvalidProfile(format!(
            "age must be between {} and {}",
            MIN_AGE, MAX_AGE
        )));
    }
    Ok(age)
}
