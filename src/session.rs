//! One analysis session: load a raw source, detect roles, normalize.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use encoding_rs::Encoding;
use log::{debug, info};

use crate::{
    canonical::CanonicalTable,
    detect::{RoleMapping, RoleOverride, detect},
    normalize::{FixedClock, Normalizer, SystemClock},
    raw::RawTable,
    vocabulary::Vocabulary,
};

/// Everything that shapes a session besides the input itself.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub vocabulary: Vocabulary,
    pub overrides: Vec<RoleOverride>,
    /// Seed for synthesized ages; `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Timestamp for dateless inputs; `None` uses the local clock.
    pub now: Option<NaiveDateTime>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub raw: RawTable,
    pub mapping: RoleMapping,
    pub table: CanonicalTable,
}

impl Session {
    pub fn open(
        path: &Path,
        delimiter: u8,
        encoding: &'static Encoding,
        config: &SessionConfig,
    ) -> Result<Self> {
        let raw = RawTable::load(path, delimiter, encoding)
            .with_context(|| format!("Loading {path:?}"))?;
        info!(
            "Loaded {} row(s) and {} column(s) from {:?}",
            raw.row_count(),
            raw.headers().len(),
            path
        );
        Session::from_raw(raw, config)
    }

    pub fn from_raw(mut raw: RawTable, config: &SessionConfig) -> Result<Self> {
        if let Some(limit) = config.limit {
            raw.truncate(limit);
        }
        let mapping = resolve_mapping(&raw, config)?;
        let table = match (config.seed, config.now) {
            (Some(seed), Some(now)) => {
                Normalizer::seeded(seed, FixedClock(now)).normalize(&raw, &mapping)
            }
            (Some(seed), None) => Normalizer::seeded(seed, SystemClock).normalize(&raw, &mapping),
            (None, Some(now)) => {
                Normalizer::new(rand::thread_rng(), FixedClock(now)).normalize(&raw, &mapping)
            }
            (None, None) => Normalizer::from_entropy().normalize(&raw, &mapping),
        };
        Ok(Session {
            raw,
            mapping,
            table,
        })
    }
}

/// Detects roles with the configured vocabulary, then applies overrides.
pub fn resolve_mapping(raw: &RawTable, config: &SessionConfig) -> Result<RoleMapping> {
    let mut mapping = detect(raw.headers(), &config.vocabulary);
    mapping
        .apply_overrides(&config.overrides, raw.headers())
        .context("Applying mapping overrides")?;
    for (role, column) in mapping.iter() {
        debug!("Role '{role}' -> column '{column}'");
    }
    Ok(mapping)
}
