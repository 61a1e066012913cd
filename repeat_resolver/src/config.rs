// Copyright (c) 2018 10X Genomics, Inc. All rights reserved.

//! Resolver parameters, loaded from TOML.

use crate::errors::ResolverError;
use anyhow::{Context, Result};
use log::warn;
use serde::Deserialize;
use std::path::Path;

/// Parameters of a repeat resolution run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverConfig {
    /// Depth bound of the distance search in the original graph.
    #[serde(default = "defaults::max_distance")]
    pub max_distance: usize,
    /// Slack around the trusted pair distance in the relaxed mode.
    #[serde(default = "defaults::near_vertex")]
    pub near_vertex: i64,
    /// Resolve both strands at once.  Requires a conjugate graph.
    #[serde(default = "defaults::symmetric_resolve")]
    pub symmetric_resolve: bool,
    /// Number of resolve modes to run, starting from the strictest.
    #[serde(default = "defaults::mode")]
    pub mode: usize,
    /// Occurrences of an edge longer than this are always adjacent.
    #[serde(default = "defaults::max_repeat_length")]
    pub max_repeat_length: usize,
    /// Fraction of the coverage below which a new edge is discarded.
    #[serde(default = "defaults::inresolve_cutoff_proportion")]
    pub inresolve_cutoff_proportion: f64,
    /// Library insert size.
    pub insert_size: f64,
    /// Read length.
    pub read_length: f64,
    /// Average k-mer coverage of the assembly, if known.
    #[serde(default)]
    pub avg_coverage: Option<f64>,
    /// Error-correction coverage ceiling, used when the average is unknown.
    #[serde(default = "defaults::ec_max_coverage")]
    pub ec_max_coverage: f64,
}

mod defaults {
    pub(super) fn max_distance() -> usize {
        1000
    }
    pub(super) fn near_vertex() -> i64 {
        10
    }
    pub(super) fn symmetric_resolve() -> bool {
        false
    }
    pub(super) fn mode() -> usize {
        3
    }
    pub(super) fn max_repeat_length() -> usize {
        8000
    }
    pub(super) fn inresolve_cutoff_proportion() -> f64 {
        0.2
    }
    pub(super) fn ec_max_coverage() -> f64 {
        30.0
    }
}

macro_rules! warn_non_default {
    ($cfg:expr, $($a:ident),*) => {
        $(
            if defaults::$a() != $cfg.$a {
                warn!("using non-default {} = {:?}", stringify!($a), $cfg.$a);
            }
        )*
    };
}

impl ResolverConfig {
    /// Return a configuration with default tuning for the given library.
    pub fn new(insert_size: f64, read_length: f64) -> Self {
        ResolverConfig {
            max_distance: defaults::max_distance(),
            near_vertex: defaults::near_vertex(),
            symmetric_resolve: defaults::symmetric_resolve(),
            mode: defaults::mode(),
            max_repeat_length: defaults::max_repeat_length(),
            inresolve_cutoff_proportion: defaults::inresolve_cutoff_proportion(),
            insert_size,
            read_length,
            avg_coverage: None,
            ec_max_coverage: defaults::ec_max_coverage(),
        }
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: ResolverConfig = toml::from_str(s).context("parsing resolver parameters")?;
        cfg.validate()?;
        warn_non_default!(
            cfg,
            max_distance,
            near_vertex,
            symmetric_resolve,
            mode,
            max_repeat_length,
            inresolve_cutoff_proportion,
            ec_max_coverage
        );
        Ok(cfg)
    }

    /// Read and parse a TOML configuration file.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| path.display().to_string())?;
        ResolverConfig::from_toml_str(&s).with_context(|| path.display().to_string())
    }

    /// Check that the parameters are consistent.
    pub fn validate(&self) -> Result<(), ResolverError> {
        let invalid = |msg: String| Err(ResolverError::InvalidConfig(msg));
        if !(self.insert_size > 0.0) {
            return invalid(format!("insert_size must be positive, got {}", self.insert_size));
        }
        if self.read_length < 0.0 {
            return invalid(format!("read_length must be non-negative, got {}", self.read_length));
        }
        if self.read_length > self.insert_size {
            return invalid(format!(
                "read_length {} exceeds insert_size {}",
                self.read_length, self.insert_size
            ));
        }
        if self.inresolve_cutoff_proportion < 0.0 {
            return invalid(format!(
                "inresolve_cutoff_proportion must be non-negative, got {}",
                self.inresolve_cutoff_proportion
            ));
        }
        if self.mode > 3 {
            return invalid(format!("mode must be at most 3, got {}", self.mode));
        }
        Ok(())
    }

    /// Coverage below which a newly split edge is deleted.
    pub fn cutting_coverage(&self) -> f64 {
        match self.avg_coverage {
            Some(avg) => avg * self.inresolve_cutoff_proportion / 2.0,
            None => self.ec_max_coverage * self.inresolve_cutoff_proportion,
        }
    }

    /// Distance at which paired reads are expected, insert size minus read length.
    pub fn trusted_distance(&self) -> f64 {
        self.insert_size - self.read_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let cfg =
            ResolverConfig::from_toml_str("insert_size = 300.0\nread_length = 100.0\n").unwrap();
        assert_eq!(cfg, ResolverConfig::new(300.0, 100.0));
        assert_eq!(cfg.mode, 3);
        assert!((cfg.cutting_coverage() - 6.0).abs() < 1e-12);
        assert_eq!(cfg.trusted_distance(), 200.0);
    }

    #[test]
    fn test_overrides() {
        let cfg = ResolverConfig::from_toml_str(
            "insert_size = 500.0\nread_length = 150.0\nmode = 1\n\
             avg_coverage = 40.0\nsymmetric_resolve = true\n",
        )
        .unwrap();
        assert_eq!(cfg.mode, 1);
        assert!(cfg.symmetric_resolve);
        assert!((cfg.cutting_coverage() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_input() {
        for bad in [
            "read_length = 100.0\n",
            "insert_size = 300.0\nread_length = 100.0\nfoo = 1\n",
            "insert_size = 100.0\nread_length = 300.0\n",
            "insert_size = 300.0\nread_length = 100.0\nmode = 4\n",
        ] {
            assert!(ResolverConfig::from_toml_str(bad).is_err(), "{bad}");
        }
        let mut cfg = ResolverConfig::new(300.0, 100.0);
        cfg.insert_size = 0.0;
        assert!(matches!(cfg.validate(), Err(ResolverError::InvalidConfig(_))));
    }
}
