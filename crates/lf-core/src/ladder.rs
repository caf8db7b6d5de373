//! Resolution ladder: rung catalog and the per-job ladder planner.
//!
//! The [`Catalog`] is the static, ascending list of target resolutions. For
//! each job, [`plan`] selects the subsequence of the catalog that will be
//! produced, given the source's probed [`SourceDimensions`]. A rung is kept
//! when its target height is at least the source height and skipped when it
//! is strictly shorter; only height gates inclusion.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{Error, Result};

/// One target resolution tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rung {
    /// Display label, also used as the rung's directory and file name.
    pub label: String,
    /// Target width in pixels.
    pub width: u32,
    /// Target height in pixels.
    pub height: u32,
}

impl Rung {
    pub fn new(label: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            label: label.into(),
            width,
            height,
        }
    }
}

impl fmt::Display for Rung {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}x{})", self.label, self.width, self.height)
    }
}

/// Intrinsic dimensions of a source's first video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceDimensions {
    pub width: u32,
    pub height: u32,
}

impl SourceDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for SourceDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Validated rung catalog, ordered ascending by height.
///
/// Catalog order is processing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Rung>", into = "Vec<Rung>")]
pub struct Catalog(Vec<Rung>);

impl Catalog {
    /// Build a catalog, rejecting empty or unsafe labels, duplicate labels,
    /// zero dimensions, and heights that are not strictly ascending.
    pub fn new(rungs: Vec<Rung>) -> Result<Self> {
        let mut labels = HashSet::new();
        let mut prev_height: Option<u32> = None;

        for rung in &rungs {
            let label = rung.label.as_str();
            if label.is_empty()
                || label == "."
                || label == ".."
                || label.contains(['/', '\\', '\0'])
            {
                return Err(Error::Validation(format!(
                    "rung label {label:?} is not a valid directory name"
                )));
            }
            if !labels.insert(label) {
                return Err(Error::Validation(format!("duplicate rung label {label:?}")));
            }
            if rung.width == 0 || rung.height == 0 {
                return Err(Error::Validation(format!(
                    "rung {label:?} has a zero dimension"
                )));
            }
            if let Some(prev) = prev_height {
                if rung.height <= prev {
                    return Err(Error::Validation(format!(
                        "rung {label:?} height {} is not above the previous rung's {prev}",
                        rung.height
                    )));
                }
            }
            prev_height = Some(rung.height);
        }

        Ok(Self(rungs))
    }

    /// The default 480p / 720p / 1080p catalog.
    pub fn standard() -> Self {
        Self(vec![
            Rung::new("480p", 854, 480),
            Rung::new("720p", 1280, 720),
            Rung::new("1080p", 1920, 1080),
        ])
    }

    pub fn rungs(&self) -> &[Rung] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Plan the ladder for a source against this catalog.
    pub fn plan(&self, dims: SourceDimensions) -> Vec<Rung> {
        plan(dims, &self.0)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<Vec<Rung>> for Catalog {
    type Error = Error;

    fn try_from(rungs: Vec<Rung>) -> Result<Self> {
        Self::new(rungs)
    }
}

impl From<Catalog> for Vec<Rung> {
    fn from(catalog: Catalog) -> Self {
        catalog.0
    }
}

/// Compute the ladder for one job.
///
/// Iterates `catalog` in order and keeps every rung whose height is at least
/// `dims.height`. Pure: the result depends only on the arguments. An empty
/// result is a valid plan.
pub fn plan(dims: SourceDimensions, catalog: &[Rung]) -> Vec<Rung> {
    catalog
        .iter()
        .filter(|rung| rung.height >= dims.height)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(ladder: &[Rung]) -> Vec<&str> {
        ladder.iter().map(|r| r.label.as_str()).collect()
    }

    #[test]
    fn keeps_rungs_at_or_above_source_height() {
        let catalog = Catalog::standard();
        assert_eq!(
            labels(&catalog.plan(SourceDimensions::new(640, 360))),
            ["480p", "720p", "1080p"]
        );
        assert_eq!(
            labels(&catalog.plan(SourceDimensions::new(854, 480))),
            ["480p", "720p", "1080p"]
        );
        assert_eq!(
            labels(&catalog.plan(SourceDimensions::new(1280, 720))),
            ["720p", "1080p"]
        );
        assert_eq!(
            labels(&catalog.plan(SourceDimensions::new(1920, 1080))),
            ["1080p"]
        );
    }

    #[test]
    fn source_taller_than_every_rung_yields_empty_ladder() {
        let catalog = Catalog::new(vec![Rung::new("480p", 854, 480)]).unwrap();
        assert!(catalog.plan(SourceDimensions::new(1920, 1080)).is_empty());
        assert!(Catalog::standard()
            .plan(SourceDimensions::new(3840, 2160))
            .is_empty());
    }

    #[test]
    fn width_does_not_gate_inclusion() {
        let catalog = Catalog::standard();
        // Ultra-wide source: only height matters.
        assert_eq!(
            labels(&catalog.plan(SourceDimensions::new(5000, 700))),
            ["720p", "1080p"]
        );
    }

    #[test]
    fn plan_is_deterministic() {
        let catalog = Catalog::standard();
        let dims = SourceDimensions::new(1280, 600);
        let first = catalog.plan(dims);
        let _ = catalog.plan(SourceDimensions::new(1, 1));
        let second = plan(dims, catalog.rungs());
        assert_eq!(first, second);
    }

    #[test]
    fn empty_catalog_plans_nothing() {
        let catalog = Catalog::new(vec![]).unwrap();
        assert!(catalog.plan(SourceDimensions::new(1, 1)).is_empty());
    }

    #[test]
    fn catalog_rejects_descending_heights() {
        let err = Catalog::new(vec![
            Rung::new("720p", 1280, 720),
            Rung::new("480p", 854, 480),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("480p"));
    }

    #[test]
    fn catalog_rejects_equal_heights() {
        assert!(Catalog::new(vec![
            Rung::new("480p", 854, 480),
            Rung::new("480w", 1000, 480),
        ])
        .is_err());
    }

    #[test]
    fn catalog_rejects_bad_labels_and_dimensions() {
        assert!(Catalog::new(vec![Rung::new("", 854, 480)]).is_err());
        assert!(Catalog::new(vec![Rung::new("../x", 854, 480)]).is_err());
        assert!(Catalog::new(vec![Rung::new("zero", 0, 480)]).is_err());
        assert!(Catalog::new(vec![
            Rung::new("a", 10, 10),
            Rung::new("a", 20, 20),
        ])
        .is_err());
    }

    #[test]
    fn catalog_deserializes_with_validation() {
        let ok: Catalog = serde_json::from_str(
            r#"[{"label":"360p","width":640,"height":360},{"label":"720p","width":1280,"height":720}]"#,
        )
        .unwrap();
        assert_eq!(ok.len(), 2);

        let bad = serde_json::from_str::<Catalog>(
            r#"[{"label":"720p","width":1280,"height":720},{"label":"360p","width":640,"height":360}]"#,
        );
        assert!(bad.is_err());
    }
}
