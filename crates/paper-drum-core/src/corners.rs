//! Sheet corner resolution from raw corner-marker candidates.
//!
//! The candidate extractor is noisy: besides the four printed corner marks it
//! reports pad outlines, finger blobs and the odd reflection. Resolution is:
//!
//! 1. drop non-finite candidates and keep the `max_candidates` strongest,
//! 2. pick the 4-subset with the largest spread (sum of pairwise squared
//!    distances), which favours the outer corners over interior noise,
//! 3. assign TL/TR/BR/BL by the sum/difference rule.
//!
//! Step 2 is an exhaustive search, C(6, 4) = 15 subsets at the default cap.

use crate::SheetCorners;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// One raw corner-marker candidate in source-frame pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CornerCandidate {
    pub position: Point2<f64>,
    /// Detection confidence or blob area; larger is stronger.
    #[serde(default = "default_strength")]
    pub strength: f64,
}

fn default_strength() -> f64 {
    1.0
}

impl CornerCandidate {
    pub fn new(x: f64, y: f64, strength: f64) -> Self {
        Self {
            position: Point2::new(x, y),
            strength,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CornerResolveParams {
    /// Keep only the strongest N candidates before the subset search.
    pub max_candidates: usize,
}

impl Default for CornerResolveParams {
    fn default() -> Self {
        Self { max_candidates: 6 }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CornerResolveError {
    #[error("need at least 4 corner candidates, got {got} usable of {supplied}")]
    TooFewCandidates { supplied: usize, got: usize },
    #[error("corner roles are ambiguous: one candidate matches several sheet corners")]
    AmbiguousOrdering,
}

// Indices of the strongest finite candidates, capped. Stable on ties.
fn prune_candidates(candidates: &[CornerCandidate], cap: usize) -> Vec<usize> {
    let mut idx: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.position.x.is_finite() && c.position.y.is_finite())
        .map(|(i, _)| i)
        .collect();

    if idx.len() > cap {
        idx.sort_by(|&a, &b| {
            let sa = strength_key(candidates[a].strength);
            let sb = strength_key(candidates[b].strength);
            sb.total_cmp(&sa)
        });
        idx.truncate(cap);
        // Restore input order so later tie-breaks follow the caller's order.
        idx.sort_unstable();
    }
    idx
}

fn strength_key(s: f64) -> f64 {
    if s.is_nan() {
        f64::NEG_INFINITY
    } else {
        s
    }
}

fn spread(pts: [Point2<f64>; 4]) -> f64 {
    let mut acc = 0.0;
    for i in 0..4 {
        for j in (i + 1)..4 {
            acc += (pts[i] - pts[j]).norm_squared();
        }
    }
    acc
}

// 4-subset of `pool` with the largest spread, kept in pool order.
fn select_widest_four(candidates: &[CornerCandidate], pool: &[usize]) -> Option<[usize; 4]> {
    let n = pool.len();
    let mut best: Option<([usize; 4], f64)> = None;
    for a in 0..n {
        for b in (a + 1)..n {
            for c in (b + 1)..n {
                for d in (c + 1)..n {
                    let subset = [pool[a], pool[b], pool[c], pool[d]];
                    let score = spread(subset.map(|i| candidates[i].position));
                    if best.map_or(true, |(_, s)| score > s) {
                        best = Some((subset, score));
                    }
                }
            }
        }
    }
    best.map(|(subset, _)| subset)
}

// First index (in subset order) minimizing / maximizing `key`.
fn arg_extreme(pts: &[Point2<f64>; 4], key: impl Fn(&Point2<f64>) -> f64, max: bool) -> usize {
    let mut best = 0;
    for k in 1..4 {
        let (cur, cand) = (key(&pts[best]), key(&pts[k]));
        if (max && cand > cur) || (!max && cand < cur) {
            best = k;
        }
    }
    best
}

fn order_corners(pts: [Point2<f64>; 4]) -> Result<SheetCorners, CornerResolveError> {
    let tl = arg_extreme(&pts, |p| p.x + p.y, false);
    let br = arg_extreme(&pts, |p| p.x + p.y, true);
    let tr = arg_extreme(&pts, |p| p.x - p.y, true);
    let bl = arg_extreme(&pts, |p| p.x - p.y, false);

    let mut seen = [false; 4];
    for role in [tl, tr, br, bl] {
        if std::mem::replace(&mut seen[role], true) {
            return Err(CornerResolveError::AmbiguousOrdering);
        }
    }

    Ok(SheetCorners {
        top_left: pts[tl],
        top_right: pts[tr],
        bottom_right: pts[br],
        bottom_left: pts[bl],
    })
}

/// Pick and order the four sheet corners from raw candidates.
///
/// On failure nothing is produced; callers keep whatever calibration they
/// had before.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(candidates, params), fields(candidates = candidates.len()))
)]
pub fn resolve_sheet_corners(
    candidates: &[CornerCandidate],
    params: &CornerResolveParams,
) -> Result<SheetCorners, CornerResolveError> {
    let pool = prune_candidates(candidates, params.max_candidates.max(4));
    let too_few = CornerResolveError::TooFewCandidates {
        supplied: candidates.len(),
        got: pool.len(),
    };
    if pool.len() < 4 {
        return Err(too_few);
    }

    let subset = select_widest_four(candidates, &pool).ok_or(too_few)?;
    log::debug!(
        "corner subset {:?} selected from {} candidates",
        subset,
        pool.len()
    );
    order_corners(subset.map(|i| candidates[i].position))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet_like() -> Vec<CornerCandidate> {
        vec![
            CornerCandidate::new(520.0, 410.0, 30.0), // BR
            CornerCandidate::new(300.0, 240.0, 12.0), // interior pad ring
            CornerCandidate::new(95.0, 80.0, 28.0),   // TL
            CornerCandidate::new(540.0, 70.0, 26.0),  // TR
            CornerCandidate::new(330.0, 200.0, 8.0),  // fingertip blob
            CornerCandidate::new(110.0, 430.0, 25.0), // BL
        ]
    }

    fn expected() -> SheetCorners {
        SheetCorners {
            top_left: Point2::new(95.0, 80.0),
            top_right: Point2::new(540.0, 70.0),
            bottom_right: Point2::new(520.0, 410.0),
            bottom_left: Point2::new(110.0, 430.0),
        }
    }

    #[test]
    fn picks_outer_corners_over_interior_noise() {
        let got = resolve_sheet_corners(&sheet_like(), &CornerResolveParams::default())
            .expect("resolvable");
        assert_eq!(got, expected());
    }

    #[test]
    fn invariant_to_candidate_order() {
        let params = CornerResolveParams::default();
        let base = sheet_like();
        let mut rotated = base.clone();
        for _ in 0..base.len() {
            rotated.rotate_left(1);
            let got = resolve_sheet_corners(&rotated, &params).expect("resolvable");
            assert_eq!(got, expected());
        }
        let mut reversed = base;
        reversed.reverse();
        assert_eq!(
            resolve_sheet_corners(&reversed, &params).expect("resolvable"),
            expected()
        );
    }

    #[test]
    fn deterministic_for_identical_input() {
        let params = CornerResolveParams::default();
        let a = resolve_sheet_corners(&sheet_like(), &params);
        let b = resolve_sheet_corners(&sheet_like(), &params);
        assert_eq!(a, b);
    }

    #[test]
    fn weak_candidates_are_pruned_beyond_the_cap() {
        let mut cands = sheet_like();
        // A far-away but weak outlier would win the spread search if kept.
        cands.push(CornerCandidate::new(2000.0, 2000.0, 0.5));
        cands.push(CornerCandidate::new(320.0, 250.0, 9.0));
        let got = resolve_sheet_corners(&cands, &CornerResolveParams::default())
            .expect("resolvable");
        assert_eq!(got, expected());
    }

    #[test]
    fn fewer_than_four_fails() {
        let params = CornerResolveParams::default();
        for n in 0..4 {
            let cands: Vec<_> = sheet_like().into_iter().take(n).collect();
            let err = resolve_sheet_corners(&cands, &params).unwrap_err();
            assert_eq!(
                err,
                CornerResolveError::TooFewCandidates {
                    supplied: n,
                    got: n
                }
            );
        }
    }

    #[test]
    fn non_finite_candidates_do_not_count() {
        let cands = vec![
            CornerCandidate::new(0.0, 0.0, 1.0),
            CornerCandidate::new(100.0, 0.0, 1.0),
            CornerCandidate::new(100.0, f64::NAN, 1.0),
            CornerCandidate::new(0.0, 100.0, 1.0),
        ];
        let err = resolve_sheet_corners(&cands, &CornerResolveParams::default()).unwrap_err();
        assert_eq!(
            err,
            CornerResolveError::TooFewCandidates {
                supplied: 4,
                got: 3
            }
        );
    }

    #[test]
    fn diamond_layout_is_ambiguous() {
        // Rotated 45 degrees: the top vertex is both min(x+y) and max(x-y).
        let cands = vec![
            CornerCandidate::new(100.0, 0.0, 1.0),
            CornerCandidate::new(200.0, 100.0, 1.0),
            CornerCandidate::new(100.0, 200.0, 1.0),
            CornerCandidate::new(0.0, 100.0, 1.0),
        ];
        let res = resolve_sheet_corners(&cands, &CornerResolveParams::default());
        assert!(res.is_err());
    }

    #[test]
    fn candidate_strength_defaults_when_missing() {
        let c: CornerCandidate =
            serde_json::from_str(r#"{"position":[3.0,4.0]}"#).expect("parse");
        assert_eq!(c.strength, 1.0);
        assert_eq!(c.position, Point2::new(3.0, 4.0));
    }
}
