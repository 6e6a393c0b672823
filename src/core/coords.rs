//! Coordinate conversion utilities
//!
//! Slice/index normalization, ordered-location validation, and the batch
//! gap-array math shared by both map representations.

use crate::core::error::{CoordError, CoordResult};
use crate::core::explicit::ExplicitSpanMap;
use crate::core::span::{LostSpan, MapElement, Span};

/// A slice request with optional bounds and stride
///
/// `start`/`stop` default to the full extent; negative values wrap once
/// against the target length. Any stride other than 1 is rejected with
/// [`CoordError::UnsupportedStride`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SliceSpec {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl SliceSpec {
    pub fn new(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        Self { start, stop, step }
    }

    /// Shorthand for a plain `[lo, hi)` request
    pub fn range(lo: i64, hi: i64) -> Self {
        Self {
            start: Some(lo),
            stop: Some(hi),
            step: None,
        }
    }

    fn check_step(&self) -> CoordResult<()> {
        match self.step {
            None | Some(1) => Ok(()),
            Some(step) => Err(CoordError::UnsupportedStride { step }),
        }
    }

    /// Normalize against `length`, clamping both bounds into `[0, length]`
    pub fn bounds_clamped(&self, length: i64) -> CoordResult<(i64, i64)> {
        self.check_step()?;
        let lo = clamp_index(self.start.unwrap_or(0), length);
        let hi = clamp_index(self.stop.unwrap_or(length), length);
        Ok((lo, hi))
    }

    /// Normalize against `length` without clamping; a bound still
    /// negative after wrapping is out of range
    pub fn bounds_exact(&self, length: i64) -> CoordResult<(i64, i64)> {
        self.check_step()?;
        let lo = wrap_index(self.start.unwrap_or(0), length)?;
        let hi = wrap_index(self.stop.unwrap_or(length), length)?;
        Ok((lo, hi))
    }
}

/// Wrap a possibly-negative index once and clamp into `[0, length]`
pub fn clamp_index(i: i64, length: i64) -> i64 {
    let i = if i < 0 { i + length } else { i };
    i.clamp(0, length)
}

/// Wrap a possibly-negative index once; negative beyond `-length` fails
pub fn wrap_index(i: i64, length: i64) -> CoordResult<i64> {
    let wrapped = if i < 0 { i + length } else { i };
    if wrapped < 0 {
        return Err(CoordError::IndexOutOfRange { index: i, length });
    }
    Ok(wrapped)
}

/// The kinds of argument a map can be composed with
///
/// Resolved into an [`ExplicitSpanMap`] before composition, replacing
/// open-ended runtime type inspection with an enumerated request kind.
#[derive(Debug, Clone)]
pub enum MapRequest {
    /// A single position, selecting `[i, i + 1)`
    Point(i64),
    /// A contiguous sub-range
    Range(SliceSpec),
    /// Several sub-ranges, concatenated in order
    Ranges(Vec<SliceSpec>),
    /// An already-built map in the target's coordinate space
    Map(ExplicitSpanMap),
}

impl MapRequest {
    /// Resolve this request against a space of `length` positions
    pub fn resolve(self, length: i64) -> CoordResult<ExplicitSpanMap> {
        match self {
            MapRequest::Point(i) => {
                let i = wrap_index(i, length)?;
                if i >= length {
                    return Err(CoordError::IndexOutOfRange { index: i, length });
                }
                ExplicitSpanMap::from_locations(&[(i, i + 1)], length)
            }
            MapRequest::Range(spec) => {
                let (lo, hi) = spec.bounds_clamped(length)?;
                // with stride disallowed, a reverse slice is an empty series
                let locations: Vec<(i64, i64)> = if lo > hi { vec![] } else { vec![(lo, hi)] };
                ExplicitSpanMap::from_locations(&locations, length)
            }
            MapRequest::Ranges(specs) => {
                let mut elements = Vec::new();
                for spec in specs {
                    let resolved = MapRequest::Range(spec).resolve(length)?;
                    elements.extend_from_slice(resolved.elements());
                }
                Ok(ExplicitSpanMap::from_spans(elements, length))
            }
            MapRequest::Map(map) => Ok(map),
        }
    }
}

/// Validate ordered `(start, end)` locations and turn them into elements
///
/// Locations must be ascending and non-negative. A start beyond
/// `parent_length` is a structural rejection; an end beyond it is clipped
/// with the excess recorded as a lost run.
pub fn spans_from_locations(
    locations: &[(i64, i64)],
    parent_length: i64,
) -> CoordResult<Vec<MapElement>> {
    if locations.is_empty() {
        return Ok(Vec::new());
    }

    if locations[0].0 > locations[locations.len() - 1].1 {
        return Err(CoordError::invalid(format!(
            "locations must be ordered smallest -> largest: {locations:?}"
        )));
    }

    let mut elements = Vec::with_capacity(locations.len());
    for &(start, end) in locations {
        if start > end || start.min(end) < 0 {
            return Err(CoordError::invalid(
                "locations must be ordered smallest -> largest and >= 0",
            ));
        }
        if start > parent_length {
            return Err(CoordError::OutsideParent {
                start,
                end,
                parent_length,
            });
        }
        if end > parent_length {
            elements.push(MapElement::Span(Span::new(start, parent_length)));
            elements.push(MapElement::Lost(LostSpan::new(end - parent_length)));
        } else {
            elements.push(MapElement::Span(Span::new(start, end)));
        }
    }

    Ok(elements)
}

/// Extract `(gap_pos, cum_gap_lengths)` from an ordered element sequence
///
/// The insertion point of each lost run is the sequence offset where it
/// starts; lost runs that touch accumulate into one entry.
pub fn spans_to_gap_coords(elements: &[MapElement]) -> (Vec<i64>, Vec<i64>) {
    let mut gap_pos = Vec::new();
    let mut cum_lengths = Vec::new();
    let mut cum_length = 0;
    let mut last_end = 0;
    for element in elements {
        match element {
            MapElement::Span(span) => last_end = span.end(),
            MapElement::Lost(lost) => {
                cum_length += lost.length();
                if gap_pos.last() == Some(&last_end) {
                    if let Some(last) = cum_lengths.last_mut() {
                        *last = cum_length;
                    }
                } else {
                    gap_pos.push(last_end);
                    cum_lengths.push(cum_length);
                }
            }
        }
    }
    (gap_pos, cum_lengths)
}

/// Per-gap `(start, end)` extents in alignment coordinates
pub fn gap_alignment_spans(gap_pos: &[i64], cum_gap_lengths: &[i64]) -> (Vec<i64>, Vec<i64>) {
    let starts: Vec<i64> = gap_pos
        .iter()
        .enumerate()
        .map(|(i, &pos)| pos + if i > 0 { cum_gap_lengths[i - 1] } else { 0 })
        .collect();
    let ends: Vec<i64> = gap_pos
        .iter()
        .zip(cum_gap_lengths)
        .map(|(&pos, &cum)| pos + cum)
        .collect();
    (starts, ends)
}
