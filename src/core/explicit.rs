//! Explicit ordered-span coordinate map
//!
//! [`ExplicitSpanMap`] holds an ordered sequence of [`MapElement`]s
//! against a parent coordinate space. It is the general representation:
//! it supports arbitrary nesting via [`ExplicitSpanMap::compose`], which
//! projects a sub-range expressed in this map's coordinates into the
//! parent frame. Annotation objects hold one of these to locate
//! themselves against a parent sequence or alignment.
//!
//! Instances are immutable value objects; every transformation returns a
//! new map.

use std::fmt;

use crate::core::coords::{spans_from_locations, MapRequest};
use crate::core::error::{CoordError, CoordResult};
use crate::core::span::{LostSpan, MapElement, Span};

/// An ordered-span map over a parent coordinate space
#[derive(Debug, Clone, PartialEq)]
pub struct ExplicitSpanMap {
    elements: Vec<MapElement>,
    parent_length: i64,
    offsets: Vec<i64>,
    length: i64,
    start: Option<i64>,
    end: Option<i64>,
    complete: bool,
}

impl ExplicitSpanMap {
    /// Build from an ordered element sequence
    ///
    /// Derived state (prefix offsets, bounding box, completeness) is
    /// computed once here and never changes.
    pub fn from_spans(elements: Vec<MapElement>, parent_length: i64) -> Self {
        let mut offsets = Vec::with_capacity(elements.len());
        let mut posn = 0;
        let mut complete = true;
        let mut start: Option<i64> = None;
        let mut end: Option<i64> = None;
        for element in &elements {
            offsets.push(posn);
            posn += element.length();
            match element {
                MapElement::Lost(_) => complete = false,
                MapElement::Span(span) => {
                    start = Some(start.map_or(span.start(), |s| s.min(span.start())));
                    end = Some(end.map_or(span.end(), |e| e.max(span.end())));
                }
            }
        }
        Self {
            elements,
            parent_length,
            offsets,
            length: posn,
            start,
            end,
            complete,
        }
    }

    /// Build from validated ordered `(start, end)` locations
    pub fn from_locations(locations: &[(i64, i64)], parent_length: i64) -> CoordResult<Self> {
        let elements = spans_from_locations(locations, parent_length)?;
        Ok(Self::from_spans(elements, parent_length))
    }

    pub fn elements(&self) -> &[MapElement] {
        &self.elements
    }

    /// Prefix sums of element lengths, for binary-search remapping
    pub fn offsets(&self) -> &[i64] {
        &self.offsets
    }

    pub fn parent_length(&self) -> i64 {
        self.parent_length
    }

    /// Total length: the sum of all element lengths
    pub fn len(&self) -> i64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Smallest non-lost start (0 if there are none)
    pub fn start(&self) -> i64 {
        self.start.unwrap_or(0)
    }

    /// Largest non-lost end (0 if there are none)
    pub fn end(&self) -> i64 {
        self.end.unwrap_or(0)
    }

    /// At least one non-lost span
    pub fn useful(&self) -> bool {
        self.start.is_some()
    }

    /// No lost spans
    pub fn complete(&self) -> bool {
        self.complete
    }

    /// Project `request`, expressed in this map's coordinate space, into
    /// this map's parent frame
    ///
    /// Every element of the resolved request is remapped through this
    /// map's spans; nested annotations flatten to one frame by composing
    /// through each parent level in turn.
    pub fn compose(&self, request: MapRequest) -> CoordResult<Self> {
        let sub = request.resolve(self.len())?;
        let mut parts = Vec::new();
        for element in sub.elements() {
            parts.extend(element.remap_with(self));
        }
        Ok(Self::from_spans(parts, self.parent_length))
    }

    /// Concatenate with a map over the same parent
    pub fn concat(&self, other: &Self) -> CoordResult<Self> {
        if other.parent_length != self.parent_length {
            return Err(CoordError::ParentMismatch {
                left: self.parent_length,
                right: other.parent_length,
            });
        }
        let mut elements = self.elements.clone();
        elements.extend_from_slice(&other.elements);
        Ok(Self::from_spans(elements, self.parent_length))
    }

    /// Scale every coordinate by `scale`
    pub fn scaled(&self, scale: i64) -> Self {
        let elements = self.elements.iter().map(|e| e.scaled(scale)).collect();
        Self::from_spans(elements, self.parent_length * scale)
    }

    /// Union of the non-lost spans as disjoint intervals
    ///
    /// A coordinate sweep: +1 at each span start, -1 at each end; a
    /// 0 -> positive transition opens a union interval and the reverse
    /// closes it.
    pub fn covered(&self) -> Self {
        use std::collections::BTreeMap;

        let mut delta: BTreeMap<i64, i64> = BTreeMap::new();
        for element in &self.elements {
            if let MapElement::Span(span) = element {
                *delta.entry(span.start()).or_insert(0) += 1;
                *delta.entry(span.end()).or_insert(0) -= 1;
            }
        }

        let mut result = Vec::new();
        let mut y = 0;
        let mut open: Option<i64> = None;
        for (x, d) in delta {
            let last_y = y;
            y += d;
            if y > 0 && last_y == 0 {
                debug_assert!(open.is_none());
                open = Some(x);
            } else if last_y > 0 && y == 0 {
                if let Some(lo) = open.take() {
                    result.push(MapElement::Span(Span::new(lo, x)));
                }
            }
        }
        debug_assert_eq!(y, 0, "unbalanced span sweep");
        Self::from_spans(result, self.parent_length)
    }

    /// Exchange the roles of parent and local coordinates
    ///
    /// Requires the non-lost spans to be pairwise non-overlapping; each
    /// one maps to its own position run in this map's local frame, with
    /// lost runs filling the holes between consecutive sorted spans and
    /// at the ends.
    pub fn invert(&self) -> CoordResult<Self> {
        let mut temp: Vec<(i64, i64, i64, i64)> = Vec::new();
        let mut posn = 0;
        for element in &self.elements {
            if let MapElement::Span(span) = element {
                if span.is_reverse() {
                    temp.push((span.start(), span.end(), posn + span.length(), posn));
                } else {
                    temp.push((span.start(), span.end(), posn, posn + span.length()));
                }
            }
            posn += element.length();
        }

        temp.sort_unstable();
        let mut new_elements = Vec::new();
        let mut last_hi = 0;
        for (lo, hi, local_start, local_end) in temp {
            if lo > last_hi {
                new_elements.push(MapElement::Lost(LostSpan::new(lo - last_hi)));
            } else if lo < last_hi {
                return Err(CoordError::NotInvertible {
                    start: lo,
                    previous_end: last_hi,
                });
            }
            new_elements.push(MapElement::Span(Span::with_attrs(
                local_start,
                Some(local_end),
                false,
                false,
                None,
                local_start > local_end,
            )));
            last_hi = hi;
        }
        if self.parent_length > last_hi {
            new_elements.push(MapElement::Lost(LostSpan::new(self.parent_length - last_hi)));
        }

        Ok(Self::from_spans(new_elements, self.len()))
    }

    /// The lost runs of this map, as spans in its own local frame
    pub fn gaps(&self) -> Self {
        let mut elements = Vec::new();
        let mut offset = 0;
        for element in &self.elements {
            if element.is_lost() {
                elements.push(MapElement::Span(Span::new(offset, offset + element.length())));
            }
            offset += element.length();
        }
        Self::from_spans(elements, self.len())
    }

    /// The non-lost runs of this map, as spans in its own local frame
    pub fn nongap(&self) -> Self {
        let mut elements = Vec::new();
        let mut offset = 0;
        for element in &self.elements {
            if !element.is_lost() {
                elements.push(MapElement::Span(Span::new(offset, offset + element.length())));
            }
            offset += element.length();
        }
        Self::from_spans(elements, self.len())
    }

    /// This map with its lost runs dropped
    pub fn without_gaps(&self) -> Self {
        let elements = self
            .elements
            .iter()
            .filter(|e| !e.is_lost())
            .cloned()
            .collect();
        Self::from_spans(elements, self.parent_length)
    }

    /// The 'negative' map: the parent positions this map leaves out
    pub fn shadow(&self) -> CoordResult<Self> {
        Ok(self.invert()?.gaps())
    }

    /// A single span covering the bounding box of this map
    pub fn covering_span(&self) -> Self {
        let elements = vec![MapElement::Span(Span::new(self.start(), self.end()))];
        Self::from_spans(elements, self.parent_length)
    }

    /// Deep copy shifted so the first non-lost position is 0
    ///
    /// Used when a sliced sub-object is detached from its original
    /// parent; the new parent length is the old bounding-box extent.
    pub fn zeroed(&self) -> Self {
        let shift = self.start();
        let new_parent_length = self.end() - self.start();
        let elements = self
            .elements
            .iter()
            .map(|element| match element {
                MapElement::Lost(_) => element.clone(),
                MapElement::Span(span) => MapElement::Span(Span::with_attrs(
                    span.start() - shift,
                    Some(span.end() - shift),
                    span.tidy_start(),
                    span.tidy_end(),
                    span.value().cloned(),
                    span.is_reverse(),
                )),
            })
            .collect();
        Self::from_spans(elements, new_parent_length)
    }

    /// Map for a parent that has itself been reverse complemented
    ///
    /// Reflects each non-lost span about the parent length and reverses
    /// element order; orientation flags are discarded because
    /// complementation replaces them.
    pub fn reverse_complement(&self) -> Self {
        let mut elements: Vec<MapElement> = self
            .elements
            .iter()
            .map(|element| match element {
                MapElement::Lost(_) => element.clone(),
                MapElement::Span(span) => {
                    let start = self.parent_length - span.end();
                    debug_assert!(start >= 0);
                    MapElement::Span(Span::new(start, start + span.length()))
                }
            })
            .collect();
        elements.reverse();
        Self::from_spans(elements, self.parent_length)
    }

    /// Convert a position in this map's local frame to the parent frame
    ///
    /// Identity when the map spans its whole parent.
    pub fn to_parent(&self, rel_pos: i64) -> CoordResult<i64> {
        if rel_pos < 0 {
            return Err(CoordError::IndexOutOfRange {
                index: rel_pos,
                length: self.len(),
            });
        }
        if self.len() == self.parent_length {
            return Ok(rel_pos);
        }
        Ok(self.start() + rel_pos)
    }

    /// Convert a position in the parent frame to this map's local frame
    ///
    /// Identity when the map spans its whole parent.
    pub fn to_local(&self, abs_pos: i64) -> CoordResult<i64> {
        if abs_pos < 0 {
            return Err(CoordError::IndexOutOfRange {
                index: abs_pos,
                length: self.parent_length,
            });
        }
        if self.len() == self.parent_length {
            return Ok(abs_pos);
        }
        Ok(abs_pos - self.start())
    }

    /// Parent `(start, end)` coordinates of the non-lost spans
    pub fn coordinates(&self) -> Vec<(i64, i64)> {
        self.elements
            .iter()
            .filter_map(|e| e.as_span().map(|s| (s.start(), s.end())))
            .collect()
    }

    /// `(insertion point, length)` of each lost run
    pub fn gap_coordinates(&self) -> Vec<(i64, i64)> {
        let mut coords = Vec::new();
        let mut last_end = 0;
        for element in &self.elements {
            match element {
                MapElement::Span(span) => last_end = span.end(),
                MapElement::Lost(lost) => coords.push((last_end, lost.length())),
            }
        }
        coords
    }
}

impl fmt::Display for ExplicitSpanMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{element}")?;
        }
        write!(f, "]/{}", self.parent_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coords::SliceSpec;
    use serde_json::json;

    fn map_from(locations: &[(i64, i64)], parent_length: i64) -> ExplicitSpanMap {
        ExplicitSpanMap::from_locations(locations, parent_length).unwrap()
    }

    #[test]
    fn test_derived_state() {
        let map = map_from(&[(10, 20), (30, 40)], 50);
        assert_eq!(map.len(), 20);
        assert_eq!(map.start(), 10);
        assert_eq!(map.end(), 40);
        assert!(map.useful());
        assert!(map.complete());
        assert_eq!(map.offsets(), &[0, 10]);
    }

    #[test]
    fn test_lost_spans_break_completeness() {
        let map = ExplicitSpanMap::from_spans(
            vec![
                MapElement::Span(Span::new(0, 5)),
                MapElement::Lost(LostSpan::new(3)),
                MapElement::Span(Span::new(5, 10)),
            ],
            10,
        );
        assert_eq!(map.len(), 13);
        assert!(!map.complete());
        assert!(map.useful());
    }

    #[test]
    fn test_covered_merges_overlaps() {
        // overlapping middle pair merges, isolated segment survives
        let map = map_from(&[(10, 20), (15, 25), (80, 90)], 100);
        let covered = map.covered();
        assert_eq!(covered.coordinates(), vec![(10, 25), (80, 90)]);
    }

    #[test]
    fn test_covered_idempotent() {
        let map = map_from(&[(10, 20), (15, 25), (80, 90)], 100);
        let once = map.covered();
        let twice = once.covered();
        assert_eq!(once.coordinates(), twice.coordinates());
    }

    #[test]
    fn test_compose_projects_subrange() {
        // feature at 10..20 on a 50-long parent; local 2..5 -> parent 12..15
        let feature = map_from(&[(10, 20)], 50);
        let nested = feature
            .compose(MapRequest::Range(SliceSpec::range(2, 5)))
            .unwrap();
        assert_eq!(nested.coordinates(), vec![(12, 15)]);
        assert_eq!(nested.parent_length(), 50);
    }

    #[test]
    fn test_compose_through_two_levels() {
        // C on B on A: flatten C to A's frame
        let b_on_a = map_from(&[(100, 200)], 1000);
        let c_on_b = map_from(&[(10, 30)], 100);
        let c_on_a = b_on_a.compose(MapRequest::Map(c_on_b)).unwrap();
        assert_eq!(c_on_a.coordinates(), vec![(110, 130)]);
    }

    #[test]
    fn test_compose_spanning_multiple_pieces() {
        let map = map_from(&[(0, 5), (10, 15)], 20);
        let projected = map
            .compose(MapRequest::Range(SliceSpec::range(3, 8)))
            .unwrap();
        // crosses the piece boundary: 3..5 from the first, 10..13 from the second
        assert_eq!(projected.coordinates(), vec![(3, 5), (10, 13)]);
    }

    #[test]
    fn test_compose_point() {
        let map = map_from(&[(10, 20)], 50);
        let point = map.compose(MapRequest::Point(4)).unwrap();
        assert_eq!(point.coordinates(), vec![(14, 15)]);
        assert!(map.compose(MapRequest::Point(10)).is_err());
    }

    #[test]
    fn test_compose_ranges() {
        let map = map_from(&[(10, 30)], 50);
        let picked = map
            .compose(MapRequest::Ranges(vec![
                SliceSpec::range(0, 3),
                SliceSpec::range(5, 8),
            ]))
            .unwrap();
        assert_eq!(picked.coordinates(), vec![(10, 13), (15, 18)]);
    }

    #[test]
    fn test_compose_preserves_payload() {
        let feature = ExplicitSpanMap::from_spans(
            vec![MapElement::Span(
                Span::new(0, 10).with_value(Some(json!("exon"))),
            )],
            10,
        );
        let parent = map_from(&[(5, 15)], 20);
        let placed = parent.compose(MapRequest::Map(feature)).unwrap();
        assert_eq!(placed.elements()[0].value(), Some(&json!("exon")));
    }

    #[test]
    fn test_invert_fills_holes() {
        let map = map_from(&[(2, 4), (6, 8)], 10);
        let inverted = map.invert().unwrap();
        // parent frame 10 wide; spans land at their local runs
        assert_eq!(inverted.parent_length(), 4);
        assert_eq!(inverted.coordinates(), vec![(0, 2), (2, 4)]);
        // leading hole, middle hole, trailing hole
        assert_eq!(inverted.gap_coordinates(), vec![(0, 2), (2, 2), (4, 2)]);
    }

    #[test]
    fn test_invert_rejects_overlap() {
        let map = map_from(&[(2, 6), (4, 8)], 10);
        let err = map.invert().unwrap_err();
        assert!(matches!(err, CoordError::NotInvertible { .. }));
    }

    #[test]
    fn test_invert_involution_covers_same_positions() {
        let map = map_from(&[(2, 4), (6, 8)], 10);
        let back = map.invert().unwrap().invert().unwrap();
        assert_eq!(back.covered().coordinates(), map.covered().coordinates());
    }

    #[test]
    fn test_gaps_nongap_views() {
        let map = ExplicitSpanMap::from_spans(
            vec![
                MapElement::Lost(LostSpan::new(2)),
                MapElement::Span(Span::new(0, 3)),
                MapElement::Lost(LostSpan::new(1)),
            ],
            3,
        );
        assert_eq!(map.gaps().coordinates(), vec![(0, 2), (5, 6)]);
        assert_eq!(map.nongap().coordinates(), vec![(2, 5)]);
        let stripped = map.without_gaps();
        assert_eq!(stripped.len(), 3);
        assert!(stripped.complete());
    }

    #[test]
    fn test_shadow() {
        let map = map_from(&[(2, 4)], 10);
        let shadow = map.shadow().unwrap();
        assert_eq!(shadow.coordinates(), vec![(0, 2), (4, 10)]);
    }

    #[test]
    fn test_covering_span_bounding_box() {
        let map = map_from(&[(10, 15), (30, 40)], 50);
        let cover = map.covering_span();
        assert_eq!(cover.coordinates(), vec![(10, 40)]);
        assert_eq!(cover.parent_length(), 50);
        assert_eq!(cover.len(), 30);

        // no non-lost spans: the bounding box degenerates to a point at 0
        let lost_only =
            ExplicitSpanMap::from_spans(vec![MapElement::Lost(LostSpan::new(4))], 10);
        assert_eq!(lost_only.covering_span().coordinates(), vec![(0, 0)]);
    }

    #[test]
    fn test_zeroed_shifts_to_origin() {
        let map = map_from(&[(10, 15), (20, 25)], 50);
        let zeroed = map.zeroed();
        assert_eq!(zeroed.coordinates(), vec![(0, 5), (10, 15)]);
        assert_eq!(zeroed.parent_length(), 15);
    }

    #[test]
    fn test_reverse_complement() {
        let map = map_from(&[(2, 5)], 10);
        let rc = map.reverse_complement();
        assert_eq!(rc.coordinates(), vec![(5, 8)]);
    }

    #[test]
    fn test_position_conversions() {
        let map = map_from(&[(10, 20)], 50);
        assert_eq!(map.to_parent(3).unwrap(), 13);
        assert_eq!(map.to_local(13).unwrap(), 3);
        assert!(map.to_parent(-1).is_err());
        assert!(map.to_local(-1).is_err());

        // identity when the map covers the whole parent
        let whole = map_from(&[(0, 50)], 50);
        assert_eq!(whole.to_parent(7).unwrap(), 7);
        assert_eq!(whole.to_local(7).unwrap(), 7);
    }

    #[test]
    fn test_concat_requires_same_parent() {
        let a = map_from(&[(0, 5)], 10);
        let b = map_from(&[(5, 10)], 10);
        let joined = a.concat(&b).unwrap();
        assert_eq!(joined.len(), 10);

        let c = map_from(&[(0, 5)], 20);
        assert!(matches!(
            a.concat(&c),
            Err(CoordError::ParentMismatch { .. })
        ));
    }

    #[test]
    fn test_scaled() {
        let map = map_from(&[(1, 4)], 10);
        let codon = map.scaled(3);
        assert_eq!(codon.coordinates(), vec![(3, 12)]);
        assert_eq!(codon.parent_length(), 30);
    }

    #[test]
    fn test_display() {
        let map = ExplicitSpanMap::from_spans(
            vec![
                MapElement::Span(Span::new(0, 3)),
                MapElement::Lost(LostSpan::new(2)),
            ],
            3,
        );
        assert_eq!(map.to_string(), "[0:3, -2-]/3");
    }
}
