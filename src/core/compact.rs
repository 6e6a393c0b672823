//! Run-length-encoded sequence/alignment coordinate map
//!
//! [`CompactGapMap`] stores the gaps of an aligned sequence as two
//! parallel arrays: `gap_pos`, the sequence coordinate at which each gap
//! run is inserted, and `cum_gap_lengths`, the running total of gap
//! length through each run. This keeps genome-scale maps at O(gap-count)
//! memory with O(log gap-count) position conversion either way.
//!
//! Sequence/alignment objects hold one of these per gapped sequence and
//! delegate all gap arithmetic to it. The arrays are immutable once
//! built; every transformation returns a fresh instance.

use std::collections::BTreeMap;
use std::fmt;

use crate::core::coords::{
    gap_alignment_spans, spans_from_locations, spans_to_gap_coords, SliceSpec,
};
use crate::core::error::{CoordError, CoordResult};
use crate::core::explicit::ExplicitSpanMap;
use crate::core::span::{LostSpan, MapElement, Span};

/// Compact gap map between sequence and alignment coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct CompactGapMap {
    gap_pos: Vec<i64>,
    cum_gap_lengths: Vec<i64>,
    parent_length: i64,
    termini_unknown: bool,
}

impl CompactGapMap {
    /// Build from a validated raw triple
    ///
    /// `gap_pos` must be strictly ascending within `[0, parent_length]`
    /// and `cum_gap_lengths` strictly increasing with the same length.
    pub fn new(
        gap_pos: Vec<i64>,
        cum_gap_lengths: Vec<i64>,
        parent_length: i64,
    ) -> CoordResult<Self> {
        if gap_pos.len() != cum_gap_lengths.len() {
            return Err(CoordError::invalid(format!(
                "length of gap_pos {} != length of cum_gap_lengths {}",
                gap_pos.len(),
                cum_gap_lengths.len()
            )));
        }
        if parent_length < 0 {
            return Err(CoordError::invalid(format!(
                "negative parent_length {parent_length}"
            )));
        }
        if let Some(&first) = gap_pos.first() {
            if first < 0 {
                return Err(CoordError::invalid(format!("negative gap position {first}")));
            }
            if cum_gap_lengths[0] <= 0 {
                return Err(CoordError::invalid(format!(
                    "non-positive cumulative gap length {}",
                    cum_gap_lengths[0]
                )));
            }
        }
        for pair in gap_pos.windows(2) {
            if pair[1] <= pair[0] {
                return Err(CoordError::invalid(format!(
                    "gap positions not strictly ascending: {} then {}",
                    pair[0], pair[1]
                )));
            }
        }
        for pair in cum_gap_lengths.windows(2) {
            if pair[1] <= pair[0] {
                return Err(CoordError::invalid(format!(
                    "cumulative gap lengths not strictly increasing: {} then {}",
                    pair[0], pair[1]
                )));
            }
        }
        if let Some(&last) = gap_pos.last() {
            if last > parent_length {
                return Err(CoordError::invalid(format!(
                    "gap position {last} outside parent_length {parent_length}"
                )));
            }
        }
        Ok(Self {
            gap_pos,
            cum_gap_lengths,
            parent_length,
            termini_unknown: false,
        })
    }

    /// Build from per-run gap lengths; zero-length runs are dropped
    pub fn from_gap_lengths(
        gap_pos: Vec<i64>,
        gap_lengths: Vec<i64>,
        parent_length: i64,
    ) -> CoordResult<Self> {
        if gap_pos.len() != gap_lengths.len() {
            return Err(CoordError::invalid(format!(
                "length of gap_pos {} != length of gap_lengths {}",
                gap_pos.len(),
                gap_lengths.len()
            )));
        }
        let mut pos = Vec::with_capacity(gap_pos.len());
        let mut cum = Vec::with_capacity(gap_pos.len());
        let mut total = 0;
        for (&p, &length) in gap_pos.iter().zip(&gap_lengths) {
            if length < 0 {
                return Err(CoordError::invalid(format!("negative gap length {length}")));
            }
            if length == 0 {
                continue;
            }
            total += length;
            pos.push(p);
            cum.push(total);
        }
        Self::new(pos, cum, parent_length)
    }

    /// Build from a `(gap position, gap length)` table
    pub fn from_gap_table(table: &[(i64, i64)], parent_length: i64) -> CoordResult<Self> {
        let mut table = table.to_vec();
        table.sort_unstable();
        let (pos, lengths) = table.into_iter().unzip();
        Self::from_gap_lengths(pos, lengths, parent_length)
    }

    /// Build by scanning an ordered element sequence for lost runs
    pub fn from_spans(elements: &[MapElement], parent_length: i64) -> CoordResult<Self> {
        let (gap_pos, cum_gap_lengths) = spans_to_gap_coords(elements);
        Self::new(gap_pos, cum_gap_lengths, parent_length)
    }

    /// Build from validated ordered `(start, end)` locations
    ///
    /// An end beyond `parent_length` clips, with the excess becoming a
    /// trailing gap run.
    pub fn from_locations(locations: &[(i64, i64)], parent_length: i64) -> CoordResult<Self> {
        let elements = spans_from_locations(locations, parent_length)?;
        Self::from_spans(&elements, parent_length)
    }

    /// Build from ordered ungapped-segment extents in alignment
    /// coordinates
    ///
    /// Boundary gap runs are synthesized if the segments start or end
    /// mid-alignment.
    pub fn from_aligned_segments(
        locations: &[(i64, i64)],
        aligned_length: i64,
    ) -> CoordResult<Self> {
        if locations.is_empty()
            || (locations.len() == 1 && locations[0] == (0, aligned_length))
        {
            return Self::new(Vec::new(), Vec::new(), aligned_length);
        }

        let mut segments = locations.to_vec();
        if segments[0].0 != 0 {
            // starts with a gap
            segments.insert(0, (0, 0));
        }
        if segments[segments.len() - 1].1 < aligned_length {
            // ends with a gap
            segments.push((aligned_length, aligned_length));
        }

        let mut gap_pos = Vec::new();
        let mut cum = Vec::new();
        let mut total = 0;
        for pair in segments.windows(2) {
            let gap_length = pair[1].0 - pair[0].1;
            if gap_length < 0 {
                return Err(CoordError::invalid(format!(
                    "aligned segments out of order: {:?} then {:?}",
                    pair[0], pair[1]
                )));
            }
            if gap_length == 0 {
                continue;
            }
            // alignment start of the gap minus all gaps before it is the
            // sequence insertion point
            gap_pos.push(pair[0].1 - total);
            total += gap_length;
            cum.push(total);
        }

        Self::new(gap_pos, cum, aligned_length - total)
    }

    pub fn gap_pos(&self) -> &[i64] {
        &self.gap_pos
    }

    pub fn cum_gap_lengths(&self) -> &[i64] {
        &self.cum_gap_lengths
    }

    pub fn parent_length(&self) -> i64 {
        self.parent_length
    }

    pub fn termini_unknown(&self) -> bool {
        self.termini_unknown
    }

    pub fn num_gaps(&self) -> usize {
        self.gap_pos.len()
    }

    /// Sum of all gap run lengths
    pub fn total_gap_length(&self) -> i64 {
        self.cum_gap_lengths.last().copied().unwrap_or(0)
    }

    /// Total (alignment) length: `parent_length + total_gap_length`
    pub fn len(&self) -> i64 {
        self.parent_length + self.total_gap_length()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Alignment start of gap run `index`
    fn gap_start_at(&self, index: usize) -> i64 {
        self.gap_pos[index] + if index > 0 { self.cum_gap_lengths[index - 1] } else { 0 }
    }

    /// Alignment end of gap run `index`
    fn gap_end_at(&self, index: usize) -> i64 {
        self.gap_pos[index] + self.cum_gap_lengths[index]
    }

    /// Index of the first gap run whose alignment end reaches `align_index`
    ///
    /// Gap ends are strictly increasing, so a plain binary search works
    /// without materializing them.
    fn gap_run_reaching(&self, align_index: i64) -> usize {
        let mut lo = 0;
        let mut hi = self.num_gaps();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.gap_end_at(mid) < align_index {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Per-run gap lengths, recovered from the running totals
    pub fn gap_lengths(&self) -> Vec<i64> {
        let mut lengths = self.cum_gap_lengths.clone();
        for i in (1..lengths.len()).rev() {
            lengths[i] -= lengths[i - 1];
        }
        lengths
    }

    /// Convert a sequence index into an alignment index
    ///
    /// Negative indices wrap once; beyond `-parent_length` is out of
    /// range. When `seq_index` equals a gap insertion point the result
    /// is the coordinate after that gap run, unless `slice_stop` is set,
    /// in which case it is the coordinate before the run — so a
    /// half-open slice end does not swallow the gap.
    pub fn seq_to_align(&self, seq_index: i64, slice_stop: bool) -> CoordResult<i64> {
        let original = seq_index;
        let seq_index = if seq_index < 0 {
            seq_index + self.parent_length
        } else {
            seq_index
        };
        if seq_index < 0 {
            return Err(CoordError::IndexOutOfRange {
                index: original,
                length: self.parent_length,
            });
        }

        if self.num_gaps() == 0 || seq_index < self.gap_pos[0] {
            return Ok(seq_index);
        }

        if slice_stop {
            if let Ok(idx) = self.gap_pos.binary_search(&seq_index) {
                // first alignment coordinate of this gap run
                let before = if idx > 0 { self.cum_gap_lengths[idx - 1] } else { 0 };
                return Ok(seq_index + before);
            }
        }

        if seq_index >= self.gap_pos[self.num_gaps() - 1] {
            return Ok(seq_index + self.total_gap_length());
        }

        // first insertion point >= seq_index
        let index = self.gap_pos.partition_point(|&p| p < seq_index);
        let gap_lengths = if seq_index < self.gap_pos[index] {
            if index > 0 {
                self.cum_gap_lengths[index - 1]
            } else {
                0
            }
        } else {
            self.cum_gap_lengths[index]
        };
        Ok(seq_index + gap_lengths)
    }

    /// Convert an alignment index into a sequence index
    ///
    /// An index falling strictly inside a gap run collapses to that
    /// run's insertion point, so the conversion is many-to-one there.
    pub fn align_to_seq(&self, align_index: i64) -> CoordResult<i64> {
        let original = align_index;
        let align_index = if align_index < 0 {
            align_index + self.len()
        } else {
            align_index
        };
        if align_index < 0 {
            return Err(CoordError::IndexOutOfRange {
                index: original,
                length: self.len(),
            });
        }

        if self.num_gaps() == 0 || align_index < self.gap_pos[0] {
            return Ok(align_index);
        }

        if align_index >= self.gap_end_at(self.num_gaps() - 1) {
            return Ok(align_index - self.total_gap_length());
        }

        let index = self.gap_run_reaching(align_index);
        if align_index < self.gap_start_at(index) {
            // before the gap at index
            let before = if index > 0 { self.cum_gap_lengths[index - 1] } else { 0 };
            return Ok(align_index - before);
        }
        if align_index == self.gap_end_at(index) {
            // immediately after the gap at index
            return Ok(align_index - self.cum_gap_lengths[index]);
        }
        // within the gap: collapse to its insertion point
        Ok(self.gap_pos[index])
    }

    /// Slice `[lo, hi)` of the alignment coordinate space
    ///
    /// A gap run straddling either bound is truncated to its retained
    /// portion, runs wholly outside are dropped, and retained insertion
    /// points shift so coordinate 0 is the first retained position.
    /// `lo >= hi` yields an empty map.
    pub fn slice(&self, spec: SliceSpec) -> CoordResult<Self> {
        let (start, stop) = spec.bounds_exact(self.len())?;

        if start >= stop {
            return Self::new(Vec::new(), Vec::new(), 0);
        }

        let no_gaps = Self::new(Vec::new(), Vec::new(), stop - start);
        if self.num_gaps() == 0 {
            return no_gaps;
        }

        let first_gap = self.gap_pos[0];
        let last_gap = self.gap_pos[self.num_gaps() - 1] + self.total_gap_length();
        if stop < first_gap || start >= last_gap {
            return no_gaps;
        }

        let (gap_starts, gap_ends) = gap_alignment_spans(&self.gap_pos, &self.cum_gap_lengths);
        let cum = &self.cum_gap_lengths;

        // first gap whose end reaches the slice start
        let l = gap_ends.partition_point(|&e| e < start);
        if gap_starts[l] <= start && start < gap_ends[l] && stop <= gap_ends[l] {
            // the entire slice lies within a single gap run
            return Self::new(vec![0], vec![stop - start], 0);
        }

        let mut lengths = self.gap_lengths();
        let begin;
        let shift;
        if start < first_gap {
            // before the first gap: no truncation, plain shift
            begin = 0;
            shift = start;
        } else if gap_starts[l] <= start && start < gap_ends[l] {
            // start is within a gap: insertion point survives, run shortens
            begin = l;
            let begin_diff = start - gap_starts[l];
            lengths[l] -= begin_diff;
            shift = if l > 0 {
                start - cum[l - 1] - begin_diff
            } else {
                self.gap_pos[0]
            };
        } else if start == gap_ends[l] {
            // at a gap boundary: beginning of an ungapped segment
            begin = l + 1;
            shift = start - cum[l];
        } else {
            begin = l;
            shift = if l > 0 { start - cum[l - 1] } else { start };
        }

        // search for the stop from the l-th gap onwards
        let r = l + gap_ends[l..].partition_point(|&e| e <= stop);
        let end;
        if r == self.num_gaps() {
            end = r;
        } else if gap_starts[r] < stop && stop <= gap_ends[r] {
            // stop within a gap: truncate its tail
            end = r + 1;
            lengths[r] -= gap_ends[r] - stop;
        } else {
            end = r;
        }

        let pos_result: Vec<i64> = self.gap_pos[begin..end].iter().map(|&p| p - shift).collect();
        let lengths = lengths[begin..end].to_vec();
        let parent_length = self.align_to_seq(stop)? - self.align_to_seq(start)?;

        Self::from_gap_lengths(pos_result, lengths, parent_length)
    }

    /// Concatenate two aligned maps end to end
    ///
    /// `other`'s insertion points shift by this map's parent length and
    /// its running totals by this map's total gap length; runs that meet
    /// exactly at the boundary merge into one.
    pub fn concat(&self, other: &Self) -> CoordResult<Self> {
        let mut gap_pos = self.gap_pos.clone();
        let mut cum = self.cum_gap_lengths.clone();
        let offset = self.total_gap_length();
        for (&p, &c) in other.gap_pos.iter().zip(&other.cum_gap_lengths) {
            let p = p + self.parent_length;
            if gap_pos.last() == Some(&p) {
                if let Some(last) = cum.last_mut() {
                    *last = c + offset;
                }
            } else {
                gap_pos.push(p);
                cum.push(c + offset);
            }
        }
        Self::new(gap_pos, cum, self.parent_length + other.parent_length)
    }

    /// Multiply every position and length by `scale` (amino-acid to
    /// codon projection)
    pub fn scale(&self, scale: i64) -> CoordResult<Self> {
        Self::new(
            self.gap_pos.iter().map(|&p| p * scale).collect(),
            self.cum_gap_lengths.iter().map(|&c| c * scale).collect(),
            self.parent_length * scale,
        )
    }

    /// Merge the gaps of `other`, defined on the same sequence, into
    /// this map
    ///
    /// Insertion points union; lengths add where points coincide.
    pub fn merge(&self, other: &Self, parent_length: Option<i64>) -> CoordResult<Self> {
        let mut merged: BTreeMap<i64, i64> = BTreeMap::new();
        for (&p, &length) in self.gap_pos.iter().zip(self.gap_lengths().iter()) {
            *merged.entry(p).or_insert(0) += length;
        }
        for (&p, &length) in other.gap_pos.iter().zip(other.gap_lengths().iter()) {
            *merged.entry(p).or_insert(0) += length;
        }
        let (pos, lengths) = merged.into_iter().unzip();
        Self::from_gap_lengths(pos, lengths, parent_length.unwrap_or(self.parent_length))
    }

    /// Slice out each `(start, end)` alignment sub-range and concatenate
    /// the pieces contiguously
    ///
    /// Gap runs that become adjacent at a join boundary combine; the
    /// joined map's total length equals the sum of the extracted
    /// sub-range lengths.
    pub fn join_segments(&self, ranges: &[(i64, i64)]) -> CoordResult<Self> {
        let mut ranges = ranges.to_vec();
        ranges.sort_unstable();

        // values are globally cumulative; joining can merge runs
        let mut gaps: BTreeMap<i64, i64> = BTreeMap::new();
        let mut cum_length = 0;
        let mut cum_parent_length = 0;
        for (start, end) in ranges {
            let piece = self.slice(SliceSpec::range(start, end))?;
            for i in 0..piece.num_gaps() {
                let pos = piece.gap_pos[i] + cum_parent_length;
                let base = gaps.get(&pos).copied().unwrap_or(cum_length);
                gaps.insert(pos, base + piece.cum_gap_lengths[i]);
            }
            cum_parent_length += piece.parent_length;
            cum_length += piece.total_gap_length();
        }

        let (gap_pos, cum): (Vec<i64>, Vec<i64>) = gaps.into_iter().unzip();
        Self::new(gap_pos, cum, cum_parent_length)
    }

    /// Map for the reverse complement of the underlying sequence
    ///
    /// Insertion points reflect about the parent length and reverse
    /// order; complementation replaces any notion of direction.
    pub fn reverse_complement(&self) -> CoordResult<Self> {
        let pos: Vec<i64> = self
            .gap_pos
            .iter()
            .rev()
            .map(|&p| self.parent_length - p)
            .collect();
        let lengths: Vec<i64> = self.gap_lengths().into_iter().rev().collect();
        Self::from_gap_lengths(pos, lengths, self.parent_length)
    }

    /// Lazily reconstruct the explicit element sequence
    ///
    /// Never cached: the whole point of the compact encoding is not to
    /// hold these.
    pub fn spans(&self) -> impl Iterator<Item = MapElement> + '_ {
        let n = self.num_gaps();
        let whole = if n == 0 {
            Some(MapElement::Span(Span::new(0, self.parent_length)))
        } else {
            None
        };

        let lost = move |length: i64, i: usize| {
            // only a run at the very start or very end of the alignment
            // is terminal padding
            let terminal = self.termini_unknown && (self.gap_pos[i] == 0 || i == n - 1);
            if terminal {
                MapElement::Lost(LostSpan::terminal_padding(length))
            } else {
                MapElement::Lost(LostSpan::new(length))
            }
        };

        let per_gap = (0..n).flat_map(move |i| {
            let pos = self.gap_pos[i];
            let cum_length = self.cum_gap_lengths[i];
            if pos == 0 {
                return vec![lost(cum_length, i)];
            }
            let (start, prev_length) = if i == 0 {
                (0, 0)
            } else {
                (self.gap_pos[i - 1], self.cum_gap_lengths[i - 1])
            };
            vec![
                MapElement::Span(Span::new(start, pos)),
                lost(cum_length - prev_length, i),
            ]
        });

        let tail = if n > 0 && self.gap_pos[n - 1] < self.parent_length {
            Some(MapElement::Span(Span::new(
                self.gap_pos[n - 1],
                self.parent_length,
            )))
        } else {
            None
        };

        whole.into_iter().chain(per_gap).chain(tail)
    }

    /// Ungapped segments in alignment coordinates
    pub fn nongap(&self) -> Vec<Span> {
        if self.num_gaps() == 0 {
            return vec![Span::new(0, self.len())];
        }
        let mut segments = Vec::with_capacity(self.num_gaps() + 1);
        let mut prev_pos = 0;
        for (i, &pos) in self.gap_pos.iter().enumerate() {
            if pos == 0 {
                prev_pos = pos;
                continue;
            }
            let cum_length = if i == 0 { 0 } else { self.cum_gap_lengths[i - 1] };
            let start = if i == 0 { 0 } else { prev_pos } + cum_length;
            segments.push(Span::new(start, pos + cum_length));
            prev_pos = pos;
        }
        let last_gap_end = self.gap_pos[self.num_gaps() - 1] + self.total_gap_length();
        if last_gap_end < self.len() {
            segments.push(Span::new(last_gap_end, self.len()));
        }
        segments
    }

    /// Sequence `(start, end)` coordinates of the ungapped segments
    pub fn coordinates(&self) -> Vec<(i64, i64)> {
        if self.num_gaps() == 0 {
            return vec![(0, self.parent_length)];
        }
        let mut coords = Vec::with_capacity(self.num_gaps() + 1);
        let mut prev = 0;
        for &pos in &self.gap_pos {
            if pos > prev {
                coords.push((prev, pos));
            }
            prev = pos;
        }
        if self.parent_length > prev {
            coords.push((prev, self.parent_length));
        }
        coords
    }

    /// `(insertion point, length)` of each gap run
    pub fn gap_coordinates(&self) -> Vec<(i64, i64)> {
        self.gap_pos
            .iter()
            .copied()
            .zip(self.gap_lengths())
            .collect()
    }

    /// `(start, end)` of each gap run in alignment coordinates
    pub fn gap_align_coordinates(&self) -> Vec<(i64, i64)> {
        let (starts, ends) = gap_alignment_spans(&self.gap_pos, &self.cum_gap_lengths);
        starts.into_iter().zip(ends).collect()
    }

    /// Copy with terminal gaps flagged as unknown-length padding
    pub fn with_termini_unknown(&self) -> Self {
        Self {
            gap_pos: self.gap_pos.clone(),
            cum_gap_lengths: self.cum_gap_lengths.clone(),
            parent_length: self.parent_length,
            termini_unknown: true,
        }
    }

    /// Materialize an [`ExplicitSpanMap`] view for interop
    ///
    /// One-way only: there is no conversion back.
    pub fn to_explicit(&self) -> ExplicitSpanMap {
        log::trace!(
            "materializing explicit view of {} gap runs",
            self.num_gaps()
        );
        ExplicitSpanMap::from_spans(self.spans().collect(), self.parent_length)
    }

    /// Re-express an alignment-coordinate map in sequence coordinates
    ///
    /// Lost runs in `align_map` are skipped; endpoints convert through
    /// [`CompactGapMap::align_to_seq`].
    pub fn project_to_sequence(&self, align_map: &ExplicitSpanMap) -> CoordResult<ExplicitSpanMap> {
        let mut elements = Vec::new();
        for element in align_map.elements() {
            if let MapElement::Span(span) = element {
                let start = self.align_to_seq(span.start())?;
                let end = self.align_to_seq(span.end())?;
                elements.push(MapElement::Span(Span::new(start, end)));
            }
        }
        Ok(ExplicitSpanMap::from_spans(elements, self.parent_length))
    }
}

impl fmt::Display for CompactGapMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (&pos, &cum)) in self.gap_pos.iter().zip(&self.cum_gap_lengths).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "[{pos}, {cum}]")?;
        }
        write!(f, "]/{}", self.parent_length)
    }
}
