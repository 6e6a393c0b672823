//! Span and LostSpan interval primitives
//!
//! A [`Span`] is a half-open interval `[start, end)` on some parent
//! coordinate space. It carries an orientation flag, "tidy" markers for
//! whether each endpoint is a real boundary rather than a slicing
//! artifact, and an optional opaque payload that is preserved across
//! remapping.
//!
//! A [`LostSpan`] has a length but no position: it stands for a run of
//! positions that are absent from the parent (an alignment gap). Small
//! payload-free instances are interned through a [`LostSpanCache`].
//!
//! [`MapElement`] is the tagged union over the two, used everywhere a map
//! holds an ordered list of pieces.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::core::explicit::ExplicitSpanMap;

/// Lengths below this bound are served from the intern cache
pub const SMALL_GAP_LIMIT: i64 = 1000;

/// A contiguous location on a parent coordinate space
///
/// `start <= end` always holds numerically; the constructor swaps a
/// reversed pair. Traversal direction is recorded separately in
/// `reverse`. Instances are value objects: every transformation returns
/// a new `Span`.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    start: i64,
    end: i64,
    reverse: bool,
    tidy_start: bool,
    tidy_end: bool,
    value: Option<Value>,
}

impl Span {
    /// Create a forward span `[start, end)` with no payload
    pub fn new(start: i64, end: i64) -> Self {
        Self::with_attrs(start, Some(end), false, false, None, false)
    }

    /// Create a single-position span `[start, start + 1)`
    pub fn point(start: i64) -> Self {
        Self::with_attrs(start, None, false, false, None, false)
    }

    /// Create a span with full control over flags and payload
    ///
    /// If `end` is omitted it defaults to `start + 1`. If `start > end`
    /// the two are swapped so numeric ordering always holds; `reverse`
    /// alone encodes direction.
    pub fn with_attrs(
        start: i64,
        end: Option<i64>,
        tidy_start: bool,
        tidy_end: bool,
        value: Option<Value>,
        reverse: bool,
    ) -> Self {
        let end = end.unwrap_or(start + 1);
        let (start, end) = if start > end { (end, start) } else { (start, end) };
        debug_assert!(end - start >= 0);
        Self {
            start,
            end,
            reverse,
            tidy_start,
            tidy_end,
            value,
        }
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn length(&self) -> i64 {
        self.end - self.start
    }

    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    pub fn tidy_start(&self) -> bool {
        self.tidy_start
    }

    pub fn tidy_end(&self) -> bool {
        self.tidy_end
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Returns a copy carrying `value` as its payload
    pub fn with_value(&self, value: Option<Value>) -> Self {
        let mut span = self.clone();
        span.value = value;
        span
    }

    pub(crate) fn set_tidy(&mut self, tidy_start: Option<bool>, tidy_end: Option<bool>) {
        if let Some(t) = tidy_start {
            self.tidy_start = t;
        }
        if let Some(t) = tidy_end {
            self.tidy_end = t;
        }
    }

    /// Slice `[lo, hi)` relative to this span's own local frame
    ///
    /// Positions are relative to the span itself, not the parent; a
    /// reverse span is sliced from its far end. Negative bounds wrap,
    /// everything clamps into `[0, length]`. Tidy flags survive only if
    /// the sub-range touches the corresponding original boundary.
    pub fn slice(&self, lo: i64, hi: i64) -> Self {
        let length = self.length();
        let lo = clamp_local(lo, length);
        let hi = clamp_local(hi, length).max(lo);
        let tidy_start = self.tidy_start && lo == 0;
        let tidy_end = self.tidy_end && hi == length;
        let (start, end, reverse) = if self.reverse {
            (self.end - hi, self.end - lo, true)
        } else {
            (self.start + lo, self.start + hi, false)
        };
        Self::with_attrs(
            start,
            Some(end),
            tidy_start,
            tidy_end,
            self.value.clone(),
            reverse,
        )
    }

    /// New span with orientation toggled and tidy flags swapped
    pub fn reversed(&self) -> Self {
        Self::with_attrs(
            self.start,
            Some(self.end),
            self.tidy_end,
            self.tidy_start,
            self.value.clone(),
            !self.reverse,
        )
    }

    /// Position of this span on the reverse complement of a parent of
    /// `length`, with orientation toggled
    pub fn reversed_relative_to(&self, length: i64) -> Self {
        let start = length - self.end;
        debug_assert!(start >= 0);
        let end = start + self.length();
        Self::with_attrs(
            start,
            Some(end),
            false,
            false,
            self.value.clone(),
            !self.reverse,
        )
    }

    /// Scale both coordinates by `scale` (amino-acid to codon projection)
    pub fn scaled(&self, scale: i64) -> Self {
        Self::with_attrs(
            self.start * scale,
            Some(self.end * scale),
            self.tidy_start,
            self.tidy_end,
            self.value.clone(),
            self.reverse,
        )
    }

    /// True if `pos` lies inside the half-open interval
    pub fn contains_point(&self, pos: i64) -> bool {
        pos >= self.start && pos < self.end
    }

    /// True if `other` lies entirely within this span
    pub fn contains_span(&self, other: &Span) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// True if any positions are shared with `other`
    pub fn overlaps(&self, other: &Span) -> bool {
        self.contains_point(other.start) || other.contains_point(self.start)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (start, end) = if self.reverse {
            (self.end, self.start)
        } else {
            (self.start, self.end)
        };
        write!(f, "{start}:{end}")
    }
}

fn clamp_local(i: i64, length: i64) -> i64 {
    let i = if i < 0 { i + length } else { i };
    i.clamp(0, length)
}

#[derive(Debug)]
struct LostInner {
    length: i64,
    terminal: bool,
    value: Option<Value>,
}

/// A placeholder span which doesn't exist in the underlying sequence
///
/// Carries only a length. The `terminal` variant marks unknown-length
/// terminal padding and differs from a plain gap only in rendering.
/// Cloning is cheap; interned instances share identity, observable via
/// [`LostSpan::same_instance`].
#[derive(Debug, Clone)]
pub struct LostSpan {
    inner: Arc<LostInner>,
}

impl LostSpan {
    /// A gap of `length`, drawn from the process-wide intern cache when
    /// the length is small
    pub fn new(length: i64) -> Self {
        global_lost_span_cache().get(length)
    }

    /// A gap carrying a payload; never interned
    pub fn with_value(length: i64, value: Option<Value>) -> Self {
        if value.is_none() {
            return Self::new(length);
        }
        Self::fresh(length, false, value)
    }

    /// Unknown-length terminal padding
    pub fn terminal_padding(length: i64) -> Self {
        Self::fresh(length, true, None)
    }

    fn fresh(length: i64, terminal: bool, value: Option<Value>) -> Self {
        debug_assert!(length >= 0);
        Self {
            inner: Arc::new(LostInner {
                length,
                terminal,
                value,
            }),
        }
    }

    pub fn length(&self) -> i64 {
        self.inner.length
    }

    pub fn is_terminal(&self) -> bool {
        self.inner.terminal
    }

    pub fn value(&self) -> Option<&Value> {
        self.inner.value.as_ref()
    }

    /// Returns a gap of the same kind carrying `value`
    pub fn stamped(&self, value: Option<Value>) -> Self {
        Self::fresh(self.inner.length, self.inner.terminal, value)
    }

    /// A shorter gap covering `[lo, hi)` of this one
    pub fn slice(&self, lo: i64, hi: i64) -> Self {
        let lo = clamp_local(lo, self.inner.length);
        let hi = clamp_local(hi, self.inner.length);
        Self::fresh(
            (hi - lo).abs(),
            self.inner.terminal,
            self.inner.value.clone(),
        )
    }

    pub fn scaled(&self, scale: i64) -> Self {
        Self::fresh(
            self.inner.length * scale,
            self.inner.terminal,
            self.inner.value.clone(),
        )
    }

    /// Identity comparison: true when both handles point at the same
    /// interned instance
    pub fn same_instance(a: &LostSpan, b: &LostSpan) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl PartialEq for LostSpan {
    fn eq(&self, other: &Self) -> bool {
        self.inner.length == other.inner.length
            && self.inner.terminal == other.inner.terminal
            && self.inner.value == other.inner.value
    }
}

impl fmt::Display for LostSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inner.terminal {
            write!(f, "?{}?", self.inner.length)
        } else {
            write!(f, "-{}-", self.inner.length)
        }
    }
}

/// Intern cache for small payload-free gaps
///
/// Populated lazily and append-only; entries are never invalidated, so a
/// race during population at worst recomputes a structurally identical
/// instance. Tests can build their own cache; library constructors use
/// [`global_lost_span_cache`].
#[derive(Debug, Default)]
pub struct LostSpanCache {
    small: RwLock<HashMap<i64, LostSpan>>,
}

impl LostSpanCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch or create a gap of `length`
    pub fn get(&self, length: i64) -> LostSpan {
        if !(0..SMALL_GAP_LIMIT).contains(&length) {
            return LostSpan::fresh(length, false, None);
        }
        if let Some(span) = self
            .small
            .read()
            .expect("lost span cache poisoned")
            .get(&length)
        {
            return span.clone();
        }
        log::trace!("interning LostSpan of length {length}");
        let span = LostSpan::fresh(length, false, None);
        let mut cache = self.small.write().expect("lost span cache poisoned");
        cache.entry(length).or_insert(span).clone()
    }

    /// Number of interned lengths
    pub fn len(&self) -> usize {
        self.small.read().expect("lost span cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

static GLOBAL_LOST_SPAN_CACHE: Lazy<LostSpanCache> = Lazy::new(LostSpanCache::new);

/// The process-wide [`LostSpanCache`]
pub fn global_lost_span_cache() -> &'static LostSpanCache {
    &GLOBAL_LOST_SPAN_CACHE
}

/// One piece of a coordinate map: a real span or a lost (gap) run
#[derive(Debug, Clone, PartialEq)]
pub enum MapElement {
    Span(Span),
    Lost(LostSpan),
}

impl MapElement {
    pub fn length(&self) -> i64 {
        match self {
            MapElement::Span(s) => s.length(),
            MapElement::Lost(l) => l.length(),
        }
    }

    pub fn is_lost(&self) -> bool {
        matches!(self, MapElement::Lost(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            MapElement::Span(s) => s.value(),
            MapElement::Lost(l) => l.value(),
        }
    }

    pub fn as_span(&self) -> Option<&Span> {
        match self {
            MapElement::Span(s) => Some(s),
            MapElement::Lost(_) => None,
        }
    }

    /// Copy of this element stamped with `value`
    pub fn stamped(&self, value: Option<Value>) -> Self {
        match self {
            MapElement::Span(s) => MapElement::Span(s.with_value(value)),
            MapElement::Lost(l) => MapElement::Lost(l.stamped(value)),
        }
    }

    /// Slice `[lo, hi)` in the element's local frame
    pub fn slice(&self, lo: i64, hi: i64) -> Self {
        match self {
            MapElement::Span(s) => MapElement::Span(s.slice(lo, hi)),
            MapElement::Lost(l) => MapElement::Lost(l.slice(lo, hi)),
        }
    }

    /// Orientation toggled; a lost run is direction-free
    pub fn reversed(&self) -> Self {
        match self {
            MapElement::Span(s) => MapElement::Span(s.reversed()),
            MapElement::Lost(l) => MapElement::Lost(l.clone()),
        }
    }

    pub fn reversed_relative_to(&self, length: i64) -> Self {
        match self {
            MapElement::Span(s) => MapElement::Span(s.reversed_relative_to(length)),
            MapElement::Lost(l) => MapElement::Lost(l.clone()),
        }
    }

    pub fn scaled(&self, scale: i64) -> Self {
        match self {
            MapElement::Span(s) => MapElement::Span(s.scaled(scale)),
            MapElement::Lost(l) => MapElement::Lost(l.scaled(scale)),
        }
    }

    /// Project this element, expressed in `parent`'s coordinate space,
    /// into `parent`'s own parent frame
    ///
    /// This is the composition primitive used to flatten nested
    /// coordinates (feature on feature on sequence). The element is
    /// clipped to the parent's extent, the parent pieces it overlaps are
    /// located by binary search over the parent's prefix offsets, the
    /// boundary pieces are trimmed to the exact overlap, and any excess
    /// beyond the parent is padded with lost runs. A lost element stays
    /// lost regardless of parent.
    pub fn remap_with(&self, parent: &ExplicitSpanMap) -> Vec<MapElement> {
        let span = match self {
            MapElement::Lost(_) => return vec![self.clone()],
            MapElement::Span(s) => s,
        };

        let offsets = parent.offsets();
        let elements = parent.elements();
        let parent_total = parent.len();

        // don't remap any non-corresponding end region(s); they are padded
        // below instead
        let zlo = span.start().max(0);
        let zhi = span.end().min(parent_total);

        let mut result: Vec<MapElement> = Vec::new();
        if !elements.is_empty() && zlo < zhi {
            // first/last parent pieces overlapped by [zlo, zhi)
            let first = offsets.partition_point(|&o| o <= zlo) - 1;
            let last = offsets.partition_point(|&o| o < zhi) - 1;
            result.extend_from_slice(&elements[first..=last]);

            let end_trim = offsets[last] + elements[last].length() - zhi;
            let start_trim = zlo - offsets[first];
            if end_trim > 0 {
                if let Some(piece) = result.last_mut() {
                    *piece = piece.slice(0, piece.length() - end_trim);
                }
            }
            if start_trim > 0 {
                result[0] = result[0].slice(start_trim, result[0].length());
            }
        }

        if span.start() < 0 {
            result.insert(0, MapElement::Lost(LostSpan::new(-span.start())));
        }
        if span.end() > parent_total {
            result.push(MapElement::Lost(LostSpan::new(span.end() - parent_total)));
        }

        // the ends of self stay meaningful, new internal breaks do not
        if span.tidy_start() {
            if let Some(MapElement::Span(first)) = result.first_mut() {
                first.set_tidy(Some(true), None);
            }
        }
        if span.tidy_end() {
            if let Some(MapElement::Span(last)) = result.last_mut() {
                last.set_tidy(None, Some(true));
            }
        }

        if span.is_reverse() {
            result = result.iter().rev().map(MapElement::reversed).collect();
        }

        if let Some(value) = span.value() {
            result = result
                .into_iter()
                .map(|piece| piece.stamped(Some(value.clone())))
                .collect();
        }

        result
    }
}

impl fmt::Display for MapElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapElement::Span(s) => s.fmt(f),
            MapElement::Lost(l) => l.fmt(f),
        }
    }
}
