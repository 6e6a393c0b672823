//! Core coordinate mapping functionality
//!
//! This module contains the span primitives, the run-length gap
//! encoding, the explicit span map, and their persisted forms.

mod compact;
mod coords;
mod dict;
mod error;
mod explicit;
mod span;

pub use compact::CompactGapMap;
pub use coords::{
    clamp_index, gap_alignment_spans, spans_from_locations, spans_to_gap_coords, wrap_index,
    MapRequest, SliceSpec,
};
pub use dict::DictForm;
pub use error::{
    CoordError, CoordResult, DictError, DictResult, Result, SeqCoordError,
};
pub use explicit::ExplicitSpanMap;
pub use span::{
    global_lost_span_cache, LostSpan, LostSpanCache, MapElement, Span, SMALL_GAP_LIMIT,
};
