//! SeqCoord - coordinate maps between sequences and their alignments
//!
//! Bidirectional mapping between "sequence" coordinates (ungapped) and
//! "alignment" coordinates (gapped), built around a run-length gap
//! encoding that stays O(gap-count) in memory for genome-scale data.
//!
//! # Features
//!
//! - O(log gap-count) conversion in either direction
//! - Explicit span maps for feature annotation, with payloads and
//!   strand-aware slicing
//! - Composable maps: project features through nested reference frames
//! - Tagged-dictionary persistence for both representations
//!
//! # Example
//!
//! ```
//! use seqcoord::{CompactGapMap, SliceSpec};
//!
//! // a length-10 sequence with gaps inserted at positions 2 and 5
//! let map = CompactGapMap::from_gap_table(&[(2, 1), (5, 2)], 10)?;
//!
//! assert_eq!(map.len(), 13);
//! assert_eq!(map.seq_to_align(3, false)?, 4);
//! assert_eq!(map.align_to_seq(4)?, 3);
//!
//! // alignment columns 4..7 of the gapped view
//! let sliced = map.slice(SliceSpec::range(4, 7))?;
//! assert_eq!(sliced.len(), 3);
//! # Ok::<(), seqcoord::CoordError>(())
//! ```

pub mod core;

// Re-export commonly used types
pub use crate::core::{
    global_lost_span_cache, CompactGapMap, CoordError, CoordResult, DictError, DictForm,
    DictResult, ExplicitSpanMap, LostSpan, LostSpanCache, MapElement, MapRequest, Result,
    SeqCoordError, SliceSpec, Span, SMALL_GAP_LIMIT,
};
