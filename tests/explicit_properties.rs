//! Explicit span map property tests
//!
//! Tests the materialized span representation: coverage normalization,
//! inversion, composition and the persisted form.

use proptest::prelude::*;
use seqcoord::{DictForm, ExplicitSpanMap, MapRequest, SliceSpec};

// ============================================================================
// Strategies
// ============================================================================

/// Generate an ordered, non-overlapping span map within its parent
fn arb_span_map() -> impl Strategy<Value = ExplicitSpanMap> {
    (4i64..80).prop_flat_map(|parent| {
        prop::collection::btree_set(0..parent, 2..8).prop_map(move |cuts| {
            let cuts: Vec<i64> = cuts.into_iter().collect();
            let locations: Vec<(i64, i64)> = cuts
                .chunks(2)
                .filter(|pair| pair.len() == 2)
                .map(|pair| (pair[0], pair[1]))
                .collect();
            ExplicitSpanMap::from_locations(&locations, parent).expect("ordered locations")
        })
    })
}

// ============================================================================
// Coverage and inversion
// ============================================================================

proptest! {
    /// Property: covered is idempotent
    #[test]
    fn test_covered_idempotent(map in arb_span_map()) {
        let once = map.covered();
        let twice = once.covered();
        prop_assert_eq!(once.coordinates(), twice.coordinates());
        prop_assert_eq!(once.parent_length(), twice.parent_length());
    }

    /// Property: covered segments are sorted and disjoint
    #[test]
    fn test_covered_sorted_disjoint(map in arb_span_map()) {
        let coords = map.covered().coordinates();
        for pair in coords.windows(2) {
            prop_assert!(pair[0].1 <= pair[1].0, "segments {:?} then {:?}", pair[0], pair[1]);
        }
    }

    /// Property: inversion is involutive for non-overlapping maps
    #[test]
    fn test_invert_involutive(map in arb_span_map()) {
        let inverted = map.invert().unwrap();
        prop_assert_eq!(inverted.parent_length(), map.len());
        prop_assert_eq!(inverted.len(), map.parent_length());
        let back = inverted.invert().unwrap();
        prop_assert_eq!(back.coordinates(), map.coordinates());
        prop_assert_eq!(back.parent_length(), map.parent_length());
    }

    /// Property: shadow covers exactly the positions the map does not
    #[test]
    fn test_shadow_complements(map in arb_span_map()) {
        let covered: i64 = map.coordinates().iter().map(|&(s, e)| e - s).sum();
        let shadow = map.shadow().unwrap();
        let shadowed: i64 = shadow.coordinates().iter().map(|&(s, e)| e - s).sum();
        prop_assert_eq!(covered + shadowed, map.parent_length());
    }

    /// Property: gap and nongap views partition the local space
    #[test]
    fn test_gaps_nongap_partition(map in arb_span_map()) {
        let gaps: i64 = map.gaps().coordinates().iter().map(|&(s, e)| e - s).sum();
        let nongap: i64 = map.nongap().coordinates().iter().map(|&(s, e)| e - s).sum();
        prop_assert_eq!(gaps + nongap, map.len());
    }
}

// ============================================================================
// Transformation laws
// ============================================================================

proptest! {
    /// Property: zeroed starts at the origin with the extent preserved
    #[test]
    fn test_zeroed_law(map in arb_span_map()) {
        let zeroed = map.zeroed();
        prop_assert_eq!(zeroed.start(), 0);
        prop_assert_eq!(zeroed.len(), map.len());
        prop_assert_eq!(zeroed.end() - zeroed.start(), map.end() - map.start());
    }

    /// Property: reverse complement is involutive on coordinates
    #[test]
    fn test_reverse_complement_involutive(map in arb_span_map()) {
        let rc = map.reverse_complement();
        prop_assert_eq!(rc.len(), map.len());
        let back = rc.reverse_complement();
        prop_assert_eq!(back.coordinates(), map.coordinates());
    }

    /// Property: local/parent position conversion round trips
    #[test]
    fn test_local_parent_round_trip(map in arb_span_map()) {
        for rel in 0..map.len() {
            let abs = map.to_parent(rel).unwrap();
            prop_assert_eq!(map.to_local(abs).unwrap(), rel);
        }
    }

    /// Property: composing with the full range is the identity
    #[test]
    fn test_compose_identity(map in arb_span_map()) {
        let request = MapRequest::Range(SliceSpec::default());
        let composed = map.compose(request).unwrap();
        prop_assert_eq!(composed.coordinates(), map.coordinates());
        prop_assert_eq!(composed.parent_length(), map.parent_length());
    }

    /// Property: composing a sub-range never exceeds the requested width
    #[test]
    fn test_compose_range_width(map in arb_span_map(), a in 0i64..200, b in 0i64..200) {
        let lo = a % (map.len() + 1);
        let hi = b % (map.len() + 1);
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let composed = map.compose(MapRequest::Range(SliceSpec::range(lo, hi))).unwrap();
        prop_assert_eq!(composed.len(), hi - lo);
    }

    /// Property: scaling multiplies the extent
    #[test]
    fn test_scaled_law(map in arb_span_map(), k in 1i64..5) {
        let scaled = map.scaled(k);
        prop_assert_eq!(scaled.len(), map.len() * k);
        prop_assert_eq!(scaled.parent_length(), map.parent_length() * k);
    }
}

// ============================================================================
// Persistence
// ============================================================================

proptest! {
    /// Property: the tagged dictionary form round trips
    #[test]
    fn test_dict_round_trip(map in arb_span_map()) {
        let rebuilt = ExplicitSpanMap::from_dict(&map.to_dict()).unwrap();
        prop_assert_eq!(rebuilt.elements(), map.elements());
        prop_assert_eq!(rebuilt.parent_length(), map.parent_length());
    }
}
