//! Tagged dictionary persistence
//!
//! Every persistable type serializes to a JSON object carrying a `type`
//! tag and the writer `version` alongside its fields, and rebuilds from
//! the same shape via [`DictForm`]. Decoding checks the tag and the
//! shape of every field so a corrupted or foreign payload fails with a
//! named [`DictError`] instead of a half-built map.

use serde_json::{json, Map, Value};

use crate::core::compact::CompactGapMap;
use crate::core::error::{DictError, DictResult};
use crate::core::explicit::ExplicitSpanMap;
use crate::core::span::{LostSpan, MapElement, Span};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tag written for terminal-padding lost spans
const TERMINAL_TAG: &str = "seqcoord.core.TerminalPadding";

/// Round-trippable tagged dictionary form
pub trait DictForm: Sized {
    /// The `type` tag written and required by this implementation
    const TYPE_TAG: &'static str;

    fn to_dict(&self) -> Value;

    fn from_dict(value: &Value) -> DictResult<Self>;
}

fn as_object<'v>(value: &'v Value, expected: &str) -> DictResult<&'v Map<String, Value>> {
    value.as_object().ok_or_else(|| DictError::WrongType {
        expected: expected.to_string(),
        found: value.to_string(),
    })
}

fn check_tag(map: &Map<String, Value>, expected: &'static str) -> DictResult<()> {
    let found = map
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DictError::MissingField("type"))?;
    if found != expected {
        return Err(DictError::WrongType {
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
    Ok(())
}

fn get_i64(map: &Map<String, Value>, field: &'static str) -> DictResult<i64> {
    map.get(field)
        .ok_or(DictError::MissingField(field))?
        .as_i64()
        .ok_or(DictError::MalformedField {
            field,
            message: "expected an integer".to_string(),
        })
}

fn get_bool(map: &Map<String, Value>, field: &'static str) -> DictResult<bool> {
    map.get(field)
        .ok_or(DictError::MissingField(field))?
        .as_bool()
        .ok_or(DictError::MalformedField {
            field,
            message: "expected a boolean".to_string(),
        })
}

fn get_i64_array(map: &Map<String, Value>, field: &'static str) -> DictResult<Vec<i64>> {
    let items = map
        .get(field)
        .ok_or(DictError::MissingField(field))?
        .as_array()
        .ok_or(DictError::MalformedField {
            field,
            message: "expected an array".to_string(),
        })?;
    items
        .iter()
        .map(|v| {
            v.as_i64().ok_or(DictError::MalformedField {
                field,
                message: format!("expected integer entries, found {v}"),
            })
        })
        .collect()
}

fn get_value(map: &Map<String, Value>, field: &str) -> Option<Value> {
    match map.get(field) {
        None | Some(Value::Null) => None,
        Some(v) => Some(v.clone()),
    }
}

impl DictForm for CompactGapMap {
    const TYPE_TAG: &'static str = "seqcoord.core.CompactGapMap";

    fn to_dict(&self) -> Value {
        json!({
            "type": Self::TYPE_TAG,
            "version": VERSION,
            "gap_pos": self.gap_pos(),
            "cum_gap_lengths": self.cum_gap_lengths(),
            "parent_length": self.parent_length(),
            "termini_unknown": self.termini_unknown(),
        })
    }

    fn from_dict(value: &Value) -> DictResult<Self> {
        let map = as_object(value, Self::TYPE_TAG)?;
        check_tag(map, Self::TYPE_TAG)?;
        let gap_pos = get_i64_array(map, "gap_pos")?;
        let cum_gap_lengths = get_i64_array(map, "cum_gap_lengths")?;
        let parent_length = get_i64(map, "parent_length")?;
        // older writers omit the flag
        let termini_unknown = map
            .get("termini_unknown")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let built = Self::new(gap_pos, cum_gap_lengths, parent_length).map_err(|e| {
            DictError::MalformedField {
                field: "gap_pos",
                message: e.to_string(),
            }
        })?;
        Ok(if termini_unknown {
            built.with_termini_unknown()
        } else {
            built
        })
    }
}

impl DictForm for Span {
    const TYPE_TAG: &'static str = "seqcoord.core.Span";

    fn to_dict(&self) -> Value {
        json!({
            "type": Self::TYPE_TAG,
            "version": VERSION,
            "start": self.start(),
            "end": self.end(),
            "tidy_start": self.tidy_start(),
            "tidy_end": self.tidy_end(),
            "value": self.value(),
            "reverse": self.is_reverse(),
        })
    }

    fn from_dict(value: &Value) -> DictResult<Self> {
        let map = as_object(value, Self::TYPE_TAG)?;
        check_tag(map, Self::TYPE_TAG)?;
        Ok(Span::with_attrs(
            get_i64(map, "start")?,
            Some(get_i64(map, "end")?),
            get_bool(map, "tidy_start")?,
            get_bool(map, "tidy_end")?,
            get_value(map, "value"),
            get_bool(map, "reverse")?,
        ))
    }
}

impl DictForm for LostSpan {
    const TYPE_TAG: &'static str = "seqcoord.core.LostSpan";

    fn to_dict(&self) -> Value {
        let tag = if self.is_terminal() {
            TERMINAL_TAG
        } else {
            Self::TYPE_TAG
        };
        json!({
            "type": tag,
            "version": VERSION,
            "length": self.length(),
            "value": self.value(),
        })
    }

    fn from_dict(value: &Value) -> DictResult<Self> {
        let map = as_object(value, Self::TYPE_TAG)?;
        let found = map
            .get("type")
            .and_then(Value::as_str)
            .ok_or(DictError::MissingField("type"))?;
        let terminal = match found {
            t if t == Self::TYPE_TAG => false,
            t if t == TERMINAL_TAG => true,
            other => {
                return Err(DictError::WrongType {
                    expected: format!("{} or {}", Self::TYPE_TAG, TERMINAL_TAG),
                    found: other.to_string(),
                })
            }
        };
        let length = get_i64(map, "length")?;
        let payload = get_value(map, "value");
        Ok(if terminal {
            LostSpan::terminal_padding(length).stamped(payload)
        } else {
            LostSpan::with_value(length, payload)
        })
    }
}

impl DictForm for ExplicitSpanMap {
    const TYPE_TAG: &'static str = "seqcoord.core.ExplicitSpanMap";

    fn to_dict(&self) -> Value {
        let spans: Vec<Value> = self
            .elements()
            .iter()
            .map(|element| match element {
                MapElement::Span(s) => s.to_dict(),
                MapElement::Lost(l) => l.to_dict(),
            })
            .collect();
        json!({
            "type": Self::TYPE_TAG,
            "version": VERSION,
            "spans": spans,
            "parent_length": self.parent_length(),
        })
    }

    fn from_dict(value: &Value) -> DictResult<Self> {
        let map = as_object(value, Self::TYPE_TAG)?;
        check_tag(map, Self::TYPE_TAG)?;
        let parent_length = get_i64(map, "parent_length")?;
        let spans = map
            .get("spans")
            .ok_or(DictError::MissingField("spans"))?
            .as_array()
            .ok_or(DictError::MalformedField {
                field: "spans",
                message: "expected an array".to_string(),
            })?;
        let mut elements = Vec::with_capacity(spans.len());
        for entry in spans {
            let tag = as_object(entry, "span entry")?
                .get("type")
                .and_then(Value::as_str)
                .ok_or(DictError::MissingField("type"))?;
            let element = match tag {
                t if t == Span::TYPE_TAG => MapElement::Span(Span::from_dict(entry)?),
                t if t == LostSpan::TYPE_TAG || t == TERMINAL_TAG => {
                    MapElement::Lost(LostSpan::from_dict(entry)?)
                }
                other => {
                    return Err(DictError::WrongType {
                        expected: format!("{} or {}", Span::TYPE_TAG, LostSpan::TYPE_TAG),
                        found: other.to_string(),
                    })
                }
            };
            elements.push(element);
        }
        Ok(ExplicitSpanMap::from_spans(elements, parent_length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_round_trip() {
        let map = CompactGapMap::from_gap_table(&[(2, 1), (5, 2)], 10).unwrap();
        let dict = map.to_dict();
        assert_eq!(dict["type"], CompactGapMap::TYPE_TAG);
        assert_eq!(dict["parent_length"], 10);
        let back = CompactGapMap::from_dict(&dict).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_compact_termini_flag_survives() {
        let map = CompactGapMap::from_gap_table(&[(0, 3)], 6)
            .unwrap()
            .with_termini_unknown();
        let back = CompactGapMap::from_dict(&map.to_dict()).unwrap();
        assert!(back.termini_unknown());
    }

    #[test]
    fn test_compact_rejects_wrong_tag() {
        let map = CompactGapMap::from_gap_table(&[(2, 1)], 10).unwrap();
        let mut dict = map.to_dict();
        dict["type"] = Value::String("something.Else".to_string());
        assert!(matches!(
            CompactGapMap::from_dict(&dict),
            Err(DictError::WrongType { .. })
        ));
    }

    #[test]
    fn test_compact_rejects_missing_field() {
        let map = CompactGapMap::from_gap_table(&[(2, 1)], 10).unwrap();
        let mut dict = map.to_dict();
        dict.as_object_mut().unwrap().remove("parent_length");
        assert_eq!(
            CompactGapMap::from_dict(&dict),
            Err(DictError::MissingField("parent_length"))
        );
    }

    #[test]
    fn test_compact_rejects_malformed_array() {
        let map = CompactGapMap::from_gap_table(&[(2, 1)], 10).unwrap();
        let mut dict = map.to_dict();
        dict["gap_pos"] = json!([2, "three"]);
        assert!(matches!(
            CompactGapMap::from_dict(&dict),
            Err(DictError::MalformedField { field: "gap_pos", .. })
        ));
    }

    #[test]
    fn test_span_round_trip_with_payload() {
        let span = Span::with_attrs(3, Some(9), true, false, Some(json!({"gene": "abcA"})), true);
        let back = Span::from_dict(&span.to_dict()).unwrap();
        assert_eq!(back, span);
    }

    #[test]
    fn test_lost_span_round_trip() {
        let lost = LostSpan::new(7);
        let back = LostSpan::from_dict(&lost.to_dict()).unwrap();
        assert_eq!(back, lost);

        let padding = LostSpan::terminal_padding(4);
        let dict = padding.to_dict();
        assert_eq!(dict["type"], TERMINAL_TAG);
        let back = LostSpan::from_dict(&dict).unwrap();
        assert!(back.is_terminal());
        assert_eq!(back.length(), 4);
    }

    #[test]
    fn test_explicit_round_trip() {
        let map = ExplicitSpanMap::from_spans(
            vec![
                MapElement::Span(Span::new(0, 4)),
                MapElement::Lost(LostSpan::new(2)),
                MapElement::Span(Span::new(4, 9).with_value(Some(json!("exon")))),
            ],
            20,
        );
        let dict = map.to_dict();
        let back = ExplicitSpanMap::from_dict(&dict).unwrap();
        assert_eq!(back.parent_length(), 20);
        assert_eq!(back.elements(), map.elements());
        assert_eq!(back.coordinates(), map.coordinates());
    }

    #[test]
    fn test_explicit_rejects_unknown_span_kind() {
        let dict = json!({
            "type": ExplicitSpanMap::TYPE_TAG,
            "version": VERSION,
            "spans": [{"type": "seqcoord.core.Mystery", "length": 3}],
            "parent_length": 10,
        });
        assert!(matches!(
            ExplicitSpanMap::from_dict(&dict),
            Err(DictError::WrongType { .. })
        ));
    }

    #[test]
    fn test_json_text_round_trip() {
        let map = CompactGapMap::from_gap_table(&[(2, 1), (5, 2)], 10).unwrap();
        let text = serde_json::to_string(&map.to_dict()).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(CompactGapMap::from_dict(&parsed).unwrap(), map);
    }
}
