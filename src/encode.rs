//! MessagePack frame encoding.
//!
//! A frame is the self-delimiting three element array `[tag, time, record]`
//! understood by Fluentd-compatible collectors. The record is serialized with
//! `rmp-serde`; values that have no native MessagePack serialization are
//! round-tripped through JSON text so the rest of the record still reaches the
//! collector with the awkward value reduced to its textual projection.

use rmp::Marker;
use serde::Serialize;

use crate::{error::EncodeError, time::EventTime};

/// msgpack extension type carrying `(seconds, nanoseconds)` event times.
pub const EVENT_TIME_EXT_TYPE: i8 = 0;

/// Encode one `[tag, time, record]` frame.
///
/// Pure function of its inputs. With `nanosecond_precision` the timestamp is
/// written as a fixext8 extension value (big-endian seconds then nanoseconds);
/// otherwise as an unsigned integer of epoch seconds.
pub fn encode_frame<S>(
    tag: &str,
    time: EventTime,
    record: &S,
    nanosecond_precision: bool,
) -> Result<Vec<u8>, EncodeError>
where
    S: Serialize + ?Sized,
{
    let payload = encode_record(record)?;
    let mut frame = Vec::with_capacity(tag.len() + payload.len() + 16);
    rmp::encode::write_array_len(&mut frame, 3).map_err(frame_err)?;
    rmp::encode::write_str(&mut frame, tag).map_err(frame_err)?;
    write_time(&mut frame, time, nanosecond_precision)?;
    frame.extend_from_slice(&payload);
    Ok(frame)
}

fn write_time(
    frame: &mut Vec<u8>,
    time: EventTime,
    nanosecond_precision: bool,
) -> Result<(), EncodeError> {
    if nanosecond_precision {
        rmp::encode::write_ext_meta(frame, 8, EVENT_TIME_EXT_TYPE).map_err(frame_err)?;
        frame.extend_from_slice(&(time.secs() as u32).to_be_bytes());
        frame.extend_from_slice(&time.nanos().to_be_bytes());
    } else {
        rmp::encode::write_uint(frame, time.secs()).map_err(frame_err)?;
    }
    Ok(())
}

fn encode_record<S>(record: &S) -> Result<Vec<u8>, EncodeError>
where
    S: Serialize + ?Sized,
{
    let payload = match rmp_serde::to_vec_named(record) {
        Ok(payload) => payload,
        Err(primary) => reencode_lossy(record).map_err(|fallback| EncodeError::Unencodable {
            primary: primary.to_string(),
            fallback,
        })?,
    };
    ensure_map(&payload)?;
    Ok(payload)
}

/// Render the record as JSON text, reparse, and encode the parsed value.
///
/// Mirrors what serde does for formats that are only human readable: the JSON
/// serializer accepts values the MessagePack serializer rejects, at the cost
/// of flattening them into strings/JSON primitives.
fn reencode_lossy<S>(record: &S) -> Result<Vec<u8>, String>
where
    S: Serialize + ?Sized,
{
    let text = serde_json::to_string(record).map_err(|e| e.to_string())?;
    let value: serde_json::Value = serde_json::from_str(&text).map_err(|e| e.to_string())?;
    rmp_serde::to_vec_named(&value).map_err(|e| e.to_string())
}

fn ensure_map(payload: &[u8]) -> Result<(), EncodeError> {
    let Some(&head) = payload.first() else {
        return Err(EncodeError::NotAMap("an empty payload"));
    };
    match Marker::from_u8(head) {
        Marker::FixMap(_) | Marker::Map16 | Marker::Map32 => Ok(()),
        other => Err(EncodeError::NotAMap(marker_kind(other))),
    }
}

fn marker_kind(marker: Marker) -> &'static str {
    match marker {
        Marker::FixPos(_)
        | Marker::FixNeg(_)
        | Marker::U8
        | Marker::U16
        | Marker::U32
        | Marker::U64
        | Marker::I8
        | Marker::I16
        | Marker::I32
        | Marker::I64 => "an integer",
        Marker::F32 | Marker::F64 => "a float",
        Marker::Null => "nil",
        Marker::True | Marker::False => "a boolean",
        Marker::FixStr(_) | Marker::Str8 | Marker::Str16 | Marker::Str32 => "a string",
        Marker::Bin8 | Marker::Bin16 | Marker::Bin32 => "a byte string",
        Marker::FixArray(_) | Marker::Array16 | Marker::Array32 => "an array",
        Marker::FixExt1
        | Marker::FixExt2
        | Marker::FixExt4
        | Marker::FixExt8
        | Marker::FixExt16
        | Marker::Ext8
        | Marker::Ext16
        | Marker::Ext32 => "an extension value",
        _ => "an unrecognized value",
    }
}

fn frame_err<E: std::fmt::Display>(err: E) -> EncodeError {
    EncodeError::Frame(err.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::{Serialize, Serializer, ser::Error as _};

    use super::*;

    /// A value that only supports human-readable serializers, like handles
    /// that render themselves for display but refuse binary formats.
    struct HumanOnly;

    impl Serialize for HumanOnly {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            if serializer.is_human_readable() {
                serializer.serialize_str("opaque handle")
            } else {
                Err(S::Error::custom("no binary form"))
            }
        }
    }

    /// A value no serializer can represent.
    struct Poison;

    impl Serialize for Poison {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("unserializable"))
        }
    }

    fn plain_record() -> BTreeMap<&'static str, &'static str> {
        BTreeMap::from([("a", "b")])
    }

    #[test]
    fn frame_round_trips_through_msgpack() {
        let frame = encode_frame("tag", EventTime::from(1_700_000_000u64), &plain_record(), false)
            .expect("encode frame");
        let (tag, time, record): (String, u64, BTreeMap<String, String>) =
            rmp_serde::from_slice(&frame).expect("decode frame");
        assert_eq!(tag, "tag");
        assert_eq!(time, 1_700_000_000);
        assert_eq!(record.get("a").map(String::as_str), Some("b"));
    }

    #[test]
    fn frame_is_deterministic() {
        let record = plain_record();
        let time = EventTime::from(42u64);
        let first = encode_frame("t", time, &record, false).expect("encode");
        let second = encode_frame("t", time, &record, false).expect("encode");
        assert_eq!(first, second);
    }

    #[test]
    fn nanosecond_precision_writes_event_time_extension() {
        let time = EventTime::new(1_700_000_000, 123_456_789);
        let frame = encode_frame("t", time, &plain_record(), true).expect("encode frame");
        // [array3][fixstr1 't'][fixext8 type0][secs BE][nanos BE]...
        let mut expected = vec![0x93, 0xa1, b't', 0xd7, 0x00];
        expected.extend_from_slice(&(1_700_000_000u32).to_be_bytes());
        expected.extend_from_slice(&123_456_789u32.to_be_bytes());
        assert_eq!(&frame[..expected.len()], &expected[..]);
    }

    #[test]
    fn second_precision_writes_plain_integer() {
        let frame =
            encode_frame("t", EventTime::new(99, 5), &plain_record(), false).expect("encode frame");
        assert_eq!(&frame[..4], &[0x93, 0xa1, b't', 99]);
    }

    #[test]
    fn non_map_record_is_rejected() {
        let err = encode_frame("t", EventTime::from(0u64), "not-a-map", false)
            .expect_err("string record must be rejected");
        assert!(matches!(err, EncodeError::NotAMap("a string")));
    }

    #[test]
    fn array_record_is_rejected() {
        let err = encode_frame("t", EventTime::from(0u64), &["a", "b"], false)
            .expect_err("array record must be rejected");
        assert!(matches!(err, EncodeError::NotAMap("an array")));
    }

    #[test]
    fn non_finite_floats_encode_natively() {
        #[derive(Serialize)]
        struct Sample {
            x: f64,
        }
        let frame = encode_frame("t", EventTime::from(0u64), &Sample { x: f64::NAN }, false)
            .expect("NaN is representable in msgpack");
        assert!(!frame.is_empty());
    }

    #[test]
    fn human_only_values_fall_back_to_text_projection() {
        #[derive(Serialize)]
        struct Sample {
            plain: &'static str,
            weird: HumanOnly,
        }
        let record = Sample {
            plain: "kept",
            weird: HumanOnly,
        };
        let frame =
            encode_frame("t", EventTime::from(7u64), &record, false).expect("fallback encode");
        let (_, _, decoded): (String, u64, BTreeMap<String, String>) =
            rmp_serde::from_slice(&frame).expect("decode frame");
        assert_eq!(decoded.get("plain").map(String::as_str), Some("kept"));
        assert_eq!(decoded.get("weird").map(String::as_str), Some("opaque handle"));
    }

    #[test]
    fn fallback_output_must_still_be_a_map() {
        let err = encode_frame("t", EventTime::from(0u64), &HumanOnly, false)
            .expect_err("bare projected string is not a map");
        assert!(matches!(err, EncodeError::NotAMap(_)));
    }

    #[test]
    fn unserializable_values_are_terminal() {
        #[derive(Serialize)]
        struct Sample {
            bad: Poison,
        }
        let err = encode_frame("t", EventTime::from(0u64), &Sample { bad: Poison }, false)
            .expect_err("poisoned record must fail");
        assert!(matches!(err, EncodeError::Unencodable { .. }));
    }
}
