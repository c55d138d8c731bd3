//! Round-trip between [`ValueMap`] and the tagged-record text form.
//!
//! Every value is written as a record `{"t": <tag>, "v": <payload>}` so
//! decoding is lossless: `I64(1)` and `U64(1)` stay distinct. Object keys
//! (top level and nested) are emitted in lexicographic byte order, and
//! floats use the shortest round-trip decimal, so equal maps encode to
//! identical bytes.

use serde_json::{Map, Number, Value as JsonValue};

use coffer_types::{KvsError, KvsResult, Value, ValueMap, ValueTag};

const TAG_FIELD: &str = "t";
const PAYLOAD_FIELD: &str = "v";

/// Encode a map as a single textual document.
///
/// Fails with `InvalidValue` if the map contains a non-finite float.
pub fn encode(map: &ValueMap) -> KvsResult<String> {
    let mut top = Map::new();
    for (key, value) in map {
        top.insert(key.clone(), encode_value(value)?);
    }
    serde_json::to_string(&JsonValue::Object(top))
        .map_err(|err| KvsError::JsonParserError(err.to_string()))
}

/// Decode a textual document produced by [`encode`].
///
/// Fails with `JsonParserError` on malformed syntax or a non-object top
/// level, `ValidationFailed` on a bad value record, and `InvalidValue` on
/// a non-finite float payload.
pub fn decode(text: &str) -> KvsResult<ValueMap> {
    let parsed: JsonValue =
        serde_json::from_str(text).map_err(|err| KvsError::JsonParserError(err.to_string()))?;

    let JsonValue::Object(top) = parsed else {
        return Err(KvsError::JsonParserError(
            "top-level document is not an object".to_string(),
        ));
    };

    top.iter()
        .map(|(key, record)| Ok((key.clone(), decode_value(record)?)))
        .collect()
}

fn encode_value(value: &Value) -> KvsResult<JsonValue> {
    let payload = match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::I32(n) => JsonValue::Number((*n).into()),
        Value::U32(n) => JsonValue::Number((*n).into()),
        Value::I64(n) => JsonValue::Number((*n).into()),
        Value::U64(n) => JsonValue::Number((*n).into()),
        Value::F64(n) => {
            let number = Number::from_f64(*n)
                .ok_or_else(|| KvsError::InvalidValue(format!("non-finite f64: {n}")))?;
            JsonValue::Number(number)
        }
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Array(items) => {
            JsonValue::Array(items.iter().map(encode_value).collect::<KvsResult<_>>()?)
        }
        Value::Object(map) => {
            let mut object = Map::new();
            for (key, entry) in map {
                object.insert(key.clone(), encode_value(entry)?);
            }
            JsonValue::Object(object)
        }
    };

    let mut record = Map::new();
    record.insert(
        TAG_FIELD.to_string(),
        JsonValue::String(value.tag().as_str().to_string()),
    );
    record.insert(PAYLOAD_FIELD.to_string(), payload);
    Ok(JsonValue::Object(record))
}

fn decode_value(record: &JsonValue) -> KvsResult<Value> {
    let JsonValue::Object(fields) = record else {
        return Err(KvsError::ValidationFailed(
            "value record is not an object".to_string(),
        ));
    };

    // Exactly the two record fields; anything else is a malformed record.
    if fields.len() != 2 {
        return Err(KvsError::ValidationFailed(format!(
            "value record must have exactly `{TAG_FIELD}` and `{PAYLOAD_FIELD}` fields"
        )));
    }

    let tag_name = fields
        .get(TAG_FIELD)
        .and_then(JsonValue::as_str)
        .ok_or_else(|| {
            KvsError::ValidationFailed(format!("value record is missing a `{TAG_FIELD}` tag"))
        })?;
    let tag = ValueTag::from_str(tag_name)
        .ok_or_else(|| KvsError::ValidationFailed(format!("unknown value tag: {tag_name}")))?;
    let payload = fields.get(PAYLOAD_FIELD).ok_or_else(|| {
        KvsError::ValidationFailed(format!("value record is missing a `{PAYLOAD_FIELD}` payload"))
    })?;

    let mismatch = || {
        KvsError::ValidationFailed(format!("payload is incompatible with tag `{tag_name}`"))
    };

    match tag {
        ValueTag::Null => match payload {
            JsonValue::Null => Ok(Value::Null),
            _ => Err(mismatch()),
        },
        ValueTag::Bool => payload.as_bool().map(Value::Bool).ok_or_else(mismatch),
        ValueTag::I32 => payload
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Value::I32)
            .ok_or_else(mismatch),
        ValueTag::U32 => payload
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Value::U32)
            .ok_or_else(mismatch),
        ValueTag::I64 => payload.as_i64().map(Value::I64).ok_or_else(mismatch),
        ValueTag::U64 => payload.as_u64().map(Value::U64).ok_or_else(mismatch),
        ValueTag::F64 => {
            let n = payload.as_f64().ok_or_else(mismatch)?;
            if !n.is_finite() {
                return Err(KvsError::InvalidValue(format!("non-finite f64: {n}")));
            }
            Ok(Value::F64(n))
        }
        ValueTag::String => payload
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(mismatch),
        ValueTag::Array => {
            let items = payload.as_array().ok_or_else(mismatch)?;
            Ok(Value::Array(
                items.iter().map(decode_value).collect::<KvsResult<_>>()?,
            ))
        }
        ValueTag::Object => {
            let entries = payload.as_object().ok_or_else(mismatch)?;
            entries
                .iter()
                .map(|(key, entry)| Ok((key.clone(), decode_value(entry)?)))
                .collect::<KvsResult<ValueMap>>()
                .map(Value::Object)
        }
    }
}
