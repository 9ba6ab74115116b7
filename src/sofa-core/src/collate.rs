//! Ordering of JSON view keys.
//!
//! Type order is null < false < true < numbers < strings < arrays < objects.
//! Arrays compare element-wise, objects pair-wise in field order, and a
//! shorter prefix sorts first. Strings compare by code point.

use serde_json::Value;
use std::cmp::Ordering;

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

pub fn collate(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                match collate(l, r) {
                    Ordering::Equal => continue,
                    ord => return ord,
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => {
            for ((lk, lv), (rk, rv)) in x.iter().zip(y.iter()) {
                match lk.cmp(rk).then_with(|| collate(lv, rv)) {
                    Ordering::Equal => continue,
                    ord => return ord,
                }
            }
            x.len().cmp(&y.len())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Whether `key` lies within the inclusive bounds; a missing bound is open
pub fn in_range(key: &Value, start: Option<&Value>, end: Option<&Value>) -> bool {
    start.map_or(true, |s| collate(key, s) != Ordering::Less)
        && end.map_or(true, |e| collate(key, e) != Ordering::Greater)
}
