//! Total ordering over JSON cells, used by every table sort.
//!
//! Feed columns mix integers, floats, strings and the occasional nested value,
//! and some cells are null. Sorting needs one deterministic order across all
//! of them, so cells are ranked by kind first and compared within a kind.
//!
//! # Ordering
//!
//! - Booleans, then numbers, then strings, then arrays, then objects
//! - Null sorts after everything (a missing sort key goes last)
//! - Numbers compare numerically: exact for two integers, `f64::total_cmp` otherwise
//! - Strings compare bytewise, so stage codes like `"0P000"` and `"01000"` keep
//!   their natural ASCII order

use std::cmp::Ordering;

use serde_json::{Number, Value};

/// Compare two cells under the table ordering described in the module docs.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            a.to_string().cmp(&b.to_string())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Compare two rows on the given cell positions, first difference wins.
pub fn compare_rows(a: &[Value], b: &[Value], positions: &[usize]) -> Ordering {
    positions
        .iter()
        .map(|&i| compare_values(&a[i], &b[i]))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn compare_numbers(x: &Number, y: &Number) -> Ordering {
    if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
        return x.cmp(&y);
    }
    if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
        return x.cmp(&y);
    }
    let x = x.as_f64().unwrap_or(f64::NAN);
    let y = y.as_f64().unwrap_or(f64::NAN);
    x.total_cmp(&y)
}

fn rank(v: &Value) -> u8 {
    match v {
        Value::Bool(_) => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Array(_) => 3,
        Value::Object(_) => 4,
        Value::Null => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Helper: assert a list of cells is in strictly ascending order.
    fn assert_sorted_order(inputs: &[Value]) {
        for i in 1..inputs.len() {
            assert_eq!(
                compare_values(&inputs[i - 1], &inputs[i]),
                Ordering::Less,
                "Expected {} < {}",
                inputs[i - 1],
                inputs[i],
            );
        }
    }

    #[test]
    fn integers_numeric_not_lexicographic() {
        assert_sorted_order(&[json!(1), json!(2), json!(10), json!(100)]);
    }

    #[test]
    fn mixed_int_and_float() {
        assert_sorted_order(&[json!(-1), json!(0.5), json!(1), json!(1.5), json!(2)]);
    }

    #[test]
    fn stage_codes_bytewise() {
        assert_sorted_order(&[json!("01000"), json!("02000"), json!("0P000"), json!("10000")]);
    }

    #[test]
    fn null_sorts_last() {
        assert_sorted_order(&[json!(true), json!(3), json!("a"), json!([1]), json!({"a": 1}), Value::Null]);
        assert_eq!(compare_values(&Value::Null, &Value::Null), Ordering::Equal);
    }

    #[test]
    fn large_unsigned_values() {
        assert_eq!(
            compare_values(&json!(u64::MAX), &json!(u64::MAX - 1)),
            Ordering::Greater
        );
    }

    #[test]
    fn rows_compare_on_first_difference() {
        let a = [json!(1), json!("b"), json!(9)];
        let b = [json!(1), json!("c"), json!(0)];
        assert_eq!(compare_rows(&a, &b, &[0, 1, 2]), Ordering::Less);
        assert_eq!(compare_rows(&a, &b, &[0, 2]), Ordering::Greater);
        assert_eq!(compare_rows(&a, &b, &[0]), Ordering::Equal);
    }
}
