//! Value-level operator semantics: equality, ordering, arithmetic, ranges and
//! the string/collection predicates.
//!
//! Integers and floats mix freely: a mixed operation promotes to float.
//! Integer arithmetic is checked and reports overflow instead of wrapping.

use std::cmp::Ordering;

use ruletrace_core::{BinaryOp, EvalError, Value};

fn mismatch(op: BinaryOp, left: &Value, right: &Value) -> EvalError {
    EvalError::TypeMismatch {
        op: op.symbol().to_string(),
        left: left.type_name().to_string(),
        right: right.type_name().to_string(),
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Int(i) => Some(*i as f64),
        Value::Float(x) => Some(*x),
        _ => None,
    }
}

/// Structural equality. Numbers compare numerically across int and float;
/// values of different kinds are unequal.
pub fn equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            as_f64(left) == as_f64(right)
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| equal(x, y))
        }
        (Value::Map(a), Value::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|other| equal(v, other)))
        }
        _ => left == right,
    }
}

/// `< <= > >=` over numbers or strings.
pub fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            as_f64(left).zip(as_f64(right)).and_then(|(a, b)| a.partial_cmp(&b))
        }
        _ => return Err(mismatch(op, left, right)),
    };
    // NaN compares false against everything.
    let Some(ordering) = ordering else {
        return Ok(false);
    };
    Ok(match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Ge => ordering != Ordering::Less,
        _ => return Err(mismatch(op, left, right)),
    })
}

/// `+ - * / % **`.
pub fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let overflow = || EvalError::IntegerOverflow {
        op: op.symbol().to_string(),
    };
    match (op, left, right) {
        (BinaryOp::Add, Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
        (BinaryOp::Add, Value::Array(a), Value::Array(b)) => {
            Ok(Value::Array(a.iter().chain(b).cloned().collect()))
        }
        (BinaryOp::Add, Value::Int(a), Value::Int(b)) => a.checked_add(*b).map(Value::Int).ok_or_else(overflow),
        (BinaryOp::Sub, Value::Int(a), Value::Int(b)) => a.checked_sub(*b).map(Value::Int).ok_or_else(overflow),
        (BinaryOp::Mul, Value::Int(a), Value::Int(b)) => a.checked_mul(*b).map(Value::Int).ok_or_else(overflow),
        (BinaryOp::Div, Value::Int(_), Value::Int(0)) => Err(EvalError::DivideByZero),
        (BinaryOp::Mod, Value::Int(_), Value::Int(0)) => Err(EvalError::DivideByZero),
        (BinaryOp::Mod, Value::Int(a), Value::Int(b)) => a.checked_rem(*b).map(Value::Int).ok_or_else(overflow),
        (BinaryOp::Mod, _, _) => Err(mismatch(op, left, right)),
        _ => {
            let (Some(a), Some(b)) = (as_f64(left), as_f64(right)) else {
                return Err(mismatch(op, left, right));
            };
            let value = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Pow => a.powf(b),
                _ => return Err(mismatch(op, left, right)),
            };
            Ok(Value::Float(value))
        }
    }
}

/// `a..b`: inclusive integer range.
pub fn range(left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Array((*a..=*b).map(Value::Int).collect())),
        _ => Err(mismatch(BinaryOp::Range, left, right)),
    }
}

/// `in`, `contains`, `startsWith` and `endsWith`.
pub fn membership(op: BinaryOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    match (op, left, right) {
        (BinaryOp::In, _, Value::Array(items)) => Ok(items.iter().any(|item| equal(left, item))),
        (BinaryOp::In, Value::String(key), Value::Map(fields)) => Ok(fields.contains_key(key)),
        (BinaryOp::In, _, Value::Nil) => Ok(false),
        (BinaryOp::Contains, Value::String(a), Value::String(b)) => Ok(a.contains(b.as_str())),
        (BinaryOp::StartsWith, Value::String(a), Value::String(b)) => Ok(a.starts_with(b.as_str())),
        (BinaryOp::EndsWith, Value::String(a), Value::String(b)) => Ok(a.ends_with(b.as_str())),
        _ => Err(mismatch(op, left, right)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_equality_across_kinds() {
        assert!(equal(&Value::Int(1), &Value::Float(1.0)));
        assert!(!equal(&Value::Int(1), &Value::from("1")));
        assert!(equal(&Value::Nil, &Value::Nil));
        assert!(equal(
            &Value::Array(vec![Value::Int(1)]),
            &Value::Array(vec![Value::Float(1.0)])
        ));
    }

    #[test]
    fn comparisons() {
        assert!(compare(BinaryOp::Lt, &Value::Int(1), &Value::Float(1.5)).unwrap());
        assert!(compare(BinaryOp::Ge, &"b".into(), &"a".into()).unwrap());
        assert!(!compare(BinaryOp::Gt, &Value::Float(f64::NAN), &Value::Int(0)).unwrap());
        let err = compare(BinaryOp::Gt, &Value::Int(1), &Value::Nil).unwrap_err();
        assert_eq!(err.to_string(), "invalid operation: int > nil");
    }

    #[test]
    fn integer_arithmetic_is_checked() {
        assert_eq!(
            arithmetic(BinaryOp::Add, &Value::Int(2), &Value::Int(3)).unwrap(),
            Value::Int(5)
        );
        assert!(matches!(
            arithmetic(BinaryOp::Add, &Value::Int(i64::MAX), &Value::Int(1)),
            Err(EvalError::IntegerOverflow { .. })
        ));
        assert_eq!(
            arithmetic(BinaryOp::Div, &Value::Int(1), &Value::Int(0)),
            Err(EvalError::DivideByZero)
        );
        assert_eq!(
            arithmetic(BinaryOp::Mod, &Value::Int(7), &Value::Int(0)),
            Err(EvalError::DivideByZero)
        );
    }

    #[test]
    fn division_yields_float() {
        assert_eq!(
            arithmetic(BinaryOp::Div, &Value::Int(7), &Value::Int(2)).unwrap(),
            Value::Float(3.5)
        );
        assert_eq!(
            arithmetic(BinaryOp::Pow, &Value::Int(2), &Value::Int(3)).unwrap(),
            Value::Float(8.0)
        );
    }

    #[test]
    fn concatenation() {
        assert_eq!(
            arithmetic(BinaryOp::Add, &"a".into(), &"b".into()).unwrap(),
            Value::from("ab")
        );
        assert!(arithmetic(BinaryOp::Add, &"a".into(), &Value::Int(1)).is_err());
    }

    #[test]
    fn ranges_and_membership() {
        assert_eq!(
            range(&Value::Int(1), &Value::Int(3)).unwrap(),
            Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        let groups = Value::Array(vec!["admin".into(), "moderator".into()]);
        assert!(membership(BinaryOp::In, &"admin".into(), &groups).unwrap());
        assert!(!membership(BinaryOp::In, &"guest".into(), &groups).unwrap());
        assert!(membership(BinaryOp::StartsWith, &"John Doe".into(), &"John".into()).unwrap());
        assert!(membership(BinaryOp::Contains, &Value::Int(1), &"1".into()).is_err());
    }
}
