//! Builtin function table and the value-level builtins.
//!
//! The parser consults [`lookup`] to decide whether a call is a builtin and
//! which argument (if any) is a predicate. Predicate builtins (`all`, `map`,
//! ...) are driven by the interpreter because they evaluate their predicate
//! body once per element; everything else is a plain function of its
//! evaluated arguments and lives in [`call`].

use indexmap::IndexMap;
use ruletrace_core::{EvalError, Value};

/// Static description of one builtin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinSpec {
    pub name: &'static str,
    pub min_args: usize,
    /// `None` means variadic.
    pub max_args: Option<usize>,
    /// Index of the predicate argument, for predicate builtins.
    pub predicate: Option<usize>,
}

impl BuiltinSpec {
    const fn unary(name: &'static str) -> Self {
        BuiltinSpec {
            name,
            min_args: 1,
            max_args: Some(1),
            predicate: None,
        }
    }

    const fn variadic(name: &'static str) -> Self {
        BuiltinSpec {
            name,
            min_args: 1,
            max_args: None,
            predicate: None,
        }
    }

    const fn with_predicate(name: &'static str) -> Self {
        BuiltinSpec {
            name,
            min_args: 2,
            max_args: Some(2),
            predicate: Some(1),
        }
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }

    /// Arity for diagnostics: `1`, `2` or `at least 1`.
    pub fn arity(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{} to {}", self.min_args, max),
            None => format!("at least {}", self.min_args),
        }
    }
}

pub const BUILTINS: &[BuiltinSpec] = &[
    BuiltinSpec::unary("len"),
    BuiltinSpec::unary("abs"),
    BuiltinSpec::unary("int"),
    BuiltinSpec::unary("float"),
    BuiltinSpec::unary("string"),
    BuiltinSpec::unary("upper"),
    BuiltinSpec::unary("lower"),
    BuiltinSpec::unary("trim"),
    BuiltinSpec::unary("keys"),
    BuiltinSpec::unary("values"),
    BuiltinSpec::variadic("min"),
    BuiltinSpec::variadic("max"),
    BuiltinSpec::with_predicate("all"),
    BuiltinSpec::with_predicate("any"),
    BuiltinSpec::with_predicate("none"),
    BuiltinSpec::with_predicate("one"),
    BuiltinSpec::with_predicate("filter"),
    BuiltinSpec::with_predicate("map"),
    BuiltinSpec::with_predicate("count"),
];

pub fn lookup(name: &str) -> Option<&'static BuiltinSpec> {
    BUILTINS.iter().find(|b| b.name == name)
}

fn fail(name: &str, message: impl Into<String>) -> EvalError {
    EvalError::Builtin {
        name: name.to_string(),
        message: message.into(),
    }
}

/// Elements a predicate builtin iterates over. Nil iterates as empty.
pub fn elements(name: &str, collection: Value) -> Result<Vec<Value>, EvalError> {
    match collection {
        Value::Array(items) => Ok(items),
        Value::Map(fields) => Ok(fields.into_values().collect()),
        Value::Nil => Ok(Vec::new()),
        other => Err(fail(
            name,
            format!("cannot iterate over {}", other.type_name()),
        )),
    }
}

/// Calls a non-predicate builtin on evaluated arguments.
pub fn call(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    match (name, args) {
        ("len", [v]) => {
            let len = match v {
                Value::String(s) => s.chars().count(),
                Value::Array(items) => items.len(),
                Value::Map(fields) => fields.len(),
                Value::Bytes(bytes) => bytes.len(),
                other => return Err(fail(name, format!("invalid argument of type {}", other.type_name()))),
            };
            Ok(Value::Int(len as i64))
        }
        ("abs", [Value::Int(i)]) => i
            .checked_abs()
            .map(Value::Int)
            .ok_or(EvalError::IntegerOverflow { op: "abs".into() }),
        ("abs", [Value::Float(x)]) => Ok(Value::Float(x.abs())),
        ("int", [v]) => match v {
            Value::Int(i) => Ok(Value::Int(*i)),
            Value::Float(x) if x.is_finite() => Ok(Value::Int(x.trunc() as i64)),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| fail(name, e.to_string())),
            other => Err(fail(name, format!("cannot convert {} to int", other.type_name()))),
        },
        ("float", [v]) => match v {
            Value::Int(i) => Ok(Value::Float(*i as f64)),
            Value::Float(x) => Ok(Value::Float(*x)),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| fail(name, e.to_string())),
            other => Err(fail(name, format!("cannot convert {} to float", other.type_name()))),
        },
        ("string", [v]) => Ok(Value::String(v.to_string())),
        ("upper", [Value::String(s)]) => Ok(Value::String(s.to_uppercase())),
        ("lower", [Value::String(s)]) => Ok(Value::String(s.to_lowercase())),
        ("trim", [Value::String(s)]) => Ok(Value::String(s.trim().to_string())),
        ("keys", [Value::Map(fields)]) => Ok(Value::Array(
            fields.keys().map(|k| Value::String(k.clone())).collect(),
        )),
        ("values", [Value::Map(fields)]) => Ok(Value::Array(fields.values().cloned().collect())),
        ("min", _) | ("max", _) => extremum(name, args),
        (_, [v]) => Err(fail(name, format!("invalid argument of type {}", v.type_name()))),
        _ => Err(fail(name, format!("unsupported call with {} argument(s)", args.len()))),
    }
}

/// `min`/`max` over the arguments, or over a single array argument.
fn extremum(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let items = match args {
        [Value::Array(items)] => items.as_slice(),
        _ => args,
    };
    let want_max = name == "max";
    let mut best: Option<&Value> = None;
    for item in items {
        if !matches!(item, Value::Int(_) | Value::Float(_)) {
            return Err(fail(name, format!("invalid argument of type {}", item.type_name())));
        }
        best = match best {
            None => Some(item),
            Some(current) => {
                let replace = match numeric_order(item, current) {
                    Some(std::cmp::Ordering::Greater) => want_max,
                    Some(std::cmp::Ordering::Less) => !want_max,
                    _ => false,
                };
                Some(if replace { item } else { current })
            }
        };
    }
    best.cloned()
        .ok_or_else(|| fail(name, "called with no values"))
}

fn numeric_order(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    let as_f64 = |v: &Value| match v {
        Value::Int(i) => Some(*i as f64),
        Value::Float(x) => Some(*x),
        _ => None,
    };
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        _ => as_f64(a)?.partial_cmp(&as_f64(b)?),
    }
}

/// Builds a map value from evaluated key/value pairs.
pub fn map_from_pairs(pairs: Vec<(String, Value)>) -> Value {
    Value::Map(pairs.into_iter().collect::<IndexMap<_, _>>())
}
