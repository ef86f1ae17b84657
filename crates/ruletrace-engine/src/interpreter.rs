//! Tree-walking interpreter over a compiled [`Program`].
//!
//! Scoping: `let` bindings shadow environment keys and are visible in the
//! binding's body only. Predicate builtins push a frame per element; `#`
//! and `#index` read the innermost frame.

use ruletrace_core::{BinaryOp, ConstSet, Env, EvalError, Node, NodeId, UnaryOp, Value};

use crate::builtins::{self, map_from_pairs};
use crate::compile::Program;
use crate::ops;

/// Runs `program` against `env`.
pub fn run(program: &Program, env: &Env) -> Result<Value, EvalError> {
    let mut interpreter = Interpreter {
        program,
        env,
        scopes: Vec::new(),
        frames: Vec::new(),
    };
    interpreter.eval(program.ast().root())
}

struct Frame {
    item: Value,
    index: usize,
}

struct Interpreter<'p> {
    program: &'p Program,
    env: &'p Env,
    scopes: Vec<(String, Value)>,
    frames: Vec<Frame>,
}

fn operand_error(op: &str, expected: &str, got: &Value) -> EvalError {
    EvalError::InvalidOperand {
        op: op.to_string(),
        expected: expected.to_string(),
        got: got.type_name().to_string(),
    }
}

fn expect_bool(op: &str, value: &Value) -> Result<bool, EvalError> {
    value.as_bool().ok_or_else(|| operand_error(op, "bool", value))
}

impl<'p> Interpreter<'p> {
    fn node(&self, id: NodeId) -> &'p Node {
        &self.program.ast()[id]
    }

    fn eval(&mut self, id: NodeId) -> Result<Value, EvalError> {
        match self.node(id) {
            Node::Nil => Ok(Value::Nil),
            Node::Bool(b) => Ok(Value::Bool(*b)),
            Node::Integer(i) => Ok(Value::Int(*i)),
            Node::Float(x) => Ok(Value::Float(*x)),
            Node::String(s) => Ok(Value::String(s.clone())),
            Node::Bytes(b) => Ok(Value::Bytes(b.clone())),
            Node::Constant(set) => Ok(constant_array(set)),
            Node::Identifier(name) => self.lookup(name),
            Node::Unary { op, operand } => {
                let value = self.eval(*operand)?;
                unary(*op, value)
            }
            Node::Binary { op, left, right } => self.binary(id, *op, *left, *right),
            Node::Conditional {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.eval(*cond)?;
                if expect_bool("?:", &cond)? {
                    self.eval(*then)
                } else {
                    self.eval(*otherwise)
                }
            }
            Node::Sequence(items) => {
                let mut last = Value::Nil;
                for item in items {
                    last = self.eval(*item)?;
                }
                Ok(last)
            }
            Node::Let { name, value, body } => {
                let value = self.eval(*value)?;
                self.scopes.push((name.clone(), value));
                let result = self.eval(*body);
                self.scopes.pop();
                result
            }
            Node::Array(items) => items
                .iter()
                .map(|item| self.eval(*item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Node::Map(pairs) => {
                let mut fields = Vec::with_capacity(pairs.len());
                for pair in pairs {
                    let Node::Pair { key, value } = self.node(*pair) else {
                        return Err(EvalError::Detached {
                            kind: self.node(*pair).kind_name().to_string(),
                        });
                    };
                    let key = match self.eval(*key)? {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    fields.push((key, self.eval(*value)?));
                }
                Ok(map_from_pairs(fields))
            }
            Node::Call { callee, args } => {
                let name = match self.node(*callee) {
                    Node::Identifier(name) => name.as_str(),
                    other => other.kind_name(),
                };
                let args = args
                    .iter()
                    .map(|arg| self.eval(*arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let function = self.program.function(name).ok_or_else(|| EvalError::Function {
                    name: name.to_string(),
                    message: "function is not registered".into(),
                })?;
                function(&args).map_err(|message| EvalError::Function {
                    name: name.to_string(),
                    message,
                })
            }
            Node::Builtin { name, args } => self.builtin(name, args),
            Node::Pointer(name) => self.pointer(name),
            Node::Member { .. } | Node::Slice { .. } => Ok(self.link(id)?.unwrap_or_default()),
            Node::Chain(inner) => Ok(self.link(*inner)?.unwrap_or_default()),
            Node::Pair { .. } | Node::Predicate(_) => Err(EvalError::Detached {
                kind: self.node(id).kind_name().to_string(),
            }),
        }
    }

    fn lookup(&self, name: &str) -> Result<Value, EvalError> {
        if let Some((_, value)) = self.scopes.iter().rev().find(|(n, _)| n == name) {
            return Ok(value.clone());
        }
        self.env
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UnknownName {
                name: name.to_string(),
            })
    }

    fn binary(&mut self, id: NodeId, op: BinaryOp, left: NodeId, right: NodeId) -> Result<Value, EvalError> {
        let lhs = self.eval(left)?;
        match op {
            BinaryOp::Or | BinaryOp::And => {
                let l = expect_bool(op.symbol(), &lhs)?;
                if l == (op == BinaryOp::Or) {
                    return Ok(Value::Bool(l));
                }
                let rhs = self.eval(right)?;
                expect_bool(op.symbol(), &rhs).map(Value::Bool)
            }
            BinaryOp::Coalesce => {
                if lhs.is_nil() {
                    self.eval(right)
                } else {
                    Ok(lhs)
                }
            }
            _ => {
                let rhs = self.eval(right)?;
                self.strict_binary(id, op, &lhs, &rhs)
            }
        }
    }

    fn strict_binary(&self, id: NodeId, op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
        match op {
            BinaryOp::Eq => Ok(Value::Bool(ops::equal(lhs, rhs))),
            BinaryOp::Ne => Ok(Value::Bool(!ops::equal(lhs, rhs))),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => ops::compare(op, lhs, rhs).map(Value::Bool),
            BinaryOp::In | BinaryOp::Contains | BinaryOp::StartsWith | BinaryOp::EndsWith => {
                ops::membership(op, lhs, rhs).map(Value::Bool)
            }
            BinaryOp::Matches => self.matches(id, lhs, rhs).map(Value::Bool),
            BinaryOp::Range => ops::range(lhs, rhs),
            _ => ops::arithmetic(op, lhs, rhs),
        }
    }

    fn matches(&self, id: NodeId, lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
        let (Value::String(text), Value::String(pattern)) = (lhs, rhs) else {
            return Err(EvalError::TypeMismatch {
                op: "matches".into(),
                left: lhs.type_name().into(),
                right: rhs.type_name().into(),
            });
        };
        if let Some(regex) = self.program.pattern(id) {
            return Ok(regex.is_match(text));
        }
        let regex = regex::Regex::new(pattern).map_err(|e| EvalError::InvalidPattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
        Ok(regex.is_match(text))
    }

    /// Evaluates a postfix link. `None` means an optional access met `nil`
    /// and the enclosing chain evaluates to `nil`.
    fn link(&mut self, id: NodeId) -> Result<Option<Value>, EvalError> {
        match self.node(id) {
            Node::Member {
                base,
                property,
                optional,
            } => {
                let Some(base) = self.link(*base)? else {
                    return Ok(None);
                };
                if *optional && base.is_nil() {
                    return Ok(None);
                }
                let key = self.eval(*property)?;
                fetch(&base, &key).map(Some)
            }
            Node::Slice { base, from, to } => {
                let Some(base) = self.link(*base)? else {
                    return Ok(None);
                };
                let from = from.map(|f| self.eval(f)).transpose()?;
                let to = to.map(|t| self.eval(t)).transpose()?;
                slice(&base, from.as_ref(), to.as_ref()).map(Some)
            }
            _ => self.eval(id).map(Some),
        }
    }

    fn builtin(&mut self, name: &str, args: &[NodeId]) -> Result<Value, EvalError> {
        let predicate = builtins::lookup(name).and_then(|b| b.predicate);
        let Some(index) = predicate else {
            let values = args
                .iter()
                .map(|arg| self.eval(*arg))
                .collect::<Result<Vec<_>, _>>()?;
            return builtins::call(name, &values);
        };

        let (Some(collection), Some(Node::Predicate(body))) =
            (args.first(), args.get(index).map(|p| self.node(*p)))
        else {
            return Err(EvalError::Builtin {
                name: name.to_string(),
                message: "missing predicate".into(),
            });
        };
        let collection = self.eval(*collection)?;
        let items = builtins::elements(name, collection)?;

        let mut matched = 0usize;
        let mut kept = Vec::new();
        let mut mapped = Vec::new();
        for (position, item) in items.into_iter().enumerate() {
            self.frames.push(Frame {
                item: item.clone(),
                index: position,
            });
            let result = self.eval(*body);
            self.frames.pop();
            let result = result?;

            if name == "map" {
                mapped.push(result);
                continue;
            }
            let hit = expect_bool(name, &result)?;
            match name {
                "all" if !hit => return Ok(Value::Bool(false)),
                "any" if hit => return Ok(Value::Bool(true)),
                "none" if hit => return Ok(Value::Bool(false)),
                "filter" if hit => kept.push(item),
                _ if hit => matched += 1,
                _ => {}
            }
        }

        Ok(match name {
            "all" | "none" => Value::Bool(true),
            "any" => Value::Bool(false),
            "one" => Value::Bool(matched == 1),
            "filter" => Value::Array(kept),
            "map" => Value::Array(mapped),
            _ => Value::Int(matched as i64),
        })
    }

    fn pointer(&self, name: &str) -> Result<Value, EvalError> {
        let unknown = || EvalError::UnknownPointer {
            name: name.to_string(),
        };
        let frame = self.frames.last().ok_or_else(unknown)?;
        match name {
            "" => Ok(frame.item.clone()),
            "index" => Ok(Value::Int(frame.index as i64)),
            _ => match &frame.item {
                Value::Map(fields) => fields.get(name).cloned().ok_or_else(unknown),
                _ => Err(unknown()),
            },
        }
    }
}

fn constant_array(set: &ConstSet) -> Value {
    match set {
        ConstSet::Strings(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
        ConstSet::Ints(items) => Value::Array(items.iter().copied().map(Value::Int).collect()),
    }
}

fn unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match (op, value) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Neg, Value::Int(i)) => i
            .checked_neg()
            .map(Value::Int)
            .ok_or(EvalError::IntegerOverflow { op: "-".into() }),
        (UnaryOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnaryOp::Plus, v @ (Value::Int(_) | Value::Float(_))) => Ok(v),
        (UnaryOp::Not, other) => Err(operand_error("!", "bool", &other)),
        (op, other) => Err(operand_error(op.symbol(), "number", &other)),
    }
}

/// Resolves a negative index from the end; `None` if out of range.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let resolved = if index < 0 { index + len as i64 } else { index };
    (0..len as i64).contains(&resolved).then_some(resolved as usize)
}

fn fetch(base: &Value, key: &Value) -> Result<Value, EvalError> {
    match (base, key) {
        (Value::Map(fields), Value::String(name)) => Ok(fields.get(name).cloned().unwrap_or_default()),
        (Value::Array(items), Value::Int(i)) => resolve_index(*i, items.len())
            .map(|i| items[i].clone())
            .ok_or(EvalError::IndexOutOfRange {
                index: *i,
                len: items.len(),
            }),
        (Value::String(s), Value::Int(i)) => {
            let chars: Vec<char> = s.chars().collect();
            resolve_index(*i, chars.len())
                .map(|i| Value::String(chars[i].to_string()))
                .ok_or(EvalError::IndexOutOfRange {
                    index: *i,
                    len: chars.len(),
                })
        }
        _ => Err(EvalError::CannotFetch {
            property: key.to_string(),
            type_name: base.type_name().to_string(),
        }),
    }
}

fn slice(base: &Value, from: Option<&Value>, to: Option<&Value>) -> Result<Value, EvalError> {
    let bound = |v: Option<&Value>, default: usize, len: usize| -> Result<usize, EvalError> {
        match v {
            None => Ok(default),
            Some(Value::Int(i)) => {
                let i = if *i < 0 { *i + len as i64 } else { *i };
                Ok(i.clamp(0, len as i64) as usize)
            }
            Some(other) => Err(operand_error("[:]", "int", other)),
        }
    };
    match base {
        Value::Array(items) => {
            let len = items.len();
            let (a, b) = (bound(from, 0, len)?, bound(to, len, len)?);
            Ok(Value::Array(items[a..b.max(a)].to_vec()))
        }
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let len = chars.len();
            let (a, b) = (bound(from, 0, len)?, bound(to, len, len)?);
            Ok(Value::String(chars[a..b.max(a)].iter().collect()))
        }
        other => Err(operand_error("[:]", "array or string", other)),
    }
}
