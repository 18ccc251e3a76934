// ABOUTME: Collection natives: count/first/rest/cons/conj/assoc/dissoc/get/seq/nth/take/drop/concat/into/zipmap/keys/vals/repeat

use crate::env::Env;
use crate::error::EvalError;
use crate::value::Value;
use std::rc::Rc;

fn arity_range(function: &str, args: &[Value], min: usize, max: usize) -> Result<(), EvalError> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{}-{}", min, max)
        };
        return Err(EvalError::arity_error(function, expected, args.len()));
    }
    Ok(())
}

fn as_index(function: &str, v: &Value, position: usize) -> Result<usize, EvalError> {
    match v {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Ok(*n as usize),
        other => Err(EvalError::type_error(function, "non-negative integer index", other, position)),
    }
}

/// Flattens any collection (or Nil) into its elements; Maps flatten as `[k v]`.
fn elements_of(function: &str, v: &Value, position: usize) -> Result<Vec<Value>, EvalError> {
    match v {
        Value::List(items) | Value::Vector(items) => Ok(items.clone()),
        Value::Map(entries) => Ok(entries
            .iter()
            .map(|(k, val)| Value::Vector(vec![k.clone(), val.clone()]))
            .collect()),
        Value::Nil => Ok(vec![]),
        other => Err(EvalError::type_error(function, "collection", other, position)),
    }
}

fn as_kv_pair(function: &str, v: &Value) -> Result<(Value, Value), EvalError> {
    match v {
        Value::Vector(pair) if pair.len() == 2 => Ok((pair[0].clone(), pair[1].clone())),
        other => Err(EvalError::type_error(function, "[k v] pair", other, 0)),
    }
}

fn map_upsert(entries: &mut Vec<(Value, Value)>, k: Value, v: Value) {
    if let Some(pos) = entries.iter().position(|(ek, _)| ek.structural_eq(&k)) {
        entries[pos].1 = v;
    } else {
        entries.push((k, v));
    }
}

fn count_fn(args: &[Value]) -> Result<Value, EvalError> {
    arity_range("count", args, 1, 1)?;
    let n = match &args[0] {
        Value::List(items) | Value::Vector(items) => items.len(),
        Value::Map(entries) => entries.len(),
        other => return Err(EvalError::type_error("count", "collection", other, 0)),
    };
    Ok(Value::Number(n as f64))
}

fn first_fn(args: &[Value]) -> Result<Value, EvalError> {
    arity_range("first", args, 1, 1)?;
    Ok(match &args[0] {
        Value::List(items) | Value::Vector(items) => items.first().cloned().unwrap_or(Value::Nil),
        Value::Map(entries) => entries
            .first()
            .map(|(k, v)| Value::Vector(vec![k.clone(), v.clone()]))
            .unwrap_or(Value::Nil),
        Value::Nil => Value::Nil,
        other => return Err(EvalError::type_error("first", "collection", other, 0)),
    })
}

fn rest_fn(args: &[Value]) -> Result<Value, EvalError> {
    arity_range("rest", args, 1, 1)?;
    Ok(match &args[0] {
        Value::List(items) => Value::List(items.get(1..).unwrap_or(&[]).to_vec()),
        Value::Vector(items) => Value::Vector(items.get(1..).unwrap_or(&[]).to_vec()),
        Value::Map(entries) => Value::Map(entries.get(1..).unwrap_or(&[]).to_vec()),
        Value::Nil => Value::List(vec![]),
        other => return Err(EvalError::type_error("rest", "collection", other, 0)),
    })
}

fn cons_fn(args: &[Value]) -> Result<Value, EvalError> {
    arity_range("cons", args, 2, 2)?;
    let x = args[0].clone();
    Ok(match &args[1] {
        Value::List(items) => {
            let mut items = items.clone();
            items.insert(0, x);
            Value::List(items)
        }
        Value::Nil => Value::List(vec![x]),
        Value::Vector(items) => {
            let mut items = items.clone();
            items.insert(0, x);
            Value::Vector(items)
        }
        Value::Map(_) => return Err(EvalError::runtime_error("cons", "cannot cons onto a map")),
        other => return Err(EvalError::type_error("cons", "collection", other, 1)),
    })
}

fn conj_fn(args: &[Value]) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Err(EvalError::arity_error("conj", "at least 1", 0));
    }
    let xs = &args[1..];
    Ok(match &args[0] {
        Value::List(items) => {
            let mut items = items.clone();
            for x in xs {
                items.insert(0, x.clone());
            }
            Value::List(items)
        }
        Value::Nil => {
            let mut items = Vec::new();
            for x in xs {
                items.insert(0, x.clone());
            }
            Value::List(items)
        }
        Value::Vector(items) => {
            let mut items = items.clone();
            items.extend(xs.iter().cloned());
            Value::Vector(items)
        }
        Value::Map(entries) => {
            let mut entries = entries.clone();
            for x in xs {
                let (k, v) = as_kv_pair("conj", x)?;
                map_upsert(&mut entries, k, v);
            }
            Value::Map(entries)
        }
        other => return Err(EvalError::type_error("conj", "collection", other, 0)),
    })
}

fn assoc_fn(args: &[Value]) -> Result<Value, EvalError> {
    if args.is_empty() || (args.len() - 1) % 2 != 0 {
        return Err(EvalError::runtime_error("assoc", "requires a collection and key/value pairs"));
    }
    match &args[0] {
        Value::Vector(items) => {
            let mut items = items.clone();
            for pair in args[1..].chunks(2) {
                let idx = as_index("assoc", &pair[0], 1)?;
                if idx > items.len() {
                    return Err(EvalError::runtime_error(
                        "assoc",
                        format!("index {} is out of bounds for vector of length {}", idx, items.len()),
                    ));
                }
                if idx == items.len() {
                    items.push(pair[1].clone());
                } else {
                    items[idx] = pair[1].clone();
                }
            }
            Ok(Value::Vector(items))
        }
        Value::Map(entries) => {
            let mut entries = entries.clone();
            for pair in args[1..].chunks(2) {
                map_upsert(&mut entries, pair[0].clone(), pair[1].clone());
            }
            Ok(Value::Map(entries))
        }
        Value::List(_) => Err(EvalError::runtime_error("assoc", "not supported for lists")),
        other => Err(EvalError::type_error("assoc", "vector or map", other, 0)),
    }
}

fn dissoc_fn(args: &[Value]) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Err(EvalError::arity_error("dissoc", "at least 1", 0));
    }
    match &args[0] {
        Value::Map(entries) => {
            let mut entries = entries.clone();
            for key in &args[1..] {
                entries.retain(|(k, _)| !k.structural_eq(key));
            }
            Ok(Value::Map(entries))
        }
        Value::Vector(items) => {
            let mut items = items.clone();
            for key in &args[1..] {
                let idx = as_index("dissoc", key, 1)?;
                if idx >= items.len() {
                    return Err(EvalError::runtime_error(
                        "dissoc",
                        format!("index {} is out of bounds for vector of length {}", idx, items.len()),
                    ));
                }
                items.remove(idx);
            }
            Ok(Value::Vector(items))
        }
        Value::List(_) => Err(EvalError::runtime_error("dissoc", "not supported for lists")),
        other => Err(EvalError::type_error("dissoc", "vector or map", other, 0)),
    }
}

fn get_fn(args: &[Value]) -> Result<Value, EvalError> {
    arity_range("get", args, 2, 3)?;
    let default = args.get(2).cloned().unwrap_or(Value::Nil);
    Ok(match &args[0] {
        Value::Map(entries) => Value::map_get(entries, &args[1]).unwrap_or(default),
        Value::Vector(items) => match &args[1] {
            Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 => {
                items.get(*n as usize).cloned().unwrap_or(default)
            }
            _ => default,
        },
        _ => default,
    })
}

fn seq_fn(args: &[Value]) -> Result<Value, EvalError> {
    arity_range("seq", args, 1, 1)?;
    Ok(match &args[0] {
        Value::Nil => Value::Nil,
        Value::List(items) | Value::Vector(items) => {
            if items.is_empty() {
                Value::Nil
            } else {
                Value::List(items.clone())
            }
        }
        Value::Map(entries) => {
            if entries.is_empty() {
                Value::Nil
            } else {
                Value::List(
                    entries
                        .iter()
                        .map(|(k, v)| Value::Vector(vec![k.clone(), v.clone()]))
                        .collect(),
                )
            }
        }
        other => return Err(EvalError::type_error("seq", "collection", other, 0)),
    })
}

fn nth_fn(args: &[Value]) -> Result<Value, EvalError> {
    arity_range("nth", args, 2, 3)?;
    let idx = as_index("nth", &args[1], 1)?;
    let items = match &args[0] {
        Value::List(items) | Value::Vector(items) => items,
        other => return Err(EvalError::type_error("nth", "list or vector", other, 0)),
    };
    match items.get(idx) {
        Some(v) => Ok(v.clone()),
        None => match args.get(2) {
            Some(default) => Ok(default.clone()),
            None => Err(EvalError::runtime_error(
                "nth",
                format!("index {} out of range for collection of length {}", idx, items.len()),
            )),
        },
    }
}

fn take_fn(args: &[Value]) -> Result<Value, EvalError> {
    arity_range("take", args, 2, 2)?;
    let n = as_index("take", &args[0], 0)?;
    let items = elements_of("take", &args[1], 1)?;
    Ok(Value::List(items.into_iter().take(n).collect()))
}

fn drop_fn(args: &[Value]) -> Result<Value, EvalError> {
    arity_range("drop", args, 2, 2)?;
    let n = as_index("drop", &args[0], 0)?;
    let items = elements_of("drop", &args[1], 1)?;
    Ok(Value::List(items.into_iter().skip(n).collect()))
}

fn concat_fn(args: &[Value]) -> Result<Value, EvalError> {
    let mut out = Vec::new();
    for (i, coll) in args.iter().enumerate() {
        out.extend(elements_of("concat", coll, i)?);
    }
    Ok(Value::List(out))
}

fn into_fn(args: &[Value]) -> Result<Value, EvalError> {
    arity_range("into", args, 2, 2)?;
    let elements = elements_of("into", &args[1], 1)?;
    Ok(match &args[0] {
        Value::List(items) => {
            let mut items = items.clone();
            for e in elements {
                items.insert(0, e);
            }
            Value::List(items)
        }
        Value::Nil => {
            let mut items = Vec::new();
            for e in elements {
                items.insert(0, e);
            }
            Value::List(items)
        }
        Value::Vector(items) => {
            let mut items = items.clone();
            items.extend(elements);
            Value::Vector(items)
        }
        Value::Map(entries) => {
            let mut entries = entries.clone();
            for e in elements {
                let (k, v) = as_kv_pair("into", &e)?;
                map_upsert(&mut entries, k, v);
            }
            Value::Map(entries)
        }
        other => return Err(EvalError::type_error("into", "collection", other, 0)),
    })
}

fn zipmap_fn(args: &[Value]) -> Result<Value, EvalError> {
    arity_range("zipmap", args, 2, 2)?;
    let ks = elements_of("zipmap", &args[0], 0)?;
    let vs = elements_of("zipmap", &args[1], 1)?;
    let n = ks.len().min(vs.len());
    Ok(Value::Map(
        ks.into_iter().zip(vs).take(n).collect::<Vec<_>>(),
    ))
}

fn keys_fn(args: &[Value]) -> Result<Value, EvalError> {
    arity_range("keys", args, 1, 1)?;
    match &args[0] {
        Value::Map(entries) => Ok(Value::Vector(entries.iter().map(|(k, _)| k.clone()).collect())),
        other => Err(EvalError::type_error("keys", "map", other, 0)),
    }
}

fn vals_fn(args: &[Value]) -> Result<Value, EvalError> {
    arity_range("vals", args, 1, 1)?;
    match &args[0] {
        Value::Map(entries) => Ok(Value::Vector(entries.iter().map(|(_, v)| v.clone()).collect())),
        other => Err(EvalError::type_error("vals", "map", other, 0)),
    }
}

fn repeat_fn(args: &[Value]) -> Result<Value, EvalError> {
    arity_range("repeat", args, 2, 2)?;
    let n = as_index("repeat", &args[0], 0)?;
    Ok(Value::List(vec![args[1].clone(); n]))
}

pub fn register(env: &Rc<Env>) {
    let natives: &[(&str, crate::value::NativeFn)] = &[
        ("count", count_fn),
        ("first", first_fn),
        ("rest", rest_fn),
        ("cons", cons_fn),
        ("conj", conj_fn),
        ("assoc", assoc_fn),
        ("dissoc", dissoc_fn),
        ("get", get_fn),
        ("seq", seq_fn),
        ("nth", nth_fn),
        ("take", take_fn),
        ("drop", drop_fn),
        ("concat", concat_fn),
        ("into", into_fn),
        ("zipmap", zipmap_fn),
        ("keys", keys_fn),
        ("vals", vals_fn),
        ("repeat", repeat_fn),
    ];
    for (name, func) in natives {
        env.define(name.to_string(), Value::NativeFunction { name: name.to_string(), func: *func });
    }
}
