// ABOUTME: Natives that call back into the evaluator: map, filter, reduce, apply

use crate::env::Env;
use crate::error::EvalError;
use crate::eval::apply_function;
use crate::value::Value;
use std::rc::Rc;

/// Returns a collection's elements plus whether it was a Vector, so callers
/// can reconstruct the right output shape (Vector in, Vector out; else List).
fn seq_and_shape(function: &str, v: &Value, position: usize) -> Result<(Vec<Value>, bool), EvalError> {
    match v {
        Value::Vector(items) => Ok((items.clone(), true)),
        Value::List(items) => Ok((items.clone(), false)),
        Value::Map(entries) => Ok((
            entries.iter().map(|(k, val)| Value::Vector(vec![k.clone(), val.clone()])).collect(),
            false,
        )),
        Value::Nil => Ok((vec![], false)),
        other => Err(EvalError::type_error(function, "collection", other, position)),
    }
}

fn elements(function: &str, v: &Value, position: usize) -> Result<Vec<Value>, EvalError> {
    Ok(seq_and_shape(function, v, position)?.0)
}

fn map_fn(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("map", "2", args.len()));
    }
    let (elems, is_vector) = seq_and_shape("map", &args[1], 1)?;
    let mut out = Vec::with_capacity(elems.len());
    for e in elems {
        out.push(apply_function(&args[0], vec![e])?);
    }
    Ok(if is_vector { Value::Vector(out) } else { Value::List(out) })
}

fn filter_fn(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("filter", "2", args.len()));
    }
    let (elems, is_vector) = seq_and_shape("filter", &args[1], 1)?;
    let mut out = Vec::new();
    for e in elems {
        if apply_function(&args[0], vec![e.clone()])?.is_truthy() {
            out.push(e);
        }
    }
    Ok(if is_vector { Value::Vector(out) } else { Value::List(out) })
}

fn reduce_fn(args: &[Value]) -> Result<Value, EvalError> {
    match args.len() {
        2 => {
            let elems = elements("reduce", &args[1], 1)?;
            let mut iter = elems.into_iter();
            let Some(mut acc) = iter.next() else {
                return Err(EvalError::runtime_error("reduce", "empty collection requires an initial value"));
            };
            for e in iter {
                acc = apply_function(&args[0], vec![acc, e])?;
            }
            Ok(acc)
        }
        3 => {
            let elems = elements("reduce", &args[2], 2)?;
            let mut acc = args[1].clone();
            for e in elems {
                acc = apply_function(&args[0], vec![acc, e])?;
            }
            Ok(acc)
        }
        n => Err(EvalError::arity_error("reduce", "2 or 3", n)),
    }
}

fn apply_fn(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() < 2 {
        return Err(EvalError::arity_error("apply", "at least 2", args.len()));
    }
    let f = &args[0];
    let last_position = args.len() - 1;
    let mut call_args: Vec<Value> = args[1..last_position].to_vec();
    call_args.extend(elements("apply", &args[last_position], last_position)?);
    apply_function(f, call_args)
}

pub fn register(env: &Rc<Env>) {
    env.define("map".to_string(), Value::NativeFunction { name: "map".to_string(), func: map_fn });
    env.define("filter".to_string(), Value::NativeFunction { name: "filter".to_string(), func: filter_fn });
    env.define("reduce".to_string(), Value::NativeFunction { name: "reduce".to_string(), func: reduce_fn });
    env.define("apply".to_string(), Value::NativeFunction { name: "apply".to_string(), func: apply_fn });
}
