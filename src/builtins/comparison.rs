// ABOUTME: Comparison natives: =, <, <=, >, >=

use crate::env::Env;
use crate::error::EvalError;
use crate::value::Value;
use std::rc::Rc;

fn numbers(function: &str, args: &[Value]) -> Result<Vec<f64>, EvalError> {
    args.iter()
        .enumerate()
        .map(|(i, v)| match v {
            Value::Number(n) => Ok(*n),
            other => Err(EvalError::type_error(function, "number", other, i)),
        })
        .collect()
}

fn relational(function: &str, args: &[Value], rel: impl Fn(f64, f64) -> bool) -> Result<Value, EvalError> {
    if args.len() < 2 {
        return Err(EvalError::arity_error(function, "at least 2", args.len()));
    }
    let nums = numbers(function, args)?;
    Ok(Value::Bool(nums.windows(2).all(|pair| rel(pair[0], pair[1]))))
}

fn eq(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() < 2 {
        return Err(EvalError::arity_error("=", "at least 2", args.len()));
    }
    Ok(Value::Bool(args.windows(2).all(|pair| pair[0].structural_eq(&pair[1]))))
}

fn lt(args: &[Value]) -> Result<Value, EvalError> {
    relational("<", args, |a, b| a < b)
}

fn le(args: &[Value]) -> Result<Value, EvalError> {
    relational("<=", args, |a, b| a <= b)
}

fn gt(args: &[Value]) -> Result<Value, EvalError> {
    relational(">", args, |a, b| a > b)
}

fn ge(args: &[Value]) -> Result<Value, EvalError> {
    relational(">=", args, |a, b| a >= b)
}

pub fn register(env: &Rc<Env>) {
    env.define("=".to_string(), Value::NativeFunction { name: "=".to_string(), func: eq });
    env.define("<".to_string(), Value::NativeFunction { name: "<".to_string(), func: lt });
    env.define("<=".to_string(), Value::NativeFunction { name: "<=".to_string(), func: le });
    env.define(">".to_string(), Value::NativeFunction { name: ">".to_string(), func: gt });
    env.define(">=".to_string(), Value::NativeFunction { name: ">=".to_string(), func: ge });
}
