// ABOUTME: Arithmetic natives: +, -, *, /, inc, dec, min, max

use crate::env::Env;
use crate::error::EvalError;
use crate::value::Value;
use std::rc::Rc;

fn as_number(function: &str, v: &Value, position: usize) -> Result<f64, EvalError> {
    match v {
        Value::Number(n) => Ok(*n),
        other => Err(EvalError::type_error(function, "number", other, position)),
    }
}

fn numbers(function: &str, args: &[Value]) -> Result<Vec<f64>, EvalError> {
    args.iter()
        .enumerate()
        .map(|(i, v)| as_number(function, v, i))
        .collect()
}

fn add(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Number(numbers("+", args)?.into_iter().sum()))
}

fn sub(args: &[Value]) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Err(EvalError::arity_error("-", "at least 1", 0));
    }
    let nums = numbers("-", args)?;
    if nums.len() == 1 {
        return Ok(Value::Number(-nums[0]));
    }
    Ok(Value::Number(nums[1..].iter().fold(nums[0], |acc, n| acc - n)))
}

fn mul(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Number(numbers("*", args)?.into_iter().product()))
}

fn div(args: &[Value]) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Err(EvalError::arity_error("/", "at least 1", 0));
    }
    let nums = numbers("/", args)?;
    if nums.len() == 1 {
        if nums[0] == 0.0 {
            return Err(EvalError::runtime_error("/", "division by zero"));
        }
        return Ok(Value::Number(1.0 / nums[0]));
    }
    let mut acc = nums[0];
    for n in &nums[1..] {
        if *n == 0.0 {
            return Err(EvalError::runtime_error("/", "division by zero"));
        }
        acc /= n;
    }
    Ok(Value::Number(acc))
}

fn inc(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error("inc", "1", args.len()));
    }
    Ok(Value::Number(as_number("inc", &args[0], 0)? + 1.0))
}

fn dec(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error("dec", "1", args.len()));
    }
    Ok(Value::Number(as_number("dec", &args[0], 0)? - 1.0))
}

fn min_fn(args: &[Value]) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Err(EvalError::arity_error("min", "at least 1", 0));
    }
    let nums = numbers("min", args)?;
    Ok(Value::Number(nums.into_iter().fold(f64::INFINITY, f64::min)))
}

fn max_fn(args: &[Value]) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Err(EvalError::arity_error("max", "at least 1", 0));
    }
    let nums = numbers("max", args)?;
    Ok(Value::Number(nums.into_iter().fold(f64::NEG_INFINITY, f64::max)))
}

pub fn register(env: &Rc<Env>) {
    env.define("+".to_string(), Value::NativeFunction { name: "+".to_string(), func: add });
    env.define("-".to_string(), Value::NativeFunction { name: "-".to_string(), func: sub });
    env.define("*".to_string(), Value::NativeFunction { name: "*".to_string(), func: mul });
    env.define("/".to_string(), Value::NativeFunction { name: "/".to_string(), func: div });
    env.define("inc".to_string(), Value::NativeFunction { name: "inc".to_string(), func: inc });
    env.define("dec".to_string(), Value::NativeFunction { name: "dec".to_string(), func: dec });
    env.define("min".to_string(), Value::NativeFunction { name: "min".to_string(), func: min_fn });
    env.define("max".to_string(), Value::NativeFunction { name: "max".to_string(), func: max_fn });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plus_with_no_args_is_zero() {
        assert!(matches!(add(&[]), Ok(Value::Number(n)) if n == 0.0));
    }

    #[test]
    fn minus_single_arg_negates() {
        assert!(matches!(sub(&[Value::Number(5.0)]), Ok(Value::Number(n)) if n == -5.0));
    }

    #[test]
    fn times_with_no_args_is_one() {
        assert!(matches!(mul(&[]), Ok(Value::Number(n)) if n == 1.0));
    }

    #[test]
    fn divide_by_zero_errors() {
        let err = div(&[Value::Number(1.0), Value::Number(0.0)]).unwrap_err();
        assert!(matches!(err, EvalError::RuntimeError { .. }));
    }

    #[test]
    fn mixed_arg_type_error_names_operand() {
        let err = add(&[Value::Number(1.0), Value::String("x".into())]).unwrap_err();
        assert!(matches!(err, EvalError::TypeMismatch { position: 1, .. }));
    }

    #[test]
    fn min_and_max() {
        let args = vec![Value::Number(3.0), Value::Number(1.0), Value::Number(2.0)];
        assert!(matches!(min_fn(&args), Ok(Value::Number(n)) if n == 1.0));
        assert!(matches!(max_fn(&args), Ok(Value::Number(n)) if n == 3.0));
    }
}
