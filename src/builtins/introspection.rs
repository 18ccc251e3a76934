// ABOUTME: Natives that reach into session state: eval, macroexpand-1, macroexpand, require

use crate::env::Env;
use crate::error::EvalError;
use crate::eval::{macroexpand, macroexpand_1};
use crate::session;
use crate::value::Value;
use std::rc::Rc;

fn eval_fn(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error("eval", "1", args.len()));
    }
    session::with_context(|ctx| {
        let env = session::current_namespace_env(ctx)?;
        crate::eval::eval(&args[0], &env)
    })
}

fn macroexpand_1_fn(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error("macroexpand-1", "1", args.len()));
    }
    session::with_context(|ctx| {
        let env = session::current_namespace_env(ctx)?;
        macroexpand_1(&args[0], &env)
    })
}

fn macroexpand_fn(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error("macroexpand", "1", args.len()));
    }
    session::with_context(|ctx| {
        let env = session::current_namespace_env(ctx)?;
        macroexpand(&args[0], &env)
    })
}

fn require_fn(args: &[Value]) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Err(EvalError::arity_error("require", "at least 1", 0));
    }
    session::with_context(|ctx| {
        let env = session::current_namespace_env(ctx)?;
        for spec in args {
            session::apply_require_spec(ctx, spec, &env).map_err(|e| match e {
                crate::error::LispError::Evaluation(ev) => ev,
                other => EvalError::runtime_error("require", other.to_string()),
            })?;
        }
        Ok(Value::Nil)
    })
}

pub fn register(env: &Rc<Env>) {
    env.define("eval".to_string(), Value::NativeFunction { name: "eval".to_string(), func: eval_fn });
    env.define(
        "macroexpand-1".to_string(),
        Value::NativeFunction { name: "macroexpand-1".to_string(), func: macroexpand_1_fn },
    );
    env.define(
        "macroexpand".to_string(),
        Value::NativeFunction { name: "macroexpand".to_string(), func: macroexpand_fn },
    );
    env.define("require".to_string(), Value::NativeFunction { name: "require".to_string(), func: require_fn });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{create_session, SessionOptions};

    #[test]
    fn eval_runs_in_the_current_namespace() {
        let s = create_session(SessionOptions::default());
        s.evaluate("(def x 5)").unwrap();
        let v = s.evaluate("(eval (quote (+ x 1)))").unwrap();
        assert!(matches!(v, Value::Number(n) if n == 6.0));
    }

    #[test]
    fn macroexpand_1_expands_a_single_step() {
        let s = create_session(SessionOptions::default());
        s.evaluate("(defmacro twice [x] `(do ~x ~x))").unwrap();
        let v = s.evaluate("(macroexpand-1 (quote (twice 1)))").unwrap();
        assert!(matches!(v, Value::List(items) if items.len() == 3));
    }

    #[test]
    fn macroexpand_1_on_a_non_macro_call_is_identity() {
        let s = create_session(SessionOptions::default());
        let v = s.evaluate("(macroexpand-1 (quote (+ 1 2)))").unwrap();
        assert!(matches!(v, Value::List(items) if items.len() == 3));
    }

    #[test]
    fn require_native_installs_an_alias() {
        let s = create_session(SessionOptions::default());
        s.load_file("(ns m) (def pi 3.14)", None).unwrap();
        let v = s.evaluate("(require (quote [m :as m])) m/pi").unwrap();
        assert!(matches!(v, Value::Number(n) if (n - 3.14).abs() < 1e-9));
    }
}
