// ABOUTME: Evaluator module: special forms, function/macro application, recur trampoline

use crate::env::Env;
use crate::error::EvalError;
use crate::value::{Arity, FunctionData, Value};
use std::rc::Rc;

const SPECIAL_FORMS: &[&str] = &[
    "quote", "quasiquote", "def", "ns", "if", "do", "let", "fn", "defmacro", "loop", "recur",
];

/// Evaluates `expr` in `env`. Tail positions of `if`/`do`/`let` are handled
/// by mutating the loop's `expr`/`env` rather than recursing, so only
/// `recur`-driven iteration and actual function calls grow the host stack.
pub fn eval(expr: &Value, env: &Rc<Env>) -> Result<Value, EvalError> {
    let mut expr = expr.clone();
    let mut env = Rc::clone(env);

    loop {
        match &expr {
            Value::Number(_)
            | Value::String(_)
            | Value::Bool(_)
            | Value::Nil
            | Value::Keyword(_)
            | Value::Function(_)
            | Value::NativeFunction { .. }
            | Value::Macro(_) => return Ok(expr),

            Value::Symbol(name) => return eval_symbol(name, &env),

            Value::Vector(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(eval(item, &env)?);
                }
                return Ok(Value::Vector(out));
            }

            Value::Map(entries) => {
                let mut out = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    out.push((eval(k, &env)?, eval(v, &env)?));
                }
                return Ok(Value::Map(out));
            }

            Value::List(items) => {
                if items.is_empty() {
                    return Err(EvalError::runtime_error("eval", "cannot evaluate an empty list"));
                }

                if let Value::Symbol(head) = &items[0] {
                    if SPECIAL_FORMS.contains(&head.as_str()) {
                        match head.as_str() {
                            "quote" => return Ok(items.get(1).cloned().unwrap_or(Value::Nil)),
                            "quasiquote" => {
                                return eval_quasiquote(items.get(1).unwrap_or(&Value::Nil), &env)
                            }
                            "def" => return eval_def(items, &env),
                            "ns" => return Ok(Value::Nil),
                            "if" => {
                                if items.len() < 3 || items.len() > 4 {
                                    return Err(EvalError::runtime_error(
                                        "if",
                                        "expects (if cond then else?)",
                                    ));
                                }
                                let cond = eval(&items[1], &env)?;
                                if cond.is_truthy() {
                                    expr = items[2].clone();
                                    continue;
                                } else if items.len() == 4 {
                                    expr = items[3].clone();
                                    continue;
                                } else {
                                    return Ok(Value::Nil);
                                }
                            }
                            "do" => {
                                if items.len() == 1 {
                                    return Ok(Value::Nil);
                                }
                                for item in &items[1..items.len() - 1] {
                                    eval(item, &env)?;
                                }
                                expr = items[items.len() - 1].clone();
                                continue;
                            }
                            "let" => {
                                let (new_env, body) = build_let_env(items, &env)?;
                                if body.is_empty() {
                                    return Ok(Value::Nil);
                                }
                                for item in &body[..body.len() - 1] {
                                    eval(item, &new_env)?;
                                }
                                expr = body[body.len() - 1].clone();
                                env = new_env;
                                continue;
                            }
                            "fn" => return build_function(&items[1..], &env, None),
                            "defmacro" => return eval_defmacro(items, &env),
                            "loop" => return eval_loop(items, &env),
                            "recur" => {
                                let args = items[1..]
                                    .iter()
                                    .map(|a| eval(a, &env))
                                    .collect::<Result<Vec<_>, _>>()?;
                                return Err(EvalError::Recur(args));
                            }
                            _ => unreachable!("SPECIAL_FORMS and this match must agree"),
                        }
                    }
                }

                let head_val = eval(&items[0], &env)?;
                match &head_val {
                    Value::Macro(data) => {
                        let expanded = expand_macro(data, &items[1..])?;
                        expr = expanded;
                        continue;
                    }
                    Value::Function(_) | Value::NativeFunction { .. } => {
                        let args = items[1..]
                            .iter()
                            .map(|a| eval(a, &env))
                            .collect::<Result<Vec<_>, _>>()?;
                        return apply_function(&head_val, args);
                    }
                    Value::Keyword(kw) => {
                        let args = items[1..]
                            .iter()
                            .map(|a| eval(a, &env))
                            .collect::<Result<Vec<_>, _>>()?;
                        let target = args.first().cloned().unwrap_or(Value::Nil);
                        let default = args.get(1).cloned().unwrap_or(Value::Nil);
                        return Ok(match &target {
                            Value::Map(entries) => {
                                Value::map_get(entries, &Value::Keyword(kw.clone())).unwrap_or(default)
                            }
                            _ => default,
                        });
                    }
                    _ => {
                        return Err(match &items[0] {
                            Value::Symbol(s) => EvalError::NotCallable(s.clone()),
                            _ => EvalError::runtime_error(
                                "eval",
                                "first element must be a function or special form",
                            ),
                        });
                    }
                }
            }
        }
    }
}

/// Evaluates a sequence of forms as an implicit `do`, returning the last
/// result (or Nil for an empty sequence).
pub fn eval_body(body: &[Value], env: &Rc<Env>) -> Result<Value, EvalError> {
    if body.is_empty() {
        return Ok(Value::Nil);
    }
    for item in &body[..body.len() - 1] {
        eval(item, env)?;
    }
    eval(&body[body.len() - 1], env)
}

fn eval_symbol(name: &str, env: &Rc<Env>) -> Result<Value, EvalError> {
    if let Some(slash) = name.find('/') {
        let (alias, sym) = (&name[..slash], &name[slash + 1..]);
        if !alias.is_empty() && !sym.is_empty() {
            let ns_env = env.namespace_env();
            let target = ns_env.resolve_alias(alias).ok_or_else(|| {
                EvalError::runtime_error("eval", format!("No such namespace alias: {}", alias))
            })?;
            return target.lookup(sym);
        }
    }
    env.lookup(name)
}

fn eval_def(items: &[Value], env: &Rc<Env>) -> Result<Value, EvalError> {
    if items.len() != 3 {
        return Err(EvalError::arity_error("def", "2", items.len().saturating_sub(1)));
    }
    let name = match &items[1] {
        Value::Symbol(s) => s.clone(),
        other => return Err(EvalError::type_error("def", "symbol", other, 0)),
    };
    let value = eval(&items[2], env)?;
    env.namespace_env().define(name, value.clone());
    Ok(Value::Nil)
}

fn build_let_env(items: &[Value], env: &Rc<Env>) -> Result<(Rc<Env>, Vec<Value>), EvalError> {
    if items.len() < 2 {
        return Err(EvalError::runtime_error("let", "requires a bindings vector"));
    }
    let bindings = match &items[1] {
        Value::Vector(b) => b,
        other => return Err(EvalError::type_error("let", "bindings vector", other, 0)),
    };
    if bindings.len() % 2 != 0 {
        return Err(EvalError::runtime_error(
            "let",
            "bindings vector must have an even number of forms",
        ));
    }

    let mut current = Rc::clone(env);
    for pair in bindings.chunks(2) {
        let name = match &pair[0] {
            Value::Symbol(s) => s.clone(),
            other => return Err(EvalError::type_error("let", "symbol", other, 0)),
        };
        let value = eval(&pair[1], &current)?;
        current = Env::extend(&[name], &[value], current)?;
    }
    Ok((current, items[2..].to_vec()))
}

fn eval_loop(items: &[Value], env: &Rc<Env>) -> Result<Value, EvalError> {
    if items.len() < 2 {
        return Err(EvalError::runtime_error("loop", "requires a bindings vector"));
    }
    let bindings = match &items[1] {
        Value::Vector(b) => b,
        other => return Err(EvalError::type_error("loop", "bindings vector", other, 0)),
    };
    if bindings.len() % 2 != 0 {
        return Err(EvalError::runtime_error(
            "loop",
            "bindings vector must have an even number of forms",
        ));
    }

    let mut names = Vec::with_capacity(bindings.len() / 2);
    let mut current_args = Vec::with_capacity(bindings.len() / 2);
    let mut acc_env = Rc::clone(env);
    for pair in bindings.chunks(2) {
        let name = match &pair[0] {
            Value::Symbol(s) => s.clone(),
            other => return Err(EvalError::type_error("loop", "symbol", other, 0)),
        };
        let value = eval(&pair[1], &acc_env)?;
        acc_env = Env::extend(&[name.clone()], &[value.clone()], acc_env)?;
        names.push(name);
        current_args.push(value);
    }

    let body = &items[2..];
    loop {
        let iter_env = Env::extend(&names, &current_args, Rc::clone(env))?;
        match eval_body(body, &iter_env) {
            Ok(v) => return Ok(v),
            Err(EvalError::Recur(new_args)) => {
                if new_args.len() != names.len() {
                    return Err(EvalError::arity_error("recur", names.len().to_string(), new_args.len()));
                }
                current_args = new_args;
            }
            Err(e) => return Err(e),
        }
    }
}

fn parse_param_vector(
    params: &[Value],
    form_name: &str,
) -> Result<(Vec<String>, Option<String>), EvalError> {
    let mut names = Vec::new();
    let mut rest = None;
    let mut i = 0;
    while i < params.len() {
        let name = match &params[i] {
            Value::Symbol(s) => s.clone(),
            other => return Err(EvalError::type_error(form_name, "symbol parameter", other, i)),
        };
        if name == "&" {
            if i + 2 != params.len() {
                return Err(EvalError::runtime_error(
                    form_name,
                    "'&' must be followed by exactly one rest parameter at the end",
                ));
            }
            let rest_name = match &params[i + 1] {
                Value::Symbol(s) => s.clone(),
                other => {
                    return Err(EvalError::type_error(form_name, "symbol parameter", other, i + 1))
                }
            };
            rest = Some(rest_name);
            i += 2;
        } else {
            names.push(name);
            i += 1;
        }
    }
    Ok((names, rest))
}

fn parse_arities(tail: &[Value], form_name: &str) -> Result<Vec<Arity>, EvalError> {
    if tail.is_empty() {
        return Err(EvalError::runtime_error(
            form_name,
            "requires a parameter vector or one or more arity clauses",
        ));
    }

    match &tail[0] {
        Value::Vector(params) => {
            let (params, rest_param) = parse_param_vector(params, form_name)?;
            Ok(vec![Arity {
                params,
                rest_param,
                body: tail[1..].to_vec(),
            }])
        }
        Value::List(_) => {
            let mut arities = Vec::new();
            let mut seen_variadic = false;
            for clause in tail {
                let clause_items = match clause {
                    Value::List(items) => items,
                    other => return Err(EvalError::type_error(form_name, "arity clause", other, 0)),
                };
                let params_vec = match clause_items.first() {
                    Some(Value::Vector(v)) => v,
                    Some(other) => {
                        return Err(EvalError::type_error(form_name, "parameter vector", other, 0))
                    }
                    None => {
                        return Err(EvalError::runtime_error(
                            form_name,
                            "arity clause must start with a parameter vector",
                        ))
                    }
                };
                let (params, rest_param) = parse_param_vector(params_vec, form_name)?;
                if rest_param.is_some() {
                    if seen_variadic {
                        return Err(EvalError::runtime_error(
                            form_name,
                            "at most one arity may be variadic",
                        ));
                    }
                    seen_variadic = true;
                }
                arities.push(Arity {
                    params,
                    rest_param,
                    body: clause_items[1..].to_vec(),
                });
            }
            Ok(arities)
        }
        other => Err(EvalError::type_error(form_name, "vector or list", other, 0)),
    }
}

fn build_function(tail: &[Value], env: &Rc<Env>, name: Option<String>) -> Result<Value, EvalError> {
    let arities = parse_arities(tail, "fn")?;
    Ok(Value::Function(Rc::new(FunctionData {
        name,
        arities,
        env: Rc::clone(env),
    })))
}

fn eval_defmacro(items: &[Value], env: &Rc<Env>) -> Result<Value, EvalError> {
    if items.len() < 3 {
        return Err(EvalError::arity_error(
            "defmacro",
            "at least 2",
            items.len().saturating_sub(1),
        ));
    }
    let name = match &items[1] {
        Value::Symbol(s) => s.clone(),
        other => return Err(EvalError::type_error("defmacro", "symbol", other, 0)),
    };
    let arities = parse_arities(&items[2..], "defmacro")?;
    let macro_value = Value::Macro(Rc::new(FunctionData {
        name: Some(name.clone()),
        arities,
        env: Rc::clone(env),
    }));
    env.root_env().define(name, macro_value);
    Ok(Value::Nil)
}

fn select_arity<'a>(
    arities: &'a [Arity],
    arg_count: usize,
    name: &Option<String>,
) -> Result<&'a Arity, EvalError> {
    if let Some(arity) = arities
        .iter()
        .find(|a| !a.is_variadic() && a.params.len() == arg_count)
    {
        return Ok(arity);
    }
    if let Some(arity) = arities
        .iter()
        .find(|a| a.is_variadic() && arg_count >= a.params.len())
    {
        return Ok(arity);
    }
    let available: Vec<String> = arities.iter().map(|a| a.describe()).collect();
    let fn_name = name.clone().unwrap_or_else(|| "fn".to_string());
    Err(EvalError::runtime_error(
        &fn_name,
        format!(
            "No matching arity for {} arguments. Available arities: {}",
            arg_count,
            available.join(", ")
        ),
    ))
}

fn bind_params(
    params: &[String],
    rest_param: &Option<String>,
    args: &[Value],
    outer: Rc<Env>,
) -> Result<Rc<Env>, EvalError> {
    match rest_param {
        None => {
            if args.len() != params.len() {
                return Err(EvalError::arity_error("bind", params.len().to_string(), args.len()));
            }
            Env::extend(params, args, outer)
        }
        Some(rest_name) => {
            if args.len() < params.len() {
                return Err(EvalError::arity_error(
                    "bind",
                    format!("{}+", params.len()),
                    args.len(),
                ));
            }
            let env = Env::with_outer(outer);
            for (name, value) in params.iter().zip(args.iter()) {
                env.define(name.clone(), value.clone());
            }
            let rest_values = args[params.len()..].to_vec();
            let rest_value = if rest_values.is_empty() {
                Value::Nil
            } else {
                Value::List(rest_values)
            };
            env.define(rest_name.clone(), rest_value);
            Ok(env)
        }
    }
}

/// Applies a Function or NativeFunction to already-evaluated arguments,
/// running the `recur` trampoline for Function bodies.
pub fn apply_function(callee: &Value, args: Vec<Value>) -> Result<Value, EvalError> {
    match callee {
        Value::NativeFunction { func, .. } => func(&args),
        Value::Function(data) => {
            let mut current_args = args;
            loop {
                let arity = select_arity(&data.arities, current_args.len(), &data.name)?;
                let local = bind_params(
                    &arity.params,
                    &arity.rest_param,
                    &current_args,
                    Rc::clone(&data.env),
                )?;
                match eval_body(&arity.body, &local) {
                    Ok(v) => return Ok(v),
                    Err(EvalError::Recur(new_args)) => {
                        current_args = new_args;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        other => Err(EvalError::NotCallable(crate::printer::print_string(other))),
    }
}

fn expand_macro(data: &Rc<FunctionData>, arg_forms: &[Value]) -> Result<Value, EvalError> {
    let arity = select_arity(&data.arities, arg_forms.len(), &data.name)?;
    let local = bind_params(&arity.params, &arity.rest_param, arg_forms, Rc::clone(&data.env))?;
    eval_body(&arity.body, &local)
}

/// Expands `form` once if it is a macro call, else returns it unchanged.
pub fn macroexpand_1(form: &Value, env: &Rc<Env>) -> Result<Value, EvalError> {
    if let Value::List(items) = form {
        if let Some(Value::Symbol(name)) = items.first() {
            if let Some(Value::Macro(data)) = env.get(name) {
                return expand_macro(&data, &items[1..]);
            }
        }
    }
    Ok(form.clone())
}

/// Repeatedly applies `macroexpand_1` until a fixed point is reached.
pub fn macroexpand(form: &Value, env: &Rc<Env>) -> Result<Value, EvalError> {
    let mut current = form.clone();
    loop {
        let next = macroexpand_1(&current, env)?;
        if next == current {
            return Ok(next);
        }
        current = next;
    }
}

fn eval_quasiquote(form: &Value, env: &Rc<Env>) -> Result<Value, EvalError> {
    match form {
        Value::List(items)
            if items.len() == 2 && matches!(&items[0], Value::Symbol(s) if s == "unquote") =>
        {
            eval(&items[1], env)
        }
        Value::List(items) => Ok(Value::List(qq_seq(items, env)?)),
        Value::Vector(items) => Ok(Value::Vector(qq_seq(items, env)?)),
        Value::Map(entries) => {
            let mut out = Vec::with_capacity(entries.len());
            for (k, v) in entries {
                out.push((eval_quasiquote(k, env)?, eval_quasiquote(v, env)?));
            }
            Ok(Value::Map(out))
        }
        other => Ok(other.clone()),
    }
}

fn qq_seq(items: &[Value], env: &Rc<Env>) -> Result<Vec<Value>, EvalError> {
    let mut out = Vec::new();
    for item in items {
        if let Value::List(inner) = item {
            if inner.len() == 2
                && matches!(&inner[0], Value::Symbol(s) if s == "unquote-splicing")
            {
                let spliced = eval(&inner[1], env)?;
                match spliced {
                    Value::List(xs) | Value::Vector(xs) => out.extend(xs),
                    other => {
                        return Err(EvalError::type_error(
                            "unquote-splicing",
                            "list or vector",
                            &other,
                            0,
                        ))
                    }
                }
                continue;
            }
        }
        out.push(eval_quasiquote(item, env)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    fn eval_str(src: &str, env: &Rc<Env>) -> Value {
        let forms = parse_source(src).unwrap();
        eval_body(&forms, env).unwrap()
    }

    fn fresh_env() -> Rc<Env> {
        let core = Env::new_root(Some("clojure.core".to_string()));
        crate::builtins::register_builtins(&core);
        Env::new_namespace("user".to_string(), core)
    }

    #[test]
    fn self_evaluating_atoms() {
        let env = fresh_env();
        assert!(matches!(eval_str("42", &env), Value::Number(n) if n == 42.0));
        assert!(matches!(eval_str("\"hi\"", &env), Value::String(s) if s == "hi"));
        assert!(matches!(eval_str("true", &env), Value::Bool(true)));
    }

    #[test]
    fn def_and_lookup() {
        let env = fresh_env();
        eval_str("(def x 10)", &env);
        assert!(matches!(eval_str("x", &env), Value::Number(n) if n == 10.0));
    }

    #[test]
    fn if_and_do() {
        let env = fresh_env();
        assert!(matches!(eval_str("(if true 1 2)", &env), Value::Number(n) if n == 1.0));
        assert!(matches!(eval_str("(if false 1 2)", &env), Value::Number(n) if n == 2.0));
        assert!(matches!(eval_str("(if false 1)", &env), Value::Nil));
        assert!(matches!(eval_str("(do 1 2 3)", &env), Value::Number(n) if n == 3.0));
    }

    #[test]
    fn let_sequential_bindings() {
        let env = fresh_env();
        let v = eval_str("(let [x 1 y (+ x 1)] y)", &env);
        assert!(matches!(v, Value::Number(n) if n == 2.0));
    }

    #[test]
    fn closures_capture_lexical_scope() {
        let env = fresh_env();
        eval_str("(def make-adder (fn [n] (fn [x] (+ n x))))", &env);
        let v = eval_str("((make-adder 5) 3)", &env);
        assert!(matches!(v, Value::Number(n) if n == 8.0));
    }

    #[test]
    fn loop_recur_fibonacci() {
        let env = fresh_env();
        let v = eval_str(
            "(loop [i 0 a 0 b 1] (if (= i 10) a (recur (inc i) b (+ a b))))",
            &env,
        );
        assert!(matches!(v, Value::Number(n) if n == 55.0));
    }

    #[test]
    fn fn_recur_factorial() {
        let env = fresh_env();
        eval_str(
            "(def fact (fn [n] (loop [i n acc 1] (if (<= i 1) acc (recur (dec i) (* acc i))))))",
            &env,
        );
        let v = eval_str("(fact 10)", &env);
        assert!(matches!(v, Value::Number(n) if n == 3628800.0));
    }

    #[test]
    fn recur_wrong_arity_errors() {
        let env = fresh_env();
        let forms = parse_source("(loop [i 0] (recur 1 2))").unwrap();
        let err = eval_body(&forms, &env).unwrap_err();
        assert!(matches!(err, EvalError::ArityError { .. }));
    }

    #[test]
    fn recur_outside_loop_or_fn_is_an_error() {
        let env = fresh_env();
        let forms = parse_source("(recur 1)").unwrap();
        let err = eval_body(&forms, &env).unwrap_err();
        assert!(matches!(err, EvalError::Recur(_)));
    }

    #[test]
    fn multi_arity_dispatch() {
        let env = fresh_env();
        eval_str(
            "(def f (fn ([] 0) ([x] x) ([x & r] (+ x (count r)))))",
            &env,
        );
        assert!(matches!(eval_str("(f)", &env), Value::Number(n) if n == 0.0));
        assert!(matches!(eval_str("(f 7)", &env), Value::Number(n) if n == 7.0));
        assert!(matches!(eval_str("(f 1 2 3)", &env), Value::Number(n) if n == 3.0));
    }

    #[test]
    fn quasiquote_unquote_and_splicing() {
        let env = fresh_env();
        eval_str("(def xs [1 2 3])", &env);
        let v = eval_str("`(a ~@xs b)", &env);
        match v {
            Value::List(items) => {
                assert_eq!(items.len(), 5);
                assert!(matches!(&items[0], Value::Symbol(s) if s == "a"));
                assert!(matches!(items[1], Value::Number(n) if n == 1.0));
                assert!(matches!(&items[4], Value::Symbol(s) if s == "b"));
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn defmacro_basic_when() {
        let env = fresh_env();
        eval_str(
            "(defmacro my-when (cond body) `(if ~cond (do ~body) nil))",
            &env,
        );
        let v = eval_str("(my-when true 42)", &env);
        assert!(matches!(v, Value::Number(n) if n == 42.0));
        let v2 = eval_str("(my-when false 42)", &env);
        assert!(matches!(v2, Value::Nil));
    }

    #[test]
    fn namespace_alias_resolution() {
        let core = Env::new_root(Some("clojure.core".to_string()));
        crate::builtins::register_builtins(&core);
        let m_ns = Env::new_namespace("m".to_string(), Rc::clone(&core));
        m_ns.define("pi".to_string(), Value::Number(3.14));
        let user = Env::new_namespace("user".to_string(), core);
        user.define_alias("m".to_string(), m_ns);

        let v = eval(&Value::Symbol("m/pi".to_string()), &user).unwrap();
        assert!(matches!(v, Value::Number(n) if n == 3.14));
    }
}
