// ABOUTME: Namespace registry, `require`, lazy file loading and the public evaluation entry point

use crate::builtins::{self, console};
use crate::env::Env;
use crate::error::{EvalError, LispError, ParserError};
use crate::eval::eval_body;
use crate::parser::parse_source;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared session state reachable both through the `Session` handle and,
/// via a thread-local, from natives like `eval`/`require`/`macroexpand-1`
/// that cannot carry an explicit environment argument (`NativeFn` is a bare
/// `fn(&[Value]) -> Result<Value, EvalError>`).
pub(crate) struct SessionContext {
    registry: RefCell<HashMap<String, Rc<Env>>>,
    current_ns: RefCell<String>,
    source_roots: Vec<String>,
    read_file: Option<Rc<dyn Fn(&str) -> Option<String>>>,
}

thread_local! {
    static SESSION_CTX: RefCell<Option<Rc<SessionContext>>> = const { RefCell::new(None) };
}

fn install(ctx: &Rc<SessionContext>) {
    SESSION_CTX.with(|c| *c.borrow_mut() = Some(Rc::clone(ctx)));
}

pub(crate) fn with_context<T>(
    f: impl FnOnce(&Rc<SessionContext>) -> Result<T, EvalError>,
) -> Result<T, EvalError> {
    SESSION_CTX.with(|c| {
        let borrowed = c.borrow();
        let ctx = borrowed
            .as_ref()
            .ok_or_else(|| EvalError::runtime_error("session", "no active session on this thread"))?;
        f(ctx)
    })
}

/// The namespace-root env for `ctx.current_ns`, used by `eval`/`macroexpand-1`.
pub(crate) fn current_namespace_env(ctx: &Rc<SessionContext>) -> Result<Rc<Env>, EvalError> {
    let name = ctx.current_ns.borrow().clone();
    ctx.registry
        .borrow()
        .get(&name)
        .cloned()
        .ok_or_else(|| EvalError::runtime_error("eval", format!("namespace {} not found", name)))
}

fn get_or_create_namespace(ctx: &Rc<SessionContext>, name: &str) -> Rc<Env> {
    if let Some(env) = ctx.registry.borrow().get(name) {
        return Rc::clone(env);
    }
    let core = Rc::clone(
        ctx.registry
            .borrow()
            .get("clojure.core")
            .expect("clojure.core is always registered"),
    );
    let env = Env::new_namespace(name.to_string(), core);
    ctx.registry.borrow_mut().insert(name.to_string(), Rc::clone(&env));
    env
}

fn resolve_required_namespace(ctx: &Rc<SessionContext>, name: &str) -> Result<Rc<Env>, LispError> {
    if let Some(env) = ctx.registry.borrow().get(name) {
        return Ok(Rc::clone(env));
    }
    if let Some(read_file) = ctx.read_file.clone() {
        for root in &ctx.source_roots {
            let path = format!("{}/{}.clj", root, name.replace('.', "/"));
            if let Some(content) = read_file(&path) {
                load_file_in(ctx, &content, Some(name))?;
                if let Some(env) = ctx.registry.borrow().get(name) {
                    return Ok(Rc::clone(env));
                }
            }
        }
    }
    Err(EvalError::runtime_error("require", format!("No such namespace: {}", name)).into())
}

/// Applies one require spec (`[ns-sym :as alias]` / `[ns-sym :refer [sym…]]`)
/// against `target_env` — the namespace whose `ns` form named it, or the
/// session's current namespace when `require` is called as an ordinary
/// function.
pub(crate) fn apply_require_spec(
    ctx: &Rc<SessionContext>,
    spec: &Value,
    target_env: &Rc<Env>,
) -> Result<(), LispError> {
    let items = match spec {
        Value::Vector(items) if !items.is_empty() => items,
        other => return Err(EvalError::type_error("require", "non-empty vector spec", other, 0).into()),
    };
    let ns_name = match &items[0] {
        Value::Symbol(s) => s.clone(),
        other => return Err(EvalError::type_error("require", "namespace symbol", other, 0).into()),
    };
    let required_env = resolve_required_namespace(ctx, &ns_name)?;

    let mut i = 1;
    while i < items.len() {
        let option = match &items[i] {
            Value::Keyword(k) => k.clone(),
            other => return Err(EvalError::type_error("require", "keyword option", other, i).into()),
        };
        match option.as_str() {
            ":as" => {
                let alias = match items.get(i + 1) {
                    Some(Value::Symbol(s)) => s.clone(),
                    _ => return Err(EvalError::runtime_error("require", "`:as` requires a symbol").into()),
                };
                target_env.define_alias(alias, Rc::clone(&required_env));
                i += 2;
            }
            ":refer" => {
                let syms = match items.get(i + 1) {
                    Some(Value::Vector(v)) => v.clone(),
                    _ => {
                        return Err(
                            EvalError::runtime_error("require", "`:refer` requires a vector of symbols").into(),
                        )
                    }
                };
                for sym in &syms {
                    let name = match sym {
                        Value::Symbol(s) => s.clone(),
                        other => return Err(EvalError::type_error("require", "symbol", other, 0).into()),
                    };
                    let value = required_env.get(&name).ok_or_else(|| {
                        EvalError::runtime_error(
                            "require",
                            format!("{} not found in namespace {}", name, ns_name),
                        )
                    })?;
                    target_env.define(name, value);
                }
                i += 2;
            }
            other => {
                return Err(EvalError::runtime_error(
                    "require",
                    format!("Unknown require option {}. Supported: :as, :refer", other),
                )
                .into())
            }
        }
    }
    Ok(())
}

fn ns_name_of(form: &Value) -> Option<String> {
    if let Value::List(items) = form {
        if let Some(Value::Symbol(s)) = items.first() {
            if s == "ns" {
                if let Some(Value::Symbol(name)) = items.get(1) {
                    return Some(name.clone());
                }
            }
        }
    }
    None
}

/// Processes every `(:require …)` clause of a top-level `(ns …)` form
/// against `target_env`. Any other clause keyword is an error per §9's
/// guidance to reject unknown `ns` clauses rather than ignore them.
fn process_ns_requires(
    ctx: &Rc<SessionContext>,
    forms: &[Value],
    target_env: &Rc<Env>,
) -> Result<(), LispError> {
    for form in forms {
        let Value::List(items) = form else { continue };
        let Some(Value::Symbol(head)) = items.first() else { continue };
        if head != "ns" {
            continue;
        }
        for clause in &items[2..] {
            let Value::List(clause_items) = clause else {
                return Err(EvalError::type_error("ns", "clause list", clause, 0).into());
            };
            let Some(Value::Keyword(kw)) = clause_items.first() else {
                return Err(EvalError::type_error("ns", "clause keyword", clause, 0).into());
            };
            match kw.as_str() {
                ":require" => {
                    for spec in &clause_items[1..] {
                        apply_require_spec(ctx, spec, target_env)?;
                    }
                }
                other => return Err(ParserError::UnknownNsClause { clause: other.to_string() }.into()),
            }
        }
    }
    Ok(())
}

fn load_file_in(ctx: &Rc<SessionContext>, source: &str, ns_hint: Option<&str>) -> Result<Value, LispError> {
    let forms = parse_source(source)?;
    let target_name = forms
        .iter()
        .find_map(ns_name_of)
        .or_else(|| ns_hint.map(str::to_string))
        .unwrap_or_else(|| "user".to_string());
    let target_env = get_or_create_namespace(ctx, &target_name);
    process_ns_requires(ctx, &forms, &target_env)?;
    run_forms(&forms, &target_env)
}

fn run_forms(forms: &[Value], env: &Rc<Env>) -> Result<Value, LispError> {
    match eval_body(forms, env) {
        Ok(v) => Ok(v),
        Err(EvalError::Recur(_)) => {
            Err(EvalError::runtime_error("recur", "recur called outside of loop or fn").into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Construction options for [`create_session`].
#[derive(Default)]
pub struct SessionOptions {
    /// Sink invoked once per `println` call with the already-joined line.
    pub output: Option<Rc<dyn Fn(&str)>>,
    /// Standard macro source loaded (into `clojure.core`) at construction.
    pub entries: Vec<String>,
    /// Filesystem roots searched, in order, for `require`d namespaces.
    pub source_roots: Vec<String>,
    /// Resolves a namespace path (`root/a/b.clj`) to file contents, if any.
    pub read_file: Option<Rc<dyn Fn(&str) -> Option<String>>>,
}

/// A running interpreter: the namespace registry, the current namespace,
/// and the session's I/O hooks.
pub struct Session {
    ctx: Rc<SessionContext>,
}

impl Session {
    pub fn current_ns(&self) -> String {
        self.ctx.current_ns.borrow().clone()
    }

    pub fn set_ns(&self, name: &str) {
        get_or_create_namespace(&self.ctx, name);
        *self.ctx.current_ns.borrow_mut() = name.to_string();
    }

    pub fn get_ns(&self, name: &str) -> Option<Rc<Env>> {
        self.ctx.registry.borrow().get(name).cloned()
    }

    fn current_env(&self) -> Rc<Env> {
        get_or_create_namespace(&self.ctx, &self.current_ns())
    }

    pub fn load_file(&self, source: &str, ns_hint: Option<&str>) -> Result<Value, LispError> {
        install(&self.ctx);
        load_file_in(&self.ctx, source, ns_hint)
    }

    pub fn evaluate(&self, source: &str) -> Result<Value, LispError> {
        install(&self.ctx);
        let forms = parse_source(source)?;
        let env = self.current_env();
        process_ns_requires(&self.ctx, &forms, &env)?;
        run_forms(&forms, &env)
    }

    pub fn evaluate_forms(&self, forms: &[Value]) -> Result<Value, LispError> {
        install(&self.ctx);
        let env = self.current_env();
        process_ns_requires(&self.ctx, forms, &env)?;
        run_forms(forms, &env)
    }
}

/// Builds `clojure.core` (builtins + standard macros) and `user`, then
/// evaluates every source in `options.entries` against `clojure.core`.
pub fn create_session(options: SessionOptions) -> Session {
    let core = Env::new_root(Some("clojure.core".to_string()));
    builtins::register_builtins(&core);
    if let Some(sink) = &options.output {
        console::set_output_sink(Rc::clone(sink));
        console::register_println(&core);
    }
    let user = Env::new_namespace("user".to_string(), Rc::clone(&core));

    let mut registry = HashMap::new();
    registry.insert("clojure.core".to_string(), Rc::clone(&core));
    registry.insert("user".to_string(), user);

    let ctx = Rc::new(SessionContext {
        registry: RefCell::new(registry),
        current_ns: RefCell::new("user".to_string()),
        source_roots: options.source_roots,
        read_file: options.read_file,
    });
    install(&ctx);

    let session = Session { ctx };
    for entry in &options.entries {
        session
            .load_file(entry, Some("clojure.core"))
            .expect("standard macro library entries must evaluate cleanly");
    }
    session.set_ns("user");
    session
}
