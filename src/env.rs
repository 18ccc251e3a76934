// ABOUTME: Environment module for managing variable bindings, scopes and namespaces

use crate::error::EvalError;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug)]
pub struct Env {
    bindings: RefCell<HashMap<String, Value>>,
    outer: Option<Rc<Env>>,
    /// Set only on a namespace-root env.
    namespace: Option<String>,
    /// Set only on a namespace-root env: alias name -> target namespace env.
    aliases: RefCell<HashMap<String, Rc<Env>>>,
}

impl Env {
    /// Creates a fresh namespace-root environment with no outer scope.
    pub fn new_root(namespace: Option<String>) -> Rc<Self> {
        Rc::new(Env {
            bindings: RefCell::new(HashMap::new()),
            outer: None,
            namespace,
            aliases: RefCell::new(HashMap::new()),
        })
    }

    /// Creates a child lexical scope.
    pub fn with_outer(outer: Rc<Env>) -> Rc<Self> {
        Rc::new(Env {
            bindings: RefCell::new(HashMap::new()),
            outer: Some(outer),
            namespace: None,
            aliases: RefCell::new(HashMap::new()),
        })
    }

    /// Creates a namespace-root environment whose outer scope is `outer`
    /// (used for user namespaces, whose outer is always `clojure.core`).
    pub fn new_namespace(namespace: String, outer: Rc<Env>) -> Rc<Self> {
        Rc::new(Env {
            bindings: RefCell::new(HashMap::new()),
            outer: Some(outer),
            namespace: Some(namespace),
            aliases: RefCell::new(HashMap::new()),
        })
    }

    /// Creates a child env with `names` bound to `values` in order.
    pub fn extend(names: &[String], values: &[Value], outer: Rc<Env>) -> Result<Rc<Self>, EvalError> {
        if names.len() != values.len() {
            return Err(EvalError::runtime_error(
                "bind",
                format!(
                    "expected {} argument(s), got {}",
                    names.len(),
                    values.len()
                ),
            ));
        }
        let env = Env::with_outer(outer);
        for (name, value) in names.iter().zip(values.iter()) {
            env.define(name.clone(), value.clone());
        }
        Ok(env)
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn outer(&self) -> Option<&Rc<Env>> {
        self.outer.as_ref()
    }

    /// Defines a binding in THIS scope (doesn't walk the outer chain).
    pub fn define(&self, name: String, value: Value) {
        self.bindings.borrow_mut().insert(name, value);
    }

    /// Looks up a symbol in this scope and outer scopes recursively.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Some(value.clone());
        }
        self.outer.as_ref().and_then(|outer| outer.get(name))
    }

    pub fn lookup(self: &Rc<Self>, name: &str) -> Result<Value, EvalError> {
        self.get(name)
            .ok_or_else(|| EvalError::UndefinedSymbol(name.to_string()))
    }

    /// Walks to the outermost environment in the chain.
    pub fn root_env(self: &Rc<Self>) -> Rc<Env> {
        let mut current = Rc::clone(self);
        loop {
            match current.outer.clone() {
                Some(next) => current = next,
                None => return current,
            }
        }
    }

    /// Walks outward to the nearest namespace-root env (including self).
    pub fn namespace_env(self: &Rc<Self>) -> Rc<Env> {
        let mut current = Rc::clone(self);
        loop {
            if current.namespace.is_some() {
                return current;
            }
            match current.outer.clone() {
                Some(next) => current = next,
                None => return current,
            }
        }
    }

    /// Installs a live alias to another namespace-root env. Must be called
    /// on a namespace-root env.
    pub fn define_alias(&self, alias: String, target: Rc<Env>) {
        self.aliases.borrow_mut().insert(alias, target);
    }

    pub fn resolve_alias(&self, alias: &str) -> Option<Rc<Env>> {
        self.aliases.borrow().get(alias).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_and_get() {
        let env = Env::new_root(None);
        env.define("x".to_string(), Value::Number(42.0));

        match env.get("x") {
            Some(Value::Number(n)) => assert_eq!(n, 42.0),
            _ => panic!("Expected Number(42.0)"),
        }
    }

    #[test]
    fn undefined_symbol() {
        let env = Env::new_root(None);
        assert!(env.get("undefined").is_none());
    }

    #[test]
    fn shadowing() {
        let parent = Env::new_root(None);
        parent.define("x".to_string(), Value::Number(42.0));

        let child = Env::with_outer(parent);
        child.define("x".to_string(), Value::Number(100.0));

        match child.get("x") {
            Some(Value::Number(n)) => assert_eq!(n, 100.0),
            _ => panic!("Expected Number(100.0)"),
        }
    }

    #[test]
    fn outer_lookup() {
        let parent = Env::new_root(None);
        parent.define("x".to_string(), Value::Number(42.0));

        let child = Env::with_outer(parent);

        match child.get("x") {
            Some(Value::Number(n)) => assert_eq!(n, 42.0),
            _ => panic!("Expected Number(42.0)"),
        }
    }

    #[test]
    fn multiple_levels() {
        let grandparent = Env::new_root(None);
        grandparent.define("a".to_string(), Value::Number(1.0));

        let parent = Env::with_outer(grandparent);
        parent.define("b".to_string(), Value::Number(2.0));

        let child = Env::with_outer(parent);
        child.define("c".to_string(), Value::Number(3.0));

        assert!(matches!(child.get("a"), Some(Value::Number(n)) if n == 1.0));
        assert!(matches!(child.get("b"), Some(Value::Number(n)) if n == 2.0));
        assert!(matches!(child.get("c"), Some(Value::Number(n)) if n == 3.0));
    }

    #[test]
    fn namespace_env_walks_past_lexical_scopes() {
        let core = Env::new_root(Some("clojure.core".to_string()));
        let user = Env::new_namespace("user".to_string(), core);
        let lexical = Env::with_outer(user.clone());
        let inner = Env::with_outer(lexical);

        assert_eq!(inner.namespace_env().namespace(), Some("user"));
    }

    #[test]
    fn alias_resolves_live_target() {
        let core = Env::new_root(Some("clojure.core".to_string()));
        let math_ns = Env::new_namespace("math".to_string(), core.clone());
        let user = Env::new_namespace("user".to_string(), core);

        user.define_alias("m".to_string(), math_ns.clone());
        math_ns.define("pi".to_string(), Value::Number(3.14));

        let resolved = user.resolve_alias("m").unwrap();
        assert!(matches!(resolved.get("pi"), Some(Value::Number(n)) if n == 3.14));
    }
}
