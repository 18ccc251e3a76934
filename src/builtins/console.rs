// ABOUTME: Output natives: `str` (always present) and `println` (installed only when a session output sink is configured)

use crate::env::Env;
use crate::error::EvalError;
use crate::printer::value_to_string;
use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

thread_local! {
    static OUTPUT_SINK: RefCell<Option<Rc<dyn Fn(&str)>>> = const { RefCell::new(None) };
}

/// Installs the session's output sink, used by `println`. Called once per
/// session at construction time.
pub fn set_output_sink(sink: Rc<dyn Fn(&str)>) {
    OUTPUT_SINK.with(|s| *s.borrow_mut() = Some(sink));
}

pub fn clear_output_sink() {
    OUTPUT_SINK.with(|s| *s.borrow_mut() = None);
}

fn str_fn(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::String(args.iter().map(value_to_string).collect()))
}

fn println_fn(args: &[Value]) -> Result<Value, EvalError> {
    let line = args
        .iter()
        .map(value_to_string)
        .collect::<Vec<_>>()
        .join(" ");
    OUTPUT_SINK.with(|s| {
        if let Some(sink) = s.borrow().as_ref() {
            sink(&line);
        }
    });
    Ok(Value::Nil)
}

/// Registers the natives that have no dependency on session configuration.
pub fn register(env: &Rc<Env>) {
    env.define("str".to_string(), Value::NativeFunction { name: "str".to_string(), func: str_fn });
}

/// Installs `println` on `env`. Only called by session construction when an
/// output sink was supplied; per spec, `println` is otherwise absent.
pub fn register_println(env: &Rc<Env>) {
    env.define(
        "println".to_string(),
        Value::NativeFunction { name: "println".to_string(), func: println_fn },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn str_concatenates_unquoted() {
        let args = vec![Value::String("a".into()), Value::Number(1.0), Value::Keyword(":b".into())];
        assert!(matches!(str_fn(&args), Ok(Value::String(s)) if s == "a1:b"));
    }

    #[test]
    fn println_writes_through_sink() {
        use std::cell::RefCell as StdRefCell;
        let captured = Rc::new(StdRefCell::new(String::new()));
        let captured_clone = Rc::clone(&captured);
        set_output_sink(Rc::new(move |s: &str| captured_clone.borrow_mut().push_str(s)));

        println_fn(&[Value::String("hi".into()), Value::Number(1.0)]).unwrap();
        assert_eq!(*captured.borrow(), "hi 1");
        clear_output_sink();
    }
}
