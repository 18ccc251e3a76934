// ABOUTME: Canonical textual rendering of values, for both `(print)` and read-back

use crate::value::Value;

/// Re-escapes a string for inclusion inside double quotes.
fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn format_arity(arity: &crate::value::Arity) -> String {
    let mut params = arity.params.clone();
    if let Some(rest) = &arity.rest_param {
        params.push("&".to_string());
        params.push(rest.clone());
    }
    format!("[{}]", params.join(" "))
}

fn format_body(body: &[Value]) -> String {
    body.iter().map(print_string).collect::<Vec<_>>().join(" ")
}

fn print_callable(kind: &str, arities: &[crate::value::Arity]) -> String {
    if arities.len() == 1 {
        let body = format_body(&arities[0].body);
        if body.is_empty() {
            format!("({} {})", kind, format_arity(&arities[0]))
        } else {
            format!("({} {} {})", kind, format_arity(&arities[0]), body)
        }
    } else {
        let clauses: Vec<String> = arities
            .iter()
            .map(|a| {
                let body = format_body(&a.body);
                if body.is_empty() {
                    format!("({})", format_arity(a))
                } else {
                    format!("({} {})", format_arity(a), body)
                }
            })
            .collect();
        format!("({} {})", kind, clauses.join(" "))
    }
}

/// Canonical, read-back form: strings are quoted and escaped.
pub fn print_string(v: &Value) -> String {
    render(v, true)
}

/// Plain rendering used by `str`/`println`: strings are unquoted.
pub fn value_to_string(v: &Value) -> String {
    render(v, false)
}

fn render(v: &Value, quote_strings: bool) -> String {
    match v {
        Value::Number(n) => format_number(*n),
        Value::String(s) => {
            if quote_strings {
                format!("\"{}\"", escape_string(s))
            } else {
                s.clone()
            }
        }
        Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        Value::Nil => "nil".to_string(),
        Value::Keyword(k) => k.clone(),
        Value::Symbol(s) => s.clone(),
        Value::List(items) => {
            let inner: Vec<String> = items.iter().map(|i| render(i, quote_strings)).collect();
            format!("({})", inner.join(" "))
        }
        Value::Vector(items) => {
            let inner: Vec<String> = items.iter().map(|i| render(i, quote_strings)).collect();
            format!("[{}]", inner.join(" "))
        }
        Value::Map(entries) => {
            let inner: Vec<String> = entries
                .iter()
                .map(|(k, val)| format!("{} {}", render(k, quote_strings), render(val, quote_strings)))
                .collect();
            format!("{{{}}}", inner.join(" "))
        }
        Value::Function(data) => print_callable("fn", &data.arities),
        Value::Macro(data) => print_callable("macro", &data.arities),
        Value::NativeFunction { name, .. } => format!("(native-fn {})", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Arity;
    use std::rc::Rc;

    #[test]
    fn quoted_vs_unquoted_strings() {
        let v = Value::String("hi\nthere".to_string());
        assert_eq!(print_string(&v), "\"hi\\nthere\"");
        assert_eq!(value_to_string(&v), "hi\nthere");
    }

    #[test]
    fn numbers_drop_trailing_zero() {
        assert_eq!(print_string(&Value::Number(42.0)), "42");
        assert_eq!(print_string(&Value::Number(-2.5)), "-2.5");
    }

    #[test]
    fn list_and_vector_and_map() {
        let l = Value::List(vec![Value::Number(1.0), Value::Number(2.0)]);
        assert_eq!(print_string(&l), "(1 2)");

        let v = Value::Vector(vec![Value::Number(1.0), Value::Number(2.0)]);
        assert_eq!(print_string(&v), "[1 2]");

        let m = Value::Map(vec![(Value::Keyword(":a".into()), Value::Number(1.0))]);
        assert_eq!(print_string(&m), "{:a 1}");
    }

    #[test]
    fn function_print_form() {
        let env = crate::env::Env::new_root(Some("user".to_string()));
        let data = Rc::new(crate::value::FunctionData {
            name: None,
            arities: vec![Arity {
                params: vec!["x".into()],
                rest_param: None,
                body: vec![Value::Symbol("x".into())],
            }],
            env,
        });
        assert_eq!(print_string(&Value::Function(data)), "(fn [x] x)");
    }

    #[test]
    fn multi_arity_function_print_form() {
        let env = crate::env::Env::new_root(Some("user".to_string()));
        let data = Rc::new(crate::value::FunctionData {
            name: None,
            arities: vec![
                Arity { params: vec![], rest_param: None, body: vec![Value::Number(0.0)] },
                Arity {
                    params: vec!["x".into()],
                    rest_param: None,
                    body: vec![Value::Symbol("x".into())],
                },
            ],
            env,
        });
        assert_eq!(print_string(&Value::Function(data)), "(fn ([] 0) ([x] x))");
    }
}
