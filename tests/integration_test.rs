// ABOUTME: End-to-end tests exercising the public Session API against whole programs

use clj_interp::session::{create_session, Session, SessionOptions};
use clj_interp::value::Value;

fn session() -> Session {
    create_session(SessionOptions {
        output: None,
        entries: clj_interp::config::default_entries(),
        source_roots: Vec::new(),
        read_file: None,
    })
}

fn number(session: &Session, src: &str) -> f64 {
    match session.evaluate(src).unwrap() {
        Value::Number(n) => n,
        other => panic!("expected number, got {:?}", other),
    }
}

#[test]
fn fibonacci_via_loop_recur() {
    let s = session();
    s.evaluate(
        "(defn fib [n]
           (loop [a 0 b 1 i n]
             (if (<= i 0) a (recur b (+ a b) (dec i)))))",
    )
    .unwrap();
    assert_eq!(number(&s, "(fib 10)"), 55.0);
    assert_eq!(number(&s, "(fib 0)"), 0.0);
}

#[test]
fn factorial_via_defn_and_loop_recur() {
    let s = session();
    s.evaluate(
        "(defn fact [n]
           (loop [i n acc 1]
             (if (<= i 1) acc (recur (dec i) (* acc i)))))",
    )
    .unwrap();
    assert_eq!(number(&s, "(fact 10)"), 3628800.0);
}

#[test]
fn closures_capture_their_defining_environment() {
    let s = session();
    s.evaluate("(def make-adder (fn [n] (fn [x] (+ n x))))").unwrap();
    s.evaluate("(def add5 (make-adder 5))").unwrap();
    s.evaluate("(def add100 (make-adder 100))").unwrap();
    assert_eq!(number(&s, "(add5 10)"), 15.0);
    assert_eq!(number(&s, "(add100 23)"), 123.0);
}

#[test]
fn multi_arity_dispatch_picks_the_matching_arity() {
    let s = session();
    s.evaluate(
        "(defn greet
           ([] \"hello\")
           ([name] (str \"hello, \" name))
           ([greeting name] (str greeting \", \" name)))",
    )
    .unwrap();
    assert_eq!(s.evaluate("(greet)").unwrap(), Value::String("hello".to_string()));
    assert_eq!(
        s.evaluate("(greet \"Ada\")").unwrap(),
        Value::String("hello, Ada".to_string())
    );
    assert_eq!(
        s.evaluate("(greet \"hi\" \"Ada\")").unwrap(),
        Value::String("hi, Ada".to_string())
    );
}

#[test]
fn variadic_rest_params_collect_into_a_list() {
    let s = session();
    s.evaluate("(defn vals-of [& xs] xs)").unwrap();
    let v = s.evaluate("(vals-of 1 2 3)").unwrap();
    assert!(matches!(v, Value::List(items) if items.len() == 3));
}

#[test]
fn quasiquote_splices_a_vector_into_a_list() {
    let s = session();
    let v = s.evaluate("`(1 ~@[2 3] 4)").unwrap();
    match v {
        Value::List(items) => {
            assert_eq!(items.len(), 4);
            assert!(matches!(items[0], Value::Number(n) if n == 1.0));
            assert!(matches!(items[3], Value::Number(n) if n == 4.0));
        }
        other => panic!("expected list, got {:?}", other),
    }
}

#[test]
fn defmacro_expands_before_evaluation() {
    let s = session();
    s.evaluate("(defmacro unless [c body] `(if ~c nil ~body))").unwrap();
    assert_eq!(number(&s, "(unless false 42)"), 42.0);
    assert!(matches!(s.evaluate("(unless true 42)").unwrap(), Value::Nil));
}

#[test]
fn namespace_alias_and_refer_via_require() {
    let s = session();
    s.load_file("(ns math.core) (defn square [x] (* x x))", None).unwrap();
    s.load_file(
        "(ns app (:require [math.core :as m] [math.core :refer [square]]))",
        None,
    )
    .unwrap();
    s.set_ns("app");
    assert_eq!(number(&s, "(m/square 6)"), 36.0);
    assert_eq!(number(&s, "(square 7)"), 49.0);
}

#[test]
fn standard_macros_desugar_as_specified() {
    let s = session();
    assert_eq!(number(&s, "(when true 1)"), 1.0);
    assert!(matches!(s.evaluate("(when false 1)").unwrap(), Value::Nil));
    assert!(matches!(s.evaluate("(when-not true 1)").unwrap(), Value::Nil));
    assert_eq!(s.evaluate("(and 1 2 3)").unwrap(), Value::Number(3.0));
    assert_eq!(s.evaluate("(or false false 5)").unwrap(), Value::Number(5.0));
    assert_eq!(number(&s, "(cond false 1 true 2)"), 2.0);
    assert_eq!(number(&s, "(-> 5 (+ 1) (* 2))"), 12.0);
    assert_eq!(number(&s, "(->> 5 (+ 1) (* 2))"), 12.0);
}

#[test]
fn higher_order_functions_compose() {
    let s = session();
    s.evaluate("(defn double [x] (* x 2))").unwrap();
    let v = s
        .evaluate("(filter (fn [x] (> x 5)) (map double [1 2 3 4 5]))")
        .unwrap();
    assert!(matches!(v, Value::Vector(items) if items.len() == 3));
    assert_eq!(number(&s, "(reduce + 0 [1 2 3 4])"), 10.0);
}

#[test]
fn recur_outside_loop_or_fn_is_an_error() {
    let s = session();
    assert!(s.evaluate("(recur 1)").is_err());
}

#[test]
fn deep_recur_does_not_overflow_the_host_stack() {
    let s = session();
    s.evaluate(
        "(defn sum-to [n]
           (loop [i n acc 0]
             (if (<= i 0) acc (recur (dec i) (+ acc i)))))",
    )
    .unwrap();
    assert_eq!(number(&s, "(sum-to 100000)"), 5000050000.0);
}

#[test]
fn error_conditions_are_reported_not_panicked() {
    let s = session();
    assert!(s.evaluate("undefined-var").is_err());
    assert!(s.evaluate("(/ 1 0)").is_err());
    assert!(s.evaluate("(42 1 2)").is_err());
}
