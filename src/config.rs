// ABOUTME: Version, banner text, and the standard macro library source loaded into every session

pub const VERSION: &str = "0.1.0";
pub const WELCOME_MESSAGE: &str = "clj-interp 0.1.0";
pub const WELCOME_SUBTITLE: &str = "A small Lisp interpreter for a Clojure-subset surface syntax";

/// Source text evaluated into `clojure.core` when a session is constructed.
/// Defines `defn`, `when`, `when-not`, `and`, `or`, `cond`, `->`, `->>`, `next`.
pub const CORE_MACROS: &str = include_str!("stdlib/core.clj");

/// Default `entries` for [`crate::session::create_session`].
pub fn default_entries() -> Vec<String> {
    vec![CORE_MACROS.to_string()]
}
