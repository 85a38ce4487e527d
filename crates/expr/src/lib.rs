//! `expr` crate — the path/template substrate (spec §4.A) and the
//! restricted expression language (spec §4.B) shared by every node
//! executor and the graph compiler's conditional router.

pub mod error;
pub mod lang;
pub mod path;

pub use error::ExprError;
pub use lang::{eval_bool, eval_script};
pub use path::{deep_get, render_template};
