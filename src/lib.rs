#![allow(dead_code)]

pub extern crate self as calcu_rs;

pub mod analysis;
pub mod eclass;
pub mod egraph;
pub mod id;
pub mod language;
pub mod toy;
pub mod unionfind;
mod utils;

pub use analysis::{Analysis, DidMerge};
pub use eclass::EClass;
pub use egraph::EGraph;
pub use id::ID;
pub use language::{Language, RecExpr};
pub use unionfind::UnionFind;

pub mod prelude {
    pub use crate::analysis::{merge_max, merge_min, merge_option, Analysis, DidMerge};
    pub use crate::eclass::EClass;
    pub use crate::egraph::EGraph;
    pub use crate::id::ID;
    pub use crate::language::{Language, RecExpr};
}
