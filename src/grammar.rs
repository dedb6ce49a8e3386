//! The pest-derived parser. Precedence and associativity live entirely in
//! `rollgraph.pest`'s rule nesting; this module only wires the derive up and
//! re-exports `Rule` for [`crate::error::RollError`]'s `From` impl.

use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "rollgraph.pest"]
pub(crate) struct RollParser;
