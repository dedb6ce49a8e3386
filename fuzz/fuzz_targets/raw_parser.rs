#![no_main]
use libfuzzer_sys::fuzz_target;

use ::rollgraph::DiceExpr;

// Throws arbitrary bytes straight at the grammar. Most inputs will be
// rejected as a FormatError; the goal is to make sure the parser itself
// never panics on malformed dice notation.
fuzz_target!(|data: &str| {
    let _ = DiceExpr::new(data);
});
