#![no_main]

use joule_trace::callgraph::{CallGraphBuilder, Quantity};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(forest) = CallGraphBuilder::new().build_from_reader(data) {
        let _ = forest.check_invariants(0.0);
        let _ = forest.method_summaries();
        let _ = forest.total(Quantity::Energy);
    }
});
