#![no_main]

use joule_trace::instrument::{CompiledUnit, InstrumentOptions, Instrumenter, MethodIndex};
use joule_trace::utils::wasm;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = wasm::get_module_info(data);
    let unit = CompiledUnit::new("fuzz", data.to_vec());
    if let Ok(index) = MethodIndex::build(std::slice::from_ref(&unit)) {
        let _ = Instrumenter::new(InstrumentOptions::default()).instrument(&unit, &index);
    }
});
