//! End-to-end checks of the probe injection on a unit with every exit shape.

mod fixtures;

use joule_trace::instrument::{
    CompiledUnit, InstrumentOptions, InstrumentationError, Instrumenter, MethodFilter,
    MethodIndex, PROBE_KEYS_SECTION,
};
use joule_trace::probe::ProbeKeyTable;
use joule_trace::utils::wasm::{has_custom_section, validate_module};
use std::collections::HashMap;
use walrus::ir::Instr;
use walrus::{FunctionKind, ImportKind, Module};

fn calculator() -> (CompiledUnit, MethodIndex) {
    let unit = CompiledUnit::new("calc", fixtures::calculator_bytes());
    let index = MethodIndex::build(std::slice::from_ref(&unit)).expect("index builds");
    (unit, index)
}

fn probe_import(module: &Module, name: &str) -> walrus::FunctionId {
    module
        .imports
        .iter()
        .find(|import| import.module == "joule_probe" && import.name == name)
        .and_then(|import| match import.kind {
            ImportKind::Function(id) => Some(id),
            _ => None,
        })
        .unwrap_or_else(|| panic!("missing probe import {}", name))
}

/// Per function name: (begin calls, report calls, branches to the entry label).
fn probe_shape(module: &Module) -> HashMap<String, (usize, usize, usize)> {
    let begin = probe_import(module, "begin");
    let report = probe_import(module, "report");
    let mut shapes = HashMap::new();

    for func in module.funcs.iter() {
        let FunctionKind::Local(local) = &func.kind else {
            continue;
        };
        let entry = local.entry_block();
        let (mut begins, mut reports, mut entry_branches) = (0, 0, 0);
        let mut pending = vec![entry];
        while let Some(seq) = pending.pop() {
            for (instr, _) in local.block(seq).instrs.iter() {
                match instr {
                    Instr::Call(call) if call.func == begin => begins += 1,
                    Instr::Call(call) if call.func == report => reports += 1,
                    Instr::Block(b) => pending.push(b.seq),
                    Instr::Loop(l) => pending.push(l.seq),
                    Instr::IfElse(ie) => {
                        pending.push(ie.consequent);
                        pending.push(ie.alternative);
                    }
                    Instr::Br(br) if br.block == entry => entry_branches += 1,
                    Instr::BrIf(br) if br.block == entry => entry_branches += 1,
                    Instr::BrTable(t) if t.default == entry || t.blocks.contains(&entry) => {
                        entry_branches += 1
                    }
                    _ => {}
                }
            }
        }
        if let Some(name) = &func.name {
            shapes.insert(name.clone(), (begins, reports, entry_branches));
        }
    }
    shapes
}

#[test]
fn every_method_gets_one_begin_and_a_report_per_exit() {
    let (unit, index) = calculator();
    let out = Instrumenter::new(InstrumentOptions::default())
        .instrument(&unit, &index)
        .expect("instrumentation succeeds");

    validate_module(&out.unit.bytes).expect("instrumented unit validates");
    assert!(out.report.failed.is_empty());
    assert_eq!(out.report.instrumented.len(), 7);

    let module = out.unit.parse().unwrap();
    let shapes = probe_shape(&module);

    assert_eq!(shapes["add"], (1, 1, 0));
    // early return plus fall-through
    assert_eq!(shapes["pick"], (1, 2, 0));
    // br_if retargeted to the wrapper, reported once after it
    assert_eq!(shapes["clamp"], (1, 1, 0));
    assert_eq!(shapes["dispatch"], (1, 1, 0));
    // explicit trap plus the fall-through report
    assert_eq!(shapes["fail"], (1, 2, 0));
    assert_eq!(shapes["setup"], (1, 1, 0));
    assert_eq!(shapes["main"], (1, 1, 0));
}

#[test]
fn key_table_matches_index_keys() {
    let (unit, index) = calculator();
    let out = Instrumenter::new(InstrumentOptions::default())
        .instrument(&unit, &index)
        .unwrap();

    assert!(has_custom_section(&out.unit.bytes, PROBE_KEYS_SECTION));
    let table = ProbeKeyTable::from_unit(&out.unit).unwrap().expect("key table");
    assert_eq!(table.len(), out.report.instrumented.len());
    for (id, key) in table.iter() {
        assert!(index.contains(key), "{} not indexed", key);
        assert_eq!(out.report.instrumented[id as usize], key);
    }
    assert!(table.id_of("calc$<init>").is_some());
    assert!(table.id_of("calc$setup").is_none());
}

#[test]
fn excluded_methods_are_left_alone() {
    let (unit, index) = calculator();
    let options = InstrumentOptions {
        exclude: MethodFilter::new(&["calc$d*".to_string(), "re:fail$".to_string()]).unwrap(),
        ..InstrumentOptions::default()
    };
    let out = Instrumenter::new(options).instrument(&unit, &index).unwrap();

    assert_eq!(out.report.excluded, vec!["calc$dispatch", "calc$fail"]);
    let shapes = probe_shape(&out.unit.parse().unwrap());
    assert_eq!(shapes["dispatch"], (0, 0, 1));
    assert_eq!(shapes["fail"], (0, 0, 0));
    assert_eq!(shapes["add"], (1, 1, 0));
}

#[test]
fn custom_probe_module_is_imported() {
    let (unit, index) = calculator();
    let options = InstrumentOptions {
        probe_module: "energy_rt".to_string(),
        ..InstrumentOptions::default()
    };
    let out = Instrumenter::new(options).instrument(&unit, &index).unwrap();
    let module = out.unit.parse().unwrap();
    let modules: Vec<&str> = module.imports.iter().map(|i| i.module.as_str()).collect();
    assert_eq!(modules, ["energy_rt", "energy_rt"]);
}

#[test]
fn units_are_instrumented_in_parallel_independently() {
    let (calc, _) = calculator();
    let broken = CompiledUnit::new("broken", b"\0asm\x01\0\0\0garbage".to_vec());
    let units = vec![calc.clone(), broken];
    let index = MethodIndex::build(std::slice::from_ref(&calc)).unwrap();

    let results = Instrumenter::new(InstrumentOptions::default()).instrument_all(&units, &index);
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(
        results[1],
        Err(InstrumentationError::Parse { ref unit, .. }) if unit == "broken"
    ));
}

#[test]
fn load_names_unit_after_module_name() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("renamed.wasm");
    std::fs::write(&path, fixtures::calculator_bytes()).unwrap();
    let unit = CompiledUnit::load(&path).unwrap();
    assert_eq!(unit.name, "calc");
    assert_eq!(unit.path.as_deref(), Some(path.as_path()));
}
