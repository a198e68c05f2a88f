//! Compiled units built in memory for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use walrus::ir::BinaryOp;
use walrus::{FunctionBuilder, FunctionId, Module, ModuleConfig, ValType};

fn named(module: &mut Module, builder: FunctionBuilder, args: Vec<walrus::LocalId>, name: &str) -> FunctionId {
    let id = builder.finish(args, &mut module.funcs);
    module.funcs.get_mut(id).name = Some(name.to_string());
    module.exports.add(name, id);
    id
}

/// A unit named `calc` exercising every exit shape the instrumenter handles:
/// fall-through, early return, branches to the function label, traps and a
/// start function.
pub fn calculator_module() -> Module {
    let mut module = Module::with_config(ModuleConfig::new());
    module.name = Some("calc".to_string());

    // add(a, b) = a + b
    let a = module.locals.add(ValType::I32);
    let b = module.locals.add(ValType::I32);
    let mut add = FunctionBuilder::new(&mut module.types, &[ValType::I32, ValType::I32], &[ValType::I32]);
    add.func_body().local_get(a).local_get(b).binop(BinaryOp::I32Add);
    let add = named(&mut module, add, vec![a, b], "add");

    // pick(x) = if x { return 1 } 2
    let x = module.locals.add(ValType::I32);
    let mut pick = FunctionBuilder::new(&mut module.types, &[ValType::I32], &[ValType::I32]);
    pick.func_body().local_get(x).if_else(
        None,
        |then| {
            then.i32_const(1).return_();
        },
        |_| {},
    );
    pick.func_body().i32_const(2);
    let pick = named(&mut module, pick, vec![x], "pick");

    // clamp(x) = x == 0 ? 0 : x, leaving through br_if on the function label
    let x = module.locals.add(ValType::I32);
    let mut clamp = FunctionBuilder::new(&mut module.types, &[ValType::I32], &[ValType::I32]);
    let body = clamp.func_body_id();
    clamp
        .func_body()
        .i32_const(0)
        .local_get(x)
        .unop(walrus::ir::UnaryOp::I32Eqz)
        .br_if(body)
        .drop()
        .local_get(x);
    named(&mut module, clamp, vec![x], "clamp");

    // dispatch(x) leaves through br_table on the function label
    let x = module.locals.add(ValType::I32);
    let mut dispatch = FunctionBuilder::new(&mut module.types, &[ValType::I32], &[]);
    let body = dispatch.func_body_id();
    dispatch.func_body().block(None, |inner| {
        let inner_id = inner.id();
        inner
            .local_get(x)
            .br_table(vec![inner_id, body].into_boxed_slice(), body);
    });
    named(&mut module, dispatch, vec![x], "dispatch");

    // fail() traps
    let mut fail = FunctionBuilder::new(&mut module.types, &[], &[]);
    fail.func_body().unreachable();
    named(&mut module, fail, vec![], "fail");

    // start function
    let mut setup = FunctionBuilder::new(&mut module.types, &[], &[]);
    setup.func_body();
    let setup = setup.finish(vec![], &mut module.funcs);
    module.funcs.get_mut(setup).name = Some("setup".to_string());
    module.start = Some(setup);

    // main() calls add and pick
    let mut main = FunctionBuilder::new(&mut module.types, &[], &[]);
    main.func_body()
        .i32_const(1)
        .i32_const(2)
        .call(add)
        .drop()
        .i32_const(0)
        .call(pick)
        .drop();
    named(&mut module, main, vec![], "main");

    module
}

pub fn calculator_bytes() -> Vec<u8> {
    calculator_module().emit_wasm()
}

/// Write the calculator unit as `<dir>/calc.wasm`.
pub fn write_calculator(dir: &Path) -> PathBuf {
    std::fs::create_dir_all(dir).expect("create fixture dir");
    let path = dir.join("calc.wasm");
    std::fs::write(&path, calculator_bytes()).expect("write fixture unit");
    path
}

pub const SAMPLE_TRACE: &str = "\
calc$main
calc$add
calc$add;2;200
calc$pick
calc$pick;3;300
calc$main;10;1000
";
