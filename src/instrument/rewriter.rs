use super::error::InstrumentationError;
use super::exits::{plan_exits, ExitPlan};
use super::filter::MethodFilter;
use super::identity::{unit_methods, CompiledUnit, MethodIdentity, MethodIndex};
use crate::utils::wasm::{compute_checksum, has_custom_section, validate_module};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use walrus::ir::{Block, Call, Const, Instr, InstrLocId, InstrSeqId, InstrSeqType, LocalGet, LocalSet, Value};
use walrus::{FunctionId, FunctionKind, LocalFunction, LocalId, RawCustomSection, ValType};

/// Custom section holding the probe key table of an instrumented unit.
pub const PROBE_KEYS_SECTION: &str = "joule.probe_keys";

/// Default import module of the injected probe functions.
pub const DEFAULT_PROBE_MODULE: &str = "joule_probe";

/// Upper bound on local slots per function accepted by validators.
pub const MAX_FUNCTION_LOCALS: usize = 50_000;

#[derive(Debug, Clone)]
pub struct InstrumentOptions {
    pub probe_module: String,
    pub exclude: MethodFilter,
    pub strict: bool,
}

impl Default for InstrumentOptions {
    fn default() -> Self {
        Self {
            probe_module: DEFAULT_PROBE_MODULE.to_string(),
            exclude: MethodFilter::default(),
            strict: false,
        }
    }
}

/// Why a method was left untouched.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedMethod {
    pub method: String,
    pub reason: String,
}

/// Outcome of instrumenting one unit.
#[derive(Debug, Clone, Serialize)]
pub struct InstrumentationReport {
    pub unit: String,
    pub instrumented: Vec<String>,
    pub excluded: Vec<String>,
    pub failed: Vec<SkippedMethod>,
    pub input_sha256: String,
    pub output_sha256: String,
}

#[derive(Debug, Clone)]
pub struct InstrumentedUnit {
    pub unit: CompiledUnit,
    pub report: InstrumentationReport,
}

/// Imports and local used by the injected probe calls of one method.
#[derive(Debug, Clone, Copy)]
struct ProbeCalls {
    begin: FunctionId,
    report: FunctionId,
    handle: LocalId,
    key_id: i32,
}

impl ProbeCalls {
    fn begin_sequence(&self) -> [Instr; 3] {
        [
            Instr::Const(Const {
                value: Value::I32(self.key_id),
            }),
            Instr::Call(Call { func: self.begin }),
            Instr::LocalSet(LocalSet { local: self.handle }),
        ]
    }

    fn report_sequence(&self) -> [Instr; 3] {
        [
            Instr::LocalGet(LocalGet { local: self.handle }),
            Instr::Const(Const {
                value: Value::I32(self.key_id),
            }),
            Instr::Call(Call { func: self.report }),
        ]
    }
}

fn located(instrs: impl IntoIterator<Item = Instr>) -> Vec<(Instr, InstrLocId)> {
    instrs
        .into_iter()
        .map(|instr| (instr, InstrLocId::default()))
        .collect()
}

/// Rewrites compiled units so every selected method reports to the probe
/// runtime on entry and on every exit path.
pub struct Instrumenter {
    options: InstrumentOptions,
}

impl Instrumenter {
    pub fn new(options: InstrumentOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &InstrumentOptions {
        &self.options
    }

    /// Instrument all units in parallel. Units share nothing but the index.
    pub fn instrument_all(
        &self,
        units: &[CompiledUnit],
        index: &MethodIndex,
    ) -> Vec<Result<InstrumentedUnit, InstrumentationError>> {
        units
            .par_iter()
            .map(|unit| self.instrument(unit, index))
            .collect()
    }

    /// Instrument one unit.
    pub fn instrument(
        &self,
        unit: &CompiledUnit,
        index: &MethodIndex,
    ) -> Result<InstrumentedUnit, InstrumentationError> {
        if has_custom_section(&unit.bytes, PROBE_KEYS_SECTION) {
            return Err(InstrumentationError::AlreadyInstrumented {
                unit: unit.name.clone(),
            });
        }

        let mut module = unit.parse()?;
        let mut report = InstrumentationReport {
            unit: unit.name.clone(),
            instrumented: Vec::new(),
            excluded: Vec::new(),
            failed: Vec::new(),
            input_sha256: compute_checksum(&unit.bytes),
            output_sha256: String::new(),
        };

        let mut plans: Vec<(FunctionId, String, ExitPlan)> = Vec::new();
        for (func_id, identity) in unit_methods(&module, &unit.name) {
            let key = identity.key();
            if self.options.exclude.excludes(&key) {
                tracing::debug!(method = key.as_str(), "Method excluded from instrumentation");
                report.excluded.push(key);
                continue;
            }

            let planned = match &module.funcs.get(func_id).kind {
                FunctionKind::Local(local) => self.plan_method(local, &identity, index),
                _ => continue,
            };

            match planned {
                Ok(plan) => plans.push((func_id, key, plan)),
                Err(err) if self.options.strict => return Err(err),
                Err(err) => {
                    tracing::warn!(method = key.as_str(), error = %err, "Method left uninstrumented");
                    report.failed.push(SkippedMethod {
                        method: key,
                        reason: err.to_string(),
                    });
                }
            }
        }

        if plans.is_empty() {
            report.output_sha256 = report.input_sha256.clone();
            return Ok(InstrumentedUnit {
                unit: unit.clone(),
                report,
            });
        }

        let begin_ty = module.types.add(&[ValType::I32], &[ValType::I64]);
        let report_ty = module.types.add(&[ValType::I64, ValType::I32], &[]);
        let (begin, _) = module.add_import_func(&self.options.probe_module, "begin", begin_ty);
        let (report_fn, _) = module.add_import_func(&self.options.probe_module, "report", report_ty);

        let mut keys = Vec::with_capacity(plans.len());
        for (key_id, (func_id, key, plan)) in plans.into_iter().enumerate() {
            let results = module
                .types
                .get(module.funcs.get(func_id).ty())
                .results()
                .to_vec();
            let wrapper_ty = InstrSeqType::new(&mut module.types, &[], &results);
            let probe = ProbeCalls {
                begin,
                report: report_fn,
                handle: module.locals.add(ValType::I64),
                key_id: key_id as i32,
            };

            if let FunctionKind::Local(local) = &mut module.funcs.get_mut(func_id).kind {
                apply_plan(local, &plan, probe, wrapper_ty);
                keys.push(key);
            }
        }

        module.customs.add(RawCustomSection {
            name: PROBE_KEYS_SECTION.to_string(),
            data: keys.join("\n").into_bytes(),
        });

        let bytes = module.emit_wasm();
        validate_module(&bytes).map_err(|reason| InstrumentationError::Verification {
            unit: unit.name.clone(),
            reason,
        })?;

        report.output_sha256 = compute_checksum(&bytes);
        report.instrumented = keys;

        Ok(InstrumentedUnit {
            unit: CompiledUnit {
                name: unit.name.clone(),
                path: unit.path.clone(),
                bytes,
            },
            report,
        })
    }

    /// Check everything that could fail before any mutation happens.
    fn plan_method(
        &self,
        local: &LocalFunction,
        identity: &MethodIdentity,
        index: &MethodIndex,
    ) -> Result<ExitPlan, InstrumentationError> {
        let key = identity.key();
        let key = key.as_str();
        if let Some(c) = identity.reserved_char() {
            return Err(InstrumentationError::UnsupportedShape {
                method: key.escape_debug().to_string(),
                reason: format!("name contains reserved character {:?}", c),
            });
        }
        if !index.contains(key) {
            return Err(InstrumentationError::NotIndexed {
                method: key.to_string(),
            });
        }

        let plan = plan_exits(local);
        let required = plan.slot_count() + 1;
        if required > MAX_FUNCTION_LOCALS {
            return Err(InstrumentationError::LocalSlotsExhausted {
                method: key.to_string(),
                required,
                limit: MAX_FUNCTION_LOCALS,
            });
        }

        Ok(plan)
    }
}

/// Apply the injection rules. Infallible once a plan exists.
fn apply_plan(local: &mut LocalFunction, plan: &ExitPlan, probe: ProbeCalls, wrapper_ty: InstrSeqType) {
    let body = plan.body;
    let wrapper = local.builder_mut().dangling_instr_seq(wrapper_ty).id();

    for site in plan.body_branches() {
        match &mut local.block_mut(site.seq).instrs[site.index].0 {
            Instr::Br(br) => br.block = wrapper,
            Instr::BrIf(br) => br.block = wrapper,
            Instr::BrTable(table) => {
                for target in table.blocks.iter_mut() {
                    if *target == body {
                        *target = wrapper;
                    }
                }
                if table.default == body {
                    table.default = wrapper;
                }
            }
            _ => {}
        }
    }

    let mut by_seq: HashMap<InstrSeqId, Vec<usize>> = HashMap::new();
    for site in plan.report_sites() {
        by_seq.entry(site.seq).or_default().push(site.index);
    }
    for (seq, mut positions) in by_seq {
        positions.sort_unstable_by(|a, b| b.cmp(a));
        let instrs = &mut local.block_mut(seq).instrs;
        for position in positions {
            for (offset, instr) in located(probe.report_sequence()).into_iter().enumerate() {
                instrs.insert(position + offset, instr);
            }
        }
    }

    let original = std::mem::take(&mut local.block_mut(body).instrs);
    local.block_mut(wrapper).instrs = original;

    let entry = &mut local.block_mut(body).instrs;
    entry.extend(located(probe.begin_sequence()));
    entry.extend(located([Instr::Block(Block { seq: wrapper })]));
    entry.extend(located(probe.report_sequence()));
}
