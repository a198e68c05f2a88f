//! Structural enumeration of method exit points.
//!
//! Every instruction sequence reachable from a function body is walked once.
//! The resulting [`ExitPlan`] lists each place where control can leave the
//! frame, so the rewriter applies a fixed injection rule per exit kind
//! instead of reacting to instructions as they stream past.

use std::collections::HashSet;
use walrus::ir::{Instr, InstrSeqId};
use walrus::{LocalFunction, LocalId};

/// A location inside a function: sequence plus instruction position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Site {
    pub seq: InstrSeqId,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// `return`
    Return,
    /// `unreachable`: an explicit trap
    Trap,
    /// `br`, `br_if` or `br_table` targeting the function body label
    BodyBranch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitPoint {
    pub kind: ExitKind,
    pub site: Site,
}

/// All exits of one function plus the facts the rewriter checks up front.
#[derive(Debug, Clone)]
pub struct ExitPlan {
    pub body: InstrSeqId,
    pub exits: Vec<ExitPoint>,
    pub params: usize,
    pub locals: HashSet<LocalId>,
}

impl ExitPlan {
    /// Explicit exits needing an injected report before them.
    pub fn report_sites(&self) -> impl Iterator<Item = Site> + '_ {
        self.exits
            .iter()
            .filter(|e| matches!(e.kind, ExitKind::Return | ExitKind::Trap))
            .map(|e| e.site)
    }

    /// Branches that must be retargeted to the wrapper block.
    pub fn body_branches(&self) -> impl Iterator<Item = Site> + '_ {
        self.exits
            .iter()
            .filter(|e| e.kind == ExitKind::BodyBranch)
            .map(|e| e.site)
    }

    pub fn count(&self, kind: ExitKind) -> usize {
        self.exits.iter().filter(|e| e.kind == kind).count()
    }

    /// Local slots the function uses: parameters plus every other local
    /// it touches.
    pub fn slot_count(&self) -> usize {
        self.params + self.locals.len()
    }
}

fn targets_body(instr: &Instr, body: InstrSeqId) -> bool {
    match instr {
        Instr::Br(br) => br.block == body,
        Instr::BrIf(br) => br.block == body,
        Instr::BrTable(table) => table.default == body || table.blocks.iter().any(|b| *b == body),
        _ => false,
    }
}

/// Walk a function body and record every exit point.
pub fn plan_exits(func: &LocalFunction) -> ExitPlan {
    let body = func.entry_block();
    let params: HashSet<LocalId> = func.args.iter().copied().collect();

    let mut plan = ExitPlan {
        body,
        exits: Vec::new(),
        params: params.len(),
        locals: HashSet::new(),
    };

    let mut pending = vec![body];
    let mut visited = HashSet::new();

    while let Some(seq) = pending.pop() {
        if !visited.insert(seq) {
            continue;
        }

        for (index, (instr, _)) in func.block(seq).instrs.iter().enumerate() {
            let site = Site { seq, index };
            match instr {
                Instr::Block(block) => pending.push(block.seq),
                Instr::Loop(lp) => pending.push(lp.seq),
                Instr::IfElse(if_else) => {
                    pending.push(if_else.consequent);
                    pending.push(if_else.alternative);
                }
                Instr::Return(_) => plan.exits.push(ExitPoint {
                    kind: ExitKind::Return,
                    site,
                }),
                Instr::Unreachable(_) => plan.exits.push(ExitPoint {
                    kind: ExitKind::Trap,
                    site,
                }),
                Instr::LocalGet(get) => {
                    if !params.contains(&get.local) {
                        plan.locals.insert(get.local);
                    }
                }
                Instr::LocalSet(set) => {
                    if !params.contains(&set.local) {
                        plan.locals.insert(set.local);
                    }
                }
                Instr::LocalTee(tee) => {
                    if !params.contains(&tee.local) {
                        plan.locals.insert(tee.local);
                    }
                }
                other if targets_body(other, body) => plan.exits.push(ExitPoint {
                    kind: ExitKind::BodyBranch,
                    site,
                }),
                _ => {}
            }
        }
    }

    plan
}
