use joule_trace::trace::TraceRecord;
use proptest::prelude::*;

/// A well-formed call with integer readings so sums compare exactly.
#[derive(Debug, Clone)]
pub struct CallTree {
    pub method: String,
    pub own_energy: u32,
    pub own_time: u32,
    pub children: Vec<CallTree>,
}

impl CallTree {
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(CallTree::node_count).sum::<usize>()
    }

    /// Cumulative (energy, time): own share plus every callee's cumulative.
    pub fn cumulative(&self) -> (f64, f64) {
        self.children.iter().fold(
            (self.own_energy as f64, self.own_time as f64),
            |(e, t), child| {
                let (ce, ct) = child.cumulative();
                (e + ce, t + ct)
            },
        )
    }

    pub fn push_records(&self, out: &mut Vec<TraceRecord>) {
        out.push(TraceRecord::enter(self.method.clone()));
        for child in &self.children {
            child.push_records(out);
        }
        let (energy, time) = self.cumulative();
        out.push(TraceRecord::exit(self.method.clone(), energy, time));
    }
}

pub fn method_key() -> impl Strategy<Value = String> {
    "[a-c]\\$[a-z]{1,6}"
}

pub fn call_tree() -> impl Strategy<Value = CallTree> {
    let leaf = (method_key(), 0u32..5_000, 0u32..100_000).prop_map(|(method, e, t)| CallTree {
        method,
        own_energy: e,
        own_time: t,
        children: Vec::new(),
    });

    leaf.prop_recursive(6, 64, 4, |inner| {
        (
            method_key(),
            0u32..5_000,
            0u32..100_000,
            prop::collection::vec(inner, 0..4),
        )
            .prop_map(|(method, e, t, children)| CallTree {
                method,
                own_energy: e,
                own_time: t,
                children,
            })
    })
}

/// Sequential root calls of one thread.
pub fn call_forest() -> impl Strategy<Value = Vec<CallTree>> {
    prop::collection::vec(call_tree(), 0..5)
}

pub fn records_of(trees: &[CallTree]) -> Vec<TraceRecord> {
    let mut records = Vec::new();
    for tree in trees {
        tree.push_records(&mut records);
    }
    records
}
