use crate::strategies::{call_forest, records_of};
use joule_trace::callgraph::{CallGraphBuilder, Quantity};
use joule_trace::trace::{TraceError, TraceRecord};
use proptest::prelude::*;

proptest! {
    #[test]
    fn balanced_traces_always_build(trees in call_forest()) {
        let records = records_of(&trees);
        let forest = CallGraphBuilder::new().build_from_records(records).unwrap();

        prop_assert_eq!(forest.roots().len(), trees.len());
        prop_assert_eq!(
            forest.len(),
            trees.iter().map(|t| t.node_count()).sum::<usize>()
        );
    }

    #[test]
    fn forest_flattens_back_to_its_trace(trees in call_forest()) {
        let records = records_of(&trees);
        let forest = CallGraphBuilder::new().build_from_records(records.clone()).unwrap();
        prop_assert_eq!(forest.to_records(), records);
    }

    #[test]
    fn self_values_are_never_negative(trees in call_forest()) {
        let forest = CallGraphBuilder::new().build_from_records(records_of(&trees)).unwrap();

        prop_assert!(forest.check_invariants(0.0).is_empty());
        for (id, _) in forest.iter() {
            for quantity in Quantity::ALL {
                prop_assert!(forest.self_value(id, quantity) >= 0.0);
            }
        }
    }

    #[test]
    fn root_totals_match_generated_cumulatives(trees in call_forest()) {
        let forest = CallGraphBuilder::new().build_from_records(records_of(&trees)).unwrap();
        let expected: f64 = trees.iter().map(|t| t.cumulative().0).sum();
        prop_assert_eq!(forest.total(Quantity::Energy), expected);
    }

    #[test]
    fn truncated_traces_keep_completed_roots(
        trees in call_forest().prop_filter("need a root", |t| !t.is_empty()),
        cut in any::<prop::sample::Index>(),
    ) {
        let records = records_of(&trees);
        // Drop the final exit plus a random tail of the last root.
        let last_len = 2 * trees[trees.len() - 1].node_count();
        let last_start = records.len() - last_len;
        let keep = last_start + 1 + cut.index(last_len - 1);
        let truncated: Vec<TraceRecord> = records[..keep].to_vec();

        match CallGraphBuilder::new().build_from_records(truncated) {
            Err(TraceError::UnterminatedCalls { open, partial }) => {
                prop_assert!(!open.is_empty());
                prop_assert_eq!(&open[0], &trees[trees.len() - 1].method);
                prop_assert_eq!(partial.roots().len(), trees.len() - 1);
            }
            other => prop_assert!(false, "expected unterminated calls, got {:?}", other),
        }
    }

    #[test]
    fn leading_exit_is_unbalanced(trees in call_forest(), method in "[a-c]\\$[a-z]{1,6}") {
        let mut records = vec![TraceRecord::exit(method, 1.0, 1.0)];
        records.extend(records_of(&trees));

        match CallGraphBuilder::new().build_from_records(records) {
            Err(TraceError::UnbalancedExit { position, .. }) => prop_assert_eq!(position.line, 1),
            other => prop_assert!(false, "expected unbalanced exit, got {:?}", other),
        }
    }
}
