//! Property-based tests for dependency context priority.
//!
//! These tests use proptest to generate request chains of random depth and
//! verify that priority and merging always favour the request nearest to the
//! root.

#[cfg(test)]
mod proptest_tests {
    use std::sync::Arc;

    use crate::dependency::{DependencyCollection, DependencyContext};
    use crate::package::PackageId;
    use proptest::prelude::*;

    fn context_at(depth: usize) -> Arc<DependencyContext> {
        let mut context = DependencyContext::root();
        for level in 0..depth {
            context = DependencyContext::child(&context, PackageId(level));
        }
        context
    }

    proptest! {
        /// Property: priority is exactly "not deeper than"
        #[test]
        fn has_priority_matches_depth_order(a in 0usize..32, b in 0usize..32) {
            let (left, right) = (context_at(a), context_at(b));
            prop_assert_eq!(left.has_priority(&right), a <= b);
        }

        /// Property: merge picks the shallower context and is symmetric in depth
        #[test]
        fn merge_returns_minimum_depth(a in 0usize..32, b in 0usize..32) {
            let (left, right) = (context_at(a), context_at(b));
            prop_assert_eq!(DependencyContext::merge(&left, &right).depth(), a.min(b));
            prop_assert_eq!(DependencyContext::merge(&right, &left).depth(), a.min(b));
        }

        /// Property: on equal depth the first argument wins
        #[test]
        fn merge_prefers_first_on_tie(depth in 0usize..32) {
            let (left, right) = (context_at(depth), context_at(depth));
            prop_assert!(Arc::ptr_eq(&DependencyContext::merge(&left, &right), &left));
        }

        /// Property: the request chain has one entry per level below the root
        #[test]
        fn requested_by_length_equals_depth(depth in 0usize..32) {
            prop_assert_eq!(context_at(depth).requested_by().len(), depth);
        }

        /// Property: after any sequence of additions a collection keeps one
        /// entry per package, holding the shallowest context offered
        #[test]
        fn collection_keeps_shallowest_context(
            requests in prop::collection::vec((0usize..6, 0usize..10), 0..40)
        ) {
            let mut collection = DependencyCollection::new();
            for (package, depth) in &requests {
                collection.add_with_priority(PackageId(*package), context_at(*depth));
            }

            let mut order: Vec<usize> = Vec::new();
            for (package, _) in &requests {
                if !order.contains(package) {
                    order.push(*package);
                }
            }
            prop_assert_eq!(collection.len(), order.len());
            let packages: Vec<usize> = collection.packages().map(|id| id.0).collect();
            prop_assert_eq!(packages, order);

            for (package, context) in collection.iter() {
                let shallowest = requests
                    .iter()
                    .filter(|(p, _)| *p == package.0)
                    .map(|(_, depth)| *depth)
                    .min();
                prop_assert_eq!(Some(context.depth()), shallowest);
            }
        }
    }
}
