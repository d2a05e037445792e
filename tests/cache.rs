use proptest::prelude::*;

use std::sync::Arc;

use luape::prelude::*;
use luape::dispatch_indices;


/// A universe with one double input and a cache over `values`.
fn single_input(values: Vec<f64>) -> (Universe, NodeId, SamplesCache) {
    let mut universe = Universe::new();
    let x = universe.make_variable_node("x", Type::Double, 0).unwrap();
    let n = values.len();
    let mut cache = SamplesCache::new(n);
    cache.cache_input(&universe, x, Column::Double(values));
    (universe, x, cache)
}


fn shift(universe: &mut Universe, x: NodeId, k: f64) -> NodeId {
    let c = universe.make_constant_node(Value::Double(k), Type::Double).unwrap();
    universe.make_function_node(Function::Add, vec![x, c]).unwrap()
}


/// Tests for the samples cache.
#[cfg(test)]
pub mod cache_tests {
    use super::*;

    #[test]
    fn evicts_the_earliest_node() {
        let mut universe = Universe::new();
        let x = universe.make_variable_node("x", Type::Double, 0).unwrap();
        let bytes = Column::Double(vec![0.0; 4]).size_in_bytes();
        let mut cache = SamplesCache::new(4).max_cache_size(3 * bytes);
        cache.cache_input(&universe, x, Column::Double(vec![1.0, 2.0, 3.0, 4.0]));
        assert_eq!(cache.input_size(), bytes);
        assert_eq!(cache.actual_cache_size(), 0);

        let nodes = (1..=4)
            .map(|k| shift(&mut universe, x, k as f64))
            .collect::<Vec<_>>();
        for node in nodes.iter().take(3) {
            cache.cache_node(&universe, *node, None);
        }
        assert!(nodes.iter().take(3).all(|n| cache.is_cached(*n)));
        assert_eq!(cache.actual_cache_size(), 3 * bytes);

        cache.cache_node(&universe, nodes[3], None);
        assert!(!cache.is_cached(nodes[0]));
        assert!(nodes[1..].iter().all(|n| cache.is_cached(*n)));
        assert!(cache.is_cached(x));
        assert_eq!(cache.actual_cache_size(), 3 * bytes);
        assert_eq!(cache.input_size(), bytes);

        // Inputs cannot be uncached.
        cache.uncache_node(x);
        assert!(cache.is_cached(x));
        cache.uncache_node(nodes[1]);
        assert!(!cache.is_cached(nodes[1]));
        assert_eq!(cache.actual_cache_size(), 2 * bytes);
    }


    #[test]
    fn oversized_node_is_kept_alone() {
        let (mut universe, x, _) = single_input(vec![1.0, 2.0]);
        let mut cache = SamplesCache::new(2).max_cache_size(1);
        cache.cache_input(&universe, x, Column::Double(vec![1.0, 2.0]));
        let node = shift(&mut universe, x, 1.0);
        cache.cache_node(&universe, node, None);
        assert!(cache.is_cached(node));
        assert!(cache.actual_cache_size() > 1);
        drop(cache);

        let other = shift(&mut universe, x, 2.0);
        let mut small = SamplesCache::new(2).max_cache_size(0);
        small.cache_input(&universe, x, Column::Double(vec![1.0, 2.0]));
        let all = small.all_indices();
        let samples = small.get_samples(&universe, other, &all, true);
        assert!(!small.is_cached(other));
        assert_eq!(samples.values(), vec![Value::Double(3.0), Value::Double(4.0)]);
    }


    #[test]
    fn full_computations_enter_the_cache() {
        let (mut universe, x, mut cache) = single_input(vec![1.0, -2.0, 3.0]);
        let node = shift(&mut universe, x, 0.5);

        let subset = Arc::new([0, 2].into_iter().collect::<IndexSet>());
        let partial = cache.get_samples(&universe, node, &subset, true);
        assert!(!cache.is_cached(node));
        assert_eq!(partial.values(), vec![Value::Double(1.5), Value::Double(3.5)]);

        let all = cache.all_indices();
        let full = cache.get_samples(&universe, node, &all, true);
        assert!(cache.is_cached(node));
        assert!(full.is_cached());
        assert!(cache.check_cache_is_correct(&universe, node));
    }


    #[test]
    fn cached_views_alias_subsets() {
        let (mut universe, x, mut cache) = single_input(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let node = shift(&mut universe, x, 10.0);
        cache.cache_node(&universe, node, None);

        for rows in [vec![1, 3, 5], vec![0, 1, 2], vec![4]] {
            let subset = Arc::new(rows.iter().copied().collect::<IndexSet>());
            let samples = cache.get_samples(&universe, node, &subset, true);
            assert!(samples.is_cached());
            let expected = rows.iter()
                .map(|r| universe.compute(node, &cache.row_inputs(*r)))
                .collect::<Vec<_>>();
            assert_eq!(samples.values(), expected);
            let positions = samples.iter().map(|s| s.row).collect::<Vec<_>>();
            assert_eq!(positions, rows);
        }
    }


    #[test]
    fn root_is_updated_incrementally() {
        let (mut universe, x, mut cache) = single_input(vec![0.0, 1.0, 2.0, f64::NAN]);
        let kind = SequenceKind::ScalarSum {
            convert_to_probabilities: false, compute_average: false,
        };
        let root = universe.make_sequence_node(kind, vec![]).unwrap();
        cache.cache_node(&universe, root, None);
        cache.pin_node(root);
        let pinned = cache.input_size();

        let minus = universe.make_constant_node(Value::Double(-1.0), Type::Double).unwrap();
        let plus = universe.make_constant_node(Value::Double(1.0), Type::Double).unwrap();
        let zero = universe.make_constant_node(Value::Double(0.0), Type::Double).unwrap();
        for threshold in [0.5, 1.5] {
            let stump = universe.make_function_node(Function::Stump { threshold }, vec![x])
                .unwrap();
            let test = universe.make_test_node(stump, minus, plus, zero).unwrap();
            universe.push_sequence_child(root, test).unwrap();
            cache.observe_new_child(&universe, root, test);
            assert!(cache.check_cache_is_correct(&universe, root));
        }

        let scores = cache.column(root).unwrap();
        let scores = (0..4).map(|row| scores.get(row)).collect::<Vec<_>>();
        assert_eq!(scores, vec![
            Value::Double(-2.0),
            Value::Double(0.0),
            Value::Double(2.0),
            Value::Double(0.0),
        ]);
        assert!(cache.is_cached(root));
        assert_eq!(cache.input_size(), pinned);
    }


    #[test]
    fn vector_root_is_updated_incrementally() {
        let (mut universe, x, mut cache) = single_input(vec![0.0, 1.0, 2.0, f64::NAN]);
        let kind = SequenceKind::VectorSum { n: 2, convert_to_probabilities: true };
        let root = universe.make_sequence_node(kind, vec![]).unwrap();
        cache.cache_node(&universe, root, None);
        cache.pin_node(root);
        assert!(cache.check_cache_is_correct(&universe, root));

        let vote = |universe: &mut Universe, v: Vec<f64>| {
            universe.make_constant_node(Value::Vector(v), Type::DoubleVector(2)).unwrap()
        };
        let failure = vote(&mut universe, vec![1.0, -1.0]);
        let success = vote(&mut universe, vec![-0.5, 2.0]);
        let missing = vote(&mut universe, vec![0.0, 0.0]);
        for threshold in [0.5, 1.5] {
            let stump = universe.make_function_node(Function::Stump { threshold }, vec![x])
                .unwrap();
            let test = universe.make_test_node(stump, failure, success, missing).unwrap();
            universe.push_sequence_child(root, test).unwrap();
            cache.observe_new_child(&universe, root, test);
            assert!(cache.check_cache_is_correct(&universe, root));
        }

        let probabilities = cache.column(root).unwrap();
        for row in 0..4 {
            let Value::Vector(p) = probabilities.get(row) else { panic!("not a vector") };
            assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
        let Value::Vector(missing_row) = probabilities.get(3) else { panic!("not a vector") };
        assert!((missing_row[0] - 0.5).abs() < 1e-12);
    }


    #[test]
    fn sparse_root_is_updated_incrementally() {
        let (mut universe, x, mut cache) = single_input(vec![0.0, 1.0, 2.0, f64::NAN]);
        let root = universe.make_sequence_node(SequenceKind::CreateSparseVector, vec![])
            .unwrap();
        cache.cache_node(&universe, root, None);
        cache.pin_node(root);
        let pinned = cache.input_size();
        let all = cache.all_indices();

        let first = shift(&mut universe, x, 1.0);
        universe.push_sequence_child(root, first).unwrap();
        cache.observe_new_child(&universe, root, first);
        assert!(cache.check_cache_is_correct(&universe, root));
        let before = cache.get_samples(&universe, root, &all, false);

        let second = shift(&mut universe, x, -1.0);
        universe.push_sequence_child(root, second).unwrap();
        cache.observe_new_child(&universe, root, second);
        assert!(cache.check_cache_is_correct(&universe, root));
        assert!(cache.input_size() > pinned);

        let entries = |value: Value| {
            let Value::Sparse(v) = value else { panic!("not a sparse vector") };
            v.iter().map(|(i, x)| (*i, *x)).collect::<Vec<_>>()
        };
        let column = cache.column(root).unwrap();
        assert_eq!(entries(column.get(0)), vec![(0, 1.0), (1, -1.0)]);
        assert_eq!(entries(column.get(2)), vec![(0, 3.0), (1, 1.0)]);
        assert_eq!(entries(column.get(3)), vec![]);

        // Views taken before the push keep the previous output.
        let old = before.values();
        assert_eq!(entries(old[0].clone()), vec![(0, 1.0)]);
    }


    #[test]
    fn removable_values_stay_within_the_budget() {
        let (mut universe, x, _) = single_input(vec![1.0, 2.0, 3.0, 4.0]);
        let bytes = Column::Double(vec![0.0; 2]).size_in_bytes();
        let mut cache = SamplesCache::new(4).max_cache_size(2 * bytes);
        cache.cache_input(&universe, x, Column::Double(vec![1.0, 2.0, 3.0, 4.0]));

        let subset = Arc::new([0, 2].into_iter().collect::<IndexSet>());
        let nodes = (1..=4)
            .map(|k| shift(&mut universe, x, k as f64))
            .collect::<Vec<_>>();
        for node in nodes.iter() {
            let samples = cache.get_samples(&universe, *node, &subset, true);
            assert_eq!(samples.len(), 2);
            assert!(cache.removable_size() <= 2 * bytes);
        }
        assert_eq!(cache.removable_size(), 2 * bytes);

        cache.clear_removable();
        assert_eq!(cache.removable_size(), 0);
    }


    #[test]
    fn sorted_values_skip_missing_rows() {
        let (mut universe, x, mut cache) = single_input(vec![3.0, f64::NAN, 1.0, 2.0]);

        let all = cache.all_indices();
        let (sorted, missing) = cache.sorted_double_values(&universe, x, &all);
        assert_eq!(sorted, vec![(2, 1.0), (3, 2.0), (0, 3.0)]);
        assert_eq!(missing, vec![1]);

        let subset = Arc::new([0, 1, 2].into_iter().collect::<IndexSet>());
        let (sorted, missing) = cache.sorted_double_values(&universe, x, &subset);
        assert_eq!(sorted, vec![(2, 1.0), (0, 3.0)]);
        assert_eq!(missing, vec![1]);

        let two = universe.make_constant_node(Value::Double(2.0), Type::Double).unwrap();
        let double = universe.make_function_node(Function::Mul, vec![x, two]).unwrap();
        let subset = Arc::new([0, 1, 3].into_iter().collect::<IndexSet>());
        let (sorted, missing) = cache.sorted_double_values(&universe, double, &subset);
        assert_eq!(sorted, vec![(3, 4.0), (0, 6.0)]);
        assert_eq!(missing, vec![1]);
    }


    #[test]
    fn row_inputs_follow_slots() {
        let mut universe = Universe::new();
        let x = universe.make_variable_node("x", Type::Double, 0).unwrap();
        let b = universe.make_variable_node("b", Type::Boolean, 1).unwrap();
        let mut cache = SamplesCache::new(2);
        cache.cache_input(&universe, b, Column::Boolean(vec![1, 2]));
        cache.cache_input(&universe, x, Column::Double(vec![0.5, f64::NAN]));

        assert_eq!(cache.row_inputs(0), vec![Value::Double(0.5), Value::Boolean(true)]);
        assert_eq!(cache.row_inputs(1), vec![Value::Missing, Value::Missing]);
    }


    proptest! {
        #[test]
        fn dispatch_partitions_the_rows(
            raw in prop::collection::vec(0..3_u8, 1..80),
            mask in prop::collection::vec(any::<bool>(), 80),
        ) {
            let n = raw.len();
            let mut universe = Universe::new();
            let b = universe.make_variable_node("b", Type::Boolean, 0).unwrap();
            let mut cache = SamplesCache::new(n);
            cache.cache_input(&universe, b, Column::Boolean(raw.clone()));

            let rows = (0..n).filter(|&r| mask[r]).collect::<Vec<_>>();
            let subset = Arc::new(rows.iter().copied().collect::<IndexSet>());
            let samples = cache.get_samples(&universe, b, &subset, true);
            let (failure, success, missing) = dispatch_indices(&samples);

            prop_assert_eq!(failure.len() + success.len() + missing.len(), rows.len());
            for &row in rows.iter() {
                let owners = [&failure, &success, &missing].iter()
                    .filter(|set| set.contains(row))
                    .count();
                prop_assert_eq!(owners, 1);
            }
            prop_assert!(failure.iter().all(|r| raw[r] == 0));
            prop_assert!(success.iter().all(|r| raw[r] == 1));
            prop_assert!(missing.iter().all(|r| raw[r] == 2));
        }
    }
}
