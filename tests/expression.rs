use proptest::prelude::*;

use std::sync::Arc;

use luape::prelude::*;


fn double_inputs(universe: &mut Universe) -> (NodeId, NodeId) {
    let x = universe.make_variable_node("x", Type::Double, 0).unwrap();
    let y = universe.make_variable_node("y", Type::Double, 1).unwrap();
    (x, y)
}


fn maybe_double() -> impl Strategy<Value = f64> {
    prop_oneof![
        6 => -8.0..8.0_f64,
        1 => Just(0.0),
        1 => Just(f64::NAN),
    ]
}


/// Tests for node construction and scalar evaluation.
#[cfg(test)]
pub mod expression_tests {
    use super::*;

    #[test]
    fn equal_nodes_share_an_id() {
        let mut universe = Universe::new();
        let (x, _) = double_inputs(&mut universe);
        let again = universe.make_variable_node("x", Type::Double, 0).unwrap();
        assert_eq!(x, again);

        let one = universe.make_constant_node(Value::Double(1.0), Type::Double).unwrap();
        let other = universe.make_constant_node(Value::Double(1.0), Type::Double).unwrap();
        assert_eq!(one, other);

        let a = universe.make_function_node(Function::Add, vec![x, one]).unwrap();
        let b = universe.make_function_node(Function::Add, vec![x, one]).unwrap();
        assert_eq!(a, b);

        let s = universe.make_function_node(Function::Stump { threshold: 0.5 }, vec![x]).unwrap();
        let t = universe.make_function_node(Function::Stump { threshold: 1.5 }, vec![x]).unwrap();
        assert_ne!(s, t);
        assert_eq!(universe.to_short_string(a), "(x + 1.0000)");
    }


    #[test]
    fn tests_and_sequences_are_not_interned() {
        let mut universe = Universe::new();
        let (x, _) = double_inputs(&mut universe);
        let stump = universe.make_function_node(Function::Stump { threshold: 0.0 }, vec![x])
            .unwrap();
        let zero = universe.make_constant_node(Value::Double(0.0), Type::Double).unwrap();
        let a = universe.make_test_node(stump, zero, x, zero).unwrap();
        let b = universe.make_test_node(stump, zero, x, zero).unwrap();
        assert_ne!(a, b);

        let kind = SequenceKind::ScalarSum {
            convert_to_probabilities: false, compute_average: false,
        };
        let s = universe.make_sequence_node(kind.clone(), vec![]).unwrap();
        let t = universe.make_sequence_node(kind, vec![]).unwrap();
        assert_ne!(s, t);
    }


    #[test]
    fn folding_canonizes_commutative_functions() {
        let mut plain = Universe::new();
        let (x, y) = double_inputs(&mut plain);
        let xy = plain.make_function_node(Function::Add, vec![x, y]).unwrap();
        let yx = plain.make_function_node(Function::Add, vec![y, x]).unwrap();
        assert_ne!(xy, yx);

        let mut folding = Universe::new().constant_folding(true);
        let (x, y) = double_inputs(&mut folding);
        let xy = folding.make_function_node(Function::Add, vec![x, y]).unwrap();
        let yx = folding.make_function_node(Function::Add, vec![y, x]).unwrap();
        assert_eq!(xy, yx);
        let xmy = folding.make_function_node(Function::Sub, vec![x, y]).unwrap();
        let ymx = folding.make_function_node(Function::Sub, vec![y, x]).unwrap();
        assert_ne!(xmy, ymx);

        let two = folding.make_constant_node(Value::Double(2.0), Type::Double).unwrap();
        let three = folding.make_constant_node(Value::Double(3.0), Type::Double).unwrap();
        let sum = folding.make_function_node(Function::Add, vec![two, three]).unwrap();
        assert_eq!(folding.node(sum).as_constant(), Some(&Value::Double(5.0)));
        let five = folding.make_constant_node(Value::Double(5.0), Type::Double).unwrap();
        assert_eq!(sum, five);
    }


    #[test]
    fn type_errors_are_reported() {
        let mut universe = Universe::new();
        let (x, _) = double_inputs(&mut universe);
        let flag = universe.make_variable_node("flag", Type::Boolean, 2).unwrap();

        let result = universe.make_function_node(Function::Not, vec![x]);
        assert!(matches!(result, Err(LuapeError::TypeMismatch { .. })));
        let result = universe.make_function_node(Function::Add, vec![x]);
        assert!(matches!(result, Err(LuapeError::InvalidArgument(_))));
        let result = universe.make_variable_node("x", Type::Boolean, 0);
        assert!(matches!(result, Err(LuapeError::TypeMismatch { .. })));
        let result = universe.make_constant_node(Value::Boolean(true), Type::Double);
        assert!(matches!(result, Err(LuapeError::TypeMismatch { .. })));

        let result = universe.make_test_node(x, flag, flag, flag);
        assert!(matches!(result, Err(LuapeError::TypeMismatch { .. })));
        let result = universe.make_test_node(flag, x, flag, x);
        assert!(matches!(result, Err(LuapeError::TypeMismatch { .. })));

        let kind = SequenceKind::ScalarSum {
            convert_to_probabilities: false, compute_average: false,
        };
        let sum = universe.make_sequence_node(kind, vec![x]).unwrap();
        let result = universe.push_sequence_child(sum, flag);
        assert!(matches!(result, Err(LuapeError::TypeMismatch { .. })));
        let result = universe.push_sequence_child(x, x);
        assert!(matches!(result, Err(LuapeError::InvalidArgument(_))));

        let result = universe.make_sequence_node(
            SequenceKind::VectorSum { n: 0, convert_to_probabilities: false }, vec![],
        );
        assert!(result.is_err());
    }


    #[test]
    fn missing_values_propagate() {
        let mut universe = Universe::new();
        let (x, y) = double_inputs(&mut universe);
        let zero = universe.make_constant_node(Value::Double(0.0), Type::Double).unwrap();

        let add = universe.make_function_node(Function::Add, vec![x, y]).unwrap();
        let div = universe.make_function_node(Function::Div, vec![x, zero]).unwrap();
        let log = universe.make_function_node(Function::Log, vec![x]).unwrap();
        let stump = universe.make_function_node(Function::Stump { threshold: 0.0 }, vec![y])
            .unwrap();

        let inputs = [Value::Double(-1.0), Value::Missing];
        assert_eq!(universe.compute(add, &inputs), Value::Missing);
        assert_eq!(universe.compute(div, &inputs), Value::Missing);
        assert_eq!(universe.compute(log, &inputs), Value::Missing);
        assert_eq!(universe.compute(stump, &inputs), Value::Missing);

        let inputs = [Value::Double(4.0), Value::Double(0.0)];
        assert_eq!(universe.compute(add, &inputs), Value::Double(4.0));
        assert_eq!(universe.compute(stump, &inputs), Value::Boolean(true));
    }


    #[test]
    fn tests_route_to_one_branch() {
        let mut universe = Universe::new();
        let (x, y) = double_inputs(&mut universe);
        let condition = universe.make_function_node(Function::GreaterThan, vec![x, y]).unwrap();
        let lost = universe.make_constant_node(Value::Double(-1.0), Type::Double).unwrap();
        let test = universe.make_test_node(condition, lost, x, y).unwrap();

        let compute = |a: Value, b: Value| universe.compute(test, &[a, b]);
        assert_eq!(compute(Value::Double(3.0), Value::Double(1.0)), Value::Double(3.0));
        assert_eq!(compute(Value::Double(0.0), Value::Double(1.0)), Value::Double(-1.0));
        assert_eq!(compute(Value::Missing, Value::Double(7.0)), Value::Double(7.0));
    }


    #[test]
    fn sequences_reduce_their_children() {
        let mut universe = Universe::new();
        let (x, y) = double_inputs(&mut universe);

        let sum = universe.make_sequence_node(
            SequenceKind::ScalarSum { convert_to_probabilities: false, compute_average: false },
            vec![x, y],
        ).unwrap();
        let average = universe.make_sequence_node(
            SequenceKind::ScalarSum { convert_to_probabilities: false, compute_average: true },
            vec![x, y],
        ).unwrap();
        let empty = universe.make_sequence_node(
            SequenceKind::ScalarSum { convert_to_probabilities: true, compute_average: false },
            vec![],
        ).unwrap();
        let sparse = universe.make_sequence_node(SequenceKind::CreateSparseVector, vec![x, y])
            .unwrap();

        let inputs = [Value::Double(1.0), Value::Double(2.0)];
        assert_eq!(universe.compute(sum, &inputs), Value::Double(3.0));
        assert_eq!(universe.compute(average, &inputs), Value::Double(1.5));
        assert_eq!(universe.compute(empty, &inputs), Value::Double(0.5));

        // Missing children add nothing.
        let inputs = [Value::Missing, Value::Double(2.0)];
        assert_eq!(universe.compute(sum, &inputs), Value::Double(2.0));
        let Value::Sparse(entries) = universe.compute(sparse, &inputs) else {
            panic!("not a sparse vector")
        };
        let entries = entries.iter().map(|(i, x)| (*i, *x)).collect::<Vec<_>>();
        assert_eq!(entries, vec![(1, 2.0)]);

        let first = universe.make_constant_node(Value::Vector(vec![1.0, -1.0]), Type::DoubleVector(2))
            .unwrap();
        let second = universe.make_constant_node(Value::Vector(vec![0.5, 0.5]), Type::DoubleVector(2))
            .unwrap();
        let votes = universe.make_sequence_node(
            SequenceKind::VectorSum { n: 2, convert_to_probabilities: false },
            vec![first],
        ).unwrap();
        assert_eq!(universe.push_sequence_child(votes, second).unwrap(), 1);
        assert_eq!(universe.compute(votes, &[]), Value::Vector(vec![1.5, -0.5]));
    }


    #[test]
    fn importance_flows_to_descendants() {
        let mut universe = Universe::new();
        let (x, y) = double_inputs(&mut universe);
        let diff = universe.make_function_node(Function::Sub, vec![x, y]).unwrap();
        let stump = universe.make_function_node(Function::Stump { threshold: 0.0 }, vec![diff])
            .unwrap();
        let other = universe.make_function_node(Function::Stump { threshold: 1.0 }, vec![x])
            .unwrap();

        universe.add_importance(stump, 2.0);
        universe.add_importance(other, 1.0);
        assert_eq!(universe.node(x).importance(), 3.0);
        assert_eq!(universe.node(y).importance(), 2.0);

        let top = universe.most_important_nodes(2);
        assert_eq!(top[0], (x, 3.0));
        assert_eq!(top[1].1, 2.0);
        assert_eq!(top.len(), 2);
    }


    #[test]
    fn json_round_trip_keeps_interning() {
        let mut universe = Universe::new().constant_folding(true);
        let (x, y) = double_inputs(&mut universe);
        let product = universe.make_function_node(Function::Mul, vec![x, y]).unwrap();
        let stump = universe.make_function_node(Function::Stump { threshold: 2.0 }, vec![product])
            .unwrap();

        let json = universe.to_json().unwrap();
        let mut restored = Universe::from_json(&json).unwrap();
        assert_eq!(restored.len(), universe.len());

        let again = restored.make_function_node(Function::Mul, vec![y, x]).unwrap();
        assert_eq!(again, product);
        let again = restored.make_function_node(Function::Stump { threshold: 2.0 }, vec![product])
            .unwrap();
        assert_eq!(again, stump);

        let inputs = [Value::Double(1.5), Value::Double(2.0)];
        assert_eq!(restored.compute(stump, &inputs), universe.compute(stump, &inputs));
    }


    #[test]
    fn instance_cache_matches_direct_evaluation() {
        let mut universe = Universe::new();
        let (x, y) = double_inputs(&mut universe);
        let product = universe.make_function_node(Function::Mul, vec![x, y]).unwrap();
        let log = universe.make_function_node(Function::Log, vec![product]).unwrap();

        let inputs = vec![Value::Double(2.0), Value::Double(3.0)];
        let mut instance = InstanceCache::new(inputs.clone());
        let memoized = instance.compute(&universe, log);
        assert_eq!(memoized, universe.compute(log, &inputs));
        assert!(instance.len() >= 2);
    }


    proptest! {
        #[test]
        fn bulk_matches_scalar_evaluation(
            rows in prop::collection::vec((maybe_double(), maybe_double()), 1..40)
        ) {
            let mut universe = Universe::new();
            let (x, y) = double_inputs(&mut universe);
            let div = universe.make_function_node(Function::Div, vec![x, y]).unwrap();
            let log = universe.make_function_node(Function::Log, vec![div]).unwrap();
            let greater = universe.make_function_node(Function::GreaterThan, vec![x, y]).unwrap();
            let stump = universe.make_function_node(Function::Stump { threshold: 0.5 }, vec![log])
                .unwrap();
            let both = universe.make_function_node(Function::And, vec![greater, stump]).unwrap();
            let test = universe.make_test_node(both, x, log, y).unwrap();

            let n = rows.len();
            let mut cache = SamplesCache::new(n);
            cache.cache_input(&universe, x, Column::Double(rows.iter().map(|r| r.0).collect()));
            cache.cache_input(&universe, y, Column::Double(rows.iter().map(|r| r.1).collect()));

            let all = Arc::new(IndexSet::range(0, n));
            for node in [div, log, greater, stump, both, test] {
                let bulk = cache.get_samples(&universe, node, &all, true).values();
                for (row, value) in bulk.iter().enumerate() {
                    let expected = universe.compute(node, &cache.row_inputs(row));
                    prop_assert!(value.approx_eq(&expected, 1e-12), "{value} != {expected}");
                }
            }
        }
    }
}
