use std::sync::Arc;

use luape::prelude::*;


/// `y > x` on a grid, labelled `+1` / `-1`.
fn diagonal_sample() -> Sample {
    let mut x = Vec::new();
    let mut y = Vec::new();
    let mut target = Vec::new();
    for i in 0..6 {
        for j in 0..6 {
            x.push(i as f64);
            y.push(j as f64 + 0.25);
            target.push(if j >= i { 1.0 } else { -1.0 });
        }
    }
    Sample::from_features(
        vec![Feature::double("x", x), Feature::double("y", y)],
        target,
    ).unwrap()
}


fn attach(sample: &Sample) -> LuapeInference {
    let mut inference = LuapeInference::from_sample(sample, Task::BinaryClassification)
        .unwrap();
    inference.set_samples(sample, None).unwrap();
    inference
}


/// Run `learner` once under uniform exponential-loss weights.
/// Returns the node, its reported objective and a recomputed objective.
fn learn_once<W: WeakLearner>(learner: &mut W, inference: &mut LuapeInference)
    -> (NodeId, f64, f64)
{
    let labels = inference.labels(Dataset::Training);
    let weights = vec![1.0 / labels.len() as f64; labels.len()];
    let loss = ExponentialLoss::new(&labels, &weights);
    let examples = inference.training_indices();

    learner.initialize(inference).unwrap();
    let (node, objective) = learner.learn(inference, &loss, &examples).unwrap();
    let predictions = inference.training_samples(node, &examples);
    let recomputed = loss.weak_objective().compute(&predictions);
    (node, objective, recomputed)
}


/// Tests for the weak learners.
#[cfg(test)]
pub mod weak_learner_tests {
    use super::*;

    #[test]
    fn single_stump_finds_the_threshold() {
        let sample = Sample::from_features(
            vec![Feature::double("x", vec![1.0, 2.0, 3.0, 10.0])],
            vec![-1.0, -1.0, 1.0, 1.0],
        ).unwrap();
        let mut inference = attach(&sample);
        let (node, objective, recomputed) = learn_once(&mut SingleStump::init(), &mut inference);

        assert!((objective - 1.0).abs() < 1e-12);
        assert!((recomputed - 1.0).abs() < 1e-12);
        let NodeKind::Function { function, arguments } = inference.universe().node(node).kind()
            else { panic!("a stump is a function node") };
        assert_eq!(function, &Function::Stump { threshold: 2.5 });
        assert_eq!(arguments, &vec![inference.inputs()[0]]);
    }


    #[test]
    fn stump_splits_close_and_huge_values_as_scored() {
        let pairs = [
            (1.0, 1.0 + f64::EPSILON),
            (1e308, 1.7e308),
        ];
        for (low, high) in pairs {
            let sample = Sample::from_features(
                vec![Feature::double("x", vec![low, high])],
                vec![-1.0, 1.0],
            ).unwrap();
            let mut inference = attach(&sample);
            let (node, objective, recomputed) = learn_once(&mut SingleStump::init(), &mut inference);

            assert!((objective - 1.0).abs() < 1e-12);
            assert!((recomputed - objective).abs() < 1e-12);
            let NodeKind::Function { function: Function::Stump { threshold }, .. }
                = inference.universe().node(node).kind()
                else { panic!("a stump is a function node") };
            assert!(threshold.is_finite());
            assert!(*threshold > low && *threshold <= high);
        }
    }


    #[test]
    fn stumps_on_enumerations_test_one_value() {
        let color = Feature::enumeration(
            "color", 3, vec![Some(0), Some(1), Some(2), Some(1), Some(0), None],
        ).unwrap();
        let sample = Sample::from_features(
            vec![color], vec![-1.0, 1.0, -1.0, 1.0, -1.0, -1.0],
        ).unwrap();
        let mut inference = attach(&sample);
        let (node, objective, _) = learn_once(&mut SingleStump::init(), &mut inference);

        let NodeKind::Function { function, .. } = inference.universe().node(node).kind()
            else { panic!("an equality test is a function node") };
        assert_eq!(function, &Function::EqualsConstantEnum(1));
        assert!(objective > 0.0);
    }


    #[test]
    fn boolean_inputs_are_used_as_they_are() {
        let flag = Feature::boolean("flag", vec![Some(true), Some(false), None, Some(true)]);
        let sample = Sample::from_features(vec![flag], vec![1.0, -1.0, 1.0, 1.0]).unwrap();
        let mut inference = attach(&sample);
        let (node, objective, recomputed) = learn_once(&mut SingleStump::init(), &mut inference);

        assert_eq!(node, inference.inputs()[0]);
        assert_eq!(objective, recomputed);
    }


    #[test]
    fn exhaustive_functions_compare_inputs() {
        let sample = diagonal_sample();
        let mut inference = attach(&sample);
        let mut learner = FiniteLearner::new(ExhaustiveFunctions::new(1));
        let (node, objective, recomputed) = learn_once(&mut learner, &mut inference);

        assert!((objective - 1.0).abs() < 1e-9, "objective {objective}");
        assert!((recomputed - objective).abs() < 1e-9);
        assert_eq!(inference.universe().type_of(node), Type::Boolean);

        // A single stump on `x` or `y` cannot reach it.
        let (_, stump, _) = learn_once(&mut SingleStump::init(), &mut inference);
        assert!(stump < objective);
    }


    #[test]
    fn random_functions_yield_a_boolean_node() {
        let sample = diagonal_sample();
        let mut inference = attach(&sample);
        let mut learner = FiniteLearner::new(RandomFunctions::new(30).seed(3));
        let (node, objective, recomputed) = learn_once(&mut learner, &mut inference);

        assert!(objective.is_finite());
        assert!((recomputed - objective).abs() < 1e-9);
        assert_eq!(inference.universe().type_of(node), Type::Boolean);
    }


    #[test]
    fn policy_learner_yields_a_boolean_node() {
        let sample = diagonal_sample();
        let mut inference = attach(&sample);
        let mut learner = PolicyLearner::init()
            .candidates(20)
            .max_size(3)
            .seed(5);
        let (node, objective, recomputed) = learn_once(&mut learner, &mut inference);

        assert!(objective.is_finite());
        assert!((recomputed - objective).abs() < 1e-9);
        assert_eq!(inference.universe().type_of(node), Type::Boolean);
    }


    #[test]
    fn laminating_scores_survivors_on_every_example() {
        let sample = diagonal_sample();
        let mut inference = attach(&sample);
        let mut learner = LaminatingLearner::new(ExhaustiveFunctions::new(1))
            .min_examples(4)
            .seed(9);
        let (node, objective, recomputed) = learn_once(&mut learner, &mut inference);

        assert!(objective.is_finite());
        assert!((recomputed - objective).abs() < 1e-9);
        assert_eq!(inference.universe().type_of(node), Type::Boolean);
    }


    #[test]
    fn composite_keeps_the_best_learner() {
        let sample = diagonal_sample();
        let mut inference = attach(&sample);
        let (_, stump, _) = learn_once(&mut SingleStump::init(), &mut inference);
        let (_, functions, _) = learn_once(
            &mut FiniteLearner::new(ExhaustiveFunctions::new(1)), &mut inference,
        );

        let mut composite = CompositeLearner::new()
            .push(SingleStump::init())
            .push(FiniteLearner::new(ExhaustiveFunctions::new(1)));
        assert_eq!(composite.len(), 2);
        let (_, objective, _) = learn_once(&mut composite, &mut inference);
        assert_eq!(objective, stump.max(functions));
    }


    #[test]
    fn binary_tree_splits_then_learns_branches() {
        let sample = diagonal_sample();
        let mut inference = attach(&sample);
        let mut learner = BinaryTreeLearner::new(SingleStump::init(), SingleStump::init());
        let (node, objective, recomputed) = learn_once(&mut learner, &mut inference);

        assert!(matches!(inference.universe().node(node).kind(), NodeKind::Test { .. }));
        assert_eq!(inference.universe().type_of(node), Type::Boolean);
        assert!((recomputed - objective).abs() < 1e-9);
    }


    #[test]
    fn learners_fail_without_inputs() {
        let mut inference = LuapeInference::new(Task::BinaryClassification).unwrap();
        let labels = Vec::<f64>::new();
        let loss = ExponentialLoss::new(&labels, &labels);
        let examples = Arc::new(IndexSet::new());

        let result = SingleStump::init().learn(&mut inference, &loss, &examples);
        assert!(matches!(result, Err(LuapeError::SearchFailure { .. })));
        let result = PolicyLearner::init().learn(&mut inference, &loss, &examples);
        assert!(matches!(result, Err(LuapeError::SearchFailure { .. })));

        let mut composite = CompositeLearner::new()
            .push(SingleStump::init())
            .push(PolicyLearner::init());
        let result = composite.learn(&mut inference, &loss, &examples);
        assert!(matches!(result, Err(LuapeError::SearchFailure { .. })));
    }
}
