use luape::prelude::*;


fn toy_inference() -> LuapeInference {
    let sample = Sample::from_features(
        vec![Feature::double("x", vec![1.0, 2.0, 3.0, 10.0])],
        vec![-1.0, -1.0, 1.0, 1.0],
    ).unwrap();
    let mut inference = LuapeInference::from_sample(
        &sample, Task::BinaryClassification
    ).unwrap();
    inference.set_samples(&sample, None).unwrap();
    inference
}


fn constant(universe: &Universe, node: NodeId) -> f64 {
    universe.node(node)
        .as_constant()
        .and_then(|v| v.as_f64())
        .unwrap()
}


/// Tests for `AdaBoost`.
#[cfg(test)]
pub mod adaboost_tests {
    use super::*;

    #[test]
    fn one_round_separates_the_toy_sample() {
        let recorder = RecordingCallback::new();
        let mut booster = AdaBoost::init(toy_inference())
            .force_quit_at(1)
            .callback(recorder.clone());
        let mut weak_learner = SingleStump::init();

        let terminated = booster.run(&mut weak_learner).unwrap();
        assert_eq!(terminated, 1);

        let inference = booster.inference();
        let universe = inference.universe();
        let contributions = inference.contributions();
        assert_eq!(contributions.len(), 1);

        let NodeKind::Test { condition, failure, success, .. }
            = universe.node(contributions[0]).kind().clone()
            else { panic!("the contribution is not a test") };
        match universe.node(condition).kind() {
            NodeKind::Function { function: Function::Stump { threshold }, .. } => {
                assert_eq!(*threshold, 2.5);
            },
            other => panic!("expected a stump, got {other:?}"),
        }

        let failure = constant(universe, failure);
        let success = constant(universe, success);
        assert!(failure < 0.0, "failure vote {failure}");
        assert!(success > 0.0, "success vote {success}");

        let objective = recorder.values("WeakObjective");
        assert_eq!(objective.len(), 1);
        assert!((objective[0] - 1.0).abs() < 1e-9);

        assert_eq!(recorder.values("TrainScore"), vec![0.0]);
        assert!(recorder.values("ValidationScore").is_empty());
        assert_eq!(
            inference.compute_function(&[Value::Double(2.9)]),
            Value::Boolean(true),
        );
        assert_eq!(
            inference.compute_function(&[Value::Double(1.5)]),
            Value::Boolean(false),
        );
    }


    #[test]
    fn weights_stay_a_distribution() {
        let sample = Sample::from_features(
            vec![
                Feature::double("x", vec![0.1, 0.4, 0.35, 0.8, 0.9, 0.2, 0.6, 0.7]),
                Feature::double("y", vec![0.5, 0.2, 0.9, 0.1, 0.7, 0.3, 0.8, 0.4]),
            ],
            vec![1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0],
        ).unwrap();
        let mut inference = LuapeInference::from_sample(
            &sample, Task::BinaryClassification
        ).unwrap();
        inference.set_samples(&sample, Some(&sample)).unwrap();

        let recorder = RecordingCallback::new();
        let mut booster = AdaBoost::init(inference)
            .force_quit_at(5)
            .callback(recorder.clone());
        booster.run(&mut SingleStump::init()).unwrap();

        let sum = booster.weights().iter().sum::<f64>();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(booster.weights().iter().all(|w| *w >= 0.0));

        let inference = booster.inference();
        assert_eq!(inference.contributions().len(), 5);
        assert!(inference.check_cache_is_correct(Dataset::Training, inference.root()));
        assert!(inference.check_cache_is_correct(Dataset::Validation, inference.root()));

        // Identical samples give identical scores.
        assert_eq!(
            recorder.values("TrainScore"),
            recorder.values("ValidationScore"),
        );
        assert_eq!(recorder.values("CacheSize").len(), 5);
    }


    #[test]
    fn rejects_other_tasks() {
        let sample = Sample::from_features(
            vec![Feature::double("x", vec![1.0, 2.0])],
            vec![0.5, 1.5],
        ).unwrap();
        let mut inference = LuapeInference::from_sample(&sample, Task::Regression)
            .unwrap();
        inference.set_samples(&sample, None).unwrap();

        let mut booster = AdaBoost::init(inference);
        let result = booster.run(&mut SingleStump::init());
        assert!(matches!(result, Err(LuapeError::InvalidArgument(_))));
    }


    #[test]
    fn needs_training_samples() {
        let mut inference = LuapeInference::new(Task::BinaryClassification).unwrap();
        inference.add_input("x", Type::Double).unwrap();

        let mut booster = AdaBoost::init(inference);
        let result = booster.run(&mut SingleStump::init());
        assert!(matches!(result, Err(LuapeError::InvalidArgument(_))));
    }
}
