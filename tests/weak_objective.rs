use proptest::prelude::*;

use luape::prelude::*;


const RAW_FALSE: u8 = 0;
const RAW_TRUE: u8 = 1;
const RAW_MISSING: u8 = 2;


/// `(row, value)` pairs sorted by value (stable) and the missing rows.
fn sort(values: &[Option<f64>]) -> (Vec<(usize, f64)>, Vec<usize>) {
    let mut sorted = values.iter()
        .enumerate()
        .filter_map(|(row, x)| x.map(|x| (row, x)))
        .collect::<Vec<_>>();
    sorted.sort_by(|a, b| a.1.total_cmp(&b.1));
    let missing = values.iter()
        .enumerate()
        .filter(|(_, x)| x.is_none())
        .map(|(row, _)| row)
        .collect();
    (sorted, missing)
}


/// Score every midpoint threshold from scratch.
fn brute_force(objective: &mut dyn WeakObjective, values: &[Option<f64>]) -> (f64, f64) {
    let (sorted, _) = sort(values);
    let mut distinct = sorted.iter().map(|(_, x)| *x).collect::<Vec<_>>();
    distinct.dedup();

    let mut best = (f64::NAN, f64::NEG_INFINITY);
    for pair in distinct.windows(2) {
        let threshold = (pair[0] + pair[1]) / 2.0;
        let raw = values.iter()
            .enumerate()
            .map(|(row, x)| {
                let p = match x {
                    None => RAW_MISSING,
                    Some(x) if *x > threshold => RAW_TRUE,
                    Some(_) => RAW_FALSE,
                };
                (row, p)
            })
            .collect::<Vec<_>>();
        objective.set_raw_predictions(&raw);
        let value = objective.compute_objective();
        if value > best.1 {
            best = (threshold, value);
        }
    }
    best
}


fn column() -> impl Strategy<Value = Vec<(Option<f64>, bool, u32)>> {
    let value = prop_oneof![
        4 => (0..6_i32).prop_map(|x| Some(x as f64)),
        1 => Just(None),
    ];
    prop::collection::vec((value, any::<bool>(), 1..64_u32), 3..24)
}


/// Tests for the weak objectives.
#[cfg(test)]
pub mod weak_objective_tests {
    use super::*;

    #[test]
    fn perfect_threshold_under_exponential_loss() {
        let labels = [-1.0, -1.0, 1.0, 1.0];
        let weights = [0.25; 4];
        let loss = ExponentialLoss::new(&labels, &weights);
        let mut objective = loss.weak_objective();

        let sorted = [(0, 1.0), (1, 2.0), (2, 3.0), (3, 10.0)];
        let (threshold, value) = objective.find_best_threshold(&sorted, &[]);
        assert_eq!(threshold, 2.5);
        assert!((value - 1.0).abs() < 1e-12);
    }


    #[test]
    fn squared_loss_thresholds() {
        let residuals = [0.0, 0.0, 4.0, 4.0, 4.0, 4.0];
        let loss = SquaredLoss::new(&residuals);
        let mut objective = loss.weak_objective();

        let sorted = [(0, 1.0), (1, 1.0), (2, 2.0), (3, 3.0), (4, 3.0), (5, 8.0)];
        let (threshold, _) = objective.find_best_threshold(&sorted, &[]);
        assert_eq!(threshold, 1.5);

        // Isolating the outlier leaves no deviation.
        let sorted = [(0, 1.0), (1, 1.0), (2, 2.0), (3, 2.0), (4, 2.0), (5, 8.0)];
        let residuals = [0.0, 0.0, 0.0, 0.0, 0.0, 9.0];
        let loss = SquaredLoss::new(&residuals);
        let (threshold, value) = loss.weak_objective()
            .find_best_threshold(&sorted, &[]);
        assert_eq!(threshold, 5.0);
        assert_eq!(value, 0.0);
    }


    #[test]
    fn single_value_predicts_true() {
        let labels = [1.0, -1.0, 1.0];
        let weights = [0.5, 0.25, 0.25];
        let loss = ExponentialLoss::new(&labels, &weights);
        let mut objective = loss.weak_objective();

        let sorted = [(0, 7.0), (1, 7.0), (2, 7.0)];
        let (threshold, value) = objective.find_best_threshold(&sorted, &[]);
        assert_eq!(threshold, 7.0);

        let everywhere = objective.compute_objective();
        objective.set_raw_predictions(&[(0, RAW_TRUE), (1, RAW_TRUE), (2, RAW_TRUE)]);
        assert_eq!(value, everywhere);
        assert_eq!(value, objective.compute_objective());

        let (threshold, _) = objective.find_best_threshold(&[], &[0, 1, 2]);
        assert_eq!(threshold, 0.0);
    }


    #[test]
    fn flips_ignore_missing_rows() {
        let residuals = [1.0, 2.0, 3.0];
        let loss = SquaredLoss::new(&residuals);
        let mut objective = loss.weak_objective();

        objective.set_raw_predictions(&[(0, RAW_TRUE), (1, RAW_FALSE), (2, RAW_MISSING)]);
        let before = objective.compute_objective();
        objective.flip_prediction(2);
        assert_eq!(objective.compute_objective(), before);

        objective.flip_prediction(0);
        let flipped = objective.compute_objective();
        objective.set_raw_predictions(&[(0, RAW_FALSE), (1, RAW_FALSE), (2, RAW_MISSING)]);
        assert_eq!(objective.compute_objective(), flipped);
    }


    proptest! {
        #[test]
        fn incremental_matches_brute_force_exponential(rows in column()) {
            let values = rows.iter().map(|r| r.0).collect::<Vec<_>>();
            let labels = rows.iter()
                .map(|r| if r.1 { 1.0 } else { -1.0 })
                .collect::<Vec<_>>();
            let weights = rows.iter()
                .map(|r| r.2 as f64 / 64.0)
                .collect::<Vec<_>>();

            let loss = ExponentialLoss::new(&labels, &weights);
            let (sorted, missing) = sort(&values);
            let incremental = loss.weak_objective().find_best_threshold(&sorted, &missing);
            let expected = brute_force(loss.weak_objective().as_mut(), &values);

            if expected.1.is_finite() {
                prop_assert_eq!(incremental.0, expected.0);
                prop_assert!((incremental.1 - expected.1).abs() < 1e-12);
            }
        }


        #[test]
        fn incremental_matches_brute_force_squared(rows in column()) {
            let values = rows.iter().map(|r| r.0).collect::<Vec<_>>();
            let residuals = rows.iter()
                .map(|r| r.2 as f64 - 32.0)
                .collect::<Vec<_>>();

            let loss = SquaredLoss::new(&residuals);
            let (sorted, missing) = sort(&values);
            let incremental = loss.weak_objective().find_best_threshold(&sorted, &missing);
            let expected = brute_force(loss.weak_objective().as_mut(), &values);

            if expected.1.is_finite() {
                prop_assert_eq!(incremental.0, expected.0);
                prop_assert!((incremental.1 - expected.1).abs() < 1e-9);
            }
        }
    }
}
