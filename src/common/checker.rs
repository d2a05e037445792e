//! This file defines some functions that checks some pre-conditions
//! E.g., learning rates, temperatures.


/// Check the learning rate
#[inline(always)]
pub(crate) fn check_learning_rate(rate: f64) {
    assert!(
        rate > 0.0 && rate <= 1.0,
        "learning rate must lie in (0, 1], got {rate}"
    );
}


/// Check the temperature of a Boltzmann policy
#[inline(always)]
pub(crate) fn check_temperature(temperature: f64) {
    assert!(
        temperature > 0.0,
        "temperature must be positive, got {temperature}"
    );
}


/// Check that every group size is positive and sizes cover `n_rows`.
#[inline(always)]
pub(crate) fn check_groups(groups: &[usize], n_rows: usize) {
    assert!(groups.iter().all(|&g| g > 0), "empty ranking group");
    let total = groups.iter().sum::<usize>();
    assert_eq!(total, n_rows, "groups cover {total} rows out of {n_rows}");
}

