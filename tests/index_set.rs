use proptest::prelude::*;
use rand::prelude::*;

use luape::prelude::*;


fn source() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::btree_set(0..300_usize, 1..120)
        .prop_map(|set| set.into_iter().collect())
}


/// Tests for chunked index sets.
#[cfg(test)]
pub mod index_set_tests {
    use super::*;

    #[test]
    fn regions_of_overlapping_ranges() {
        let first = IndexSet::range(0, 10);
        let second = IndexSet::range(5, 15);
        let regions = IndexSet::intersection_regions(&first, &second);

        let spans = regions.iter()
            .map(|r| (r.begin, r.end))
            .collect::<Vec<_>>();
        assert_eq!(spans, vec![(0, 5), (5, 10), (10, 15)]);
        assert!(regions[0].is_first_only());
        assert!(regions[1].is_both());
        assert!(regions[2].is_second_only());
        assert_eq!(regions[1].first_count(), 5);
        assert_eq!(regions[1].second_count(), 5);
    }


    #[test]
    fn contiguous_expansion_grows_blocks() {
        let source = IndexSet::range(0, 100);
        let mut rng = StdRng::seed_from_u64(7);
        let mut set = IndexSet::new();
        set.randomly_expand_using_source(&mut rng, 10, &source, true);
        assert_eq!(set.to_vec(), (0..10).collect::<Vec<_>>());

        set.randomly_expand_using_source(&mut rng, 40, &source, true);
        assert_eq!(set.to_vec(), (0..40).collect::<Vec<_>>());
        assert_eq!(set.chunks().len(), 1);
    }


    #[test]
    fn expansion_to_the_full_source() {
        let source = [1, 3, 4, 50, 51, 52, 200].into_iter().collect::<IndexSet>();
        let mut rng = StdRng::seed_from_u64(11);
        let mut set = [3].into_iter().collect::<IndexSet>();
        set.randomly_expand_using_source(&mut rng, source.len(), &source, false);
        assert_eq!(set.to_vec(), source.to_vec());
    }


    proptest! {
        #[test]
        fn expansion_stays_inside_the_source(
            rows in source(),
            keep in 0.0..1.0_f64,
            grow in 0.0..=1.0_f64,
            contiguous in any::<bool>(),
            seed in any::<u64>(),
        ) {
            let source = rows.iter().copied().collect::<IndexSet>();
            let initial = rows.iter()
                .copied()
                .take((rows.len() as f64 * keep) as usize)
                .collect::<IndexSet>();
            let target = initial.len()
                + ((source.len() - initial.len()) as f64 * grow) as usize;

            let mut rng = StdRng::seed_from_u64(seed);
            let mut set = initial.clone();
            set.randomly_expand_using_source(&mut rng, target, &source, contiguous);

            let values = set.to_vec();
            prop_assert_eq!(set.len(), target);
            prop_assert_eq!(values.len(), target);
            prop_assert!(values.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(values.iter().all(|i| source.contains(*i)));
            prop_assert!(initial.iter().all(|i| set.contains(i)));
        }
    }
}
