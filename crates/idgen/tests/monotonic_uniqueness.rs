//! Property: no monotonic-integer id is ever generated twice, even once
//! deletions start tombstoning values (spec §8 "no generated ID is ever
//! equal to any previously generated ID, including those in the
//! tombstone set").

use std::collections::HashSet;
use syncopate_idgen::monotonic::MonotonicGenerator;

proptest::proptest! {
    #[test]
    fn generated_ids_never_repeat(tombstone_every in 2usize..7, draws in 20usize..200) {
        let gen = MonotonicGenerator::new();
        let mut seen = HashSet::new();
        for i in 0..draws {
            let id = gen.next();
            proptest::prop_assert!(seen.insert(id), "id {id} generated twice");
            if i % tombstone_every == 0 {
                gen.tombstone(id + 1);
            }
        }
    }
}
