use proptest::prelude::*;

/// Completion policies exercised by the chunk engine properties
#[derive(Debug, Clone)]
pub enum PolicyChoice {
    Simple(usize),
    Random { max: usize, seed: u64 },
    Composite(usize),
}

pub fn items_strategy() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(any::<u32>(), 0..300)
}

pub fn policy_strategy() -> impl Strategy<Value = PolicyChoice> {
    prop_oneof![
        (1usize..50).prop_map(PolicyChoice::Simple),
        (1usize..30, any::<u64>()).prop_map(|(max, seed)| PolicyChoice::Random { max, seed }),
        (1usize..50).prop_map(PolicyChoice::Composite),
    ]
}
