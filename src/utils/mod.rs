pub mod random;

pub use random::{RandomSource, ScriptedRandomSource, SeededRandomSource, StdRandomSource};
