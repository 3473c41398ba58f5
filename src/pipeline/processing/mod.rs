// Pipeline processing: novelty filtering, cleaning, merging and pre-commit checks

pub mod integrity;
pub mod merge;
pub mod normalize;
pub mod novelty;
