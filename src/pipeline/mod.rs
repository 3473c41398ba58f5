// Data processing pipeline: per-table processing, changelog bookkeeping, storage

pub mod changelog;
pub mod processing;
pub mod storage;
