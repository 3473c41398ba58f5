pub mod in_memory;

pub use in_memory::{InMemoryChangelog, InMemoryCleansedStore, InMemoryExporter, InMemoryRawStore, MemorySink};
