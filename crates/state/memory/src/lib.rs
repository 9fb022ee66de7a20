mod counter;
mod store;

pub use counter::MemoryCounterStore;
pub use store::MemoryDatastore;
