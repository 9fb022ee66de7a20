pub mod counter;
pub mod error;
pub mod store;
pub mod testing;

pub use counter::{Bucket, CounterStore};
pub use error::StateError;
pub use store::Datastore;
