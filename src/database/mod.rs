pub mod id;
pub mod memory;
pub mod mongo;
pub mod store;

pub use id::{IdError, ResourceId};
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use store::{DocumentStore, DocumentStream, StoreError};
