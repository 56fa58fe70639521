pub mod config;
pub mod deserializers;
pub mod error;
pub mod legacy;
pub mod loader;
pub mod models;
pub mod normalize;
pub mod presentation;
pub mod report;
pub mod store;
pub mod view;

pub use loader::{EquipmentLoader, LoadError, LoaderSettings};
pub use models::{AssignedItem, EquipmentRecord, PlayerRef};
pub use normalize::{NormalizeOptions, normalize, normalize_with};
pub use presentation::{EquipmentSheet, ItemCard, ReturnStatus};
pub use store::{Document, DocumentStore, MemoryStore, StoreError, SurrealStore};
pub use view::{EmptyReason, EquipmentView, FetchOutcome, ViewState, ViewStatus};
