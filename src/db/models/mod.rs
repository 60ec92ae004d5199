pub mod intent;
pub mod photo;
pub mod stored;

pub use intent::IntentRef;
pub use photo::PhotoRecord;
pub use stored::{StoreKind, StoredValue};
