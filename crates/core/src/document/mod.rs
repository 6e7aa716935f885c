pub mod id;
pub mod model;
pub mod validate;

pub use id::{CourseId, LectureId, PurchaseId, UserId};
pub use model::{Collection, Document, StoredDocument};
pub use validate::ValidationError;
