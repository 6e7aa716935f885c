pub mod course;
pub mod lecture;
pub mod purchase;
pub mod user;
pub mod views;

pub use course::{mean_rating, Course, CourseInfo, CourseLevel, Review};
pub use lecture::Lecture;
pub use purchase::{Purchase, PurchaseStatus};
pub use user::{PublicUser, Role, User};
