//! Database models and CRUD operations.

mod content;
mod course;
mod favorite;
mod profile;
mod rating;
mod revision;
mod structure;
mod topic;

pub use content::{
    Content, CreateContent, ExercisePayload, ImageAttachment, ImagePayload, LatexPayload,
    MarkdownPayload, Payload, PdfPayload, TextPayload, YoutubePayload,
};
pub use course::{Category, Course, CreateCourse, Period};
pub use favorite::Favorite;
pub use profile::Profile;
pub use rating::Rating;
pub use revision::{DbRevisionStore, Revision, RevisionEntity, RevisionStore};
pub use structure::{StructureEntry, StructureEntryRow};
pub use topic::Topic;
