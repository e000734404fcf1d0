//! Editor session for one manga page.
//!
//! [`store::AnnotationStore`] owns the page's annotations and writes every
//! change through a persistence collaborator. [`sequence::SequenceManager`]
//! (reached through `AnnotationStore::sequence`) applies reading-order
//! operations, [`box_edit::BoxEditSession`] turns pointer drags into box
//! commits, [`recognize`] runs OCR or tagging over a single box and
//! [`batch`] runs them across a page.

pub mod batch;
pub mod box_edit;
pub mod error;
pub mod memory;
pub mod notify;
pub mod recognize;
pub mod sequence;
pub mod store;

pub use error::EditorError;
pub use memory::MemoryRepository;
pub use notify::{Notification, NotificationBus, NotifyLevel};
pub use store::{AnnotationStore, NewAnnotation};
