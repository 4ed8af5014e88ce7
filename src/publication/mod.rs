pub mod reconciler;
pub mod repository;
pub mod sql;
pub mod types;

pub use reconciler::{Outcome, PublicationReconciler};
pub use repository::PublicationRepository;
pub use types::{Publication, PublicationRequest, Table};
