pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod users;

pub mod postgres;
pub mod publication;

pub use config::Config;
pub use context::RequestContext;
pub use error::{Error, Result};
pub use publication::{Outcome, PublicationReconciler};
pub use users::UserGrantService;
