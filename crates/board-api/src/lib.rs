pub mod comments;
pub mod error;
pub mod groups;
pub mod images;
pub mod params;
pub mod passwords;
pub mod posts;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, AppStateInner};
