//! Reusable widget components.

pub mod detail;
pub mod pagination;
pub mod status;

pub use detail::DetailPanel;
pub use pagination::Pagination;
pub use status::StatusIndicator;
