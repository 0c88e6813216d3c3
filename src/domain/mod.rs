pub mod listing;
pub mod note;
pub mod payment;
pub mod post;
pub mod profile;
pub mod workspace;
