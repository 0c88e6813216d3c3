pub mod auth;
pub mod engagement;
pub mod feed;
pub mod marketplace;
pub mod notes;
pub mod payments;
pub mod posts;
pub mod profile_view;
pub mod profiles;
pub mod social;
pub mod view_store;
pub mod workspace;
