mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod import;
    pub mod pagination;
    pub mod schema;
    pub mod shopping_list;
    pub mod validation;
}
mod authentication {
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod config;
mod constants;

mod cache {
    pub mod cache;
}

mod routes {
    pub mod api;
    pub mod context;
    pub mod recipes;
    pub mod reference;
    pub mod reply;
    pub mod users;
}

pub use authentication::*;
pub use cache::cache::*;
pub use config::*;
pub use constants::*;
pub use database::*;
pub use routes::{api::api, context::Context, reply::Failure};
