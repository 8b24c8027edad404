use std::{convert::Infallible, sync::Arc};

use redis::aio::MultiplexedConnection;
use sqlx::{Pool, Postgres};
use warp::{reject::Rejection, Filter};

use crate::{
    config::Config, error::ConfigError, form::Query, jwt::SessionKey, pagination::PageRequest,
};

use super::reply::reject;

/// Shared handles every request handler needs.
#[derive(Clone)]
pub struct Context {
    pub pool: Pool<Postgres>,
    pub cache: Option<MultiplexedConnection>,
    pub config: Arc<Config>,
    pub key: SessionKey,
}

impl Context {
    pub fn new(
        pool: Pool<Postgres>,
        cache: Option<MultiplexedConnection>,
        config: Config,
    ) -> Result<Self, ConfigError> {
        let key = SessionKey::new(&config.jwt_secret)?;

        Ok(Self {
            pool,
            cache,
            config: Arc::new(config),
            key,
        })
    }

    /// `?page=&limit=` with the configured default page size.
    pub fn page_request(&self, query: &Query) -> Result<PageRequest, Rejection> {
        Ok(PageRequest::new(
            query.get_number("page").map_err(reject)?,
            query.get_number("limit").map_err(reject)?,
            self.config.page_size,
        ))
    }
}

pub fn with_context(ctx: Context) -> impl Filter<Extract = (Context,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

/// The query string, empty when the request has none.
pub fn with_query() -> impl Filter<Extract = (Query,), Error = Rejection> + Clone {
    warp::query::raw()
        .or(warp::any().map(String::new))
        .unify()
        .and_then(|raw: String| async move { Query::parse(&raw).map_err(reject) })
}
