use std::convert::Infallible;

use warp::{Filter, Reply};

use super::{context::Context, recipes, reference, reply::handle_rejection, users};

/// Every endpoint, mounted under `/api`.
pub fn api(ctx: Context) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    warp::path("api")
        .and(
            recipes::routes(ctx.clone())
                .or(reference::routes(ctx.clone()))
                .or(users::routes(ctx)),
        )
        .recover(handle_rejection)
        .with(warp::log("foodgram::api"))
}
