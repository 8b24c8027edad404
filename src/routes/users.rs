use warp::{http::StatusCode, reject::Rejection, Filter, Reply};

use crate::{
    actions,
    authentication::permissions::ActionType,
    error::TypeError,
    form::Query,
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    schema::Id,
};

use super::{
    context::{with_context, with_query, Context},
    reply::reject,
};

pub fn routes(ctx: Context) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_session(ctx.key.clone()))
        .and(with_context(ctx.clone()))
        .and_then(me);

    let subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(with_query())
        .and(with_session(ctx.key.clone()))
        .and(with_context(ctx.clone()))
        .and_then(subscriptions);

    let list = warp::path!("users")
        .and(warp::get())
        .and(with_query())
        .and(with_possible_session(ctx.key.clone()))
        .and(with_context(ctx.clone()))
        .and_then(list_users);

    let retrieve = warp::path!("users" / Id)
        .and(warp::get())
        .and(with_possible_session(ctx.key.clone()))
        .and(with_context(ctx.clone()))
        .and_then(retrieve_user);

    let subscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::post())
        .and(with_query())
        .and(with_session(ctx.key.clone()))
        .and(with_context(ctx.clone()))
        .and_then(subscribe);

    let unsubscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::delete())
        .and(with_session(ctx.key.clone()))
        .and(with_context(ctx))
        .and_then(unsubscribe);

    me.or(subscriptions)
        .or(list)
        .or(retrieve)
        .or(subscribe)
        .or(unsubscribe)
}

fn recipes_limit(query: &Query) -> Result<Option<i64>, TypeError> {
    query.get_number("recipes_limit")
}

async fn list_users(
    query: Query,
    session: Option<SessionData>,
    ctx: Context,
) -> Result<impl Reply, Rejection> {
    let page = ctx.page_request(&query)?;
    let viewer = session.map(|session| session.user_id);

    let profiles = actions::fetch_profiles(page, viewer, &ctx.pool)
        .await
        .map_err(reject)?;

    Ok(warp::reply::json(&profiles))
}

async fn retrieve_user(
    id: Id,
    session: Option<SessionData>,
    ctx: Context,
) -> Result<impl Reply, Rejection> {
    let user = actions::get_user_required(&ctx.pool, id)
        .await
        .map_err(reject)?;
    let profile = actions::get_profile(user, session.map(|s| s.user_id), &ctx.pool)
        .await
        .map_err(reject)?;

    Ok(warp::reply::json(&profile))
}

async fn me(session: SessionData, ctx: Context) -> Result<impl Reply, Rejection> {
    let user = actions::get_user_required(&ctx.pool, session.user_id)
        .await
        .map_err(reject)?;
    let profile = actions::get_profile(user, Some(session.user_id), &ctx.pool)
        .await
        .map_err(reject)?;

    Ok(warp::reply::json(&profile))
}

async fn subscriptions(
    query: Query,
    session: SessionData,
    ctx: Context,
) -> Result<impl Reply, Rejection> {
    let page = ctx.page_request(&query)?;
    let limit = recipes_limit(&query).map_err(reject)?;

    let subscriptions = actions::fetch_subscriptions(session.user_id, page, limit, &ctx.pool)
        .await
        .map_err(reject)?;

    Ok(warp::reply::json(&subscriptions))
}

async fn subscribe(
    id: Id,
    query: Query,
    session: SessionData,
    ctx: Context,
) -> Result<impl Reply, Rejection> {
    session
        .authenticate(ActionType::ManageOwnRelations)
        .map_err(reject)?;
    let limit = recipes_limit(&query).map_err(reject)?;

    let subscription = actions::subscribe(session.user_id, id, limit, &ctx.pool)
        .await
        .map_err(reject)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&subscription),
        StatusCode::CREATED,
    ))
}

async fn unsubscribe(id: Id, session: SessionData, ctx: Context) -> Result<impl Reply, Rejection> {
    session
        .authenticate(ActionType::ManageOwnRelations)
        .map_err(reject)?;

    actions::unsubscribe(session.user_id, id, &ctx.pool)
        .await
        .map_err(reject)?;

    Ok(StatusCode::NO_CONTENT)
}
