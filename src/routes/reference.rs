use warp::{http::StatusCode, reject::Rejection, Filter, Reply};

use crate::{
    actions,
    authentication::permissions::ActionType,
    cache::cache::{cached, invalidate_reference_cache, CacheKeyType},
    constants::MAX_BODY_SIZE,
    form::Query,
    jwt::SessionData,
    middleware::with_session,
    schema::{Id, IngredientPayload, TagPayload},
    validation::{validate_ingredient, validate_tag},
};

use super::{
    context::{with_context, with_query, Context},
    reply::reject,
};

/// Tags and ingredients: readable by anyone, writable by admins.
pub fn routes(ctx: Context) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list_tags = warp::path!("tags")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(list_tags);

    let create_tag = warp::path!("tags")
        .and(warp::post())
        .and(with_session(ctx.key.clone()))
        .and(warp::body::content_length_limit(MAX_BODY_SIZE))
        .and(warp::body::json())
        .and(with_context(ctx.clone()))
        .and_then(create_tag);

    let retrieve_tag = warp::path!("tags" / Id)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(retrieve_tag);

    let list_ingredients = warp::path!("ingredients")
        .and(warp::get())
        .and(with_query())
        .and(with_context(ctx.clone()))
        .and_then(list_ingredients);

    let create_ingredient = warp::path!("ingredients")
        .and(warp::post())
        .and(with_session(ctx.key.clone()))
        .and(warp::body::content_length_limit(MAX_BODY_SIZE))
        .and(warp::body::json())
        .and(with_context(ctx.clone()))
        .and_then(create_ingredient);

    let retrieve_ingredient = warp::path!("ingredients" / Id)
        .and(warp::get())
        .and(with_context(ctx))
        .and_then(retrieve_ingredient);

    list_tags
        .or(create_tag)
        .or(retrieve_tag)
        .or(list_ingredients)
        .or(create_ingredient)
        .or(retrieve_ingredient)
}

async fn list_tags(ctx: Context) -> Result<impl Reply, Rejection> {
    let pool = &ctx.pool;
    let tags = cached(ctx.cache.clone(), CacheKeyType::TagList.new(0), || {
        actions::list_tags(pool)
    })
    .await
    .map_err(reject)?;

    Ok(warp::reply::json(&tags))
}

async fn retrieve_tag(id: Id, ctx: Context) -> Result<impl Reply, Rejection> {
    let pool = &ctx.pool;
    let tag = cached(ctx.cache.clone(), CacheKeyType::Tag.new(id), || {
        actions::get_tag_required(id, pool)
    })
    .await
    .map_err(reject)?;

    Ok(warp::reply::json(&tag))
}

async fn list_ingredients(query: Query, ctx: Context) -> Result<impl Reply, Rejection> {
    let ingredients = actions::search_ingredients(query.get_str("name"), &ctx.pool)
        .await
        .map_err(reject)?;

    Ok(warp::reply::json(&ingredients))
}

async fn retrieve_ingredient(id: Id, ctx: Context) -> Result<impl Reply, Rejection> {
    let pool = &ctx.pool;
    let ingredient = cached(ctx.cache.clone(), CacheKeyType::Ingredient.new(id), || {
        actions::get_ingredient_required(id, pool)
    })
    .await
    .map_err(reject)?;

    Ok(warp::reply::json(&ingredient))
}

async fn create_tag(
    session: SessionData,
    payload: TagPayload,
    ctx: Context,
) -> Result<impl Reply, Rejection> {
    session
        .authenticate(ActionType::ManageReferenceData)
        .map_err(reject)?;
    validate_tag(&payload).map_err(reject)?;

    let tag = actions::create_tag(&payload, &ctx.pool)
        .await
        .map_err(reject)?;
    invalidate(&ctx).await;

    log::info!("Tag {} created by {}", tag.slug, session.username);
    Ok(warp::reply::with_status(
        warp::reply::json(&tag),
        StatusCode::CREATED,
    ))
}

async fn create_ingredient(
    session: SessionData,
    payload: IngredientPayload,
    ctx: Context,
) -> Result<impl Reply, Rejection> {
    session
        .authenticate(ActionType::ManageReferenceData)
        .map_err(reject)?;
    validate_ingredient(&payload).map_err(reject)?;

    let ingredient = actions::create_ingredient(&payload, &ctx.pool)
        .await
        .map_err(reject)?;
    invalidate(&ctx).await;

    log::info!(
        "Ingredient {} ({}) created by {}",
        ingredient.name,
        ingredient.measurement_unit,
        session.username
    );
    Ok(warp::reply::with_status(
        warp::reply::json(&ingredient),
        StatusCode::CREATED,
    ))
}

/// Bumps the cache generation after a reference data write. Failures are only logged.
async fn invalidate(ctx: &Context) {
    if let Some(mut cache) = ctx.cache.clone() {
        if let Err(e) = invalidate_reference_cache(&mut cache).await {
            log::warn!("Could not invalidate reference cache: {:?}", e.info);
        }
    }
}
