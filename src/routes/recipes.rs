use warp::{
    http::StatusCode,
    reject::Rejection,
    Filter, Reply,
};

use crate::{
    actions::{self, RecipeFilter, RecipeRelation},
    authentication::permissions::ActionType,
    constants::{MAX_BODY_SIZE, SHOPPING_CART_CONTENT_TYPE, SHOPPING_CART_FILENAME},
    form::Query,
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    pagination::PageContext,
    schema::{Id, RecipePayload},
    shopping_list,
    validation::validate_recipe,
};

use super::{
    context::{with_context, with_query, Context},
    reply::reject,
};

pub fn routes(ctx: Context) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(ctx.key.clone()))
        .and(with_context(ctx.clone()))
        .and_then(download_shopping_cart);

    let list = warp::path!("recipes")
        .and(warp::get())
        .and(with_query())
        .and(with_possible_session(ctx.key.clone()))
        .and(with_context(ctx.clone()))
        .and_then(list_recipes);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(with_session(ctx.key.clone()))
        .and(warp::body::content_length_limit(MAX_BODY_SIZE))
        .and(warp::body::json())
        .and(with_context(ctx.clone()))
        .and_then(create_recipe);

    let retrieve = warp::path!("recipes" / Id)
        .and(warp::get())
        .and(with_possible_session(ctx.key.clone()))
        .and(with_context(ctx.clone()))
        .and_then(retrieve_recipe);

    let update = warp::path!("recipes" / Id)
        .and(warp::patch())
        .and(with_session(ctx.key.clone()))
        .and(warp::body::content_length_limit(MAX_BODY_SIZE))
        .and(warp::body::json())
        .and(with_context(ctx.clone()))
        .and_then(update_recipe);

    let delete = warp::path!("recipes" / Id)
        .and(warp::delete())
        .and(with_session(ctx.key.clone()))
        .and(with_context(ctx.clone()))
        .and_then(delete_recipe);

    let relations = relation_routes(RecipeRelation::Favorite, "favorite", ctx.clone())
        .or(relation_routes(RecipeRelation::ShoppingCart, "shopping_cart", ctx));

    download
        .or(list)
        .or(create)
        .or(retrieve)
        .or(update)
        .or(delete)
        .or(relations)
}

/// `POST` and `DELETE` on `/recipes/{id}/<segment>/`.
fn relation_routes(
    relation: RecipeRelation,
    segment: &'static str,
    ctx: Context,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let path = warp::path("recipes")
        .and(warp::path::param::<Id>())
        .and(warp::path(segment))
        .and(warp::path::end());

    let add = path
        .clone()
        .and(warp::post())
        .and(warp::any().map(move || relation))
        .and(with_session(ctx.key.clone()))
        .and(with_context(ctx.clone()))
        .and_then(add_relation);

    let remove = path
        .and(warp::delete())
        .and(warp::any().map(move || relation))
        .and(with_session(ctx.key.clone()))
        .and(with_context(ctx))
        .and_then(remove_relation);

    add.or(remove)
}

async fn list_recipes(
    query: Query,
    session: Option<SessionData>,
    ctx: Context,
) -> Result<impl Reply, Rejection> {
    let filter = RecipeFilter::from_query(&query).map_err(reject)?;
    let page = ctx.page_request(&query)?;
    let viewer = session.map(|session| session.user_id);

    let PageContext {
        count,
        next,
        previous,
        results,
    } = actions::fetch_recipes(&filter, viewer, page, &ctx.pool)
        .await
        .map_err(reject)?;

    let results = actions::describe_recipes(results, viewer, &ctx.pool)
        .await
        .map_err(reject)?;

    Ok(warp::reply::json(&PageContext {
        count,
        next,
        previous,
        results,
    }))
}

async fn create_recipe(
    session: SessionData,
    payload: RecipePayload,
    ctx: Context,
) -> Result<impl Reply, Rejection> {
    session
        .authenticate(ActionType::CreateRecipes)
        .map_err(reject)?;
    let draft = validate_recipe(payload, &ctx.config.limits, true).map_err(reject)?;

    let recipe = actions::create_recipe(session.user_id, &draft, &ctx.pool)
        .await
        .map_err(reject)?;
    let detail = actions::describe_recipe(recipe, Some(session.user_id), &ctx.pool)
        .await
        .map_err(reject)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&detail),
        StatusCode::CREATED,
    ))
}

async fn retrieve_recipe(
    id: Id,
    session: Option<SessionData>,
    ctx: Context,
) -> Result<impl Reply, Rejection> {
    let viewer = session.map(|session| session.user_id);
    let recipe = actions::get_recipe_required(id, &ctx.pool)
        .await
        .map_err(reject)?;
    let detail = actions::describe_recipe(recipe, viewer, &ctx.pool)
        .await
        .map_err(reject)?;

    Ok(warp::reply::json(&detail))
}

async fn update_recipe(
    id: Id,
    session: SessionData,
    payload: RecipePayload,
    ctx: Context,
) -> Result<impl Reply, Rejection> {
    let recipe = actions::get_recipe_mut(id, &session, &ctx.pool)
        .await
        .map_err(reject)?;
    let draft = validate_recipe(payload, &ctx.config.limits, false).map_err(reject)?;

    let recipe = actions::update_recipe(recipe.id, &draft, &ctx.pool)
        .await
        .map_err(reject)?;
    let detail = actions::describe_recipe(recipe, Some(session.user_id), &ctx.pool)
        .await
        .map_err(reject)?;

    Ok(warp::reply::json(&detail))
}

async fn delete_recipe(id: Id, session: SessionData, ctx: Context) -> Result<impl Reply, Rejection> {
    let recipe = actions::get_recipe_mut(id, &session, &ctx.pool)
        .await
        .map_err(reject)?;
    actions::delete_recipe(recipe.id, &ctx.pool)
        .await
        .map_err(reject)?;

    Ok(StatusCode::NO_CONTENT)
}

async fn add_relation(
    id: Id,
    relation: RecipeRelation,
    session: SessionData,
    ctx: Context,
) -> Result<impl Reply, Rejection> {
    session
        .authenticate(ActionType::ManageOwnRelations)
        .map_err(reject)?;

    let summary = actions::add_relation(relation, session.user_id, id, &ctx.pool)
        .await
        .map_err(reject)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&summary),
        StatusCode::CREATED,
    ))
}

async fn remove_relation(
    id: Id,
    relation: RecipeRelation,
    session: SessionData,
    ctx: Context,
) -> Result<impl Reply, Rejection> {
    session
        .authenticate(ActionType::ManageOwnRelations)
        .map_err(reject)?;

    actions::remove_relation(relation, session.user_id, id, &ctx.pool)
        .await
        .map_err(reject)?;

    Ok(StatusCode::NO_CONTENT)
}

async fn download_shopping_cart(session: SessionData, ctx: Context) -> Result<impl Reply, Rejection> {
    let lines = actions::build_shopping_list(session.user_id, &ctx.pool)
        .await
        .map_err(reject)?;
    log::info!(
        "User {} downloaded a shopping list with {} lines",
        session.user_id,
        lines.len()
    );

    let body = shopping_list::render(&lines);
    let reply = warp::reply::with_header(body, "content-type", SHOPPING_CART_CONTENT_TYPE);

    Ok(warp::reply::with_header(
        reply,
        "content-disposition",
        format!("attachment; filename=\"{SHOPPING_CART_FILENAME}\""),
    ))
}
