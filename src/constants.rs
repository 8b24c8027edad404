pub const DEFAULT_PAGE_SIZE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const RECIPE_MIN_COOKING_TIME: i32 = 1;
pub const RECIPE_MAX_COOKING_TIME: i32 = 360;
pub const INGREDIENT_MIN_AMOUNT: i32 = 1;

pub const RECIPE_NAME_MAX_LENGTH: usize = 200;
pub const TAG_NAME_MAX_LENGTH: usize = 200;
pub const INGREDIENT_NAME_MAX_LENGTH: usize = 200;

pub const SHOPPING_CART_FILENAME: &str = "shopping_cart.txt";
pub const SHOPPING_CART_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

pub const SESSION_COOKIE: &str = "session";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";

pub const REFERENCE_CACHE_KEY: &str = "reference-cache-key";

// Recipe payloads carry the image inline, so leave room for it.
pub const MAX_BODY_SIZE: u64 = 10 * 1024 * 1024;
