use std::{env, fmt::Display, net::SocketAddr, str::FromStr};

use crate::{
    constants::{
        DEFAULT_LISTEN_ADDR, DEFAULT_PAGE_SIZE, INGREDIENT_MIN_AMOUNT, RECIPE_MAX_COOKING_TIME,
        RECIPE_MIN_COOKING_TIME,
    },
    error::ConfigError,
};

/// Bounds applied to recipe payloads before anything reaches the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipeLimits {
    pub min_cooking_time: i32,
    pub max_cooking_time: i32,
    pub min_amount: i32,
}

impl Default for RecipeLimits {
    fn default() -> Self {
        Self {
            min_cooking_time: RECIPE_MIN_COOKING_TIME,
            max_cooking_time: RECIPE_MAX_COOKING_TIME,
            min_amount: INGREDIENT_MIN_AMOUNT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub listen_addr: SocketAddr,
    pub page_size: i64,
    pub limits: RecipeLimits,
}

impl Config {
    /// Reads the process environment. `.env` is expected to be loaded by the caller.
    pub fn load() -> Result<Self, ConfigError> {
        let limits = RecipeLimits {
            min_cooking_time: try_load("RECIPE_MIN_COOKING_TIME", RECIPE_MIN_COOKING_TIME)?,
            max_cooking_time: try_load("RECIPE_MAX_COOKING_TIME", RECIPE_MAX_COOKING_TIME)?,
            min_amount: try_load("INGREDIENT_MIN_AMOUNT", INGREDIENT_MIN_AMOUNT)?,
        };

        if limits.min_cooking_time > limits.max_cooking_time {
            return Err(ConfigError::new(format!(
                "RECIPE_MIN_COOKING_TIME ({}) is greater than RECIPE_MAX_COOKING_TIME ({})",
                limits.min_cooking_time, limits.max_cooking_time
            )));
        }

        let page_size: i64 = try_load("PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if page_size <= 0 {
            return Err(ConfigError::new("PAGE_SIZE must be positive".to_owned()));
        }

        Ok(Self {
            database_url: require("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            jwt_secret: require("JWT_SECRET")?,
            listen_addr: try_load(
                "LISTEN_ADDR",
                DEFAULT_LISTEN_ADDR
                    .parse::<SocketAddr>()
                    .map_err(|e| ConfigError::new(format!("{e}")))?,
            )?,
            page_size,
            limits,
        })
    }
}

fn require(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::new(format!("{key} must be set")))
}

fn try_load<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|e| ConfigError::new(format!("Invalid {key} value: {e}"))),
        Err(_) => {
            log::info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_match_constants() {
        let limits = RecipeLimits::default();
        assert_eq!(limits.min_cooking_time, 1);
        assert_eq!(limits.max_cooking_time, 360);
        assert_eq!(limits.min_amount, 1);
    }

    #[test]
    fn try_load_falls_back_to_default() {
        let value: i64 = try_load("FOODGRAM_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
