use std::future::Future;

use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{Deserialize, Serialize};

use crate::{constants::REFERENCE_CACHE_KEY, error::CacheError};

// Caching - keys

#[derive(Serialize, Clone, Debug)]
pub struct CacheKey<T: ToString + Serialize> {
    _value: T,
    _type: CacheKeyType,
}

impl<T: ToString + Serialize> CacheKey<T> {
    pub fn from(r#type: CacheKeyType, key: T) -> Self {
        Self {
            _value: key,
            _type: r#type,
        }
    }

    pub fn to_string(&self) -> String {
        self.into()
    }
}

impl<T: ToString + Serialize> Into<String> for &CacheKey<T> {
    fn into(self) -> String {
        match self._type {
            CacheKeyType::Tag => format!("tag-{}", self._value.to_string()),
            CacheKeyType::TagList => String::from("tag-list"),
            CacheKeyType::Ingredient => format!("ingredient-{}", self._value.to_string()),
        }
    }
}

/// Reference data is the only thing cached; recipes and relations always hit the database.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum CacheKeyType {
    Tag,
    TagList,
    Ingredient,
}

impl CacheKeyType {
    pub fn new<T: ToString + Serialize>(self, key: T) -> CacheKey<T> {
        CacheKey::from(self, key)
    }
}

// Cache - wrappers

#[derive(Serialize, Deserialize, FromRedisValue, ToRedisArgs, Clone)]
pub struct RedisValue<T: serde::Serialize + Send + Sync + Clone> {
    pub value: T,
    _bind: Option<i64>,
}

impl<T: serde::Serialize + Send + Sync + Clone + for<'a> Deserialize<'a>> RedisValue<T> {
    /// Returns the cached value when it was written under the current
    /// reference generation, otherwise runs `callback` and stores its result.
    pub async fn get_or<F, Fut, K>(
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<T, potion::Error>
    where
        K: ToString + Serialize + Clone + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, potion::Error>>,
    {
        let bind = get_reference_generation(cache).await?;

        let value = get_cache_value::<String, RedisValue<T>>((&key).into(), cache)
            .await
            .unwrap_or_else(|_| {
                let mut c = cache.clone();
                let k = key.to_string();
                tokio::spawn(async move {
                    log::error!("> Failed to deserialize cached value. Deleting {}", &k);
                    if let Err(e) = delete_cache_value(k, &mut c).await {
                        log::error!("> Failed to delete cached value! {:?}", e.info);
                    }
                });
                None
            });

        match value {
            Some(value) if value._bind == bind => {
                log::trace!("> Found {:?}", key.to_string());
                Ok(value.value)
            }
            _ => {
                log::trace!("> Fetching {:?}", key.to_string());
                let value = callback().await?;

                let stored = RedisValue {
                    value: value.clone(),
                    _bind: bind,
                };
                if let Err(e) =
                    set_cache_value::<String, RedisValue<T>>((&key).into(), stored, cache).await
                {
                    log::error!("> Failed to store cached value: {:?}", e.info);
                }

                Ok(value)
            }
        }
    }
}

/// Opens a redis connection, or `None` when redis is unreachable so callers run uncached.
pub async fn connect_cache(url: &str) -> Option<MultiplexedConnection> {
    let client = match redis::Client::open(url) {
        Ok(client) => client,
        Err(e) => {
            log::warn!("Invalid REDIS_URL, running without cache: {e}");
            return None;
        }
    };

    match client.get_multiplexed_async_connection().await {
        Ok(conn) => Some(conn),
        Err(e) => {
            log::warn!("Could not connect to redis, running without cache: {e}");
            None
        }
    }
}

/// Bumps the reference generation, invalidating every cached tag and ingredient.
pub async fn invalidate_reference_cache(
    cache: &mut MultiplexedConnection,
) -> Result<(), potion::Error> {
    let _: i64 = cache
        .incr(REFERENCE_CACHE_KEY, 1)
        .await
        .map_err(CacheError::from)?;

    Ok(())
}

async fn get_reference_generation(
    cache: &mut MultiplexedConnection,
) -> Result<Option<i64>, potion::Error> {
    get_cache_value::<&str, i64>(REFERENCE_CACHE_KEY, cache).await
}

/// Reads through the cache when one is configured.
pub async fn cached<T, K, F, Fut>(
    cache: Option<MultiplexedConnection>,
    key: CacheKey<K>,
    callback: F,
) -> Result<T, potion::Error>
where
    T: Serialize + Send + Sync + Clone + for<'a> Deserialize<'a>,
    K: ToString + Serialize + Clone + Send + Sync,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, potion::Error>>,
{
    match cache {
        Some(mut cache) => RedisValue::get_or(key, &mut cache, callback).await,
        None => callback().await,
    }
}

// Cache - raw handlers

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), potion::Error> {
    let _: () = cache
        .set(key, value)
        .await
        .map_err(CacheError::from)?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), potion::Error> {
    let _: () = cache
        .del(key)
        .await
        .map_err(CacheError::from)?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, potion::Error> {
    let value: Option<V> = cache
        .get(key)
        .await
        .map_err(CacheError::from)?;

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names() {
        assert_eq!(CacheKeyType::Tag.new(4).to_string(), "tag-4");
        assert_eq!(CacheKeyType::Ingredient.new(12).to_string(), "ingredient-12");
        assert_eq!(CacheKeyType::TagList.new("all").to_string(), "tag-list");
    }
}
