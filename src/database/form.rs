use std::str::FromStr;

use super::error::TypeError;

/// Query string pairs in request order. Keys may repeat (`?tags=a&tags=b`).
pub type QueryData = Vec<(String, String)>;

pub struct Query {
    inner: QueryData,
}

impl Query {
    pub fn from_data(data: QueryData) -> Self {
        Self { inner: data }
    }

    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        serde_urlencoded::from_str::<QueryData>(raw)
            .map(Self::from_data)
            .map_err(|_e| TypeError::new("Malformed query string"))
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.inner
            .iter()
            .filter(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.to_owned())
            .collect()
    }

    pub fn get_number<T>(&self, key: &str) -> Result<Option<T>, TypeError>
    where
        T: FromStr,
    {
        match self.get_str(key) {
            Some(value) if !value.is_empty() => value
                .parse()
                .map(Some)
                .map_err(|_e| TypeError::new("Invalid type conversion")),
            _ => Ok(None),
        }
    }

    /// Reads a boolean flag. `1`/`true` enable it, anything else leaves it off.
    pub fn get_flag(&self, key: &str) -> bool {
        matches!(
            self.get_str(key).map(|v| v.to_ascii_lowercase()).as_deref(),
            Some("1") | Some("true")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_keys_are_kept() {
        let query = Query::parse("tags=breakfast&tags=lunch&author=3").unwrap();
        assert_eq!(query.get_all("tags"), vec!["breakfast", "lunch"]);
        assert_eq!(query.get_number::<i32>("author").unwrap(), Some(3));
    }

    #[test]
    fn percent_encoded_values_are_decoded() {
        let query = Query::parse("name=%D1%81%D0%BE%D0%BB%D1%8C").unwrap();
        assert_eq!(query.get_str("name"), Some("соль"));
    }

    #[test]
    fn flags() {
        let query = Query::parse("is_favorited=1&is_in_shopping_cart=0").unwrap();
        assert!(query.get_flag("is_favorited"));
        assert!(!query.get_flag("is_in_shopping_cart"));
        assert!(Query::parse("is_favorited=TRUE").unwrap().get_flag("is_favorited"));
        assert!(!Query::parse("is_favorited=yes").unwrap().get_flag("is_favorited"));
        assert!(!Query::parse("is_favorited=").unwrap().get_flag("is_favorited"));
    }

    #[test]
    fn bad_numbers_are_type_errors() {
        let query = Query::parse("page=two").unwrap();
        assert!(query.get_number::<i64>("page").is_err());
        assert_eq!(query.get_number::<i64>("limit").unwrap(), None);
    }
}
