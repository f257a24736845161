use crate::log::Error;
use serde::Serialize;
use serde_json::{to_value, Map, Value};
use std::collections::HashMap;

/// Provides storage for the variables a [`Template`][`crate::Template`] is
/// rendered with.
///
/// A `Store` is only read during a render. Variables created by `assign`,
/// `capture` and loops live in the scope of the render, so the same `Store`
/// can be shared by any number of renders.
#[derive(Debug, Clone, Default)]
pub struct Store {
    data: HashMap<String, Value>,
}

impl Store {
    /// Create a new [`Store`].
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice::Store;
    ///
    /// let store = Store::new();
    /// ```
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a key-value pair into the [`Store`].
    ///
    /// # Errors
    ///
    /// Returns an error if the serialization fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice::Store;
    ///
    /// let mut store = Store::new();
    /// let result = store.insert("name", "taylor");
    ///
    /// assert!(result.is_ok());
    /// ```
    pub fn insert<S, T>(&mut self, key: S, value: T) -> Result<(), Error>
    where
        S: Into<String>,
        T: Serialize,
    {
        let key = key.into();
        let value = to_value(value).map_err(|error| {
            Error::build(format!("value of `{key}` is unserializable")).with_help(error.to_string())
        })?;
        self.data.insert(key, value);

        Ok(())
    }

    /// Inserts a key-value pair into the [`Store`].
    ///
    /// # Panics
    ///
    /// Panics if the serialization fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice::Store;
    ///
    /// let mut store = Store::new();
    /// store.insert_must("name", "taylor");
    /// ```
    #[inline]
    pub fn insert_must<S, T>(&mut self, key: S, value: T)
    where
        S: Into<String>,
        T: Serialize,
    {
        if let Err(error) = self.insert(key, value) {
            panic!("{error}");
        }
    }

    /// Inserts a key-value pair into the [`Store`].
    ///
    /// Returns the `Store`, so additional methods may be chained.
    ///
    /// # Errors
    ///
    /// Returns an error if the serialization fails.
    #[inline]
    pub fn with<S, T>(mut self, key: S, value: T) -> Result<Self, Error>
    where
        S: Into<String>,
        T: Serialize,
    {
        self.insert(key, value)?;

        Ok(self)
    }

    /// Inserts a key-value pair into the [`Store`].
    ///
    /// Returns the `Store`, so additional methods may be chained.
    ///
    /// # Panics
    ///
    /// Panics if the serialization fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice::Store;
    ///
    /// let store = Store::new().with_must("name", "taylor");
    ///
    /// assert_eq!(store.get("name").unwrap(), "taylor");
    /// ```
    #[inline]
    pub fn with_must<S, T>(mut self, key: S, value: T) -> Self
    where
        S: Into<String>,
        T: Serialize,
    {
        self.insert_must(key, value);

        self
    }

    /// Returns a reference to the [`Value`] corresponding to the key.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Iterate over the key-value pairs in the [`Store`], in arbitrary order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    /// Return the contents of the [`Store`] as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.data
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect::<Map<String, Value>>(),
        )
    }
}

impl From<Map<String, Value>> for Store {
    fn from(value: Map<String, Value>) -> Self {
        Self {
            data: value.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Store;
    use pretty_assertions::assert_eq;
    use serde::Serialize;
    use serde_json::json;

    #[test]
    fn test_store_insert() {
        let mut store = Store::new();
        store.insert_must("one", "two");

        assert_eq!(store.get("one"), Some(&json!("two")));
    }

    #[test]
    fn test_store_insert_fluent() {
        let store = Store::new().with_must("three", vec![4, 5]);

        assert_eq!(store.get("three"), Some(&json!([4, 5])));
    }

    #[test]
    fn test_store_insert_struct() {
        #[derive(Serialize)]
        struct User {
            name: &'static str,
            age: u8,
        }

        let store = Store::new()
            .with("user", User {
                name: "taylor",
                age: 30,
            })
            .unwrap();

        assert_eq!(store.to_value(), json!({"user": {"name": "taylor", "age": 30}}));
    }

    #[test]
    fn test_store_from_map() {
        let map = json!({"a": 1}).as_object().cloned().unwrap_or_default();
        let store = Store::from(map);

        assert_eq!(store.get("a"), Some(&json!(1)));
    }
}
