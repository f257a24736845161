//! Results that are either available now or will be available later.
//!
//! Every collaborator the renderer calls (filters, accessors, resolvers and
//! tags) returns an [`Outcome`]. A `Ready` outcome lets the renderer keep
//! going without suspending, while a `Pending` outcome suspends the render
//! until the future resolves.
use crate::log::Error;
use std::{future::Future, pin::Pin};

/// An owned, boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A result that is either available immediately, or after a future resolves.
pub enum Outcome<T> {
    /// The result is available now.
    Ready(Result<T, Error>),
    /// The result will be available when the future resolves.
    Pending(BoxFuture<'static, Result<T, Error>>),
}

impl<T> Outcome<T> {
    /// Create a ready [`Outcome`] from a value.
    #[inline]
    pub fn ready(value: T) -> Self {
        Outcome::Ready(Ok(value))
    }

    /// Create a pending [`Outcome`] from a future.
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice::Outcome;
    ///
    /// let outcome = Outcome::pending(async { Ok(String::from("later")) });
    /// assert!(outcome.is_pending());
    /// ```
    #[inline]
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, Error>> + Send + 'static,
    {
        Outcome::Pending(Box::pin(future))
    }

    /// Return true if the [`Outcome`] must be awaited.
    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(self, Outcome::Pending(_))
    }

    /// Wait for the result.
    pub async fn resolve(self) -> Result<T, Error> {
        match self {
            Outcome::Ready(result) => result,
            Outcome::Pending(future) => future.await,
        }
    }
}

impl<T> From<Result<T, Error>> for Outcome<T> {
    fn from(value: Result<T, Error>) -> Self {
        Outcome::Ready(value)
    }
}

impl<T> std::fmt::Debug for Outcome<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Outcome::Pending(_) => f.write_str("Pending"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Outcome;
    use crate::log::Error;

    #[tokio::test]
    async fn test_resolve_pending() {
        let outcome = Outcome::pending(async { Ok(7) });
        assert!(outcome.is_pending());
        assert_eq!(outcome.resolve().await, Ok(7));
    }

    #[tokio::test]
    async fn test_resolve_ready_error() {
        let outcome: Outcome<i32> = Err(Error::build("nope")).into();
        assert!(!outcome.is_pending());
        assert!(outcome.resolve().await.is_err());
    }
}
