//! Per-item transformations applied by [`MapStage`](super::MapStage).

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Trait for per-item work run inside a map stage.
///
/// Implement this for transformations that carry state or need a custom
/// name; closures can be adapted with [`from_fn`] and [`from_async_fn`].
#[async_trait]
pub trait Transform<I, O>: Send + Sync {
    /// Transform one item.
    async fn apply(&self, item: I) -> O;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

pub type BoxedTransform<I, O> = Arc<dyn Transform<I, O>>;

/// Synchronous closure adapter, see [`from_fn`].
pub struct FnTransform<F> {
    name: String,
    f: F,
}

/// Adapt a synchronous closure.
pub fn from_fn<I, O, F>(name: impl Into<String>, f: F) -> FnTransform<F>
where
    F: Fn(I) -> O + Send + Sync,
{
    FnTransform {
        name: name.into(),
        f,
    }
}

#[async_trait]
impl<I, O, F> Transform<I, O> for FnTransform<F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> O + Send + Sync,
{
    async fn apply(&self, item: I) -> O {
        (self.f)(item)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Asynchronous closure adapter, see [`from_async_fn`].
pub struct AsyncFnTransform<F> {
    name: String,
    f: F,
}

/// Adapt a closure returning a future.
pub fn from_async_fn<I, O, F, Fut>(name: impl Into<String>, f: F) -> AsyncFnTransform<F>
where
    F: Fn(I) -> Fut + Send + Sync,
    Fut: Future<Output = O> + Send,
{
    AsyncFnTransform {
        name: name.into(),
        f,
    }
}

#[async_trait]
impl<I, O, F, Fut> Transform<I, O> for AsyncFnTransform<F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync,
    Fut: Future<Output = O> + Send + 'static,
{
    async fn apply(&self, item: I) -> O {
        (self.f)(item).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sync_closure() {
        let double = from_fn("double", |v: i32| v * 2);
        assert_eq!(double.name(), "double");
        assert_eq!(double.apply(21).await, 42);
    }

    #[tokio::test]
    async fn test_async_closure() {
        let delayed = from_async_fn("delayed", |v: u64| async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            v.to_string()
        });
        assert_eq!(delayed.apply(7).await, "7");
    }

    #[tokio::test]
    async fn test_boxed_transform() {
        let boxed: BoxedTransform<&'static str, usize> =
            Arc::new(from_fn("len", |s: &'static str| s.len()));
        assert_eq!(boxed.apply("four").await, 4);
    }
}
