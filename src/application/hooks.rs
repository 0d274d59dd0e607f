use async_trait::async_trait;

/// Side effect run inside a unit of work right after an entity is created or
/// updated. Returning an error rolls the whole unit of work back.
#[async_trait]
pub trait AfterCreate<T: Sync>: Send + Sync {
    async fn after_create(&self, value: &T) -> anyhow::Result<()>;
}

#[async_trait]
impl<T, F> AfterCreate<T> for F
where
    T: Sync,
    F: Fn(&T) -> anyhow::Result<()> + Send + Sync,
{
    async fn after_create(&self, value: &T) -> anyhow::Result<()> {
        self(value)
    }
}

/// Hook that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

#[async_trait]
impl<T: Sync> AfterCreate<T> for NoopHook {
    async fn after_create(&self, _value: &T) -> anyhow::Result<()> {
        Ok(())
    }
}
