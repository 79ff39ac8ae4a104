use crate::error::{RemoteError, RemoteResult, SyncError, SyncResult};
use crate::scheduler::TaskPurpose;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Per-run state handed to every stage.
///
/// Carries the cancellation token and the remote call bound. Data flows
/// between stages only through their typed inputs and outputs.
#[derive(Debug)]
pub struct RunContext {
    entity: &'static str,
    purpose: TaskPurpose,
    token: CancellationToken,
    remote_timeout: Duration,
    current_stage: Mutex<&'static str>,
}

impl RunContext {
    /// Creates a context for one run.
    pub fn new(
        entity: &'static str,
        purpose: TaskPurpose,
        token: CancellationToken,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            entity,
            purpose,
            token,
            remote_timeout,
            current_stage: Mutex::new("start"),
        }
    }

    /// Entity type of the run.
    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// Purpose of the run.
    pub fn purpose(&self) -> TaskPurpose {
        self.purpose
    }

    /// The run's cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Returns true once the run has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Name of the stage currently running, or last entered.
    pub fn current_stage(&self) -> &'static str {
        *self.current_stage.lock()
    }

    /// Marks `stage` as entered.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Cancelled`] if the run is already cancelled; the
    /// stage must then not run.
    pub fn enter(&self, stage: &'static str) -> SyncResult<()> {
        *self.current_stage.lock() = stage;
        if self.is_cancelled() {
            return Err(SyncError::Cancelled { stage });
        }
        debug!(entity = self.entity, purpose = %self.purpose, stage, "entering stage");
        Ok(())
    }

    /// Awaits a remote call, bounded by the run's remote timeout.
    pub async fn remote<T, F>(&self, call: F) -> RemoteResult<T>
    where
        F: Future<Output = RemoteResult<T>> + Send,
    {
        match tokio::time::timeout(self.remote_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout(self.remote_timeout)),
        }
    }
}

/// One step of a pipeline run.
///
/// A stage consumes its predecessor's output by value and produces the
/// input of its successor.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Data received from the previous stage.
    type Input: Send + 'static;
    /// Data handed to the next stage.
    type Output: Send + 'static;

    /// Stable stage name used in logs and outcomes.
    fn name(&self) -> &'static str;

    /// Names of the leaf stages in execution order.
    fn stage_names(&self) -> Vec<&'static str> {
        vec![self.name()]
    }

    /// Runs the stage.
    async fn run(&self, input: Self::Input, ctx: &RunContext) -> SyncResult<Self::Output>;
}

/// Two stages run back to back.
#[derive(Debug)]
pub struct Chain<A, B> {
    first: A,
    second: B,
}

#[async_trait]
impl<A, B> Stage for Chain<A, B>
where
    A: Stage,
    B: Stage<Input = A::Output>,
{
    type Input = A::Input;
    type Output = B::Output;

    fn name(&self) -> &'static str {
        self.second.name()
    }

    fn stage_names(&self) -> Vec<&'static str> {
        let mut names = self.first.stage_names();
        names.extend(self.second.stage_names());
        names
    }

    async fn run(&self, input: Self::Input, ctx: &RunContext) -> SyncResult<Self::Output> {
        let intermediate = self.first.run(input, ctx).await?;
        ctx.enter(self.second.name())?;
        self.second.run(intermediate, ctx).await
    }
}

/// Chaining for stages.
pub trait StageExt: Stage + Sized {
    /// Runs `next` on this stage's output.
    ///
    /// Chains are built left to right, so the right side is always a leaf.
    fn then<B>(self, next: B) -> Chain<Self, B>
    where
        B: Stage<Input = Self::Output>,
    {
        Chain {
            first: self,
            second: next,
        }
    }
}

impl<S: Stage> StageExt for S {}

/// Zero-I/O stage that forwards its input unchanged.
pub struct Bridge<T>(PhantomData<fn() -> T>);

impl<T> Bridge<T> {
    /// Creates a bridge.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Bridge<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Bridge<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Bridge")
    }
}

#[async_trait]
impl<T: Send + 'static> Stage for Bridge<T> {
    type Input = T;
    type Output = T;

    fn name(&self) -> &'static str {
        "bridge"
    }

    async fn run(&self, input: T, _ctx: &RunContext) -> SyncResult<T> {
        Ok(input)
    }
}
