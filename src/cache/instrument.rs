//! Call instrumentation
//!
//! An `Operation` is a named async capability. `CountCalls` and `RecordHistory`
//! wrap any operation and write their bookkeeping to the same store the
//! operation uses:
//!
//! - `CountCalls` increments the counter `<name>` before delegating, so failed
//!   attempts are counted too.
//! - `RecordHistory` appends the rendered input to `<name>:inputs` before
//!   delegating and the rendered output to `<name>:outputs` after a successful
//!   call. The two appends are not atomic.
//!
//! `Cache::new` composes them as `CountCalls(RecordHistory(op))`.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::value::StoredValue;
use super::CacheError;
use crate::store::{read_counter, KeyValueStore, StoreError};

/// A named capability that can be wrapped by instrumentation
#[async_trait]
pub trait Operation<I, O>: Send + Sync
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Stable qualified identifier, used as the store key prefix (e.g. `Cache.store`)
    fn name(&self) -> &str;

    async fn invoke(&self, input: I) -> Result<O, CacheError>;
}

/// How an operation's input is rendered into call history
pub trait CallArgs {
    fn render_args(&self) -> String;
}

impl CallArgs for StoredValue {
    fn render_args(&self) -> String {
        self.to_string()
    }
}

impl CallArgs for String {
    fn render_args(&self) -> String {
        format!("{self:?}")
    }
}

/// Key of the input history list for `name`
pub fn inputs_key(name: &str) -> String {
    format!("{name}:inputs")
}

/// Key of the output history list for `name`
pub fn outputs_key(name: &str) -> String {
    format!("{name}:outputs")
}

/// Counts every invocation of the wrapped operation
pub struct CountCalls<Op> {
    inner: Op,
    store: Arc<dyn KeyValueStore>,
}

impl<Op> CountCalls<Op> {
    pub fn new(inner: Op, store: Arc<dyn KeyValueStore>) -> Self {
        Self { inner, store }
    }
}

#[async_trait]
impl<Op, I, O> Operation<I, O> for CountCalls<Op>
where
    Op: Operation<I, O>,
    I: Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn invoke(&self, input: I) -> Result<O, CacheError> {
        let calls = self.store.incr(self.name()).await?;
        log::debug!("{} call #{}", self.name(), calls);
        self.inner.invoke(input).await
    }
}

/// Records the input and output of every invocation of the wrapped operation
pub struct RecordHistory<Op> {
    inner: Op,
    store: Arc<dyn KeyValueStore>,
}

impl<Op> RecordHistory<Op> {
    pub fn new(inner: Op, store: Arc<dyn KeyValueStore>) -> Self {
        Self { inner, store }
    }
}

#[async_trait]
impl<Op, I, O> Operation<I, O> for RecordHistory<Op>
where
    Op: Operation<I, O>,
    I: CallArgs + Send + 'static,
    O: fmt::Display + Send + 'static,
{
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn invoke(&self, input: I) -> Result<O, CacheError> {
        let name = self.name();
        self.store
            .rpush(&inputs_key(name), input.render_args().as_bytes())
            .await?;
        let output = self.inner.invoke(input).await?;
        self.store
            .rpush(&outputs_key(name), output.to_string().as_bytes())
            .await?;
        Ok(output)
    }
}

/// One recorded call, as read back from history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub args: String,
    pub output: String,
}

/// Snapshot of an operation's counter and history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallReplay {
    pub name: String,
    /// Value of the call counter, 0 if it was never incremented
    pub count: i64,
    /// Calls pairing the i-th input with the i-th output
    pub calls: Vec<RecordedCall>,
}

impl CallReplay {
    /// Reads the counter and history of `name`
    ///
    /// If the history lists differ in length, only complete pairs are returned.
    /// A counter holding anything but an integer is `StoreError::NotAnInteger`.
    pub async fn load<S>(store: &S, name: &str) -> Result<Self, StoreError>
    where
        S: KeyValueStore + ?Sized,
    {
        let count = read_counter(store, name).await?;
        let inputs = store.lrange(&inputs_key(name), 0, -1).await?;
        let outputs = store.lrange(&outputs_key(name), 0, -1).await?;

        let calls = inputs
            .iter()
            .zip(outputs.iter())
            .map(|(args, output)| RecordedCall {
                args: String::from_utf8_lossy(args).into_owned(),
                output: String::from_utf8_lossy(output).into_owned(),
            })
            .collect();

        Ok(Self {
            name: name.to_string(),
            count,
            calls,
        })
    }
}

impl fmt::Display for CallReplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} was called {} times:", self.name, self.count)?;
        for call in &self.calls {
            writeln!(f, "{}({}) -> {}", self.name, call.args, call.output)?;
        }
        Ok(())
    }
}

/// Prints the call history of `name` to stdout
pub async fn replay<S>(store: &S, name: &str) -> Result<CallReplay, StoreError>
where
    S: KeyValueStore + ?Sized,
{
    let replay = CallReplay::load(store, name).await?;
    print!("{replay}");
    Ok(replay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    /// Echoes its input, optionally failing
    struct Echo {
        fail: bool,
    }

    #[async_trait]
    impl Operation<String, String> for Echo {
        fn name(&self) -> &str {
            "Test.echo"
        }

        async fn invoke(&self, input: String) -> Result<String, CacheError> {
            if self.fail {
                return Err(StoreError::WrongType { key: input }.into());
            }
            Ok(input.to_uppercase())
        }
    }

    fn memory() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new())
    }

    #[tokio::test]
    async fn test_count_calls_increments_per_invocation() {
        let store = memory();
        let op = CountCalls::new(Echo { fail: false }, store.clone());

        for _ in 0..3 {
            op.invoke("x".to_string()).await.unwrap();
        }

        assert_eq!(store.get("Test.echo").await.unwrap(), Some(b"3".to_vec()));
    }

    #[tokio::test]
    async fn test_count_calls_counts_failed_attempts() {
        let store = memory();
        let op = CountCalls::new(Echo { fail: true }, store.clone());

        assert!(op.invoke("x".to_string()).await.is_err());
        assert_eq!(store.get("Test.echo").await.unwrap(), Some(b"1".to_vec()));
    }

    #[tokio::test]
    async fn test_record_history_appends_inputs_and_outputs() {
        let store = memory();
        let op = RecordHistory::new(Echo { fail: false }, store.clone());

        assert_eq!(op.invoke("first".to_string()).await.unwrap(), "FIRST");
        assert_eq!(op.invoke("second".to_string()).await.unwrap(), "SECOND");

        let inputs = store.lrange("Test.echo:inputs", 0, -1).await.unwrap();
        let outputs = store.lrange("Test.echo:outputs", 0, -1).await.unwrap();
        assert_eq!(inputs, vec![b"\"first\"".to_vec(), b"\"second\"".to_vec()]);
        assert_eq!(outputs, vec![b"FIRST".to_vec(), b"SECOND".to_vec()]);
    }

    #[tokio::test]
    async fn test_record_history_leaves_output_missing_on_failure() {
        let store = memory();
        let op = RecordHistory::new(Echo { fail: true }, store.clone());

        assert!(op.invoke("boom".to_string()).await.is_err());

        assert_eq!(store.lrange("Test.echo:inputs", 0, -1).await.unwrap().len(), 1);
        assert!(store.lrange("Test.echo:outputs", 0, -1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrappers_keep_inner_name() {
        let store = memory();
        let op = CountCalls::new(RecordHistory::new(Echo { fail: false }, store.clone()), store);
        assert_eq!(Operation::<String, String>::name(&op), "Test.echo");
    }

    #[tokio::test]
    async fn test_replay_with_no_calls_reports_zero() {
        let store = memory();
        let replay = CallReplay::load(store.as_ref(), "Nobody.called").await.unwrap();

        assert_eq!(replay.count, 0);
        assert!(replay.calls.is_empty());
        assert_eq!(replay.to_string(), "Nobody.called was called 0 times:\n");
    }

    #[tokio::test]
    async fn test_replay_renders_each_call() {
        let store = memory();
        let op = CountCalls::new(RecordHistory::new(Echo { fail: false }, store.clone()), store.clone());
        op.invoke("a".to_string()).await.unwrap();
        op.invoke("b".to_string()).await.unwrap();

        let replay = replay(store.as_ref(), "Test.echo").await.unwrap();

        assert_eq!(replay.count, 2);
        assert_eq!(
            replay.to_string(),
            "Test.echo was called 2 times:\n\
             Test.echo(\"a\") -> A\n\
             Test.echo(\"b\") -> B\n"
        );
    }

    #[tokio::test]
    async fn test_replay_rejects_corrupt_counter() {
        let store = memory();
        store.set("Test.echo", b"abc").await.unwrap();

        let err = CallReplay::load(store.as_ref(), "Test.echo").await.unwrap_err();

        assert!(matches!(err, StoreError::NotAnInteger { ref key } if key == "Test.echo"));
    }

    #[tokio::test]
    async fn test_replay_pairs_only_complete_calls() {
        let store = memory();
        let op = CountCalls::new(RecordHistory::new(Echo { fail: true }, store.clone()), store.clone());
        let _ = op.invoke("lost".to_string()).await;

        let replay = CallReplay::load(store.as_ref(), "Test.echo").await.unwrap();
        assert_eq!(replay.count, 1);
        assert!(replay.calls.is_empty());
    }
}
