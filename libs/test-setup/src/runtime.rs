use std::future::Future;
use tokio::runtime::{Builder, Runtime};

/// Drive `fut` to completion from a synchronous `#[test]`.
pub fn run_with_tokio<O, F>(fut: F) -> O
where
    F: Future<Output = O>,
{
    test_tokio_runtime().block_on(fut)
}

/// A current-thread runtime with IO and time enabled.
pub fn test_tokio_runtime() -> Runtime {
    Builder::new_current_thread().enable_all().build().unwrap()
}
