pub mod logging;

use std::{future::Future, pin::Pin};

/// Boxed future used at trait seams that need to stay object safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
