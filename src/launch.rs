//! What a task function hands back: a pending operation or an abstain marker.
//!
//! Abstaining is allowed by the type so that task bodies can branch freely,
//! but the controller always treats it as a programmer error and fails the
//! invocation with [`TaskError::Abstained`](crate::TaskError::Abstained).

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::cancellation::InvocationToken;
use crate::error::{BoxError, TaskError};

/// Pending result or explicit abstain marker.
#[derive(Debug)]
pub enum Launch<F> {
    Run(F),
    Abstain,
}

/// Conversion into [`Launch`], implemented for `Launch<F>` and `Option<F>`
/// (`None` abstains).
pub trait IntoLaunch {
    type Future: Future;

    fn into_launch(self) -> Launch<Self::Future>;
}

impl<F: Future> IntoLaunch for Launch<F> {
    type Future = F;

    fn into_launch(self) -> Launch<F> {
        self
    }
}

impl<F: Future> IntoLaunch for Option<F> {
    type Future = F;

    fn into_launch(self) -> Launch<F> {
        match self {
            Some(fut) => Launch::Run(fut),
            None => Launch::Abstain,
        }
    }
}

pub(crate) type BoxTaskFuture<T> = BoxFuture<'static, Result<T, TaskError>>;

/// Type-erased task function stored by the controller.
pub(crate) type TaskFn<A, T> =
    Arc<dyn Fn(InvocationToken, A) -> Launch<BoxTaskFuture<T>> + Send + Sync>;

/// Erase a user task function, normalizing its error type.
pub(crate) fn erase<A, T, F, R, E>(func: F) -> TaskFn<A, T>
where
    F: Fn(InvocationToken, A) -> R + Send + Sync + 'static, // Fn, not FnMut
    R: IntoLaunch,
    R::Future: Future<Output = Result<T, E>> + Send + 'static,
    E: Into<BoxError>,
    T: 'static,
{
    Arc::new(move |token, args| match func(token, args).into_launch() {
        Launch::Run(fut) => {
            let fut: BoxTaskFuture<T> =
                Box::pin(async move { fut.await.map_err(|e| TaskError::failed(e)) });
            Launch::Run(fut)
        }
        Launch::Abstain => Launch::Abstain,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::{issue, InvocationCounter};

    #[test]
    fn option_none_abstains() {
        let none: Option<std::future::Ready<()>> = None;
        assert!(matches!(none.into_launch(), Launch::Abstain));
        let some = Some(std::future::ready(()));
        assert!(matches!(some.into_launch(), Launch::Run(_)));
    }

    #[tokio::test]
    async fn erased_function_maps_errors() {
        let func = erase(|_token, fail: bool| {
            Launch::Run(async move {
                if fail {
                    Err("bad input".to_string())
                } else {
                    Ok(7_u32)
                }
            })
        });
        let counter = Arc::new(InvocationCounter::new());

        let Launch::Run(ok) = func(issue(&counter), false) else {
            panic!("expected a pending operation");
        };
        assert_eq!(ok.await.ok(), Some(7));

        let Launch::Run(err) = func(issue(&counter), true) else {
            panic!("expected a pending operation");
        };
        let err = err.await.expect_err("should fail");
        assert_eq!(err.to_string(), "task failed: bad input");
    }
}
