//! Wait-for-all aggregation of independent fallible operations.

use std::future::Future;

use futures_util::future::join_all;

/// Outcomes of a fan-out, in the order the operations were issued.
#[derive(Debug)]
pub struct Settlement<T, E> {
    outcomes: Vec<Result<T, E>>,
}

impl<T, E> Settlement<T, E> {
    pub fn outcomes(&self) -> &[Result<T, E>] { &self.outcomes }

    pub fn failures(&self) -> usize { self.outcomes.iter().filter(|o| o.is_err()).count() }

    pub fn succeeded(&self) -> impl Iterator<Item = &T> {
        self.outcomes.iter().filter_map(|o| o.as_ref().ok())
    }

    /// All successes, or the first failure in issue order.
    pub fn into_first_failure(self) -> Result<Vec<T>, E> {
        self.outcomes.into_iter().collect()
    }
}

/// Run every operation concurrently and wait until all of them have settled.
/// A failure never cancels or short-circuits the others.
pub async fn settle_all<I, F, T, E>(ops: I) -> Settlement<T, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    Settlement { outcomes: join_all(ops).await }
}
