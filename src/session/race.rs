//! Race two futures to completion.
//!
//! Both run concurrently on the current task. When one finishes, the other
//! is dropped before [`race`] returns, so nothing outlives the race and the
//! loser never touches the connection again.

use std::future::Future;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaceWinner<A, B> {
    First(A),
    Second(B),
}

pub async fn race<A, B>(first: A, second: B) -> RaceWinner<A::Output, B::Output>
where
    A: Future,
    B: Future,
{
    tokio::select! {
        out = first => RaceWinner::First(out),
        out = second => RaceWinner::Second(out),
    }
}
