use futures::{ready, Stream, StreamExt};
use rdf_delta_common::error::{ContractViolation, QueryEvaluationError};
use rdf_delta_common::BindingsStream;
use std::fmt::{Debug, Formatter};
use std::pin::Pin;
use std::task::{Context, Poll};

/// A stream over the changes to the answer of an `ASK` query.
///
/// The answer starts as `false`. The stream emits `true` once the pattern has a solution and
/// `false` once its last solution has been retracted.
pub struct BooleanChangeStream {
    inner: BindingsStream,
    /// The number of live solutions.
    live: usize,
    finished: bool,
}

impl BooleanChangeStream {
    /// Creates a new [BooleanChangeStream] over the solutions of the pattern.
    pub fn new(inner: BindingsStream) -> Self {
        Self {
            inner,
            live: 0,
            finished: false,
        }
    }

    /// Stops all pattern streams that feed this query.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Consumes the stream and returns the answer once the sources have ended.
    pub async fn into_answer(mut self) -> Result<bool, QueryEvaluationError> {
        let mut answer = false;
        while let Some(change) = self.next().await {
            answer = change?;
        }
        Ok(answer)
    }
}

impl Stream for BooleanChangeStream {
    type Item = Result<bool, QueryEvaluationError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if this.finished {
                return Poll::Ready(None);
            }

            let bindings = match ready!(this.inner.poll_next_unpin(cx)) {
                None => {
                    this.finished = true;
                    return Poll::Ready(None);
                }
                Some(Err(error)) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(error)));
                }
                Some(Ok(bindings)) => bindings,
            };

            if bindings.is_addition() {
                this.live += 1;
                if this.live == 1 {
                    return Poll::Ready(Some(Ok(true)));
                }
            } else {
                let Some(live) = this.live.checked_sub(1) else {
                    this.finished = true;
                    return Poll::Ready(Some(Err(ContractViolation::UnmatchedDeletion {
                        operator: "Ask",
                        bindings: bindings.to_string(),
                    }
                    .into())));
                };
                this.live = live;
                if live == 0 {
                    return Poll::Ready(Some(Ok(false)));
                }
            }
        }
    }
}

impl Debug for BooleanChangeStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BooleanChangeStream")
            .field("live", &self.live)
            .finish_non_exhaustive()
    }
}
