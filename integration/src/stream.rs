//! Generic stream transformation: wraps a raw item stream (what a WS/HTTP
//! client hands back) and applies a [`Transformer`] to turn each raw item
//! into zero, one, or many domain outputs, without the client needing to
//! know anything about the transform itself.

use futures::Stream;
use pin_project::pin_project;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Converts one raw input into an iterator of fallible outputs. A single
/// input can fan out into zero, one, or many domain events (e.g. a batched
/// WS frame carrying several ticks).
pub trait Transformer {
    type Error;
    type Input;
    type Output;
    type OutputIter: IntoIterator<Item = Result<Self::Output, Self::Error>>;

    fn transform(&mut self, input: Self::Input) -> Self::OutputIter;
}

/// Wraps a `Stream<Item = T::Input>` and yields `T::Output`s, buffering the
/// tail of a multi-output transform across polls rather than dropping it.
#[pin_project]
pub struct TransformedStream<T, St>
where
    T: Transformer,
{
    #[pin]
    stream: St,
    transformer: T,
    buffer: VecDeque<Result<T::Output, T::Error>>,
}

impl<T, St> TransformedStream<T, St>
where
    T: Transformer,
{
    pub fn new(stream: St, transformer: T) -> Self {
        Self { stream, transformer, buffer: VecDeque::new() }
    }
}

impl<T, St> Stream for TransformedStream<T, St>
where
    T: Transformer,
    St: Stream<Item = T::Input>,
{
    type Item = Result<T::Output, T::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            if let Some(item) = this.buffer.pop_front() {
                return Poll::Ready(Some(item));
            }

            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(input)) => {
                    this.buffer.extend(this.transformer.transform(input));
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
