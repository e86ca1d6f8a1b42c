use super::{
    errors::SpawnError,
    result::SpawnResult,
};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll}
};
use futures::{
    future::Shared,
    FutureExt,
};
use tokio::{
    sync::oneshot::{self, error::TryRecvError},
    time::Duration,
};


pub type Job = Box<dyn FnOnce() + Send + 'static>;


/// Состояние результата задачи без блокировки
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleState<T> {
    Pending,
    Completed(T),
    Failed(SpawnError),
    /// Терминальное состояние уже было выдано этим handle
    Taken,
}

impl<T> From<SpawnResult<T>> for HandleState<T> {
    fn from(result: SpawnResult<T>) -> Self {
        match result {
            Ok(value) => HandleState::Completed(value),
            Err(e) => HandleState::Failed(e),
        }
    }
}


/// Handle на результат задачи.
///
/// Результат присваивается ровно один раз: воркер отправляет его в oneshot канал.
/// Handle можно ждать как `Future` из любого async runtime,
/// блокирующе через [`JoinHandle::wait`] или опрашивать через [`JoinHandle::try_poll`].
pub struct JoinHandle<T> {
    receiver: oneshot::Receiver<SpawnResult<T>>,
    taken: bool,
}

impl<T> JoinHandle<T> {

    pub(crate) fn new(receiver: oneshot::Receiver<SpawnResult<T>>) -> Self {
        Self { receiver, taken: false }
    }

    /// Блокирует текущий поток до завершения задачи
    pub fn wait(self) -> SpawnResult<T> {
        futures::executor::block_on(self)
    }

    pub async fn await_timeout(self, timeout: Duration) -> SpawnResult<T> {
        match tokio::time::timeout(timeout, self).await {
            Ok(result) => result,
            Err(_) => Err(SpawnError::Timeout),
        }
    }

    /// После выдачи терминального состояния возвращает `Taken`
    pub fn try_poll(&mut self) -> HandleState<T> {
        if self.taken {
            return HandleState::Taken;
        }
        let state = match self.receiver.try_recv() {
            Ok(result) => result.into(),
            Err(TryRecvError::Empty) => return HandleState::Pending,
            Err(TryRecvError::Closed) => HandleState::Failed(SpawnError::ChannelClosed),
        };
        self.taken = true;
        state
    }

    pub fn shared(self) -> SharedHandle<T>
    where
        T: Clone,
    {
        SharedHandle { inner: FutureExt::shared(self) }
    }
}

impl<T> Future for JoinHandle<T> {
    type Output = SpawnResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if this.taken {
            return Poll::Ready(Err(SpawnError::ChannelClosed));
        }
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(res) => {
                this.taken = true;
                Poll::Ready(res.unwrap_or(Err(SpawnError::ChannelClosed)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}


/// Клонируемый handle: любое число читателей видит одно и то же терминальное состояние
pub struct SharedHandle<T: Clone> {
    inner: Shared<JoinHandle<T>>,
}

impl<T: Clone> Clone for SharedHandle<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T: Clone> SharedHandle<T> {
    pub fn wait(&self) -> SpawnResult<T> {
        futures::executor::block_on(self.inner.clone())
    }

    pub fn try_poll(&self) -> HandleState<T> {
        match self.inner.clone().now_or_never() {
            Some(result) => result.into(),
            None => HandleState::Pending,
        }
    }
}

impl<T: Clone> Future for SharedHandle<T> {
    type Output = SpawnResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().inner).poll(cx)
    }
}
