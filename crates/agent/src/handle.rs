//! Agent handles: a persona bound to a backend.
//!
//! An [`AgentHandle`] performs exactly one backend exchange per `send`.
//! The thread it sends on must be one it minted: a thread never changes
//! owner.

use fincrew_core::backend::{Backend, ExchangeEvent, ExchangeReply, ExchangeRequest, ExchangeStream, SendOptions};
use fincrew_core::error::{Error, ProviderError, WorkflowError};
use fincrew_core::message::{Message, Thread};
use fincrew_core::tool::ToolRegistry;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::debug;

/// Runtime binding of an agent persona to a backend connection.
#[derive(Clone)]
pub struct AgentHandle {
    name: String,
    description: String,
    instructions: String,
    tools: Option<Arc<ToolRegistry>>,
    backend: Arc<dyn Backend>,
}

impl AgentHandle {
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        tools: Option<Arc<ToolRegistry>>,
        backend: Arc<dyn Backend>,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            instructions: instructions.into(),
            tools,
            backend,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn tools(&self) -> Option<&Arc<ToolRegistry>> {
        self.tools.as_ref()
    }

    /// Mint a fresh, empty thread owned by this agent.
    pub fn create_thread(&self) -> Thread {
        Thread::new(&self.name)
    }

    fn check_owner(&self, thread: &Thread) -> Result<(), Error> {
        if thread.owner() != self.name {
            return Err(WorkflowError::ThreadOwnership {
                thread_owner: thread.owner().to_string(),
                agent: self.name.clone(),
            }
            .into());
        }
        Ok(())
    }

    fn request(&self, thread: &Thread, message: &str, options: SendOptions) -> ExchangeRequest {
        ExchangeRequest {
            agent: self.name.clone(),
            instructions: self.instructions.clone(),
            thread_id: thread.id().clone(),
            history: thread.messages().to_vec(),
            input: message.to_string(),
            tools: self.tools.clone(),
            options,
        }
    }

    /// Run one exchange on `thread` and record it.
    ///
    /// On failure the thread is left untouched and the backend error is
    /// returned as-is.
    pub async fn send(&self, thread: &mut Thread, message: &str, options: SendOptions) -> Result<ExchangeReply, Error> {
        self.check_owner(thread)?;
        debug!(agent = %self.name, thread = %thread.id(), history = thread.len(), "Sending exchange");

        let reply = self.backend.exchange(self.request(thread, message, options)).await?;
        thread.push(Message::user(message));
        thread.extend(reply.turns.iter().cloned());
        Ok(reply)
    }

    /// Run one exchange on `thread`, yielding the reply as fragments.
    ///
    /// The exchange is committed to the thread only when the backend
    /// reports completion; dropping the stream earlier leaves the thread
    /// exactly as it was.
    pub async fn send_stream<'a>(
        &self,
        thread: &'a mut Thread,
        message: &str,
        options: SendOptions,
    ) -> Result<FragmentStream<'a>, Error> {
        self.check_owner(thread)?;
        debug!(agent = %self.name, thread = %thread.id(), history = thread.len(), "Streaming exchange");

        let events = self
            .backend
            .exchange_stream(self.request(thread, message, options.with_streaming(true)))
            .await?;
        Ok(FragmentStream {
            thread,
            input: Some(Message::user(message)),
            events,
            reply: None,
            finished: false,
        })
    }
}

impl std::fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentHandle")
            .field("name", &self.name)
            .field("tools", &self.tools)
            .field("backend", &self.backend.name())
            .finish()
    }
}

/// A finite, single-pass sequence of reply fragments.
///
/// Yields `Ok(text)` per fragment. A backend failure is yielded once as
/// `Err` and ends the stream; so does a backend that stops without
/// signalling completion.
pub struct FragmentStream<'a> {
    thread: &'a mut Thread,
    input: Option<Message>,
    events: ExchangeStream,
    reply: Option<ExchangeReply>,
    finished: bool,
}

impl FragmentStream<'_> {
    /// The completed reply, once the stream has been drained.
    pub fn reply(&self) -> Option<&ExchangeReply> {
        self.reply.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Drain the stream and return the final reply text.
    pub async fn collect_text(mut self) -> Result<String, Error> {
        use futures::StreamExt;
        while let Some(fragment) = self.next().await {
            fragment?;
        }
        Ok(self.reply.map(|r| r.message.content).unwrap_or_default())
    }

    fn commit(&mut self, reply: ExchangeReply) {
        if let Some(input) = self.input.take() {
            self.thread.push(input);
            self.thread.extend(reply.turns.iter().cloned());
        }
        self.reply = Some(reply);
    }
}

impl Stream for FragmentStream<'_> {
    type Item = Result<String, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if this.finished {
                return Poll::Ready(None);
            }
            match this.events.poll_recv(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(ExchangeEvent::Fragment(text)))) => return Poll::Ready(Some(Ok(text))),
                Poll::Ready(Some(Ok(ExchangeEvent::Completed(reply)))) => {
                    this.commit(reply);
                    this.finished = true;
                }
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(e.into())));
                }
                Poll::Ready(None) => {
                    this.finished = true;
                    if this.reply.is_none() {
                        return Poll::Ready(Some(Err(ProviderError::StreamInterrupted(
                            "backend closed the stream before completing".into(),
                        )
                        .into())));
                    }
                }
            }
        }
    }
}
