//! Background worker that owns the narrative agent.

use super::{AgentEvent, NarrativeAgent, NarrativeError, NarrativeEvent};
use crate::tools::ToolCall;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

/// Requests sent to the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerRequest {
    Submit(String),
    Shutdown,
}

/// Responses streamed back from the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerResponse {
    Token(String),
    ToolCall(ToolCall),
    Complete,
    Error(String),
}

/// Foreground handle to the narrative worker.
///
/// Only one reply is generated at a time. The stream counts as generating
/// from a successful [`submit`](Self::submit) until the completion or error
/// message has been drained by [`poll`](Self::poll).
pub struct NarrativeStream {
    request_tx: mpsc::UnboundedSender<WorkerRequest>,
    response_rx: mpsc::UnboundedReceiver<WorkerResponse>,
    in_flight: bool,
    worker: Option<JoinHandle<()>>,
}

impl NarrativeStream {
    /// Spawn the worker thread and hand it the agent.
    pub fn spawn<A: NarrativeAgent>(agent: A) -> Result<Self, NarrativeError> {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();

        let worker = thread::Builder::new()
            .name("valemor-narrator".to_string())
            .spawn(move || worker_loop(agent, request_rx, response_tx))
            .map_err(|err| NarrativeError::Spawn(err.to_string()))?;

        Ok(Self {
            request_tx,
            response_rx,
            in_flight: false,
            worker: Some(worker),
        })
    }

    pub fn is_generating(&self) -> bool {
        self.in_flight
    }

    /// Send a message to the agent. Rejected while a reply is in flight.
    pub fn submit(&mut self, input: impl Into<String>) -> Result<(), NarrativeError> {
        if self.in_flight {
            tracing::warn!("narrative submission rejected, agent is busy");
            return Err(NarrativeError::Busy);
        }
        self.request_tx
            .send(WorkerRequest::Submit(input.into()))
            .map_err(|_| NarrativeError::Disconnected)?;
        self.in_flight = true;
        Ok(())
    }

    /// Drain at most one message from the worker.
    pub fn poll(&mut self) -> Option<NarrativeEvent> {
        match self.response_rx.try_recv() {
            Ok(WorkerResponse::Token(text)) => Some(NarrativeEvent::Token(text)),
            Ok(WorkerResponse::ToolCall(call)) => Some(NarrativeEvent::ToolCall(call)),
            Ok(WorkerResponse::Complete) => {
                self.in_flight = false;
                Some(NarrativeEvent::Complete)
            }
            Ok(WorkerResponse::Error(message)) => {
                self.in_flight = false;
                tracing::warn!(error = %message, "narrative agent failed");
                Some(NarrativeEvent::Failed(format!("[Error: {message}]")))
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                if !self.in_flight {
                    return None;
                }
                self.in_flight = false;
                tracing::warn!("narrative worker stopped mid-reply");
                Some(NarrativeEvent::Failed(format!(
                    "[Error: {}]",
                    NarrativeError::Disconnected
                )))
            }
        }
    }

    /// Poll until an event arrives or `timeout` passes.
    ///
    /// For drivers without a frame loop; a UI should call [`poll`](Self::poll)
    /// once per tick instead.
    pub fn wait(&mut self, timeout: Duration) -> Option<NarrativeEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(event) = self.poll() {
                return Some(event);
            }
            if !self.in_flight || Instant::now() >= deadline {
                return None;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }
}

impl Drop for NarrativeStream {
    fn drop(&mut self) {
        let _ = self.request_tx.send(WorkerRequest::Shutdown);
        // The agent may be blocked mid-reply; don't wait for it.
        drop(self.worker.take());
    }
}

impl std::fmt::Debug for NarrativeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrativeStream")
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

fn worker_loop<A: NarrativeAgent>(
    mut agent: A,
    mut request_rx: mpsc::UnboundedReceiver<WorkerRequest>,
    response_tx: mpsc::UnboundedSender<WorkerResponse>,
) {
    while let Some(request) = request_rx.blocking_recv() {
        match request {
            WorkerRequest::Submit(input) => {
                let result = agent.respond(&input, &mut |event: AgentEvent| {
                    let response = match event {
                        AgentEvent::Token(text) => WorkerResponse::Token(text),
                        AgentEvent::ToolCall(call) => WorkerResponse::ToolCall(call),
                    };
                    let _ = response_tx.send(response);
                });
                let done = match result {
                    Ok(()) => WorkerResponse::Complete,
                    Err(err) => WorkerResponse::Error(err.to_string()),
                };
                if response_tx.send(done).is_err() {
                    break;
                }
            }
            WorkerRequest::Shutdown => break,
        }
    }
    tracing::debug!("narrative worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{PlayerRest, ToolCall};

    struct Echo;

    impl NarrativeAgent for Echo {
        fn respond(
            &mut self,
            input: &str,
            emit: &mut dyn FnMut(AgentEvent),
        ) -> Result<(), NarrativeError> {
            for word in input.split_whitespace() {
                emit(AgentEvent::Token(format!("{word} ")));
            }
            if input.contains("rest") {
                emit(AgentEvent::ToolCall(ToolCall::PlayerRest(PlayerRest {})));
            }
            Ok(())
        }
    }

    struct Broken;

    impl NarrativeAgent for Broken {
        fn respond(
            &mut self,
            _input: &str,
            _emit: &mut dyn FnMut(AgentEvent),
        ) -> Result<(), NarrativeError> {
            Err(NarrativeError::Agent("rate limited".to_string()))
        }
    }

    fn drain(stream: &mut NarrativeStream) -> Vec<NarrativeEvent> {
        let mut events = Vec::new();
        while let Some(event) = stream.wait(Duration::from_secs(5)) {
            let done = event.is_terminal();
            events.push(event);
            if done {
                break;
            }
        }
        events
    }

    #[test]
    fn test_streams_tokens_then_completes() {
        let mut stream = NarrativeStream::spawn(Echo).unwrap();
        stream.submit("we rest now").unwrap();
        assert!(stream.is_generating());

        let events = drain(&mut stream);
        assert_eq!(
            events,
            vec![
                NarrativeEvent::Token("we ".to_string()),
                NarrativeEvent::Token("rest ".to_string()),
                NarrativeEvent::Token("now ".to_string()),
                NarrativeEvent::ToolCall(ToolCall::PlayerRest(PlayerRest {})),
                NarrativeEvent::Complete,
            ]
        );
        assert!(!stream.is_generating());
    }

    #[test]
    fn test_submit_while_generating_is_busy() {
        let mut stream = NarrativeStream::spawn(Echo).unwrap();
        stream.submit("hello").unwrap();
        assert_eq!(stream.submit("again"), Err(NarrativeError::Busy));

        drain(&mut stream);
        assert!(stream.submit("again").is_ok());
    }

    #[test]
    fn test_agent_error_is_in_band() {
        let mut stream = NarrativeStream::spawn(Broken).unwrap();
        stream.submit("hello").unwrap();
        let events = drain(&mut stream);
        assert_eq!(
            events,
            vec![NarrativeEvent::Failed(
                "[Error: Agent error: rate limited]".to_string()
            )]
        );
        assert!(!stream.is_generating());
    }

    #[test]
    fn test_poll_when_idle_is_empty() {
        let mut stream = NarrativeStream::spawn(Echo).unwrap();
        assert_eq!(stream.poll(), None);
        assert_eq!(stream.wait(Duration::from_millis(5)), None);
    }
}
