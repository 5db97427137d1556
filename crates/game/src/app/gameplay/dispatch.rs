//! Moves quest calls off the simulation thread.
//!
//! Requests run on one worker in submission order; completions come back
//! over a channel and are drained by the frame loop.

use std::io;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use super::quest::{QuestCompletion, TransitionOrigin};
use super::quest_client::{resolve_call, QuestRequest, QuestService};

pub(crate) trait QuestDispatch {
    fn submit(&mut self, request: QuestRequest);
    /// Appends every completion that arrived since the last drain, in the
    /// order the requests were submitted.
    fn drain_completed(&mut self, out: &mut Vec<QuestCompletion>);
}

pub(crate) struct ThreadedDispatch {
    requests: Option<Sender<QuestRequest>>,
    completions: Receiver<QuestCompletion>,
    /// Completions synthesized locally when the worker is gone.
    orphaned: Vec<QuestCompletion>,
    worker: Option<JoinHandle<()>>,
}

impl ThreadedDispatch {
    pub(crate) fn spawn(service: Box<dyn QuestService + Send>) -> io::Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<QuestRequest>();
        let (completion_tx, completion_rx) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("quest-worker".to_string())
            .spawn(move || {
                for request in request_rx {
                    let completion = resolve_call(service.as_ref(), request);
                    if completion_tx.send(completion).is_err() {
                        break;
                    }
                }
                info!("quest_worker_stopped");
            })?;

        Ok(Self {
            requests: Some(request_tx),
            completions: completion_rx,
            orphaned: Vec::new(),
            worker: Some(worker),
        })
    }
}

impl QuestDispatch for ThreadedDispatch {
    fn submit(&mut self, request: QuestRequest) {
        let Some(requests) = &self.requests else {
            self.orphaned.push(local_fallback(request));
            return;
        };
        if let Err(mpsc::SendError(request)) = requests.send(request) {
            warn!(request_id = request.request_id, "quest_worker_unavailable");
            self.requests = None;
            self.orphaned.push(local_fallback(request));
        }
    }

    fn drain_completed(&mut self, out: &mut Vec<QuestCompletion>) {
        loop {
            match self.completions.try_recv() {
                Ok(completion) => out.push(completion),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.requests = None;
                    break;
                }
            }
        }
        out.append(&mut self.orphaned);
    }
}

impl Drop for ThreadedDispatch {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop after the
        // in-flight call returns.
        self.requests = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("quest_worker_panicked");
            }
        }
    }
}

fn local_fallback(request: QuestRequest) -> QuestCompletion {
    QuestCompletion {
        request_id: request.request_id,
        reply: request.call.fallback_reply(),
        call: request.call,
        origin: TransitionOrigin::Fallback,
    }
}

/// Resolves each request synchronously on submit.
pub(crate) struct InlineDispatch<S> {
    service: S,
    completed: Vec<QuestCompletion>,
}

impl<S: QuestService> InlineDispatch<S> {
    pub(crate) fn new(service: S) -> Self {
        Self {
            service,
            completed: Vec::new(),
        }
    }
}

impl<S: QuestService> QuestDispatch for InlineDispatch<S> {
    fn submit(&mut self, request: QuestRequest) {
        let completion = resolve_call(&self.service, request);
        self.completed.push(completion);
    }

    fn drain_completed(&mut self, out: &mut Vec<QuestCompletion>) {
        out.append(&mut self.completed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::gameplay::quest::{EmotionKind, QuestCall, QuestReply, QuestStage};
    use crate::app::gameplay::quest_client::{OfflineQuestService, TransportError};
    use std::time::{Duration, Instant};

    struct EchoService;

    impl QuestService for EchoService {
        fn send(&self, _session_id: Option<&str>, call: &QuestCall) -> Result<QuestReply, TransportError> {
            Ok(match call {
                QuestCall::Collect(kind) => QuestReply::progress(kind.collected_stage(), ["ok"]),
                _ => QuestReply::progress(QuestStage::GameStart, Vec::<String>::new()),
            })
        }
    }

    fn request(request_id: u64, call: QuestCall) -> QuestRequest {
        QuestRequest {
            request_id,
            session_id: Some("s1".to_string()),
            call,
        }
    }

    fn drain_until(dispatch: &mut ThreadedDispatch, count: usize) -> Vec<QuestCompletion> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut out = Vec::new();
        while out.len() < count && Instant::now() < deadline {
            dispatch.drain_completed(&mut out);
            std::thread::sleep(Duration::from_millis(1));
        }
        out
    }

    #[test]
    fn threaded_dispatch_completes_in_submission_order() {
        let mut dispatch = ThreadedDispatch::spawn(Box::new(EchoService)).expect("spawn");
        for (id, kind) in EmotionKind::CHAIN.into_iter().enumerate() {
            dispatch.submit(request(id as u64, QuestCall::Collect(kind)));
        }

        let completed = drain_until(&mut dispatch, 4);
        let ids: Vec<u64> = completed.iter().map(|c| c.request_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert!(completed
            .iter()
            .all(|c| c.origin == TransitionOrigin::Server));
    }

    #[test]
    fn threaded_dispatch_falls_back_for_offline_service() {
        let mut dispatch = ThreadedDispatch::spawn(Box::new(OfflineQuestService)).expect("spawn");
        let call = QuestCall::Collect(EmotionKind::Pride);
        dispatch.submit(request(1, call.clone()));

        let completed = drain_until(&mut dispatch, 1);
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].origin, TransitionOrigin::Fallback);
        assert_eq!(completed[0].reply, call.fallback_reply());
    }

    #[test]
    fn inline_dispatch_resolves_on_submit() {
        let mut dispatch = InlineDispatch::new(EchoService);
        dispatch.submit(request(3, QuestCall::Collect(EmotionKind::Envy)));
        let mut out = Vec::new();
        dispatch.drain_completed(&mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].reply,
            QuestReply::progress(QuestStage::CollectEnvy, ["ok"])
        );

        dispatch.drain_completed(&mut out);
        assert_eq!(out.len(), 1);
    }
}
