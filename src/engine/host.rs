// Per-entry host executor. Runs the surface and adaptive-session calls queued by
// the attachment engine, outside the registry lock.
//
// Host callbacks may re-enter the registry (list, dispatch, remove). A call made
// while this entry's executor is already running is queued and drained by the
// running executor, in order.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tracing::debug;

use super::surface::{AdaptiveSession, PlayRejected, PlaybackSurface, PlayerBackend};
use crate::registry::EntryId;

/// Side effect requested by the attachment engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    /// Create an adaptive session, load the manifest and bind it to the surface.
    OpenSession { manifest_url: String },
    /// Hand the manifest to the surface directly.
    SetNativeSource { manifest_url: String },
    StartLoad,
    RecoverMedia,
    Play,
    /// Destroy the session, pause and release the surface.
    Release,
}

enum Job {
    Mount(Box<dyn PlaybackSurface>),
    Call(HostCall),
}

#[derive(Default)]
struct HostSlot {
    surface: Option<Box<dyn PlaybackSurface>>,
    session: Option<Box<dyn AdaptiveSession>>,
}

impl HostSlot {
    fn release(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.destroy();
        }
        if let Some(mut surface) = self.surface.take() {
            surface.pause();
            surface.release();
        }
    }
}

impl Drop for HostSlot {
    fn drop(&mut self) {
        self.release();
    }
}

pub struct EntryHost {
    entry: EntryId,
    slot: Mutex<HostSlot>,
    queue: Mutex<VecDeque<Job>>,
}

impl EntryHost {
    pub fn new(entry: EntryId) -> Self {
        Self {
            entry,
            slot: Mutex::new(HostSlot::default()),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Queue a freshly mounted surface; installed before any later call runs.
    pub fn enqueue_mount(&self, surface: Box<dyn PlaybackSurface>) {
        self.queue.lock().push_back(Job::Mount(surface));
    }

    pub fn enqueue(&self, calls: Vec<HostCall>) {
        if calls.is_empty() {
            return;
        }
        let mut queue = self.queue.lock();
        queue.extend(calls.into_iter().map(Job::Call));
    }

    /// Run queued calls unless another caller is already doing so.
    /// `on_play` receives the outcome of every `play()`.
    pub fn drain<F>(&self, player: &dyn PlayerBackend, mut on_play: F)
    where
        F: FnMut(Result<(), PlayRejected>),
    {
        loop {
            let mut slot = match self.slot.try_lock() {
                Some(slot) => slot,
                None => return,
            };
            loop {
                // queue lock released before the host call
                let job = self.queue.lock().pop_front();
                match job {
                    Some(job) => {
                        if let Some(outcome) = self.run(&mut slot, job, player) {
                            on_play(outcome);
                        }
                    }
                    None => break,
                }
            }
            drop(slot);
            // a job pushed between the last pop and the unlock would be stranded
            if self.queue.lock().is_empty() {
                return;
            }
        }
    }

    fn run(
        &self,
        slot: &mut HostSlot,
        job: Job,
        player: &dyn PlayerBackend,
    ) -> Option<Result<(), PlayRejected>> {
        let call = match job {
            Job::Mount(surface) => {
                slot.surface = Some(surface);
                return None;
            }
            Job::Call(call) => call,
        };
        debug!("entry {} host call {:?}", self.entry, call);

        match call {
            HostCall::OpenSession { manifest_url } => {
                let mut session = player.create_session(self.entry);
                session.load_source(&manifest_url);
                if let Some(surface) = slot.surface.as_mut() {
                    session.attach_media(surface.as_mut());
                }
                slot.session = Some(session);
            }
            HostCall::SetNativeSource { manifest_url } => {
                if let Some(surface) = slot.surface.as_mut() {
                    surface.set_source(&manifest_url);
                }
            }
            HostCall::StartLoad => {
                if let Some(session) = slot.session.as_mut() {
                    session.start_load();
                }
            }
            HostCall::RecoverMedia => {
                if let Some(session) = slot.session.as_mut() {
                    session.recover_media_error();
                }
            }
            HostCall::Play => {
                if let Some(surface) = slot.surface.as_mut() {
                    return Some(surface.play());
                }
            }
            HostCall::Release => slot.release(),
        }
        None
    }
}
