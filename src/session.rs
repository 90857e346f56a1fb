//! In-memory checkout sessions.
//!
//! A session lives from the moment a partner link is opened until the order
//! is accepted by the gateway or the customer navigates away. Each session
//! has its own lock; it is never held across an await point, so geocoding
//! and submission requests run without blocking edits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tokio::task::AbortHandle;
use tracing::info;
use uuid::Uuid;

use crate::form::OrderForm;
use crate::intent::CheckoutIntent;
use crate::models::SessionResponse;

pub struct CheckoutSession {
    pub id: Uuid,
    pub intent: CheckoutIntent,
    pub form: OrderForm,
    busy: bool,
    geocode_seq: u64,
    submission: Option<AbortHandle>,
}

impl CheckoutSession {
    fn new(intent: CheckoutIntent) -> Self {
        Self {
            id: Uuid::new_v4(),
            form: OrderForm::from_intent(&intent),
            intent,
            busy: false,
            geocode_seq: 0,
            submission: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Issue a ticket for a geocoding request. Tickets increase monotonically.
    pub fn begin_geocode(&mut self) -> u64 {
        self.geocode_seq += 1;
        self.geocode_seq
    }

    /// Whether no geocoding request was issued after `ticket`.
    pub fn is_latest_geocode(&self, ticket: u64) -> bool {
        ticket == self.geocode_seq
    }

    /// Set the busy flag. Returns false if a submission is already running.
    pub fn try_begin_submit(&mut self) -> bool {
        if self.busy {
            return false;
        }
        self.busy = true;
        true
    }

    pub fn track_submission(&mut self, handle: AbortHandle) {
        self.submission = Some(handle);
    }

    pub fn finish_submit(&mut self) {
        self.busy = false;
        self.submission = None;
    }

    fn abort_submission(&mut self) {
        if let Some(handle) = self.submission.take() {
            handle.abort();
        }
    }

    pub fn snapshot(&self) -> SessionResponse {
        SessionResponse {
            id: self.id,
            business_name: self.intent.business_name.clone(),
            callback_url: self.intent.callback_url.clone(),
            draft: self.form.draft().clone(),
            busy: self.busy,
        }
    }
}

#[derive(Clone)]
pub struct SessionHandle(Arc<Mutex<CheckoutSession>>);

impl SessionHandle {
    pub fn lock(&self) -> MutexGuard<'_, CheckoutSession> {
        self.0.lock().expect("session lock poisoned")
    }
}

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session for a decoded intent.
    pub fn open(&self, intent: CheckoutIntent) -> SessionHandle {
        let session = CheckoutSession::new(intent);
        let id = session.id;
        let handle = SessionHandle(Arc::new(Mutex::new(session)));
        self.sessions
            .write()
            .expect("session store lock poisoned")
            .insert(id, handle.clone());
        info!("Checkout session {} opened", id);
        handle
    }

    pub fn get(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions
            .read()
            .expect("session store lock poisoned")
            .get(&id)
            .cloned()
    }

    /// Drop a session, aborting its in-flight submission if any.
    pub fn close(&self, id: Uuid) -> bool {
        let removed = self
            .sessions
            .write()
            .expect("session store lock poisoned")
            .remove(&id);

        match removed {
            Some(handle) => {
                handle.lock().abort_submission();
                info!("Checkout session {} closed", id);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().expect("session store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
