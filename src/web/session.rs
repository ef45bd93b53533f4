use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use crate::models::ContentItem;

const MAX_SESSIONS: usize = 32;

struct Session {
    items: Arc<Vec<ContentItem>>,
    /// Write order, for eviction.
    seq: u64,
}

#[derive(Default)]
struct Sessions {
    by_id: HashMap<Uuid, Session>,
    next_seq: u64,
}

/// Items of each fetch, kept until a later generate request for the same session.
#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<Sessions>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `items` under `id` when given, otherwise under a new id.
    /// An existing session is replaced wholesale.
    pub fn put(&self, id: Option<Uuid>, items: Vec<ContentItem>) -> Uuid {
        let id = id.unwrap_or_else(Uuid::new_v4);
        let mut sessions = self.lock();

        let seq = sessions.next_seq;
        sessions.next_seq += 1;
        sessions.by_id.insert(
            id,
            Session {
                items: Arc::new(items),
                seq,
            },
        );

        while sessions.by_id.len() > MAX_SESSIONS {
            let oldest = sessions
                .by_id
                .iter()
                .min_by_key(|(_, s)| s.seq)
                .map(|(id, _)| *id);
            match oldest {
                Some(oldest) => {
                    tracing::debug!("Evicting session {}", oldest);
                    sessions.by_id.remove(&oldest);
                }
                None => break,
            }
        }

        id
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<Vec<ContentItem>>> {
        self.lock().by_id.get(id).map(|s| Arc::clone(&s.items))
    }

    pub fn len(&self) -> usize {
        self.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().by_id.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Sessions> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
