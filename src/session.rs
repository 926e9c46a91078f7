use crate::model::{PlayMode, SessionSnapshot};
use crate::scheduler::{self, TimerSlot};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
pub struct Session {
    pub current: Option<String>,
    pub paused: bool,
    pub mode: PlayMode,
    pub list_page: usize,
    pub queue_page: usize,
    pub timer: Option<TimerSlot>,
}

impl Session {
    pub fn new(mode: PlayMode) -> Self {
        Self {
            current: None,
            paused: false,
            mode,
            list_page: 1,
            queue_page: 1,
            timer: None,
        }
    }

    pub fn snapshot(&self, user: &str) -> SessionSnapshot {
        SessionSnapshot {
            user: user.to_string(),
            current: self.current.clone(),
            mode: self.mode,
            list_page: self.list_page,
            queue_page: self.queue_page,
        }
    }

    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        Self {
            current: snapshot.current.clone(),
            paused: false,
            mode: snapshot.mode,
            list_page: snapshot.list_page.max(1),
            queue_page: snapshot.queue_page.max(1),
            timer: None,
        }
    }
}

pub type SessionHandle = Arc<Mutex<Session>>;

#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionHandle>>,
    default_mode: PlayMode,
}

impl SessionStore {
    pub fn new(default_mode: PlayMode) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            default_mode,
        }
    }

    pub fn entry(&self, user: &str) -> SessionHandle {
        let mut sessions = self.map();
        sessions
            .entry(user.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Session::new(self.default_mode))))
            .clone()
    }

    pub fn get(&self, user: &str) -> Option<SessionHandle> {
        self.map().get(user).cloned()
    }

    pub fn snapshot(&self) -> Vec<SessionSnapshot> {
        self.handles()
            .into_iter()
            .map(|(user, handle)| lock(&handle).snapshot(&user))
            .collect()
    }

    pub fn restore(&self, snapshots: &[SessionSnapshot]) {
        for snapshot in snapshots {
            let fresh = Arc::new(Mutex::new(Session::from_snapshot(snapshot)));
            let previous = self.map().insert(snapshot.user.clone(), fresh);
            if let Some(previous) = previous {
                scheduler::cancel(&mut lock(&previous).timer);
            }
        }
    }

    pub fn cancel_all_timers(&self) -> usize {
        self.handles()
            .into_iter()
            .filter(|(_, handle)| scheduler::cancel(&mut lock(handle).timer))
            .count()
    }

    fn handles(&self) -> Vec<(String, SessionHandle)> {
        let mut handles: Vec<(String, SessionHandle)> = self
            .map()
            .iter()
            .map(|(user, handle)| (user.clone(), handle.clone()))
            .collect();
        handles.sort_by(|a, b| a.0.cmp(&b.0));
        handles
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, SessionHandle>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub fn lock(handle: &Mutex<Session>) -> MutexGuard<'_, Session> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}
