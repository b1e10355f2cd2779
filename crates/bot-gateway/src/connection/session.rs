//! Session bookkeeping
//!
//! Tracks what a Resume needs: the session ID and resume URL issued by READY and the
//! sequence watermark.

use crate::events::{BotUser, SessionInfo};
use crate::protocol::ResumePayload;

/// Resume state carried across reconnects
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    session_id: Option<String>,
    sequence: Option<u64>,
    user: Option<BotUser>,
    resume_gateway_url: Option<String>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    pub fn user(&self) -> Option<&BotUser> {
        self.user.as_ref()
    }

    /// Record a READY; a resume URL that is not `wss://` is dropped
    pub fn establish(
        &mut self,
        session_id: String,
        user: BotUser,
        resume_gateway_url: Option<String>,
    ) {
        self.session_id = Some(session_id);
        self.user = Some(user);
        self.resume_gateway_url = resume_gateway_url.filter(|url| url.starts_with("wss://"));
    }

    /// URL to reconnect to for a Resume
    ///
    /// READY hands out a bare host; the query of `gateway_url` (version and encoding)
    /// is carried over unless the resume URL has its own.
    pub fn resume_url(&self, gateway_url: &str) -> Option<String> {
        let base = self.resume_gateway_url.as_deref()?;
        if base.contains('?') {
            return Some(base.to_string());
        }
        match gateway_url.split_once('?') {
            Some((_, query)) => Some(format!("{}/?{query}", base.trim_end_matches('/'))),
            None => Some(base.to_string()),
        }
    }

    /// Advance the watermark; returns `false` if `seq` would move it backward
    pub fn observe_sequence(&mut self, seq: u64) -> bool {
        match self.sequence {
            Some(current) if seq < current => false,
            _ => {
                self.sequence = Some(seq);
                true
            }
        }
    }

    /// Start a new watermark; READY opens a new session whose numbering starts over
    pub fn restart_sequence(&mut self, seq: u64) {
        self.sequence = Some(seq);
    }

    /// A Resume needs both the session ID and a sequence
    pub fn can_resume(&self) -> bool {
        self.session_id.is_some() && self.sequence.is_some()
    }

    /// Build the Resume payload, or `None` if the session is not resumable
    pub fn resume_payload(&self, token: &str) -> Option<ResumePayload> {
        match (&self.session_id, self.sequence) {
            (Some(session_id), Some(seq)) => Some(ResumePayload {
                token: token.to_string(),
                session_id: session_id.clone(),
                seq,
            }),
            _ => None,
        }
    }

    /// Forget the session ID and sequence; the next handshake will Identify
    ///
    /// The bot user is kept so observers still know who they are.
    pub fn invalidate(&mut self) {
        self.session_id = None;
        self.sequence = None;
        self.resume_gateway_url = None;
    }

    /// Snapshot for observers, if a session exists
    pub fn info(&self, resumed: bool) -> Option<SessionInfo> {
        self.session_id.as_ref().map(|session_id| SessionInfo {
            session_id: session_id.clone(),
            user: self.user.clone(),
            resumed,
        })
    }
}
