//! Session state machine
//!
//! A session tracks the terminal-assigned session ID, the per-request
//! reply counter and the connection state. It is a plain value owned by
//! exactly one caller; the protocol allows a single outstanding request
//! per session, so there is nothing to share.

use crate::error::{Error, Result};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection
    Disconnected,

    /// Socket open, handshake in flight
    Connecting,

    /// Handshake (and authentication, when required) completed
    Connected,
}

/// Protocol session
///
/// Created by connect, destroyed by disconnect or socket failure.
#[derive(Debug)]
pub struct Session {
    /// Session ID assigned by device (0 when not connected)
    session_id: u16,

    /// Reply counter (starts at USHRT_MAX - 1 = 65534)
    reply_counter: u16,

    /// Current session state
    state: SessionState,
}

impl Session {
    /// Initial reply ID (from protocol manual: USHRT_MAX - 1)
    pub const INITIAL_REPLY_ID: u16 = u16::MAX - 1;

    /// Create a new disconnected session
    pub fn new() -> Self {
        Self {
            session_id: 0,
            reply_counter: Self::INITIAL_REPLY_ID,
            state: SessionState::Disconnected,
        }
    }

    /// Get current session ID
    pub fn session_id(&self) -> u16 {
        self.session_id
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check if the handshake has completed
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Enter the connecting state
    pub fn begin(&mut self) -> Result<()> {
        if self.state != SessionState::Disconnected {
            return Err(Error::InvalidSessionState(format!(
                "Cannot begin connecting from state: {:?}",
                self.state
            )));
        }

        self.state = SessionState::Connecting;
        Ok(())
    }

    /// Establish the session with the device-assigned session ID
    pub fn establish(&mut self, session_id: u16) -> Result<()> {
        if self.state != SessionState::Connecting {
            return Err(Error::InvalidSessionState(format!(
                "Cannot establish from state: {:?}",
                self.state
            )));
        }

        self.session_id = session_id;
        self.reply_counter = Self::INITIAL_REPLY_ID;
        self.state = SessionState::Connected;
        Ok(())
    }

    /// Close session
    ///
    /// Safe to call in any state, including after a socket failure.
    pub fn close(&mut self) {
        self.session_id = 0;
        self.reply_counter = Self::INITIAL_REPLY_ID;
        self.state = SessionState::Disconnected;
    }

    /// Get next reply ID
    ///
    /// Reply ID starts at 65534 and increments per command, wrapping
    /// after 65535.
    pub fn next_reply_id(&mut self) -> u16 {
        let current = self.reply_counter;
        self.reply_counter = self.reply_counter.wrapping_add(1);
        current
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_new() {
        let session = Session::new();
        assert_eq!(session.session_id(), 0);
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(!session.is_connected());
    }

    #[test]
    fn test_session_establish() {
        let mut session = Session::new();
        session.begin().unwrap();
        session.establish(1234).unwrap();

        assert_eq!(session.session_id(), 1234);
        assert_eq!(session.state(), SessionState::Connected);
        assert!(session.is_connected());
    }

    #[test]
    fn test_session_close() {
        let mut session = Session::new();
        session.begin().unwrap();
        session.establish(1234).unwrap();

        session.close();

        assert_eq!(session.session_id(), 0);
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_close_is_safe_in_any_state() {
        let mut session = Session::new();
        session.close();
        assert_eq!(session.state(), SessionState::Disconnected);

        session.begin().unwrap();
        session.close();
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_reply_id_generation() {
        let mut session = Session::new();
        session.begin().unwrap();
        session.establish(100).unwrap();

        assert_eq!(session.next_reply_id(), 65534);
        assert_eq!(session.next_reply_id(), 65535);
        assert_eq!(session.next_reply_id(), 0); // Wrapped
        assert_eq!(session.next_reply_id(), 1);
    }

    #[test]
    fn test_reconnect_resets_reply_counter() {
        let mut session = Session::new();
        session.begin().unwrap();
        session.establish(100).unwrap();
        session.next_reply_id();
        session.next_reply_id();

        session.close();
        session.begin().unwrap();
        session.establish(200).unwrap();

        assert_eq!(session.next_reply_id(), Session::INITIAL_REPLY_ID);
    }

    #[test]
    fn test_invalid_state_transitions() {
        let mut session = Session::new();

        // Cannot establish without beginning the handshake
        assert!(session.establish(100).is_err());

        // Cannot begin twice
        session.begin().unwrap();
        assert!(session.begin().is_err());

        // Cannot establish twice
        session.establish(100).unwrap();
        assert!(session.establish(200).is_err());
    }
}
