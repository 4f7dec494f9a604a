//! Relay endpoints.
//!
//! One [`Endpoint`] per WebSocket connection on the relay. An endpoint may
//! claim a single lobby identifier and may be linked to at most one other
//! endpoint at a time.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("Identifier {0} is already taken")]
    IdTaken(String),

    #[error("Connection already registered as {0}")]
    AlreadyRegistered(String),

    #[error("Register before connecting")]
    NotRegistered,

    #[error("No client registered as {0}")]
    UnknownTarget(String),

    #[error("Cannot connect to yourself")]
    SelfLink,

    #[error("Client is already linked")]
    Busy,

    #[error("No open link")]
    NotLinked,
}

/// A connection to the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub conn: Uuid,
    /// Registered lobby identifier
    pub id: Option<String>,
    /// Connection on the other end of the open link
    pub remote: Option<Uuid>,
}

impl Endpoint {
    pub fn new(conn: Uuid) -> Self {
        Self {
            conn,
            id: None,
            remote: None,
        }
    }

    /// Check that `id` can be claimed by this endpoint.
    /// Registering the same identifier twice is allowed.
    pub fn can_register(&self, id: &str) -> Result<(), LinkError> {
        match &self.id {
            Some(current) if current != id => Err(LinkError::AlreadyRegistered(current.clone())),
            _ => Ok(()),
        }
    }

    pub fn is_linked(&self) -> bool {
        self.remote.is_some()
    }

    /// Link this endpoint to `remote`
    pub fn link(&mut self, remote: Uuid) -> Result<(), LinkError> {
        if remote == self.conn {
            return Err(LinkError::SelfLink);
        }
        if self.is_linked() {
            return Err(LinkError::Busy);
        }
        self.remote = Some(remote);
        Ok(())
    }

    /// Drop the link, returning the old remote
    pub fn unlink(&mut self) -> Option<Uuid> {
        self.remote.take()
    }

    /// Where data from this endpoint goes
    pub fn data_target(&self) -> Result<Uuid, LinkError> {
        self.remote.ok_or(LinkError::NotLinked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_once() {
        let mut endpoint = Endpoint::new(Uuid::new_v4());
        assert!(endpoint.can_register("dotmination-blank-host-1").is_ok());
        endpoint.id = Some("dotmination-blank-host-1".into());

        assert!(endpoint.can_register("dotmination-blank-host-1").is_ok());
        assert_eq!(
            endpoint.can_register("dotmination-blank-host-2"),
            Err(LinkError::AlreadyRegistered("dotmination-blank-host-1".into()))
        );
    }

    #[test]
    fn test_link_and_unlink() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut endpoint = Endpoint::new(a);

        assert_eq!(endpoint.data_target(), Err(LinkError::NotLinked));
        assert_eq!(endpoint.link(a), Err(LinkError::SelfLink));

        endpoint.link(b).unwrap();
        assert_eq!(endpoint.data_target(), Ok(b));
        assert_eq!(endpoint.link(Uuid::new_v4()), Err(LinkError::Busy));

        assert_eq!(endpoint.unlink(), Some(b));
        assert!(!endpoint.is_linked());
        assert_eq!(endpoint.unlink(), None);
    }
}
