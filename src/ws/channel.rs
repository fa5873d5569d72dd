//! Private channel naming and subscription authorization.

use std::fmt;

use crate::domain::UserId;
use crate::error::GatewayError;

const PREFIX: &str = "notifications.";

/// Name of a user's private notification channel: `notifications.{user_id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelName {
    owner: UserId,
}

impl ChannelName {
    /// The channel belonging to `user`.
    #[must_use]
    pub const fn for_user(user: UserId) -> Self {
        Self { owner: user }
    }

    /// Parses a raw channel name.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] if `raw` is not of the form
    /// `notifications.{uuid}`.
    pub fn parse(raw: &str) -> Result<Self, GatewayError> {
        let owner = raw
            .strip_prefix(PREFIX)
            .and_then(|id| id.parse::<UserId>().ok())
            .ok_or_else(|| GatewayError::Validation(format!("unknown channel: {raw}")))?;
        Ok(Self { owner })
    }

    /// The user this channel belongs to.
    #[must_use]
    pub const fn owner(&self) -> UserId {
        self.owner
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}{}", self.owner)
    }
}

/// Checks that `subscriber` may listen on the channel named `raw`.
///
/// Only the channel's own user is allowed.
///
/// # Errors
///
/// Returns [`GatewayError::Validation`] for a malformed name and
/// [`GatewayError::Authorization`] for somebody else's channel.
pub fn authorize(subscriber: UserId, raw: &str) -> Result<ChannelName, GatewayError> {
    let channel = ChannelName::parse(raw)?;
    if channel.owner() != subscriber {
        return Err(GatewayError::Authorization(format!(
            "not allowed to subscribe to {channel}"
        )));
    }
    Ok(channel)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn name_round_trips_through_display() {
        let user = UserId::new();
        let name = ChannelName::for_user(user).to_string();
        assert_eq!(name, format!("notifications.{user}"));
        let Ok(parsed) = ChannelName::parse(&name) else {
            panic!("own name should parse");
        };
        assert_eq!(parsed.owner(), user);
    }

    #[test]
    fn malformed_names_are_rejected() {
        for raw in ["notifications.", "notifications.42", "private-user.x", ""] {
            assert!(matches!(
                ChannelName::parse(raw),
                Err(GatewayError::Validation(_))
            ));
        }
    }

    #[test]
    fn only_the_channel_owner_is_authorized() {
        let alice = UserId::new();
        let bob = UserId::new();
        let name = ChannelName::for_user(alice).to_string();

        assert!(authorize(alice, &name).is_ok());
        assert!(matches!(
            authorize(bob, &name),
            Err(GatewayError::Authorization(_))
        ));
    }
}
