//! Channel: a 1-indexed digital input or output on the relay box.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// Number of digital inputs and of digital outputs on the relay box.
pub const CHANNEL_COUNT: u8 = 8;

/// A channel number in `1..=8`.
///
/// Channels are 1-indexed in every user-facing surface (step language,
/// configuration files, logs). [`Channel::index`] and [`Channel::bit`]
/// give the 0-based position used by bitmasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Channel(u8);

impl Channel {
    /// Build a channel, returning `None` outside `1..=8`.
    #[must_use]
    pub const fn new(number: u8) -> Option<Self> {
        if number >= 1 && number <= CHANNEL_COUNT {
            Some(Self(number))
        } else {
            None
        }
    }

    /// The 1-indexed channel number.
    #[must_use]
    pub const fn number(self) -> u8 {
        self.0
    }

    /// The 0-based position of this channel.
    #[must_use]
    pub const fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// The bit of this channel inside an 8-channel mask.
    #[must_use]
    pub const fn bit(self) -> u8 {
        1 << (self.0 - 1)
    }

    /// All channels in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (1..=CHANNEL_COUNT).map(Self)
    }
}

impl TryFrom<u8> for Channel {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(ValidationError::ChannelOutOfRange(u64::from(value)))
    }
}

impl From<Channel> for u8 {
    fn from(channel: Channel) -> Self {
        channel.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Desired output levels keyed by channel (`initial_states`, `end_states`).
///
/// Persisted as a JSON object with stringified channel keys, e.g.
/// `{"1": true, "3": false}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateMap(BTreeMap<Channel, bool>);

impl StateMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the desired level of `channel`, replacing any previous value.
    pub fn insert(&mut self, channel: Channel, on: bool) {
        self.0.insert(channel, on);
    }

    #[must_use]
    pub fn get(&self, channel: Channel) -> Option<bool> {
        self.0.get(&channel).copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate in ascending channel order.
    pub fn iter(&self) -> impl Iterator<Item = (Channel, bool)> + '_ {
        self.0.iter().map(|(channel, on)| (*channel, *on))
    }
}

impl FromIterator<(Channel, bool)> for StateMap {
    fn from_iter<T: IntoIterator<Item = (Channel, bool)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for StateMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, (channel, on)) in self.iter().enumerate() {
            if position > 0 {
                f.write_str(", ")?;
            }
            write!(f, "DO{channel}={}", if on { "ON" } else { "OFF" })?;
        }
        Ok(())
    }
}

impl Serialize for StateMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(channel, on)| (channel.to_string(), *on)))
    }
}

impl<'de> Deserialize<'de> for StateMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, bool>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(key, on)| {
                let channel = key
                    .trim()
                    .parse::<u8>()
                    .ok()
                    .and_then(Channel::new)
                    .ok_or_else(|| {
                        serde::de::Error::custom(format!("invalid channel key `{key}`"))
                    })?;
                Ok((channel, on))
            })
            .collect()
    }
}
