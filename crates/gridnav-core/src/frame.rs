//! Fixed set of named, double-buffered sensor channels.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pattern::Tensor2;

/// Number of sensor channels exposed to external readers.
pub const NUM_CHANNELS: usize = 6;

/// Named output channels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Barrier contact per egocentric direction, one-hot `(clear, contact)` rows.
    Proximal,
    /// Ring code of the heading angle.
    Heading,
    /// One-hot `(left, none, right)` of the last rotation.
    Rotation,
    /// 2D bump code of the continuous position.
    Position,
    /// Pattern of the last applied action.
    Action,
    /// Pattern of the material in front of the agent.
    Material,
}

impl Channel {
    pub const ALL: [Self; NUM_CHANNELS] = [
        Self::Proximal,
        Self::Heading,
        Self::Rotation,
        Self::Position,
        Self::Action,
        Self::Material,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Proximal => "Proximal",
            Self::Heading => "Heading",
            Self::Rotation => "Rotation",
            Self::Position => "Position",
            Self::Action => "Action",
            Self::Material => "Material",
        }
    }

    /// Look up a channel by name; unknown names yield `None`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|channel| channel.as_str() == name)
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Buffered {
    cur: Tensor2,
    next: Tensor2,
}

/// Current and next tensors for every channel.
///
/// Rendering writes `next`; [`SensorFrame::publish`] copies it into `cur` so readers see a
/// stable tick until the following publish.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorFrame {
    channels: [Buffered; NUM_CHANNELS],
}

impl SensorFrame {
    /// Zeroed frame using `shape` for each channel.
    pub fn new(shape: impl Fn(Channel) -> [usize; 2]) -> Self {
        Self {
            channels: Channel::ALL.map(|channel| {
                let zeros = Tensor2::zeros(shape(channel));
                Buffered {
                    cur: zeros.clone(),
                    next: zeros,
                }
            }),
        }
    }

    /// Published tensor for `channel`.
    #[must_use]
    pub fn current(&self, channel: Channel) -> &Tensor2 {
        &self.channels[channel.index()].cur
    }

    /// Published tensor for a channel name, or `None` for unknown names.
    #[must_use]
    pub fn state(&self, name: &str) -> Option<&Tensor2> {
        Channel::from_name(name).map(|channel| self.current(channel))
    }

    /// Pending tensor for `channel`.
    #[must_use]
    pub fn next(&self, channel: Channel) -> &Tensor2 {
        &self.channels[channel.index()].next
    }

    #[must_use]
    pub fn next_mut(&mut self, channel: Channel) -> &mut Tensor2 {
        &mut self.channels[channel.index()].next
    }

    /// Publish every pending tensor as the current one, leaving `next` intact.
    pub fn publish(&mut self) {
        for buffered in &mut self.channels {
            buffered.cur.clone_from(&buffered.next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> SensorFrame {
        SensorFrame::new(|channel| match channel {
            Channel::Proximal => [4, 2],
            Channel::Rotation => [1, 3],
            _ => [2, 2],
        })
    }

    #[test]
    fn unknown_channel_names_are_absent() {
        let frame = frame();
        assert!(frame.state("Proximal").is_some());
        assert!(frame.state("Smell").is_none());
        assert!(frame.state("proximal").is_none());
    }

    #[test]
    fn writes_are_hidden_until_publish() {
        let mut frame = frame();
        frame.next_mut(Channel::Rotation).set(0, 2, 1.0);
        assert_eq!(frame.current(Channel::Rotation).get(0, 2), Some(0.0));
        frame.publish();
        assert_eq!(frame.current(Channel::Rotation).get(0, 2), Some(1.0));
        assert_eq!(frame.current(Channel::Proximal).shape(), [4, 2]);
    }

    #[test]
    fn repeated_publish_is_stable() {
        let mut frame = frame();
        frame.next_mut(Channel::Heading).fill(0.5);
        frame.publish();
        frame.publish();
        assert_eq!(frame.current(Channel::Heading), frame.next(Channel::Heading));
        assert_eq!(frame.current(Channel::Heading).get(1, 1), Some(0.5));
    }
}
