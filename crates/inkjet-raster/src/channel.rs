//! Ink channels and fixed-size per-channel storage.

use std::fmt;
use std::ops::{Index, IndexMut};

/// One physical ink channel of the print head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Black
    K,
    /// Cyan
    C,
    /// Magenta
    M,
    /// Yellow
    Y,
    /// Light cyan (photo ink)
    LightC,
    /// Light magenta (photo ink)
    LightM,
}

impl Channel {
    /// All channels in storage order.
    pub const ALL: [Channel; 6] = [
        Channel::K,
        Channel::C,
        Channel::M,
        Channel::Y,
        Channel::LightC,
        Channel::LightM,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Channel::K => 0,
            Channel::C => 1,
            Channel::M => 2,
            Channel::Y => 3,
            Channel::LightC => 4,
            Channel::LightM => 5,
        }
    }

    /// The light-ink companion of a dark channel, if the head has one.
    pub const fn light(self) -> Option<Channel> {
        match self {
            Channel::C => Some(Channel::LightC),
            Channel::M => Some(Channel::LightM),
            _ => None,
        }
    }

    /// Single-letter code used in dumps and logs.
    pub const fn code(self) -> char {
        match self {
            Channel::K => 'K',
            Channel::C => 'C',
            Channel::M => 'M',
            Channel::Y => 'Y',
            Channel::LightC => 'c',
            Channel::LightM => 'm',
        }
    }

    /// Inverse of [`Channel::index`].
    pub fn from_index(index: usize) -> Option<Channel> {
        Channel::ALL.get(index).copied()
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Which channels a printer carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InkSet {
    /// Black only.
    Monochrome,
    /// Cyan, magenta and yellow without black.
    ThreeColor,
    /// CMYK.
    #[default]
    FourColor,
    /// CMYK plus light cyan and light magenta.
    SixColor,
}

impl InkSet {
    pub fn channels(self) -> &'static [Channel] {
        match self {
            InkSet::Monochrome => &[Channel::K],
            InkSet::ThreeColor => &[Channel::C, Channel::M, Channel::Y],
            InkSet::FourColor => &[Channel::K, Channel::C, Channel::M, Channel::Y],
            InkSet::SixColor => &Channel::ALL,
        }
    }

    #[inline]
    pub fn has(self, channel: Channel) -> bool {
        self.channels().contains(&channel)
    }

    #[inline]
    pub fn has_black(self) -> bool {
        self.has(Channel::K)
    }

    #[inline]
    pub fn is_monochrome(self) -> bool {
        self == InkSet::Monochrome
    }
}

/// Constant-time map from [`Channel`] to `T`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelMap<T> {
    slots: [T; 6],
}

impl<T> ChannelMap<T> {
    /// Build a map by evaluating `f` for every channel.
    pub fn from_fn(mut f: impl FnMut(Channel) -> T) -> Self {
        Self {
            slots: Channel::ALL.map(&mut f),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, &T)> {
        Channel::ALL.iter().copied().zip(self.slots.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Channel, &mut T)> {
        Channel::ALL.iter().copied().zip(self.slots.iter_mut())
    }

    /// Borrow two different channels mutably at once.
    ///
    /// # Panics
    ///
    /// Panics if `a == b`.
    pub fn pair_mut(&mut self, a: Channel, b: Channel) -> (&mut T, &mut T) {
        assert_ne!(a, b, "pair_mut needs two distinct channels");
        let (ia, ib) = (a.index(), b.index());
        if ia < ib {
            let (lo, hi) = self.slots.split_at_mut(ib);
            (&mut lo[ia], &mut hi[0])
        } else {
            let (lo, hi) = self.slots.split_at_mut(ia);
            (&mut hi[0], &mut lo[ib])
        }
    }
}

impl<T> Index<Channel> for ChannelMap<T> {
    type Output = T;

    #[inline]
    fn index(&self, channel: Channel) -> &T {
        &self.slots[channel.index()]
    }
}

impl<T> IndexMut<Channel> for ChannelMap<T> {
    #[inline]
    fn index_mut(&mut self, channel: Channel) -> &mut T {
        &mut self.slots[channel.index()]
    }
}
