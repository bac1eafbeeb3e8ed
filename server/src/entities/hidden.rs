//! Visibility flags of a character.

/// Set of hide flags.
///
/// The low bits (`INVISIBLE`..`WARP`) are the effective state. The
/// `*_EXPLICIT` bits record that a flag was asked for directly rather than
/// implied by another one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HiddenFlags(u32);

impl HiddenFlags {
    pub const NONE: HiddenFlags = HiddenFlags(0);
    pub const INVISIBLE: HiddenFlags = HiddenFlags(0x01);
    pub const ONLINE: HiddenFlags = HiddenFlags(0x02);
    pub const NPC: HiddenFlags = HiddenFlags(0x04);
    pub const ADMIN: HiddenFlags = HiddenFlags(0x08);
    pub const WARP: HiddenFlags = HiddenFlags(0x10);
    pub const ALL: HiddenFlags = HiddenFlags(0x1F);

    pub const ONLINE_EXPLICIT: HiddenFlags = HiddenFlags(0x02_0000);
    pub const NPC_EXPLICIT: HiddenFlags = HiddenFlags(0x04_0000);
    pub const ADMIN_EXPLICIT: HiddenFlags = HiddenFlags(0x08_0000);
    pub const WARP_EXPLICIT: HiddenFlags = HiddenFlags(0x10_0000);

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, other: HiddenFlags) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: HiddenFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: HiddenFlags) {
        self.0 &= !other.0;
    }

    pub fn union(self, other: HiddenFlags) -> HiddenFlags {
        HiddenFlags(self.0 | other.0)
    }

    /// Only the effective low bits
    pub fn effective(&self) -> HiddenFlags {
        HiddenFlags(self.0 & Self::ALL.0)
    }

    /// Only the explicit request bits
    pub fn explicit(&self) -> HiddenFlags {
        HiddenFlags(self.0 & !Self::ALL.0)
    }

    pub fn is_invisible(&self) -> bool {
        self.contains(Self::INVISIBLE)
    }

    pub fn is_online(&self) -> bool {
        self.contains(Self::ONLINE)
    }

    pub fn is_npc(&self) -> bool {
        self.contains(Self::NPC)
    }

    pub fn is_admin(&self) -> bool {
        self.contains(Self::ADMIN)
    }

    pub fn is_warp(&self) -> bool {
        self.contains(Self::WARP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_bits_do_not_count_as_effective() {
        let mut flags = HiddenFlags::NONE;
        flags.insert(HiddenFlags::ONLINE_EXPLICIT);
        assert!(!flags.is_online());
        assert_eq!(flags.effective(), HiddenFlags::NONE);
        assert_eq!(flags.explicit(), HiddenFlags::ONLINE_EXPLICIT);

        flags.insert(HiddenFlags::ONLINE);
        assert!(flags.is_online());
        assert!(!flags.is_invisible());
    }

    #[test]
    fn test_remove() {
        let mut flags = HiddenFlags::ALL.union(HiddenFlags::WARP_EXPLICIT);
        flags.remove(HiddenFlags::WARP.union(HiddenFlags::WARP_EXPLICIT));
        assert!(!flags.is_warp());
        assert!(flags.is_admin());
        assert_eq!(flags.bits(), 0x0F);
    }
}
