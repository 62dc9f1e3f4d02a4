use core::fmt;
use core::num::NonZeroU32;

/// Slot of a part in the vehicle component arena.
///
/// Stored as slot+1 in a `NonZeroU32` so `Option<PartId>` (the parent link)
/// costs nothing extra.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartId(NonZeroU32);

impl PartId {
    /// The root container always occupies slot 0.
    pub const ROOT: PartId = PartId(NonZeroU32::MIN);

    pub fn from_slot(slot: usize) -> Self {
        let raw = u32::try_from(slot).unwrap_or(u32::MAX - 1);
        match NonZeroU32::new(raw + 1) {
            Some(v) => Self(v),
            None => Self::ROOT,
        }
    }

    pub fn slot(self) -> usize {
        (self.0.get() - 1) as usize
    }

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

impl fmt::Debug for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "part#{}", self.slot())
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.slot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_survive_conversion() {
        for slot in [0_usize, 1, 7, 300, 65_536] {
            assert_eq!(PartId::from_slot(slot).slot(), slot);
        }
        assert!(PartId::from_slot(0).is_root());
        assert!(!PartId::from_slot(3).is_root());
    }

    #[test]
    fn parent_link_is_niche_packed() {
        assert_eq!(
            core::mem::size_of::<PartId>(),
            core::mem::size_of::<Option<PartId>>()
        );
    }

    #[test]
    fn display_shows_slot() {
        assert_eq!(PartId::from_slot(4).to_string(), "#4");
        assert_eq!(format!("{:?}", PartId::ROOT), "part#0");
    }
}
