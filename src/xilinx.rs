//! Xilinx 7-series TAP instructions and silicon IDs.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Width of the instruction register on single-die 7-series parts.
pub const IR_LENGTH: u32 = 6;

/// Mask selecting the silicon ID; the top nibble holds the die revision.
pub const IDCODE_MASK: u32 = 0x0FFF_FFFF;

#[derive(Copy, Clone, Debug, Eq, PartialEq, IntoPrimitive)]
#[repr(u8)]
pub enum Instruction {
    CfgIn       = 0x05,
    Idcode      = 0x09,
    Jprogram    = 0x0B,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, TryFromPrimitive)]
#[allow(clippy::upper_case_acronyms)]
#[repr(u32)]
pub enum DeviceId {
    XC7S6       = 0x0362_2093,
    XC7S15      = 0x0362_0093,
    XC7S25      = 0x037C_4093,
    XC7S50      = 0x0362_F093,
    XC7S75      = 0x037C_8093,
    XC7S100     = 0x037C_7093,
    XC7A35T     = 0x0362_D093,
    XC7A50T     = 0x0362_C093,
    XC7A75T     = 0x0363_2093,
    XC7A100T    = 0x0363_1093,
    XC7A200T    = 0x0363_6093,
    XC7K70T     = 0x0364_7093,
    XC7K160T    = 0x0364_C093,
    XC7K325T    = 0x0365_1093,
    XC7K410T    = 0x0365_6093,
    XC7Z007S    = 0x0372_3093,
    XC7Z010     = 0x0372_2093,
    XC7Z015     = 0x0373_B093,
    XC7Z020     = 0x0372_7093,
    XC7Z030     = 0x0372_C093,
    XC7Z045     = 0x0373_1093,
}

impl DeviceId {
    /// Look up a raw or already masked IDCODE.
    pub fn from_idcode(idcode: u32) -> Option<Self> {
        Self::try_from(idcode & IDCODE_MASK).ok()
    }

    pub fn name(&self) -> &'static str {
        match self {
            DeviceId::XC7S6 => "XC7S6",
            DeviceId::XC7S15 => "XC7S15",
            DeviceId::XC7S25 => "XC7S25",
            DeviceId::XC7S50 => "XC7S50",
            DeviceId::XC7S75 => "XC7S75",
            DeviceId::XC7S100 => "XC7S100",
            DeviceId::XC7A35T => "XC7A35T",
            DeviceId::XC7A50T => "XC7A50T",
            DeviceId::XC7A75T => "XC7A75T",
            DeviceId::XC7A100T => "XC7A100T",
            DeviceId::XC7A200T => "XC7A200T",
            DeviceId::XC7K70T => "XC7K70T",
            DeviceId::XC7K160T => "XC7K160T",
            DeviceId::XC7K325T => "XC7K325T",
            DeviceId::XC7K410T => "XC7K410T",
            DeviceId::XC7Z007S => "XC7Z007S",
            DeviceId::XC7Z010 => "XC7Z010",
            DeviceId::XC7Z015 => "XC7Z015",
            DeviceId::XC7Z020 => "XC7Z020",
            DeviceId::XC7Z030 => "XC7Z030",
            DeviceId::XC7Z045 => "XC7Z045",
        }
    }
}
