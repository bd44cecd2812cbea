//! # GPU Core Registers
//!
//! The handful of registers the power controller touches directly: the
//! clock-control register and the identification pair used as a liveness
//! signature. Everything else is programmed by the bring-up routine.

use static_assertions::const_assert;

use crate::error::Result;
use crate::ports::RegisterPort;

// =============================================================================
// REGISTER OFFSETS
// =============================================================================

/// Register offsets from the core's register base
pub mod offsets {
    /// Clock control (frequency scaler and clock gating)
    pub const CLOCK_CONTROL: u32 = 0x0000_0000;
    /// Chip identification
    pub const CHIP_ID: u32 = 0x0000_0020;
    /// Chip revision
    pub const CHIP_REV: u32 = 0x0000_0024;
}

// =============================================================================
// CLOCK CONTROL
// =============================================================================

bitflags::bitflags! {
    /// Single-bit fields of the clock-control register
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClockControl: u32 {
        /// Gate the 3D pipe clock
        const DISABLE_3D = 1 << 0;
        /// Gate the 2D pipe clock
        const DISABLE_2D = 1 << 1;
        /// Latch the frequency scale value
        const FSCALE_LOAD = 1 << 9;
    }
}

/// Lowest bit of the frequency scale field
pub const FSCALE_SHIFT: u32 = 2;
/// Width of the frequency scale field
pub const FSCALE_WIDTH: u32 = 7;
/// Mask of the frequency scale field (unshifted)
pub const FSCALE_MASK: u32 = (1 << FSCALE_WIDTH) - 1;
/// Frequency scale value for full speed
pub const FSCALE_FULL: u32 = 64;

const_assert!(FSCALE_FULL <= FSCALE_MASK);
const_assert!(FSCALE_SHIFT + FSCALE_WIDTH <= 9);

/// Clock configuration applied for a power state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockProfile {
    /// Frequency scale (1..=64, 64 is full speed)
    pub fscale: u32,
    /// Gating bits applied together with the scale
    pub gating: ClockControl,
}

impl ClockProfile {
    /// Full speed, nothing gated
    pub const FULL: Self = Self {
        fscale: FSCALE_FULL,
        gating: ClockControl::empty(),
    };

    /// Minimum frequency, pipes still clocked
    pub const IDLE: Self = Self {
        fscale: 1,
        gating: ClockControl::empty(),
    };

    /// Minimum frequency, 2D pipe gated
    pub const SUSPEND: Self = Self {
        fscale: 1,
        gating: ClockControl::DISABLE_2D,
    };

    /// Minimum frequency, both pipes gated
    pub const OFF: Self = Self {
        fscale: 1,
        gating: ClockControl::DISABLE_2D.union(ClockControl::DISABLE_3D),
    };

    /// Encode the register value (without the load pulse)
    pub const fn encode(&self) -> u32 {
        let field = (self.fscale & FSCALE_MASK) << FSCALE_SHIFT;
        field | self.gating.bits()
    }

    /// Decode a clock-control register value
    pub const fn decode(value: u32) -> Self {
        Self {
            fscale: (value >> FSCALE_SHIFT) & FSCALE_MASK,
            gating: ClockControl::from_bits_truncate(
                value & (ClockControl::DISABLE_2D.bits() | ClockControl::DISABLE_3D.bits()),
            ),
        }
    }

    /// Program the profile: write with the load bit set, then clear it
    pub fn program(&self, port: &dyn RegisterPort) -> Result<()> {
        let value = self.encode();
        port.write(offsets::CLOCK_CONTROL, value | ClockControl::FSCALE_LOAD.bits())?;
        port.write(offsets::CLOCK_CONTROL, value)
    }
}

// =============================================================================
// CHIP SIGNATURE
// =============================================================================

/// Identification pair read back after power-up to prove the core is alive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipSignature {
    /// Value of the chip id register
    pub chip_id: u32,
    /// Value of the chip revision register
    pub revision: u32,
}

impl ChipSignature {
    /// Create a signature
    pub const fn new(chip_id: u32, revision: u32) -> Self {
        Self { chip_id, revision }
    }

    /// Read the signature currently reported by the hardware
    pub fn read(port: &dyn RegisterPort) -> Result<Self> {
        Ok(Self {
            chip_id: port.read(offsets::CHIP_ID)?,
            revision: port.read(offsets::CHIP_REV)?,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
