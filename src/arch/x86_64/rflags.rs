//! RFLAGS register bits

use bitflags::bitflags;

bitflags! {
    /// Bits of the RFLAGS register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RFlags: u64 {
        /// Trap flag (single-step).
        const TF = 1 << 8;
        /// Interrupt enable.
        const IF = 1 << 9;
        /// String direction.
        const DF = 1 << 10;
        /// I/O privilege level (two bits).
        const IOPL = 3 << 12;
        /// Nested task.
        const NT = 1 << 14;
        /// Alignment check / SMAP override.
        const AC = 1 << 18;
    }
}
