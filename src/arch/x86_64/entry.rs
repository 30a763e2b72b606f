//! System Call Entry Configuration
//!
//! Programs the MSRs behind the `syscall` instruction once at boot:
//! - EFER.SCE enables `syscall`/`sysret`
//! - LSTAR holds the trampoline address
//! - STAR holds the kernel and user code selectors
//! - FMASK clears IF (and friends) on entry, so no interrupt is taken
//!   before the trampoline has switched from the user stack to the kernel
//!   stack
//!
//! # SYSCALL/SYSRET selector arithmetic
//! ```text
//! SYSCALL: CS = STAR[47:32]        SS = STAR[47:32] + 8
//! SYSRET:  CS = STAR[63:48] + 16   SS = STAR[63:48] + 8
//! ```

use super::msr::{
    ModelSpecificRegisters, EFER_SCE, IA32_EFER, IA32_FMASK, IA32_LSTAR, IA32_STAR,
};
use super::rflags::RFlags;

/// GDT selectors, shared with the GDT setup.
pub mod selectors {
    pub const SEL_KCSEG: u16 = 0x08;
    pub const SEL_KDSEG: u16 = 0x10;
    pub const SEL_UDSEG: u16 = 0x1B;
    pub const SEL_UCSEG: u16 = 0x23;
}

use selectors::*;

// sysret derives user SS and CS from one base; syscall derives kernel SS
// from kernel CS. A GDT that breaks either rule must not build.
const _: () = assert!(SEL_UCSEG - 0x10 + 8 == SEL_UDSEG);
const _: () = assert!(SEL_KCSEG + 8 == SEL_KDSEG);

/// Value programmed into STAR.
pub const STAR_VALUE: u64 = (((SEL_UCSEG - 0x10) as u64) << 48) | ((SEL_KCSEG as u64) << 32);

/// RFLAGS bits cleared on every `syscall`.
pub const SYSCALL_MASK: RFlags = RFlags::IF
    .union(RFlags::TF)
    .union(RFlags::DF)
    .union(RFlags::IOPL)
    .union(RFlags::AC)
    .union(RFlags::NT);

/// Install `entry` as the `syscall` target and arm the entry flag mask.
///
/// # Safety
/// Must be called once per CPU during initialization, before user mode is
/// entered. `entry` must be the address of the trampoline, and the GDT must
/// hold the selectors in [`selectors`].
pub unsafe fn configure<M: ModelSpecificRegisters>(msrs: &mut M, entry: u64) {
    // SAFETY: all four MSRs are architectural on x86-64 and the values
    // below are well-formed; the caller upholds the rest.
    unsafe {
        let efer = msrs.read(IA32_EFER);
        if efer & EFER_SCE == 0 {
            msrs.write(IA32_EFER, efer | EFER_SCE);
        }

        msrs.write(IA32_STAR, STAR_VALUE);
        msrs.write(IA32_LSTAR, entry);
        msrs.write(IA32_FMASK, SYSCALL_MASK.bits());
    }

    log::info!(
        "[BOOT] syscall entry at {:#x}, STAR {:#018x}, FMASK {:#x}",
        entry,
        STAR_VALUE,
        SYSCALL_MASK.bits()
    );
}
