//! Model-Specific Registers

/// Extended feature enable register.
pub const IA32_EFER: u32 = 0xC000_0080;
/// Segment selectors loaded by `syscall`/`sysret`.
pub const IA32_STAR: u32 = 0xC000_0081;
/// 64-bit `syscall` target RIP.
pub const IA32_LSTAR: u32 = 0xC000_0082;
/// RFLAGS bits cleared on `syscall`.
pub const IA32_FMASK: u32 = 0xC000_0084;

/// EFER.SCE: `syscall`/`sysret` enabled.
pub const EFER_SCE: u64 = 1 << 0;

/// Access to the current CPU's model-specific registers.
pub trait ModelSpecificRegisters {
    /// # Safety
    /// Reading a reserved MSR raises #GP.
    unsafe fn read(&self, msr: u32) -> u64;

    /// # Safety
    /// Writing an MSR changes CPU behaviour globally; the value must be
    /// valid for that register.
    unsafe fn write(&mut self, msr: u32, value: u64);
}

/// The executing CPU, via `rdmsr`/`wrmsr`.
#[cfg(target_arch = "x86_64")]
pub struct Cpu;

#[cfg(target_arch = "x86_64")]
impl ModelSpecificRegisters for Cpu {
    #[inline]
    unsafe fn read(&self, msr: u32) -> u64 {
        let (high, low): (u32, u32);
        // SAFETY: caller guarantees `msr` exists on this CPU
        unsafe {
            core::arch::asm!(
                "rdmsr",
                in("ecx") msr,
                out("eax") low,
                out("edx") high,
                options(nomem, nostack, preserves_flags),
            );
        }
        ((high as u64) << 32) | (low as u64)
    }

    #[inline]
    unsafe fn write(&mut self, msr: u32, value: u64) {
        let low = value as u32;
        let high = (value >> 32) as u32;
        // SAFETY: caller guarantees `value` is valid for `msr`
        unsafe {
            core::arch::asm!(
                "wrmsr",
                in("ecx") msr,
                in("eax") low,
                in("edx") high,
                options(nostack, preserves_flags),
            );
        }
    }
}
