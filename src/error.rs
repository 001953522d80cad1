//! Kernel-wide error type (§3.1, §7).
//!
//! Bringup steps and driver init paths propagate this with `?`; the
//! bringup-failure policy in §7 is "halt the CPU", so these errors are
//! never recovered from, only logged precisely before the halt.

use core::fmt;

/// Everything that can go wrong during bringup or in a driver-init path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// The physical frame allocator ran out of pages.
    OutOfFrames,
    /// The kernel heap could not satisfy an allocation request.
    OutOfHeap,
    /// The multiboot info structure failed a sanity check (missing
    /// module-info flag, zero modules, unaligned module range, ...).
    InvalidModuleTable,
    /// The scheduler's ready queue was full; the enqueue was dropped.
    ///
    /// Per §7 this is non-fatal and is only ever logged, never
    /// propagated up as a bringup failure.
    SchedulerQueueFull,
    /// The process table has no free slots left (`MAX_PROCESSES` reached).
    ProcessTableFull,
    /// The syscall dispatcher received a number with no registered arm.
    UnknownSyscall(u32),
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::OutOfFrames => write!(f, "physical frame allocator exhausted"),
            Self::OutOfHeap => write!(f, "kernel heap allocation failed"),
            Self::InvalidModuleTable => write!(f, "multiboot module table failed validation"),
            Self::SchedulerQueueFull => write!(f, "scheduler ready queue is full"),
            Self::ProcessTableFull => write!(f, "process table has no free slots"),
            Self::UnknownSyscall(n) => write!(f, "unknown syscall number {n}"),
        }
    }
}

/// Convenience alias used throughout bringup and driver-init code.
pub type KernelResult<T> = Result<T, KernelError>;
