//! The interrupts-disabled token (§9 design notes).
//!
//! Every shared kernel singleton (`process`'s table, `scheduler`'s ready
//! queue, `gdt`'s TSS) is a plain `spin::Mutex`, which is enough on a
//! single CPU as long as nothing ever locks one from both ordinary
//! control flow and an interrupt handler re-entrantly. [`InterruptsDisabled`]
//! makes "this runs with interrupts off" a type a caller can be asked
//! for, instead of a convention callers have to remember.

/// Proof that interrupts are currently disabled. Can only be constructed
/// by [`with_interrupts_disabled`]; holding one is evidence an interrupt
/// handler cannot reentrantly observe the critical section it guards.
pub struct InterruptsDisabled(());

/// Disable interrupts, run `f`, then restore whatever `EFLAGS.IF` state
/// was in effect before.
pub fn with_interrupts_disabled<R>(f: impl FnOnce(InterruptsDisabled) -> R) -> R {
    crate::port::without_interrupts(|| f(InterruptsDisabled(())))
}
