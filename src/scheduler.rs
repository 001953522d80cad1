//! Cooperative scheduler (C12): a fixed-capacity ready queue of
//! not-yet-started processes, consumed on timer tick or process exit.
//!
//! `original_source/src/managers/scheduler/scheduler.c`'s `scheduler_tick`
//! is a stub — a literal `/* TODO: Implement context saving/switching */`
//! that never dequeues or switches anything. Per the design notes this
//! rewrite implements the fuller behavior the surrounding source clearly
//! intends: a process that has never run waits here; once the CPU has
//! nothing running, the next ready PID is dequeued, its kernel stack is
//! installed in the TSS, and the trampoline transitions into it. Already
//! running processes are never preempted — there is no mechanism here to
//! resume one once another has started, matching §4.12's explicit scope.

use core::arch::naked_asm;
use core::sync::atomic::{AtomicBool, Ordering};

use crossbeam_queue::ArrayQueue;
use spin::Once;

use crate::config::{IRQ_MOUSE, PIC_2_OFFSET, SCHEDULER_QUEUE_CAPACITY};
use crate::error::{KernelError, KernelResult};
use crate::{drivers, gdt, pic, process, serial_println, trampoline};

static READY_QUEUE: Once<ArrayQueue<u32>> = Once::new();
static ENABLED: AtomicBool = AtomicBool::new(false);

fn queue() -> &'static ArrayQueue<u32> {
    READY_QUEUE.call_once(|| ArrayQueue::new(SCHEDULER_QUEUE_CAPACITY))
}

/// Reset the ready queue and mark the scheduler disabled. Idempotent;
/// call once during bringup before enabling interrupts.
pub fn init() {
    while queue().pop().is_some() {}
    ENABLED.store(false, Ordering::SeqCst);
}

/// Allow [`on_timer_tick`] to act on the ready queue. Call once bringup
/// has installed the timer and mouse IRQ gates.
pub fn enable() {
    ENABLED.store(true, Ordering::SeqCst);
}

pub fn disable() {
    ENABLED.store(false, Ordering::SeqCst);
}

/// Enqueue a registered-but-not-started PID. Logged and dropped (not
/// propagated as a bringup failure, per §7) if the queue is full.
pub fn enqueue(pid: u32) {
    if queue().push(pid).is_err() {
        serial_println!("[scheduler] ready queue full, dropping pid {pid}");
    }
}

/// Called from the timer IRQ. A no-op unless the scheduler is enabled
/// and nothing is currently running in ring 3 — this never preempts a
/// process that has already started.
pub fn on_timer_tick() {
    if !ENABLED.load(Ordering::SeqCst) {
        return;
    }
    if process::current().is_some() {
        return;
    }
    run_next();
}

/// Dequeue the next ready PID and trampoline into it. If the queue is
/// empty, returns normally (the timer handler resumes its `iret`); the
/// exit syscall path calling this instead never returns, since there is
/// nothing left to resume it.
pub fn run_next() {
    let Some(pid) = queue().pop() else {
        return;
    };
    let Some(pcb) = process::start(pid) else {
        return;
    };
    gdt::set_kernel_stack(pcb.kernel_stack_top);
    // SAFETY: `pcb.entry`/`pcb.user_stack_top` were carved for this PID
    // by `process::create` and never reused.
    unsafe {
        trampoline::enter_ring3(pcb.entry, pcb.user_stack_top);
    }
}

/// Register `entry` as a new process and enqueue it to run once the CPU
/// is idle. Used by the `create_process` syscall arm.
pub fn spawn(entry: u32) -> KernelResult<u32> {
    let pcb = process::create(entry)?;
    enqueue(pcb.pid);
    Ok(pcb.pid)
}

extern "C" fn handle_mouse_irq() {
    drivers::mouse::on_irq();
    pic::end_of_interrupt(IRQ_MOUSE);
}

/// Naked IRQ12 (PS/2 mouse, slave line 4) gate.
#[naked]
pub unsafe extern "C" fn stub_irq12_mouse() {
    // SAFETY: installed directly as the IRQ12 interrupt-gate handler.
    unsafe {
        naked_asm!(
            "pushad",
            "call {handler}",
            "popad",
            "iretd",
            handler = sym handle_mouse_irq,
        );
    }
}

#[allow(dead_code)]
const fn assert_slave_offset_matches_mouse_vector() {
    assert!(PIC_2_OFFSET as u32 + (IRQ_MOUSE as u32 - 8) < 256);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn enqueue_then_run_next_starts_the_process() {
        process::init();
        init();
        let pcb = process::create(0x1000).expect("create should succeed");
        enqueue(pcb.pid);
        assert_eq!(queue().len(), 1);
    }
}
