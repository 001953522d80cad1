//! Process table (C10): a fixed-capacity PCB array and the per-process
//! stack ranges processes are carved from.
//!
//! Grounded on `original_source/src/managers/process/process_manager.c`:
//! `MAX_PROCESSES` slots, `process_table[pid - 1]` indexing, a monotonic
//! `next_pid` starting at 1. The source allocates one PCB per process
//! from `kmalloc` and calls `ring3_switch` inline from both
//! `process_create_sysman` and `process_create`, which is the reentrancy
//! hazard noted in the design notes: a syscall-triggered `process_create`
//! would jump straight to ring 3 without ever returning to the caller
//! that issued the syscall. This rewrite instead only has
//! [`create_sysman`] transition directly; [`create`] registers the PCB
//! and leaves starting it to [`crate::scheduler`].

use spin::Mutex;

use crate::config::{
    KERNEL_STACK_REGION_BASE, KERNEL_STACK_SIZE, MAX_PROCESSES, USER_STACK_REGION_BASE,
    USER_STACK_SIZE,
};
use crate::error::{KernelError, KernelResult};
use crate::trampoline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Registered but not yet transitioned to ring 3.
    Ready,
    /// Currently the one process executing in ring 3.
    Running,
    /// Exited; the slot is retained for [`get`]/[`count`] bookkeeping.
    Terminated,
}

#[derive(Debug, Clone, Copy)]
pub struct Pcb {
    pub pid: u32,
    pub entry: u32,
    pub user_stack_top: u32,
    pub kernel_stack_top: u32,
    pub state: ProcessState,
}

struct Table {
    slots: [Option<Pcb>; MAX_PROCESSES],
    next_pid: u32,
    running: Option<u32>,
}

impl Table {
    const fn new() -> Self {
        Self {
            slots: [None; MAX_PROCESSES],
            next_pid: 1,
            running: None,
        }
    }
}

static TABLE: Mutex<Table> = Mutex::new(Table::new());

fn stack_range_for(slot: usize) -> (u32, u32) {
    let user_top = USER_STACK_REGION_BASE + (slot as u32 + 1) * USER_STACK_SIZE;
    let kernel_top = KERNEL_STACK_REGION_BASE + (slot as u32 + 1) * KERNEL_STACK_SIZE;
    (user_top, kernel_top)
}

fn register(entry: u32, state: ProcessState) -> KernelResult<Pcb> {
    let mut table = TABLE.lock();
    let pid = table.next_pid;
    if pid as usize > MAX_PROCESSES {
        return Err(KernelError::ProcessTableFull);
    }
    let slot = pid as usize - 1;
    let (user_stack_top, kernel_stack_top) = stack_range_for(slot);
    let pcb = Pcb {
        pid,
        entry,
        user_stack_top,
        kernel_stack_top,
        state,
    };
    table.slots[slot] = Some(pcb);
    table.next_pid += 1;
    Ok(pcb)
}

/// Clear the process table. Idempotent; call once during bringup.
pub fn init() {
    let mut table = TABLE.lock();
    *table = Table::new();
}

/// Register PID 1 (`sysman`) and transition straight to ring 3.
/// Never returns.
pub fn create_sysman(entry: u32) -> ! {
    let pcb = register(entry, ProcessState::Running).unwrap_or_else(|_| {
        panic!("process table must be empty when creating the sysman process")
    });
    {
        let mut table = TABLE.lock();
        table.running = Some(pcb.pid);
    }
    crate::gdt::set_kernel_stack(pcb.kernel_stack_top);
    // SAFETY: `pcb.entry` and `pcb.user_stack_top` were just carved from
    // the process-local stack region and have never been mapped to
    // anything else.
    unsafe { trampoline::enter_ring3(pcb.entry, pcb.user_stack_top) }
}

/// Register a new process in the `Ready` state. Does not start it; the
/// caller (the `create_process` syscall arm) enqueues the returned PID
/// on [`crate::scheduler`] for later dispatch.
pub fn create(entry: u32) -> KernelResult<Pcb> {
    register(entry, ProcessState::Ready)
}

/// Transition a `Ready` process to `Running` and hand back its PCB so
/// the scheduler can install its stack and trampoline into it.
pub fn start(pid: u32) -> Option<Pcb> {
    let mut table = TABLE.lock();
    let slot = table.slots.get_mut(pid as usize - 1)?.as_mut()?;
    slot.state = ProcessState::Running;
    table.running = Some(pid);
    Some(*slot)
}

/// Mark the currently running process `Terminated`.
pub fn exit_current() {
    let mut table = TABLE.lock();
    if let Some(pid) = table.running.take() {
        if let Some(slot) = table.slots.get_mut(pid as usize - 1).and_then(Option::as_mut) {
            slot.state = ProcessState::Terminated;
        }
    }
}

/// The PCB of the currently running process, if any.
pub fn current() -> Option<Pcb> {
    let table = TABLE.lock();
    table.running.and_then(|pid| table.slots[pid as usize - 1])
}

/// Look up a process by PID (1-indexed).
pub fn get(pid: u32) -> Option<Pcb> {
    if pid < 1 || pid as usize > MAX_PROCESSES {
        return None;
    }
    TABLE.lock().slots[pid as usize - 1]
}

/// Count of registered (non-empty) process slots, regardless of state.
pub fn count() -> usize {
    TABLE.lock().slots.iter().filter(|slot| slot.is_some()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn create_assigns_monotonic_pids() {
        init();
        let first = create(0x1000).expect("first create should succeed");
        let second = create(0x2000).expect("second create should succeed");
        assert_eq!(first.pid, 1);
        assert_eq!(second.pid, 2);
        assert_eq!(count(), 2);
    }

    #[test_case]
    fn stack_ranges_are_disjoint_across_slots() {
        init();
        let first = create(0x1000).unwrap();
        let second = create(0x2000).unwrap();
        assert_ne!(first.user_stack_top, second.user_stack_top);
        assert_ne!(first.kernel_stack_top, second.kernel_stack_top);
    }
}
