//! Constants collected from across the bringup sequence and every subsystem.
//!
//! Collected in one place rather than scattered as `const`s next to
//! each module that uses them, since there are enough of these, shared
//! across enough modules, that scattering invites drift between e.g.
//! the process manager's stack stride and the paging identity-map cap.

/// Desired timer tick frequency.
pub const PIT_FREQUENCY_HZ: u32 = 100;

/// Upper bound of the identity-mapped physical region (§4.8).
pub const IDENTITY_MAP_CAP: u32 = 128 * 1024 * 1024;

/// Virtual/physical address the kernel heap is mapped at, above the
/// paging's reserved prefix.
pub const HEAP_START: usize = 0x0600_0000;

/// Size in bytes of the kernel heap's initial mapping.
pub const HEAP_SIZE: usize = 1024 * 1024;

/// Per-process user-stack size.
pub const USER_STACK_SIZE: u32 = 16 * 1024;

/// Per-process kernel-interrupt-stack size.
pub const KERNEL_STACK_SIZE: u32 = 16 * 1024;

/// Base of the per-process user-stack region (§4.10); grows upward in
/// fixed strides, one per PCB slot.
pub const USER_STACK_REGION_BASE: u32 = 0x0700_0000;

/// Base of the per-process kernel-interrupt-stack region (§4.10).
pub const KERNEL_STACK_REGION_BASE: u32 = 0x0780_0000;

/// Maximum number of live processes (C10).
pub const MAX_PROCESSES: usize = 64;

/// Capacity of the scheduler's ready queue (C12).
pub const SCHEDULER_QUEUE_CAPACITY: usize = 16;

/// Software-interrupt vector used for the syscall gate (C5/C13).
pub const SYSCALL_VECTOR: u8 = 0x80;

/// Master PIC vector offset after remap (C2).
pub const PIC_1_OFFSET: u8 = 0x20;

/// Slave PIC vector offset after remap (C2).
pub const PIC_2_OFFSET: u8 = 0x28;

/// Timer IRQ line and vector.
pub const IRQ_TIMER: u8 = 0;

/// PS/2 mouse IRQ line (cascade, line 12 on the slave PIC).
pub const IRQ_MOUSE: u8 = 12;

/// Screen bounds the mouse position is clamped to, matching the
/// 1024x768 linear framebuffer mode this kernel targets.
pub const MOUSE_SCREEN_BOUNDS: (i32, i32) = (1024, 768);

/// Lowest physical address usable by the frame allocator; everything
/// below 1 MiB is reserved for legacy BIOS/real-mode structures.
pub const PHYSICAL_MEMORY_START: u32 = 0x0010_0000;

/// Page size on x86 with 4 KiB pages.
pub const PAGE_SIZE: u32 = 4096;
