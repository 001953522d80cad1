//! UHCI (USB 1.1 host controller) register layout.
//!
//! `original_source` probes for a UHCI controller but never completes
//! enumeration or issues a single transfer; no syscall or bringup step
//! in this kernel depends on USB. Kept as a named stub, matching the
//! source's own unfinished state, rather than invented into a feature
//! nothing else here uses.

/// I/O-space base port of a UHCI controller's operational registers,
/// as read from its PCI BAR4. Never resolved by this kernel; there is
/// no enumeration path that calls into this module.
#[allow(dead_code)]
pub const USBCMD_OFFSET: u16 = 0x00;
#[allow(dead_code)]
pub const USBSTS_OFFSET: u16 = 0x02;
#[allow(dead_code)]
pub const FRNUM_OFFSET: u16 = 0x06;
#[allow(dead_code)]
pub const FRBASEADD_OFFSET: u16 = 0x08;
