//! Multiboot v1 info-structure parsing.
//!
//! No crate in the reference pack speaks the multiboot v1 wire format
//! (`multiboot2` is a different, incompatible structure layout), so this
//! is hand-rolled directly against
//! `original_source/src/kernel.c`'s `multiboot_info`/`multiboot_module`
//! struct layouts — field order and width, not translated code.

use crate::error::{KernelError, KernelResult};

const FLAG_MODULES: u32 = 0x8;

#[repr(C)]
struct RawInfo {
    flags: u32,
    mem_lower: u32,
    mem_upper: u32,
    boot_device: u32,
    cmdline: u32,
    mods_count: u32,
    mods_addr: u32,
}

#[repr(C)]
struct RawModule {
    mod_start: u32,
    mod_end: u32,
    string: u32,
    reserved: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct ModuleInfo {
    pub start: u32,
    pub end: u32,
}

/// The subset of the multiboot info structure this kernel reads.
#[derive(Debug, Clone, Copy)]
pub struct MachineInfo {
    pub mem_lower_kb: u32,
    pub mem_upper_kb: u32,
    pub module_count: usize,
}

const MAX_MODULES: usize = 8;

/// A fixed-capacity view over the module table; avoids allocating before
/// the heap exists.
pub struct Modules {
    entries: [ModuleInfo; MAX_MODULES],
    len: usize,
}

impl Modules {
    pub fn as_slice(&self) -> &[ModuleInfo] {
        &self.entries[..self.len]
    }

    pub fn get(&self, index: usize) -> Option<ModuleInfo> {
        self.entries.get(index).copied()
    }
}

/// Parse the multiboot info structure at `info_addr` (the physical
/// address GRUB leaves in `ebx` at kernel entry).
///
/// # Errors
/// Returns [`KernelError::InvalidModuleTable`] if the modules-present
/// flag is unset, no modules are reported, or more modules are reported
/// than this kernel's fixed-size module table can hold.
///
/// # Safety
/// `info_addr` must be the physical address of a valid multiboot v1
/// info structure, identity-mapped and untouched since boot.
pub unsafe fn parse(info_addr: u32) -> KernelResult<(MachineInfo, Modules)> {
    // SAFETY: forwarded from this function's contract.
    let info = unsafe { &*(info_addr as *const RawInfo) };

    if info.flags & FLAG_MODULES == 0 || info.mods_count == 0 {
        return Err(KernelError::InvalidModuleTable);
    }
    if info.mods_count as usize > MAX_MODULES {
        return Err(KernelError::InvalidModuleTable);
    }

    let mut entries = [ModuleInfo { start: 0, end: 0 }; MAX_MODULES];
    // SAFETY: `mods_addr` names `mods_count` contiguous `RawModule`
    // entries per the multiboot v1 contract, just validated above.
    let raw_modules = unsafe {
        core::slice::from_raw_parts(info.mods_addr as *const RawModule, info.mods_count as usize)
    };
    for (i, raw) in raw_modules.iter().enumerate() {
        if raw.mod_end <= raw.mod_start {
            return Err(KernelError::InvalidModuleTable);
        }
        entries[i] = ModuleInfo {
            start: raw.mod_start,
            end: raw.mod_end,
        };
    }

    let machine = MachineInfo {
        mem_lower_kb: info.mem_lower,
        mem_upper_kb: info.mem_upper,
        module_count: info.mods_count as usize,
    };
    let modules = Modules {
        entries,
        len: info.mods_count as usize,
    };

    Ok((machine, modules))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn flag_modules_matches_source_bit() {
        assert_eq!(FLAG_MODULES, 0x8);
    }
}
