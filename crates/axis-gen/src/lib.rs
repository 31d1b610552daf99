//! axis-gen - packages assembled sections into an output file.
//!
//! Takes the [`axis_mir::Module`] the code generator produced, runs it
//! through `axis-lir`'s assembler, and writes either a complete ELF64
//! executable ([`elf::build_elf`]) or the raw `[_start || code || rodata]`
//! blob that's the CLI's default ([`raw::build_raw`]).

mod layout;

pub mod elf;
pub mod raw;

pub use elf::build_elf;
pub use raw::build_raw;
