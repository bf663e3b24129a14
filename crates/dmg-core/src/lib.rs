//! Cycle-accurate emulator core for the original DMG handheld.
//!
//! The [`gb::GameBoy`] type is the host-facing entry point; it owns a
//! [`cpu::Cpu`] and a [`bus::Bus`]. The bus owns every memory region and I/O
//! register byte, and `Bus::tick` is the single fan-out that advances the
//! timer, OAM DMA, PPU and serial port at dot granularity. The CPU drives the
//! clock: each of its memory accesses ticks the bus by one machine cycle
//! (4 dots), so no component ever gets ahead of another.

pub mod bus;
pub mod cartridge;
pub mod cpu;
pub mod dma;
pub mod gb;
pub mod input;
pub mod interrupt;
pub mod ppu;
pub mod serial;
pub mod timer;

pub use bus::Bus;
pub use cartridge::Cartridge;
pub use cpu::Cpu;
pub use gb::GameBoy;
pub use input::Button;
