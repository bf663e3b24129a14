use crate::bus::{BootRomError, Bus};
use crate::cartridge::{Cartridge, CartridgeError};
use crate::cpu::Cpu;
use crate::input::Button;
use crate::ppu::{LCD_HEIGHT, LCD_WIDTH};

/// The whole machine: CPU plus bus. This is the only type a host needs.
pub struct GameBoy {
    pub cpu: Cpu,
    pub bus: Bus,
}

impl GameBoy {
    /// A machine with an empty cartridge slot, started from the conventional
    /// post-boot state. Use [`load_cartridge`](Self::load_cartridge) and
    /// optionally [`load_boot_rom`](Self::load_boot_rom) before running.
    pub fn new() -> Self {
        let mut gb = Self {
            cpu: Cpu::post_boot(),
            bus: Bus::new(Cartridge::none()),
        };
        gb.apply_post_boot_io();
        gb
    }

    /// A machine with `rom` inserted, started from the post-boot state.
    pub fn from_rom(rom: Vec<u8>) -> Result<Self, CartridgeError> {
        let mut gb = Self::new();
        gb.load_cartridge(rom)?;
        Ok(gb)
    }

    /// Parse the cartridge header and insert the ROM. The machine keeps its
    /// current register state; call this before running.
    pub fn load_cartridge(&mut self, rom: Vec<u8>) -> Result<(), CartridgeError> {
        self.bus.cart = Cartridge::from_rom(rom)?;
        Ok(())
    }

    /// Install a 256-byte boot ROM and restart from power-on state: the CPU
    /// at PC 0 with the boot image mapped over 0x0000..=0x00FF until the
    /// BANK register unmaps it.
    pub fn load_boot_rom(&mut self, bytes: &[u8]) -> Result<(), BootRomError> {
        self.bus.map_boot_rom(bytes)?;
        self.cpu = Cpu::new();
        Ok(())
    }

    /// Press or release a button; a fresh press requests the joypad
    /// interrupt.
    pub fn set_button(&mut self, button: Button, pressed: bool) {
        self.bus.set_joypad_button(button, pressed);
    }

    /// Execute one instruction (or service one interrupt); returns the
    /// machine cycles consumed.
    pub fn step(&mut self) -> u32 {
        self.cpu.step(&mut self.bus)
    }

    /// Run CPU instructions until the PPU completes the current frame.
    pub fn run_frame(&mut self) {
        self.bus.ppu.begin_frame();
        while !self.bus.ppu.frame_completed() {
            self.step();
        }
    }

    /// Current framebuffer color at (x, y) as ARGB, after palette lookup
    /// against the palette registers as they are *now*.
    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        debug_assert!(x < LCD_WIDTH && y < LCD_HEIGHT);
        self.bus.ppu.pixel_color(x, y, &self.bus.io)
    }

    /// Register values the stock boot ROM leaves behind, for hosts that run
    /// without one.
    fn apply_post_boot_io(&mut self) {
        const IO_INITS: &[(u16, u8)] = &[
            (0xFF00, 0xCF),
            (0xFF05, 0x00),
            (0xFF06, 0x00),
            (0xFF07, 0x00),
            (0xFF10, 0x80),
            (0xFF11, 0xBF),
            (0xFF12, 0xF3),
            (0xFF14, 0xBF),
            (0xFF16, 0x3F),
            (0xFF17, 0x00),
            (0xFF19, 0xBF),
            (0xFF1A, 0x7F),
            (0xFF1B, 0xFF),
            (0xFF1C, 0x9F),
            (0xFF1E, 0xBF),
            (0xFF20, 0xFF),
            (0xFF21, 0x00),
            (0xFF22, 0x00),
            (0xFF23, 0xBF),
            (0xFF24, 0x77),
            (0xFF25, 0xF3),
            (0xFF26, 0xF1),
            (0xFF40, 0x91),
            (0xFF42, 0x00),
            (0xFF43, 0x00),
            (0xFF45, 0x00),
            (0xFF47, 0xFC),
            (0xFF48, 0xFF),
            (0xFF49, 0xFF),
            (0xFF4A, 0x00),
            (0xFF4B, 0x00),
        ];

        for &(addr, val) in IO_INITS {
            self.bus.write8(addr, val);
        }
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new()
    }
}
