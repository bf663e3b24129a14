use super::{mbc0::Mbc0, mbc1::Mbc1, mbc2::Mbc2, mbc3::Mbc3, mbc5::Mbc5};

/// Bank-controller behavior: routes ROM reads through the selected banks and
/// intercepts ROM-range writes as mapper control.
pub trait Mbc {
    fn read_rom(&self, rom: &[u8], addr: u16) -> u8;
    fn write_rom(&mut self, addr: u16, val: u8);
    fn read_ram(&self, ram: &[u8], addr: u16) -> u8;
    fn write_ram(&mut self, ram: &mut [u8], addr: u16, val: u8);

    /// Mapper-internal RAM to append to a battery save (MBC2 only).
    fn save_extra(&self) -> Vec<u8> {
        Vec::new()
    }

    fn load_extra(&mut self, data: &[u8]) -> Result<(), &'static str> {
        if data.is_empty() {
            Ok(())
        } else {
            Err("unexpected mapper save data")
        }
    }
}

#[derive(Debug)]
pub enum MbcKind {
    Mbc0(Mbc0),
    Mbc1(Mbc1),
    Mbc2(Mbc2),
    Mbc3(Mbc3),
    Mbc5(Mbc5),
}

impl MbcKind {
    #[inline]
    fn inner(&self) -> &dyn Mbc {
        match self {
            Self::Mbc0(m) => m,
            Self::Mbc1(m) => m,
            Self::Mbc2(m) => m,
            Self::Mbc3(m) => m,
            Self::Mbc5(m) => m,
        }
    }

    #[inline]
    fn inner_mut(&mut self) -> &mut dyn Mbc {
        match self {
            Self::Mbc0(m) => m,
            Self::Mbc1(m) => m,
            Self::Mbc2(m) => m,
            Self::Mbc3(m) => m,
            Self::Mbc5(m) => m,
        }
    }
}

impl Mbc for MbcKind {
    fn read_rom(&self, rom: &[u8], addr: u16) -> u8 {
        self.inner().read_rom(rom, addr)
    }

    fn write_rom(&mut self, addr: u16, val: u8) {
        self.inner_mut().write_rom(addr, val)
    }

    fn read_ram(&self, ram: &[u8], addr: u16) -> u8 {
        self.inner().read_ram(ram, addr)
    }

    fn write_ram(&mut self, ram: &mut [u8], addr: u16, val: u8) {
        self.inner_mut().write_ram(ram, addr, val)
    }

    fn save_extra(&self) -> Vec<u8> {
        self.inner().save_extra()
    }

    fn load_extra(&mut self, data: &[u8]) -> Result<(), &'static str> {
        self.inner_mut().load_extra(data)
    }
}
