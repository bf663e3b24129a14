pub mod header;
pub mod mbc;
pub mod mbc0;
pub mod mbc1;
pub mod mbc2;
pub mod mbc3;
pub mod mbc5;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use self::header::{CartridgeType, Header, HeaderError};
use self::mbc::{Mbc, MbcKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CartridgeError {
    InvalidHeader(HeaderError),
}

impl fmt::Display for CartridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHeader(detail) => write!(f, "invalid cartridge header: {detail}"),
        }
    }
}

impl std::error::Error for CartridgeError {}

impl From<HeaderError> for CartridgeError {
    fn from(e: HeaderError) -> Self {
        Self::InvalidHeader(e)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SaveError {
    Io(String),
    InvalidFormat(&'static str),
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(detail) => write!(f, "save file I/O error: {detail}"),
            Self::InvalidFormat(detail) => write!(f, "malformed save file: {detail}"),
        }
    }
}

impl std::error::Error for SaveError {}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Magic + length prefix for mapper-internal RAM appended to a battery save.
const SAVE_TRAILER_MAGIC: &[u8; 5] = b"DMGS1";

#[derive(Debug)]
pub struct Cartridge {
    pub rom: Vec<u8>,
    pub ram: Vec<u8>,
    pub header: Header,
    pub mbc: MbcKind,
}

impl Cartridge {
    pub fn from_rom(rom: Vec<u8>) -> Result<Self, CartridgeError> {
        let header = Header::parse(&rom)?;
        let ram = vec![0; header.ram_size.byte_len()];

        if header.cartridge_type.is_unimplemented_mapper() {
            log::warn!(
                "cartridge mapper {:?} is not implemented, falling back to MBC1 behavior",
                header.cartridge_type
            );
        }

        let mbc = match header.cartridge_type {
            CartridgeType::RomOnly => MbcKind::Mbc0(mbc0::Mbc0),
            CartridgeType::Mbc1 | CartridgeType::Mbc1Ram | CartridgeType::Mbc1RamBattery => {
                MbcKind::Mbc1(mbc1::Mbc1::new())
            }
            CartridgeType::Mbc2 | CartridgeType::Mbc2Battery => MbcKind::Mbc2(mbc2::Mbc2::new()),
            CartridgeType::Mbc3TimerBattery
            | CartridgeType::Mbc3TimerRamBattery
            | CartridgeType::Mbc3
            | CartridgeType::Mbc3Ram
            | CartridgeType::Mbc3RamBattery => MbcKind::Mbc3(mbc3::Mbc3::new()),
            CartridgeType::Mbc5
            | CartridgeType::Mbc5Ram
            | CartridgeType::Mbc5RamBattery
            | CartridgeType::Mbc5Rumble
            | CartridgeType::Mbc5RumbleRam
            | CartridgeType::Mbc5RumbleRamBattery => MbcKind::Mbc5(mbc5::Mbc5::new()),
            // Unimplemented mappers degrade to MBC1 (warned above).
            _ => MbcKind::Mbc1(mbc1::Mbc1::new()),
        };

        Ok(Self {
            rom,
            ram,
            header,
            mbc,
        })
    }

    /// Cartridge slot left empty: open bus reads as 0xFF everywhere.
    pub fn none() -> Self {
        Self {
            rom: Vec::new(),
            ram: Vec::new(),
            header: Header {
                cartridge_type: CartridgeType::RomOnly,
                rom_size: header::RomSize::Kilobytes32,
                ram_size: header::RamSize::None,
            },
            mbc: MbcKind::Mbc0(mbc0::Mbc0),
        }
    }

    pub fn has_battery(&self) -> bool {
        matches!(
            self.header.cartridge_type,
            CartridgeType::Mbc1RamBattery
                | CartridgeType::Mbc2Battery
                | CartridgeType::Mbc3TimerBattery
                | CartridgeType::Mbc3TimerRamBattery
                | CartridgeType::Mbc3RamBattery
                | CartridgeType::Mbc5RamBattery
                | CartridgeType::Mbc5RumbleRamBattery
                | CartridgeType::HuC1RamBattery
        )
    }

    /// Persist battery-backed RAM: the raw external-RAM bytes, plus a tagged
    /// trailer when the mapper carries internal RAM.
    pub fn save_to_path(&self, path: &Path) -> Result<(), SaveError> {
        if !self.has_battery() {
            return Ok(());
        }

        let mut data = self.ram.clone();
        let extra = self.mbc.save_extra();
        if !extra.is_empty() {
            data.extend_from_slice(SAVE_TRAILER_MAGIC);
            data.extend_from_slice(&(extra.len() as u32).to_le_bytes());
            data.extend_from_slice(&extra);
        }

        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn load_from_path(&mut self, path: &Path) -> Result<(), SaveError> {
        if !self.has_battery() || !path.exists() {
            return Ok(());
        }

        let data = std::fs::read(path)?;

        let ram_len = self.ram.len();
        if data.len() < ram_len {
            // Partial dump: restore what is there and keep the rest zeroed.
            self.ram[..data.len()].copy_from_slice(&data);
            return Ok(());
        }

        if ram_len > 0 {
            self.ram.copy_from_slice(&data[..ram_len]);
        }

        let trailer = &data[ram_len..];
        if trailer.is_empty() {
            return self.mbc.load_extra(&[]).map_err(SaveError::InvalidFormat);
        }

        if trailer.len() < 9 || &trailer[..5] != SAVE_TRAILER_MAGIC {
            // Raw RAM dump from another emulator; nothing more to restore.
            return Ok(());
        }

        let len_bytes = [trailer[5], trailer[6], trailer[7], trailer[8]];
        let extra_len = u32::from_le_bytes(len_bytes) as usize;
        if trailer.len() < 9 + extra_len {
            return Err(SaveError::InvalidFormat("save trailer truncated"));
        }

        self.mbc
            .load_extra(&trailer[9..9 + extra_len])
            .map_err(SaveError::InvalidFormat)
    }
}
