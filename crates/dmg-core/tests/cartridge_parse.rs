use dmg_core::cartridge::header::{CartridgeType, Header, RamSize, RomSize};
use dmg_core::cartridge::{Cartridge, CartridgeError};

fn rom_with_header(cart_type: u8, rom_size: u8, ram_size: u8) -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    rom[0x0147] = cart_type;
    rom[0x0148] = rom_size;
    rom[0x0149] = ram_size;
    rom
}

#[test]
fn parses_plain_header() {
    let header = Header::parse(&rom_with_header(0x01, 0x02, 0x03)).unwrap();
    assert_eq!(header.cartridge_type, CartridgeType::Mbc1);
    assert_eq!(header.rom_size, RomSize::Kilobytes128);
    assert_eq!(header.rom_size.bank_count(), 4);
    assert_eq!(header.ram_size, RamSize::Kilobytes32);
    assert_eq!(header.ram_size.byte_len(), 0x8000);
}

#[test]
fn truncated_rom_is_rejected() {
    let err = Cartridge::from_rom(vec![0u8; 0x100]).unwrap_err();
    assert!(matches!(err, CartridgeError::InvalidHeader(_)));
}

#[test]
fn unknown_cartridge_type_is_rejected() {
    let err = Cartridge::from_rom(rom_with_header(0x42, 0x00, 0x00)).unwrap_err();
    assert!(matches!(err, CartridgeError::InvalidHeader(_)));
}

#[test]
fn unknown_size_codes_are_rejected() {
    assert!(Cartridge::from_rom(rom_with_header(0x00, 0x51, 0x00)).is_err());
    assert!(Cartridge::from_rom(rom_with_header(0x00, 0x00, 0x09)).is_err());
}

#[test]
fn oversize_rom_codes_map_to_bank_counts() {
    assert_eq!(
        Header::parse(&rom_with_header(0x00, 0x52, 0x00)).unwrap().rom_size.bank_count(),
        72
    );
    assert_eq!(
        Header::parse(&rom_with_header(0x00, 0x53, 0x00)).unwrap().rom_size.bank_count(),
        80
    );
    assert_eq!(
        Header::parse(&rom_with_header(0x00, 0x54, 0x00)).unwrap().rom_size.bank_count(),
        96
    );
}

#[test]
fn ram_size_codes_cover_2k_through_128k() {
    let sizes = [
        (0x00, 0usize),
        (0x01, 0x800),
        (0x02, 0x2000),
        (0x03, 0x8000),
        (0x04, 0x20000),
        (0x05, 0x10000),
    ];
    for (code, bytes) in sizes {
        let cart = Cartridge::from_rom(rom_with_header(0x00, 0x00, code)).unwrap();
        assert_eq!(cart.ram.len(), bytes, "ram code {code:#04x}");
    }
}

#[test]
fn unimplemented_mappers_degrade_to_mbc1() {
    // Pocket Camera parses, loads, and behaves like an MBC1 cart.
    let mut rom = vec![0u8; 4 * 0x4000];
    rom[0x0147] = 0xFC;
    rom[0x0148] = 0x02; // 4 banks
    for bank in 0..4 {
        rom[bank * 0x4000] = bank as u8;
    }

    let cart = Cartridge::from_rom(rom).unwrap();
    assert_eq!(cart.header.cartridge_type, CartridgeType::PocketCamera);
    assert!(cart.header.cartridge_type.is_unimplemented_mapper());

    let mut bus = dmg_core::bus::Bus::new(cart);
    bus.write8(0x2000, 0x02);
    assert_eq!(bus.read8(0x4000), 0x02, "MBC1-style bank select");
    bus.write8(0x2000, 0x00);
    assert_eq!(bus.read8(0x4000), 0x01, "MBC1-style zero remap");
}

#[test]
fn battery_detection_follows_type_codes() {
    assert!(Cartridge::from_rom(rom_with_header(0x03, 0x00, 0x02))
        .unwrap()
        .has_battery());
    assert!(Cartridge::from_rom(rom_with_header(0x13, 0x00, 0x02))
        .unwrap()
        .has_battery());
    assert!(!Cartridge::from_rom(rom_with_header(0x01, 0x00, 0x00))
        .unwrap()
        .has_battery());
}
