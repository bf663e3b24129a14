use dmg_core::bus::Bus;
use dmg_core::cartridge::Cartridge;
use dmg_core::cpu::Cpu;
use dmg_core::gb::GameBoy;

fn make_bus() -> Bus {
    Bus::new(Cartridge::from_rom(vec![0u8; 0x8000]).unwrap())
}

#[test]
fn sb_byte_is_captured_when_transfer_starts() {
    let mut bus = make_bus();

    bus.write8(0xFF01, b'O');
    bus.write8(0xFF02, 0x81);
    bus.write8(0xFF01, b'k');
    bus.write8(0xFF02, 0x81);

    assert_eq!(bus.serial.take_output(), b"Ok".to_vec());
}

#[test]
fn transfer_completion_sets_if_bit3_and_clears_sc_bit7() {
    let mut bus = make_bus();

    bus.write8(0xFF01, 0x5A);
    bus.write8(0xFF02, 0x81);
    assert_eq!(bus.read8(0xFF02) & 0x80, 0x80, "transfer in flight");

    // 8 bits at 8192 Hz: 4096 dots.
    bus.tick(4096 - 4);
    assert_eq!(bus.iflag & 0x08, 0);

    bus.tick(4);
    assert_ne!(bus.iflag & 0x08, 0);
    assert_eq!(bus.read8(0xFF02) & 0x80, 0);
    assert_eq!(bus.read8(0xFF01), 0xFF, "open link shifts in ones");
}

#[test]
fn external_clock_transfer_stays_pending() {
    let mut bus = make_bus();

    bus.write8(0xFF01, 0x42);
    bus.write8(0xFF02, 0x80); // bit 0 clear: wait for the (absent) peer
    bus.tick(100_000);

    assert_eq!(bus.iflag & 0x08, 0);
    assert_eq!(bus.read8(0xFF02) & 0x80, 0x80);
    assert!(bus.serial.take_output().is_empty());
}

#[test]
fn serial_interrupt_vectors_to_0x58() {
    let mut bus = make_bus();
    let mut cpu = Cpu::new();
    cpu.sp = 0xFFFE;
    cpu.ime = true;
    bus.ie = 0x08;

    bus.write8(0xFF01, b'!');
    bus.write8(0xFF02, 0x81);
    bus.tick(4096);

    cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x0058);
}

#[test]
fn serial_printing_program_reports_through_the_sink() {
    // LD A,'P' ; LD (FF01),A ; LD A,0x81 ; LD (FF02),A ; JR -2
    let program = [0x3E, b'P', 0xEA, 0x01, 0xFF, 0x3E, 0x81, 0xEA, 0x02, 0xFF, 0x18, 0xFE];
    let mut rom = vec![0u8; 0x8000];
    rom[0x0100] = 0xC3; // JP 0x0150
    rom[0x0101] = 0x50;
    rom[0x0102] = 0x01;
    rom[0x0150..0x0150 + program.len()].copy_from_slice(&program);

    let mut gb = GameBoy::from_rom(rom).unwrap();
    for _ in 0..1000 {
        gb.step();
    }

    assert_eq!(gb.bus.serial.take_output(), vec![b'P']);
}
