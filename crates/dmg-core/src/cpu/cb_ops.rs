//! CB-prefixed instruction execution: rotates/shifts (x=0), BIT (x=1),
//! RES (x=2) and SET (x=3), each over the operand picked by bits 2..0.

use crate::bus::Bus;

use super::cpu::{Cpu, Flag, R8};

#[inline]
fn r8_operand(code: u8) -> R8 {
    match code & 0x07 {
        0 => R8::B,
        1 => R8::C,
        2 => R8::D,
        3 => R8::E,
        4 => R8::H,
        5 => R8::L,
        6 => R8::HlInd,
        _ => R8::A,
    }
}

#[inline]
fn rmw_cycles(r: R8) -> u32 {
    if matches!(r, R8::HlInd) {
        16
    } else {
        8
    }
}

pub fn exec(cpu: &mut Cpu, bus: &mut Bus, opcode: u8) -> u32 {
    let r = r8_operand(opcode);
    let bit = (opcode >> 3) & 0x07;

    match opcode {
        // Rotates and shifts; unlike the A-only forms these set Z.
        0x00..=0x3F => {
            let v = cpu.read_r8(bus, r);
            let carry_in = cpu.flag(Flag::C) as u8;

            let (res, carry_out) = match bit {
                // RLC
                0 => (v.rotate_left(1), (v & 0x80) != 0),
                // RRC
                1 => (v.rotate_right(1), (v & 0x01) != 0),
                // RL
                2 => ((v << 1) | carry_in, (v & 0x80) != 0),
                // RR
                3 => ((v >> 1) | (carry_in << 7), (v & 0x01) != 0),
                // SLA
                4 => (v << 1, (v & 0x80) != 0),
                // SRA: arithmetic shift keeps bit 7.
                5 => ((v >> 1) | (v & 0x80), (v & 0x01) != 0),
                // SWAP
                6 => (v.rotate_right(4), false),
                // SRL
                _ => (v >> 1, (v & 0x01) != 0),
            };

            cpu.write_r8(bus, r, res);
            cpu.set_flag(Flag::Z, res == 0);
            cpu.set_flag(Flag::N, false);
            cpu.set_flag(Flag::H, false);
            cpu.set_flag(Flag::C, carry_out);

            rmw_cycles(r)
        }

        // BIT b,r: read-only, so (HL) costs 12 rather than 16.
        0x40..=0x7F => {
            let v = cpu.read_r8(bus, r);
            cpu.set_flag(Flag::Z, (v & (1 << bit)) == 0);
            cpu.set_flag(Flag::N, false);
            cpu.set_flag(Flag::H, true);
            if matches!(r, R8::HlInd) {
                12
            } else {
                8
            }
        }

        // RES b,r
        0x80..=0xBF => {
            let v = cpu.read_r8(bus, r);
            cpu.write_r8(bus, r, v & !(1 << bit));
            rmw_cycles(r)
        }

        // SET b,r
        0xC0..=0xFF => {
            let v = cpu.read_r8(bus, r);
            cpu.write_r8(bus, r, v | (1 << bit));
            rmw_cycles(r)
        }
    }
}
