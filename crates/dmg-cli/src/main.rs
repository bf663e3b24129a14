use std::io::Write;
use std::path::{Path, PathBuf};

use dmg_core::gb::GameBoy;

#[derive(Debug)]
enum Command {
    Run(RunArgs),
    Suite(SuiteArgs),
    SelfTest(SelfTestArgs),
}

#[derive(Debug)]
struct RunArgs {
    rom_path: PathBuf,
    boot_rom_path: Option<PathBuf>,
    max_frames: Option<u64>,
    max_cycles: Option<u64>,
    verbose: bool,
    trace_cpu: bool,
    trace_ppu: bool,
    log_serial: bool,
    print_serial: bool,
    print_vram: bool,
}

#[derive(Debug)]
struct SuiteArgs {
    rom_dir: PathBuf,
    rom_paths: Vec<PathBuf>,
    max_frames: Option<u64>,
    max_cycles: Option<u64>,
    pass_text: Vec<String>,
    fail_text: Vec<String>,
    print_serial: bool,
    print_vram: bool,
}

#[derive(Debug)]
struct SelfTestArgs {
    max_cycles: Option<u64>,
    pass_text: Vec<String>,
    fail_text: Vec<String>,
    print_serial: bool,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum RomResult {
    Pass,
    Fail,
    Timeout,
}

impl RomResult {
    fn as_str(self) -> &'static str {
        match self {
            RomResult::Pass => "PASS",
            RomResult::Fail => "FAIL",
            RomResult::Timeout => "TIMEOUT",
        }
    }
}

fn print_usage() {
    eprintln!(
        "Usage:\n\
  dmg-cli <rom.gb> [--boot-rom FILE] [--frames N] [--cycles N] [-v|--verbose]\n\
        [--trace-cpu] [--trace-ppu] [--log-serial] [--print-serial] [--print-vram]\n\
  dmg-cli run <rom.gb> [options as above]\n\
  dmg-cli suite [--rom-dir DIR] [--frames N] [--cycles N] [--pass-text S] [--fail-text S] [--print-serial] [ROM...]+\n\
  dmg-cli self-test [--cycles N] [--pass-text S] [--fail-text S] [--print-serial]\n\
\n\
Commands:\n\
  run        Run a single ROM (default if no subcommand is given).\n\
  suite      Discover and run a set of ROMs (default dir: ./roms).\n\
  self-test  Run a tiny built-in ROM that prints 'Passed' via serial.\n\
\n\
Suite pass/fail detection:\n\
  - Captures bytes written to SB (0xFF01) when SC (0xFF02) is written with bit7 set\n\
    (common in blargg/mooneye test ROMs).\n\
  - Marks PASS if output contains any --pass-text (default: 'passed').\n\
  - Marks FAIL if output contains any --fail-text (default: 'failed', 'fail').\n\
  - Otherwise stops at limits and marks TIMEOUT.\n\
  - --print-vram dumps the scraped BG tilemap text on FAIL/TIMEOUT for ROMs\n\
    that report on screen instead of over serial.\n"
    );
}

fn parse_args() -> Result<Command, String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        return Err("missing args".to_string());
    }

    match args[0].as_str() {
        "-h" | "--help" => {
            print_usage();
            std::process::exit(0);
        }
        "run" => parse_run_args(&args[1..]).map(Command::Run),
        "suite" => parse_suite_args(&args[1..]).map(Command::Suite),
        "self-test" => parse_self_test_args(&args[1..]).map(Command::SelfTest),
        _ => parse_run_args(&args).map(Command::Run),
    }
}

fn parse_u64(flag: &str, v: Option<&String>) -> Result<u64, String> {
    let v = v.ok_or_else(|| format!("{flag} requires a value"))?;
    v.parse::<u64>()
        .map_err(|_| format!("invalid {flag} value: {v}"))
}

fn parse_run_args(args: &[String]) -> Result<RunArgs, String> {
    if args.is_empty() {
        return Err("missing ROM path".to_string());
    }

    let mut it = args.iter();
    let rom_path = PathBuf::from(it.next().unwrap());

    let mut out = RunArgs {
        rom_path,
        boot_rom_path: None,
        max_frames: None,
        max_cycles: None,
        verbose: false,
        trace_cpu: false,
        trace_ppu: false,
        log_serial: false,
        print_serial: false,
        print_vram: false,
    };

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            "-v" | "--verbose" => out.verbose = true,
            "--trace-cpu" => out.trace_cpu = true,
            "--trace-ppu" => out.trace_ppu = true,
            "--log-serial" => out.log_serial = true,
            "--print-serial" => out.print_serial = true,
            "--print-vram" => out.print_vram = true,
            "--boot-rom" => {
                let v = it
                    .next()
                    .ok_or_else(|| "--boot-rom requires a value".to_string())?;
                out.boot_rom_path = Some(PathBuf::from(v));
            }
            "--frames" => out.max_frames = Some(parse_u64("--frames", it.next())?),
            "--cycles" => out.max_cycles = Some(parse_u64("--cycles", it.next())?),
            _ if arg.starts_with('-') => return Err(format!("unknown flag: {arg}")),
            _ => return Err(format!("unexpected extra positional arg: {arg}")),
        }
    }

    Ok(out)
}

fn parse_suite_args(args: &[String]) -> Result<SuiteArgs, String> {
    let mut out = SuiteArgs {
        rom_dir: PathBuf::from("roms"),
        rom_paths: Vec::new(),
        max_frames: None,
        max_cycles: Some(300_000_000),
        pass_text: vec!["passed".to_string()],
        fail_text: vec!["failed".to_string(), "fail".to_string()],
        print_serial: false,
        print_vram: false,
    };

    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            "--rom-dir" => {
                let v = it
                    .next()
                    .ok_or_else(|| "--rom-dir requires a value".to_string())?;
                out.rom_dir = PathBuf::from(v);
            }
            "--frames" => out.max_frames = Some(parse_u64("--frames", it.next())?),
            "--cycles" => out.max_cycles = Some(parse_u64("--cycles", it.next())?),
            "--pass-text" => {
                let v = it
                    .next()
                    .ok_or_else(|| "--pass-text requires a value".to_string())?;
                out.pass_text.push(v.to_string());
            }
            "--fail-text" => {
                let v = it
                    .next()
                    .ok_or_else(|| "--fail-text requires a value".to_string())?;
                out.fail_text.push(v.to_string());
            }
            "--print-serial" => out.print_serial = true,
            "--print-vram" => out.print_vram = true,
            _ if arg.starts_with('-') => return Err(format!("unknown flag: {arg}")),
            _ => out.rom_paths.push(PathBuf::from(arg)),
        }
    }

    Ok(out)
}

fn parse_self_test_args(args: &[String]) -> Result<SelfTestArgs, String> {
    let mut out = SelfTestArgs {
        max_cycles: Some(5_000_000),
        pass_text: vec!["passed".to_string()],
        fail_text: vec!["failed".to_string(), "fail".to_string()],
        print_serial: false,
    };

    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            "--cycles" => out.max_cycles = Some(parse_u64("--cycles", it.next())?),
            "--pass-text" => {
                let v = it
                    .next()
                    .ok_or_else(|| "--pass-text requires a value".to_string())?;
                out.pass_text.push(v.to_string());
            }
            "--fail-text" => {
                let v = it
                    .next()
                    .ok_or_else(|| "--fail-text requires a value".to_string())?;
                out.fail_text.push(v.to_string());
            }
            "--print-serial" => out.print_serial = true,
            _ if arg.starts_with('-') => return Err(format!("unknown flag: {arg}")),
            _ => return Err(format!("unexpected positional arg: {arg}")),
        }
    }

    Ok(out)
}

fn discover_roms(dir: &Path) -> Result<Vec<PathBuf>, String> {
    fn visit(out: &mut Vec<PathBuf>, p: &Path) -> Result<(), String> {
        let rd = std::fs::read_dir(p)
            .map_err(|e| format!("failed to read ROM directory {}: {e}", p.display()))?;
        for ent in rd {
            let ent = ent.map_err(|e| format!("failed to read entry in {}: {e}", p.display()))?;
            let path = ent.path();
            if path.is_dir() {
                visit(out, &path)?;
                continue;
            }
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if ext.eq_ignore_ascii_case("gb") {
                out.push(path);
            }
        }
        Ok(())
    }

    let mut out = Vec::new();
    visit(&mut out, dir)?;
    out.sort();
    Ok(out)
}

fn contains_any(haystack_lower: &str, needles: &[String]) -> bool {
    needles
        .iter()
        .any(|n| !n.is_empty() && haystack_lower.contains(&n.to_ascii_lowercase()))
}

fn decode_screen_char(tile_id: u8) -> u8 {
    // Text-mode test ROMs put ASCII codes straight into the BG tilemap; many
    // set the high bit, so mask to 7 bits before the printable check.
    let c = tile_id & 0x7F;
    if (0x20..=0x7E).contains(&c) {
        c
    } else {
        b' '
    }
}

fn scrape_bg_tilemap_text(vram: &[u8], map_offset: usize) -> String {
    const MAP_W: usize = 32;
    const MAP_H: usize = 32;

    let mut out: Vec<u8> = Vec::with_capacity(MAP_W * MAP_H + MAP_H);
    for y in 0..MAP_H {
        for x in 0..MAP_W {
            out.push(decode_screen_char(vram[map_offset + y * MAP_W + x]));
        }
        out.push(b'\n');
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn scrape_all_bg_text(gb: &GameBoy) -> String {
    // Both tilemaps: LCDC bit 3 picks one, but ROMs write either.
    let t9800 = scrape_bg_tilemap_text(&gb.bus.vram, 0x1800);
    let t9c00 = scrape_bg_tilemap_text(&gb.bus.vram, 0x1C00);
    format!("{t9800}\n{t9c00}")
}

struct SerialOutcome {
    result: RomResult,
    output: Vec<u8>,
    frames: u64,
    cycles: u64,
}

fn run_for_serial_result(
    mut gb: GameBoy,
    max_frames: Option<u64>,
    max_cycles: Option<u64>,
    pass_text: &[String],
    fail_text: &[String],
    print_vram: bool,
) -> SerialOutcome {
    let mut frames: u64 = 0;
    let mut cycles: u64 = 0;
    let mut output: Vec<u8> = Vec::new();

    let dump_vram = |gb: &GameBoy, label: &str| {
        if print_vram {
            println!(
                "--- VRAM BG tilemap (on {label}) ---\n{}",
                scrape_all_bg_text(gb)
            );
        }
    };

    loop {
        if max_frames.is_some_and(|m| frames >= m) || max_cycles.is_some_and(|m| cycles >= m) {
            // Last-chance scrape: some ROMs report only on screen.
            let screen_lower = scrape_all_bg_text(&gb).to_ascii_lowercase();
            if contains_any(&screen_lower, fail_text) {
                dump_vram(&gb, "FAIL");
                return SerialOutcome {
                    result: RomResult::Fail,
                    output,
                    frames,
                    cycles,
                };
            }
            if contains_any(&screen_lower, pass_text) {
                return SerialOutcome {
                    result: RomResult::Pass,
                    output,
                    frames,
                    cycles,
                };
            }
            dump_vram(&gb, "TIMEOUT");
            return SerialOutcome {
                result: RomResult::Timeout,
                output,
                frames,
                cycles,
            };
        }

        cycles += gb.step() as u64;

        let new = gb.bus.serial.take_output();
        if !new.is_empty() {
            output.extend_from_slice(&new);
            let out_lower = String::from_utf8_lossy(&output).to_ascii_lowercase();
            if contains_any(&out_lower, fail_text) {
                dump_vram(&gb, "FAIL");
                return SerialOutcome {
                    result: RomResult::Fail,
                    output,
                    frames,
                    cycles,
                };
            }
            if contains_any(&out_lower, pass_text) {
                return SerialOutcome {
                    result: RomResult::Pass,
                    output,
                    frames,
                    cycles,
                };
            }
        }

        if gb.bus.ppu.frame_completed() {
            frames += 1;
            gb.bus.ppu.begin_frame();

            // Screen fallback every few frames; cheap enough at 60 Hz.
            if frames <= 3 || frames % 5 == 0 {
                let screen_lower = scrape_all_bg_text(&gb).to_ascii_lowercase();
                if contains_any(&screen_lower, fail_text) {
                    dump_vram(&gb, "FAIL");
                    return SerialOutcome {
                        result: RomResult::Fail,
                        output,
                        frames,
                        cycles,
                    };
                }
                if contains_any(&screen_lower, pass_text) {
                    return SerialOutcome {
                        result: RomResult::Pass,
                        output,
                        frames,
                        cycles,
                    };
                }
            }
        }
    }
}

/// A minimal ROM that prints "Passed" over serial and loops.
fn make_self_test_rom() -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];

    // Entry point jumps over the header area.
    let start = 0x0150usize;
    rom[0x0100] = 0xC3; // JP a16
    rom[0x0101] = (start & 0xFF) as u8;
    rom[0x0102] = (start >> 8) as u8;

    let mut pc = start;
    for &b in b"Passed\n" {
        // LD A,d8 ; LD (FF01),A ; LD A,0x81 ; LD (FF02),A
        let code: &[&[u8]] = &[&[0x3E, b], &[0xEA, 0x01, 0xFF], &[0x3E, 0x81], &[0xEA, 0x02, 0xFF]];
        for chunk in code {
            rom[pc..pc + chunk.len()].copy_from_slice(chunk);
            pc += chunk.len();
        }
    }
    // JR -2: spin forever.
    rom[pc] = 0x18;
    rom[pc + 1] = 0xFE;

    rom[0x0147] = 0x00; // ROM only
    rom[0x0148] = 0x00; // 32 KiB
    rom[0x0149] = 0x00; // no RAM

    rom
}

fn load_gameboy(rom_path: &Path, boot_rom_path: Option<&Path>) -> Result<GameBoy, String> {
    let rom = std::fs::read(rom_path)
        .map_err(|e| format!("failed to read ROM {}: {e}", rom_path.display()))?;
    let mut gb = GameBoy::from_rom(rom).map_err(|e| format!("invalid ROM: {e}"))?;

    if let Some(path) = boot_rom_path {
        let boot = std::fs::read(path)
            .map_err(|e| format!("failed to read boot ROM {}: {e}", path.display()))?;
        gb.load_boot_rom(&boot)
            .map_err(|e| format!("invalid boot ROM: {e}"))?;
    }

    Ok(gb)
}

fn run_single(args: RunArgs) -> Result<i32, String> {
    let mut gb = load_gameboy(&args.rom_path, args.boot_rom_path.as_deref())?;

    if args.verbose {
        let h = &gb.bus.cart.header;
        eprintln!(
            "Loaded ROM: {} ({:?}, {:?}, {:?})",
            args.rom_path.display(),
            h.cartridge_type,
            h.rom_size,
            h.ram_size
        );
    }

    let mut frames: u64 = 0;
    let mut cycles: u64 = 0;

    let mut last_ly: u8 = gb.bus.io[0x44];
    let mut last_mode: u8 = gb.bus.io[0x41] & 0x03;

    let mut serial_out: Vec<u8> = Vec::new();
    let mut stdout = std::io::stdout();

    loop {
        if args.max_frames.is_some_and(|m| frames >= m)
            || args.max_cycles.is_some_and(|m| cycles >= m)
        {
            if args.print_vram {
                println!("--- VRAM BG tilemap ---\n{}", scrape_all_bg_text(&gb));
            }
            break;
        }

        if args.trace_cpu {
            let pc = gb.cpu.pc;
            let b0 = gb.bus.read8(pc);
            let b1 = gb.bus.read8(pc.wrapping_add(1));
            let b2 = gb.bus.read8(pc.wrapping_add(2));
            eprintln!(
                "CYC={cycles:010} PC={pc:04X} OP={b0:02X} {b1:02X} {b2:02X} AF={:02X}{:02X} BC={:02X}{:02X} DE={:02X}{:02X} HL={:02X}{:02X} SP={:04X} IME={} HALT={} IE={:02X} IF={:02X}",
                gb.cpu.a,
                gb.cpu.f,
                gb.cpu.b,
                gb.cpu.c,
                gb.cpu.d,
                gb.cpu.e,
                gb.cpu.h,
                gb.cpu.l,
                gb.cpu.sp,
                gb.cpu.ime,
                gb.cpu.halted,
                gb.bus.ie,
                gb.bus.iflag
            );
        }
        cycles += gb.step() as u64;

        if args.trace_ppu {
            let ly = gb.bus.io[0x44];
            let mode = gb.bus.io[0x41] & 0x03;
            if ly != last_ly || mode != last_mode {
                eprintln!("PPU ly={ly} mode={mode}");
                last_ly = ly;
                last_mode = mode;
            }
        }

        let batch: Vec<u8> = gb.bus.serial.take_output();
        if !batch.is_empty() {
            if args.log_serial {
                stdout
                    .write_all(&batch)
                    .and_then(|_| stdout.flush())
                    .map_err(|e| format!("failed to write serial output: {e}"))?;
            }
            if args.print_serial {
                serial_out.extend_from_slice(&batch);
            }
        }

        if gb.bus.ppu.frame_completed() {
            frames += 1;

            if args.verbose {
                let checksum: u64 = gb
                    .bus
                    .ppu
                    .framebuffer()
                    .iter()
                    .fold(0u64, |acc, px| acc.wrapping_add(px.color as u64));
                eprintln!("frame {frames} (cycles={cycles}) fb_checksum={checksum}");
            }

            gb.bus.ppu.begin_frame();
        }
    }

    if args.print_serial && !serial_out.is_empty() {
        println!("--- serial output ---");
        println!("{}", String::from_utf8_lossy(&serial_out));
    }

    if args.verbose {
        eprintln!("Stopped after {frames} frames / {cycles} cycles.");
    }

    Ok(0)
}

fn run_suite(args: SuiteArgs) -> Result<i32, String> {
    let roms = if args.rom_paths.is_empty() {
        discover_roms(&args.rom_dir)?
    } else {
        args.rom_paths.clone()
    };

    if roms.is_empty() {
        return Err(format!("no ROMs found under {}", args.rom_dir.display()));
    }

    let mut failures = 0usize;
    for path in &roms {
        let gb = match load_gameboy(path, None) {
            Ok(gb) => gb,
            Err(e) => {
                println!("{:8} {} ({e})", "ERROR", path.display());
                failures += 1;
                continue;
            }
        };

        let outcome = run_for_serial_result(
            gb,
            args.max_frames,
            args.max_cycles,
            &args.pass_text,
            &args.fail_text,
            args.print_vram,
        );

        println!(
            "{:8} {} (frames={}, cycles={})",
            outcome.result.as_str(),
            path.display(),
            outcome.frames,
            outcome.cycles
        );

        if args.print_serial && !outcome.output.is_empty() {
            println!("{}", String::from_utf8_lossy(&outcome.output));
        }

        if outcome.result != RomResult::Pass {
            failures += 1;
        }
    }

    Ok(if failures == 0 { 0 } else { 1 })
}

fn run_self_test(args: SelfTestArgs) -> Result<i32, String> {
    let gb = GameBoy::from_rom(make_self_test_rom())
        .map_err(|e| format!("self-test ROM rejected: {e}"))?;

    let outcome = run_for_serial_result(
        gb,
        None,
        args.max_cycles,
        &args.pass_text,
        &args.fail_text,
        false,
    );

    println!(
        "self-test: {} (cycles={})",
        outcome.result.as_str(),
        outcome.cycles
    );
    if args.print_serial {
        println!("{}", String::from_utf8_lossy(&outcome.output));
    }

    Ok(if outcome.result == RomResult::Pass { 0 } else { 1 })
}

fn main() {
    let code = match parse_args() {
        Ok(Command::Run(args)) => run_single(args),
        Ok(Command::Suite(args)) => run_suite(args),
        Ok(Command::SelfTest(args)) => run_self_test(args),
        Err(e) => {
            eprintln!("error: {e}\n");
            print_usage();
            std::process::exit(2);
        }
    };

    match code {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
