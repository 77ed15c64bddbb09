//! A2CORE - Apple II Emulation Core
//!
//! Version 0.2
//!
//! ラインモードのコンソールインターフェースでApple IIコアを駆動する。
//!
//! # 使用方法
//! ```text
//! a2core -m plus --simple
//! a2core -m enhanced --load program.bin --load-at 300 --start-at 300
//! ```

use a2core::apple2::{Apple2, CYCLES_PER_FRAME};
use a2core::config::{self, Config};
use a2core::debugger::DebugState;
use a2core::machine;
use a2core::trace::{self, TraceMask};

use clap::Parser;
use std::fs;
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

/// A2CORE - Apple II Emulation Core
#[derive(Parser, Debug)]
#[command(name = "a2core")]
#[command(author = "A2CORE Project")]
#[command(version = "0.2.0")]
#[command(about = "A2CORE - Apple II emulation core in Rust", long_about = None)]
struct Args {
    /// 機種名 (original / plus / twoey / enhanced、エイリアス可)
    #[arg(short = 'm', long, default_value = machine::DEFAULT_MACHINE)]
    machine: String,

    /// ラインモードのコンソールインターフェースを使用（既定かつ唯一）
    #[arg(long)]
    simple: bool,

    /// 警告以下のログを抑制
    #[arg(short = 'q', long)]
    quiet: bool,

    /// ログを冗長にする（繰り返しでさらに冗長）
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// BRK/不正オペコードで終了する
    #[arg(long)]
    die_on_brk: bool,

    /// このPC（16進）に到達したら成功として終了
    #[arg(long)]
    trap_success: Option<String>,

    /// このPC（16進）に到達したら失敗として終了
    #[arg(long)]
    trap_failure: Option<String>,

    /// ROMイメージファイル
    #[arg(long)]
    rom: Option<String>,

    /// RAMにロードするバイナリファイル
    #[arg(long)]
    load: Option<String>,

    /// RAMイメージのロード先アドレス（16進）
    #[arg(long)]
    load_at: Option<String>,

    /// 実行開始アドレス（16進）
    #[arg(long)]
    start_at: Option<String>,

    /// フレームごとのウェイトを省略して全速実行
    #[arg(long, action = clap::ArgAction::Set, default_value_t = true)]
    turbo: bool,

    /// トレースカテゴリ (cpu,switch,trap,console をカンマ区切り)
    #[arg(long)]
    trace: Option<String>,
}

fn die(code: i32, msg: &str) -> ! {
    eprintln!("a2core: {}", msg);
    eprintln!("a2core: Exiting ({}).", code);
    std::process::exit(code);
}

fn args_to_config(args: &Args) -> Result<Config, String> {
    let mut config = Config {
        machine: args.machine.clone(),
        die_on_brk: args.die_on_brk,
        turbo: args.turbo,
        ..Config::default()
    };
    if let Some(s) = &args.trap_success {
        config.trap_success = Some(config::parse_hex_word(s)?);
    }
    if let Some(s) = &args.trap_failure {
        config.trap_failure = Some(config::parse_hex_word(s)?);
    }
    config.rom_file = args.rom.clone();
    config.ram_load_file = args.load.clone();
    if let Some(s) = &args.load_at {
        config.ram_load_loc = config::parse_hex_word(s)?;
    }
    if let Some(s) = &args.start_at {
        config.start_loc = Some(config::parse_hex_word(s)?);
    }
    Ok(config)
}

fn parse_trace_mask(spec: &str) -> TraceMask {
    let mut mask = TraceMask::empty();
    for cat in spec.split(',') {
        match cat.trim() {
            "cpu" => mask |= TraceMask::CPU,
            "switch" => mask |= TraceMask::SWITCH,
            "trap" => mask |= TraceMask::TRAP,
            "console" => mask |= TraceMask::CONSOLE,
            other => log::warn!("Unknown trace category \"{}\"", other),
        }
    }
    mask
}

fn main() {
    let args = Args::parse();

    let level = if args.quiet {
        log::LevelFilter::Error
    } else {
        match args.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    if let Some(spec) = &args.trace {
        trace::set_trace_mask(parse_trace_mask(spec));
    }

    // 設定エラーはすべてCPU構築前にここで落とす
    let config = match args_to_config(&args) {
        Ok(c) => c,
        Err(e) => die(2, &e),
    };
    let mut emu = match Apple2::from_config(&config) {
        Ok(emu) => emu,
        Err(e) => die(2, &e),
    };

    if let Some(rom_path) = &config.rom_file {
        match fs::read(rom_path) {
            Ok(data) => emu.load_rom(&data),
            Err(e) => die(1, &format!("Couldn't open ROM file \"{}\": {}", rom_path, e)),
        }
    }

    emu.boot();

    if let Some(load_path) = &config.ram_load_file {
        match fs::read(load_path) {
            Ok(data) => {
                for (i, &b) in data.iter().enumerate() {
                    emu.poke(config.ram_load_loc.wrapping_add(i as u16), b);
                }
                log::info!(
                    "{} bytes loaded into RAM at ${:04X} from \"{}\"",
                    data.len(),
                    config.ram_load_loc,
                    load_path
                );
            }
            Err(e) => die(1, &format!("Couldn't open --load file \"{}\": {}", load_path, e)),
        }
    }

    if let Some(start) = config.start_loc {
        emu.cpu.regs.pc = start;
    }

    let code = run_console(&mut emu, config.turbo);
    std::process::exit(code);
}

/// 標準入力を行単位で読むスレッドを立てる
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(l) => {
                    if tx.send(l).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
        // チャネルを閉じてEOFを伝える
    });
    rx
}

/// コンソール出力を書き出す（CRは改行に変換）
fn flush_output(emu: &mut Apple2) {
    let out = emu.take_output();
    if out.is_empty() {
        return;
    }
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for b in out {
        let _ = match b {
            0x0D => handle.write_all(b"\n"),
            _ => handle.write_all(&[b]),
        };
    }
    let _ = handle.flush();
}

/// ラインモードのコンソール実行ループ
///
/// 通常はフレーム単位で実行し、停止状態では制御コマンド
/// （継続/ステップ/リセット/終了）だけを受け付ける。
fn run_console(emu: &mut Apple2, turbo: bool) -> i32 {
    let rx = spawn_stdin_reader();
    let mut stdin_open = true;

    loop {
        match *emu.debugger.state() {
            DebugState::Exited(code) => {
                flush_output(emu);
                return code;
            }
            DebugState::Halted(reason) => {
                flush_output(emu);
                emu.print_state();
                eprintln!(
                    "halted ({:?} at ${:04X}); c=continue, s=step, r=reset, q=quit",
                    reason,
                    emu.debugger.halt_pc().unwrap_or(0)
                );
                match rx.recv() {
                    Ok(cmd) => match cmd.trim() {
                        "" | "s" => {
                            // 1命令だけ進めて停止状態を維持する
                            emu.debugger.resume();
                            emu.step();
                            if emu.debugger.is_running() {
                                let pc = emu.cpu.regs.pc;
                                emu.debugger.break_in(pc);
                            }
                        }
                        "c" => {
                            eprintln!("Continuing...");
                            emu.debugger.resume();
                        }
                        "r" => {
                            emu.reset();
                            emu.debugger.resume();
                        }
                        "q" => return 0,
                        other => eprintln!("Unrecognized command: {}", other),
                    },
                    Err(_) => return 1, // EOF
                }
            }
            DebugState::Running => {
                let polls_before = emu.key_polls;
                emu.run_cycles(CYCLES_PER_FRAME);
                flush_output(emu);

                if emu.input_empty() {
                    if !stdin_open {
                        // 入力が尽きており、エミュレートされた側が
                        // キー待ちに入ったら終了する
                        if emu.key_polls > polls_before {
                            flush_output(emu);
                            return 0;
                        }
                    } else {
                        match rx.try_recv() {
                            Ok(line) => {
                                emu.feed_input(line.as_bytes());
                                emu.feed_input(b"\n");
                            }
                            Err(TryRecvError::Disconnected) => {
                                stdin_open = false;
                            }
                            Err(TryRecvError::Empty) => {
                                if !turbo {
                                    thread::sleep(Duration::from_millis(16));
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
