//! CPU機能テストランナー
//!
//! Klaus2m5形式の64KBテストバイナリを実行する。
//!
//! ```text
//! cpu_test <6502_functional_test.bin>
//! cpu_test --c02 <65C02_extended_opcodes_test.bin>
//! ```

use a2core::test_cpu;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "cpu_test")]
#[command(about = "Run Klaus2m5-style CPU functional tests", long_about = None)]
struct Args {
    /// テストバイナリ（64KBイメージ）
    test_file: String,

    /// 65C02拡張命令テストとして実行
    #[arg(long = "c02")]
    c02: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let result = if args.c02 {
        test_cpu::run_65c02_test(&args.test_file)
    } else {
        test_cpu::run_functional_test(&args.test_file)
    };

    match result {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("cpu_test: {}", e);
            std::process::exit(2);
        }
    }
}
