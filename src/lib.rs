//! A2CORE - Apple II Emulation Core Library
//!
//! Version 0.2
//!
//! CPU、メモリ、ソフトスイッチ、文字パイプライン、デバッガの
//! 各エミュレーションモジュールを提供
//!
//! 対応機種:
//! - Apple ][ / ][+ (6502、大文字のみ)
//! - Apple //e unenhanced (6502、小文字対応)
//! - Apple //e Enhanced (65C02、小文字 + MouseText)

pub mod cpu;
pub mod memory;
pub mod machine;
pub mod charset;
pub mod debugger;
pub mod apple2;
pub mod config;
pub mod trace;
pub mod test_cpu;
