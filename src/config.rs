//! 設定管理モジュール
//!
//! 実行設定の保持とJSON形式での永続化

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::machine;

/// 設定ファイルのデフォルトファイル名
const CONFIG_FILENAME: &str = "a2core_config.json";

fn default_machine() -> String {
    machine::DEFAULT_MACHINE.to_string()
}

fn default_turbo() -> bool {
    true
}

/// エミュレータ実行設定
///
/// 機種名が正しいかどうかの検証は起動時にMachineProfile::lookupで行う。
/// 不正な設定はCPUコア構築前に致命的エラーとして報告される。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 機種名（エイリアス可: "plus", "][+", "twoey", "//e" など）
    #[serde(default = "default_machine")]
    pub machine: String,
    /// BRK/不正オペコードで終了する（strictモード）
    #[serde(default)]
    pub die_on_brk: bool,
    /// このPCに到達したら成功として終了
    #[serde(default)]
    pub trap_success: Option<u16>,
    /// このPCに到達したら失敗として終了
    #[serde(default)]
    pub trap_failure: Option<u16>,
    /// ROMイメージのパス（未指定ならスタブROM）
    #[serde(default)]
    pub rom_file: Option<String>,
    /// RAMにロードするイメージのパス
    #[serde(default)]
    pub ram_load_file: Option<String>,
    /// RAMイメージのロード先アドレス
    #[serde(default)]
    pub ram_load_loc: u16,
    /// 実行開始アドレス（未指定ならリセットベクター）
    #[serde(default)]
    pub start_loc: Option<u16>,
    /// ウェイトなしで全速実行
    #[serde(default = "default_turbo")]
    pub turbo: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            machine: default_machine(),
            die_on_brk: false,
            trap_success: None,
            trap_failure: None,
            rom_file: None,
            ram_load_file: None,
            ram_load_loc: 0,
            start_loc: None,
            turbo: true,
        }
    }
}

/// 実行ファイルのディレクトリを取得
pub fn get_exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// 設定ファイルのパスを取得
pub fn get_config_path() -> PathBuf {
    get_exe_dir().join(CONFIG_FILENAME)
}

impl Config {
    /// 設定ファイルをロード（なければデフォルト）
    pub fn load_from(path: &Path) -> Config {
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("Failed to parse config {}: {}", path.display(), e);
                    Config::default()
                }
            },
            Err(_) => Config::default(),
        }
    }

    /// 設定ファイルを保存
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;
        fs::write(path, json)
            .map_err(|e| format!("Failed to write config {}: {}", path.display(), e))
    }
}

/// 16進ワード引数をパース（"$" / "0x" プレフィクス可）
pub fn parse_hex_word(arg: &str) -> Result<u16, String> {
    let s = arg.trim_start_matches('$').trim_start_matches("0x");
    u16::from_str_radix(s, 16).map_err(|_| format!("Could not parse hex word \"{}\"", arg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_word() {
        assert_eq!(parse_hex_word("FDF0").unwrap(), 0xFDF0);
        assert_eq!(parse_hex_word("$300").unwrap(), 0x0300);
        assert_eq!(parse_hex_word("0x3").unwrap(), 3);
        assert!(parse_hex_word("xyzzy").is_err());
        assert!(parse_hex_word("10000").is_err());
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.machine = "plus".to_string();
        config.die_on_brk = true;
        config.trap_success = Some(0x0003);
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.machine, "plus");
        assert!(back.die_on_brk);
        assert_eq!(back.trap_success, Some(3));
    }

    #[test]
    fn test_config_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.machine, machine::DEFAULT_MACHINE);
        assert!(!config.die_on_brk);
        assert!(config.turbo);
    }
}
