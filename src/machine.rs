//! 機種プロファイル
//!
//! Apple IIファミリー各機種の能力マトリクスと名前解決を実装。
//! プロファイルは起動時に一度だけ決定され、以後は不変。

use crate::cpu::CpuType;

/// Apple IIのモデル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppleModel {
    AppleII,
    AppleIIPlus,
    AppleIIe,
    AppleIIeEnhanced,
}

/// 機種ごとの静的な能力記述子
///
/// CPU種別・小文字対応・MouseText対応・ROM識別バイトを保持する。
/// ROM識別バイトはProDOS等の機種判別ルーチンが読む位置
/// （$FBB3 / $FBBF / $FBC0）に対応。
#[derive(Debug)]
pub struct MachineProfile {
    pub model: AppleModel,
    /// 正式名（エイリアス解決後のタグ）
    pub name: &'static str,
    pub cpu_type: CpuType,
    pub supports_lowercase: bool,
    pub supports_mousetext: bool,
    /// (アドレス, 期待値) のペア列
    pub rom_id_bytes: &'static [(u16, u8)],
    /// ROMファイルが指定されなかった場合の既定ファイル名
    pub default_rom_name: &'static str,
}

/// オリジナル Apple ][ (Integer BASIC ROM)
pub static APPLE_II: MachineProfile = MachineProfile {
    model: AppleModel::AppleII,
    name: "original",
    cpu_type: CpuType::Cpu6502,
    supports_lowercase: false,
    supports_mousetext: false,
    rom_id_bytes: &[(0xFBB3, 0x38)],
    default_rom_name: "apple2.rom",
};

/// Apple ][+ (Autostart ROM)
pub static APPLE_II_PLUS: MachineProfile = MachineProfile {
    model: AppleModel::AppleIIPlus,
    name: "plus",
    cpu_type: CpuType::Cpu6502,
    supports_lowercase: false,
    supports_mousetext: false,
    rom_id_bytes: &[(0xFBB3, 0xEA)],
    default_rom_name: "apple2plus.rom",
};

/// Apple //e unenhanced ($FBC0 = $EA)
pub static APPLE_IIE: MachineProfile = MachineProfile {
    model: AppleModel::AppleIIe,
    name: "twoey",
    cpu_type: CpuType::Cpu6502,
    supports_lowercase: true,
    supports_mousetext: false,
    rom_id_bytes: &[(0xFBB3, 0x06), (0xFBC0, 0xEA)],
    default_rom_name: "apple2e.rom",
};

/// Apple //e Enhanced (65C02、$FBC0 = $E0)
pub static APPLE_IIE_ENHANCED: MachineProfile = MachineProfile {
    model: AppleModel::AppleIIeEnhanced,
    name: "enhanced",
    cpu_type: CpuType::Cpu65C02,
    supports_lowercase: true,
    supports_mousetext: true,
    rom_id_bytes: &[(0xFBB3, 0x06), (0xFBBF, 0x00), (0xFBC0, 0xE0)],
    default_rom_name: "apple2e_enhanced.rom",
};

/// 機種名エイリアステーブル
///
/// 先頭が正式タグ。-m オプションはどのエイリアスでも受け付ける。
static ALIASES: &[(&MachineProfile, &[&str])] = &[
    (&APPLE_II, &["original", "][", "II", "two", "woz", "int", "integer"]),
    (&APPLE_II_PLUS, &["plus", "+", "][+", "II+", "twoplus", "autostart"]),
    (&APPLE_IIE, &["twoey", "][e", "IIe"]),
    (&APPLE_IIE_ENHANCED, &["enhanced", "//e"]),
];

/// 既定の機種名（//e = Enhanced）
pub const DEFAULT_MACHINE: &str = "//e";

impl MachineProfile {
    /// 機種名（エイリアス可）からプロファイルを解決
    ///
    /// 未知の名前は起動前の致命的な設定エラーとして扱う。
    pub fn lookup(machine: &str) -> Result<&'static MachineProfile, String> {
        for &(profile, names) in ALIASES {
            if names.iter().any(|n| *n == machine) {
                return Ok(profile);
            }
        }
        Err(format!("Unrecognized machine name \"{}\"", machine))
    }

    /// モデルからプロファイルを取得
    pub fn of(model: AppleModel) -> &'static MachineProfile {
        match model {
            AppleModel::AppleII => &APPLE_II,
            AppleModel::AppleIIPlus => &APPLE_II_PLUS,
            AppleModel::AppleIIe => &APPLE_IIE,
            AppleModel::AppleIIeEnhanced => &APPLE_IIE_ENHANCED,
        }
    }

    pub fn is_iie(&self) -> bool {
        matches!(self.model, AppleModel::AppleIIe | AppleModel::AppleIIeEnhanced)
    }

    /// スタブROMを生成（16KB、$C000-$FFFF）
    ///
    /// 本物のROMイメージなしでコアを起動・テストするための最小ROM。
    /// 機種識別バイト、リセット/IRQベクター、COUT1エントリのRTSを含む。
    /// ROMイメージのファイル読み込みと検証は呼び出し側の責務。
    pub fn stub_rom(&self) -> Vec<u8> {
        let mut rom = vec![0xEA; 16384]; // NOP埋め

        // リセットルーチン: CLD; JMP 自分自身（安定ループ）
        // 実機Autostart ROMのRESET位置 $FA62 に置く
        rom[0x3A62] = 0xD8; // CLD
        rom[0x3A63] = 0x4C; // JMP $FA63
        rom[0x3A64] = 0x63;
        rom[0x3A65] = 0xFA;

        // IRQ/BRKハンドラ: JMP 自分自身 ($FA40 = 実機MON_IRQ)
        rom[0x3A40] = 0x4C;
        rom[0x3A41] = 0x40;
        rom[0x3A42] = 0xFA;

        // COUT1 ($FDF0): RTS
        // 出力フックはPCがここに到達した時点で発火するため中身は戻るだけ
        rom[0x3DF0] = 0x60;

        // ベクター
        rom[0x3FFA] = 0x40; // NMI -> $FA40
        rom[0x3FFB] = 0xFA;
        rom[0x3FFC] = 0x62; // RESET -> $FA62
        rom[0x3FFD] = 0xFA;
        rom[0x3FFE] = 0x40; // IRQ/BRK -> $FA40
        rom[0x3FFF] = 0xFA;

        // 機種識別バイト
        for &(addr, val) in self.rom_id_bytes {
            rom[(addr - 0xC000) as usize] = val;
        }

        rom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_lookup() {
        assert_eq!(MachineProfile::lookup("plus").unwrap().model, AppleModel::AppleIIPlus);
        assert_eq!(MachineProfile::lookup("][+").unwrap().model, AppleModel::AppleIIPlus);
        assert_eq!(MachineProfile::lookup("twoey").unwrap().model, AppleModel::AppleIIe);
        assert_eq!(MachineProfile::lookup("//e").unwrap().model, AppleModel::AppleIIeEnhanced);
        assert_eq!(MachineProfile::lookup("woz").unwrap().model, AppleModel::AppleII);
    }

    #[test]
    fn test_unknown_machine_is_error() {
        assert!(MachineProfile::lookup("applesauce").is_err());
    }

    #[test]
    fn test_cpu_assignment() {
        // Enhancedのみ65C02、他は6502
        assert_eq!(APPLE_IIE_ENHANCED.cpu_type, CpuType::Cpu65C02);
        assert_eq!(APPLE_IIE.cpu_type, CpuType::Cpu6502);
        assert_eq!(APPLE_II_PLUS.cpu_type, CpuType::Cpu6502);
        assert_eq!(APPLE_II.cpu_type, CpuType::Cpu6502);
    }

    #[test]
    fn test_stub_rom_id_bytes() {
        let rom = APPLE_IIE_ENHANCED.stub_rom();
        assert_eq!(rom[0x3BB3], 0x06); // $FBB3
        assert_eq!(rom[0x3BBF], 0x00); // $FBBF
        assert_eq!(rom[0x3BC0], 0xE0); // $FBC0

        let rom = APPLE_IIE.stub_rom();
        assert_eq!(rom[0x3BB3], 0x06);
        assert_eq!(rom[0x3BC0], 0xEA);
    }

    #[test]
    fn test_stub_rom_vectors() {
        let rom = APPLE_II_PLUS.stub_rom();
        // RESET -> $FA62, IRQ -> $FA40
        assert_eq!((rom[0x3FFD] as u16) << 8 | rom[0x3FFC] as u16, 0xFA62);
        assert_eq!((rom[0x3FFF] as u16) << 8 | rom[0x3FFE] as u16, 0xFA40);
        // COUT1はRTS
        assert_eq!(rom[0x3DF0], 0x60);
    }
}
