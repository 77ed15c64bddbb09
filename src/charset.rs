//! 文字パイプライン
//!
//! 表示に向かうバイトを (生バイト, スイッチ状態, 機種プロファイル) から
//! 表示バイトへ変換する純関数。ライン出力でもフルスクリーン出力でも
//! 同じ関数を通る。状態を一切持たないこと（再入可能・決定的）。

use crate::machine::MachineProfile;
use crate::memory::SoftSwitches;

/// MouseText範囲の全セルを表すマーカー文字
///
/// 実機ではALTCHAR時に$40-$5Fのセルがアイコングリフに置き換わる。
/// 文字端末ではグリフを描けないため、どのセルも同一のマーカーで表す。
pub const MOUSETEXT_MARKER: u8 = b'@';

/// 表示バイト変換
///
/// 判定は7bitマスク後の値に対して上から順に適用され、最初に一致した
/// 規則が勝つ:
/// 1. 制御コード（< $20）はそのまま通す（BEL/CR/LF保持）
/// 2. MouseText対応機でALTCHARオン、$40-$5F → マーカー
/// 3. 小文字$60-$7F → 小文字対応機でALTCHARオンならそのまま、
///    それ以外は大文字に折り畳み（-$20）
/// 4. その他（数字・記号・大文字）はそのまま
///
/// MouseText判定はマスク後のセル値に対して行う。元のASCII文字では
/// ないことに注意（'@'も'A'-'Z'も'['-'_'もすべて同じマーカーになる）。
pub fn display_byte(raw: u8, switches: &SoftSwitches, profile: &MachineProfile) -> u8 {
    let c = raw & 0x7F;

    if c < 0x20 {
        return c;
    }

    if profile.supports_mousetext && switches.alt_char && (0x40..=0x5F).contains(&c) {
        return MOUSETEXT_MARKER;
    }

    if (0x60..=0x7F).contains(&c) {
        if profile.supports_lowercase && switches.alt_char {
            return c;
        }
        return c - 0x20;
    }

    c
}

/// ホスト入力のASCIIをApple内部表現へ変換
///
/// LFはRETURN($8D)、DELはバックスペース($88)になる。小文字非対応機では
/// 大文字に折り畳む。bit7は常にセット。
pub fn from_ascii(c: u8, profile: &MachineProfile) -> u8 {
    if c == b'\n' {
        return 0x8D;
    }
    if c == 0x7F {
        return 0x88;
    }
    let mut c = c;
    if !profile.is_iie() && c >= 0x60 && c != 0x7F {
        c &= 0x5F; // 大文字化（一部記号も変換される）
    }
    c | 0x80
}

/// 印字可能か
pub fn is_printable(c: u8) -> bool {
    (0x20..0x7F).contains(&c)
}
