//! Байтовый формат элементов `ZipList`.
//!
//! Каждый элемент начинается с длины предыдущего элемента (1 байт, если она
//! меньше 254, иначе маркер `0xFE` и 4 байта little-endian), затем идёт
//! заголовок кодировки:
//!
//! | тег                    | значение                                  |
//! |------------------------|-------------------------------------------|
//! | `00pppppp`             | строка до 63 байт                         |
//! | `01pppppp qqqqqqqq`    | строка до 16383 байт (14 бит, big-endian) |
//! | `10000000` + 4 байта   | строка длиннее (32 бита, big-endian)      |
//! | `0xC0`                 | `i16`                                     |
//! | `0xD0`                 | `i32`                                     |
//! | `0xE0`                 | `i64`                                     |
//! | `0xF0`                 | 24-битное знаковое                        |
//! | `0xFE`                 | `i8`                                      |
//! | `0xF1..=0xFD`          | число 0..=12 прямо в теге                 |
//!
//! Все целые хранятся в little-endian.

/// Размер заголовка списка: `zlbytes` (u32) + `zltail` (u32) + `zllen` (u16).
pub const HEADER_SIZE: usize = 10;

/// Байт-терминатор списка.
pub const ZIP_END: u8 = 0xFF;

/// Длина предыдущего элемента, начиная с которой поле занимает 5 байт.
pub const ZIP_BIGLEN: usize = 254;

const ZIP_STR_MASK: u8 = 0xC0;
const ZIP_STR_06B: u8 = 0x00;
const ZIP_STR_14B: u8 = 0x40;
const ZIP_STR_32B: u8 = 0x80;

const ZIP_INT_16B: u8 = 0xC0;
const ZIP_INT_32B: u8 = 0xD0;
const ZIP_INT_64B: u8 = 0xE0;
const ZIP_INT_24B: u8 = 0xF0;
const ZIP_INT_8B: u8 = 0xFE;

const ZIP_INT_IMM_MIN: u8 = 0xF1;
const ZIP_INT_IMM_MAX: u8 = 0xFD;
const ZIP_INT_IMM_MASK: u8 = 0x0F;

const INT24_MIN: i64 = -(1 << 23);
const INT24_MAX: i64 = (1 << 23) - 1;

/// Максимальная длина строки, которую имеет смысл разбирать как число.
const MAX_INT_STR_LEN: usize = 31;

/// Кодировка полезной нагрузки элемента.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Строка; ширина поля длины выводится из самой длины.
    Str,
    Int8,
    Int16,
    Int24,
    Int32,
    Int64,
    /// Число 0..=12, хранимое в самом теге.
    Imm(u8),
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Encoding {
    #[inline]
    pub fn is_str(self) -> bool {
        matches!(self, Encoding::Str)
    }

    /// Количество байт полезной нагрузки для целого.
    pub fn int_size(self) -> usize {
        match self {
            Encoding::Int8 => 1,
            Encoding::Int16 => 2,
            Encoding::Int24 => 3,
            Encoding::Int32 => 4,
            Encoding::Int64 => 8,
            Encoding::Imm(_) | Encoding::Str => 0,
        }
    }

    /// Тег целочисленной кодировки.
    fn int_tag(self) -> u8 {
        match self {
            Encoding::Int8 => ZIP_INT_8B,
            Encoding::Int16 => ZIP_INT_16B,
            Encoding::Int24 => ZIP_INT_24B,
            Encoding::Int32 => ZIP_INT_32B,
            Encoding::Int64 => ZIP_INT_64B,
            Encoding::Imm(v) => ZIP_INT_IMM_MIN + v,
            Encoding::Str => ZIP_STR_06B,
        }
    }

    /// Наименьшая кодировка для `value`.
    pub fn for_int(value: i64) -> Self {
        if (0..=12).contains(&value) {
            Encoding::Imm(value as u8)
        } else if i8::try_from(value).is_ok() {
            Encoding::Int8
        } else if i16::try_from(value).is_ok() {
            Encoding::Int16
        } else if (INT24_MIN..=INT24_MAX).contains(&value) {
            Encoding::Int24
        } else if i32::try_from(value).is_ok() {
            Encoding::Int32
        } else {
            Encoding::Int64
        }
    }
}

/// Размер поля длины предыдущего элемента.
#[inline]
pub fn prevlen_size(len: usize) -> usize {
    if len < ZIP_BIGLEN {
        1
    } else {
        5
    }
}

/// Записывает длину предыдущего элемента в минимальном виде.
pub fn write_prevlen(
    buf: &mut [u8],
    len: usize,
) -> usize {
    if len < ZIP_BIGLEN {
        buf[0] = len as u8;
        1
    } else {
        write_prevlen_force_large(buf, len)
    }
}

/// Записывает длину предыдущего элемента в 5-байтовом виде даже для малых
/// значений. Нужна, чтобы не сжимать уже широкое поле.
pub fn write_prevlen_force_large(
    buf: &mut [u8],
    len: usize,
) -> usize {
    buf[0] = ZIP_BIGLEN as u8;
    buf[1..5].copy_from_slice(&(len as u32).to_le_bytes());
    5
}

/// Читает поле длины предыдущего элемента: `(размер поля, длина)`.
pub fn decode_prevlen(buf: &[u8]) -> (usize, usize) {
    if (buf[0] as usize) < ZIP_BIGLEN {
        (1, buf[0] as usize)
    } else {
        let len = u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]);
        (5, len as usize)
    }
}

/// Размер заголовка кодировки для строки длины `rawlen` или целого.
pub fn len_header_size(
    encoding: Encoding,
    rawlen: usize,
) -> usize {
    if !encoding.is_str() {
        return 1;
    }
    if rawlen <= 0x3F {
        1
    } else if rawlen <= 0x3FFF {
        2
    } else {
        5
    }
}

/// Записывает заголовок кодировки, возвращает число записанных байт.
pub fn write_len_header(
    buf: &mut [u8],
    encoding: Encoding,
    rawlen: usize,
) -> usize {
    if !encoding.is_str() {
        buf[0] = encoding.int_tag();
        return 1;
    }

    if rawlen <= 0x3F {
        buf[0] = ZIP_STR_06B | rawlen as u8;
        1
    } else if rawlen <= 0x3FFF {
        buf[0] = ZIP_STR_14B | ((rawlen >> 8) as u8 & 0x3F);
        buf[1] = (rawlen & 0xFF) as u8;
        2
    } else {
        buf[0] = ZIP_STR_32B;
        buf[1..5].copy_from_slice(&(rawlen as u32).to_be_bytes());
        5
    }
}

/// Разбирает тег кодировки: `(кодировка, размер заголовка, длина нагрузки)`.
///
/// Возвращает `None` для зарезервированных тегов и терминатора.
pub fn decode_len(buf: &[u8]) -> Option<(Encoding, usize, usize)> {
    let tag = *buf.first()?;

    if tag < ZIP_STR_MASK {
        return match tag & ZIP_STR_MASK {
            ZIP_STR_06B => Some((Encoding::Str, 1, (tag & 0x3F) as usize)),
            ZIP_STR_14B => {
                let lo = *buf.get(1)? as usize;
                Some((Encoding::Str, 2, (((tag & 0x3F) as usize) << 8) | lo))
            }
            _ => {
                let raw = buf.get(1..5)?;
                let len = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
                Some((Encoding::Str, 5, len as usize))
            }
        };
    }

    let encoding = match tag {
        ZIP_INT_8B => Encoding::Int8,
        ZIP_INT_16B => Encoding::Int16,
        ZIP_INT_24B => Encoding::Int24,
        ZIP_INT_32B => Encoding::Int32,
        ZIP_INT_64B => Encoding::Int64,
        ZIP_INT_IMM_MIN..=ZIP_INT_IMM_MAX => Encoding::Imm((tag & ZIP_INT_IMM_MASK) - 1),
        _ => return None,
    };

    Some((encoding, 1, encoding.int_size()))
}

/// Строгий разбор десятичного `i64`: без `+`, без ведущих нулей, без `-0`.
pub fn string_to_i64(s: &[u8]) -> Option<i64> {
    match s {
        [] => return None,
        [b'0'] => return Some(0),
        _ => {}
    }

    let (negative, digits) = match s.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, s),
    };

    let (&first, rest) = digits.split_first()?;
    if !(b'1'..=b'9').contains(&first) {
        return None;
    }

    let mut v = (first - b'0') as u64;
    for &c in rest {
        if !c.is_ascii_digit() {
            return None;
        }
        v = v.checked_mul(10)?.checked_add((c - b'0') as u64)?;
    }

    if negative {
        if v > i64::MAX as u64 + 1 {
            None
        } else {
            Some((v as i64).wrapping_neg())
        }
    } else {
        i64::try_from(v).ok()
    }
}

/// Пытается закодировать строку как целое: `Some((значение, кодировка))`.
pub fn try_encoding(s: &[u8]) -> Option<(i64, Encoding)> {
    if s.is_empty() || s.len() > MAX_INT_STR_LEN {
        return None;
    }
    let value = string_to_i64(s)?;
    Some((value, Encoding::for_int(value)))
}

/// Записывает целое в нагрузку по кодировке.
pub fn save_integer(
    buf: &mut [u8],
    value: i64,
    encoding: Encoding,
) {
    match encoding {
        Encoding::Int8 => buf[0] = value as i8 as u8,
        Encoding::Int16 => buf[..2].copy_from_slice(&(value as i16).to_le_bytes()),
        Encoding::Int24 => buf[..3].copy_from_slice(&(value as i32).to_le_bytes()[..3]),
        Encoding::Int32 => buf[..4].copy_from_slice(&(value as i32).to_le_bytes()),
        Encoding::Int64 => buf[..8].copy_from_slice(&value.to_le_bytes()),
        Encoding::Imm(_) => {}
        Encoding::Str => debug_assert!(false, "save_integer with string encoding"),
    }
}

/// Читает целое из нагрузки по кодировке.
pub fn load_integer(
    buf: &[u8],
    encoding: Encoding,
) -> i64 {
    match encoding {
        Encoding::Int8 => buf[0] as i8 as i64,
        Encoding::Int16 => i16::from_le_bytes([buf[0], buf[1]]) as i64,
        Encoding::Int24 => (i32::from_le_bytes([0, buf[0], buf[1], buf[2]]) >> 8) as i64,
        Encoding::Int32 => i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as i64,
        Encoding::Int64 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&buf[..8]);
            i64::from_le_bytes(raw)
        }
        Encoding::Imm(v) => v as i64,
        Encoding::Str => 0,
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет строгий разбор чисел.
    #[test]
    fn test_string_to_i64() {
        assert_eq!(string_to_i64(b"0"), Some(0));
        assert_eq!(string_to_i64(b"-1"), Some(-1));
        assert_eq!(string_to_i64(b"9223372036854775807"), Some(i64::MAX));
        assert_eq!(string_to_i64(b"-9223372036854775808"), Some(i64::MIN));

        assert_eq!(string_to_i64(b""), None);
        assert_eq!(string_to_i64(b"-"), None);
        assert_eq!(string_to_i64(b"-0"), None);
        assert_eq!(string_to_i64(b"+1"), None);
        assert_eq!(string_to_i64(b"01"), None);
        assert_eq!(string_to_i64(b"1a"), None);
        assert_eq!(string_to_i64(b" 1"), None);
        assert_eq!(string_to_i64(b"9223372036854775808"), None);
        assert_eq!(string_to_i64(b"-9223372036854775809"), None);
    }

    /// Тест проверяет выбор наименьшей целочисленной кодировки.
    #[test]
    fn test_try_encoding_picks_smallest() {
        assert_eq!(try_encoding(b"12"), Some((12, Encoding::Imm(12))));
        assert_eq!(try_encoding(b"13"), Some((13, Encoding::Int8)));
        assert_eq!(try_encoding(b"-128"), Some((-128, Encoding::Int8)));
        assert_eq!(try_encoding(b"128"), Some((128, Encoding::Int16)));
        assert_eq!(try_encoding(b"32768"), Some((32768, Encoding::Int24)));
        assert_eq!(try_encoding(b"8388608"), Some((8_388_608, Encoding::Int32)));
        assert_eq!(
            try_encoding(b"2147483648"),
            Some((2_147_483_648, Encoding::Int64))
        );
        assert_eq!(try_encoding(b"abc"), None);
        assert_eq!(try_encoding(&[b'1'; 32]), None);
    }

    /// Тест проверяет запись и чтение целых на границах ширины.
    #[test]
    fn test_integer_roundtrip_boundaries() {
        for v in [
            0,
            12,
            13,
            -1,
            127,
            -128,
            32767,
            -32768,
            INT24_MAX,
            INT24_MIN,
            i32::MAX as i64,
            i32::MIN as i64,
            i64::MAX,
            i64::MIN,
        ] {
            let enc = Encoding::for_int(v);
            let mut buf = [0u8; 8];
            save_integer(&mut buf, v, enc);
            assert_eq!(load_integer(&buf, enc), v, "value {v} with {enc:?}");
        }
    }

    /// Тест проверяет границы поля длины предыдущего элемента.
    #[test]
    fn test_prevlen_encoding() {
        let mut buf = [0u8; 5];

        assert_eq!(write_prevlen(&mut buf, 253), 1);
        assert_eq!(decode_prevlen(&buf), (1, 253));

        assert_eq!(write_prevlen(&mut buf, 254), 5);
        assert_eq!(buf[0], 0xFE);
        assert_eq!(decode_prevlen(&buf), (5, 254));

        assert_eq!(write_prevlen_force_large(&mut buf, 3), 5);
        assert_eq!(decode_prevlen(&buf), (5, 3));
    }

    /// Тест проверяет заголовки строк трёх ширин.
    #[test]
    fn test_string_len_headers() {
        let mut buf = [0u8; 5];

        for (len, size) in [(0, 1), (63, 1), (64, 2), (16383, 2), (16384, 5)] {
            assert_eq!(len_header_size(Encoding::Str, len), size);
            assert_eq!(write_len_header(&mut buf, Encoding::Str, len), size);
            assert_eq!(decode_len(&buf), Some((Encoding::Str, size, len)));
        }
    }

    /// Тест проверяет теги целых и отказ для зарезервированных значений.
    #[test]
    fn test_int_tags() {
        let mut buf = [0u8; 1];
        write_len_header(&mut buf, Encoding::Imm(0), 0);
        assert_eq!(buf[0], 0xF1);
        assert_eq!(decode_len(&buf), Some((Encoding::Imm(0), 1, 0)));

        write_len_header(&mut buf, Encoding::Int24, 0);
        assert_eq!(decode_len(&buf), Some((Encoding::Int24, 1, 3)));

        assert_eq!(decode_len(&[0xFF]), None);
        assert_eq!(decode_len(&[0xC1]), None);
        assert_eq!(decode_len(&[]), None);
    }
}
