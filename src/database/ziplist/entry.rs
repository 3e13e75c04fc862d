use std::fmt;

use super::encoding::{decode_len, decode_prevlen, load_integer, Encoding, ZIP_BIGLEN};

/// Разобранный заголовок элемента по смещению `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZlEntry {
    pub offset: usize,
    pub prevrawlensize: usize,
    pub prevrawlen: usize,
    pub lensize: usize,
    pub len: usize,
    pub headersize: usize,
    pub encoding: Encoding,
}

/// Значение элемента, заимствованное из буфера.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZipValue<'a> {
    Str(&'a [u8]),
    Int(i64),
}

/// Значение элемента во владении (например, после `pop`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZipValueOwned {
    Str(Vec<u8>),
    Int(i64),
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl ZlEntry {
    /// Разбирает заголовок элемента. Буфер должен быть корректным.
    pub fn parse(
        data: &[u8],
        offset: usize,
    ) -> Self {
        let (prevrawlensize, prevrawlen) = decode_prevlen(&data[offset..]);
        let (encoding, lensize, len) = decode_len(&data[offset + prevrawlensize..])
            .unwrap_or_else(|| {
                debug_assert!(false, "invalid ziplist encoding at {offset}");
                (Encoding::Str, 1, 0)
            });

        Self {
            offset,
            prevrawlensize,
            prevrawlen,
            lensize,
            len,
            headersize: prevrawlensize + lensize,
            encoding,
        }
    }

    /// Разбор с проверкой границ для недоверенных данных.
    pub fn try_parse(
        data: &[u8],
        offset: usize,
    ) -> Result<Self, &'static str> {
        let first = *data.get(offset).ok_or("entry starts past the end")?;
        let prevrawlensize = if (first as usize) < ZIP_BIGLEN { 1 } else { 5 };
        if data.len() < offset + prevrawlensize {
            return Err("truncated prevlen field");
        }
        let (_, prevrawlen) = decode_prevlen(&data[offset..]);

        let (encoding, lensize, len) =
            decode_len(&data[offset + prevrawlensize..]).ok_or("invalid encoding tag")?;

        let headersize = prevrawlensize + lensize;
        if offset + headersize + len > data.len() {
            return Err("entry runs past the end");
        }

        Ok(Self {
            offset,
            prevrawlensize,
            prevrawlen,
            lensize,
            len,
            headersize,
            encoding,
        })
    }

    /// Полная длина элемента в байтах.
    #[inline]
    pub fn total_len(&self) -> usize {
        self.headersize + self.len
    }

    #[inline]
    pub fn payload_offset(&self) -> usize {
        self.offset + self.headersize
    }

    /// Значение элемента из буфера `data`.
    pub fn value<'a>(
        &self,
        data: &'a [u8],
    ) -> ZipValue<'a> {
        let start = self.payload_offset();
        if self.encoding.is_str() {
            ZipValue::Str(&data[start..start + self.len])
        } else {
            ZipValue::Int(load_integer(&data[start..], self.encoding))
        }
    }
}

impl ZipValue<'_> {
    pub fn to_owned_value(&self) -> ZipValueOwned {
        match *self {
            ZipValue::Str(s) => ZipValueOwned::Str(s.to_vec()),
            ZipValue::Int(n) => ZipValueOwned::Int(n),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match *self {
            ZipValue::Int(n) => Some(n),
            ZipValue::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&[u8]> {
        match *self {
            ZipValue::Str(s) => Some(s),
            ZipValue::Int(_) => None,
        }
    }
}

impl ZipValueOwned {
    /// Строковое представление: целые выводятся в десятичном виде.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            ZipValueOwned::Str(s) => s,
            ZipValueOwned::Int(n) => n.to_string().into_bytes(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для ZipValue
////////////////////////////////////////////////////////////////////////////////

impl fmt::Display for ZipValue<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ZipValue::Str(s) => write!(f, "{}", String::from_utf8_lossy(s)),
            ZipValue::Int(n) => write!(f, "{n}"),
        }
    }
}

impl From<ZipValue<'_>> for ZipValueOwned {
    fn from(v: ZipValue<'_>) -> Self {
        v.to_owned_value()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
