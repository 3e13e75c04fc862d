//! `ZipList` хранит последовательность строк и целых в одном непрерывном
//! буфере. Заголовок содержит размер буфера, смещение последнего элемента и
//! количество элементов (насыщается на `u16::MAX`), в конце стоит `0xFF`.
//!
//! Позиции элементов передаются как смещения в буфере (`usize`). Смещение,
//! указывающее на терминатор, означает "конец списка".

use std::fmt;

use kvcore_error::{ZipListError, ZipListResult};
use tracing::trace;

use super::{
    encoding::{
        len_header_size, prevlen_size, save_integer, try_encoding, write_len_header,
        write_prevlen, write_prevlen_force_large, Encoding, HEADER_SIZE, ZIP_END,
    },
    ZipValue, ZipValueOwned, ZlEntry,
};

const ZLBYTES_OFFSET: usize = 0;
const ZLTAIL_OFFSET: usize = 4;
const ZLLEN_OFFSET: usize = 8;

/// Компактный список переменной ширины.
#[derive(Clone, PartialEq, Eq)]
pub struct ZipList {
    data: Vec<u8>,
}

/// Конец списка для `push` и `pop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Where {
    Head,
    Tail,
}

/// Прямой итератор по значениям.
pub struct ZipListIter<'a> {
    zl: &'a ZipList,
    pos: Option<usize>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl ZipList {
    /// Создаёт пустой список: заголовок и терминатор.
    pub fn new() -> Self {
        let bytes = HEADER_SIZE + 1;
        let mut data = vec![0u8; bytes];
        data[ZLBYTES_OFFSET..ZLBYTES_OFFSET + 4].copy_from_slice(&(bytes as u32).to_le_bytes());
        data[ZLTAIL_OFFSET..ZLTAIL_OFFSET + 4]
            .copy_from_slice(&(HEADER_SIZE as u32).to_le_bytes());
        data[bytes - 1] = ZIP_END;
        Self { data }
    }

    /// Принимает сериализованный буфер после полной проверки структуры.
    pub fn from_bytes(data: Vec<u8>) -> ZipListResult<Self> {
        let zl = Self { data };
        zl.validate()?;
        Ok(zl)
    }

    /// Проверяет заголовок и каждый элемент: границы, теги, поля prevlen,
    /// смещение хвоста и счётчик.
    pub fn validate(&self) -> ZipListResult<()> {
        let corrupted = |offset: usize, reason: &str| ZipListError::Corrupted {
            offset,
            reason: reason.to_string(),
        };

        let data = &self.data;
        if data.len() < HEADER_SIZE + 1 {
            return Err(corrupted(0, "blob shorter than header"));
        }
        if self.bytes_field() != data.len() {
            return Err(corrupted(ZLBYTES_OFFSET, "zlbytes does not match blob size"));
        }
        if data[data.len() - 1] != ZIP_END {
            return Err(corrupted(data.len() - 1, "missing terminator"));
        }

        let mut p = HEADER_SIZE;
        let mut prev_raw_len = 0;
        let mut last = HEADER_SIZE;
        let mut count = 0usize;

        while data[p] != ZIP_END {
            let e = ZlEntry::try_parse(data, p).map_err(|reason| corrupted(p, reason))?;
            if e.prevrawlen != prev_raw_len {
                return Err(corrupted(p, "prevlen does not match previous entry"));
            }
            if p + e.total_len() >= data.len() {
                return Err(corrupted(p, "entry overlaps terminator"));
            }

            prev_raw_len = e.total_len();
            last = p;
            p += e.total_len();
            count += 1;
        }

        if p != data.len() - 1 {
            return Err(corrupted(p, "terminator before end of blob"));
        }
        if self.tail_offset() != last {
            return Err(corrupted(ZLTAIL_OFFSET, "zltail does not point at last entry"));
        }
        let field = self.len_field();
        if field < u16::MAX && field as usize != count {
            return Err(corrupted(ZLLEN_OFFSET, "zllen does not match entry count"));
        }

        Ok(())
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Размер буфера в байтах.
    #[inline]
    pub fn blob_len(&self) -> usize {
        self.data.len()
    }

    /// Количество элементов. При насыщенном счётчике требует полного обхода.
    pub fn len(&self) -> usize {
        let field = self.len_field();
        if field < u16::MAX {
            return field as usize;
        }
        self.count_entries()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data[HEADER_SIZE] == ZIP_END
    }

    /// Пересчитывает количество элементов и записывает его обратно, если
    /// оно снова помещается в 16 бит.
    pub fn refresh_len(&mut self) -> usize {
        let count = self.count_entries();
        if count < u16::MAX as usize {
            self.set_len_field(count as u16);
        }
        count
    }

    /// Смещение первого элемента (или терминатора для пустого списка).
    #[inline]
    pub fn head_offset(&self) -> usize {
        HEADER_SIZE
    }

    /// Смещение последнего элемента (или терминатора для пустого списка).
    #[inline]
    pub fn tail_offset(&self) -> usize {
        u32::from_le_bytes(self.header_word(ZLTAIL_OFFSET)) as usize
    }

    /// Смещение терминатора.
    #[inline]
    pub fn end_offset(&self) -> usize {
        self.data.len() - 1
    }

    /// Разобранный заголовок элемента по смещению `p`.
    pub fn entry_at(
        &self,
        p: usize,
    ) -> Option<ZlEntry> {
        if p < HEADER_SIZE || p >= self.end_offset() {
            return None;
        }
        Some(ZlEntry::parse(&self.data, p))
    }

    /// Добавляет значение в начало или в конец.
    pub fn push(
        &mut self,
        s: &[u8],
        whence: Where,
    ) -> ZipListResult<()> {
        let p = match whence {
            Where::Head => HEADER_SIZE,
            Where::Tail => self.end_offset(),
        };
        self.insert_at(p, s)
    }

    /// Вставляет значение перед элементом по смещению `p` (или в конец, если
    /// `p` указывает на терминатор).
    pub fn insert(
        &mut self,
        p: usize,
        s: &[u8],
    ) -> ZipListResult<()> {
        self.insert_at(p, s)
    }

    /// Удаляет элемент по смещению `p`.
    ///
    /// Возвращает смещение элемента, который шёл следом (или терминатора),
    /// чтобы можно было удалять во время обхода.
    pub fn delete(
        &mut self,
        p: usize,
    ) -> ZipListResult<usize> {
        self.delete_at(p, 1)?;
        Ok(p)
    }

    /// Удаляет до `num` элементов, начиная с индекса `index`.
    pub fn delete_range(
        &mut self,
        index: isize,
        num: usize,
    ) -> ZipListResult<()> {
        match self.index(index) {
            Some(p) => self.delete_at(p, num),
            None => Ok(()),
        }
    }

    /// Снимает элемент с головы или хвоста.
    pub fn pop(
        &mut self,
        whence: Where,
    ) -> ZipListResult<Option<ZipValueOwned>> {
        let idx = match whence {
            Where::Head => 0,
            Where::Tail => -1,
        };
        let Some(p) = self.index(idx) else {
            return Ok(None);
        };

        let value = self.get(p).map(|v| v.to_owned_value());
        self.delete_at(p, 1)?;
        Ok(value)
    }

    /// Смещение элемента по индексу. Отрицательные индексы считаются с
    /// хвоста (`-1` - последний элемент).
    pub fn index(
        &self,
        index: isize,
    ) -> Option<usize> {
        if index < 0 {
            let mut remaining = (-(index + 1)) as usize;
            let mut p = self.tail_offset();
            if self.data[p] == ZIP_END {
                return None;
            }

            let mut entry = ZlEntry::parse(&self.data, p);
            while remaining > 0 {
                if entry.prevrawlen == 0 {
                    return None;
                }
                p -= entry.prevrawlen;
                entry = ZlEntry::parse(&self.data, p);
                remaining -= 1;
            }
            Some(p)
        } else {
            let mut remaining = index as usize;
            let mut p = HEADER_SIZE;
            while self.data[p] != ZIP_END {
                if remaining == 0 {
                    return Some(p);
                }
                p += self.raw_entry_len(p);
                remaining -= 1;
            }
            None
        }
    }

    /// Смещение следующего элемента.
    pub fn next(
        &self,
        p: usize,
    ) -> Option<usize> {
        if self.data[p] == ZIP_END {
            return None;
        }
        let q = p + self.raw_entry_len(p);
        if self.data[q] == ZIP_END {
            return None;
        }
        Some(q)
    }

    /// Смещение предыдущего элемента. От терминатора - последний элемент,
    /// от головы - `None`.
    pub fn prev(
        &self,
        p: usize,
    ) -> Option<usize> {
        if self.data[p] == ZIP_END {
            let tail = self.tail_offset();
            return (self.data[tail] != ZIP_END).then_some(tail);
        }
        if p == HEADER_SIZE {
            return None;
        }

        let entry = ZlEntry::parse(&self.data, p);
        debug_assert!(entry.prevrawlen > 0);
        Some(p - entry.prevrawlen)
    }

    /// Значение элемента по смещению `p`.
    pub fn get(
        &self,
        p: usize,
    ) -> Option<ZipValue<'_>> {
        if p >= self.data.len() || self.data[p] == ZIP_END {
            return None;
        }
        Some(ZlEntry::parse(&self.data, p).value(&self.data))
    }

    /// Сравнивает элемент со значением `s`, закодированным так же, как при
    /// вставке: строки побайтово, целые численно.
    pub fn compare(
        &self,
        p: usize,
        s: &[u8],
    ) -> bool {
        if self.data[p] == ZIP_END {
            return false;
        }

        let entry = ZlEntry::parse(&self.data, p);
        match entry.value(&self.data) {
            ZipValue::Str(stored) => stored == s,
            ZipValue::Int(stored) => try_encoding(s).is_some_and(|(v, _)| v == stored),
        }
    }

    /// Ищет элемент, равный `vstr`, начиная с `p`, пропуская `skip`
    /// элементов между сравнениями.
    pub fn find(
        &self,
        p: usize,
        vstr: &[u8],
        skip: usize,
    ) -> Option<usize> {
        let mut p = p;
        let mut skipcnt = 0;
        // Строка запроса разбирается как число один раз, при первом целом.
        let mut probe: Option<Option<i64>> = None;

        while self.data[p] != ZIP_END {
            let entry = ZlEntry::parse(&self.data, p);

            if skipcnt == 0 {
                match entry.value(&self.data) {
                    ZipValue::Str(stored) => {
                        if stored == vstr {
                            return Some(p);
                        }
                    }
                    ZipValue::Int(stored) => {
                        let want = *probe.get_or_insert_with(|| try_encoding(vstr).map(|(v, _)| v));
                        if want == Some(stored) {
                            return Some(p);
                        }
                    }
                }
                skipcnt = skip;
            } else {
                skipcnt -= 1;
            }

            p += entry.total_len();
        }

        None
    }

    pub fn iter(&self) -> ZipListIter<'_> {
        ZipListIter {
            zl: self,
            pos: (!self.is_empty()).then_some(HEADER_SIZE),
        }
    }

    ////////////////////////////////////////////////////////////////////////////
    // Внутренние операции над буфером
    ////////////////////////////////////////////////////////////////////////////

    fn header_word(
        &self,
        at: usize,
    ) -> [u8; 4] {
        [
            self.data[at],
            self.data[at + 1],
            self.data[at + 2],
            self.data[at + 3],
        ]
    }

    fn bytes_field(&self) -> usize {
        u32::from_le_bytes(self.header_word(ZLBYTES_OFFSET)) as usize
    }

    fn set_tail_offset(
        &mut self,
        offset: usize,
    ) {
        self.data[ZLTAIL_OFFSET..ZLTAIL_OFFSET + 4].copy_from_slice(&(offset as u32).to_le_bytes());
    }

    fn len_field(&self) -> u16 {
        u16::from_le_bytes([self.data[ZLLEN_OFFSET], self.data[ZLLEN_OFFSET + 1]])
    }

    fn set_len_field(
        &mut self,
        len: u16,
    ) {
        self.data[ZLLEN_OFFSET..ZLLEN_OFFSET + 2].copy_from_slice(&len.to_le_bytes());
    }

    /// Изменяет счётчик, пока он не насыщен.
    fn incr_length(
        &mut self,
        incr: isize,
    ) {
        let field = self.len_field();
        if field < u16::MAX {
            let next = (field as isize + incr).clamp(0, u16::MAX as isize);
            self.set_len_field(next as u16);
        }
    }

    fn count_entries(&self) -> usize {
        let mut p = HEADER_SIZE;
        let mut count = 0;
        while self.data[p] != ZIP_END {
            p += self.raw_entry_len(p);
            count += 1;
        }
        count
    }

    #[inline]
    fn raw_entry_len(
        &self,
        p: usize,
    ) -> usize {
        ZlEntry::parse(&self.data, p).total_len()
    }

    /// Разница в размере поля prevlen элемента `p`, если записать туда `len`.
    fn prevlen_byte_diff(
        &self,
        p: usize,
        len: usize,
    ) -> isize {
        let current = ZlEntry::parse(&self.data, p).prevrawlensize;
        prevlen_size(len) as isize - current as isize
    }

    /// Меняет размер буфера, обновляет `zlbytes` и ставит терминатор.
    fn resize(
        &mut self,
        len: usize,
    ) -> ZipListResult<()> {
        if len > u32::MAX as usize {
            return Err(ZipListError::BlobTooLarge { bytes: len });
        }
        if len > self.data.len() {
            self.data
                .try_reserve_exact(len - self.data.len())
                .map_err(|_| ZipListError::AllocationFailed { bytes: len })?;
        }

        self.data.resize(len, 0);
        self.data[ZLBYTES_OFFSET..ZLBYTES_OFFSET + 4].copy_from_slice(&(len as u32).to_le_bytes());
        self.data[len - 1] = ZIP_END;
        Ok(())
    }

    fn insert_at(
        &mut self,
        p: usize,
        s: &[u8],
    ) -> ZipListResult<()> {
        let curlen = self.data.len();
        let at_end = self.data[p] == ZIP_END;

        let prevlen = if !at_end {
            ZlEntry::parse(&self.data, p).prevrawlen
        } else {
            let ptail = self.tail_offset();
            if self.data[ptail] != ZIP_END {
                self.raw_entry_len(ptail)
            } else {
                0
            }
        };

        let (value, encoding) = try_encoding(s).unwrap_or((0, Encoding::Str));
        let payload = if encoding.is_str() {
            s.len()
        } else {
            encoding.int_size()
        };
        let reqlen = prevlen_size(prevlen) + len_header_size(encoding, s.len()) + payload;

        // Поле prevlen следующего элемента только растёт: если новому
        // элементу хватает 1 байта, а у следующего уже 5, оставляем 5.
        let mut forcelarge = false;
        let mut nextdiff = if at_end {
            0
        } else {
            self.prevlen_byte_diff(p, reqlen)
        };
        if nextdiff < 0 {
            nextdiff = 0;
            forcelarge = true;
        }
        let nextdiff = nextdiff as usize;

        self.resize(curlen + reqlen + nextdiff)?;

        if !at_end {
            let src = p - nextdiff;
            let count = curlen - p - 1 + nextdiff;
            self.data.copy_within(src..src + count, p + reqlen);

            let next = p + reqlen;
            if forcelarge {
                write_prevlen_force_large(&mut self.data[next..], reqlen);
            } else {
                write_prevlen(&mut self.data[next..], reqlen);
            }

            let mut tail = self.tail_offset() + reqlen;
            let next_len = self.raw_entry_len(next);
            if self.data[next + next_len] != ZIP_END {
                tail += nextdiff;
            }
            self.set_tail_offset(tail);
        } else {
            self.set_tail_offset(p);
        }

        if nextdiff != 0 {
            self.cascade_update(p + reqlen)?;
        }

        let mut q = p;
        q += write_prevlen(&mut self.data[q..], prevlen);
        q += write_len_header(&mut self.data[q..], encoding, s.len());
        if encoding.is_str() {
            self.data[q..q + s.len()].copy_from_slice(s);
        } else {
            save_integer(&mut self.data[q..], value, encoding);
        }

        self.incr_length(1);
        Ok(())
    }

    /// Удаляет до `num` элементов, начиная с `p`.
    fn delete_at(
        &mut self,
        p: usize,
        num: usize,
    ) -> ZipListResult<()> {
        if self.data[p] == ZIP_END {
            return Ok(());
        }
        let first = ZlEntry::parse(&self.data, p);

        let mut q = p;
        let mut deleted = 0;
        while self.data[q] != ZIP_END && deleted < num {
            q += self.raw_entry_len(q);
            deleted += 1;
        }

        let totlen = q - p;
        if totlen == 0 {
            return Ok(());
        }

        let mut nextdiff: isize = 0;
        if self.data[q] != ZIP_END {
            // Элемент после удалённых теперь ссылается на элемент перед
            // первым удалённым.
            nextdiff = self.prevlen_byte_diff(q, first.prevrawlen);
            let q2 = (q as isize - nextdiff) as usize;
            write_prevlen(&mut self.data[q2..], first.prevrawlen);

            let mut tail = self.tail_offset() as isize - totlen as isize;
            let next_len = self.raw_entry_len(q2);
            if self.data[q2 + next_len] != ZIP_END {
                tail += nextdiff;
            }
            self.set_tail_offset(tail as usize);

            let end = self.data.len() - 1;
            self.data.copy_within(q2..end, p);
        } else {
            self.set_tail_offset(p - first.prevrawlen);
        }

        let newlen = (self.data.len() as isize - totlen as isize + nextdiff) as usize;
        self.resize(newlen)?;
        self.incr_length(-(deleted as isize));

        if nextdiff != 0 {
            self.cascade_update(p)?;
        }
        Ok(())
    }

    /// Протягивает изменение длины элемента `p` вперёд, расширяя поля prevlen
    /// следующих элементов. Поля никогда не сужаются.
    fn cascade_update(
        &mut self,
        mut p: usize,
    ) -> ZipListResult<()> {
        let mut grown = 0usize;

        while self.data[p] != ZIP_END {
            let rawlen = self.raw_entry_len(p);
            let rawlensize = prevlen_size(rawlen);

            let np = p + rawlen;
            if self.data[np] == ZIP_END {
                break;
            }

            let next = ZlEntry::parse(&self.data, np);
            if next.prevrawlen == rawlen {
                break;
            }

            if next.prevrawlensize < rawlensize {
                let curlen = self.data.len();
                let extra = rawlensize - next.prevrawlensize;
                self.resize(curlen + extra)?;

                if self.tail_offset() != np {
                    let tail = self.tail_offset() + extra;
                    self.set_tail_offset(tail);
                }

                let src = np + next.prevrawlensize;
                let count = curlen - np - next.prevrawlensize - 1;
                self.data.copy_within(src..src + count, np + rawlensize);
                write_prevlen(&mut self.data[np..], rawlen);

                grown += 1;
                p = np;
            } else {
                if next.prevrawlensize > rawlensize {
                    write_prevlen_force_large(&mut self.data[np..], rawlen);
                } else {
                    write_prevlen(&mut self.data[np..], rawlen);
                }
                break;
            }
        }

        if grown > 0 {
            trace!(grown, bytes = self.data.len(), "ziplist cascade update");
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для ZipList, ZipListIter
////////////////////////////////////////////////////////////////////////////////

impl Default for ZipList {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ZipList {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        writeln!(
            f,
            "{{total bytes {}}} {{length {}}} {{tail offset {}}}",
            self.blob_len(),
            self.len_field(),
            self.tail_offset()
        )?;

        let mut p = HEADER_SIZE;
        let mut index = 0;
        while self.data[p] != ZIP_END {
            let e = ZlEntry::parse(&self.data, p);
            writeln!(
                f,
                "{{addr {p}, index {index:2}, offset {p:5}, rl: {:5}, hs {:2}, pl: {:5}, pls: {:2}, payload {:5}}} [{}]",
                e.total_len(),
                e.headersize,
                e.prevrawlen,
                e.prevrawlensize,
                e.len,
                e.value(&self.data)
            )?;
            p += e.total_len();
            index += 1;
        }
        write!(f, "{{end}}")
    }
}

impl<'a> Iterator for ZipListIter<'a> {
    type Item = ZipValue<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let p = self.pos?;
        let value = self.zl.get(p)?;
        self.pos = self.zl.next(p);
        Some(value)
    }
}

impl<'a> IntoIterator for &'a ZipList {
    type Item = ZipValue<'a>;
    type IntoIter = ZipListIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
