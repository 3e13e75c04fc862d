use kvcore_error::{DictError, DictResult};
use tracing::error;

use super::{Dict, DictEntry, DictType, EntryKey};

/// Внешний итератор словаря.
///
/// Не держит заимствование словаря между вызовами: словарь передаётся в
/// каждый `next`. Безопасный итератор допускает любые изменения словаря
/// между шагами (на время его жизни шаги рехеширования приостановлены).
/// Небезопасный допускает только чтение; нарушение обнаруживается по
/// отпечатку в [`DictIterator::release`].
#[derive(Debug)]
pub struct DictIterator {
    table: usize,
    index: isize,
    safe: bool,
    entry: Option<EntryKey>,
    next_entry: Option<EntryKey>,
    fingerprint: i64,
}

/// Итератор по разделяемой ссылке на словарь.
pub struct DictIter<'a, K, V, T>
where
    K: PartialEq,
    T: DictType<K, V>,
{
    dict: &'a Dict<K, V, T>,
    table: usize,
    bucket: usize,
    cursor: Option<EntryKey>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl DictIterator {
    fn new(safe: bool) -> Self {
        Self {
            table: 0,
            index: -1,
            safe,
            entry: None,
            next_entry: None,
            fingerprint: 0,
        }
    }

    pub fn is_safe(&self) -> bool {
        self.safe
    }

    /// Итератор ещё не сделал ни одного шага.
    fn is_fresh(&self) -> bool {
        self.index == -1 && self.table == 0
    }

    /// Возвращает следующий элемент или `None`, когда обход закончен.
    ///
    /// Ссылка на следующий элемент цепочки запоминается заранее, поэтому
    /// удаление только что возвращённого элемента не ломает обход. Если
    /// удалён запомненный следующий элемент, остаток цепочки пропускается.
    pub fn next<'d, K, V, T>(
        &mut self,
        d: &'d mut Dict<K, V, T>,
    ) -> Option<&'d DictEntry<K, V>>
    where
        K: PartialEq,
        T: DictType<K, V>,
    {
        let found = loop {
            match self.entry {
                None => {
                    if self.is_fresh() {
                        if self.safe {
                            d.iterators += 1;
                        } else {
                            self.fingerprint = d.fingerprint();
                        }
                    }

                    self.index += 1;
                    if self.index as usize >= d.ht[self.table].size() {
                        if d.is_rehashing() && self.table == 0 {
                            self.table = 1;
                            self.index = 0;
                        } else {
                            break None;
                        }
                    }

                    self.entry = d.ht[self.table].buckets[self.index as usize];
                }
                Some(_) => {
                    self.entry = self.next_entry;
                }
            }

            if let Some(ek) = self.entry {
                match d.entries.get(ek) {
                    Some(entry) => {
                        self.next_entry = entry.next;
                        break Some(ek);
                    }
                    None => {
                        self.entry = None;
                        self.next_entry = None;
                    }
                }
            }
        };

        match found {
            Some(ek) => d.entries.get(ek),
            None => None,
        }
    }

    /// Освобождает итератор.
    ///
    /// Для безопасного итератора уменьшает счётчик словаря. Для
    /// небезопасного сверяет отпечаток: несовпадение означает, что словарь
    /// менялся во время обхода, и это ошибка вызывающего кода.
    pub fn release<K, V, T>(
        self,
        d: &mut Dict<K, V, T>,
    ) -> DictResult<()>
    where
        K: PartialEq,
        T: DictType<K, V>,
    {
        if self.is_fresh() {
            return Ok(());
        }

        if self.safe {
            d.iterators = d.iterators.saturating_sub(1);
            return Ok(());
        }

        let actual = d.fingerprint();
        if actual != self.fingerprint {
            error!(
                expected = self.fingerprint,
                actual, "dict modified during unsafe iteration"
            );
            return Err(DictError::FingerprintMismatch {
                expected: self.fingerprint,
                actual,
            });
        }

        Ok(())
    }
}

impl<K, V, T> Dict<K, V, T>
where
    K: PartialEq,
    T: DictType<K, V>,
{
    /// Небезопасный итератор: между шагами словарь можно только читать.
    pub fn iterator(&self) -> DictIterator {
        DictIterator::new(false)
    }

    /// Безопасный итератор: между шагами словарь можно менять.
    pub fn safe_iterator(&self) -> DictIterator {
        DictIterator::new(true)
    }

    /// Обход по разделяемой ссылке: ht[0], затем ht[1].
    pub fn iter(&self) -> DictIter<'_, K, V, T> {
        DictIter {
            dict: self,
            table: 0,
            bucket: 0,
            cursor: None,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для DictIter
////////////////////////////////////////////////////////////////////////////////

impl<'a, K, V, T> Iterator for DictIter<'a, K, V, T>
where
    K: PartialEq,
    T: DictType<K, V>,
{
    type Item = &'a DictEntry<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(ek) = self.cursor {
                let entry = self.dict.entries.get(ek)?;
                self.cursor = entry.next;
                return Some(entry);
            }

            if self.table > 1 {
                return None;
            }

            let table = &self.dict.ht[self.table];
            if self.bucket < table.size() {
                self.cursor = table.buckets[self.bucket];
                self.bucket += 1;
            } else {
                self.table += 1;
                self.bucket = 0;
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.dict.len()))
    }
}

impl<'a, K, V, T> IntoIterator for &'a Dict<K, V, T>
where
    K: PartialEq,
    T: DictType<K, V>,
{
    type Item = &'a DictEntry<K, V>;
    type IntoIter = DictIter<'a, K, V, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
