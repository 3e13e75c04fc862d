use std::{
    fmt,
    hash::Hash,
    mem,
    sync::Arc,
    time::{Duration, Instant},
};

use kvcore_error::{DictError, DictResult};
use rand::Rng;
use slotmap::SlotMap;
use tracing::{debug, trace, warn};

use super::{DictEntry, DictType, EntryKey, EntryValue, HasherDictType, ResizePolicy};

/// Начальный размер таблицы (степень двойки).
pub const DICT_HT_INITIAL_SIZE: usize = 4;

/// Количество бакетов за одну порцию в `rehash_milliseconds`.
const REHASH_MS_BATCH: usize = 100;

/// Как часто `empty` вызывает callback (в бакетах).
const EMPTY_CALLBACK_PERIOD: usize = 65536;

/// Одна хеш-таблица: массив бакетов с головами цепочек, маска размера и
/// количество элементов.
#[derive(Debug)]
pub(crate) struct HashTable {
    pub(crate) buckets: Vec<Option<EntryKey>>,
    pub(crate) size_mask: usize,
    pub(crate) used: usize,
}

/// Хеш-таблица с инкрементальным рехешированием.
///
/// **ИНВАРИАНТЫ:**
///
/// - Если `rehash_idx == -1`:
///     - ht[1] не выделена
///     - все элементы находятся в ht[0]
///
/// - Если `rehash_idx >= 0`:
///     - рехеширование в процессе
///     - бакеты ht[0] с индексом меньше `rehash_idx` пусты
///
/// - Размер каждой выделенной таблицы - степень двойки не меньше 4.
///
/// - Общее количество элементов всегда равно `ht[0].used + ht[1].used`.
///
/// Сами элементы лежат в арене `entries`, цепочки связаны через
/// `EntryKey`. Поэтому удалённый элемент, на который ещё смотрит безопасный
/// итератор, просто перестаёт резолвиться.
pub struct Dict<K, V, T = HasherDictType>
where
    K: PartialEq,
    T: DictType<K, V>,
{
    pub(crate) dict_type: T,
    pub(crate) ctx: T::Context,
    pub(crate) entries: SlotMap<EntryKey, DictEntry<K, V>>,
    pub(crate) ht: [HashTable; 2],
    pub(crate) rehash_idx: isize,
    pub(crate) iterators: usize,
    pub(crate) policy: Arc<ResizePolicy>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl HashTable {
    /// Невыделенная таблица: ни одного бакета.
    pub(crate) fn unallocated() -> Self {
        Self {
            buckets: Vec::new(),
            size_mask: 0,
            used: 0,
        }
    }

    /// Выделяет таблицу ровно на `size` бакетов.
    ///
    /// `size` должен быть степенью двойки.
    fn with_size(size: usize) -> DictResult<Self> {
        debug_assert!(size.is_power_of_two());

        let mut buckets = Vec::new();
        buckets
            .try_reserve_exact(size)
            .map_err(|_| DictError::AllocationFailed { slots: size })?;
        buckets.resize(size, None);

        Ok(Self {
            buckets,
            size_mask: size - 1,
            used: 0,
        })
    }

    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    fn is_allocated(&self) -> bool {
        !self.buckets.is_empty()
    }
}

impl<K, V> Dict<K, V>
where
    K: Hash + PartialEq,
{
    /// Создаёт пустой словарь с хешером `ahash` и политикой по умолчанию.
    pub fn new() -> Self {
        Self::create(HasherDictType::default(), ())
    }
}

impl<K, V, T> Dict<K, V, T>
where
    K: PartialEq,
    T: DictType<K, V>,
{
    /// Создаёт пустой словарь: обе таблицы не выделены, рехеширования нет.
    pub fn create(
        dict_type: T,
        ctx: T::Context,
    ) -> Self {
        Self::with_policy(dict_type, ctx, Arc::new(ResizePolicy::default()))
    }

    /// Создаёт словарь с общей политикой изменения размера.
    pub fn with_policy(
        dict_type: T,
        ctx: T::Context,
        policy: Arc<ResizePolicy>,
    ) -> Self {
        Self {
            dict_type,
            ctx,
            entries: SlotMap::with_key(),
            ht: [HashTable::unallocated(), HashTable::unallocated()],
            rehash_idx: -1,
            iterators: 0,
            policy,
        }
    }

    /// Создаёт таблицу на `size` элементов (округление вверх до степени
    /// двойки, минимум 4).
    ///
    /// Если ht[0] ещё не выделена, новая таблица сразу становится ht[0].
    /// Иначе она становится ht[1] и запускается рехеширование.
    pub fn expand(
        &mut self,
        size: usize,
    ) -> DictResult<()> {
        if self.is_rehashing() {
            return Err(DictError::RehashInProgress);
        }

        if self.ht[0].used > size {
            return Err(DictError::SizeBelowUsed {
                requested: size,
                used: self.ht[0].used,
            });
        }

        let realsize = next_power(size);
        let table = HashTable::with_size(realsize)?;

        if !self.ht[0].is_allocated() {
            self.ht[0] = table;
            debug!(size = realsize, "dict table initialised");
            return Ok(());
        }

        debug!(
            from = self.ht[0].size(),
            to = realsize,
            used = self.ht[0].used,
            "dict rehash started"
        );
        self.ht[1] = table;
        self.rehash_idx = 0;
        Ok(())
    }

    /// Подгоняет размер таблицы под число элементов (минимум 4).
    pub fn resize(&mut self) -> DictResult<()> {
        if !self.policy.can_resize() {
            return Err(DictError::ResizeDisabled);
        }
        if self.is_rehashing() {
            return Err(DictError::RehashInProgress);
        }

        let minimal = self.ht[0].used.max(DICT_HT_INITIAL_SIZE);
        debug!(
            size = self.ht[0].size(),
            target = minimal,
            "dict resize requested"
        );
        self.expand(minimal)
    }

    /// Выполняет до `n` шагов рехеширования. Один шаг переносит один
    /// непустой бакет.
    ///
    /// Возвращает `true`, если работа ещё осталась.
    pub fn rehash(
        &mut self,
        n: usize,
    ) -> bool {
        if !self.is_rehashing() {
            return false;
        }

        let mut steps = n;
        while steps > 0 {
            if self.ht[0].used == 0 {
                self.finish_rehash();
                return false;
            }

            let mut idx = self.rehash_idx as usize;
            debug_assert!(idx < self.ht[0].size());

            while self.ht[0].buckets[idx].is_none() {
                idx += 1;
            }

            let mut cursor = self.ht[0].buckets[idx].take();
            while let Some(ek) = cursor {
                let entry = &mut self.entries[ek];
                cursor = entry.next;

                let slot = self.dict_type.hash(&entry.key) as usize & self.ht[1].size_mask;
                entry.next = self.ht[1].buckets[slot];
                self.ht[1].buckets[slot] = Some(ek);

                self.ht[0].used -= 1;
                self.ht[1].used += 1;
            }

            self.rehash_idx = idx as isize + 1;
            steps -= 1;
        }

        if self.ht[0].used == 0 {
            self.finish_rehash();
            return false;
        }

        true
    }

    /// Рехеширует порциями по 100 бакетов, пока не истечёт `ms` миллисекунд.
    ///
    /// Возвращает количество обработанных бакетов (кратно порции).
    pub fn rehash_milliseconds(
        &mut self,
        ms: u64,
    ) -> usize {
        let start = Instant::now();
        let budget = Duration::from_millis(ms);
        let mut rehashes = 0;

        while self.rehash(REHASH_MS_BATCH) {
            rehashes += REHASH_MS_BATCH;
            if start.elapsed() > budget {
                break;
            }
        }

        trace!(
            rehashes,
            elapsed_us = start.elapsed().as_micros() as u64,
            "dict timed rehash"
        );
        rehashes
    }

    /// Добавляет пару. Ошибка `KeyExists`, если ключ уже есть.
    pub fn add(
        &mut self,
        key: K,
        val: V,
    ) -> DictResult<()> {
        let ek = self.add_raw(key)?;
        self.set_val(ek, val)
    }

    /// Вставляет элемент без значения и возвращает его идентификатор.
    ///
    /// Значение задаётся через [`Dict::set_val`] или методы
    /// [`DictEntry`] для целых.
    pub fn add_raw(
        &mut self,
        key: K,
    ) -> DictResult<EntryKey> {
        if self.is_rehashing() {
            self.rehash_step();
        }

        let index = self.key_index(&key)?;
        let table = if self.is_rehashing() { 1 } else { 0 };

        let key = self.dict_type.key_dup(&self.ctx, key);
        let head = self.ht[table].buckets[index];
        let ek = self.entries.insert(DictEntry::new(key, head));

        self.ht[table].buckets[index] = Some(ek);
        self.ht[table].used += 1;

        Ok(ek)
    }

    /// Добавляет пару или заменяет значение существующего ключа.
    ///
    /// Новое значение строится до освобождения старого. Возвращает `true`,
    /// если ключ был создан.
    pub fn replace(
        &mut self,
        key: K,
        val: V,
    ) -> DictResult<bool> {
        match self.find_key(&key) {
            Some(ek) => {
                let new = EntryValue::Val(self.dict_type.val_dup(&self.ctx, val));
                let old = mem::replace(&mut self.entries[ek].v, new);
                self.destroy_value(old);
                Ok(false)
            }
            None => {
                self.add(key, val)?;
                Ok(true)
            }
        }
    }

    /// Возвращает существующий элемент или создаёт новый без значения.
    pub fn replace_raw(
        &mut self,
        key: K,
    ) -> DictResult<EntryKey> {
        match self.find_key(&key) {
            Some(ek) => Ok(ek),
            None => self.add_raw(key),
        }
    }

    /// Удаляет ключ и освобождает ключ и значение через деструкторы типа.
    pub fn delete(
        &mut self,
        key: &K,
    ) -> DictResult<()> {
        let entry = self.unlink(key)?;
        self.destroy_entry(entry);
        Ok(())
    }

    /// Удаляет ключ без деструкторов: ключ и значение отдаются вызывающему.
    pub fn delete_no_free(
        &mut self,
        key: &K,
    ) -> DictResult<(K, EntryValue<V>)> {
        let entry = self.unlink(key)?;
        Ok((entry.key, entry.v))
    }

    /// Ищет элемент (с одним шагом рехеширования).
    pub fn find(
        &mut self,
        key: &K,
    ) -> Option<&DictEntry<K, V>> {
        let ek = self.find_key(key)?;
        self.entries.get(ek)
    }

    pub fn find_mut(
        &mut self,
        key: &K,
    ) -> Option<&mut DictEntry<K, V>> {
        let ek = self.find_key(key)?;
        self.entries.get_mut(ek)
    }

    /// Идентификатор элемента по ключу (с одним шагом рехеширования).
    pub fn find_key(
        &mut self,
        key: &K,
    ) -> Option<EntryKey> {
        if !self.ht[0].is_allocated() {
            return None;
        }
        if self.is_rehashing() {
            self.rehash_step();
        }
        self.lookup(key)
    }

    /// Значение по ключу; `None`, если ключа нет или значение не `Val`.
    pub fn fetch_value(
        &mut self,
        key: &K,
    ) -> Option<&V> {
        self.find(key)?.val()
    }

    /// Поиск без шага рехеширования.
    pub fn get(
        &self,
        key: &K,
    ) -> Option<&V> {
        let ek = self.lookup(key)?;
        self.entries.get(ek)?.val()
    }

    pub fn contains_key(
        &self,
        key: &K,
    ) -> bool {
        self.lookup(key).is_some()
    }

    /// Элемент по идентификатору, если он ещё жив.
    pub fn entry(
        &self,
        ek: EntryKey,
    ) -> Option<&DictEntry<K, V>> {
        self.entries.get(ek)
    }

    pub fn entry_mut(
        &mut self,
        ek: EntryKey,
    ) -> Option<&mut DictEntry<K, V>> {
        self.entries.get_mut(ek)
    }

    /// Записывает значение через `val_dup`. Прежнее `Val` уходит в
    /// деструктор.
    pub fn set_val(
        &mut self,
        ek: EntryKey,
        val: V,
    ) -> DictResult<()> {
        if !self.entries.contains_key(ek) {
            return Err(DictError::KeyNotFound);
        }

        let new = EntryValue::Val(self.dict_type.val_dup(&self.ctx, val));
        let old = mem::replace(&mut self.entries[ek].v, new);
        self.destroy_value(old);
        Ok(())
    }

    /// Удаляет все элементы обеих таблиц.
    ///
    /// `callback(ctx)` вызывается на каждом 65536-м бакете, чтобы вызывающий
    /// мог обслужить свои события во время долгой очистки.
    pub fn empty<F>(
        &mut self,
        mut callback: F,
    ) where
        F: FnMut(&T::Context),
    {
        let removed = self.len();

        self.clear_table(0, &mut callback);
        self.clear_table(1, &mut callback);
        self.rehash_idx = -1;
        self.iterators = 0;

        debug!(removed, "dict emptied");
    }

    /// `empty` без callback.
    pub fn clear(&mut self) {
        self.empty(|_| {});
    }

    /// Случайный элемент: равновероятный непустой бакет, затем равновероятный
    /// элемент его цепочки.
    pub fn random_key(&mut self) -> Option<&DictEntry<K, V>> {
        if self.is_empty() {
            return None;
        }
        if self.is_rehashing() {
            self.rehash_step();
        }

        let mut rng = rand::thread_rng();

        let head = if self.is_rehashing() {
            let s0 = self.ht[0].size();
            let total = s0 + self.ht[1].size();
            loop {
                let h = rng.gen_range(0..total);
                let slot = if h >= s0 {
                    self.ht[1].buckets[h - s0]
                } else {
                    self.ht[0].buckets[h]
                };
                if let Some(ek) = slot {
                    break ek;
                }
            }
        } else {
            loop {
                let h = rng.gen::<usize>() & self.ht[0].size_mask;
                if let Some(ek) = self.ht[0].buckets[h] {
                    break ek;
                }
            }
        };

        let mut chain = Vec::new();
        let mut cursor = Some(head);
        while let Some(ek) = cursor {
            chain.push(ek);
            cursor = self.entries[ek].next;
        }

        let pick = chain[rng.gen_range(0..chain.len())];
        self.entries.get(pick)
    }

    /// Отпечаток структуры: адреса массивов, размеры и заполненность обеих
    /// таблиц, смешанные с учётом порядка.
    pub fn fingerprint(&self) -> i64 {
        let integers = [
            self.ht[0].buckets.as_ptr() as usize as i64,
            self.ht[0].size() as i64,
            self.ht[0].used as i64,
            self.ht[1].buckets.as_ptr() as usize as i64,
            self.ht[1].size() as i64,
            self.ht[1].used as i64,
        ];

        // hash = mix(hash + x) для каждого числа (Tomas Wang, 64 бита).
        let mut hash: i64 = 0;
        for x in integers {
            hash = hash.wrapping_add(x);
            hash = (!hash).wrapping_add(hash << 21);
            hash ^= hash >> 24;
            hash = hash.wrapping_add(hash << 3).wrapping_add(hash << 8);
            hash ^= hash >> 14;
            hash = hash.wrapping_add(hash << 2).wrapping_add(hash << 4);
            hash ^= hash >> 28;
            hash = hash.wrapping_add(hash << 31);
        }
        hash
    }

    /// Количество элементов в обеих таблицах.
    #[inline]
    pub fn len(&self) -> usize {
        self.ht[0].used + self.ht[1].used
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Суммарное количество бакетов обеих таблиц.
    pub fn slots(&self) -> usize {
        self.ht[0].size() + self.ht[1].size()
    }

    #[inline]
    pub fn is_rehashing(&self) -> bool {
        self.rehash_idx != -1
    }

    /// Позиция курсора рехеширования, если оно идёт.
    pub fn rehash_index(&self) -> Option<usize> {
        usize::try_from(self.rehash_idx).ok()
    }

    /// Размер таблицы `i` (0 или 1) в бакетах.
    pub fn table_size(
        &self,
        i: usize,
    ) -> usize {
        self.ht.get(i).map_or(0, HashTable::size)
    }

    pub fn table_used(
        &self,
        i: usize,
    ) -> usize {
        self.ht.get(i).map_or(0, |t| t.used)
    }

    /// Количество выданных и не освобождённых безопасных итераторов.
    pub fn safe_iterators(&self) -> usize {
        self.iterators
    }

    pub fn policy(&self) -> &Arc<ResizePolicy> {
        &self.policy
    }

    pub fn context(&self) -> &T::Context {
        &self.ctx
    }

    pub fn dict_type(&self) -> &T {
        &self.dict_type
    }

    /// Один шаг рехеширования, если нет безопасных итераторов.
    fn rehash_step(&mut self) {
        if self.iterators == 0 {
            self.rehash(1);
        }
    }

    fn finish_rehash(&mut self) {
        self.ht[0] = mem::replace(&mut self.ht[1], HashTable::unallocated());
        self.rehash_idx = -1;
        debug!(size = self.ht[0].size(), used = self.ht[0].used, "dict rehash finished");
    }

    /// Расширяет таблицу, если коэффициент заполнения достиг 1:1 (или
    /// превысил принудительный порог при выключенном изменении размера).
    fn expand_if_needed(&mut self) -> DictResult<()> {
        if self.is_rehashing() {
            return Ok(());
        }

        if !self.ht[0].is_allocated() {
            return self.expand(DICT_HT_INITIAL_SIZE);
        }

        let used = self.ht[0].used;
        let size = self.ht[0].size();

        if used >= size {
            let can_resize = self.policy.can_resize();
            let forced = used / size > self.policy.force_resize_ratio();

            if can_resize || forced {
                if !can_resize {
                    warn!(used, size, "dict expansion forced while resizing is disabled");
                }
                return self.expand(used * 2);
            }
        }

        Ok(())
    }

    /// Индекс бакета для нового ключа в таблице, принимающей вставки.
    ///
    /// При рехешировании возвращается индекс в ht[1].
    fn key_index(
        &mut self,
        key: &K,
    ) -> DictResult<usize> {
        self.expand_if_needed()?;

        let h = self.dict_type.hash(key) as usize;
        let mut idx = 0;

        for table in 0..=1 {
            idx = h & self.ht[table].size_mask;

            let mut cursor = self.ht[table].buckets[idx];
            while let Some(ek) = cursor {
                let entry = &self.entries[ek];
                if self.dict_type.key_compare(&self.ctx, key, &entry.key) {
                    return Err(DictError::KeyExists);
                }
                cursor = entry.next;
            }

            if !self.is_rehashing() {
                break;
            }
        }

        Ok(idx)
    }

    /// Поиск по обеим таблицам без побочных эффектов.
    pub(crate) fn lookup(
        &self,
        key: &K,
    ) -> Option<EntryKey> {
        if !self.ht[0].is_allocated() {
            return None;
        }

        let h = self.dict_type.hash(key) as usize;

        for table in 0..=1 {
            let idx = h & self.ht[table].size_mask;

            let mut cursor = self.ht[table].buckets[idx];
            while let Some(ek) = cursor {
                let entry = &self.entries[ek];
                if self.dict_type.key_compare(&self.ctx, key, &entry.key) {
                    return Some(ek);
                }
                cursor = entry.next;
            }

            if !self.is_rehashing() {
                break;
            }
        }

        None
    }

    /// Вырезает элемент из цепочки и из арены.
    fn unlink(
        &mut self,
        key: &K,
    ) -> DictResult<DictEntry<K, V>> {
        if !self.ht[0].is_allocated() {
            return Err(DictError::KeyNotFound);
        }
        if self.is_rehashing() {
            self.rehash_step();
        }

        let h = self.dict_type.hash(key) as usize;

        for table in 0..=1 {
            let idx = h & self.ht[table].size_mask;

            let mut prev: Option<EntryKey> = None;
            let mut cursor = self.ht[table].buckets[idx];
            while let Some(ek) = cursor {
                let next = self.entries[ek].next;

                if self
                    .dict_type
                    .key_compare(&self.ctx, key, &self.entries[ek].key)
                {
                    match prev {
                        Some(p) => self.entries[p].next = next,
                        None => self.ht[table].buckets[idx] = next,
                    }
                    self.ht[table].used -= 1;
                    return self.entries.remove(ek).ok_or(DictError::KeyNotFound);
                }

                prev = cursor;
                cursor = next;
            }

            if !self.is_rehashing() {
                break;
            }
        }

        Err(DictError::KeyNotFound)
    }

    fn destroy_entry(
        &self,
        entry: DictEntry<K, V>,
    ) {
        self.dict_type.key_destructor(&self.ctx, entry.key);
        self.destroy_value(entry.v);
    }

    fn destroy_value(
        &self,
        v: EntryValue<V>,
    ) {
        if let EntryValue::Val(v) = v {
            self.dict_type.val_destructor(&self.ctx, v);
        }
    }

    /// Освобождает все элементы таблицы `table` и сбрасывает её.
    fn clear_table<F>(
        &mut self,
        table: usize,
        callback: &mut F,
    ) where
        F: FnMut(&T::Context),
    {
        let size = self.ht[table].size();

        let mut i = 0;
        while i < size && self.ht[table].used > 0 {
            if i % EMPTY_CALLBACK_PERIOD == 0 {
                callback(&self.ctx);
            }

            let mut cursor = self.ht[table].buckets[i].take();
            while let Some(ek) = cursor {
                let Some(entry) = self.entries.remove(ek) else {
                    break;
                };
                cursor = entry.next;
                self.ht[table].used -= 1;
                self.destroy_entry(entry);
            }

            i += 1;
        }

        self.ht[table] = HashTable::unallocated();
    }
}

/// Ближайшая степень двойки не меньше `size` (минимум 4).
fn next_power(size: usize) -> usize {
    size.max(DICT_HT_INITIAL_SIZE)
        .checked_next_power_of_two()
        .unwrap_or(1 << (usize::BITS - 1))
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для Dict
////////////////////////////////////////////////////////////////////////////////

impl<K, V> Default for Dict<K, V>
where
    K: Hash + PartialEq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, T> fmt::Debug for Dict<K, V, T>
where
    K: PartialEq,
    T: DictType<K, V>,
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Dict")
            .field("len", &self.len())
            .field("ht0", &(self.ht[0].size(), self.ht[0].used))
            .field("ht1", &(self.ht[1].size(), self.ht[1].used))
            .field("rehash_idx", &self.rehash_idx)
            .field("iterators", &self.iterators)
            .finish()
    }
}

impl<K, V, T> Drop for Dict<K, V, T>
where
    K: PartialEq,
    T: DictType<K, V>,
{
    fn drop(&mut self) {
        let mut noop = |_: &T::Context| {};
        self.clear_table(0, &mut noop);
        self.clear_table(1, &mut noop);
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
