use std::hash::{BuildHasher, Hash};

/// Сид по умолчанию для хеш-функций над байтами.
pub const DEFAULT_HASH_SEED: u32 = 5381;

/// Описание поведения ключей и значений словаря.
///
/// Обязателен только `hash`. Остальные функции по умолчанию ведут себя как
/// тождественное копирование, сравнение через `PartialEq` и обычный `drop`.
/// `Context` передаётся во все функции без изменений и хранится в самом
/// словаре.
pub trait DictType<K: PartialEq, V> {
    type Context;

    fn hash(
        &self,
        key: &K,
    ) -> u64;

    fn key_dup(
        &self,
        _ctx: &Self::Context,
        key: K,
    ) -> K {
        key
    }

    fn val_dup(
        &self,
        _ctx: &Self::Context,
        val: V,
    ) -> V {
        val
    }

    fn key_compare(
        &self,
        _ctx: &Self::Context,
        a: &K,
        b: &K,
    ) -> bool {
        a == b
    }

    fn key_destructor(
        &self,
        _ctx: &Self::Context,
        key: K,
    ) {
        drop(key);
    }

    fn val_destructor(
        &self,
        _ctx: &Self::Context,
        val: V,
    ) {
        drop(val);
    }
}

/// Тип словаря поверх произвольного `BuildHasher`.
#[derive(Debug, Clone, Default)]
pub struct HasherDictType<S = ahash::RandomState> {
    hasher: S,
}

/// Байтовые ключи, MurmurHash2 с сидом.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BytesDictType {
    seed: u32,
}

/// Байтовые ключи без учёта регистра ASCII (хеш и сравнение).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaseInsensitiveDictType {
    seed: u32,
}

/// Ключи `u32`, перемешивание Томаса Ванга.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntDictType;

////////////////////////////////////////////////////////////////////////////////
// Хеш-функции
////////////////////////////////////////////////////////////////////////////////

/// 32-битное перемешивание целого числа (Thomas Wang).
pub fn int_hash(mut key: u32) -> u32 {
    key = key.wrapping_add(!(key << 15));
    key ^= key >> 10;
    key = key.wrapping_add(key << 3);
    key ^= key >> 6;
    key = key.wrapping_add(!(key << 11));
    key ^= key >> 16;
    key
}

/// Тождественная хеш-функция.
#[inline]
pub fn identity_hash(key: u32) -> u32 {
    key
}

/// MurmurHash2 (Austin Appleby) с заданным сидом.
///
/// Блоки по 4 байта читаются как little-endian, поэтому результат не зависит
/// от платформы.
pub fn gen_hash(
    key: &[u8],
    seed: u32,
) -> u32 {
    const M: u32 = 0x5bd1_e995;
    const R: u32 = 24;

    let mut h = seed ^ (key.len() as u32);

    let mut chunks = key.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);

        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);

        h = h.wrapping_mul(M);
        h ^= k;
    }

    let tail = chunks.remainder();
    if tail.len() >= 3 {
        h ^= (tail[2] as u32) << 16;
    }
    if tail.len() >= 2 {
        h ^= (tail[1] as u32) << 8;
    }
    if !tail.is_empty() {
        h ^= tail[0] as u32;
        h = h.wrapping_mul(M);
    }

    h ^= h >> 13;
    h = h.wrapping_mul(M);
    h ^= h >> 15;
    h
}

/// Регистронезависимый djb-хеш: `hash * 33 + lower(c)`.
pub fn gen_case_hash(
    key: &[u8],
    seed: u32,
) -> u32 {
    key.iter().fold(seed, |hash, &c| {
        (hash << 5)
            .wrapping_add(hash)
            .wrapping_add(c.to_ascii_lowercase() as u32)
    })
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<S: BuildHasher> HasherDictType<S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self { hasher }
    }
}

impl BytesDictType {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }
}

impl CaseInsensitiveDictType {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl<K, V, S> DictType<K, V> for HasherDictType<S>
where
    K: Hash + PartialEq,
    S: BuildHasher,
{
    type Context = ();

    fn hash(
        &self,
        key: &K,
    ) -> u64 {
        self.hasher.hash_one(key)
    }
}

impl Default for BytesDictType {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_SEED)
    }
}

impl<K, V> DictType<K, V> for BytesDictType
where
    K: AsRef<[u8]> + PartialEq,
{
    type Context = ();

    fn hash(
        &self,
        key: &K,
    ) -> u64 {
        gen_hash(key.as_ref(), self.seed) as u64
    }
}

impl Default for CaseInsensitiveDictType {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_SEED)
    }
}

impl<K, V> DictType<K, V> for CaseInsensitiveDictType
where
    K: AsRef<[u8]> + PartialEq,
{
    type Context = ();

    fn hash(
        &self,
        key: &K,
    ) -> u64 {
        gen_case_hash(key.as_ref(), self.seed) as u64
    }

    fn key_compare(
        &self,
        _ctx: &(),
        a: &K,
        b: &K,
    ) -> bool {
        a.as_ref().eq_ignore_ascii_case(b.as_ref())
    }
}

impl<V> DictType<u32, V> for IntDictType {
    type Context = ();

    fn hash(
        &self,
        key: &u32,
    ) -> u64 {
        int_hash(*key) as u64
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет MurmurHash2 на известных значениях: пустой ввод и
    /// хвосты длиной 1..3 байта.
    #[test]
    fn test_gen_hash_known_values() {
        assert_eq!(gen_hash(b"", 0), 0);
        assert_eq!(gen_hash(b"", 1), 0x5bd1_5e36);
        assert_ne!(gen_hash(b"a", DEFAULT_HASH_SEED), gen_hash(b"b", DEFAULT_HASH_SEED));
        assert_ne!(gen_hash(b"abc", 1), gen_hash(b"abc", 2));
    }

    /// Тест проверяет, что хеш зависит от всех байт, включая хвост.
    #[test]
    fn test_gen_hash_tail_matters() {
        let base = gen_hash(b"abcd", DEFAULT_HASH_SEED);
        assert_ne!(base, gen_hash(b"abcde", DEFAULT_HASH_SEED));
        assert_ne!(gen_hash(b"abcde", DEFAULT_HASH_SEED), gen_hash(b"abcdf", DEFAULT_HASH_SEED));
    }

    /// Тест проверяет, что регистр не влияет на хеш.
    #[test]
    fn test_case_hash_ignores_case() {
        assert_eq!(
            gen_case_hash(b"Hello", DEFAULT_HASH_SEED),
            gen_case_hash(b"hELLO", DEFAULT_HASH_SEED)
        );
        assert_eq!(gen_case_hash(b"", 7), 7);
        assert_eq!(gen_case_hash(b"a", 0), 97);
    }

    /// Тест проверяет перемешивание Ванга: детерминированность и разброс
    /// соседних ключей.
    #[test]
    fn test_int_hash() {
        assert_eq!(int_hash(42), int_hash(42));
        assert_ne!(int_hash(1), int_hash(2));
        assert_eq!(int_hash(0), 0x4636_b9c9);
        assert_eq!(identity_hash(17), 17);
    }

    /// Тест проверяет сравнение ключей по умолчанию и без учёта регистра.
    #[test]
    fn test_key_compare() {
        let plain = BytesDictType::default();
        let ci = CaseInsensitiveDictType::default();

        assert!(!DictType::<Vec<u8>, ()>::key_compare(
            &plain,
            &(),
            &b"Key".to_vec(),
            &b"key".to_vec()
        ));
        assert!(DictType::<Vec<u8>, ()>::key_compare(
            &ci,
            &(),
            &b"Key".to_vec(),
            &b"key".to_vec()
        ));
    }

    /// Тест проверяет, что `HasherDictType` с одним и тем же состоянием
    /// даёт одинаковый хеш.
    #[test]
    fn test_hasher_dict_type_stable() {
        let t = HasherDictType::<ahash::RandomState>::default();
        let a = DictType::<&str, ()>::hash(&t, &"foo");
        let b = DictType::<&str, ()>::hash(&t, &"foo");
        assert_eq!(a, b);
    }
}
