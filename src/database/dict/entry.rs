slotmap::new_key_type! {
    /// Устойчивый идентификатор элемента словаря.
    ///
    /// Остаётся валидным при рехешировании; после удаления элемента
    /// перестаёт резолвиться (`Dict::entry` вернёт `None`).
    pub struct EntryKey;
}

/// Значение элемента: произвольное значение или встроенное целое.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValue<V> {
    /// Элемент только что создан через `add_raw` и ещё не получил значение.
    Unset,
    Val(V),
    Unsigned(u64),
    Signed(i64),
}

/// Элемент цепочки коллизий.
#[derive(Debug)]
pub struct DictEntry<K, V> {
    pub(crate) key: K,
    pub(crate) v: EntryValue<V>,
    pub(crate) next: Option<EntryKey>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<V> EntryValue<V> {
    /// Возвращает значение, если оно не целое и задано.
    pub fn as_val(&self) -> Option<&V> {
        match self {
            EntryValue::Val(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, EntryValue::Unset)
    }
}

impl<K, V> DictEntry<K, V> {
    pub(crate) fn new(
        key: K,
        next: Option<EntryKey>,
    ) -> Self {
        Self {
            key,
            v: EntryValue::Unset,
            next,
        }
    }

    #[inline]
    pub fn key(&self) -> &K {
        &self.key
    }

    #[inline]
    pub fn value(&self) -> &EntryValue<V> {
        &self.v
    }

    #[inline]
    pub fn val(&self) -> Option<&V> {
        self.v.as_val()
    }

    pub fn val_mut(&mut self) -> Option<&mut V> {
        match &mut self.v {
            EntryValue::Val(v) => Some(v),
            _ => None,
        }
    }

    /// Записывает целое без знака. Прежнее значение отбрасывается без
    /// деструктора типа словаря.
    pub fn set_unsigned_integer_val(
        &mut self,
        n: u64,
    ) {
        self.v = EntryValue::Unsigned(n);
    }

    pub fn set_signed_integer_val(
        &mut self,
        n: i64,
    ) {
        self.v = EntryValue::Signed(n);
    }

    pub fn unsigned_integer_val(&self) -> Option<u64> {
        match self.v {
            EntryValue::Unsigned(n) => Some(n),
            _ => None,
        }
    }

    pub fn signed_integer_val(&self) -> Option<i64> {
        match self.v {
            EntryValue::Signed(n) => Some(n),
            _ => None,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для EntryValue
////////////////////////////////////////////////////////////////////////////////

impl<V> Default for EntryValue<V> {
    fn default() -> Self {
        EntryValue::Unset
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет состояние нового элемента и запись целых.
    #[test]
    fn test_entry_value_slots() {
        let mut e: DictEntry<&str, String> = DictEntry::new("k", None);
        assert!(e.value().is_unset());
        assert_eq!(e.val(), None);

        e.set_signed_integer_val(-7);
        assert_eq!(e.signed_integer_val(), Some(-7));
        assert_eq!(e.unsigned_integer_val(), None);

        e.set_unsigned_integer_val(7);
        assert_eq!(e.unsigned_integer_val(), Some(7));

        e.v = EntryValue::Val("v".to_string());
        e.val_mut().unwrap().push('!');
        assert_eq!(e.val().map(String::as_str), Some("v!"));
    }
}
