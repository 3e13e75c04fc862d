use super::{Dict, DictEntry, DictType, EntryKey};

impl<K, V, T> Dict<K, V, T>
where
    K: PartialEq,
    T: DictType<K, V>,
{
    /// Пошаговый обход словаря по курсору.
    ///
    /// Начинать с курсора `0`; каждый вызов посещает один бакет (или группу
    /// бакетов большей таблицы во время рехеширования) и возвращает
    /// следующий курсор. Обход закончен, когда вернулся `0`.
    ///
    /// Курсор увеличивается в обратном порядке бит: старшие биты маски
    /// меняются первыми. Благодаря этому между вызовами таблица может
    /// расти или сжиматься, а каждый ключ, присутствующий всё время обхода,
    /// будет посещён хотя бы один раз. Ключи могут повторяться.
    pub fn scan<F>(
        &self,
        cursor: usize,
        mut f: F,
    ) -> usize
    where
        F: FnMut(&DictEntry<K, V>),
    {
        if self.is_empty() {
            return 0;
        }

        let mut v = cursor;

        if !self.is_rehashing() {
            let t0 = &self.ht[0];
            let m0 = t0.size_mask;

            self.visit_chain(t0.buckets[v & m0], &mut f);

            // Инкремент старших бит без маски.
            return Self::reverse_increment(v, m0);
        }

        let (t0, t1) = if self.ht[0].size() > self.ht[1].size() {
            (&self.ht[1], &self.ht[0])
        } else {
            (&self.ht[0], &self.ht[1])
        };
        let m0 = t0.size_mask;
        let m1 = t1.size_mask;

        self.visit_chain(t0.buckets[v & m0], &mut f);

        // Все бакеты большей таблицы, являющиеся расширением бакета
        // меньшей таблицы. Биты сверх `m0` перебираются в обратном порядке,
        // как и сам курсор; перенос из старшего бита `m1` и есть следующий
        // курсор.
        loop {
            self.visit_chain(t1.buckets[v & m1], &mut f);

            v = Self::reverse_increment(v, m1);
            if v & (m0 ^ m1) == 0 {
                break;
            }
        }

        v
    }

    /// Прибавляет единицу к курсору в обратном порядке бит внутри `mask`.
    #[inline]
    fn reverse_increment(
        v: usize,
        mask: usize,
    ) -> usize {
        (v | !mask).reverse_bits().wrapping_add(1).reverse_bits()
    }

    fn visit_chain<F>(
        &self,
        head: Option<EntryKey>,
        f: &mut F,
    ) where
        F: FnMut(&DictEntry<K, V>),
    {
        let mut cursor = head;
        while let Some(ek) = cursor {
            let Some(entry) = self.entries.get(ek) else {
                break;
            };
            f(entry);
            cursor = entry.next;
        }
    }
}
