use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Отношение `used / size`, после которого таблица растёт даже при
/// выключенном изменении размера.
pub const DEFAULT_FORCE_RESIZE_RATIO: usize = 5;

/// Политика изменения размера, общая для набора словарей.
///
/// Пока идёт запись снимка на диск, процесс выключает изменение размера,
/// чтобы не трогать страницы памяти без необходимости. Один экземпляр
/// разделяется через `Arc` между всеми таблицами процесса.
#[derive(Debug)]
pub struct ResizePolicy {
    can_resize: AtomicBool,
    force_resize_ratio: usize,
}

impl ResizePolicy {
    pub fn new(
        can_resize: bool,
        force_resize_ratio: usize,
    ) -> Self {
        Self {
            can_resize: AtomicBool::new(can_resize),
            force_resize_ratio: force_resize_ratio.max(1),
        }
    }

    /// То же, что `new`, но сразу в `Arc` для раздачи словарям.
    pub fn shared(
        can_resize: bool,
        force_resize_ratio: usize,
    ) -> Arc<Self> {
        Arc::new(Self::new(can_resize, force_resize_ratio))
    }

    pub fn enable_resize(&self) {
        self.can_resize.store(true, Ordering::Relaxed);
    }

    pub fn disable_resize(&self) {
        self.can_resize.store(false, Ordering::Relaxed);
    }

    #[inline]
    pub fn can_resize(&self) -> bool {
        self.can_resize.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn force_resize_ratio(&self) -> usize {
        self.force_resize_ratio
    }
}

impl Default for ResizePolicy {
    fn default() -> Self {
        Self::new(true, DEFAULT_FORCE_RESIZE_RATIO)
    }
}
