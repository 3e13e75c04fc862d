use std::{path::Path, sync::Arc};

use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{
    database::dict::{
        BytesDictType, CaseInsensitiveDictType, Dict, DictType, ResizePolicy,
        DEFAULT_FORCE_RESIZE_RATIO, DEFAULT_HASH_SEED,
    },
    logging::LoggingConfig,
};

/// Настройки хеш-таблиц процесса.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DictSettings {
    /// Разрешено ли изменение размера таблиц
    pub can_resize: bool,
    /// Отношение `used / size`, после которого таблица растёт принудительно
    pub force_resize_ratio: usize,
    /// Seed для `BytesDictType` и `CaseInsensitiveDictType`
    pub hash_seed: u32,
    /// Бюджет на фоновое рехеширование, мс
    pub rehash_budget_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub dict: DictSettings,
    pub logging: LoggingConfig,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl DictSettings {
    /// Общая политика изменения размера для всех словарей процесса.
    pub fn resize_policy(&self) -> Arc<ResizePolicy> {
        ResizePolicy::shared(self.can_resize, self.force_resize_ratio)
    }

    pub fn bytes_type(&self) -> BytesDictType {
        BytesDictType::new(self.hash_seed)
    }

    pub fn case_insensitive_type(&self) -> CaseInsensitiveDictType {
        CaseInsensitiveDictType::new(self.hash_seed)
    }

    /// Фоновый шаг рехеширования в пределах `rehash_budget_ms`.
    ///
    /// Возвращает `true`, если словарь рехешировался и работа была
    /// выполнена.
    pub fn incremental_rehash<K, V, T>(
        &self,
        d: &mut Dict<K, V, T>,
    ) -> bool
    where
        K: PartialEq,
        T: DictType<K, V>,
    {
        if !d.is_rehashing() {
            return false;
        }
        d.rehash_milliseconds(self.rehash_budget_ms);
        true
    }
}

impl Settings {
    /// Загружает настройки: значения по умолчанию, затем переменные
    /// окружения с префиксом `KVCORE_` (`KVCORE_DICT__CAN_RESIZE=false`).
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(Self::environment())
            .build()?
            .try_deserialize()
    }

    /// То же, что `load`, но с файлом между значениями по умолчанию и
    /// окружением. Формат определяется по расширению.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::from(path.as_ref()).required(true))
            .add_source(Self::environment())
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let logging = LoggingConfig::default();

        Config::builder()
            // Добавляем значения по умолчанию
            .set_default("dict.can_resize", true)?
            .set_default("dict.force_resize_ratio", DEFAULT_FORCE_RESIZE_RATIO as i64)?
            .set_default("dict.hash_seed", DEFAULT_HASH_SEED as i64)?
            .set_default("dict.rehash_budget_ms", 1i64)?
            .set_default("logging.level", logging.level)?
            .set_default("logging.console_enabled", logging.console_enabled)?
            .set_default("logging.file_enabled", logging.file_enabled)?
            .set_default("logging.file_name", logging.file_name)
    }

    fn environment() -> Environment {
        Environment::with_prefix("KVCORE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для DictSettings
////////////////////////////////////////////////////////////////////////////////

impl Default for DictSettings {
    fn default() -> Self {
        Self {
            can_resize: true,
            force_resize_ratio: DEFAULT_FORCE_RESIZE_RATIO,
            hash_seed: DEFAULT_HASH_SEED,
            rehash_budget_ms: 1,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
