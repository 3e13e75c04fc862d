pub mod dict;
pub mod ziplist;

// Публичный экспорт всех типов ошибок из вложенных модулей, чтобы упростить
// доступ к ним из внешнего кода.
pub use dict::*;
pub use ziplist::*;
