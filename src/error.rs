// src/error.rs
//! Ошибки генератора подземелий
//!
//! Фатальными считаются только некорректный запрос вызывающей стороны и сбои
//! чтения/разбора конфигурации. Всё, что случается после старта генерации
//! (пустой каталог шаблонов, неизвестный тир, недостижимые узлы), обрабатывается
//! локально с предупреждением в лог.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    /// Нарушено предусловие запроса (пустое имя, слишком мало комнат)
    #[error("некорректный запрос: {0}")]
    Validation(String),

    /// Токен отмены сработал до того, как фоновая задача начала работу
    #[error("генерация отменена до запуска")]
    Cancelled,

    /// Фоновая задача генерации завершилась аварийно
    #[error("фоновая задача генерации упала: {0}")]
    Worker(String),

    #[error("ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("ошибка разбора TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("ошибка сериализации JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenerationError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

pub type GenerationResult<T> = Result<T, GenerationError>;
