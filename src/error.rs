// src/error.rs
//! Ошибки генерации
//!
//! Три уровня отказа:
//! - геометрические операции возвращают `Option` и откатываются локально;
//! - [`AttemptError`] прерывает одну попытку конвейера, генератор начинает новую;
//! - [`GenerationError`] возвращается вызывающему, когда попытки исчерпаны.

use thiserror::Error;

/// Структурный отказ одной попытки генерации
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttemptError {
    #[error("тесселяция не содержит ни одной ячейки")]
    EmptyTessellation,

    #[error("на верхней границе карты нет вершины для истока реки")]
    NoRiverSource,

    /// Река пошла в гору, вернулась в пройденную вершину или упёрлась в край
    #[error("река остановилась в вершине {vertex}, не дойдя до воды")]
    RiverStalled { vertex: usize },

    #[error("не осталось сельских районов для деревни")]
    NoVillageCandidate,

    #[error("нет района у реки и у воды для городского ядра")]
    NoCoreCandidate,

    #[error("некорректное городское ядро: {0}")]
    InvalidCore(String),
}

/// Отказ генерации карты целиком
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("карта не построена за {attempts} попыток, последняя ошибка: {last}")]
    TooManyAttempts { attempts: usize, last: AttemptError },

    #[error("некорректная конфигурация: {0}")]
    InvalidConfig(String),
}

/// Ошибка восстановления карты из сериализованной записи
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("ссылка на неизвестный сайт района ({x}, {y})")]
    UnknownSite { x: f64, y: f64 },

    #[error("два района с одинаковым сайтом ({x}, {y})")]
    DuplicateSite { x: f64, y: f64 },

    #[error("район на позиции {index} имеет id {id}")]
    IdMismatch { index: usize, id: usize },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
