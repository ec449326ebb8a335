//! Processing stages of one inbound message and the reply each failure gets.

use homebudget_core::HomebudgetError;
use std::fmt;
use thiserror::Error;

/// Reply sent when a message was stored.
pub const DONE_REPLY: &str = "Готово";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Downloading the receipt page
    HandlingLink,
    ParsingBill,
    GettingCategory,
    GettingCurrency,
    SavingBill,
}

impl Stage {
    /// Localized message shown to the user when this stage fails.
    pub fn reply(&self) -> &'static str {
        match self {
            Stage::HandlingLink => "Не удалось обработать ссылку",
            Stage::ParsingBill => "Не удалось разобрать счет",
            Stage::GettingCategory => "Не удалось получить категорию",
            Stage::GettingCurrency => "Не удалось получить курс валюты",
            Stage::SavingBill => "Не удалось сохранить чек",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::HandlingLink => "handling link",
            Stage::ParsingBill => "parsing bill",
            Stage::GettingCategory => "getting category",
            Stage::GettingCurrency => "getting currency",
            Stage::SavingBill => "saving bill",
        }
    }

    /// Tag `source` with this stage.
    pub fn fail(self, source: HomebudgetError) -> StageError {
        StageError {
            stage: self,
            source,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pipeline failure and the stage it happened in.
#[derive(Error, Debug)]
#[error("{stage} failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: HomebudgetError,
}

impl StageError {
    pub fn reply(&self) -> &'static str {
        self.stage.reply()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_message() {
        let err = Stage::GettingCurrency.fail(HomebudgetError::fetch("timeout", true));
        assert_eq!(err.to_string(), "getting currency failed: Fetch error: timeout");
        assert_eq!(err.reply(), "Не удалось получить курс валюты");
    }

    #[test]
    fn test_replies_are_distinct() {
        let stages = [
            Stage::HandlingLink,
            Stage::ParsingBill,
            Stage::GettingCategory,
            Stage::GettingCurrency,
            Stage::SavingBill,
        ];
        let replies: std::collections::HashSet<_> = stages.iter().map(Stage::reply).collect();
        assert_eq!(replies.len(), stages.len());
        assert!(!replies.contains(DONE_REPLY));
    }
}
