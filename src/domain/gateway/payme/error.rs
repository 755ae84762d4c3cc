//! Payme error vocabulary.

use serde::Serialize;
use thiserror::Error;

/// Error text in the three languages Payme displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalizedMessage {
    pub ru: String,
    pub uz: String,
    pub en: String,
}

impl LocalizedMessage {
    fn new(ru: &str, uz: &str, en: &str) -> Self {
        Self {
            ru: ru.to_string(),
            uz: uz.to_string(),
            en: en.to_string(),
        }
    }
}

/// JSON-RPC error object in Payme's format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("Payme error {code}: {}", .message.en)]
pub struct PaymeError {
    pub code: i32,
    pub message: LocalizedMessage,
    /// Offending field, when the code concerns one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl PaymeError {
    pub const INSUFFICIENT_PRIVILEGE: i32 = -32504;
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const SYSTEM_ERROR: i32 = -32400;
    pub const INCORRECT_AMOUNT: i32 = -31001;
    pub const TRANSACTION_NOT_FOUND: i32 = -31003;
    pub const CANNOT_CANCEL_COMPLETED: i32 = -31007;
    pub const CANNOT_PERFORM: i32 = -31008;
    pub const ORDER_NOT_FOUND: i32 = -31050;

    fn new(code: i32, message: LocalizedMessage) -> Self {
        Self {
            code,
            message,
            data: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn insufficient_privilege() -> Self {
        Self::new(
            Self::INSUFFICIENT_PRIVILEGE,
            LocalizedMessage::new(
                "Недостаточно привилегий для выполнения метода",
                "Metodni bajarish uchun huquqlar yetarli emas",
                "Insufficient privilege to perform this method",
            ),
        )
    }

    pub fn parse_error() -> Self {
        Self::new(
            Self::PARSE_ERROR,
            LocalizedMessage::new(
                "Ошибка разбора JSON",
                "JSON tahlilida xatolik",
                "JSON parse error",
            ),
        )
    }

    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::new(
            Self::INVALID_REQUEST,
            LocalizedMessage::new(
                "Неверный JSON-RPC объект",
                "JSON-RPC obyekti noto'g'ri",
                "Invalid JSON-RPC request",
            ),
        )
        .with_data(reason)
    }

    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::new(
            Self::METHOD_NOT_FOUND,
            LocalizedMessage::new("Метод не найден", "Metod topilmadi", "Method not found"),
        )
        .with_data(method)
    }

    pub fn system_error() -> Self {
        Self::new(
            Self::SYSTEM_ERROR,
            LocalizedMessage::new(
                "Системная ошибка",
                "Tizim xatosi",
                "Internal system error",
            ),
        )
    }

    pub fn incorrect_amount() -> Self {
        Self::new(
            Self::INCORRECT_AMOUNT,
            LocalizedMessage::new("Неверная сумма", "Noto'g'ri summa", "Incorrect amount"),
        )
        .with_data("amount")
    }

    pub fn transaction_not_found() -> Self {
        Self::new(
            Self::TRANSACTION_NOT_FOUND,
            LocalizedMessage::new(
                "Транзакция не найдена",
                "Tranzaksiya topilmadi",
                "Transaction not found",
            ),
        )
    }

    pub fn cannot_cancel_completed() -> Self {
        Self::new(
            Self::CANNOT_CANCEL_COMPLETED,
            LocalizedMessage::new(
                "Заказ выполнен. Невозможно отменить транзакцию",
                "Buyurtma bajarilgan. Tranzaksiyani bekor qilib bo'lmaydi",
                "Order completed. Transaction cannot be cancelled",
            ),
        )
    }

    pub fn cannot_perform() -> Self {
        Self::new(
            Self::CANNOT_PERFORM,
            LocalizedMessage::new(
                "Невозможно выполнить данную операцию",
                "Ushbu amalni bajarib bo'lmaydi",
                "Unable to perform operation",
            ),
        )
    }

    pub fn order_not_found() -> Self {
        Self::new(
            Self::ORDER_NOT_FOUND,
            LocalizedMessage::new("Заказ не найден", "Buyurtma topilmadi", "Order not found"),
        )
        .with_data("order_id")
    }
}
