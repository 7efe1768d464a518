pub mod config;
pub mod contracts;
pub mod db;
pub mod redis_bus;

pub use config::{ClientConfig, ServiceConfig};
pub use contracts::{
    AdjustmentRequest, ApiErrorBody, ClearPeriodResponse, ConvertResponse, CreditNotePayload,
    GenerateResponse, JournalResponse, JournalSubmission, LedgerQuery, ListResponse, Paginated,
    Pagination, PayrollPaidEvent, PayrollQuery, PeriodRequest, ProformaConvertedEvent,
    ProformaPayload, StatusUpdate, SupplierQuery, PAYROLL_PAID_CHANNEL, PROFORMA_CONVERTED_CHANNEL,
};
pub use db::{connect_database, insert_ledger_entry};
pub use redis_bus::RedisBus;
