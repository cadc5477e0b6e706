pub mod callback;
pub mod data_mapper;
pub mod pipeline;
pub mod retry;
pub mod wallet;
pub mod zoho_crm;

pub use callback::{CallbackSender, HttpCallbackSender};
pub use data_mapper::{to_wallet_record, Contact, WalletRecord};
pub use pipeline::{Acceptance, ConnectPipeline, PipelineConfig, PipelineOutcome, PipelineState};
pub use retry::{RetryDecision, RetryPolicy};
pub use wallet::{DataswyftWalletClient, RecordSink};
pub use zoho_crm::{ContactSource, ZohoCrmClient};
