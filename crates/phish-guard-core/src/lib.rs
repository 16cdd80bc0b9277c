pub mod auth;
pub mod client;
pub mod report;
pub mod scan;

pub use auth::{Authenticator, TokenStore};
pub use client::{
    ApiClient, ApiError, ClientSettings, ErrorCause, Method, Registration, RequestDescriptor,
    SessionState,
};
pub use report::{render_history, render_verdict, OutputFormat};
pub use scan::{
    BlacklistStatus, HistoryEntry, RiskTier, ScanApi, ScanDetails, ScanError, ScanHistory,
    ScanRequest, ScanSession, ScanStatus, ScanVerdict, ValidationError,
};
