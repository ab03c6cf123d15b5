pub mod record;
pub mod tenant;
pub mod text;

pub use record::{Category, RecordRejectCode};
pub use tenant::{InvalidTenantId, TenantId};
