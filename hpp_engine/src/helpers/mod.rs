pub mod callback_policy;
pub mod clock;
pub mod gateway_status;
pub mod merchant_reference;
pub mod order_locks;
pub mod signature;

pub use callback_policy::CallbackDecision;
pub use clock::{Clock, IdGenerator, RandomIdGenerator, SystemClock};
pub use gateway_status::{GatewayOutcome, MappedTransition};
pub use merchant_reference::{MerchantReference, MerchantReferenceError};
pub use order_locks::{conflict_backoff, OrderLocks};
pub use signature::{sign, verify, SignatureError, SignatureSecret, SIGNATURE_FIELD};
