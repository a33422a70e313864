//! Time and identity sources. The APIs take these as trait objects so that tests can pin both.
use chrono::{DateTime, Utc};

use crate::db_types::OrderId;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> OrderId;
}

/// 128 random bits as 32 lowercase hex characters. The ids never contain `-`, the merchant reference delimiter.
///
/// Collisions are not retried. The store's primary key rejects a duplicate with `OrderAlreadyExists`, which the
/// server reports as 409 and the buyer can simply check out again.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&self) -> OrderId {
        OrderId::new(format!("{:032x}", rand::random::<u128>()))
    }
}
