//! Access gate contracts.

use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Use-case being authorized, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HubOperation {
    ReadFeed,
    Ingest,
}

impl HubOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadFeed => "read_feed",
            Self::Ingest => "ingest",
        }
    }
}

/// Pluggable yes/no authorization check for a caller context `Ctx`.
pub trait AccessGate<Ctx: ?Sized>: Send + Sync {
    fn is_authorized(&self, ctx: &Ctx) -> bool;
}

/// Gate that admits every caller. Meant for local operator tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl<Ctx: ?Sized> AccessGate<Ctx> for AllowAll {
    fn is_authorized(&self, _ctx: &Ctx) -> bool {
        true
    }
}

/// Gate that refuses every caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl<Ctx: ?Sized> AccessGate<Ctx> for DenyAll {
    fn is_authorized(&self, _ctx: &Ctx) -> bool {
        false
    }
}

impl<Ctx: ?Sized, F> AccessGate<Ctx> for F
where
    F: Fn(&Ctx) -> bool + Send + Sync,
{
    fn is_authorized(&self, ctx: &Ctx) -> bool {
        self(ctx)
    }
}

/// Caller was refused by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDenied {
    pub operation: HubOperation,
}

impl Display for AccessDenied {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "access denied for {}", self.operation.as_str())
    }
}

impl Error for AccessDenied {}

/// Converts a gate refusal into `AccessDenied`.
pub fn assert_authorized<Ctx: ?Sized, G: AccessGate<Ctx> + ?Sized>(
    gate: &G,
    ctx: &Ctx,
    operation: HubOperation,
) -> Result<(), AccessDenied> {
    if gate.is_authorized(ctx) {
        return Ok(());
    }
    warn!(
        "event=access_denied module=access status=denied operation={}",
        operation.as_str()
    );
    Err(AccessDenied { operation })
}
